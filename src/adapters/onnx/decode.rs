//! Post-proceso de las cabezas YOLO (v8/11) exportadas a ONNX.
//!
//! La salida principal tiene forma `[C, N]` (ya sin el eje de batch): una
//! columna por candidato con `cx, cy, w, h` seguidos de lo que dependa de la
//! cabeza:
//!   - detección: una puntuación por clase;
//!   - segmentación: puntuaciones por clase + coeficientes de máscara;
//!   - pose: una única puntuación (persona) + `x, y, visibilidad` por punto.
//! Todas las coordenadas están en el espacio de entrada del modelo.

use ndarray::{s, ArrayView2, ArrayView3};

use crate::domain::detection::{BoundingBox, Keypoint, Mask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadLayout {
    Detect { classes: usize },
    Segment { classes: usize, coeffs: usize },
    Pose { keypoints: usize },
}

impl HeadLayout {
    /// Deduce la cabeza a partir del número de filas de la salida.
    pub fn infer(rows: usize, pose: bool, mask_coeffs: Option<usize>) -> Option<Self> {
        if pose {
            let kpt_rows = rows.checked_sub(5)?;
            return (kpt_rows % 3 == 0 && kpt_rows > 0).then_some(HeadLayout::Pose { keypoints: kpt_rows / 3 });
        }
        match mask_coeffs {
            Some(coeffs) => {
                let classes = rows.checked_sub(4 + coeffs).filter(|&c| c > 0)?;
                Some(HeadLayout::Segment { classes, coeffs })
            }
            None => rows.checked_sub(4).filter(|&c| c > 0).map(|classes| HeadLayout::Detect { classes }),
        }
    }

    #[cfg(test)]
    pub fn rows(&self) -> usize {
        match *self {
            HeadLayout::Detect { classes } => 4 + classes,
            HeadLayout::Segment { classes, coeffs } => 4 + classes + coeffs,
            HeadLayout::Pose { keypoints } => 5 + 3 * keypoints,
        }
    }

    fn classes(&self) -> usize {
        match *self {
            HeadLayout::Detect { classes } | HeadLayout::Segment { classes, .. } => classes,
            HeadLayout::Pose { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    pub score: f32,
    pub class_id: usize,
    /// Coeficientes de máscara o keypoints crudos (x, y, v)*K, según la cabeza.
    pub extra: Vec<f32>,
}

pub fn decode_candidates(pred: ArrayView2<f32>, layout: HeadLayout, conf_threshold: f32) -> Vec<Candidate> {
    let num_classes = layout.classes();
    let mut out = Vec::new();

    for i in 0..pred.ncols() {
        let col = pred.column(i);
        let scores = col.slice(s![4..4 + num_classes]);
        let Some((class_id, score)) = scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };
        if score <= conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (col[0], col[1], col[2], col[3]);
        let extra = col.slice(s![4 + num_classes..]).to_vec();
        out.push(Candidate {
            bbox: BoundingBox {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
            },
            score,
            class_id,
            extra,
        });
    }
    out
}

/// NMS voraz por clase. El resultado queda ordenado por confianza descendente
/// y recortado a `max_detections`.
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
    candidates.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for cand in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && k.bbox.iou(&cand.bbox) > iou_threshold);
        if !overlaps {
            kept.push(cand);
        }
    }
    kept
}

/// Máscara `coeffs · protos` binarizada (sigmoide > 0.5, es decir logit > 0)
/// y recortada a la caja. `bbox` en coordenadas de entrada del modelo.
pub fn decode_mask(coeffs: &[f32], protos: ArrayView3<f32>, bbox: &BoundingBox, input_size: u32) -> Mask {
    let (nm, mh, mw) = protos.dim();
    debug_assert_eq!(nm, coeffs.len());
    let kx = mw as f32 / input_size as f32;
    let ky = mh as f32 / input_size as f32;
    let (bx1, by1, bx2, by2) = (bbox.x1 * kx, bbox.y1 * ky, bbox.x2 * kx, bbox.y2 * ky);

    let mut data = vec![false; mh * mw];
    for y in 0..mh {
        let cy = y as f32 + 0.5;
        if cy < by1 || cy > by2 {
            continue;
        }
        for x in 0..mw {
            let cx = x as f32 + 0.5;
            if cx < bx1 || cx > bx2 {
                continue;
            }
            let logit: f32 = coeffs
                .iter()
                .enumerate()
                .map(|(k, c)| c * protos[[k, y, x]])
                .sum();
            data[y * mw + x] = logit > 0.0;
        }
    }
    Mask::new(mw as u32, mh as u32, data)
}

/// Keypoints crudos `(x, y, v)*K` escalados al frame.
pub fn decode_keypoints(raw: &[f32], sx: f32, sy: f32) -> Vec<Keypoint> {
    raw.chunks_exact(3)
        .map(|k| Keypoint { x: k[0] * sx, y: k[1] * sy, score: k[2] })
        .collect()
}

pub fn scale_box(b: &BoundingBox, sx: f32, sy: f32) -> BoundingBox {
    BoundingBox { x1: b.x1 * sx, y1: b.y1 * sy, x2: b.x2 * sx, y2: b.y2 * sy }
}
