use image::Rgb;

use crate::application::ports::Canvas;
use crate::application::session::ClassColorTable;
use crate::domain::{
    detection::{Detection, Keypoint},
    errors::{DomainError, DomainResult},
    model::Task,
    skeleton::{KEYPOINT_COLORS, LINE_COLOR, LINE_THICKNESS, POINT_RADIUS, SKELETON},
    stream::ResultLine,
};

const CLASSIFY_ORIGIN: (i32, i32) = (10, 30);
const CLASSIFY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CLASSIFY_SCALE: f32 = 1.0;
const BOX_THICKNESS: u32 = 2;
const BOX_LABEL_SCALE: f32 = 0.5;
const BOX_LABEL_OFFSET: i32 = 10;
const MASK_ALPHA: f32 = 0.4;

/// Pinta el resultado del modelo sobre el frame y devuelve las líneas
/// (etiqueta, confianza) para la consola.
#[derive(Debug, Default, Clone, Copy)]
pub struct Annotator;

impl Annotator {
    pub fn new() -> Self {
        Self
    }

    pub fn annotate<C: Canvas>(
        &self,
        canvas: &mut C,
        detections: &[Detection],
        task: Task,
        colors: &mut ClassColorTable,
    ) -> DomainResult<Vec<ResultLine>> {
        match task {
            Task::Classify => self.classify(canvas, detections),
            Task::Detect => Ok(self.boxes(canvas, detections, colors, false)),
            Task::Segment => Ok(self.boxes(canvas, detections, colors, true)),
            Task::Pose => {
                for keypoints in detections.iter().filter_map(|d| d.keypoints.as_deref()) {
                    draw_pose(canvas, keypoints);
                }
                Ok(Vec::new())
            }
        }
    }

    fn classify<C: Canvas>(&self, canvas: &mut C, detections: &[Detection]) -> DomainResult<Vec<ResultLine>> {
        // El modelo entrega las detecciones ya ordenadas: la primera es la de mayor confianza.
        let top = detections.first().ok_or(DomainError::EmptyClassification)?;
        let line = ResultLine::new(top.label.clone(), top.confidence);
        canvas.draw_text(CLASSIFY_ORIGIN, &line.to_string(), CLASSIFY_COLOR, CLASSIFY_SCALE);
        Ok(vec![line])
    }

    fn boxes<C: Canvas>(
        &self,
        canvas: &mut C,
        detections: &[Detection],
        colors: &mut ClassColorTable,
        with_masks: bool,
    ) -> Vec<ResultLine> {
        let mut lines = Vec::with_capacity(detections.len());

        for det in detections {
            let color = colors.color_for(det.class_id);
            let line = ResultLine::new(det.label.clone(), det.confidence);

            if let Some(b) = det.bbox {
                let (x1, y1) = (b.x1 as i32, b.y1 as i32);
                canvas.draw_rect((x1, y1), (b.x2 as i32, b.y2 as i32), color, BOX_THICKNESS);
                canvas.draw_text((x1, y1 - BOX_LABEL_OFFSET), &line.to_string(), color, BOX_LABEL_SCALE);
            }
            lines.push(line);
        }

        // Las máscaras van después de todas las cajas, con el mismo color de clase.
        if with_masks {
            for det in detections {
                if let Some(mask) = &det.mask {
                    let color = colors.color_for(det.class_id);
                    canvas.blend_mask(mask, color, MASK_ALPHA);
                }
            }
        }

        lines
    }
}

fn in_frame(kp: &Keypoint, width: u32, height: u32) -> bool {
    kp.x > 0.0 && kp.y > 0.0 && kp.x < width as f32 && kp.y < height as f32
}

/// Pinta un esqueleto. Los puntos en (0,0) o fuera de la imagen se consideran
/// no detectados, igual que cualquier conexión que los use.
pub fn draw_pose<C: Canvas>(canvas: &mut C, keypoints: &[Keypoint]) {
    let (width, height) = canvas.dimensions();

    for (kp, &color) in keypoints.iter().zip(KEYPOINT_COLORS.iter()) {
        if in_frame(kp, width, height) {
            canvas.fill_circle((kp.x as i32, kp.y as i32), POINT_RADIUS, color);
        }
    }

    for &(i, j) in SKELETON.iter() {
        let (Some(a), Some(b)) = (keypoints.get(i), keypoints.get(j)) else {
            continue;
        };
        if in_frame(a, width, height) && in_frame(b, width, height) {
            canvas.draw_line(
                (a.x as i32, a.y as i32),
                (b.x as i32, b.y as i32),
                LINE_COLOR,
                LINE_THICKNESS,
            );
        }
    }
}
