use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2, Ix3, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use tracing::{debug, info};

use crate::adapters::onnx::decode::{
    decode_candidates, decode_keypoints, decode_mask, nms, scale_box, HeadLayout,
};
use crate::adapters::onnx::labels::label_for;
use crate::application::ports::DetectorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{InferenceConfig, Task, YoloParams};

pub struct OnnxYoloEngine {
    session: Session,
    task: Task,
    params: YoloParams,
}

impl OnnxYoloEngine {
    /// Carga los pesos; cualquier fallo (fichero, ONNX corrupto, runtime) es `ModelLoad`.
    pub fn open(cfg: &InferenceConfig) -> DomainResult<Self> {
        Self::load(cfg).map_err(|e| DomainError::ModelLoad(format!("{}: {e:#}", cfg.model.onnx_path)))
    }

    fn load(cfg: &InferenceConfig) -> Result<Self> {
        let path = &cfg.model.onnx_path;
        let model_bytes = fs::read(path).with_context(|| format!("leyendo {path}"))?;

        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let session = builder.commit_from_memory(&model_bytes)?;

        info!("Modelo {} cargado desde {} (tarea {})", cfg.model.name, path, cfg.task);
        Ok(Self { session, task: cfg.task, params: cfg.params.clone() })
    }

    fn preprocess(&self, rgb: &RgbImage) -> Result<Tensor<f32>> {
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (data, _) = input.into_raw_vec_and_offset();
        Ok(Tensor::from_array((input_shape, data))?)
    }

    pub fn run(&mut self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let input_tensor = self.preprocess(rgb)?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let pred = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        // Segmentación: segunda salida con los prototipos de máscara [1, nm, mh, mw].
        let protos = if !self.task.needs_pose_model() && outputs.len() > 1 {
            let (shape_p, data_p) = outputs[1].try_extract_tensor::<f32>()?;
            let dims_p: Vec<usize> = shape_p.iter().map(|&x| x as usize).collect();
            Some((dims_p, data_p))
        } else {
            None
        };

        let mask_coeffs = protos.as_ref().and_then(|(d, _)| d.get(1).copied());
        let layout = HeadLayout::infer(pred.nrows(), self.task.needs_pose_model(), mask_coeffs)
            .ok_or_else(|| anyhow!("salida YOLO inesperada: {:?}", dims))?;

        let candidates = decode_candidates(pred, layout, self.params.conf_threshold);
        let kept = nms(candidates, self.params.iou_threshold, self.params.max_detections);

        let imgsz = self.params.input_size as f32;
        let sx = rgb.width() as f32 / imgsz;
        let sy = rgb.height() as f32 / imgsz;

        let protos_view = match &protos {
            Some((dims_p, data_p)) => Some(
                ArrayViewD::from_shape(IxDyn(dims_p), *data_p)?
                    .index_axis_move(Axis(0), 0)
                    .into_dimensionality::<Ix3>()?,
            ),
            None => None,
        };

        let mut detections = Vec::with_capacity(kept.len());
        for cand in kept {
            let mut det = Detection::new(cand.class_id, label_for(cand.class_id), cand.score);
            det.bbox = Some(scale_box(&cand.bbox, sx, sy));

            match layout {
                HeadLayout::Segment { .. } if self.task == Task::Segment => {
                    if let Some(protos) = &protos_view {
                        det = det.with_mask(decode_mask(&cand.extra, protos.view(), &cand.bbox, self.params.input_size));
                    }
                }
                HeadLayout::Pose { .. } => {
                    det = det.with_keypoints(decode_keypoints(&cand.extra, sx, sy));
                }
                _ => {}
            }
            detections.push(det);
        }

        debug!("{} candidatos tras NMS", detections.len());
        Ok(detections)
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn infer(&mut self, frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        self.run(frame)
            .map_err(|e| DomainError::Inference(format!("{e:#}")))
    }
}
