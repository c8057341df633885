use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelId, Task};

const SEG_MODEL: (&str, &str) = ("yolo11n-seg", "models/yolo11n-seg.onnx");
const POSE_MODEL: (&str, &str) = ("yolo11n-pose", "models/yolo11n-pose.onnx");

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }

    /// Pesos por tarea: pose usa su propio modelo, el resto el de segmentación.
    pub fn default_for(&self, task: Task) -> ModelId {
        let (name, path) = if task.needs_pose_model() { POSE_MODEL } else { SEG_MODEL };
        ModelId { name: name.to_string(), onnx_path: path.to_string() }
    }

    /// Modelo elegido por el usuario o el de la tarea.
    pub fn resolve(&self, task: Task, override_path: Option<&str>) -> ModelId {
        match override_path {
            Some(path) => ModelId {
                name: Path::new(path)
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "custom".to_string()),
                onnx_path: path.to_string(),
            },
            None => self.default_for(task),
        }
    }

    pub fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        if !Path::new(&model.onnx_path).exists() {
            return Err(DomainError::ModelLoad(format!("model file not found: {}", model.onnx_path)));
        }
        Ok(())
    }
}
