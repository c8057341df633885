use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::adapters::onnx::model_catalog::OnnxModelCatalog;
use crate::adapters::v4l2::capture::CaptureConfig;
use crate::application::services::LoopOptions;
use crate::domain::camera::{CameraId, CameraMode, FrameSize};
use crate::domain::model::{InferenceConfig, Task, YoloParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskArg {
    #[value(alias = "clasificar")]
    Classify,
    #[value(alias = "detectar")]
    Detect,
    #[value(alias = "segmentar")]
    Segment,
    Pose,
}

impl From<TaskArg> for Task {
    fn from(t: TaskArg) -> Self {
        match t {
            TaskArg::Classify => Task::Classify,
            TaskArg::Detect => Task::Detect,
            TaskArg::Segment => Task::Segment,
            TaskArg::Pose => Task::Pose,
        }
    }
}

/// Selecciona una tarea: clasificar, detectar, segmentar o pose.
#[derive(Debug, Parser)]
#[command(name = "yolo-webcam", version, about)]
pub struct Args {
    /// Tarea a realizar
    #[arg(value_enum, required_unless_present = "list_cameras")]
    pub task: Option<TaskArg>,

    /// No invertir el video como un espejo
    #[arg(long)]
    pub no_flip: bool,

    /// Listar las cámaras V4L2 disponibles y salir
    #[arg(long)]
    pub list_cameras: bool,

    #[arg(long, env = "YOLO_DEVICE", default_value = "/dev/video0")]
    pub device: String,

    /// MJPG o YUYV
    #[arg(long, env = "YOLO_FOURCC", default_value = "MJPG")]
    pub fourcc: String,

    #[arg(long, env = "YOLO_WIDTH", default_value_t = 640)]
    pub width: u32,

    #[arg(long, env = "YOLO_HEIGHT", default_value_t = 480)]
    pub height: u32,

    #[arg(long, env = "YOLO_FPS", default_value_t = 30)]
    pub fps: u32,

    /// Pesos ONNX; por defecto según la tarea
    #[arg(long, env = "YOLO_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "YOLO_IMGSZ", default_value_t = YoloParams::default().input_size)]
    pub imgsz: u32,

    #[arg(long, env = "YOLO_CONF", default_value_t = YoloParams::default().conf_threshold)]
    pub conf: f32,

    #[arg(long, env = "YOLO_IOU", default_value_t = YoloParams::default().iou_threshold)]
    pub iou: f32,

    #[arg(long, env = "YOLO_MAX_DET", default_value_t = YoloParams::default().max_detections)]
    pub max_det: usize,

    /// Fuente TTF/OTF para las etiquetas sobre el vídeo
    #[arg(long, env = "YOLO_FONT")]
    pub font: Option<PathBuf>,

    /// Semilla para los colores por clase
    #[arg(long)]
    pub color_seed: Option<u64>,
}

impl Args {
    pub fn task(&self) -> Task {
        self.task.map(Task::from).unwrap_or(Task::Detect)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            camera: CameraId { path: self.device.clone() },
            mode: CameraMode {
                format: self.fourcc.to_uppercase(),
                size: FrameSize { width: self.width, height: self.height },
                fps: self.fps,
            },
        }
    }

    pub fn inference_config(&self, catalog: &OnnxModelCatalog) -> InferenceConfig {
        let task = self.task();
        InferenceConfig {
            task,
            model: catalog.resolve(task, self.model.as_deref()),
            params: YoloParams {
                input_size: self.imgsz,
                conf_threshold: self.conf,
                iou_threshold: self.iou,
                max_detections: self.max_det,
            },
        }
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions { task: self.task(), flip: !self.no_flip }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("yolo-webcam").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_mirror_and_use_seg_weights() {
        let args = parse(&["detect"]);
        assert_eq!(args.task(), Task::Detect);
        assert!(args.loop_options().flip);

        let infer = args.inference_config(&OnnxModelCatalog::new());
        assert_eq!(infer.model.onnx_path, "models/yolo11n-seg.onnx");
        assert_eq!(infer.params.input_size, 640);
        assert_eq!(infer.params.max_detections, 100);

        let cap = args.capture_config();
        assert_eq!(cap.camera.path, "/dev/video0");
        assert_eq!(cap.mode, CameraMode::default());
    }

    #[test]
    fn spanish_task_names_are_accepted() {
        assert_eq!(parse(&["clasificar"]).task(), Task::Classify);
        assert_eq!(parse(&["detectar"]).task(), Task::Detect);
        assert_eq!(parse(&["segmentar"]).task(), Task::Segment);
        assert_eq!(parse(&["pose"]).task(), Task::Pose);
    }

    #[test]
    fn no_flip_disables_mirroring() {
        let args = parse(&["pose", "--no-flip"]);
        assert!(!args.loop_options().flip);
        assert_eq!(
            args.inference_config(&OnnxModelCatalog::new()).model.onnx_path,
            "models/yolo11n-pose.onnx"
        );
    }

    #[test]
    fn unknown_task_is_rejected() {
        assert!(Args::try_parse_from(["yolo-webcam", "track"]).is_err());
        assert!(Args::try_parse_from(["yolo-webcam"]).is_err());
    }

    #[test]
    fn list_cameras_needs_no_task() {
        let args = parse(&["--list-cameras"]);
        assert!(args.list_cameras);
        assert!(args.task.is_none());
    }

    #[test]
    fn capture_options_are_forwarded() {
        let args = parse(&["segment", "--device", "/dev/video2", "--fourcc", "yuyv", "--width", "1280", "--height", "720"]);
        let cap = args.capture_config();
        assert_eq!(cap.camera.path, "/dev/video2");
        assert_eq!(cap.mode.format, "YUYV");
        assert_eq!(cap.mode.size, FrameSize { width: 1280, height: 720 });
    }
}
