pub mod display;
pub mod onnx;
pub mod render;
pub mod v4l2;
