pub mod decode;
pub mod labels;
pub mod model_catalog;
pub mod yolo_engine;
