use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No se puede abrir la cámara: {0}")]
    CameraUnavailable(String),
    #[error("No se puede recibir frame: {0}")]
    FrameRead(String),
    #[error("Modo clasificar sin detecciones en el frame")]
    EmptyClassification,
    #[error("Error cargando modelo: {0}")]
    ModelLoad(String),
    #[error("Error de inferencia: {0}")]
    Inference(String),
    #[error("Error de ventana: {0}")]
    Display(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
