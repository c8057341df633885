use image::{Rgb, RgbImage};

use crate::domain::{camera::CameraInfo, detection::{Detection, Mask}, errors::DomainResult};

/// Fuente de vídeo: `open` entrega un flujo o falla con `CameraUnavailable`.
pub trait CameraPort {
    type Stream: FrameStream;

    fn open(&self) -> DomainResult<Self::Stream>;
}

pub trait FrameStream {
    /// `Ok(None)` indica fin de flujo.
    fn read(&mut self) -> DomainResult<Option<RgbImage>>;

    /// Libera el dispositivo. Por defecto basta con soltar el flujo.
    fn release(self)
    where
        Self: Sized,
    {
    }
}

pub trait CameraCatalogPort {
    fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>>;
}

/// Modelo de visión preentrenado, tratado como caja negra.
pub trait DetectorPort {
    /// Detecciones ordenadas por confianza descendente.
    fn infer(&mut self, frame: &RgbImage) -> DomainResult<Vec<Detection>>;
}

pub trait DisplayPort {
    fn show(&mut self, window_name: &str, frame: &RgbImage) -> DomainResult<()>;
    fn poll_key(&mut self) -> Option<char>;
    fn close_all_windows(&mut self);

    fn is_open(&self) -> bool {
        true
    }
}

/// Envuelve un frame en un `Canvas` y lo recupera una vez anotado.
pub trait FrameRenderer {
    type Canvas: Canvas;

    fn begin(&self, frame: RgbImage) -> Self::Canvas;
    fn finish(&self, canvas: Self::Canvas) -> RgbImage;
}

/// Superficie de dibujo sobre un frame RGB. Las coordenadas son píxeles del
/// frame y pueden caer fuera de él; la implementación recorta.
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);
    fn draw_rect(&mut self, top_left: (i32, i32), bottom_right: (i32, i32), color: Rgb<u8>, thickness: u32);
    /// `origin` es la esquina inferior izquierda del texto (línea base).
    fn draw_text(&mut self, origin: (i32, i32), text: &str, color: Rgb<u8>, scale: f32);
    fn fill_circle(&mut self, center: (i32, i32), radius: i32, color: Rgb<u8>);
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb<u8>, thickness: u32);
    /// Mezcla `color` con opacidad `alpha` sobre los píxeles de la máscara,
    /// reescalada antes al tamaño del frame.
    fn blend_mask(&mut self, mask: &Mask, color: Rgb<u8>, alpha: f32);
}
