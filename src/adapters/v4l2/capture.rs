use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbImage};
use tracing::{debug, info};
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::{CameraPort, FrameStream};
use crate::domain::camera::{CameraId, CameraMode};
use crate::domain::errors::{DomainError, DomainResult};

/// Configuración para inicializar la captura de vídeo.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub camera: CameraId,
    pub mode: CameraMode,
}

impl CaptureConfig {
    fn fourcc(&self) -> DomainResult<FourCC> {
        let b = self.mode.format.as_bytes();
        if b.len() != 4 {
            return Err(DomainError::InvalidInput(format!(
                "FourCC debe tener 4 caracteres: {:?}",
                self.mode.format
            )));
        }
        Ok(FourCC::new(&[b[0], b[1], b[2], b[3]]))
    }
}

/// Cámara V4L2 sin abrir; `open` entrega el flujo de frames.
pub struct V4l2Camera {
    cfg: CaptureConfig,
}

impl V4l2Camera {
    pub fn new(cfg: CaptureConfig) -> Self {
        Self { cfg }
    }
}

impl CameraPort for V4l2Camera {
    type Stream = V4l2Capture;

    fn open(&self) -> DomainResult<V4l2Capture> {
        // Formato inválido antes de tocar el dispositivo
        self.cfg.fourcc()?;
        V4l2Capture::open(&self.cfg)
            .map_err(|e| DomainError::CameraUnavailable(format!("{}: {e:#}", self.cfg.camera.path)))
    }
}

/// Adaptador para la captura física de frames usando V4L2.
pub struct V4l2Capture {
    stream: Stream<'static>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl V4l2Capture {
    /// Abre el dispositivo de cámara y configura el formato y el flujo de memoria mapeada (MMAP).
    pub fn open(cfg: &CaptureConfig) -> Result<Self> {
        let dev = Device::with_path(&cfg.camera.path)
            .with_context(|| format!("abriendo {}", cfg.camera.path))?;

        // 1. Configurar Formato
        let mut fmt = dev.format()?;
        fmt.fourcc = cfg.fourcc()?;
        fmt.width = cfg.mode.size.width;
        fmt.height = cfg.mode.size.height;

        // El driver puede ajustar los valores a los más cercanos soportados
        let actual_fmt = dev.set_format(&fmt)?;

        // 2. Configurar FPS (Frame Interval)
        let mut params = dev.params()?;
        params.interval.numerator = 1;
        params.interval.denominator = cfg.mode.fps;
        let _ = dev.set_params(&params);

        // 3. Inicializar Stream (MMAP)
        // El dispositivo debe vivir tanto como el stream 'static; una sola apertura por ejecución.
        let dev_static: &'static Device = Box::leak(Box::new(dev));
        let stream = Stream::with_buffers(dev_static, v4l::buffer::Type::VideoCapture, 4)?;

        info!(
            "Cámara abierta: {}x{} [{}] a {} FPS",
            actual_fmt.width, actual_fmt.height, actual_fmt.fourcc, cfg.mode.fps
        );

        Ok(Self {
            stream,
            fourcc: actual_fmt.fourcc,
            width: actual_fmt.width,
            height: actual_fmt.height,
        })
    }

    /// Captura el siguiente frame en RGB.
    pub fn next_rgb(&mut self) -> Result<RgbImage> {
        let (data, _) = self.stream.next()?;
        let fcc_str = self.fourcc.str().map_err(|_| anyhow!("FourCC inválido"))?;
        decode_frame(fcc_str, data, self.width, self.height)
    }
}

impl FrameStream for V4l2Capture {
    fn read(&mut self) -> DomainResult<Option<RgbImage>> {
        self.next_rgb()
            .map(Some)
            .map_err(|e| DomainError::FrameRead(format!("{e:#}")))
    }

    fn release(self) {
        // Al soltar el stream se detiene la captura y se desmapean los buffers.
        debug!("Liberando cámara");
        drop(self.stream);
    }
}

fn decode_frame(fourcc: &str, data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    match fourcc {
        // MJPG es básicamente una secuencia de JPEGs
        "MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
        "YUYV" => {
            let expected = (width * height * 2) as usize;
            if data.len() < expected {
                return Err(anyhow!("frame YUYV incompleto: {} de {} bytes", data.len(), expected));
            }
            Ok(yuyv_to_rgb(data, width, height))
        }
        _ => Err(anyhow!("Formato de cámara {} no soportado por este pipeline", fourcc)),
    }
}

/// Convierte un buffer YUYV (YUV 4:2:2) a una RgbImage.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    // Cada bloque de 4 bytes define 2 píxeles: [Y0, U, Y1, V]
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w;
        let y = pixel_idx / w;
        if y >= h {
            break;
        }

        out.put_pixel(x, y, bt601(chunk[0] as f32, u, v));
        if x + 1 < w {
            out.put_pixel(x + 1, y, bt601(chunk[2] as f32, u, v));
        }
    }
    out
}

fn bt601(y: f32, u: f32, v: f32) -> image::Rgb<u8> {
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    image::Rgb([r, g, b])
}
