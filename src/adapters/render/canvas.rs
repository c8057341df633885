use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::{Context, Result};
use image::{imageops::FilterType, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::info;

use crate::application::ports::{Canvas, FrameRenderer};
use crate::domain::detection::Mask;

/// Altura en píxeles del texto a escala 1.0.
const FONT_BASE_PX: f32 = 30.0;

/// DejaVu Sans, embebida en el binario (licencia en `assets/`).
static BUNDLED_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans.ttf");

pub fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT).context("fuente embebida inválida")
}

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path).with_context(|| format!("leyendo fuente {}", path.display()))?;
    let font = FontArc::try_from_vec(bytes).context("fuente TTF/OTF inválida")?;
    info!("Fuente cargada: {}", path.display());
    Ok(font)
}

/// `--font` si se indicó, si no la fuente embebida.
pub fn resolve_font(path: Option<&Path>) -> Result<FontArc> {
    match path {
        Some(path) => load_font(path),
        None => bundled_font(),
    }
}

/// Crea canvas `imageproc` sobre cada frame.
pub struct ImageRenderer {
    font: FontArc,
}

impl ImageRenderer {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }

    #[cfg(test)]
    pub fn with_bundled_font() -> Result<Self> {
        Ok(Self::new(bundled_font()?))
    }
}

impl FrameRenderer for ImageRenderer {
    type Canvas = ImageCanvas;

    fn begin(&self, frame: RgbImage) -> ImageCanvas {
        ImageCanvas { image: frame, font: self.font.clone() }
    }

    fn finish(&self, canvas: ImageCanvas) -> RgbImage {
        canvas.image
    }
}

pub struct ImageCanvas {
    image: RgbImage,
    font: FontArc,
}

/// Reescala la máscara al tamaño del frame (vecino más cercano) y la vuelve a binarizar.
fn resize_mask(mask: &Mask, width: u32, height: u32) -> GrayImage {
    let gray = GrayImage::from_fn(mask.width, mask.height, |x, y| {
        Luma([if mask.get(x, y) { 255 } else { 0 }])
    });
    if (mask.width, mask.height) == (width, height) {
        return gray;
    }
    image::imageops::resize(&gray, width, height, FilterType::Nearest)
}

fn blend(pixel: &mut Rgb<u8>, color: Rgb<u8>, alpha: f32) {
    for (p, c) in pixel.0.iter_mut().zip(color.0) {
        *p = (alpha * c as f32 + (1.0 - alpha) * *p as f32).round().clamp(0.0, 255.0) as u8;
    }
}

impl Canvas for ImageCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn draw_rect(&mut self, top_left: (i32, i32), bottom_right: (i32, i32), color: Rgb<u8>, thickness: u32) {
        let (x1, x2) = (top_left.0.min(bottom_right.0), top_left.0.max(bottom_right.0));
        let (y1, y2) = (top_left.1.min(bottom_right.1), top_left.1.max(bottom_right.1));
        // Grosor hacia fuera, un borde de 1px por paso.
        for k in 0..thickness.max(1) as i32 {
            let w = (x2 - x1 + 2 * k + 1) as u32;
            let h = (y2 - y1 + 2 * k + 1) as u32;
            draw_hollow_rect_mut(&mut self.image, Rect::at(x1 - k, y1 - k).of_size(w, h), color);
        }
    }

    fn draw_text(&mut self, origin: (i32, i32), text: &str, color: Rgb<u8>, scale: f32) {
        let font = &self.font;
        let px = PxScale::from(FONT_BASE_PX * scale);
        let ascent = font.as_scaled(px).ascent();
        let top = origin.1 - ascent.round() as i32;
        draw_text_mut(&mut self.image, color, origin.0, top, px, font, text);
    }

    fn fill_circle(&mut self, center: (i32, i32), radius: i32, color: Rgb<u8>) {
        draw_filled_circle_mut(&mut self.image, center, radius, color);
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb<u8>, thickness: u32) {
        let (dx, dy) = ((to.0 - from.0).abs(), (to.1 - from.1).abs());
        let t = thickness.max(1) as i32;
        for k in 0..t {
            let off = (k - (t - 1) / 2) as f32;
            // Desplazar en el eje perpendicular dominante.
            let (ox, oy) = if dy > dx { (off, 0.0) } else { (0.0, off) };
            draw_line_segment_mut(
                &mut self.image,
                (from.0 as f32 + ox, from.1 as f32 + oy),
                (to.0 as f32 + ox, to.1 as f32 + oy),
                color,
            );
        }
    }

    fn blend_mask(&mut self, mask: &Mask, color: Rgb<u8>, alpha: f32) {
        let (width, height) = self.image.dimensions();
        let resized = resize_mask(mask, width, height);
        for (pixel, m) in self.image.pixels_mut().zip(resized.pixels()) {
            if m.0[0] > 0 {
                blend(pixel, color, alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn canvas(frame: RgbImage) -> ImageCanvas {
        ImageRenderer::with_bundled_font().unwrap().begin(frame)
    }

    fn noise(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7 + y) as u8, (y * 13) as u8, (x ^ y) as u8]))
    }

    #[test]
    fn empty_mask_leaves_frame_untouched() {
        let frame = noise(64, 48);
        let mut canvas = canvas(frame.clone());
        canvas.blend_mask(&Mask::empty(16, 16), RED, 0.4);
        assert_eq!(&canvas.image, &frame);
    }

    #[test]
    fn full_mask_blends_with_alpha() {
        let frame = RgbImage::from_pixel(8, 8, Rgb([100, 200, 50]));
        let mut canvas = canvas(frame);
        canvas.blend_mask(&Mask::new(2, 2, vec![true; 4]), RED, 0.4);
        // 0.4 * 255 + 0.6 * 100 = 162, 0.6 * 200 = 120, 0.6 * 50 = 30
        assert!(canvas.image.pixels().all(|p| *p == Rgb([162, 120, 30])));
    }

    #[test]
    fn mask_is_stretched_to_frame_with_nearest_neighbour() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let mut canvas = canvas(frame);
        // Solo el cuadrante superior izquierdo
        canvas.blend_mask(&Mask::new(2, 2, vec![true, false, false, false]), RED, 1.0);
        for (x, y, p) in canvas.image.enumerate_pixels() {
            let inside = x < 2 && y < 2;
            assert_eq!(*p == RED, inside, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn rect_outline_is_drawn_with_thickness() {
        let mut canvas = canvas(RgbImage::new(20, 20));
        canvas.draw_rect((5, 5), (14, 14), RED, 2);
        let img = &canvas.image;
        assert_eq!(*img.get_pixel(5, 5), RED);
        assert_eq!(*img.get_pixel(4, 4), RED);
        assert_eq!(*img.get_pixel(14, 10), RED);
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn rect_partially_outside_is_clipped() {
        let mut canvas = canvas(RgbImage::new(10, 10));
        canvas.draw_rect((-5, -5), (30, 4), RED, 2);
        assert_eq!(*canvas.image.get_pixel(3, 4), RED);
    }

    #[test]
    fn circle_and_line_paint_pixels() {
        let mut canvas = canvas(RgbImage::new(40, 40));
        canvas.fill_circle((10, 10), 5, RED);
        canvas.draw_line((20, 30), (35, 30), Rgb([0, 0, 255]), 2);
        let img = &canvas.image;
        assert_eq!(*img.get_pixel(10, 10), RED);
        assert_eq!(*img.get_pixel(13, 10), RED);
        assert_eq!(*img.get_pixel(25, 30), Rgb([0, 0, 255]));
        assert_eq!(*img.get_pixel(25, 31), Rgb([0, 0, 255]));
        assert_eq!(*img.get_pixel(25, 33), Rgb([0, 0, 0]));
    }

    #[test]
    fn bundled_font_draws_classify_label_above_baseline() {
        let frame = RgbImage::new(200, 60);
        let mut canvas = canvas(frame.clone());
        canvas.draw_text((10, 30), "cat: 87%", Rgb([0, 255, 0]), 1.0);
        assert_ne!(&canvas.image, &frame);
        // El texto queda sobre la línea base y a la derecha del origen
        for (x, y, p) in canvas.image.enumerate_pixels() {
            if p.0 != [0, 0, 0] {
                assert!(x >= 9, "pixel ({x}, {y})");
                assert!(y <= 33, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(resolve_font(Some(Path::new("/no/such/font.ttf"))).is_err());
        assert!(resolve_font(None).is_ok());
    }

    #[test]
    fn renderer_round_trips_the_frame() {
        let renderer = ImageRenderer::with_bundled_font().unwrap();
        let frame = noise(8, 8);
        let canvas = renderer.begin(frame.clone());
        assert_eq!(canvas.dimensions(), (8, 8));
        assert_eq!(renderer.finish(canvas), frame);
    }
}
