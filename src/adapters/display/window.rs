use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{debug, info};

use crate::application::ports::DisplayPort;
use crate::domain::errors::{DomainError, DomainResult};

/// Ventana de escritorio (minifb). Se crea con el primer frame y se recrea si
/// cambia la resolución.
pub struct MinifbDisplay {
    window: Option<Window>,
    size: (usize, usize),
    buffer: Vec<u32>,
}

impl MinifbDisplay {
    pub fn new() -> Self {
        Self { window: None, size: (0, 0), buffer: Vec::new() }
    }

    fn ensure_window(&mut self, name: &str, width: usize, height: usize) -> DomainResult<&mut Window> {
        if self.window.is_none() || self.size != (width, height) {
            let mut window = Window::new(name, width, height, WindowOptions::default())
                .map_err(|e| DomainError::Display(e.to_string()))?;
            // La cadencia la marca la cámara.
            window.set_target_fps(0);
            info!("Ventana '{}' abierta: {}x{}", name, width, height);
            self.window = Some(window);
            self.size = (width, height);
        }
        self.window
            .as_mut()
            .ok_or_else(|| DomainError::Display("ventana no inicializada".into()))
    }
}

impl Default for MinifbDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// RGB8 -> 0RGB empaquetado, el formato que espera minifb.
fn pack_rgb(frame: &RgbImage, out: &mut Vec<u32>) {
    out.clear();
    out.extend(
        frame
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
    );
}

fn key_to_char(key: Key) -> Option<char> {
    match key {
        Key::Q => Some('q'),
        Key::Escape => Some('\u{1b}'),
        _ => None,
    }
}

impl DisplayPort for MinifbDisplay {
    fn show(&mut self, window_name: &str, frame: &RgbImage) -> DomainResult<()> {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        let mut buffer = std::mem::take(&mut self.buffer);
        pack_rgb(frame, &mut buffer);

        let window = self.ensure_window(window_name, w, h)?;
        let res = window
            .update_with_buffer(&buffer, w, h)
            .map_err(|e| DomainError::Display(e.to_string()));
        self.buffer = buffer;
        res
    }

    fn poll_key(&mut self) -> Option<char> {
        let window = self.window.as_ref()?;
        window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .find_map(key_to_char)
    }

    fn close_all_windows(&mut self) {
        if self.window.take().is_some() {
            debug!("Ventana cerrada");
        }
    }

    fn is_open(&self) -> bool {
        self.window.as_ref().map_or(true, Window::is_open)
    }
}
