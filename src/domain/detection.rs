use serde::{Deserialize, Serialize};

/// Caja en píxeles del frame original, esquinas (x1, y1) - (x2, y2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersección sobre unión con otra caja.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Máscara binaria de silueta, fila a fila. Su resolución no tiene por qué
/// coincidir con la del frame: cubre el frame completo y se reescala al pintar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self { width, height, data }
    }

    #[cfg(test)]
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![false; (width * height) as usize])
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    #[cfg(test)]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, score: 1.0 }
    }
}

/// Una instancia reportada por el modelo para un frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: Option<BoundingBox>,
    pub mask: Option<Mask>,
    pub keypoints: Option<Vec<Keypoint>>,
}

impl Detection {
    pub fn new(class_id: usize, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            class_id,
            label: label.into(),
            confidence,
            bbox: None,
            mask: None,
            keypoints: None,
        }
    }

    #[cfg(test)]
    pub fn with_bbox(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Some(BoundingBox { x1, y1, x2, y2 });
        self
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_keypoints(mut self, keypoints: Vec<Keypoint>) -> Self {
        self.keypoints = Some(keypoints);
        self
    }
}
