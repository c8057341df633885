use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Par (etiqueta, confianza) que se pinta en el frame y se imprime en consola.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLine {
    pub label: String,
    pub confidence: f32,
}

impl ResultLine {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self { label: label.into(), confidence }
    }

    /// Porcentaje truncado, 0.87 -> 87.
    pub fn percent(&self) -> u32 {
        (self.confidence * 100.0).floor().max(0.0) as u32
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}%", self.label, self.percent())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMeta {
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub lines: Vec<ResultLine>,
}

pub fn summarize_detections(lines: &[ResultLine]) -> String {
    let mut counts = BTreeMap::new();
    for line in lines {
        *counts.entry(line.label.as_str()).or_insert(0) += 1;
    }
    counts.iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
