use image::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::domain::stream::ResultLine;

/// Color fijo por clase durante toda la ejecución. Solo inserta, nunca
/// reasigna ni borra.
pub struct ClassColorTable {
    colors: HashMap<usize, Rgb<u8>>,
    rng: StdRng,
}

impl ClassColorTable {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self { colors: HashMap::new(), rng }
    }

    pub fn color_for(&mut self, class_id: usize) -> Rgb<u8> {
        let rng = &mut self.rng;
        *self
            .colors
            .entry(class_id)
            .or_insert_with(|| Rgb([rng.gen(), rng.gen(), rng.gen()]))
    }

    #[cfg(test)]
    pub fn get(&self, class_id: usize) -> Option<Rgb<u8>> {
        self.colors.get(&class_id).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ClassColorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Último contenido escrito en la terminal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviousDisplayState {
    lines: Vec<ResultLine>,
}

impl PreviousDisplayState {
    pub fn lines(&self) -> &[ResultLine] {
        &self.lines
    }

    pub fn matches(&self, lines: &[ResultLine]) -> bool {
        self.lines.as_slice() == lines
    }

    pub fn replace(&mut self, lines: &[ResultLine]) {
        self.lines = lines.to_vec();
    }
}

/// Estado de una ejecución, creado una vez y pasado al bucle de frames.
#[derive(Default)]
pub struct Session {
    pub colors: ClassColorTable,
    pub display: PreviousDisplayState,
}

impl Session {
    pub fn new(color_seed: Option<u64>) -> Self {
        let colors = match color_seed {
            Some(seed) => ClassColorTable::with_seed(seed),
            None => ClassColorTable::new(),
        };
        Self { colors, display: PreviousDisplayState::default() }
    }
}
