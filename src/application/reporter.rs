use std::io::{self, Write};

use crate::application::session::PreviousDisplayState;
use crate::domain::stream::ResultLine;

/// Sube el cursor una línea y la borra.
const ERASE_LINE: &str = "\x1b[F\x1b[K";
pub const DEFAULT_COLUMN_WIDTH: usize = 20;

/// Reescribe en la terminal las últimas líneas solo cuando cambian, para no
/// llenar la consola con mensajes continuos.
pub struct ConsoleReporter<W: Write> {
    out: W,
    column_width: usize,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, column_width: DEFAULT_COLUMN_WIDTH }
    }

    #[cfg(test)]
    pub fn with_column_width(mut self, column_width: usize) -> Self {
        self.column_width = column_width;
        self
    }

    /// Devuelve `true` si se escribió algo.
    pub fn report(&mut self, state: &mut PreviousDisplayState, lines: &[ResultLine]) -> io::Result<bool> {
        if state.matches(lines) {
            return Ok(false);
        }

        // Si la lista nueva es más corta quedan restos de la anterior en pantalla.
        for _ in 0..state.lines().len() {
            self.out.write_all(ERASE_LINE.as_bytes())?;
        }
        for line in lines {
            writeln!(self.out, "{:<width$}", line.to_string(), width = self.column_width)?;
        }
        self.out.flush()?;

        state.replace(lines);
        Ok(true)
    }

    #[cfg(test)]
    pub(crate) fn sink_mut(&mut self) -> &mut W {
        &mut self.out
    }
}
