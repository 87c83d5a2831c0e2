use std::io::Write;

use crate::error::{HarvestError, Result};

/// Receives each page's payload, once per page, in arrival order.
pub trait PageSink {
    fn emit(&mut self, payload: &str) -> Result<()>;
}

/// Prints each payload on its own line.
pub struct WriterSink<W> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> PageSink for WriterSink<W> {
    fn emit(&mut self, payload: &str) -> Result<()> {
        writeln!(self.out, "{payload}").map_err(HarvestError::Output)?;
        self.out.flush().map_err(HarvestError::Output)
    }
}

impl PageSink for Vec<String> {
    fn emit(&mut self, payload: &str) -> Result<()> {
        self.push(payload.to_string());
        Ok(())
    }
}
