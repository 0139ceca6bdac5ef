// src/core/render/output.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{TraceError, Result};

/// Line-oriented sink shared by the diagram writers
pub struct DiagramOutput<W: Write> {
    path: Option<PathBuf>,
    sink: W,
    closed: bool,
}

impl DiagramOutput<BufWriter<File>> {
    /// Open (truncate) the diagram file; fails fast when the target is unreachable
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| TraceError::OutputTarget {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            sink: BufWriter::new(file),
            closed: false,
        })
    }
}

impl<W: Write> DiagramOutput<W> {
    pub fn from_writer(sink: W) -> Self {
        Self {
            path: None,
            sink,
            closed: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            return Err(TraceError::Render("diagram output already closed".to_string()));
        }
        self.sink.write_all(line.as_bytes())?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and refuse further writes; closing twice is a no-op
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
