// src/core/render/image_writer.rs
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::RasterizerConfig;
use crate::core::call_tree::{CallNode, CallTree};
use crate::error::Result;
use super::rasterizer::Rasterizer;
use super::sequence_writer::SequenceWriter;
use super::DiagramWriter;

/// Writes the bracketed-text diagram, then asks the rasterizer for an image of it
///
/// The text file is the artifact of record; a missing or failing rasterizer
/// only costs the image.
pub struct ImageWriter {
    delegate: SequenceWriter,
    text_path: PathBuf,
    rasterizer: Rasterizer,
}

impl ImageWriter {
    pub fn create(path: &Path, rasterizer: &RasterizerConfig) -> Result<Self> {
        Ok(Self {
            delegate: SequenceWriter::create(path)?,
            text_path: path.to_path_buf(),
            rasterizer: Rasterizer::new(rasterizer),
        })
    }

    fn generate_image(&self) {
        if !self.rasterizer.is_enabled() {
            debug!("Rasterizer disabled, keeping only {}", self.text_path.display());
            return;
        }

        match self.rasterizer.rasterize(&self.text_path) {
            Ok(image) => info!("Diagram image requested at {}", image.display()),
            Err(e) => warn!(
                "Could not rasterize {}: {}",
                self.text_path.display(),
                e
            ),
        }
    }
}

impl DiagramWriter for ImageWriter {
    fn write_header(&mut self, tree: &CallTree, root: &CallNode) -> Result<()> {
        self.delegate.write_header(tree, root)
    }

    fn write_before_children(&mut self, tree: &CallTree, node: &CallNode) -> Result<()> {
        self.delegate.write_before_children(tree, node)
    }

    fn write_after_children(&mut self, tree: &CallTree, node: &CallNode) -> Result<()> {
        self.delegate.write_after_children(tree, node)
    }

    fn write_footer(&mut self, tree: &CallTree, root: &CallNode) -> Result<()> {
        self.delegate.write_footer(tree, root)?;
        // The rasterizer reads the file, so everything must be on disk first.
        self.delegate.flush()?;
        self.generate_image();
        Ok(())
    }

    fn output_path(&self) -> Option<&Path> {
        Some(&self.text_path)
    }

    fn close(&mut self) -> Result<()> {
        self.delegate.close()
    }
}
