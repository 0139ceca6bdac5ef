// src/core/render/mod.rs
//! Diagram writers
//!
//! Every writer walks the finished tree with the same depth-first template:
//! header, then for each node a "before children" hook, its subtree and an
//! "after children" hook, then the footer. Writers only differ in the hooks.

mod actor_writer;
mod image_writer;
mod output;
mod rasterizer;
mod sequence_writer;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RasterizerConfig;
use crate::core::call_tree::{CallNode, CallTree, NodeId};
use crate::error::Result;

pub use actor_writer::ActorWriter;
pub use image_writer::ImageWriter;
pub use output::DiagramOutput;
pub use rasterizer::{Rasterizer, RasterizerCommand, INPUT_PLACEHOLDER};
pub use sequence_writer::SequenceWriter;

/// Renders a finished `CallTree`
pub trait DiagramWriter: Send {
    fn write_header(&mut self, tree: &CallTree, root: &CallNode) -> Result<()>;

    fn write_before_children(&mut self, tree: &CallTree, node: &CallNode) -> Result<()>;

    fn write_after_children(&mut self, tree: &CallTree, node: &CallNode) -> Result<()>;

    fn write_footer(&mut self, tree: &CallTree, root: &CallNode) -> Result<()>;

    /// File the diagram goes to, if it is file-backed
    fn output_path(&self) -> Option<&Path>;

    /// Flush and release the output
    fn close(&mut self) -> Result<()>;

    /// Depth-first traversal calling the hooks above; the first write error aborts it
    fn render(&mut self, tree: &CallTree) -> Result<()> {
        let root = tree.root();
        self.write_header(tree, root)?;

        let mut stack: Vec<(NodeId, bool)> = vec![(root.id(), false)];
        while let Some((id, visited)) = stack.pop() {
            let node = tree.node(id);
            if visited {
                self.write_after_children(tree, node)?;
                continue;
            }
            self.write_before_children(tree, node)?;
            stack.push((id, true));
            stack.extend(node.children().iter().rev().map(|child| (*child, false)));
        }

        self.write_footer(tree, root)
    }
}

/// Diagram format selected for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Bracketed text
    #[default]
    #[serde(alias = "seq", alias = "sequence")]
    #[value(alias = "seq")]
    Text,
    /// XML actors and messages
    #[serde(alias = "xml")]
    #[value(alias = "xml")]
    Structured,
    /// Bracketed text plus a rasterized image
    #[serde(alias = "png")]
    #[value(alias = "png")]
    Image,
}

impl RendererKind {
    /// Extension of the file the writer produces
    pub fn file_extension(self) -> &'static str {
        match self {
            RendererKind::Text | RendererKind::Image => "txt",
            RendererKind::Structured => "xml",
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RendererKind::Text => "text",
            RendererKind::Structured => "structured",
            RendererKind::Image => "image",
        };
        f.write_str(name)
    }
}

/// Open the output and build the writer for `kind`
pub fn create_writer(
    kind: RendererKind,
    path: &Path,
    rasterizer: &RasterizerConfig,
) -> Result<Box<dyn DiagramWriter>> {
    debug!("Creating {} diagram writer for {}", kind, path.display());

    let writer: Box<dyn DiagramWriter> = match kind {
        RendererKind::Text => Box::new(SequenceWriter::create(path)?),
        RendererKind::Structured => Box::new(ActorWriter::create(path)?),
        RendererKind::Image => Box::new(ImageWriter::create(path, rasterizer)?),
    };
    Ok(writer)
}
