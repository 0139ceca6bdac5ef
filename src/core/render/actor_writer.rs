// src/core/render/actor_writer.rs
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::call_tree::{CallNode, CallTree};
use crate::error::Result;
use super::output::DiagramOutput;
use super::DiagramWriter;

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageType {
    Call,
    Return,
}

impl MessageType {
    fn as_str(self) -> &'static str {
        match self {
            MessageType::Call => "call",
            MessageType::Return => "return",
        }
    }
}

/// XML writer with an actor section (one actor per owning type) and a
/// message section (a `call` and a `return` per non-root node)
pub struct ActorWriter<W: Write + Send = BufWriter<File>> {
    output: DiagramOutput<W>,
    /// Owning types already declared as actors
    defined_actors: HashSet<String>,
    actors: Vec<String>,
    messages: Vec<String>,
}

impl ActorWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::with_output(DiagramOutput::create(path)?))
    }
}

impl<W: Write + Send> ActorWriter<W> {
    pub fn new(sink: W) -> Self {
        Self::with_output(DiagramOutput::from_writer(sink))
    }

    fn with_output(output: DiagramOutput<W>) -> Self {
        Self {
            output,
            defined_actors: HashSet::new(),
            actors: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.output.into_inner()
    }

    fn declare_actor(&mut self, node: &CallNode) {
        if !self.defined_actors.insert(node.owning_type().to_string()) {
            return;
        }
        let actor_type = if node.is_root() { "user" } else { "system" };
        self.actors.push(format!(
            "<actor id=\"{}\" type=\"{}\">{}</actor>",
            escape_xml(node.owning_type()),
            actor_type,
            escape_xml(node.simple_type_name())
        ));
    }

    fn push_message(&mut self, tree: &CallTree, node: &CallNode, kind: MessageType) {
        let Some(parent) = tree.parent_of(node) else {
            return;
        };
        let (from, to) = match kind {
            MessageType::Call => (parent.owning_type(), node.owning_type()),
            MessageType::Return => (node.owning_type(), parent.owning_type()),
        };
        self.messages.push(format!(
            "<message type=\"{}\" from=\"{}\" to=\"{}\" text=\"{}\"/>",
            kind.as_str(),
            escape_xml(from),
            escape_xml(to),
            escape_xml(&message_text(node))
        ));
    }
}

impl<W: Write + Send> DiagramWriter for ActorWriter<W> {
    fn write_header(&mut self, _tree: &CallTree, _root: &CallNode) -> Result<()> {
        self.output.write_line(HEADER)?;
        self.output.write_line("<sequence>")
    }

    fn write_before_children(&mut self, tree: &CallTree, node: &CallNode) -> Result<()> {
        self.declare_actor(node);
        self.push_message(tree, node, MessageType::Call);
        Ok(())
    }

    fn write_after_children(&mut self, tree: &CallTree, node: &CallNode) -> Result<()> {
        self.push_message(tree, node, MessageType::Return);
        Ok(())
    }

    fn write_footer(&mut self, _tree: &CallTree, _root: &CallNode) -> Result<()> {
        self.output.write_line("<actors>")?;
        for actor in std::mem::take(&mut self.actors) {
            self.output.write_line(&actor)?;
        }
        self.output.write_line("</actors>")?;

        self.output.write_line("<messages>")?;
        for message in std::mem::take(&mut self.messages) {
            self.output.write_line(&message)?;
        }
        self.output.write_line("</messages>")?;

        self.output.write_line("</sequence>")
    }

    fn output_path(&self) -> Option<&Path> {
        self.output.path()
    }

    fn close(&mut self) -> Result<()> {
        self.output.close()
    }
}

/// `member(T1,T2)`
fn message_text(node: &CallNode) -> String {
    format!("{}({})", node.member_name(), node.parameter_types().join(","))
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
