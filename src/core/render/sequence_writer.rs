// src/core/render/sequence_writer.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::call_tree::{CallNode, CallTree};
use crate::error::Result;
use super::output::DiagramOutput;
use super::DiagramWriter;

/// Bracketed-text writer
///
/// ```text
/// ActorClass.actorMethodWithParams(java.lang.String str) -> void{
/// Class1.method1Class1() -> void;
/// }
/// ```
pub struct SequenceWriter<W: Write + Send = BufWriter<File>> {
    output: DiagramOutput<W>,
}

impl SequenceWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            output: DiagramOutput::create(path)?,
        })
    }
}

impl<W: Write + Send> SequenceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            output: DiagramOutput::from_writer(sink),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()
    }

    pub fn into_inner(self) -> W {
        self.output.into_inner()
    }

    /// `Simple.[static]member(T1 n1,T2 n2) -> Ret` without the trailing `{` or `;`
    pub fn node_line(node: &CallNode) -> String {
        let mut line = String::new();
        line.push_str(node.simple_type_name());
        line.push('.');
        if node.is_static() {
            line.push_str("[static]");
        }
        line.push_str(node.member_name());
        line.push('(');
        let params = node
            .parameters()
            .map(|(ty, name)| format!("{} {}", ty, name))
            .collect::<Vec<_>>()
            .join(",");
        line.push_str(&params);
        line.push_str(") -> ");
        match node.return_type() {
            Some(ret) => line.push_str(crate::core::call_tree::raw_simple_name(ret)),
            None => line.push_str("void"),
        }
        line
    }
}

impl<W: Write + Send> DiagramWriter for SequenceWriter<W> {
    fn write_header(&mut self, _tree: &CallTree, _root: &CallNode) -> Result<()> {
        Ok(())
    }

    fn write_before_children(&mut self, _tree: &CallTree, node: &CallNode) -> Result<()> {
        let mut line = Self::node_line(node);
        line.push(if node.has_children() { '{' } else { ';' });
        self.output.write_line(&line)
    }

    fn write_after_children(&mut self, _tree: &CallTree, node: &CallNode) -> Result<()> {
        if node.has_children() {
            self.output.write_line("}")?;
        }
        Ok(())
    }

    fn write_footer(&mut self, _tree: &CallTree, _root: &CallNode) -> Result<()> {
        Ok(())
    }

    fn output_path(&self) -> Option<&Path> {
        self.output.path()
    }

    fn close(&mut self) -> Result<()> {
        self.output.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call_tree::MethodSignature;

    fn render(tree: &CallTree) -> String {
        let mut writer = SequenceWriter::new(Vec::new());
        writer.render(tree).unwrap();
        writer.close().unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_actor_method_with_params() {
        let mut tree = CallTree::new(
            &MethodSignature::method("org.aoplib4j.uml.ActorClass", "actorMethodWithParams")
                .param("java.lang.String", "str"),
        );
        tree.enter(&MethodSignature::method("org.aoplib4j.uml.Class1", "method1Class1"), 2);
        tree.exit();

        assert_eq!(
            render(&tree),
            "ActorClass.actorMethodWithParams(java.lang.String str) -> void{\n\
             Class1.method1Class1() -> void;\n\
             }\n"
        );
    }

    #[test]
    fn test_static_leaf_root_with_return_type() {
        let tree = CallTree::new(
            &MethodSignature::method("p.ActorClass", "staticMethod")
                .with_static()
                .param("int", "a")
                .param("java.lang.String", "b")
                .returning("java.lang.Integer"),
        );

        assert_eq!(
            render(&tree),
            "ActorClass.[static]staticMethod(int a,java.lang.String b) -> Integer;\n"
        );
    }

    #[test]
    fn test_generic_return_type_is_erased() {
        let tree = CallTree::new(
            &MethodSignature::method("a.b.Registry", "lookup")
                .param("int", "key")
                .returning("java.util.Optional<a.b.Entry>"),
        );
        assert_eq!(render(&tree), "Registry.lookup(int key) -> Optional;\n");
    }

    #[test]
    fn test_nested_brackets() {
        let mut tree = CallTree::new(&MethodSignature::method("p.A", "a"));
        tree.enter(&MethodSignature::method("p.B", "b"), 5);
        tree.enter(&MethodSignature::constructor("p.C"), 5);
        tree.exit();
        tree.exit();
        tree.enter(&MethodSignature::method("p.D", "d"), 5);
        tree.exit();

        assert_eq!(
            render(&tree),
            "A.a() -> void{\nB.b() -> void{\nC.new() -> void;\n}\nD.d() -> void;\n}\n"
        );
    }
}
