use crate::generator::GeneratedProgram;
use crate::ir::tree::{IrTree, NodeId};
use crate::ir::NodeCategory;

/// IR visitor trait.
/// The default implementation visits every node in source order.
pub trait Visitor: Sized {
    fn enter_scope(&mut self) {}
    fn exit_scope(&mut self) {}

    fn visit_program(&mut self, program: &GeneratedProgram) {
        walk_program(self, program);
    }

    fn visit_node(&mut self, tree: &IrTree, id: NodeId) {
        walk_node(self, tree, id);
    }

    fn visit_class(&mut self, tree: &IrTree, id: NodeId) {
        walk_children(self, tree, id);
    }
    fn visit_member(&mut self, tree: &IrTree, id: NodeId) {
        walk_children(self, tree, id);
    }
    fn visit_stmt(&mut self, tree: &IrTree, id: NodeId) {
        walk_children(self, tree, id);
    }
    fn visit_expr(&mut self, tree: &IrTree, id: NodeId) {
        walk_children(self, tree, id);
    }
}

pub fn walk_program<V: Visitor>(visitor: &mut V, program: &GeneratedProgram) {
    if let Some(private_classes) = program.private_classes {
        visitor.visit_node(&program.tree, private_classes);
    }
    visitor.visit_node(&program.tree, program.main);
}

pub fn walk_node<V: Visitor>(visitor: &mut V, tree: &IrTree, id: NodeId) {
    match tree.kind(id).category() {
        NodeCategory::Class => visitor.visit_class(tree, id),
        NodeCategory::Member => visitor.visit_member(tree, id),
        NodeCategory::Statement => visitor.visit_stmt(tree, id),
        NodeCategory::Expression => visitor.visit_expr(tree, id),
    }
}

pub fn walk_children<V: Visitor>(visitor: &mut V, tree: &IrTree, id: NodeId) {
    for child in tree.children(id) {
        visitor.visit_node(tree, *child);
    }
}
