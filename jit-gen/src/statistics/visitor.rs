use crate::ir::tree::{IrTree, NodeId};
use crate::ir::visitor::{walk_children, walk_node, Visitor};
use crate::ir::NodeKind;
use crate::statistics::program::ProgramStatistics;

/// Counts the nodes of a program by kind.
#[derive(Default)]
pub struct StatisticsVisitor {
    statistics: ProgramStatistics,
}

impl StatisticsVisitor {
    pub fn into_statistics(self) -> ProgramStatistics {
        self.statistics
    }

    fn count_operator(&mut self, symbol: &str) {
        *self
            .statistics
            .operator_counter
            .entry(symbol.to_string())
            .or_insert(0) += 1;
    }
}

impl Visitor for StatisticsVisitor {
    fn visit_node(&mut self, tree: &IrTree, id: NodeId) {
        let kind = tree.kind(id);
        if !matches!(kind, NodeKind::Nothing) {
            *self
                .statistics
                .node_counter
                .entry(kind.name().to_string())
                .or_insert(0) += 1;
            self.statistics.total_nodes += 1;
        }
        walk_node(self, tree, id);
    }

    fn visit_expr(&mut self, tree: &IrTree, id: NodeId) {
        match tree.kind(id) {
            NodeKind::BinaryOperator(op) => self.count_operator(op.symbol()),
            NodeKind::UnaryOperator(op) => self.count_operator(op.symbol()),
            _ => {}
        }
        walk_children(self, tree, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::op::BinaryOp;
    use crate::ir::Literal;
    use crate::ty::env::TypeEnvironment;
    use crate::ty::{PrimTy, Type};

    #[test]
    fn counts_every_node_once() {
        let mut tree = IrTree::default();
        let int: Type = PrimTy::Int.into();
        let owner = TypeEnvironment::OBJECT;
        let left = tree.node(
            NodeKind::Literal(Literal::Integral(1, PrimTy::Int)),
            int.clone(),
            owner,
            0,
            vec![],
        );
        let right = tree.node(
            NodeKind::Literal(Literal::Integral(2, PrimTy::Int)),
            int.clone(),
            owner,
            0,
            vec![],
        );
        let sum = tree.node(
            NodeKind::BinaryOperator(BinaryOp::Add),
            int,
            owner,
            0,
            vec![left, right],
        );
        let stmt = tree.node(NodeKind::Statement, Type::Void, owner, 0, vec![sum]);
        let skipped = tree.node(NodeKind::Nothing, Type::Void, owner, 0, vec![]);
        let block = tree.node(NodeKind::Block, Type::Void, owner, 0, vec![stmt, skipped]);

        let mut visitor = StatisticsVisitor::default();
        visitor.visit_node(&tree, block);
        let statistics = visitor.into_statistics();
        assert_eq!(statistics.total_nodes, 5);
        assert_eq!(statistics.node_counter["Literal"], 2);
        assert_eq!(statistics.node_counter["Block"], 1);
        assert!(!statistics.node_counter.contains_key("Nothing"));
        assert_eq!(statistics.operator_counter["+"], 1);
    }
}
