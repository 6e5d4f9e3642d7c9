use crate::ir::{Node, NodeKind};
use crate::ty::{Type, TypeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Arena of IR nodes. Children are owned by their parent, the parent link is a plain index.
#[derive(Debug, Clone, Default)]
pub struct IrTree {
    nodes: Vec<Node>,
}

impl IrTree {
    /// Creates a node adopting `children`, which must not belong to another node yet.
    pub fn node(
        &mut self,
        kind: NodeKind,
        ty: Type,
        owner: TypeId,
        level: usize,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        for child in &children {
            self.adopt(id, *child);
        }
        self.nodes.push(Node {
            kind,
            ty,
            owner,
            parent: None,
            children,
            level,
        });
        id
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        let child = &mut self.nodes[child.0];
        assert!(
            child.parent.is_none(),
            "Node {:?} already belongs to {:?}",
            child.kind,
            child.parent
        );
        child.parent = Some(parent);
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.adopt(parent, child);
        self.nodes[parent.0].children.push(child);
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn ty(&self, id: NodeId) -> &Type {
        &self.nodes[id.0].ty
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forgets every node created after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(len);
        for node in &mut self.nodes {
            if matches!(node.parent, Some(parent) if parent.0 >= len) {
                node.parent = None;
            }
            node.children.retain(|child| child.0 < len);
        }
    }

    /// Pre-order list of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut res = vec![];
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            res.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        res
    }

    pub fn complexity(&self, id: NodeId) -> usize {
        let node = self.get(id);
        let children: usize = node
            .children
            .iter()
            .map(|child| self.complexity(*child))
            .sum();
        match &node.kind {
            NodeKind::Nothing
            | NodeKind::PrintVariables(_)
            | NodeKind::MainMethod
            | NodeKind::FunctionDeclaration(_) => 0,
            NodeKind::ClassDefinitionBlock
            | NodeKind::Klass(_)
            | NodeKind::MainKlass(_)
            | NodeKind::VariableDeclarationBlock
            | NodeKind::FunctionDefinitionBlock
            | NodeKind::FunctionDefinition(_)
            | NodeKind::Block => children,
            NodeKind::For(def) | NodeKind::While(def) | NodeKind::DoWhile(def) => {
                1 + def.iterations.saturating_mul(children)
            }
            NodeKind::FunctionCall { info, .. } | NodeKind::ConstructorCall(info) => {
                1 + children + info.complexity
            }
            _ => 1 + children,
        }
    }

    /// Whether the node opens a new control-flow level: a control structure or a block
    /// nested directly in another block.
    pub fn is_cfg_deviation(&self, id: NodeId) -> bool {
        let node = self.get(id);
        match node.kind {
            NodeKind::Block => {
                matches!(node.parent, Some(parent) if matches!(self.kind(parent), NodeKind::Block))
            }
            ref kind => kind.is_control_flow(),
        }
    }

    /// Highest control-flow level inside the subtree.
    pub fn count_depth(&self, id: NodeId) -> usize {
        self.descendants(id)
            .into_iter()
            .map(|node| self.get(node).level)
            .max()
            .unwrap_or(0)
    }

    /// Control-flow deviations strictly below `id` sitting at exactly `depth`.
    pub fn get_deviant_blocks(&self, id: NodeId, depth: usize) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .skip(1)
            .filter(|node| self.get(*node).level == depth && self.is_cfg_deviation(*node))
            .collect()
    }

    /// Detaches the node from its parent. The node stays in the arena, unreachable.
    pub fn remove_self(&mut self, id: NodeId) {
        let parent = match self.get(id).parent {
            Some(parent) => parent,
            None => panic!("Cannot remove root node {:?}", self.kind(id)),
        };
        self.nodes[parent.0].children.retain(|child| *child != id);
        self.nodes[id.0].parent = None;
    }

    /// Removes the deepest deviant blocks of every node exceeding `max_depth`, one at a time,
    /// until it fits. Returns whether every node ended within the bound.
    pub fn try_to_reduce_nodes_depth(&mut self, nodes: &[NodeId], max_depth: usize) -> bool {
        let mut reduced = true;
        for node in nodes {
            loop {
                let depth = self.count_depth(*node);
                if depth <= max_depth {
                    break;
                }
                match self.get_deviant_blocks(*node, depth).first() {
                    Some(deviant) => self.remove_self(*deviant),
                    None => {
                        reduced = false;
                        break;
                    }
                }
            }
        }
        reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Literal, LoopDef};
    use crate::ty::env::TypeEnvironment;
    use crate::ty::PrimTy;

    const OWNER: TypeId = TypeEnvironment::OBJECT;

    fn literal(tree: &mut IrTree, level: usize) -> NodeId {
        tree.node(
            NodeKind::Literal(Literal::Integral(1, PrimTy::Int)),
            PrimTy::Int.into(),
            OWNER,
            level,
            vec![],
        )
    }

    fn statement(tree: &mut IrTree, level: usize) -> NodeId {
        let expr = literal(tree, level);
        tree.node(NodeKind::Statement, Type::Void, OWNER, level, vec![expr])
    }

    /// `if` nested `depth` times, each then-branch holding one statement.
    fn nested_ifs(tree: &mut IrTree, depth: usize) -> NodeId {
        let mut inner = vec![statement(tree, depth)];
        for level in (1..=depth).rev() {
            let cond = literal(tree, level);
            let then = tree.node(NodeKind::Block, Type::Void, OWNER, level, inner);
            let if_node = tree.node(NodeKind::If, Type::Void, OWNER, level, vec![cond, then]);
            inner = vec![if_node];
        }
        tree.node(NodeKind::Block, Type::Void, OWNER, 0, inner)
    }

    #[test]
    fn complexity_sums_children() {
        let mut tree = IrTree::default();
        let body = nested_ifs(&mut tree, 2);
        // two ifs, two conditions, one statement with its literal
        assert_eq!(tree.complexity(body), 6);
    }

    #[test]
    fn loop_multiplies_body() {
        let mut tree = IrTree::default();
        let stmt = statement(&mut tree, 1);
        let body = tree.node(NodeKind::Block, Type::Void, OWNER, 1, vec![stmt]);
        let def = LoopDef {
            counter: "var_1".to_string(),
            iterations: 5,
        };
        let for_node = tree.node(NodeKind::For(def), Type::Void, OWNER, 1, vec![body]);
        assert_eq!(tree.complexity(for_node), 11);
    }

    #[test]
    fn depth_and_deviants() {
        let mut tree = IrTree::default();
        let body = nested_ifs(&mut tree, 3);
        assert_eq!(tree.count_depth(body), 3);
        let deviants = tree.get_deviant_blocks(body, 3);
        assert_eq!(deviants.len(), 1);
        assert_eq!(tree.kind(deviants[0]), &NodeKind::If);
        assert!(tree.get_deviant_blocks(body, 0).is_empty());
    }

    #[test]
    fn nested_block_is_deviation() {
        let mut tree = IrTree::default();
        let stmt = statement(&mut tree, 1);
        let inner = tree.node(NodeKind::Block, Type::Void, OWNER, 1, vec![stmt]);
        let outer = tree.node(NodeKind::Block, Type::Void, OWNER, 0, vec![inner]);
        assert!(tree.is_cfg_deviation(inner));
        assert!(!tree.is_cfg_deviation(outer));
        assert_eq!(tree.get_deviant_blocks(outer, 1), vec![inner]);
    }

    #[test]
    fn reduce_depth_removes_deepest_blocks() {
        let mut tree = IrTree::default();
        let body = nested_ifs(&mut tree, 4);
        let before = tree.complexity(body);
        assert!(tree.try_to_reduce_nodes_depth(&[body], 2));
        assert_eq!(tree.count_depth(body), 2);
        assert!(tree.complexity(body) < before);
    }

    #[test]
    fn reduce_depth_reports_failure() {
        let mut tree = IrTree::default();
        let stmt = statement(&mut tree, 2);
        assert!(!tree.try_to_reduce_nodes_depth(&[stmt], 1));
        assert!(tree.try_to_reduce_nodes_depth(&[stmt], 2));
    }

    #[test]
    #[should_panic]
    fn remove_root_panics() {
        let mut tree = IrTree::default();
        let node = literal(&mut tree, 0);
        tree.remove_self(node);
    }

    #[test]
    #[should_panic]
    fn child_cannot_have_two_parents() {
        let mut tree = IrTree::default();
        let node = literal(&mut tree, 0);
        tree.node(NodeKind::Statement, Type::Void, OWNER, 0, vec![node]);
        tree.node(NodeKind::Statement, Type::Void, OWNER, 0, vec![node]);
    }

    #[test]
    fn truncate_forgets_new_nodes() {
        let mut tree = IrTree::default();
        let block = tree.node(NodeKind::Block, Type::Void, OWNER, 0, vec![]);
        let len = tree.len();
        let stmt = statement(&mut tree, 0);
        tree.add_child(block, stmt);
        tree.truncate(len);
        assert_eq!(tree.len(), 1);
        assert!(tree.children(block).is_empty());
    }
}
