use crate::ir::tree::{IrTree, NodeId};
use crate::ir::visitor::{walk_children, Visitor};
use crate::ir::{Literal, LoopDef, NodeKind};
use crate::symbol_table::symbol::{FunctionInfo, SymbolFlags, VariableInfo};
use crate::ty::env::TypeEnvironment;
use crate::ty::{PrimTy, Type, TypeId};

/// Visitor printing a program as a single Java source file.
/// Every compound expression is parenthesized, so operator precedence never matters.
pub struct JavaEmitVisitor<'a> {
    types: &'a TypeEnvironment,
    output: String,
    curr_indent: usize,
    indentation: usize,
}

impl<'a> JavaEmitVisitor<'a> {
    pub fn new(types: &'a TypeEnvironment) -> JavaEmitVisitor<'a> {
        JavaEmitVisitor {
            types,
            output: String::new(),
            curr_indent: 0,
            indentation: 4,
        }
    }

    pub fn output(&self) -> String {
        assert!(
            !self.output.is_empty(),
            "Run visit before accessing emit visitor output"
        );
        self.output.clone()
    }

    fn indent(&mut self) {
        self.output.push_str(&" ".repeat(self.curr_indent));
    }

    fn line(&mut self, line: &str) {
        self.indent();
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn type_name(&self, ty: &Type) -> String {
        self.types.type_name(ty)
    }

    fn class_name(&self, id: TypeId) -> &'a str {
        &self.types.class(id).name
    }

    fn emit_class(&mut self, tree: &IrTree, id: NodeId, class_id: TypeId, is_main: bool) {
        let class = self.types.class(class_id);
        let mut header = String::new();
        if is_main {
            header.push_str("public ");
        }
        if class.is_abstract {
            header.push_str("abstract ");
        }
        if class.is_final {
            header.push_str("final ");
        }
        header.push_str(if class.is_interface {
            "interface "
        } else {
            "class "
        });
        header.push_str(&class.name);
        let (interfaces, superclass): (Vec<TypeId>, Vec<TypeId>) = class
            .parents
            .iter()
            .filter(|parent| **parent != TypeEnvironment::OBJECT)
            .partition(|parent| self.types.class(**parent).is_interface);
        if let Some(superclass) = superclass.first() {
            header.push_str(&format!(" extends {}", self.class_name(*superclass)));
        }
        if !interfaces.is_empty() {
            let names: Vec<&str> = interfaces.iter().map(|id| self.class_name(*id)).collect();
            let keyword = if class.is_interface {
                "extends"
            } else {
                "implements"
            };
            header.push_str(&format!(" {} {}", keyword, names.join(", ")));
        }
        header.push_str(" {");
        self.line(&header);
        self.enter_scope();
        walk_children(self, tree, id);
        self.exit_scope();
        self.line("}");
    }

    fn signature(&self, function: &FunctionInfo) -> String {
        let args: Vec<String> = function
            .args
            .iter()
            .map(|arg| format!("{} {}", self.type_name(&arg.ty), arg.name))
            .collect();
        format!(
            "{}{}{}{} {}({})",
            function.flags.access.modifier(),
            if function.flags.is_static { "static " } else { "" },
            if function.flags.is_abstract {
                "abstract "
            } else {
                ""
            },
            self.type_name(&function.return_ty),
            function.name,
            args.join(", ")
        )
    }

    /// `{`, the statements of `block`, then `}` on its own line without a newline.
    fn emit_block(&mut self, tree: &IrTree, block: NodeId) {
        self.output.push_str("{\n");
        self.enter_scope();
        walk_children(self, tree, block);
        self.exit_scope();
        self.indent();
        self.output.push('}');
    }

    fn emit_variable(&mut self, tree: &IrTree, id: NodeId, var: &VariableInfo) {
        self.indent();
        if !var.flags.is_local {
            self.output.push_str(var.flags.access.modifier());
            if var.flags.is_static {
                self.output.push_str("static ");
            }
        }
        if var.flags.is_final {
            self.output.push_str("final ");
        }
        self.output
            .push_str(&format!("{} {} = ", self.type_name(&var.ty), var.name));
        self.emit_expr(tree, tree.children(id)[0], true);
        self.output.push_str(";\n");
    }

    fn emit_loop(&mut self, tree: &IrTree, id: NodeId) {
        let body = tree.children(id)[0];
        match tree.kind(id) {
            NodeKind::For(LoopDef {
                counter,
                iterations,
            }) => {
                self.indent();
                self.output.push_str(&format!(
                    "for (int {0} = 0; {0} < {1}; {0}++) ",
                    counter, iterations
                ));
                self.emit_block(tree, body);
                self.output.push('\n');
            }
            NodeKind::While(LoopDef {
                counter,
                iterations,
            }) => {
                self.line(&format!("int {} = 0;", counter));
                self.indent();
                self.output
                    .push_str(&format!("while ({} < {}) ", counter, iterations));
                self.emit_counted_body(tree, body, counter);
                self.output.push('\n');
            }
            NodeKind::DoWhile(LoopDef {
                counter,
                iterations,
            }) => {
                self.line(&format!("int {} = 0;", counter));
                self.indent();
                self.output.push_str("do ");
                self.emit_counted_body(tree, body, counter);
                self.output
                    .push_str(&format!(" while ({} < {});\n", counter, iterations));
            }
            kind => unreachable!("Not a loop: {:?}", kind),
        }
    }

    /// Loop body that increments `counter` before anything else, so `continue` cannot skip it.
    fn emit_counted_body(&mut self, tree: &IrTree, body: NodeId, counter: &str) {
        self.output.push_str("{\n");
        self.enter_scope();
        self.line(&format!("{}++;", counter));
        walk_children(self, tree, body);
        self.exit_scope();
        self.indent();
        self.output.push('}');
    }

    fn emit_switch(&mut self, tree: &IrTree, id: NodeId, labels: &[i32], has_default: bool) {
        let children = tree.children(id);
        self.indent();
        self.output.push_str("switch (");
        self.emit_expr(tree, children[0], true);
        self.output.push_str(") {\n");
        self.enter_scope();
        for (label, block) in labels.iter().zip(&children[1..]) {
            self.indent();
            self.output.push_str(&format!("case {}: ", label));
            self.emit_block(tree, *block);
            self.output.push_str(" break;\n");
        }
        if has_default {
            if let Some(block) = children.get(labels.len() + 1) {
                self.indent();
                self.output.push_str("default: ");
                self.emit_block(tree, *block);
                self.output.push('\n');
            }
        }
        self.exit_scope();
        self.line("}");
    }

    fn emit_print(&mut self, owner: TypeId, fields: &[VariableInfo]) {
        self.line("public void print() {");
        self.enter_scope();
        for field in fields {
            let access = if field.flags.is_static {
                format!("{}.{}", self.class_name(owner), field.name)
            } else {
                format!("this.{}", field.name)
            };
            let value = match &field.ty {
                Type::Prim(PrimTy::Char) => format!("((int) {})", access),
                Type::Prim(_) | Type::Class(TypeEnvironment::STRING) => access,
                Type::Array(array) if array.dims == 1 => {
                    format!("java.util.Arrays.toString({})", access)
                }
                Type::Array(_) => format!("java.util.Arrays.deepToString({})", access),
                Type::Class(_) | Type::Void => {
                    format!("(({} == null) ? \"null\" : \"not null\")", access)
                }
            };
            self.line(&format!(
                "System.out.println(\"{} = \" + {});",
                field.name, value
            ));
        }
        self.exit_scope();
        self.line("}");
    }

    fn emit_main(&mut self, owner: TypeId) {
        let name = self.class_name(owner).to_string();
        let lines = [
            "public static void main(String[] args) {".to_string(),
            format!("    {} instance;", name),
            "    try {".to_string(),
            format!("        instance = new {}();", name),
            "    } catch (Throwable e) {".to_string(),
            "        System.out.println(e.getClass().getName());".to_string(),
            "        return;".to_string(),
            "    }".to_string(),
            "    try {".to_string(),
            "        instance.test();".to_string(),
            "    } catch (Throwable e) {".to_string(),
            "        System.out.println(e.getClass().getName());".to_string(),
            "    }".to_string(),
            "    instance.print();".to_string(),
            "}".to_string(),
        ];
        for line in lines {
            self.line(&line);
        }
    }

    /// Writes the expression `id`. Only `top` level expressions are left unparenthesized, since
    /// Java rejects parenthesized expression statements.
    fn emit_expr(&mut self, tree: &IrTree, id: NodeId, top: bool) {
        let children = tree.children(id);
        let (open, close) = if top { ("", "") } else { ("(", ")") };
        match tree.kind(id) {
            NodeKind::Literal(literal) => self.output.push_str(&literal_to_java(literal)),
            NodeKind::LocalVariable(var) => self.output.push_str(&var.name),
            NodeKind::StaticMemberVariable(var) => {
                let owner = self.class_name(var.owner).to_string();
                self.output.push_str(&format!("{}.{}", owner, var.name));
            }
            NodeKind::NonStaticMemberVariable(var) => {
                self.emit_expr(tree, children[0], false);
                self.output.push('.');
                self.output.push_str(&var.name);
            }
            NodeKind::This => self.output.push_str("this"),
            NodeKind::BinaryOperator(op) => {
                self.output.push_str(open);
                if op.is_assignment() {
                    self.emit_expr(tree, children[0], true);
                } else {
                    self.emit_expr(tree, children[0], false);
                }
                self.output.push_str(&format!(" {} ", op.symbol()));
                self.emit_expr(tree, children[1], false);
                self.output.push_str(close);
            }
            NodeKind::UnaryOperator(op) => {
                self.output.push_str(open);
                let operand_top = op.is_update();
                if op.is_prefix() {
                    self.output.push_str(op.symbol());
                    self.emit_expr(tree, children[0], operand_top);
                } else {
                    self.emit_expr(tree, children[0], operand_top);
                    self.output.push_str(op.symbol());
                }
                self.output.push_str(close);
            }
            NodeKind::Cast => {
                let ty = self.type_name(tree.ty(id));
                self.output.push_str(&format!("(({}) ", ty));
                self.emit_expr(tree, children[0], false);
                self.output.push(')');
            }
            NodeKind::Ternary => {
                self.output.push('(');
                self.emit_expr(tree, children[0], false);
                self.output.push_str(" ? ");
                self.emit_expr(tree, children[1], false);
                self.output.push_str(" : ");
                self.emit_expr(tree, children[2], false);
                self.output.push(')');
            }
            NodeKind::FunctionCall { info, has_receiver } => {
                let args = if *has_receiver {
                    self.emit_expr(tree, children[0], false);
                    &children[1..]
                } else {
                    let owner = self.class_name(info.owner).to_string();
                    self.output.push_str(&owner);
                    children
                };
                self.output.push_str(&format!(".{}", info.name));
                self.emit_args(tree, args);
            }
            NodeKind::ConstructorCall(info) => {
                let owner = self.class_name(info.owner).to_string();
                self.output.push_str(&format!("new {}", owner));
                self.emit_args(tree, children);
            }
            NodeKind::ArrayCreation { lengths } => {
                let (elem, dims) = match tree.ty(id) {
                    Type::Array(array) => (self.type_name(&array.elem), array.dims),
                    ty => (self.type_name(ty), 0),
                };
                self.output.push_str(open);
                self.output.push_str(&format!("new {}", elem));
                for length in lengths.iter().take(dims) {
                    self.output.push_str(&format!("[{}]", length));
                }
                self.output.push_str(close);
            }
            NodeKind::ArrayElement => {
                self.emit_expr(tree, children[0], false);
                self.output.push('[');
                self.emit_expr(tree, children[1], true);
                self.output.push(']');
            }
            kind => unreachable!("Not an expression: {:?}", kind),
        }
    }

    fn emit_args(&mut self, tree: &IrTree, args: &[NodeId]) {
        self.output.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.emit_expr(tree, *arg, true);
        }
        self.output.push(')');
    }
}

impl<'a> Visitor for JavaEmitVisitor<'a> {
    fn enter_scope(&mut self) {
        self.curr_indent += self.indentation;
    }
    fn exit_scope(&mut self) {
        self.curr_indent -= self.indentation;
    }

    fn visit_class(&mut self, tree: &IrTree, id: NodeId) {
        match tree.kind(id) {
            NodeKind::ClassDefinitionBlock => {
                for class in tree.children(id) {
                    self.visit_node(tree, *class);
                    self.output.push('\n');
                }
            }
            NodeKind::Klass(class) => self.emit_class(tree, id, *class, false),
            NodeKind::MainKlass(class) => self.emit_class(tree, id, *class, true),
            kind => unreachable!("Not a class: {:?}", kind),
        }
    }

    fn visit_member(&mut self, tree: &IrTree, id: NodeId) {
        match tree.kind(id) {
            NodeKind::VariableDeclarationBlock => walk_children(self, tree, id),
            NodeKind::FunctionDefinitionBlock => {
                for function in tree.children(id) {
                    self.output.push('\n');
                    self.visit_node(tree, *function);
                }
            }
            NodeKind::FunctionDefinition(function) => {
                let signature = self.signature(function);
                self.indent();
                self.output.push_str(&signature);
                self.output.push(' ');
                self.emit_block(tree, tree.children(id)[0]);
                self.output.push('\n');
            }
            NodeKind::FunctionDeclaration(function) => {
                let signature = self.signature(&FunctionInfo {
                    flags: SymbolFlags {
                        is_abstract: true,
                        ..function.flags
                    },
                    ..function.clone()
                });
                self.line(&format!("{};", signature));
            }
            NodeKind::PrintVariables(fields) => self.emit_print(tree.get(id).owner, fields),
            NodeKind::MainMethod => self.emit_main(tree.get(id).owner),
            kind => unreachable!("Not a member: {:?}", kind),
        }
    }

    fn visit_stmt(&mut self, tree: &IrTree, id: NodeId) {
        let children = tree.children(id);
        match tree.kind(id) {
            NodeKind::Block => {
                self.indent();
                self.emit_block(tree, id);
                self.output.push('\n');
            }
            NodeKind::Statement => {
                self.indent();
                self.emit_expr(tree, children[0], true);
                self.output.push_str(";\n");
            }
            NodeKind::VariableDeclaration(var) => self.emit_variable(tree, id, var),
            NodeKind::If => {
                self.indent();
                self.output.push_str("if (");
                self.emit_expr(tree, children[0], true);
                self.output.push_str(") ");
                self.emit_block(tree, children[1]);
                if let Some(otherwise) = children.get(2) {
                    self.output.push_str(" else ");
                    self.emit_block(tree, *otherwise);
                }
                self.output.push('\n');
            }
            NodeKind::Switch {
                labels,
                has_default,
            } => self.emit_switch(tree, id, labels, *has_default),
            NodeKind::For(_) | NodeKind::While(_) | NodeKind::DoWhile(_) => {
                self.emit_loop(tree, id)
            }
            NodeKind::Break => self.line("break;"),
            NodeKind::Continue => self.line("continue;"),
            NodeKind::Return => match children.first() {
                Some(value) => {
                    self.indent();
                    self.output.push_str("return ");
                    self.emit_expr(tree, *value, true);
                    self.output.push_str(";\n");
                }
                None => self.line("return;"),
            },
            NodeKind::Nothing => {}
            kind => unreachable!("Not a statement: {:?}", kind),
        }
    }

    fn visit_expr(&mut self, tree: &IrTree, id: NodeId) {
        self.emit_expr(tree, id, false);
    }
}

/// Java literal for `literal`. Negative values are parenthesized, narrow integral types are
/// written as casts of int literals.
pub fn literal_to_java(literal: &Literal) -> String {
    let parenthesize = |value: String| {
        if value.starts_with('-') {
            format!("({})", value)
        } else {
            value
        }
    };
    match literal {
        Literal::Boolean(value) => value.to_string(),
        Literal::Integral(value, PrimTy::Long) => parenthesize(format!("{}L", value)),
        Literal::Integral(value, prim @ (PrimTy::Byte | PrimTy::Short | PrimTy::Char)) => {
            format!("(({}) {})", prim, parenthesize(value.to_string()))
        }
        Literal::Integral(value, _) => parenthesize(value.to_string()),
        Literal::Floating(value, PrimTy::Float) => parenthesize(format!("{:?}f", value)),
        Literal::Floating(value, _) => parenthesize(format!("{:?}d", value)),
        Literal::String(value) => format!("\"{}\"", escape(value)),
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders a lone expression, mostly useful for logging and tests.
pub fn expr_to_java(types: &TypeEnvironment, tree: &IrTree, id: NodeId) -> String {
    let mut visitor = JavaEmitVisitor::new(types);
    visitor.emit_expr(tree, id, true);
    visitor.output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::ir::op::{BinaryOp, UnaryOp};
    use crate::policy::Policy;

    fn local(name: &str, ty: Type) -> VariableInfo {
        VariableInfo {
            name: name.to_string(),
            owner: TypeEnvironment::OBJECT,
            ty,
            flags: SymbolFlags::local(),
        }
    }

    fn leaf(tree: &mut IrTree, kind: NodeKind, ty: Type) -> NodeId {
        tree.node(kind, ty, TypeEnvironment::OBJECT, 0, vec![])
    }

    #[test]
    fn literals() {
        assert_eq!(literal_to_java(&Literal::Integral(-3, PrimTy::Int)), "(-3)");
        assert_eq!(literal_to_java(&Literal::Integral(7, PrimTy::Long)), "7L");
        assert_eq!(
            literal_to_java(&Literal::Integral(-1, PrimTy::Byte)),
            "((byte) (-1))"
        );
        assert_eq!(literal_to_java(&Literal::Integral(65, PrimTy::Char)), "((char) 65)");
        assert_eq!(literal_to_java(&Literal::Floating(1.5, PrimTy::Float)), "1.5f");
        assert_eq!(literal_to_java(&Literal::Floating(-2.0, PrimTy::Double)), "(-2.0d)");
        assert_eq!(literal_to_java(&Literal::Boolean(true)), "true");
        assert_eq!(
            literal_to_java(&Literal::String("a\"b".to_string())),
            "\"a\\\"b\""
        );
    }

    #[test]
    fn nested_expressions_are_parenthesized() {
        let types = TypeEnvironment::default();
        let mut tree = IrTree::default();
        let int: Type = PrimTy::Int.into();
        let x = local("x", int.clone());
        let target = leaf(&mut tree, NodeKind::LocalVariable(x.clone()), int.clone());
        let operand = leaf(&mut tree, NodeKind::LocalVariable(x.clone()), int.clone());
        let update = tree.node(
            NodeKind::UnaryOperator(UnaryOp::PostInc),
            int.clone(),
            TypeEnvironment::OBJECT,
            0,
            vec![operand],
        );
        let one = leaf(&mut tree, NodeKind::Literal(Literal::Integral(-1, PrimTy::Int)), int.clone());
        let sum = tree.node(
            NodeKind::BinaryOperator(BinaryOp::Add),
            int.clone(),
            TypeEnvironment::OBJECT,
            0,
            vec![update, one],
        );
        let assign = tree.node(
            NodeKind::BinaryOperator(BinaryOp::Assign),
            int,
            TypeEnvironment::OBJECT,
            0,
            vec![target, sum],
        );
        assert_eq!(expr_to_java(&types, &tree, assign), "x = ((x++) + (-1))");
    }

    #[test]
    fn casts_wrap_their_operand() {
        let types = TypeEnvironment::default();
        let mut tree = IrTree::default();
        let value = leaf(
            &mut tree,
            NodeKind::Literal(Literal::Floating(2.5, PrimTy::Double)),
            PrimTy::Double.into(),
        );
        let cast = tree.node(
            NodeKind::Cast,
            PrimTy::Int.into(),
            TypeEnvironment::OBJECT,
            0,
            vec![value],
        );
        assert_eq!(expr_to_java(&types, &tree, cast), "((int) 2.5d)");
    }

    #[test]
    fn indexed_array_creations_are_parenthesized() {
        let types = TypeEnvironment::default();
        let mut tree = IrTree::default();
        let array = leaf(
            &mut tree,
            NodeKind::ArrayCreation {
                lengths: vec![1, 2],
            },
            Type::array(PrimTy::Long.into(), 2),
        );
        let index = leaf(
            &mut tree,
            NodeKind::Literal(Literal::Integral(0, PrimTy::Int)),
            PrimTy::Int.into(),
        );
        let element = tree.node(
            NodeKind::ArrayElement,
            Type::array(PrimTy::Long.into(), 1),
            TypeEnvironment::OBJECT,
            0,
            vec![array, index],
        );
        assert_eq!(expr_to_java(&types, &tree, element), "(new long[1][2])[0]");
        assert_eq!(expr_to_java(&types, &tree, array), "new long[1][2]");
    }

    #[test]
    fn programs_have_entry_points() {
        let mut generator = Generator::new(&Policy::default()).unwrap();
        let program = generator.generate(11).unwrap();
        let source = program.java_source();
        assert!(source.contains(&format!("public class {} {{", program.name)));
        assert!(source.contains("public static void main(String[] args) {"));
        assert!(source.contains("public void print() {"));
        assert!(source.contains("public void test() {"));
        assert_eq!(source.matches('{').count(), source.matches('}').count());
    }
}
