//! Scoped symbol table.

pub mod symbol;

use crate::symbol_table::symbol::Symbol;
use crate::ty::env::TypeEnvironment;
use crate::ty::{Type, TypeId};
use archery::RcK;
use rpds::map::red_black_tree_map::Iter;
use rpds::{RedBlackTreeMap, Vector};

type Frame = RedBlackTreeMap<Type, Vector<Symbol>>;

/// Stack of scope frames, each mapping a type to the symbols of that type.
///
/// Only the top frame is visible and mutable. `push` starts a frame holding everything the
/// current one does, `merge` commits the top frame into the one below and `pop` discards it.
/// Frames are persistent maps so pushing shares structure with the frame below.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    frames: Vec<Frame>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable {
            frames: vec![Frame::new()],
        }
    }
}

impl SymbolTable {
    fn top(&self) -> &Frame {
        self.frames.last().expect("Symbol table has no frames")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("Symbol table has no frames")
    }

    pub fn add(&mut self, symbol: Symbol) {
        let top = self.top_mut();
        let bucket = top.get(symbol.ty()).cloned().unwrap_or_default();
        *top = top.insert(symbol.ty().clone(), bucket.push_back(symbol));
    }

    pub fn remove(&mut self, symbol: &Symbol) {
        let top = self.top_mut();
        if let Some(bucket) = top.get(symbol.ty()) {
            let bucket: Vector<Symbol> = bucket
                .iter()
                .filter(|other| *other != symbol)
                .cloned()
                .collect();
            *top = if bucket.is_empty() {
                top.remove(symbol.ty())
            } else {
                top.insert(symbol.ty().clone(), bucket)
            };
        }
    }

    pub fn get<P: Fn(&Symbol) -> bool>(&self, ty: &Type, predicate: P) -> Vec<Symbol> {
        self.top()
            .get(ty)
            .map(|bucket| bucket.iter().filter(|s| predicate(s)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_all<P: Fn(&Symbol) -> bool>(&self, predicate: P) -> Vec<Symbol> {
        self.top()
            .values()
            .flat_map(|bucket| bucket.iter())
            .filter(|s| predicate(s))
            .cloned()
            .collect()
    }

    /// Symbols owned by `owner` or by any of its ancestors.
    pub fn get_all_combined<P: Fn(&Symbol) -> bool>(
        &self,
        types: &TypeEnvironment,
        owner: TypeId,
        predicate: P,
    ) -> Vec<Symbol> {
        let ancestors = types.ancestors(owner);
        self.get_all(|s| ancestors.contains(&s.owner()) && predicate(s))
    }

    pub fn get_by_name<P: Fn(&Symbol) -> bool>(&self, name: &str, predicate: P) -> Vec<Symbol> {
        self.get_all(|s| s.name() == name && predicate(s))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        let top = self.top().clone();
        self.frames.push(top);
    }

    pub fn merge(&mut self) {
        assert!(
            self.frames.len() > 1,
            "Cannot merge the last symbol table frame"
        );
        let top = self.frames.pop().expect("Symbol table has no frames");
        *self.top_mut() = top;
    }

    pub fn pop(&mut self) {
        assert!(
            self.frames.len() > 1,
            "Cannot pop the last symbol table frame"
        );
        self.frames.pop();
    }

    /// Clears the stack down to a single frame holding only `initial`.
    pub fn remove_all<I: IntoIterator<Item = Symbol>>(&mut self, initial: I) {
        self.frames = vec![Frame::new()];
        for symbol in initial {
            self.add(symbol);
        }
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = (&'a Type, &'a Vector<Symbol>);
    type IntoIter = Iter<'a, Type, Vector<Symbol>, RcK>;

    fn into_iter(self) -> Self::IntoIter {
        self.top().iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::symbol::{FunctionInfo, SymbolFlags, VariableInfo};
    use crate::ty::{ClassFlags, PrimTy};
    use proptest::prelude::*;

    fn variable(name: &str, ty: Type) -> Symbol {
        VariableInfo {
            name: name.to_string(),
            owner: TypeEnvironment::OBJECT,
            ty,
            flags: SymbolFlags::local(),
        }
        .into()
    }

    #[test]
    fn pop_discards_additions() {
        let mut table = SymbolTable::default();
        let s = variable("var_1", PrimTy::Int.into());
        table.push();
        table.add(s.clone());
        table.pop();
        assert!(table.get(s.ty(), |_| true).is_empty());
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn merge_commits_additions() {
        let mut table = SymbolTable::default();
        let s = variable("var_1", PrimTy::Int.into());
        table.push();
        table.add(s.clone());
        table.merge();
        assert_eq!(table.get(s.ty(), |_| true), vec![s]);
    }

    #[test]
    fn pop_keeps_symbols_from_below() {
        let mut table = SymbolTable::default();
        let outer = variable("var_1", PrimTy::Long.into());
        table.add(outer.clone());
        table.push();
        table.remove(&outer);
        assert!(table.get_by_name("var_1", |_| true).is_empty());
        table.pop();
        assert_eq!(table.get_by_name("var_1", |_| true), vec![outer]);
    }

    #[test]
    #[should_panic]
    fn merge_on_last_frame_panics() {
        SymbolTable::default().merge();
    }

    #[test]
    fn combined_lookup_walks_ancestors() {
        let mut types = TypeEnvironment::default();
        let base = types.register("Test_0_Klass_1", &[], ClassFlags::default());
        let derived = types.register("Test_0_Klass_2", &[base], ClassFlags::default());
        let other = types.register("Test_0_Klass_3", &[], ClassFlags::default());
        let mut table = SymbolTable::default();
        for (name, owner) in [("func_1", base), ("func_2", derived), ("func_3", other)] {
            table.add(
                FunctionInfo {
                    name: name.to_string(),
                    owner,
                    return_ty: Type::Void,
                    args: vec![],
                    flags: SymbolFlags::default(),
                    complexity: 1,
                }
                .into(),
            );
        }
        let mut names: Vec<String> = table
            .get_all_combined(&types, derived, Symbol::is_function)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["func_1", "func_2"]);
    }

    #[test]
    fn remove_all_reinstalls_initial_symbols() {
        let mut table = SymbolTable::default();
        table.push();
        table.add(variable("var_1", PrimTy::Int.into()));
        table.remove_all(vec![variable("var_2", PrimTy::Int.into())]);
        assert_eq!(table.depth(), 1);
        let names: Vec<String> = (&table)
            .into_iter()
            .flat_map(|(_, bucket)| bucket.iter().map(|s| s.name().to_string()))
            .collect();
        assert_eq!(names, vec!["var_2"]);
    }

    proptest! {
        #[test]
        fn nested_scopes_follow_commit_rules(commits in proptest::collection::vec(any::<bool>(), 1..8)) {
            let mut table = SymbolTable::default();
            let mut expected = vec![];
            for (i, commit) in commits.iter().enumerate() {
                let s = variable(&format!("var_{}", i), PrimTy::Int.into());
                table.push();
                table.add(s.clone());
                if *commit {
                    table.merge();
                    expected.push(s);
                } else {
                    table.pop();
                }
            }
            prop_assert_eq!(table.get(&PrimTy::Int.into(), |_| true), expected);
        }
    }
}
