use crate::ty::{ClassFlags, ClassInfo, PrimTy, Type, TypeId};
use std::collections::BTreeMap;

pub const OBJECT_NAME: &str = "java.lang.Object";
pub const STRING_NAME: &str = "java.lang.String";

/// Registry of every reference type known to the generator, with the cast rules between types.
///
/// Classes live in an arena indexed by [`TypeId`]. Parent and child edges are id lists.
#[derive(Debug, Clone)]
pub struct TypeEnvironment {
    classes: Vec<ClassInfo>,
    by_name: BTreeMap<String, TypeId>,
    session_prefix: String,
}

impl TypeEnvironment {
    pub const OBJECT: TypeId = TypeId(0);
    pub const STRING: TypeId = TypeId(1);

    pub fn new(session_prefix: &str) -> TypeEnvironment {
        let mut env = TypeEnvironment {
            classes: vec![],
            by_name: BTreeMap::new(),
            session_prefix: session_prefix.to_string(),
        };
        env.register(OBJECT_NAME, &[], ClassFlags::default());
        env.register(
            STRING_NAME,
            &[],
            ClassFlags {
                is_final: true,
                ..ClassFlags::default()
            },
        );
        env
    }

    pub fn session_prefix(&self) -> &str {
        &self.session_prefix
    }

    /// Adds a reference type. Registering an existing name returns the existing id.
    /// Every class other than the root object type descends from it.
    pub fn register(&mut self, name: &str, parents: &[TypeId], flags: ClassFlags) -> TypeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = TypeId(self.classes.len() as u32);
        let mut parents = parents.to_vec();
        if parents.is_empty() && !self.classes.is_empty() {
            parents.push(TypeEnvironment::OBJECT);
        }
        for parent in &parents {
            self.classes[parent.index()].children.push(id);
        }
        self.classes.push(ClassInfo {
            name: name.to_string(),
            parents,
            children: vec![],
            is_final: flags.is_final,
            is_abstract: flags.is_abstract,
            is_interface: flags.is_interface,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn find(&self, name: &str) -> Option<Type> {
        self.find_class(name).map(Type::Class)
    }

    pub fn find_class(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, id: TypeId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = (TypeId, &ClassInfo)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, class)| (TypeId(i as u32), class))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Drops every class registered after the first `len`, together with the edges pointing at them.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.classes.len() {
            return;
        }
        for class in self.classes.drain(len..) {
            self.by_name.remove(&class.name);
        }
        for class in &mut self.classes {
            class.children.retain(|child| child.index() < len);
        }
    }

    pub fn is_builtin(&self, ty: &Type) -> bool {
        match ty {
            Type::Void | Type::Prim(_) => true,
            Type::Class(id) => *id == TypeEnvironment::OBJECT || *id == TypeEnvironment::STRING,
            Type::Array(_) => false,
        }
    }

    pub fn is_reference(&self, ty: &Type) -> bool {
        matches!(ty, Type::Class(_) | Type::Array(_))
    }

    pub fn is_session_type(&self, id: TypeId) -> bool {
        self.class(id).name.starts_with(&self.session_prefix)
    }

    /// Reflexive, transitive subtype relation.
    pub fn is_subclass(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup || sup == TypeEnvironment::OBJECT {
            return true;
        }
        self.class(sub)
            .parents
            .iter()
            .any(|parent| self.is_subclass(*parent, sup))
    }

    /// The class itself followed by all its ancestors, without duplicates.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut res = vec![id];
        let mut i = 0;
        while i < res.len() {
            for parent in &self.class(res[i]).parents {
                if !res.contains(parent) {
                    res.push(*parent);
                }
            }
            i += 1;
        }
        res
    }

    pub fn can_implicitly_cast(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return !from.is_void();
        }
        match (from, to) {
            (Type::Prim(from), Type::Prim(to)) => from.widens_to(to),
            (Type::Class(from), Type::Class(to)) => self.is_subclass(*from, *to),
            (Type::Array(_), Type::Class(to)) => *to == TypeEnvironment::OBJECT,
            (Type::Array(from), Type::Array(to)) => {
                from.dims == to.dims
                    && matches!((&*from.elem, &*to.elem), (Type::Class(_), Type::Class(_)))
                    && self.can_implicitly_cast(&from.elem, &to.elem)
            }
            _ => false,
        }
    }

    pub fn can_explicitly_cast(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return !from.is_void();
        }
        match (from, to) {
            (Type::Prim(from), Type::Prim(to)) => {
                *from != PrimTy::Boolean && *to != PrimTy::Boolean
            }
            (Type::Class(from), Type::Class(to)) => {
                self.is_subclass(*from, *to) || self.is_subclass(*to, *from)
            }
            (Type::Array(_), Type::Class(id)) | (Type::Class(id), Type::Array(_)) => {
                *id == TypeEnvironment::OBJECT
            }
            (Type::Array(_), Type::Array(_)) => self.can_implicitly_cast(from, to),
            _ => false,
        }
    }

    /// Operands of `<`, `<=`, `>` and `>=`.
    pub fn can_compare(&self, a: &Type, b: &Type) -> bool {
        if self.is_reference(a) || self.is_reference(b) {
            return true;
        }
        a.is_numeric() && b.is_numeric()
    }

    /// Operands of `==` and `!=`.
    pub fn can_equate(&self, a: &Type, b: &Type) -> bool {
        if self.is_reference(a) || self.is_reference(b) {
            return true;
        }
        (a.is_boolean() && b.is_boolean()) || (a.is_numeric() && b.is_numeric())
    }

    /// Removes every class created by generation. Built-in and imported classes survive,
    /// session classes are recognised by their name prefix.
    pub fn reset_to_builtins(&mut self) {
        let mut remap: Vec<Option<TypeId>> = Vec::with_capacity(self.classes.len());
        let mut kept = 0;
        for (id, _) in self.classes() {
            let protected = id == TypeEnvironment::OBJECT || id == TypeEnvironment::STRING;
            if protected || !self.is_session_type(id) {
                remap.push(Some(TypeId(kept)));
                kept += 1;
            } else {
                remap.push(None);
            }
        }
        let classes = std::mem::take(&mut self.classes);
        self.by_name.clear();
        for (class, new_id) in classes.into_iter().zip(&remap) {
            if let Some(new_id) = new_id {
                let update = |ids: &[TypeId]| -> Vec<TypeId> {
                    ids.iter().filter_map(|id| remap[id.index()]).collect()
                };
                self.by_name.insert(class.name.clone(), *new_id);
                self.classes.push(ClassInfo {
                    parents: update(&class.parents),
                    children: update(&class.children),
                    ..class
                });
            }
        }
    }

    /// Name of the type as written in Java source.
    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Void => "void".to_string(),
            Type::Prim(prim) => prim.to_string(),
            Type::Class(id) => self.class(*id).name.clone(),
            Type::Array(array) => format!("{}{}", self.type_name(&array.elem), "[]".repeat(array.dims)),
        }
    }

    /// JVM descriptor of the type, e.g. `[[I` or `Ljava/lang/String;`.
    pub fn descriptor(&self, ty: &Type) -> String {
        match ty {
            Type::Void => "V".to_string(),
            Type::Prim(prim) => prim.descriptor().to_string(),
            Type::Class(id) => format!("L{};", self.class(*id).name.replace('.', "/")),
            Type::Array(array) => format!("{}{}", "[".repeat(array.dims), self.descriptor(&array.elem)),
        }
    }
}

impl Default for TypeEnvironment {
    fn default() -> Self {
        TypeEnvironment::new("Test_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::PrimTy::*;
    use proptest::prelude::*;

    fn prim() -> impl Strategy<Value = PrimTy> {
        proptest::sample::select(PrimTy::all().to_vec())
    }

    proptest! {
        #[test]
        fn cast_order_totality(a in prim(), b in prim()) {
            prop_assume!(a != b);
            let env = TypeEnvironment::default();
            let forward = env.can_implicitly_cast(&a.into(), &b.into());
            let backward = env.can_implicitly_cast(&b.into(), &a.into());
            if matches!(a, Boolean | Char) || matches!(b, Boolean | Char) {
                prop_assert!(!forward && !backward);
            } else {
                prop_assert!(forward ^ backward);
            }
        }

        #[test]
        fn explicit_cast_never_targets_boolean(a in prim()) {
            let env = TypeEnvironment::default();
            prop_assert_eq!(env.can_explicitly_cast(&a.into(), &Boolean.into()), a == Boolean);
        }
    }

    #[test]
    fn widening_follows_capacity() {
        let env = TypeEnvironment::default();
        assert!(env.can_implicitly_cast(&Byte.into(), &Double.into()));
        assert!(env.can_implicitly_cast(&Long.into(), &Float.into()));
        assert!(!env.can_implicitly_cast(&Int.into(), &Short.into()));
        assert!(!env.can_implicitly_cast(&Char.into(), &Int.into()));
        assert!(env.can_explicitly_cast(&Double.into(), &Char.into()));
        assert!(!env.can_explicitly_cast(&Boolean.into(), &Int.into()));
    }

    #[test]
    fn class_hierarchy_casts() {
        let mut env = TypeEnvironment::default();
        let base = env.register("Test_0_Klass_1", &[], ClassFlags::default());
        let derived = env.register("Test_0_Klass_2", &[base], ClassFlags::default());
        let (base, derived) = (Type::Class(base), Type::Class(derived));
        let object = Type::Class(TypeEnvironment::OBJECT);

        assert!(env.can_implicitly_cast(&derived, &base));
        assert!(env.can_implicitly_cast(&derived, &object));
        assert!(!env.can_implicitly_cast(&base, &derived));
        assert!(env.can_explicitly_cast(&base, &derived));
        assert!(!env.can_explicitly_cast(&Type::Class(TypeEnvironment::STRING), &derived));
        assert!(env.can_equate(&base, &Int.into()));
        assert!(env.can_compare(&derived, &base));
        assert!(!env.can_equate(&Boolean.into(), &Int.into()));
    }

    #[test]
    fn reset_keeps_builtin_and_imported_types() {
        let mut env = TypeEnvironment::default();
        let math = env.register("java.lang.Math", &[], ClassFlags::default());
        let session = env.register("Test_3", &[], ClassFlags::default());
        env.register("Test_3_Klass_4", &[session], ClassFlags::default());
        env.reset_to_builtins();

        assert_eq!(env.len(), 3);
        assert_eq!(env.find_class("java.lang.Math"), Some(math));
        assert_eq!(env.find("Test_3"), None);
        assert!(env.class(TypeEnvironment::OBJECT).children.iter().all(|c| c.index() < 3));
        assert!(env.is_builtin(&Type::Class(TypeEnvironment::STRING)));
        assert!(!env.is_builtin(&Type::Class(math)));
    }

    #[test]
    fn truncate_drops_edges() {
        let mut env = TypeEnvironment::default();
        let len = env.len();
        let id = env.register("Test_0_Klass_1", &[], ClassFlags::default());
        env.truncate(len);
        assert_eq!(env.find_class("Test_0_Klass_1"), None);
        assert!(!env.class(TypeEnvironment::OBJECT).children.contains(&id));
    }

    #[test]
    fn descriptors() {
        let env = TypeEnvironment::default();
        assert_eq!(env.descriptor(&Type::array(Int.into(), 2)), "[[I");
        assert_eq!(
            env.descriptor(&Type::Class(TypeEnvironment::STRING)),
            "Ljava/lang/String;"
        );
        assert_eq!(env.type_name(&Type::array(Long.into(), 1)), "long[]");
    }
}
