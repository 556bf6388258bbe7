//! Structural type model.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use viuact_ir::{Name, ParsedType};

/// Template (generic) type variable.
///
/// Variables written in declarations carry no instance number. Every use of a
/// declaration registers fresh instances, so `'a` from two call sites becomes
/// `'a~0` and `'a~1` and the two never alias.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVar {
    /// Surface name including the leading quote; [`Name::EMPTY`] for
    /// variables the compiler synthesises.
    pub name: Name,
    pub instance: Option<u32>,
}

impl TypeVar {
    /// Variable as written in a declaration.
    pub const fn declared(name: Name) -> Self {
        TypeVar {
            name,
            instance: None,
        }
    }

    pub const fn instance(name: Name, instance: u32) -> Self {
        TypeVar {
            name,
            instance: Some(instance),
        }
    }
}

/// Function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FnType {
    pub ret: Type,
    pub params: Vec<Type>,
    /// Variables quantified by this signature. Empty once instantiated.
    pub templates: Vec<TypeVar>,
}

impl FnType {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Template(TypeVar),
    /// Nominal type: a primitive, enum, or record, with its type arguments.
    Value { name: Name, args: Vec<Type> },
    Fn(Box<FnType>),
    /// Reference to a value that was not copied out of its container.
    Pointer(Box<Type>),
    /// Value produced but discarded.
    Void,
}

impl Type {
    pub fn value(name: Name) -> Self {
        Type::Value {
            name,
            args: Vec::new(),
        }
    }

    pub fn applied(name: Name, args: Vec<Type>) -> Self {
        Type::Value { name, args }
    }

    pub fn function(ret: Type, params: Vec<Type>, templates: Vec<TypeVar>) -> Self {
        Type::Fn(Box::new(FnType {
            ret,
            params,
            templates,
        }))
    }

    pub fn pointer(to: Type) -> Self {
        Type::Pointer(Box::new(to))
    }

    /// Convert a declaration's type expression. Template names map to
    /// declared (uninstantiated) variables.
    pub fn from_parsed(parsed: &ParsedType) -> Self {
        match parsed {
            ParsedType::Named { name, args } => Type::Value {
                name: *name,
                args: args.iter().map(Type::from_parsed).collect(),
            },
            ParsedType::Template(name) => Type::Template(TypeVar::declared(*name)),
            ParsedType::Void => Type::Void,
            ParsedType::Fn { ret, params } => Type::function(
                Type::from_parsed(ret),
                params.iter().map(Type::from_parsed).collect(),
                Vec::new(),
            ),
        }
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    #[inline]
    pub fn is_template(&self) -> bool {
        matches!(self, Type::Template(_))
    }

    /// Whether any template variable occurs in this type.
    pub fn polymorphic(&self) -> bool {
        match self {
            Type::Template(_) => true,
            Type::Value { args, .. } => args.iter().any(Type::polymorphic),
            Type::Fn(f) => f.ret.polymorphic() || f.params.iter().any(Type::polymorphic),
            Type::Pointer(to) => to.polymorphic(),
            Type::Void => false,
        }
    }

    /// Type with one level of pointer removed.
    pub fn strip_pointer(&self) -> &Type {
        match self {
            Type::Pointer(to) => to,
            other => other,
        }
    }

    /// Substitute variables from `blueprint`; variables it does not mention
    /// are kept.
    #[must_use]
    pub fn concretise(&self, blueprint: &FxHashMap<TypeVar, Type>) -> Type {
        match self {
            Type::Template(var) => blueprint.get(var).cloned().unwrap_or(Type::Template(*var)),
            Type::Value { name, args } => Type::Value {
                name: *name,
                args: args.iter().map(|a| a.concretise(blueprint)).collect(),
            },
            Type::Fn(f) => Type::function(
                f.ret.concretise(blueprint),
                f.params.iter().map(|p| p.concretise(blueprint)).collect(),
                f.templates
                    .iter()
                    .filter(|t| !blueprint.contains_key(t))
                    .copied()
                    .collect(),
            ),
            Type::Pointer(to) => Type::pointer(to.concretise(blueprint)),
            Type::Void => Type::Void,
        }
    }

    /// Template variables in order of first occurrence, without duplicates.
    pub fn free_vars(&self) -> SmallVec<[TypeVar; 4]> {
        let mut out = SmallVec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut SmallVec<[TypeVar; 4]>) {
        match self {
            Type::Template(var) => {
                if !out.contains(var) {
                    out.push(*var);
                }
            }
            Type::Value { args, .. } => {
                for arg in args {
                    arg.collect_vars(out);
                }
            }
            Type::Fn(f) => {
                for param in &f.params {
                    param.collect_vars(out);
                }
                f.ret.collect_vars(out);
            }
            Type::Pointer(to) => to.collect_vars(out),
            Type::Void => {}
        }
    }

    /// Whether `var` occurs anywhere in this type.
    pub fn mentions(&self, var: TypeVar) -> bool {
        match self {
            Type::Template(v) => *v == var,
            Type::Value { args, .. } => args.iter().any(|a| a.mentions(var)),
            Type::Fn(f) => f.ret.mentions(var) || f.params.iter().any(|p| p.mentions(var)),
            Type::Pointer(to) => to.mentions(var),
            Type::Void => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn var(n: u32) -> TypeVar {
        TypeVar::declared(Name::from_raw(n))
    }

    #[test]
    fn polymorphism_looks_through_structure() {
        let int = Type::value(Name::from_raw(1));
        assert!(!int.polymorphic());
        let list = Type::applied(Name::from_raw(2), vec![Type::Template(var(3))]);
        assert!(list.polymorphic());
        let f = Type::function(int.clone(), vec![Type::pointer(int)], Vec::new());
        assert!(!f.polymorphic());
        assert!(!Type::Void.polymorphic());
    }

    #[test]
    fn concretise_replaces_only_mapped_vars() {
        let a = var(10);
        let b = var(11);
        let int = Type::value(Name::from_raw(1));
        let mut blueprint = FxHashMap::default();
        blueprint.insert(a, int.clone());

        let f = Type::function(
            Type::Template(b),
            vec![Type::Template(a)],
            vec![a, b],
        );
        assert_eq!(
            f.concretise(&blueprint),
            Type::function(Type::Template(b), vec![int], vec![b])
        );
    }

    #[test]
    fn free_vars_are_ordered_and_unique() {
        let a = var(10);
        let b = var(11);
        let ty = Type::function(
            Type::Template(a),
            vec![Type::Template(b), Type::Template(a)],
            Vec::new(),
        );
        assert_eq!(ty.free_vars().as_slice(), &[b, a]);
        assert!(ty.mentions(a));
        assert!(!ty.mentions(var(12)));
    }

    #[test]
    fn strip_pointer_removes_one_level() {
        let int = Type::value(Name::from_raw(1));
        let ptr = Type::pointer(Type::pointer(int.clone()));
        assert_eq!(ptr.strip_pointer(), &Type::pointer(int.clone()));
        assert_eq!(int.strip_pointer(), &int);
    }
}
