//! Per-function unification store.

use rustc_hash::FxHashMap;
use viuact_ir::Name;

use crate::{FnType, Type, TypeVar};

/// Maps template variables to what unification learned about them.
///
/// One instance lives for the compilation of one function and is never
/// shared; nested functions start from a fresh state.
#[derive(Clone, Debug, Default)]
pub struct TypeState {
    /// Next instance number per surface name.
    counters: FxHashMap<Name, u32>,
    /// `None` while a registered variable is still unknown.
    bindings: FxHashMap<TypeVar, Option<Type>>,
}

impl TypeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh instance of the variable named `base`.
    pub fn fresh(&mut self, base: Name) -> TypeVar {
        let counter = self.counters.entry(base).or_insert(0);
        let var = TypeVar::instance(base, *counter);
        *counter += 1;
        self.bindings.insert(var, None);
        var
    }

    /// Fresh unknown template type.
    pub fn fresh_var(&mut self, base: Name) -> Type {
        Type::Template(self.fresh(base))
    }

    /// Replace every variable in `templates` by a fresh instance inside `ty`.
    pub fn instantiate(&mut self, templates: &[TypeVar], ty: &Type) -> Type {
        let blueprint = self.blueprint(templates);
        ty.concretise(&blueprint)
    }

    /// Monomorphic instance of a generic signature.
    pub fn instantiate_fn(&mut self, f: &FnType) -> FnType {
        let blueprint = self.blueprint(&f.templates);
        FnType {
            ret: f.ret.concretise(&blueprint),
            params: f.params.iter().map(|p| p.concretise(&blueprint)).collect(),
            templates: Vec::new(),
        }
    }

    fn blueprint(&mut self, templates: &[TypeVar]) -> FxHashMap<TypeVar, Type> {
        templates
            .iter()
            .map(|t| (*t, self.fresh_var(t.name)))
            .collect()
    }

    /// Whether nothing is known about `var` yet. Variables this state never
    /// registered count as unknown.
    pub fn is_unknown(&self, var: TypeVar) -> bool {
        !matches!(self.bindings.get(&var), Some(Some(_)))
    }

    pub fn binding(&self, var: TypeVar) -> Option<&Type> {
        self.bindings.get(&var).and_then(Option::as_ref)
    }

    pub(crate) fn bind(&mut self, var: TypeVar, ty: Type) {
        tracing::trace!(?var, ?ty, "bind template");
        self.bindings.insert(var, Some(ty));
    }

    /// Follow bindings of the outermost template until reaching a
    /// non-template or an unknown template.
    pub fn shallow_resolve(&self, ty: &Type) -> Type {
        let mut current = ty;
        while let Type::Template(var) = current {
            match self.binding(*var) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// Substitute everything known, at every depth.
    pub fn resolve(&self, ty: &Type) -> Type {
        match self.shallow_resolve(ty) {
            Type::Value { name, args } => Type::Value {
                name,
                args: args.iter().map(|a| self.resolve(a)).collect(),
            },
            Type::Fn(f) => Type::function(
                self.resolve(&f.ret),
                f.params.iter().map(|p| self.resolve(p)).collect(),
                f.templates,
            ),
            Type::Pointer(to) => Type::pointer(self.resolve(&to)),
            other @ (Type::Template(_) | Type::Void) => other,
        }
    }

    /// Fully resolved type with its remaining unknowns listed as the
    /// templates of a function type. Used to publish the signature of an
    /// inferred nested function.
    pub fn generalise(&self, f: &FnType) -> FnType {
        let ret = self.resolve(&f.ret);
        let params: Vec<Type> = f.params.iter().map(|p| self.resolve(p)).collect();
        let whole = Type::function(ret.clone(), params.clone(), Vec::new());
        FnType {
            ret,
            params,
            templates: whole.free_vars().into_vec(),
        }
    }
}
