//! Type unification.
//!
//! # Design
//!
//! Substitution-map unification over [`TypeState`]:
//! - both sides are shallow-resolved first, so a template reaching the
//!   structural cases is always unknown
//! - two unknown templates are pointed at one fresh variable, which keeps the
//!   algorithm symmetric
//! - an unknown template meeting `Void` is bound to it; any other type
//!   meeting `Void` is absorbed and discarded
//! - binding is guarded by an occurs check

mod error;

pub use error::UnifyError;

use viuact_ir::Name;

use crate::{FnType, Type, TypeState, TypeVar};

impl TypeState {
    /// Make `a` and `b` equal, refining template bindings.
    ///
    /// Returns the type both sides now agree on. On failure the state may
    /// hold bindings made before the conflict was found; callers abort the
    /// function being compiled, so partial bindings are never observed.
    pub fn unify(&mut self, a: &Type, b: &Type) -> Result<Type, UnifyError> {
        let a = self.shallow_resolve(a);
        let b = self.shallow_resolve(b);

        match (a, b) {
            (Type::Template(x), Type::Template(y)) => {
                if x == y {
                    return Ok(Type::Template(x));
                }
                let fresh = self.fresh_var(Name::EMPTY);
                self.bind(x, fresh.clone());
                self.bind(y, fresh.clone());
                Ok(fresh)
            }

            (Type::Template(var), other) | (other, Type::Template(var)) => {
                self.bind_checked(var, other)
            }

            (Type::Void, _) | (_, Type::Void) => Ok(Type::Void),

            (
                Type::Value {
                    name: left_name,
                    args: left_args,
                },
                Type::Value {
                    name: right_name,
                    args: right_args,
                },
            ) if left_name == right_name => {
                if left_args.len() != right_args.len() {
                    tracing::error!(
                        ?left_name,
                        left = left_args.len(),
                        right = right_args.len(),
                        "value type registered with inconsistent arity"
                    );
                    return Err(UnifyError::ArgArity {
                        name: left_name,
                        left: left_args.len(),
                        right: right_args.len(),
                    });
                }
                let args = left_args
                    .iter()
                    .zip(&right_args)
                    .map(|(l, r)| self.unify(l, r))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Value {
                    name: left_name,
                    args,
                })
            }

            (Type::Fn(left), Type::Fn(right)) => self.unify_fn(&left, &right),

            (Type::Pointer(left), Type::Pointer(right)) => {
                Ok(Type::pointer(self.unify(&left, &right)?))
            }

            (left, right) => Err(UnifyError::Mismatch { left, right }),
        }
    }

    fn unify_fn(&mut self, left: &FnType, right: &FnType) -> Result<Type, UnifyError> {
        if left.params.len() != right.params.len() {
            return Err(UnifyError::ParamArity {
                left: left.params.len(),
                right: right.params.len(),
            });
        }
        let params = left
            .params
            .iter()
            .zip(&right.params)
            .map(|(l, r)| self.unify(l, r))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = self.unify(&left.ret, &right.ret)?;
        Ok(Type::function(ret, params, Vec::new()))
    }

    fn bind_checked(&mut self, var: TypeVar, ty: Type) -> Result<Type, UnifyError> {
        let resolved = self.resolve(&ty);
        if resolved.mentions(var) {
            return Err(UnifyError::InfiniteType {
                var,
                containing: resolved,
            });
        }
        self.bind(var, ty.clone());
        Ok(ty)
    }
}

#[cfg(test)]
mod tests;
