//! Unification error types.

use viuact_ir::Name;

use crate::{Type, TypeVar};

/// Errors that can occur during unification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UnifyError {
    /// Types have a different shape or a different nominal name.
    Mismatch {
        left: Type,
        right: Type,
    },

    /// Same-named value types with a different number of type arguments.
    ///
    /// Module views are built so this cannot happen from user code; seeing it
    /// means a declaration was registered inconsistently.
    ArgArity {
        name: Name,
        left: usize,
        right: usize,
    },

    /// Function types with a different number of parameters.
    ParamArity { left: usize, right: usize },

    /// Binding the variable would make a type contain itself.
    InfiniteType { var: TypeVar, containing: Type },
}

impl UnifyError {
    /// Whether this error indicates a compiler bug rather than a user error.
    pub fn is_internal(&self) -> bool {
        matches!(self, UnifyError::ArgArity { .. })
    }
}

impl std::fmt::Display for UnifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch { .. } => write!(f, "cannot unify types"),
            Self::ArgArity { left, right, .. } => write!(
                f,
                "value type used with {left} and {right} type arguments"
            ),
            Self::ParamArity { left, right } => write!(
                f,
                "function types take {left} and {right} parameters"
            ),
            Self::InfiniteType { .. } => {
                write!(f, "infinite type: variable occurs in its own definition")
            }
        }
    }
}

impl std::error::Error for UnifyError {}
