//! Type system for Viuact.
//!
//! - [`Type`]: structural type model (templates, values, functions, pointers, void)
//! - [`TypeState`]: per-function unification store
//! - [`UnifyError`]: why two types could not be made equal
//! - [`TypeFormatter`]: renders types the way signatures spell them
//! - [`Primitives`]: interned names of the builtin value types

mod format;
mod primitives;
mod state;
mod ty;
mod unify;

pub use format::TypeFormatter;
pub use primitives::Primitives;
pub use state::TypeState;
pub use ty::{FnType, Type, TypeVar};
pub use unify::UnifyError;
