//! Intermediate representation consumed by the Viuact code generator.
//!
//! The parser is an external collaborator: it hands the compiler a
//! [`SourceModule`] made of declaration [`Item`]s whose function bodies live in
//! a flat [`FormArena`]. Everything here is read-only once built.
//!
//! - [`Span`]: byte range of a form in its source file
//! - [`Name`] / [`StringInterner`]: 32-bit interned identifiers
//! - [`FormKind`]: the closed set of expression forms
//! - [`ParsedType`]: surface type expressions used by signatures and declarations

mod builder;
mod form;
mod interner;
mod item;
mod name;
mod span;

pub use builder::FormBuilder;
pub use form::{
    Argument, CallKind, Callee, CatchArm, FieldInit, Form, FormArena, FormId, FormKind, Literal,
    MatchArm, Operator,
};
pub use interner::{InternError, StringInterner};
pub use item::{
    EnumDecl, EnumFieldDecl, ExceptionDecl, FnDef, Import, Item, Param, ParsedType, RecordDecl,
    SourceModule, ValSpec,
};
pub use name::Name;
pub use span::Span;
