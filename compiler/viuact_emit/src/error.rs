//! Errors raised while compiling a function.
//!
//! Types and names are rendered to strings when the error is raised, while
//! the interner and the type state are still at hand, so an error is
//! self-contained and can cross thread boundaries.

use viuact_diagnostic::{Diagnostic, ErrorCode};
use viuact_ir::Span;

use crate::ScopeError;

/// Broad category of an [`EmitError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Type,
    Arity,
    Binding,
    Pattern,
    /// A compiler bug rather than a problem with the program.
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    // ── Type errors ─────────────────────────────────────────────────
    #[error("cannot unify `{left}` with `{right}`")]
    TypeMismatch {
        left: String,
        right: String,
        notes: Vec<String>,
        span: Span,
    },
    #[error("field `{field}` of record `{record}` is declared as `{declared}` but initialised with `{actual}`")]
    FieldType {
        record: String,
        field: String,
        declared: String,
        actual: String,
        span: Span,
    },
    #[error("arms of `if` produce `{then_ty}` and `{else_ty}`")]
    IfBranches {
        then_ty: String,
        else_ty: String,
        span: Span,
    },
    #[error("with-clauses for `{first}` and `{second}` produce `{left}` and `{right}`")]
    MatchArms {
        first: String,
        second: String,
        left: String,
        right: String,
        span: Span,
    },
    #[error("argument {index} of `{function}` should be `{expected}`, found `{actual}`")]
    BadArgumentType {
        function: String,
        index: usize,
        expected: String,
        actual: String,
        span: Span,
    },
    #[error("`{function}` is declared to return `{declared}` but returns `{actual}`")]
    BadReturnedType {
        function: String,
        declared: String,
        actual: String,
        span: Span,
    },
    #[error("operator `{op}` cannot be applied to `{actual}`")]
    OperandType {
        op: &'static str,
        actual: String,
        note: &'static str,
        span: Span,
    },
    #[error("type variable `{var}` would contain itself in `{ty}`")]
    InfiniteType { var: String, ty: String, span: Span },
    #[error("{what} carries `{expected}`, found `{actual}`")]
    PayloadType {
        what: String,
        expected: String,
        actual: String,
        span: Span,
    },

    // ── Arity errors ────────────────────────────────────────────────
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String, span: Span },
    #[error("no overload of `{name}` takes {given} argument(s)")]
    InvalidArity {
        name: String,
        given: usize,
        candidates: Vec<String>,
        span: Span,
    },
    #[error("missing positional argument {index} of `{function}`")]
    MissingPositional {
        function: String,
        index: usize,
        span: Span,
    },
    #[error("missing labelled argument `~{label}` of `{function}`")]
    MissingLabelled {
        function: String,
        label: String,
        span: Span,
    },
    #[error("operator `{op}` takes {expected} operands, found {given}")]
    OperandCount {
        op: &'static str,
        expected: &'static str,
        given: usize,
        span: Span,
    },
    #[error("{what} {}", if *.expected { "requires a value" } else { "does not take a value" })]
    PayloadPresence {
        what: String,
        expected: bool,
        span: Span,
    },
    #[error("call to `{name}`, which is declared but never defined")]
    CallToUndefined { name: String, span: Span },
    #[error("reference to `{name}` is ambiguous between {count} overloads")]
    AmbiguousFunctionRef {
        name: String,
        count: usize,
        span: Span,
    },
    #[error("builtin `{name}` cannot be used in a {kind}")]
    BuiltinCallKind {
        name: String,
        kind: &'static str,
        span: Span,
    },
    #[error("function value `{name}` takes {expected} argument(s), found {given}")]
    FnValueArity {
        name: String,
        expected: usize,
        given: usize,
        span: Span,
    },

    // ── Binding errors ──────────────────────────────────────────────
    #[error("read of unbound name `{name}`")]
    Unbound { name: String, span: Span },
    #[error("read of a value discarded as void")]
    ReadOfVoid { span: Span },
    #[error("unknown record `{name}`")]
    UnknownRecord { name: String, span: Span },
    #[error("record `{record}` has no field `{field}`")]
    UnknownField {
        record: String,
        field: String,
        span: Span,
    },
    #[error("unknown enum `{name}`")]
    UnknownEnum { name: String, span: Span },
    #[error("enum `{enum_name}` has no field `{field}`")]
    UnknownEnumField {
        enum_name: String,
        field: String,
        span: Span,
    },
    #[error("unknown module `{path}`")]
    UnknownModule { path: String, span: Span },
    #[error("unknown exception `{tag}`")]
    UnknownException { tag: String, span: Span },
    #[error("function `{function}` has no signature")]
    MissingSignature { function: String, span: Span },
    #[error("unknown type `{name}`")]
    UnknownType { name: String, span: Span },
    #[error("type `{name}` takes {expected} argument(s), found {given}")]
    TypeArity {
        name: String,
        expected: usize,
        given: usize,
        span: Span,
    },

    // ── Pattern errors ──────────────────────────────────────────────
    #[error("missing with-clause for `{field}` of enum `{enum_name}`")]
    MissingWithClause {
        enum_name: String,
        field: String,
        span: Span,
    },
    #[error("duplicated with-clause for `{field}` of enum `{enum_name}`")]
    DuplicatedWithClause {
        enum_name: String,
        field: String,
        span: Span,
    },
    #[error("`{tag}` is not a field of enum `{enum_name}`")]
    ForeignTag {
        enum_name: String,
        tag: String,
        span: Span,
    },
    #[error("catch-all with-clause must be the last one")]
    CatchAllNotLast { span: Span },
    #[error("`{what}` without any clauses")]
    NoArms { what: &'static str, span: Span },
    #[error("`{tag}` carries no value to bind to `{binding}`")]
    BindingBarePayload {
        tag: String,
        binding: String,
        span: Span,
    },
    #[error("cannot match over `{actual}`, which is not an enum")]
    NotAnEnum { actual: String, span: Span },

    // ── Internal errors ─────────────────────────────────────────────
    #[error("internal compiler error: {message}")]
    Internal { message: String, span: Span },
    #[error("register allocator: {source}")]
    Allocator { source: ScopeError, span: Span },
}

impl EmitError {
    pub fn span(&self) -> Span {
        match self {
            EmitError::TypeMismatch { span, .. }
            | EmitError::FieldType { span, .. }
            | EmitError::IfBranches { span, .. }
            | EmitError::MatchArms { span, .. }
            | EmitError::BadArgumentType { span, .. }
            | EmitError::BadReturnedType { span, .. }
            | EmitError::OperandType { span, .. }
            | EmitError::InfiniteType { span, .. }
            | EmitError::PayloadType { span, .. }
            | EmitError::UnknownFunction { span, .. }
            | EmitError::InvalidArity { span, .. }
            | EmitError::MissingPositional { span, .. }
            | EmitError::MissingLabelled { span, .. }
            | EmitError::OperandCount { span, .. }
            | EmitError::PayloadPresence { span, .. }
            | EmitError::CallToUndefined { span, .. }
            | EmitError::AmbiguousFunctionRef { span, .. }
            | EmitError::BuiltinCallKind { span, .. }
            | EmitError::FnValueArity { span, .. }
            | EmitError::Unbound { span, .. }
            | EmitError::ReadOfVoid { span }
            | EmitError::UnknownRecord { span, .. }
            | EmitError::UnknownField { span, .. }
            | EmitError::UnknownEnum { span, .. }
            | EmitError::UnknownEnumField { span, .. }
            | EmitError::UnknownModule { span, .. }
            | EmitError::UnknownException { span, .. }
            | EmitError::MissingSignature { span, .. }
            | EmitError::UnknownType { span, .. }
            | EmitError::TypeArity { span, .. }
            | EmitError::MissingWithClause { span, .. }
            | EmitError::DuplicatedWithClause { span, .. }
            | EmitError::ForeignTag { span, .. }
            | EmitError::CatchAllNotLast { span }
            | EmitError::NoArms { span, .. }
            | EmitError::BindingBarePayload { span, .. }
            | EmitError::NotAnEnum { span, .. }
            | EmitError::Internal { span, .. }
            | EmitError::Allocator { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EmitError::TypeMismatch { .. } => ErrorCode::E2001,
            EmitError::FieldType { .. } => ErrorCode::E2002,
            EmitError::IfBranches { .. } => ErrorCode::E2003,
            EmitError::MatchArms { .. } => ErrorCode::E2004,
            EmitError::BadArgumentType { .. } => ErrorCode::E2005,
            EmitError::BadReturnedType { .. } => ErrorCode::E2006,
            EmitError::OperandType { .. } => ErrorCode::E2007,
            EmitError::InfiniteType { .. } => ErrorCode::E2008,
            EmitError::PayloadType { .. } => ErrorCode::E2009,
            EmitError::UnknownFunction { .. } => ErrorCode::E2101,
            EmitError::InvalidArity { .. } => ErrorCode::E2102,
            EmitError::MissingPositional { .. } => ErrorCode::E2103,
            EmitError::MissingLabelled { .. } => ErrorCode::E2104,
            EmitError::OperandCount { .. } => ErrorCode::E2105,
            EmitError::PayloadPresence { .. } => ErrorCode::E2106,
            EmitError::CallToUndefined { .. } => ErrorCode::E2107,
            EmitError::AmbiguousFunctionRef { .. } => ErrorCode::E2108,
            EmitError::BuiltinCallKind { .. } => ErrorCode::E2109,
            EmitError::FnValueArity { .. } => ErrorCode::E2110,
            EmitError::Unbound { .. } => ErrorCode::E2201,
            EmitError::ReadOfVoid { .. } => ErrorCode::E2202,
            EmitError::UnknownRecord { .. } => ErrorCode::E2203,
            EmitError::UnknownField { .. } => ErrorCode::E2204,
            EmitError::UnknownEnum { .. } | EmitError::UnknownEnumField { .. } => ErrorCode::E2205,
            EmitError::UnknownModule { .. } => ErrorCode::E2206,
            EmitError::UnknownException { .. } => ErrorCode::E2207,
            EmitError::MissingSignature { .. } => ErrorCode::E2208,
            EmitError::UnknownType { .. } | EmitError::TypeArity { .. } => ErrorCode::E2209,
            EmitError::MissingWithClause { .. } => ErrorCode::E3001,
            EmitError::DuplicatedWithClause { .. } => ErrorCode::E3002,
            EmitError::ForeignTag { .. } => ErrorCode::E3003,
            EmitError::CatchAllNotLast { .. } => ErrorCode::E3004,
            EmitError::NoArms { .. } => ErrorCode::E3005,
            EmitError::BindingBarePayload { .. } => ErrorCode::E3006,
            EmitError::NotAnEnum { .. } => ErrorCode::E3007,
            EmitError::Internal { .. } => ErrorCode::E9001,
            EmitError::Allocator { .. } => ErrorCode::E9002,
        }
    }

    pub fn class(&self) -> ErrorClass {
        let code = self.code();
        if code.is_type_error() {
            ErrorClass::Type
        } else if code.is_arity_error() {
            ErrorClass::Arity
        } else if code.is_binding_error() {
            ErrorClass::Binding
        } else if code.is_pattern_error() {
            ErrorClass::Pattern
        } else {
            ErrorClass::Internal
        }
    }

    pub fn is_internal(&self) -> bool {
        self.class() == ErrorClass::Internal
    }

    /// Render as a diagnostic with the error's code, span, and context.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code())
            .with_message(self.to_string())
            .with_label(self.span(), self.label());
        match self {
            EmitError::TypeMismatch { notes, .. } => notes
                .iter()
                .fold(diag, |diag, note| diag.with_note(note.clone())),
            EmitError::InvalidArity { candidates, .. } => candidates
                .iter()
                .fold(diag, |diag, c| diag.with_note(format!("candidate: {c}"))),
            EmitError::OperandType { note, .. } => diag.with_note(*note),
            EmitError::MatchArms { .. } => {
                diag.with_note("all with-clauses must produce the same type")
            }
            EmitError::MissingWithClause { field, .. } => {
                diag.with_suggestion(format!("add a with-clause for `{field}` or a catch-all `_`"))
            }
            EmitError::PayloadPresence { expected: true, .. } => {
                diag.with_suggestion("supply the value after the tag")
            }
            EmitError::Internal { .. } | EmitError::Allocator { .. } => {
                diag.with_note("this is a compiler bug")
            }
            _ => diag,
        }
    }

    fn label(&self) -> &'static str {
        match self.class() {
            ErrorClass::Type => "type error here",
            ErrorClass::Arity => "wrong number of arguments or operands",
            ErrorClass::Binding => "name does not resolve",
            ErrorClass::Pattern => "in this match",
            ErrorClass::Internal => "while compiling this",
        }
    }
}
