//! Expression forms and the arena that owns them.
//!
//! Forms refer to each other through [`FormId`] indices into a [`FormArena`]
//! instead of boxes. The emitter dispatches on [`FormKind`] with an exhaustive
//! `match`, so adding a variant is a compile error until every consumer
//! handles it.

use std::fmt;

use crate::{FnDef, Name, Span};

/// Index into a [`FormArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct FormId(u32);

impl FormId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        FormId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormId({})", self.0)
    }
}

/// Primitive literal value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    /// String literal, stored without surrounding quotes.
    String(Name),
    Integer(i64),
    Bool(bool),
}

/// Operators usable in operator-call forms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// String concatenation.
    Concat,
}

impl Operator {
    /// Surface spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Concat => "^",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Ne
                | Operator::Lt
                | Operator::Le
                | Operator::Gt
                | Operator::Ge
        )
    }
}

/// How the result of a call is delivered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Ordinary call; the caller receives the return value.
    #[default]
    Synchronous,
    /// Replaces the current frame; never yields a caller-visible value.
    Tail,
    /// Spawns the callee as an actor; yields its process id.
    Actor,
    /// Runs the callee when the current frame is torn down.
    Deferred,
}

/// Callee of a call form: a possibly module-qualified function name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callee {
    /// Module path segments (`Std::Io` in `Std::Io::print`); empty for local names.
    pub module: Vec<Name>,
    pub name: Name,
    pub span: Span,
}

impl Callee {
    pub fn is_qualified(&self) -> bool {
        !self.module.is_empty()
    }
}

/// A call argument, positional or bound to a parameter label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Argument {
    pub label: Option<Name>,
    pub value: FormId,
}

/// One with-clause of a `match` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchArm {
    /// Enum field this clause handles; `None` for the catch-all `_` clause.
    pub tag: Option<Name>,
    /// Name bound to the payload of the matched value.
    pub binding: Option<Name>,
    pub body: FormId,
    pub span: Span,
}

/// One catch clause of a `try` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatchArm {
    pub tag: Name,
    /// Name bound to the caught exception's value.
    pub binding: Option<Name>,
    pub body: FormId,
    pub span: Span,
}

/// One field initialiser of a record construction form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInit {
    pub name: Name,
    pub value: FormId,
    pub span: Span,
}

/// Closed set of expression forms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormKind {
    Literal(Literal),
    /// Reference to a variable or, when no variable is bound, a function value.
    NameRef(Name),
    /// `(let name value)`
    Let {
        name: Name,
        value: FormId,
    },
    /// Sequence of forms; the last one produces the value.
    Compound(Vec<FormId>),
    Call {
        callee: Callee,
        args: Vec<Argument>,
        kind: CallKind,
    },
    Operator {
        op: Operator,
        args: Vec<FormId>,
    },
    If {
        guard: FormId,
        then_arm: FormId,
        else_arm: FormId,
    },
    Match {
        guard: FormId,
        arms: Vec<MatchArm>,
    },
    Throw {
        tag: Name,
        value: Option<FormId>,
    },
    Try {
        guard: FormId,
        arms: Vec<CatchArm>,
    },
    RecordCtor {
        record: Name,
        fields: Vec<FieldInit>,
    },
    FieldAccess {
        base: FormId,
        field: Name,
    },
    /// `Enum::Field` or `Enum::Field value`, possibly module-qualified.
    EnumCtor {
        module: Vec<Name>,
        enum_name: Name,
        field: Name,
        value: Option<FormId>,
    },
    /// `(& expr)`: produce a pointer instead of a dereferenced copy.
    InhibitDeref(FormId),
    Vector(Vec<FormId>),
    /// Function defined inside another function's body.
    Function(Box<FnDef>),
}

impl FormKind {
    /// Short human-readable name of the variant, for tracing.
    pub fn describe(&self) -> &'static str {
        match self {
            FormKind::Literal(_) => "literal",
            FormKind::NameRef(_) => "name reference",
            FormKind::Let { .. } => "let binding",
            FormKind::Compound(_) => "compound expression",
            FormKind::Call { .. } => "call",
            FormKind::Operator { .. } => "operator call",
            FormKind::If { .. } => "if",
            FormKind::Match { .. } => "match",
            FormKind::Throw { .. } => "throw",
            FormKind::Try { .. } => "try",
            FormKind::RecordCtor { .. } => "record construction",
            FormKind::FieldAccess { .. } => "field access",
            FormKind::EnumCtor { .. } => "enum constructor",
            FormKind::InhibitDeref(_) => "dereference inhibition",
            FormKind::Vector(_) => "vector",
            FormKind::Function(_) => "function definition",
        }
    }
}

/// A form with its source position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Form {
    pub kind: FormKind,
    pub span: Span,
}

/// Flat storage for every form of a module.
#[derive(Clone, Debug, Default)]
pub struct FormArena {
    forms: Vec<Form>,
}

impl FormArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a form and return its id.
    ///
    /// # Panics
    /// Panics if the arena already holds `u32::MAX` forms.
    pub fn alloc(&mut self, kind: FormKind, span: Span) -> FormId {
        let index = u32::try_from(self.forms.len())
            .unwrap_or_else(|_| panic!("form arena exceeded u32::MAX entries"));
        self.forms.push(Form { kind, span });
        FormId::new(index)
    }

    /// Get a form by id.
    ///
    /// # Panics
    /// Panics if the id was not allocated by this arena.
    #[inline]
    pub fn get(&self, id: FormId) -> &Form {
        &self.forms[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: FormId) -> &FormKind {
        &self.get(id).kind
    }

    #[inline]
    pub fn span(&self, id: FormId) -> Span {
        self.get(id).span
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}
