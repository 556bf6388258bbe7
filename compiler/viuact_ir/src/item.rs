//! Module-level declarations: functions, signatures, enums, records,
//! exceptions, and imports.

use crate::{FormArena, FormId, Name, Span};

/// A type expression as written in a declaration.
///
/// Resolved into a semantic type by the type crate when the module view is
/// populated; the IR never interprets it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedType {
    /// Nominal type with optional arguments: `i64`, `((i64) option)`.
    Named { name: Name, args: Vec<ParsedType> },
    /// Template variable: `'a`.
    Template(Name),
    Void,
    /// Function type: `((i64 'a) -> bool)`.
    Fn {
        ret: Box<ParsedType>,
        params: Vec<ParsedType>,
    },
}

impl ParsedType {
    /// Nominal type without arguments.
    pub fn named(name: Name) -> Self {
        ParsedType::Named {
            name,
            args: Vec::new(),
        }
    }
}

/// Function parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    Positional(Name),
    /// Parameter that call sites must supply by label (`~name`).
    Labelled(Name),
}

impl Param {
    pub fn name(self) -> Name {
        match self {
            Param::Positional(name) | Param::Labelled(name) => name,
        }
    }

    pub fn is_labelled(self) -> bool {
        matches!(self, Param::Labelled(_))
    }
}

/// Function definition: `(let name (params...) body)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnDef {
    pub name: Name,
    pub params: Vec<Param>,
    pub body: FormId,
    pub span: Span,
}

impl FnDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Function signature: `(val name ('a...) (params...) -> ret)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValSpec {
    pub name: Name,
    pub templates: Vec<Name>,
    pub params: Vec<ParsedType>,
    pub ret: ParsedType,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumFieldDecl {
    pub name: Name,
    /// Payload type; `None` for a bare field.
    pub payload: Option<ParsedType>,
}

/// Enum declaration. Field indices follow declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: Name,
    pub templates: Vec<Name>,
    pub fields: Vec<EnumFieldDecl>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDecl {
    pub name: Name,
    pub fields: Vec<(Name, ParsedType)>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionDecl {
    pub tag: Name,
    /// Type of the value carried by the exception; `None` for a bare tag.
    pub value: Option<ParsedType>,
    pub span: Span,
}

/// `(import Std::Io)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub path: Vec<Name>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Fn(FnDef),
    Val(ValSpec),
    Enum(EnumDecl),
    Record(RecordDecl),
    Exception(ExceptionDecl),
    Import(Import),
}

/// One compilation unit as handed over by the parser.
#[derive(Clone, Debug, Default)]
pub struct SourceModule {
    /// Module name; `Std::Io` for nested modules.
    pub name: String,
    pub items: Vec<Item>,
    pub arena: FormArena,
}

impl SourceModule {
    pub fn new(name: impl Into<String>) -> Self {
        SourceModule {
            name: name.into(),
            items: Vec::new(),
            arena: FormArena::new(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &FnDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Fn(def) => Some(def),
            _ => None,
        })
    }
}
