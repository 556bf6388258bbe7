//! Interned names of the builtin value types.

use viuact_ir::{Name, StringInterner};

use crate::Type;

/// Builtin type names, interned once per compilation session.
#[derive(Copy, Clone, Debug)]
pub struct Primitives {
    pub i8: Name,
    pub i16: Name,
    pub i32: Name,
    pub i64: Name,
    pub u8: Name,
    pub u16: Name,
    pub u32: Name,
    pub u64: Name,
    pub string: Name,
    pub bool: Name,
    pub atom: Name,
    pub vector: Name,
    pub pid: Name,
}

impl Primitives {
    pub fn new(interner: &StringInterner) -> Self {
        Primitives {
            i8: interner.intern("i8"),
            i16: interner.intern("i16"),
            i32: interner.intern("i32"),
            i64: interner.intern("i64"),
            u8: interner.intern("u8"),
            u16: interner.intern("u16"),
            u32: interner.intern("u32"),
            u64: interner.intern("u64"),
            string: interner.intern("string"),
            bool: interner.intern("bool"),
            atom: interner.intern("atom"),
            vector: interner.intern("vector"),
            pid: interner.intern("pid"),
        }
    }

    fn integers(&self) -> [Name; 8] {
        [
            self.i8, self.i16, self.i32, self.i64, self.u8, self.u16, self.u32, self.u64,
        ]
    }

    pub fn is_integer(&self, name: Name) -> bool {
        self.integers().contains(&name)
    }

    /// Whether `name` is a builtin type with no user declaration.
    pub fn is_builtin(&self, name: Name) -> bool {
        self.is_integer(name)
            || [self.string, self.bool, self.atom, self.vector, self.pid].contains(&name)
    }

    /// Number of type arguments a builtin takes.
    pub fn arity(&self, name: Name) -> usize {
        usize::from(name == self.vector)
    }

    pub fn i64_type(&self) -> Type {
        Type::value(self.i64)
    }

    pub fn string_type(&self) -> Type {
        Type::value(self.string)
    }

    pub fn bool_type(&self) -> Type {
        Type::value(self.bool)
    }

    pub fn pid_type(&self) -> Type {
        Type::value(self.pid)
    }

    pub fn vector_of(&self, element: Type) -> Type {
        Type::applied(self.vector, vec![element])
    }
}
