//! Error codes for all compiler diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E2001`) whose leading digits
//! name the class of error. Used for documentation lookups and for telling
//! user errors apart from compiler bugs.

use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where the prefix indicates the class:
/// - E20xx: Type errors
/// - E21xx: Arity errors
/// - E22xx: Binding errors
/// - E3xxx: Pattern-match errors
/// - E9xxx: Internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Type Errors (E20xx)
    /// Cannot unify two types
    E2001,
    /// Record field initialised with a value of the wrong type
    E2002,
    /// Arms of an `if` produce different types
    E2003,
    /// Arms of a `match` produce different types
    E2004,
    /// Argument does not match the parameter type
    E2005,
    /// Returned value does not match the declared return type
    E2006,
    /// Operand type not supported by the operator
    E2007,
    /// Type would contain itself
    E2008,
    /// Enum payload or exception value of the wrong type
    E2009,

    // Arity Errors (E21xx)
    /// Unknown function
    E2101,
    /// No overload takes the given number of arguments
    E2102,
    /// Missing positional argument
    E2103,
    /// Missing labelled argument
    E2104,
    /// Wrong number of operands for an operator
    E2105,
    /// Payload given to a bare field, or missing from a field that needs one
    E2106,
    /// Call to a function that has a signature but no definition
    E2107,
    /// Function value reference is ambiguous between overloads
    E2108,
    /// Builtin used with a call kind it does not support
    E2109,
    /// Function value called with the wrong number of arguments
    E2110,

    // Binding Errors (E22xx)
    /// Read of an unbound name
    E2201,
    /// Read of a value that was discarded as void
    E2202,
    /// Unknown record type
    E2203,
    /// Unknown record field
    E2204,
    /// Unknown enum or enum field
    E2205,
    /// Unknown module in an import or a qualified name
    E2206,
    /// Unknown exception tag
    E2207,
    /// Function defined without a signature
    E2208,
    /// Unknown type name in a declaration
    E2209,

    // Pattern Errors (E3xxx)
    /// Missing with-clause (match is not exhaustive)
    E3001,
    /// Duplicated with-clause
    E3002,
    /// With-clause tag does not belong to the matched enum
    E3003,
    /// Catch-all clause is not the last clause
    E3004,
    /// Match without clauses
    E3005,
    /// Binding the payload of a bare field or exception
    E3006,
    /// Matched value is not an enum
    E3007,

    // Internal Errors (E9xxx)
    /// Internal compiler error
    E9001,
    /// Register allocator invariant violated
    E9002,
}

impl ErrorCode {
    /// All error code variants, for iteration and lookup.
    pub const ALL: &[ErrorCode] = &[
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E2003,
        ErrorCode::E2004,
        ErrorCode::E2005,
        ErrorCode::E2006,
        ErrorCode::E2007,
        ErrorCode::E2008,
        ErrorCode::E2009,
        ErrorCode::E2101,
        ErrorCode::E2102,
        ErrorCode::E2103,
        ErrorCode::E2104,
        ErrorCode::E2105,
        ErrorCode::E2106,
        ErrorCode::E2107,
        ErrorCode::E2108,
        ErrorCode::E2109,
        ErrorCode::E2110,
        ErrorCode::E2201,
        ErrorCode::E2202,
        ErrorCode::E2203,
        ErrorCode::E2204,
        ErrorCode::E2205,
        ErrorCode::E2206,
        ErrorCode::E2207,
        ErrorCode::E2208,
        ErrorCode::E2209,
        ErrorCode::E3001,
        ErrorCode::E3002,
        ErrorCode::E3003,
        ErrorCode::E3004,
        ErrorCode::E3005,
        ErrorCode::E3006,
        ErrorCode::E3007,
        ErrorCode::E9001,
        ErrorCode::E9002,
    ];

    /// Get the string representation (e.g., "E2001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2101 => "E2101",
            ErrorCode::E2102 => "E2102",
            ErrorCode::E2103 => "E2103",
            ErrorCode::E2104 => "E2104",
            ErrorCode::E2105 => "E2105",
            ErrorCode::E2106 => "E2106",
            ErrorCode::E2107 => "E2107",
            ErrorCode::E2108 => "E2108",
            ErrorCode::E2109 => "E2109",
            ErrorCode::E2110 => "E2110",
            ErrorCode::E2201 => "E2201",
            ErrorCode::E2202 => "E2202",
            ErrorCode::E2203 => "E2203",
            ErrorCode::E2204 => "E2204",
            ErrorCode::E2205 => "E2205",
            ErrorCode::E2206 => "E2206",
            ErrorCode::E2207 => "E2207",
            ErrorCode::E2208 => "E2208",
            ErrorCode::E2209 => "E2209",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3006 => "E3006",
            ErrorCode::E3007 => "E3007",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }

    /// Check if this is a type error (E20xx range).
    pub fn is_type_error(&self) -> bool {
        self.as_str().starts_with("E20")
    }

    /// Check if this is an arity error (E21xx range).
    pub fn is_arity_error(&self) -> bool {
        self.as_str().starts_with("E21")
    }

    /// Check if this is a binding error (E22xx range).
    pub fn is_binding_error(&self) -> bool {
        self.as_str().starts_with("E22")
    }

    /// Check if this is a pattern-match error (E3xxx range).
    pub fn is_pattern_error(&self) -> bool {
        self.as_str().starts_with("E3")
    }

    /// Check if this is an internal compiler error (E9xxx range).
    pub fn is_internal_error(&self) -> bool {
        matches!(self, ErrorCode::E9001 | ErrorCode::E9002)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an error code string like `"E2001"`.
///
/// Case-insensitive. Derived from [`ErrorCode::ALL`] and [`ErrorCode::as_str()`].
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}
