//! Type rendering.
//!
//! Types print the way signatures spell them: `i64`, `((i64) option)`,
//! `((i64 string) -> bool)`, `*t`, `void`.

use std::fmt::Write;

use viuact_ir::{Name, StringInterner};

use crate::{Type, TypeState, TypeVar};

/// Renders types to strings, optionally resolving them against a state.
pub struct TypeFormatter<'a> {
    interner: &'a StringInterner,
    state: Option<&'a TypeState>,
    /// Show template instance numbers (`'a~3`).
    instances: bool,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(interner: &'a StringInterner) -> Self {
        TypeFormatter {
            interner,
            state: None,
            instances: false,
        }
    }

    /// Resolve known templates before rendering.
    #[must_use]
    pub fn with_state(mut self, state: &'a TypeState) -> Self {
        self.state = Some(state);
        self
    }

    /// Render instance numbers, for tracing output.
    #[must_use]
    pub fn with_instances(mut self) -> Self {
        self.instances = true;
        self
    }

    pub fn format(&self, ty: &Type) -> String {
        let mut out = String::new();
        match self.state {
            Some(state) => self.write(&mut out, &state.resolve(ty)),
            None => self.write(&mut out, ty),
        }
        out
    }

    pub fn format_var(&self, var: TypeVar) -> String {
        let mut out = String::new();
        self.write_var(&mut out, var);
        out
    }

    fn write_var(&self, out: &mut String, var: TypeVar) {
        if var.name == Name::EMPTY {
            out.push_str("'_");
        } else {
            out.push_str(self.interner.lookup(var.name));
        }
        if let (true, Some(n)) = (self.instances, var.instance) {
            let _ = write!(out, "~{n}");
        }
    }

    fn write_list(&self, out: &mut String, types: &[Type]) {
        out.push('(');
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write(out, ty);
        }
        out.push(')');
    }

    fn write(&self, out: &mut String, ty: &Type) {
        match ty {
            Type::Template(var) => self.write_var(out, *var),
            Type::Value { name, args } if args.is_empty() => {
                out.push_str(self.interner.lookup(*name));
            }
            Type::Value { name, args } => {
                out.push('(');
                self.write_list(out, args);
                out.push(' ');
                out.push_str(self.interner.lookup(*name));
                out.push(')');
            }
            Type::Fn(f) => {
                out.push('(');
                self.write_list(out, &f.params);
                out.push_str(" -> ");
                self.write(out, &f.ret);
                out.push(')');
            }
            Type::Pointer(to) => {
                out.push('*');
                self.write(out, to);
            }
            Type::Void => out.push_str("void"),
        }
    }
}
