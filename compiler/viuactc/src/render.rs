//! Assembly output.
//!
//! A module renders as a comment header followed by every function, each
//! preceded by its signature in `val` syntax:
//!
//! ```text
//! ;
//! ; Function definitions
//! ;
//!
//! ; (val main () -> void)
//! .function: main/0
//!     ...
//! .end
//! ```

use std::fmt::Write;

use rustc_hash::FxHashMap;
use viuact_emit::FunctionCode;
use viuact_ir::StringInterner;
use viuact_types::{FnType, Type, TypeFormatter, TypeVar};

use crate::CompiledModule;

impl CompiledModule {
    /// Assembly text of the module. Nested functions follow the function
    /// they are defined in.
    pub fn render(&self, interner: &StringInterner) -> String {
        let fmt = TypeFormatter::new(interner);
        let mut out = String::from(";\n");
        if self.executable {
            out.push_str("; Function definitions\n");
        } else {
            let _ = writeln!(out, "; Function definitions for module {}", self.name);
        }
        out.push_str(";\n");

        for function in &self.functions {
            for code in std::iter::once(&function.code).chain(&function.nested) {
                let _ = writeln!(out, "\n; {}", signature_line(&fmt, interner, code));
                let _ = writeln!(out, "{code}");
            }
        }
        out
    }
}

/// `(val name (params) -> ret)`, with a template list before the name for
/// polymorphic functions.
fn signature_line(fmt: &TypeFormatter<'_>, interner: &StringInterner, code: &FunctionCode) -> String {
    let sig = readable(&code.signature, interner);
    let params: Vec<String> = sig.params.iter().map(|p| fmt.format(p)).collect();
    let ret = fmt.format(&sig.ret);
    if sig.templates.is_empty() {
        return format!("(val {} ({}) -> {ret})", code.name, params.join(" "));
    }
    let templates: Vec<String> = sig.templates.iter().map(|t| fmt.format_var(*t)).collect();
    format!(
        "(val ({}) {} ({}) -> {ret})",
        templates.join(" "),
        code.name,
        params.join(" ")
    )
}

/// Inferred signatures quantify over synthesised variables; give them
/// `'a`, `'b`, ... names.
fn readable(sig: &FnType, interner: &StringInterner) -> FnType {
    if sig.templates.iter().all(|t| t.instance.is_none()) {
        return sig.clone();
    }
    let renamed: Vec<TypeVar> = (0..sig.templates.len())
        .map(|i| {
            let name = match ('a'..='z').nth(i) {
                Some(c) => format!("'{c}"),
                None => format!("'t{i}"),
            };
            TypeVar::declared(interner.intern(&name))
        })
        .collect();
    let blueprint: FxHashMap<TypeVar, Type> = sig
        .templates
        .iter()
        .zip(&renamed)
        .map(|(from, to)| (*from, Type::Template(*to)))
        .collect();
    FnType {
        ret: sig.ret.concretise(&blueprint),
        params: sig.params.iter().map(|p| p.concretise(&blueprint)).collect(),
        templates: renamed,
    }
}
