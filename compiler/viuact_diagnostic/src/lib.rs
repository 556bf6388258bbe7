//! Diagnostic system for compiler error reporting.
//!
//! Every diagnostic carries:
//! - an error code for searchability, prefixed by the phase that raised it
//! - a message saying what went wrong
//! - a primary span saying where it went wrong
//! - optional context labels, notes, and suggestions

mod diagnostic;
pub mod emitter;
mod error_code;

pub use diagnostic::{Diagnostic, Label, LabelStyle, Paint, Severity, Style};
pub use error_code::ErrorCode;
