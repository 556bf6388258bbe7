//! Type-directed register code generation for Viuact.
//!
//! Compiles one function at a time from its form tree to VM assembly. The
//! walk types every form by unification against the module's declared
//! signatures while it allocates registers in nested scopes.
//!
//! - [`Slot`] / [`RegisterClass`]: registers and their classes
//! - [`ScopeTree`]: nested scopes sharing one register file
//! - [`ModuleView`]: declarations a function may refer to
//! - [`Instr`] / [`FunctionCode`]: emitted assembly
//! - [`compile_function`]: the entry point
//! - [`EmitError`]: everything that can go wrong, with its [`ErrorClass`]

mod emitter;
mod error;
mod instr;
mod module;
mod scope;
mod slot;
mod stack;

pub use emitter::{compile_function, CompiledFunction, EmitContext, EmitOptions};
pub use error::{EmitError, ErrorClass};
pub use instr::{BinaryOp, Callable, FunctionCode, Instr, Label};
pub use module::{
    EnumDef, EnumField, ExceptionDef, FnSignature, InterfaceSource, ModuleView, NoInterfaces,
    RecordDef,
};
pub use scope::{ScopeError, ScopeId, ScopeSnapshot, ScopeTree};
pub use slot::{RegisterClass, Slot, SlotFlags};
