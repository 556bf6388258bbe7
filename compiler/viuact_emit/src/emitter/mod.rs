//! Form tree → register assembly.
//!
//! # Architecture
//!
//! - [`EmitContext`]: read-only inputs shared by every function of a module
//! - [`FnEmitter`]: per-function state (scope tree, type state, instruction
//!   buffer, label counter, nested functions)
//! - `expr.rs`: dispatch over [`FormKind`](viuact_ir::FormKind), literals,
//!   names, let, compound, vectors
//! - `operators.rs`, `records.rs`, `control_flow.rs`, `calls.rs`,
//!   `closures.rs`: the remaining form families
//!
//! Every emit step takes a target slot and returns the slot holding the
//! value. For a non-void, non-disposable target the returned slot is either
//! the target itself or [`Slot::VOID`] when the form produces no value. A
//! disposable target may be cancelled and a slot the emitter already owns
//! returned instead.

mod calls;
mod closures;
mod control_flow;
mod expr;
mod operators;
mod records;

use rustc_hash::FxHashMap;
use viuact_ir::{FnDef, FormArena, Name, Param, Span, StringInterner};
use viuact_types::{FnType, Primitives, Type, TypeFormatter, TypeState, UnifyError};

use crate::{EmitError, FunctionCode, Instr, ModuleView, ScopeError, ScopeTree, Slot};

use self::closures::{Capture, Environment, LocalFn};

/// Output switches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Emit `;` comments describing the instructions that follow.
    pub annotate: bool,
}

/// Everything a function compilation reads but never writes.
#[derive(Copy, Clone)]
pub struct EmitContext<'a> {
    pub interner: &'a StringInterner,
    pub view: &'a ModuleView,
    pub arena: &'a FormArena,
    pub options: EmitOptions,
    prims: Primitives,
}

impl<'a> EmitContext<'a> {
    pub fn new(interner: &'a StringInterner, view: &'a ModuleView, arena: &'a FormArena) -> Self {
        EmitContext {
            interner,
            view,
            arena,
            options: EmitOptions::default(),
            prims: Primitives::new(interner),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EmitOptions) -> Self {
        self.options = options;
        self
    }
}

/// A compiled top-level function and the functions defined in its body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledFunction {
    pub code: FunctionCode,
    /// Nested functions at any depth, in order of completion.
    pub nested: Vec<FunctionCode>,
}

/// Compile one top-level function of the module `ctx.view` describes.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(function = %ctx.interner.lookup(def.name), arity = def.arity())
)]
pub fn compile_function(
    ctx: &EmitContext<'_>,
    def: &FnDef,
) -> Result<CompiledFunction, EmitError> {
    let signature = ctx
        .view
        .signature(def.name, def.arity())
        .ok_or_else(|| EmitError::MissingSignature {
            function: format!("{}/{}", ctx.interner.lookup(def.name), def.arity()),
            span: def.span,
        })?;

    let mut emitter = FnEmitter::new(ctx, signature.qualified.clone(), None);
    let instance = emitter.types.instantiate_fn(&signature.ty);
    emitter.current = Some(SelfSig {
        name: def.name,
        symbol: signature.symbol(),
        params: def.params.clone(),
        instance: instance.clone(),
        nested: false,
    });
    let body = emitter.emit_body(def, &instance)?;
    tracing::debug!(
        instructions = body.len(),
        nested = emitter.nested.len(),
        "function compiled"
    );

    Ok(CompiledFunction {
        code: FunctionCode {
            name: signature.qualified.clone(),
            arity: def.arity(),
            closure: false,
            signature: signature.ty.clone(),
            body,
        },
        nested: emitter.nested,
    })
}

/// The function being compiled, as seen by calls to itself.
#[derive(Clone)]
struct SelfSig {
    name: Name,
    /// `name/arity` as call instructions spell it.
    symbol: String,
    params: Vec<Param>,
    /// The single instance every recursive call unifies against.
    instance: FnType,
    /// Defined inside another function; not present in the module view.
    nested: bool,
}

/// Per-function emission state.
pub(crate) struct FnEmitter<'a> {
    ctx: &'a EmitContext<'a>,
    scopes: ScopeTree,
    types: TypeState,
    body: Vec<Instr>,
    labels: u32,
    /// Qualified name without arity; prefix of nested function names.
    base: String,
    current: Option<SelfSig>,
    /// Nested functions without captures, callable by name.
    local_fns: FxHashMap<Name, LocalFn>,
    nested: Vec<FunctionCode>,
    nested_count: u32,
    /// Bindings of the enclosing function, for nested functions.
    env: Option<&'a Environment>,
    captures: Vec<Capture>,
}

impl<'a> FnEmitter<'a> {
    fn new(ctx: &'a EmitContext<'a>, base: String, env: Option<&'a Environment>) -> Self {
        FnEmitter {
            ctx,
            scopes: ScopeTree::new(),
            types: TypeState::new(),
            body: Vec::new(),
            labels: 0,
            base,
            current: None,
            local_fns: FxHashMap::default(),
            nested: Vec::new(),
            nested_count: 0,
            env,
            captures: Vec::new(),
        }
    }

    /// Emit parameters and body, and wrap them in the register directive and
    /// the final `return`.
    fn emit_body(&mut self, def: &FnDef, instance: &FnType) -> Result<Vec<Instr>, EmitError> {
        let result = Slot::local(0);
        self.scopes.insert_permanent(result);

        for ((index, param), ty) in (0u32..).zip(&def.params).zip(&instance.params) {
            let dest = self.scopes.named(param.name());
            self.push(Instr::Move {
                dest,
                src: Slot::parameter(index),
            });
            self.scopes.set_type(dest, ty.clone());
        }
        if !def.params.is_empty() {
            self.blank();
        }

        let target = if instance.ret.is_void() {
            Slot::VOID
        } else {
            result
        };
        let produced = self.emit(def.body, target)?;
        if !produced.is_void() && produced != result {
            self.push(Instr::Move {
                dest: result,
                src: produced,
            });
        }

        let actual = self
            .scopes
            .type_of(produced)
            .cloned()
            .unwrap_or(Type::Void);
        let function = self
            .current
            .as_ref()
            .map(|c| c.symbol.clone())
            .unwrap_or_default();
        self.unify(&instance.ret, &actual, def.span, |declared, actual| {
            EmitError::BadReturnedType {
                function,
                declared,
                actual,
                span: def.span,
            }
        })?;

        let mut code = Vec::with_capacity(self.body.len() + 3);
        code.push(Instr::AllocateRegisters(
            self.scopes.pressure(crate::RegisterClass::Local),
        ));
        code.push(Instr::Blank);
        code.append(&mut self.body);
        code.push(Instr::Return);
        Ok(code)
    }

    // ── Output ──────────────────────────────────────────────────────

    #[inline]
    fn push(&mut self, instr: Instr) {
        self.body.push(instr);
    }

    #[inline]
    fn blank(&mut self) {
        self.body.push(Instr::Blank);
    }

    /// Emit a comment when annotation is enabled.
    fn annotate(&mut self, text: impl FnOnce(&Self) -> String) {
        if self.ctx.options.annotate {
            let comment = text(self);
            self.push(Instr::Comment(comment));
        }
    }

    fn next_label(&mut self) -> u32 {
        let n = self.labels;
        self.labels += 1;
        n
    }

    // ── Names and types ─────────────────────────────────────────────

    #[inline]
    fn text(&self, name: Name) -> &'static str {
        self.ctx.interner.lookup(name)
    }

    fn path_text(&self, path: &[Name], last: Name) -> String {
        path.iter()
            .chain(std::iter::once(&last))
            .map(|seg| self.text(*seg))
            .collect::<Vec<_>>()
            .join("::")
    }

    /// Render a type with everything known about it substituted.
    fn show(&self, ty: &Type) -> String {
        TypeFormatter::new(self.ctx.interner)
            .with_state(&self.types)
            .format(ty)
    }

    /// Type of a slot that must hold a value.
    fn value_type(&self, slot: Slot, span: Span) -> Result<Type, EmitError> {
        if slot.is_void() {
            return Err(EmitError::ReadOfVoid { span });
        }
        match self.scopes.type_of(slot) {
            Some(ty) if !ty.is_void() => Ok(ty.clone()),
            _ => Err(EmitError::ReadOfVoid { span }),
        }
    }

    /// Unify two types, ignoring one level of pointer on either side.
    ///
    /// A mismatch is reported through `on_mismatch`, which receives both
    /// types rendered after resolution.
    fn unify(
        &mut self,
        expected: &Type,
        actual: &Type,
        span: Span,
        on_mismatch: impl FnOnce(String, String) -> EmitError,
    ) -> Result<Type, EmitError> {
        let left = self.types.shallow_resolve(expected).strip_pointer().clone();
        let right = self.types.shallow_resolve(actual).strip_pointer().clone();
        match self.types.unify(&left, &right) {
            Ok(ty) => Ok(ty),
            Err(UnifyError::Mismatch { .. } | UnifyError::ParamArity { .. }) => {
                Err(on_mismatch(self.show(&left), self.show(&right)))
            }
            Err(UnifyError::InfiniteType { var, containing }) => Err(EmitError::InfiniteType {
                var: TypeFormatter::new(self.ctx.interner).format_var(var),
                ty: self.show(&containing),
                span,
            }),
            Err(err @ UnifyError::ArgArity { .. }) => Err(EmitError::Internal {
                message: err.to_string(),
                span,
            }),
        }
    }

    // ── Scopes ──────────────────────────────────────────────────────

    /// Run `f` in a fresh child scope.
    fn child<T>(
        &mut self,
        span: Span,
        f: impl FnOnce(&mut Self) -> Result<T, EmitError>,
    ) -> Result<T, EmitError> {
        self.scopes.enter();
        let out = f(self)?;
        self.scopes.exit().map_err(allocator(span))?;
        Ok(out)
    }

    fn release(&mut self, slot: Slot, span: Span) -> Result<(), EmitError> {
        self.scopes.deallocate(slot).map_err(allocator(span))
    }

    fn release_anonymous(&mut self, slot: Slot, span: Span) -> Result<(), EmitError> {
        self.scopes
            .deallocate_if_anonymous(slot)
            .map_err(allocator(span))
    }

    fn cancel(&mut self, slot: Slot, span: Span) -> Result<(), EmitError> {
        self.scopes.cancel(slot).map_err(allocator(span))
    }

    /// A slot that can be written: void targets get a fresh temporary,
    /// disposable ones lose the flag.
    fn materialise(&mut self, target: Slot) -> Slot {
        if target.is_void() {
            self.scopes.anonymous()
        } else {
            target.as_disposable(false)
        }
    }
}

fn allocator(span: Span) -> impl FnOnce(ScopeError) -> EmitError {
    move |source| EmitError::Allocator { source, span }
}

fn type_mismatch(span: Span) -> impl FnOnce(String, String) -> EmitError {
    move |left, right| EmitError::TypeMismatch {
        left,
        right,
        notes: Vec::new(),
        span,
    }
}

#[cfg(test)]
mod tests;
