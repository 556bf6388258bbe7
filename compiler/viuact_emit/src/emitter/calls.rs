//! Function invocation.
//!
//! A call resolves to one of three things, tried in order:
//!
//! 1. the `print`/`echo` builtins, which compile to a single instruction;
//! 2. a variable holding a function value, called through its slot;
//! 3. a function known by name: the nested function being compiled, a
//!    nested function defined earlier, or an overload in the module view.
//!
//! Arguments are evaluated in parameter order into a fresh frame.

use viuact_ir::{Argument, CallKind, Callee, FormId, Name, Param, Span};
use viuact_types::{FnType, Type};

use crate::{Callable, EmitError, FnSignature, Instr, Slot};

use super::FnEmitter;

const PRINT: &str = "print";
const ECHO: &str = "echo";

/// A call target resolved by name.
struct Resolved {
    symbol: String,
    params: Vec<Param>,
    ty: FnType,
}

fn kind_text(kind: CallKind) -> &'static str {
    match kind {
        CallKind::Synchronous => "call",
        CallKind::Tail => "tail call",
        CallKind::Actor => "actor call",
        CallKind::Deferred => "deferred call",
    }
}

impl FnEmitter<'_> {
    pub(super) fn emit_call(
        &mut self,
        callee: &Callee,
        args: &[Argument],
        kind: CallKind,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        if !callee.is_qualified() {
            let name = self.text(callee.name);
            if name == PRINT || name == ECHO {
                return self.emit_builtin(name, args, kind, target, span);
            }
            let holds_fn = self.peek_var_type(callee.name).is_some_and(|ty| {
                matches!(self.types.shallow_resolve(&ty).strip_pointer(), Type::Fn(_))
            });
            if holds_fn {
                return self.emit_indirect_call(callee.name, args, kind, target, span);
            }
        }

        let resolved = self.resolve_callee(callee, args.len(), span)?;
        let function = self.path_text(&callee.module, callee.name);
        let ordered = self.order_arguments(&function, &resolved.params, args, span)?;
        tracing::trace!(symbol = %resolved.symbol, "direct call");
        self.emit_invocation(
            Callable::Symbol(resolved.symbol),
            &function,
            &resolved.ty,
            &ordered,
            kind,
            target,
            span,
        )
    }

    // ── Builtins ────────────────────────────────────────────────────

    fn emit_builtin(
        &mut self,
        name: &'static str,
        args: &[Argument],
        kind: CallKind,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        if kind != CallKind::Synchronous {
            return Err(EmitError::BuiltinCallKind {
                name: name.to_string(),
                kind: kind_text(kind),
                span,
            });
        }
        let [arg] = args else {
            return Err(EmitError::InvalidArity {
                name: name.to_string(),
                given: args.len(),
                candidates: vec![format!("{name}/1")],
                span,
            });
        };

        let produced = self.child(span, |e| {
            let slot = if target.is_void() {
                e.scopes.disposable()
            } else {
                target
            };
            let produced = e.emit(arg.value, slot)?;
            let ty = e.value_type(produced, span)?;
            let shown = if matches!(e.types.shallow_resolve(&ty), Type::Pointer(_))
                && !produced.inhibits_deref()
            {
                produced.as_pointer()
            } else {
                produced
            };
            e.push(if name == ECHO {
                Instr::Echo(shown)
            } else {
                Instr::Print(shown)
            });
            Ok(produced)
        })?;
        self.blank();

        Ok(if target.is_void() { Slot::VOID } else { produced })
    }

    // ── Resolution ──────────────────────────────────────────────────

    fn emit_indirect_call(
        &mut self,
        name: Name,
        args: &[Argument],
        kind: CallKind,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let function = self.text(name).to_string();
        let slot = self
            .lookup_var(name, span)?
            .ok_or_else(|| EmitError::Unbound {
                name: function.clone(),
                span,
            })?;
        let held = self.types.shallow_resolve(&self.value_type(slot, span)?);
        let callable = if matches!(held, Type::Pointer(_)) {
            slot.as_pointer()
        } else {
            slot
        };
        let Type::Fn(f) = held.strip_pointer() else {
            return Err(EmitError::Internal {
                message: format!("`{function}` no longer holds a function value"),
                span,
            });
        };
        let ty = if f.templates.is_empty() {
            (**f).clone()
        } else {
            self.types.instantiate_fn(f)
        };

        if ty.arity() != args.len() {
            return Err(EmitError::FnValueArity {
                name: function,
                expected: ty.arity(),
                given: args.len(),
                span,
            });
        }
        if let Some(index) = args.iter().position(|a| a.label.is_some()) {
            // Function values carry no parameter labels.
            return Err(EmitError::MissingPositional {
                function,
                index: index + 1,
                span,
            });
        }

        let ordered: Vec<FormId> = args.iter().map(|a| a.value).collect();
        tracing::trace!(%callable, "indirect call");
        self.emit_invocation(
            Callable::Slot(callable),
            &function,
            &ty,
            &ordered,
            kind,
            target,
            span,
        )
    }

    /// Find the function a named call refers to and instantiate its type.
    fn resolve_callee(
        &mut self,
        callee: &Callee,
        arity: usize,
        span: Span,
    ) -> Result<Resolved, EmitError> {
        let name = callee.name;
        if !callee.is_qualified() {
            if let Some(current) = self
                .current
                .as_ref()
                .filter(|c| c.nested && c.name == name && c.params.len() == arity)
            {
                return Ok(Resolved {
                    symbol: current.symbol.clone(),
                    params: current.params.clone(),
                    ty: current.instance.clone(),
                });
            }
            if let Some(local) = self
                .find_local_fn(name)
                .filter(|f| f.params.len() == arity)
                .cloned()
            {
                let ty = self.types.instantiate_fn(&local.ty);
                return Ok(Resolved {
                    symbol: local.symbol,
                    params: local.params,
                    ty,
                });
            }
        }

        let view = self.ctx.view;
        let module = view
            .module(&callee.module)
            .ok_or_else(|| EmitError::UnknownModule {
                path: callee
                    .module
                    .iter()
                    .map(|seg| self.text(*seg))
                    .collect::<Vec<_>>()
                    .join("::"),
                span,
            })?;
        let overloads = module.functions(name);
        if overloads.is_empty() {
            return Err(EmitError::UnknownFunction {
                name: self.path_text(&callee.module, name),
                span,
            });
        }
        let Some(sig) = overloads.iter().find(|sig| sig.arity() == arity) else {
            return Err(EmitError::InvalidArity {
                name: self.path_text(&callee.module, name),
                given: arity,
                candidates: overloads.iter().map(FnSignature::symbol).collect(),
                span,
            });
        };
        let symbol = sig.symbol();
        // Interfaces of imported modules declare only what they export.
        if !callee.is_qualified() && !sig.defined {
            return Err(EmitError::CallToUndefined { name: symbol, span });
        }

        let ty = match self.current.as_ref().filter(|c| c.symbol == symbol) {
            Some(current) => current.instance.clone(),
            None => self.types.instantiate_fn(&sig.ty),
        };
        Ok(Resolved {
            symbol,
            params: sig.params.clone(),
            ty,
        })
    }

    /// Argument forms in parameter order. A positional parameter takes the
    /// next unlabelled argument; a labelled one takes the argument with its
    /// label.
    fn order_arguments(
        &self,
        function: &str,
        params: &[Param],
        args: &[Argument],
        span: Span,
    ) -> Result<Vec<FormId>, EmitError> {
        let mut positional = args.iter().filter(|a| a.label.is_none());
        params
            .iter()
            .enumerate()
            .map(|(index, param)| match param {
                Param::Positional(_) => positional.next().map(|a| a.value).ok_or_else(|| {
                    EmitError::MissingPositional {
                        function: function.to_string(),
                        index: index + 1,
                        span,
                    }
                }),
                Param::Labelled(label) => args
                    .iter()
                    .find(|a| a.label == Some(*label))
                    .map(|a| a.value)
                    .ok_or_else(|| EmitError::MissingLabelled {
                        function: function.to_string(),
                        label: self.text(*label).to_string(),
                        span,
                    }),
            })
            .collect()
    }

    // ── Emission ────────────────────────────────────────────────────

    /// Fill a frame with `args`, checked against `ty`, and emit the call
    /// instruction for `kind`.
    #[expect(
        clippy::too_many_arguments,
        reason = "direct and indirect calls share everything after resolution"
    )]
    fn emit_invocation(
        &mut self,
        callee: Callable,
        function: &str,
        ty: &FnType,
        args: &[FormId],
        kind: CallKind,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        self.push(Instr::Frame(args.len()));
        for (((register, position), form), param) in
            (0u32..).zip(1usize..).zip(args).zip(&ty.params)
        {
            let form_span = self.ctx.arena.span(*form);
            self.annotate(|_| format!("for argument {position}"));
            let tmp = self.scopes.anonymous();
            let produced = self.child(form_span, |e| e.emit(*form, tmp))?;
            let actual = self.value_type(produced, form_span)?;
            self.push(Instr::Move {
                dest: Slot::argument(register),
                src: produced,
            });
            self.unify(param, &actual, form_span, |expected, actual| {
                EmitError::BadArgumentType {
                    function: function.to_string(),
                    index: position,
                    expected,
                    actual,
                    span: form_span,
                }
            })?;
            self.release(tmp, form_span)?;
        }

        let result = match kind {
            CallKind::Synchronous => {
                let ret = self.types.shallow_resolve(&ty.ret);
                if target.is_void() || ret.is_void() {
                    if target.is_disposable() {
                        self.cancel(target, span)?;
                    }
                    self.push(Instr::Call {
                        dest: Slot::VOID,
                        callee,
                    });
                    Slot::VOID
                } else {
                    let dest = target.as_disposable(false);
                    self.push(Instr::Call { dest, callee });
                    self.scopes.set_type(dest, self.types.resolve(&ret));
                    dest
                }
            }
            CallKind::Tail => {
                if target.is_disposable() {
                    self.cancel(target, span)?;
                }
                self.push(Instr::TailCall(callee));
                Slot::VOID
            }
            CallKind::Actor => {
                if target.is_void() {
                    self.push(Instr::Process {
                        dest: Slot::VOID,
                        callee,
                    });
                    Slot::VOID
                } else {
                    let dest = target.as_disposable(false);
                    self.push(Instr::Process { dest, callee });
                    self.scopes.set_type(dest, self.ctx.prims.pid_type());
                    dest
                }
            }
            CallKind::Deferred => {
                if target.is_disposable() {
                    self.cancel(target, span)?;
                }
                self.push(Instr::Defer(callee));
                Slot::VOID
            }
        };
        self.blank();
        Ok(result)
    }
}
