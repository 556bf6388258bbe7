//! Nested function definitions and the values they capture.
//!
//! A nested function is compiled by its own [`FnEmitter`] that sees the
//! enclosing function's bindings through an [`Environment`] snapshot. A name
//! the inner emitter cannot find in its own scopes but finds in the
//! environment becomes a capture: it gets a pristine local slot in the inner
//! function, and the definition site copies the outer value into it.

use rustc_hash::FxHashMap;
use viuact_ir::{FnDef, Name, Param, Span};
use viuact_types::{FnType, Type, TypeVar};

use crate::{EmitError, FunctionCode, Instr, Slot};

use super::{FnEmitter, SelfSig};

/// A binding of an enclosing function.
struct Upvalue {
    /// Slot in the immediately enclosing function; `None` when the binding
    /// lives further out and must be captured by that function first.
    slot: Option<Slot>,
    ty: Type,
}

/// What a nested function can see of the functions around it.
pub(super) struct Environment {
    vars: FxHashMap<Name, Upvalue>,
    fns: FxHashMap<Name, LocalFn>,
}

/// Nested function without captures, callable by name.
#[derive(Clone)]
pub(super) struct LocalFn {
    pub(super) symbol: String,
    pub(super) params: Vec<Param>,
    /// Generalised inferred signature.
    pub(super) ty: FnType,
}

/// A value copied into the closure when it is created.
pub(super) struct Capture {
    name: Name,
    inner: Slot,
    outer: Option<Slot>,
}

impl FnEmitter<'_> {
    /// Slot holding variable `name`, capturing it from the enclosing
    /// function if needed. `Ok(None)` means no variable of that name exists.
    pub(super) fn lookup_var(&mut self, name: Name, span: Span) -> Result<Option<Slot>, EmitError> {
        if let Some(slot) = self.scopes.slot_of(name) {
            return Ok(Some(slot));
        }
        let Some(upvalue) = self.env.and_then(|env| env.vars.get(&name)) else {
            return Ok(None);
        };
        if self.captures.iter().any(|c| c.name == name) {
            // Captured once and moved out since.
            return Err(EmitError::Unbound {
                name: self.text(name).to_string(),
                span,
            });
        }

        let inner = self.scopes.pristine(name);
        self.scopes.set_type(inner, upvalue.ty.clone());
        tracing::debug!(name = self.text(name), slot = %inner, "captured upvalue");
        self.captures.push(Capture {
            name,
            inner,
            outer: upvalue.slot,
        });
        Ok(Some(inner))
    }

    /// Type of variable `name` without capturing it.
    pub(super) fn peek_var_type(&self, name: Name) -> Option<Type> {
        match self.scopes.slot_of(name) {
            Some(slot) => self.scopes.type_of(slot).cloned(),
            None => self
                .env
                .and_then(|env| env.vars.get(&name))
                .map(|upvalue| upvalue.ty.clone()),
        }
    }

    pub(super) fn find_local_fn(&self, name: Name) -> Option<&LocalFn> {
        self.local_fns
            .get(&name)
            .or_else(|| self.env.and_then(|env| env.fns.get(&name)))
    }

    /// Snapshot of every binding visible at this point, for a nested
    /// function defined here.
    fn environment(&self) -> Environment {
        let mut vars = FxHashMap::default();
        for (name, slot) in self.scopes.visible() {
            if let Some(ty) = self.scopes.type_of(slot) {
                let upvalue = Upvalue {
                    slot: Some(slot),
                    ty: self.types.resolve(ty),
                };
                vars.insert(name, upvalue);
            }
        }
        if let Some(env) = self.env {
            for (name, upvalue) in &env.vars {
                if self.captures.iter().any(|c| c.name == *name) {
                    continue;
                }
                vars.entry(*name).or_insert_with(|| Upvalue {
                    slot: None,
                    ty: self.types.resolve(&upvalue.ty),
                });
            }
        }

        let mut fns = self.env.map(|env| env.fns.clone()).unwrap_or_default();
        fns.extend(self.local_fns.iter().map(|(name, f)| (*name, f.clone())));
        Environment { vars, fns }
    }

    /// Compile a nested function definition.
    ///
    /// The function is appended to the nested list; if it captured anything
    /// a closure value is also bound to its name in the current scope.
    #[tracing::instrument(level = "debug", skip_all, fields(function = %self.text(def.name)))]
    pub(super) fn emit_nested_fn(&mut self, def: &FnDef) -> Result<Slot, EmitError> {
        let n = self.nested_count;
        self.nested_count += 1;
        let qualified = format!("{}::{}_{n}", self.base, self.text(def.name));
        let arity = def.arity();
        let symbol = format!("{qualified}/{arity}");

        let env = self.environment();
        let mut inner = FnEmitter::new(self.ctx, qualified.clone(), Some(&env));
        // Continue this function's numbering so captured unknowns stay distinct.
        inner.types = self.types.clone();
        let instance = FnType {
            ret: inner.types.fresh_var(Name::EMPTY),
            params: def
                .params
                .iter()
                .map(|_| inner.types.fresh_var(Name::EMPTY))
                .collect(),
            templates: Vec::new(),
        };
        inner.current = Some(SelfSig {
            name: def.name,
            symbol: symbol.clone(),
            params: def.params.clone(),
            instance: instance.clone(),
            nested: true,
        });
        let body = inner.emit_body(def, &instance)?;

        // Unknowns shared with the enclosing function are not generalised.
        let shared: Vec<TypeVar> = env
            .vars
            .values()
            .flat_map(|upvalue| inner.types.resolve(&upvalue.ty).free_vars())
            .collect();
        let mut signature = inner.types.generalise(&instance);
        signature.templates.retain(|var| !shared.contains(var));

        let captures = std::mem::take(&mut inner.captures);
        self.nested.append(&mut inner.nested);
        let closure = !captures.is_empty();
        self.nested.push(FunctionCode {
            name: qualified,
            arity,
            closure,
            signature: signature.clone(),
            body,
        });
        tracing::debug!(closure, captures = captures.len(), "nested function compiled");

        if !closure {
            self.local_fns.insert(
                def.name,
                LocalFn {
                    symbol,
                    params: def.params.clone(),
                    ty: signature,
                },
            );
            return Ok(Slot::VOID);
        }

        self.local_fns.remove(&def.name);
        let dest = self.scopes.named(def.name);
        self.push(Instr::Closure { dest, symbol });
        for capture in captures {
            let src = match capture.outer {
                Some(slot) => slot,
                None => self.lookup_var(capture.name, def.span)?.ok_or_else(|| {
                    EmitError::Unbound {
                        name: self.text(capture.name).to_string(),
                        span: def.span,
                    }
                })?,
            };
            self.push(Instr::CaptureCopy {
                closure: dest,
                index: capture.inner.index,
                src,
            });
        }
        self.scopes.set_type(dest, Type::Fn(Box::new(signature)));
        self.blank();
        Ok(Slot::VOID)
    }
}
