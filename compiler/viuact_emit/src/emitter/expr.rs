//! Dispatch over form kinds, and the forms that need no other machinery:
//! literals, names, let, compound, dereference inhibition, and vectors.

use viuact_ir::{FormId, FormKind, Literal, Name, Span};
use viuact_types::{FnType, Type};

use crate::stack::ensure_sufficient_stack;
use crate::{EmitError, Instr, Slot};

use super::FnEmitter;

impl FnEmitter<'_> {
    // ── Main dispatch ───────────────────────────────────────────────

    /// Emit `form` so that its value ends up in `target`.
    pub(super) fn emit(&mut self, form: FormId, target: Slot) -> Result<Slot, EmitError> {
        ensure_sufficient_stack(|| self.emit_form(form, target))
    }

    fn emit_form(&mut self, form: FormId, target: Slot) -> Result<Slot, EmitError> {
        let arena = self.ctx.arena;
        let span = arena.span(form);
        let kind = arena.kind(form);
        tracing::trace!(form = kind.describe(), %target, "emit");

        match kind {
            FormKind::Literal(lit) => Ok(self.emit_literal(lit, target)),
            FormKind::NameRef(name) => self.emit_name_ref(*name, target, span),
            FormKind::Let { name, value } => self.emit_let(*name, *value, target, span),
            FormKind::Compound(forms) => self.emit_compound(forms, target, span),
            FormKind::Call { callee, args, kind } => {
                self.emit_call(callee, args, *kind, target, span)
            }
            FormKind::Operator { op, args } => self.emit_operator(*op, args, target, span),
            FormKind::If {
                guard,
                then_arm,
                else_arm,
            } => self.emit_if(*guard, *then_arm, *else_arm, target, span),
            FormKind::Match { guard, arms } => self.emit_match(*guard, arms, target, span),
            FormKind::Throw { tag, value } => self.emit_throw(*tag, *value, target, span),
            FormKind::Try { guard, arms } => self.emit_try(*guard, arms, target, span),
            FormKind::RecordCtor { record, fields } => {
                self.emit_record_ctor(*record, fields, target, span)
            }
            FormKind::FieldAccess { base, field } => {
                self.emit_field_access(*base, *field, target, span)
            }
            FormKind::EnumCtor {
                module,
                enum_name,
                field,
                value,
            } => self.emit_enum_ctor(module, *enum_name, *field, *value, target, span),
            FormKind::InhibitDeref(inner) => {
                self.emit(*inner, target.with_inhibit(true))
            }
            FormKind::Vector(elements) => self.emit_vector(elements, target, span),
            FormKind::Function(def) => self.emit_nested_fn(def),
        }
    }

    // ── Literals ────────────────────────────────────────────────────

    fn emit_literal(&mut self, lit: &Literal, target: Slot) -> Slot {
        if target.is_void() {
            return Slot::VOID;
        }
        let prims = self.ctx.prims;
        let ty = match lit {
            Literal::String(value) => {
                self.push(Instr::Text {
                    dest: target,
                    value: self.text(*value).to_string(),
                });
                prims.string_type()
            }
            Literal::Integer(value) => {
                self.push(Instr::Integer {
                    dest: target,
                    value: *value,
                });
                prims.i64_type()
            }
            Literal::Bool(value) => {
                // The VM has no boolean constructor; negate the opposite integer.
                self.push(Instr::Integer {
                    dest: target,
                    value: i64::from(!*value),
                });
                self.push(Instr::Not {
                    dest: target,
                    src: target,
                });
                prims.bool_type()
            }
        };
        self.scopes.set_type(target, ty);
        target
    }

    // ── Names ───────────────────────────────────────────────────────

    fn emit_name_ref(&mut self, name: Name, target: Slot, span: Span) -> Result<Slot, EmitError> {
        match self.lookup_var(name, span)? {
            Some(slot) => self.read_var(name, slot, target, span),
            None => self.emit_fn_ref(name, target, span),
        }
    }

    /// Read variable `name`, held in `slot`, into `target`.
    ///
    /// An ordinary read moves the value and the name with it; an inhibited
    /// read leaves both where they are and stores a pointer.
    pub(super) fn read_var(
        &mut self,
        name: Name,
        slot: Slot,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        if target.is_void() {
            return Ok(Slot::VOID);
        }
        if target.is_disposable() {
            self.cancel(target, span)?;
            return Ok(slot.with_inhibit(target.inhibits_deref()));
        }

        let ty = self.value_type(slot, span)?;
        if target.inhibits_deref() {
            self.push(Instr::Ptr {
                dest: target,
                src: slot,
            });
            self.scopes.set_type(target, Type::pointer(ty));
            return Ok(target);
        }

        self.release(slot, span)?;
        self.scopes
            .name_slot(target, name)
            .map_err(super::allocator(span))?;
        self.scopes.set_type(target, ty);
        self.push(Instr::Move {
            dest: target,
            src: slot,
        });
        Ok(target)
    }

    /// Function value: `function dst name/arity`.
    fn emit_fn_ref(&mut self, name: Name, target: Slot, span: Span) -> Result<Slot, EmitError> {
        let (symbol, ty) = self.resolve_fn_value(name, span)?;
        if target.is_void() {
            return Ok(Slot::VOID);
        }
        let dest = target.as_disposable(false);
        self.push(Instr::FunctionRef { dest, symbol });
        self.scopes.set_type(dest, Type::Fn(Box::new(ty)));
        Ok(dest)
    }

    /// Symbol and instantiated type of the function `name` refers to when
    /// used as a value.
    fn resolve_fn_value(&mut self, name: Name, span: Span) -> Result<(String, FnType), EmitError> {
        if let Some(local) = self.find_local_fn(name).cloned() {
            return Ok((local.symbol, self.types.instantiate_fn(&local.ty)));
        }
        if let Some(current) = self.current.as_ref().filter(|c| c.nested && c.name == name) {
            return Ok((current.symbol.clone(), current.instance.clone()));
        }

        let overloads = self.ctx.view.functions(name);
        match overloads {
            [] => Err(EmitError::Unbound {
                name: self.text(name).to_string(),
                span,
            }),
            [sig] => {
                let symbol = sig.symbol();
                let ty = match self.current.as_ref().filter(|c| c.symbol == symbol) {
                    Some(current) => current.instance.clone(),
                    None => self.types.instantiate_fn(&sig.ty),
                };
                Ok((symbol, ty))
            }
            _ => Err(EmitError::AmbiguousFunctionRef {
                name: self.text(name).to_string(),
                count: overloads.len(),
                span,
            }),
        }
    }

    // ── Let and compound ────────────────────────────────────────────

    fn emit_let(
        &mut self,
        name: Name,
        value: FormId,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        self.annotate(|e| format!("let {} = ...", e.text(name)));
        let slot = self.scopes.anonymous();
        let produced = self.child(span, |e| e.emit(value, slot))?;
        let ty = self.scopes.type_of(produced).cloned();
        let named = self
            .scopes
            .name_slot(slot, name)
            .map_err(super::allocator(span))?;
        if let Some(ty) = ty {
            self.scopes.set_type(named, ty);
        }
        self.blank();

        if target.is_void() {
            Ok(Slot::VOID)
        } else if target.is_disposable() {
            self.cancel(target, span)?;
            Ok(named.with_inhibit(target.inhibits_deref()))
        } else {
            self.read_var(name, named, target, span)
        }
    }

    fn emit_compound(
        &mut self,
        forms: &[FormId],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let Some((last, init)) = forms.split_last() else {
            return Ok(Slot::VOID);
        };
        let arena = self.ctx.arena;
        for form in init {
            if matches!(arena.kind(*form), FormKind::Let { .. } | FormKind::Function(_)) {
                // Bindings stay visible to the rest of the sequence.
                self.emit(*form, Slot::VOID)?;
            } else {
                self.child(span, |e| e.emit(*form, Slot::VOID))?;
            }
        }
        self.emit(*last, target)
    }

    // ── Vectors ─────────────────────────────────────────────────────

    fn emit_vector(
        &mut self,
        elements: &[FormId],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let dest = self.materialise(target);
        self.push(Instr::Vector(dest));
        let element_ty = self.types.fresh_var(Name::EMPTY);

        for (index, element) in elements.iter().enumerate() {
            let element_span = self.ctx.arena.span(*element);
            let slot = self.scopes.anonymous();
            let produced = self.child(span, |e| e.emit(*element, slot))?;
            let ty = self.value_type(produced, element_span)?;
            self.unify(&element_ty, &ty, element_span, |left, right| {
                EmitError::TypeMismatch {
                    left,
                    right,
                    notes: vec![format!("in element {} of a vector", index + 1)],
                    span: element_span,
                }
            })?;
            self.push(Instr::VectorPush {
                vector: dest,
                element: produced,
            });
            self.release(slot, element_span)?;
        }

        let ty = self.ctx.prims.vector_of(element_ty);
        self.scopes.set_type(dest, ty);
        Ok(dest)
    }
}
