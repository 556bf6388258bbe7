//! Records and enum values.
//!
//! Both are VM structs keyed by atoms. A record carries one key per field;
//! an enum value carries its discriminant under `tag` and, for fields with a
//! payload, the payload under `value`.

use rustc_hash::FxHashMap;
use viuact_ir::{FieldInit, FormId, Name, Span};
use viuact_types::{Type, TypeVar};

use crate::{EmitError, Instr, Slot};

use super::FnEmitter;

/// Key of an enum value's discriminant.
pub(super) const TAG_KEY: &str = "tag";
/// Key of an enum value's payload.
pub(super) const VALUE_KEY: &str = "value";

impl FnEmitter<'_> {
    // ── Records ─────────────────────────────────────────────────────

    pub(super) fn emit_record_ctor(
        &mut self,
        record: Name,
        fields: &[FieldInit],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let view = self.ctx.view;
        let def = view
            .find_record(record)
            .ok_or_else(|| EmitError::UnknownRecord {
                name: self.text(record).to_string(),
                span,
            })?;

        let dest = self.materialise(target);
        self.push(Instr::Struct(dest));
        self.scopes.set_type(dest, Type::value(record));

        let interner = self.ctx.interner;
        self.child(span, |e| {
            let key = e.scopes.anonymous();
            for init in fields {
                let declared = def.field(init.name).ok_or_else(|| EmitError::UnknownField {
                    record: e.text(record).to_string(),
                    field: e.text(init.name).to_string(),
                    span: init.span,
                })?;

                let value = e.scopes.anonymous();
                let produced = e.emit(init.value, value)?;
                let actual = e.value_type(produced, init.span)?;
                e.unify(declared, &actual, init.span, |declared, actual| {
                    EmitError::FieldType {
                        record: interner.lookup(record).to_string(),
                        field: interner.lookup(init.name).to_string(),
                        declared,
                        actual,
                        span: init.span,
                    }
                })?;

                e.push(Instr::Atom {
                    dest: key,
                    value: e.text(init.name).to_string(),
                });
                e.push(Instr::StructInsert {
                    target: dest,
                    key,
                    value: produced,
                });
                e.release(value, init.span)?;
            }
            Ok(())
        })?;
        Ok(dest)
    }

    pub(super) fn emit_field_access(
        &mut self,
        base: FormId,
        field: Name,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let dest = self.materialise(target);
        let base_span = self.ctx.arena.span(base);

        let field_ty = self.child(span, |e| {
            let slot = e.scopes.disposable();
            let produced = e.emit(base, slot)?;
            let base_ty = e.types.resolve(&e.value_type(produced, base_span)?);

            let declared = match base_ty.strip_pointer() {
                Type::Value { name, .. } => e
                    .ctx
                    .view
                    .find_record(*name)
                    .and_then(|def| def.field(field)),
                _ => None,
            };
            let Some(declared) = declared.cloned() else {
                return Err(EmitError::UnknownField {
                    record: e.show(&base_ty),
                    field: e.text(field).to_string(),
                    span,
                });
            };

            let key = e.scopes.anonymous();
            e.push(Instr::Atom {
                dest: key,
                value: e.text(field).to_string(),
            });
            let source = if matches!(base_ty, Type::Pointer(_)) && !produced.inhibits_deref() {
                produced.as_pointer()
            } else {
                produced
            };
            e.push(Instr::StructAt { dest, source, key });
            Ok(declared)
        })?;

        let ty = if target.inhibits_deref() {
            Type::pointer(field_ty)
        } else {
            field_ty
        };
        self.scopes.set_type(dest, ty);
        Ok(dest)
    }

    // ── Enums ───────────────────────────────────────────────────────

    pub(super) fn emit_enum_ctor(
        &mut self,
        module: &[Name],
        enum_name: Name,
        field: Name,
        value: Option<FormId>,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let view = self.ctx.view;
        let source = view
            .module(module)
            .ok_or_else(|| EmitError::UnknownModule {
                path: module
                    .iter()
                    .map(|seg| self.text(*seg))
                    .collect::<Vec<_>>()
                    .join("::"),
                span,
            })?;
        let def = source
            .find_enum(enum_name)
            .ok_or_else(|| EmitError::UnknownEnum {
                name: self.path_text(module, enum_name),
                span,
            })?;
        let variant = def.field(field).ok_or_else(|| EmitError::UnknownEnumField {
            enum_name: self.text(enum_name).to_string(),
            field: self.text(field).to_string(),
            span,
        })?;
        let what = format!("enum field `{}`", self.path_text(&[enum_name], field));
        if variant.payload.is_some() != value.is_some() {
            return Err(EmitError::PayloadPresence {
                what,
                expected: variant.payload.is_some(),
                span,
            });
        }

        let dest = self.materialise(target);
        self.push(Instr::Struct(dest));

        let args: Vec<Type> = def
            .templates
            .iter()
            .map(|t| self.types.fresh_var(t.name))
            .collect();
        let blueprint: FxHashMap<TypeVar, Type> =
            def.templates.iter().copied().zip(args.iter().cloned()).collect();

        self.child(span, |e| {
            let key = e.scopes.anonymous();
            let slot = e.scopes.anonymous();
            e.push(Instr::Atom {
                dest: key,
                value: TAG_KEY.to_string(),
            });
            e.push(Instr::Integer {
                dest: slot,
                value: i64::from(variant.index),
            });
            e.push(Instr::StructInsert {
                target: dest,
                key,
                value: slot,
            });

            if let (Some(payload), Some(form)) = (&variant.payload, value) {
                let form_span = e.ctx.arena.span(form);
                e.push(Instr::Atom {
                    dest: key,
                    value: VALUE_KEY.to_string(),
                });
                let produced = e.emit(form, slot)?;
                let actual = e.value_type(produced, form_span)?;
                let expected = payload.concretise(&blueprint);
                e.unify(&expected, &actual, form_span, |expected, actual| {
                    EmitError::PayloadType {
                        what,
                        expected,
                        actual,
                        span: form_span,
                    }
                })?;
                e.push(Instr::StructInsert {
                    target: dest,
                    key,
                    value: produced,
                });
            }
            Ok(())
        })?;

        let args = args.iter().map(|arg| self.types.resolve(arg)).collect();
        self.scopes.set_type(dest, Type::applied(enum_name, args));
        Ok(dest)
    }
}
