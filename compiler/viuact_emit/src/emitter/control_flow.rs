//! Conditionals, pattern matching, and exceptions.
//!
//! Labels come from the per-function counter: one number per `if`, per
//! match (plus one per with-clause), and per `try` and catch arm. Arms of
//! every construct write the same result slot, and their types must unify.

use rustc_hash::{FxHashMap, FxHashSet};
use viuact_ir::{CatchArm, FormId, MatchArm, Name, Span};
use viuact_types::{Type, TypeVar};

use crate::{BinaryOp, EmitError, Instr, Label, Slot};

use super::records::{TAG_KEY, VALUE_KEY};
use super::{type_mismatch, FnEmitter};

/// Atom thrown when no with-clause matches.
const MATCH_FAILED: &str = "Match_failed";

impl FnEmitter<'_> {
    /// Result slot shared by the arms of a branching construct.
    fn arm_target(target: Slot) -> Slot {
        if target.is_void() {
            Slot::VOID
        } else {
            target.as_disposable(false)
        }
    }

    // ── If ──────────────────────────────────────────────────────────

    pub(super) fn emit_if(
        &mut self,
        guard: FormId,
        then_arm: FormId,
        else_arm: FormId,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let n = self.next_label();
        let if_true = Label { kind: "if_true", n };
        let if_false = Label { kind: "if_false", n };
        let if_end = Label { kind: "if_end", n };

        let guard_span = self.ctx.arena.span(guard);
        let slot = self.scopes.disposable();
        let cond = self.child(span, |e| e.emit(guard, slot))?;
        let guard_ty = self.value_type(cond, guard_span)?;
        let bool_ty = self.ctx.prims.bool_type();
        self.unify(&bool_ty, &guard_ty, guard_span, type_mismatch(guard_span))?;
        self.push(Instr::Branch {
            cond,
            then: if_true,
            otherwise: if_false,
        });
        self.release_anonymous(cond, guard_span)?;

        let result = Self::arm_target(target);
        let saved = self.scopes.snapshot();
        let mut types = Vec::with_capacity(2);
        for (label, arm) in [(if_true, then_arm), (if_false, else_arm)] {
            if label == if_false {
                self.scopes.restore(&saved);
            }
            self.blank();
            self.push(Instr::Mark(label));
            let produced = self.child(span, |e| e.emit(arm, result))?;
            if let Some(ty) = self.scopes.type_of(produced).cloned() {
                types.push(ty);
            }
            if label == if_true {
                self.push(Instr::Jump(if_end));
            }
        }

        if let [then_ty, else_ty] = types.as_slice() {
            self.unify(then_ty, else_ty, span, |then_ty, else_ty| EmitError::IfBranches {
                then_ty,
                else_ty,
                span,
            })?;
        }
        if let Some(ty) = types.first() {
            let ty = self.types.resolve(ty);
            self.scopes.set_type(result, ty);
        }

        self.blank();
        self.push(Instr::Mark(if_end));
        Ok(result)
    }

    // ── Match ───────────────────────────────────────────────────────

    pub(super) fn emit_match(
        &mut self,
        guard: FormId,
        arms: &[MatchArm],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        if arms.is_empty() {
            return Err(EmitError::NoArms {
                what: "match",
                span,
            });
        }

        let guard_span = self.ctx.arena.span(guard);
        let slot = self.scopes.disposable();
        let guard_slot = self.child(span, |e| e.emit(guard, slot))?;
        let guard_ty = self.types.resolve(&self.value_type(guard_slot, guard_span)?);
        let not_an_enum = |e: &Self| EmitError::NotAnEnum {
            actual: e.show(&guard_ty),
            span: guard_span,
        };
        let Type::Value {
            name: enum_name,
            args: enum_args,
        } = guard_ty.strip_pointer()
        else {
            return Err(not_an_enum(self));
        };
        let view = self.ctx.view;
        let def = view
            .find_enum(*enum_name)
            .ok_or_else(|| not_an_enum(self))?;

        // ── Exhaustiveness and clause checks
        let mut covered = FxHashSet::default();
        let mut catch_all = false;
        for (i, arm) in arms.iter().enumerate() {
            let Some(tag) = arm.tag else {
                if i + 1 != arms.len() {
                    return Err(EmitError::CatchAllNotLast { span: arm.span });
                }
                if let Some(binding) = arm.binding {
                    return Err(EmitError::BindingBarePayload {
                        tag: "_".to_string(),
                        binding: self.text(binding).to_string(),
                        span: arm.span,
                    });
                }
                catch_all = true;
                continue;
            };
            let field = def.field(tag).ok_or_else(|| EmitError::ForeignTag {
                enum_name: self.text(*enum_name).to_string(),
                tag: self.text(tag).to_string(),
                span: arm.span,
            })?;
            if !covered.insert(tag) {
                return Err(EmitError::DuplicatedWithClause {
                    enum_name: self.text(*enum_name).to_string(),
                    field: self.text(tag).to_string(),
                    span: arm.span,
                });
            }
            if let (Some(binding), None) = (arm.binding, &field.payload) {
                return Err(EmitError::BindingBarePayload {
                    tag: self.text(tag).to_string(),
                    binding: self.text(binding).to_string(),
                    span: arm.span,
                });
            }
        }
        if !catch_all {
            if let Some(missing) = def.fields.iter().find(|f| !covered.contains(&f.name)) {
                return Err(EmitError::MissingWithClause {
                    enum_name: self.text(*enum_name).to_string(),
                    field: self.text(missing.name).to_string(),
                    span,
                });
            }
        }

        // ── Dispatch on the tag
        let n = self.next_label();
        let done = Label {
            kind: "match_done",
            n,
        };
        let fail = Label {
            kind: "match_fail",
            n,
        };
        let labels: Vec<(Label, Label)> = arms
            .iter()
            .map(|_| {
                let n = self.next_label();
                (
                    Label {
                        kind: "with_arm_cond",
                        n,
                    },
                    Label {
                        kind: "with_arm_expr",
                        n,
                    },
                )
            })
            .collect();

        let source = if matches!(guard_ty, Type::Pointer(_)) && !guard_slot.inhibits_deref() {
            guard_slot.as_pointer()
        } else {
            guard_slot
        };
        let key = self.scopes.anonymous();
        let check = self.scopes.anonymous();
        self.push(Instr::Atom {
            dest: key,
            value: TAG_KEY.to_string(),
        });
        self.push(Instr::StructAt {
            dest: key,
            source,
            key,
        });

        for (i, arm) in arms.iter().enumerate() {
            let (cond, expr) = labels[i];
            self.push(Instr::Mark(cond));
            let Some(field) = arm.tag.and_then(|tag| def.field(tag)) else {
                self.push(Instr::Jump(expr));
                continue;
            };
            self.push(Instr::Integer {
                dest: check,
                value: i64::from(field.index),
            });
            self.push(Instr::Binary {
                op: BinaryOp::Eq,
                dest: check,
                lhs: check,
                rhs: key.as_pointer(),
            });
            let next = labels.get(i + 1).map_or(fail, |(cond, _)| *cond);
            self.push(Instr::Branch {
                cond: check,
                then: expr,
                otherwise: next,
            });
        }
        if !catch_all {
            self.push(Instr::Mark(fail));
            self.push(Instr::Atom {
                dest: check,
                value: MATCH_FAILED.to_string(),
            });
            self.push(Instr::Exception {
                dest: check,
                tag: check,
                value: Slot::VOID,
            });
            self.push(Instr::Throw(check));
        }

        // ── Arms
        let blueprint: FxHashMap<TypeVar, Type> = def
            .templates
            .iter()
            .copied()
            .zip(enum_args.iter().cloned())
            .collect();
        let result = Self::arm_target(target);
        let mut types: Vec<(Option<Name>, Type)> = Vec::with_capacity(arms.len());
        let saved = self.scopes.snapshot();

        for (i, arm) in arms.iter().enumerate() {
            if i > 0 {
                self.scopes.restore(&saved);
            }
            let (_, expr) = labels[i];
            self.blank();
            self.annotate(|e| {
                format!(
                    "with-clause for {}",
                    arm.tag.map_or("_", |tag| e.text(tag))
                )
            });
            self.push(Instr::Mark(expr));

            let payload = arm
                .tag
                .and_then(|tag| def.field(tag))
                .and_then(|field| field.payload.as_ref());
            let produced = self.child(arm.span, |e| {
                if let (Some(binding), Some(payload)) = (arm.binding, payload) {
                    e.push(Instr::Atom {
                        dest: check,
                        value: VALUE_KEY.to_string(),
                    });
                    let bound = e.scopes.named(binding);
                    e.push(Instr::StructRemove {
                        dest: bound,
                        source,
                        key: check,
                    });
                    e.scopes.set_type(bound, payload.concretise(&blueprint));
                }
                e.emit(arm.body, result)
            })?;
            if let Some(ty) = self.scopes.type_of(produced).cloned() {
                types.push((arm.tag, ty));
            }
            if i + 1 < arms.len() {
                self.push(Instr::Jump(done));
            }
        }
        self.push(Instr::Mark(done));
        self.blank();

        if let Some(((first_tag, first_ty), rest)) = types.split_first() {
            let tag_text = |tag: &Option<Name>, e: &Self| {
                tag.map_or_else(|| "_".to_string(), |t| e.text(t).to_string())
            };
            for (tag, ty) in rest {
                let first = tag_text(first_tag, self);
                let second = tag_text(tag, self);
                self.unify(first_ty, ty, span, |left, right| EmitError::MatchArms {
                    first,
                    second,
                    left,
                    right,
                    span,
                })?;
            }
            let ty = self.types.resolve(first_ty);
            self.scopes.set_type(result, ty);
        }

        self.release(check, span)?;
        self.release(key, span)?;
        self.release_anonymous(guard_slot, guard_span)?;
        Ok(result)
    }

    // ── Exceptions ──────────────────────────────────────────────────

    pub(super) fn emit_throw(
        &mut self,
        tag: Name,
        value: Option<FormId>,
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let view = self.ctx.view;
        let def = view
            .find_exception(tag)
            .ok_or_else(|| EmitError::UnknownException {
                tag: self.text(tag).to_string(),
                span,
            })?;
        let what = format!("exception `{}`", self.text(tag));
        if def.value.is_some() != value.is_some() {
            return Err(EmitError::PayloadPresence {
                what,
                expected: def.value.is_some(),
                span,
            });
        }

        let dest = self.child(span, |e| {
            let payload = match (value, &def.value) {
                (Some(form), Some(declared)) => {
                    let form_span = e.ctx.arena.span(form);
                    let slot = e.scopes.anonymous();
                    let produced = e.emit(form, slot)?;
                    let actual = e.value_type(produced, form_span)?;
                    e.unify(declared, &actual, form_span, |expected, actual| {
                        EmitError::PayloadType {
                            what,
                            expected,
                            actual,
                            span: form_span,
                        }
                    })?;
                    produced
                }
                _ => Slot::VOID,
            };
            let tag_slot = e.scopes.anonymous();
            e.push(Instr::Atom {
                dest: tag_slot,
                value: e.text(tag).to_string(),
            });
            let dest = e.materialise(target);
            e.push(Instr::Exception {
                dest,
                tag: tag_slot,
                value: payload,
            });
            e.push(Instr::Throw(dest));
            Ok(dest)
        })?;
        self.blank();

        if target.is_void() {
            return Ok(Slot::VOID);
        }
        // Control never reaches the result, so it fits any expected type.
        let ty = self.types.fresh_var(Name::EMPTY);
        self.scopes.set_type(dest, ty);
        Ok(dest)
    }

    pub(super) fn emit_try(
        &mut self,
        guard: FormId,
        arms: &[CatchArm],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        if arms.is_empty() {
            return Err(EmitError::NoArms { what: "try", span });
        }
        let view = self.ctx.view;
        let result = Self::arm_target(target);
        let mut types: Vec<(Span, Type)> = Vec::with_capacity(arms.len() + 1);

        // Each catch arm and the guard start from the state before the try.
        let saved = self.scopes.snapshot();
        self.push(Instr::Try);
        for arm in arms {
            self.scopes.restore(&saved);
            let block = Label {
                kind: "catch_arm",
                n: self.next_label(),
            };
            self.push(Instr::Catch {
                tag: self.text(arm.tag).to_string(),
                block,
            });
            let produced = self.child(arm.span, |e| {
                let def = view
                    .find_exception(arm.tag)
                    .ok_or_else(|| EmitError::UnknownException {
                        tag: e.text(arm.tag).to_string(),
                        span: arm.span,
                    })?;
                match (arm.binding, &def.value) {
                    (Some(binding), None) => {
                        return Err(EmitError::BindingBarePayload {
                            tag: e.text(arm.tag).to_string(),
                            binding: e.text(binding).to_string(),
                            span: arm.span,
                        });
                    }
                    (Some(binding), Some(ty)) => {
                        let caught = e.scopes.named(binding);
                        e.push(Instr::Draw(caught));
                        e.push(Instr::ExceptionValue {
                            dest: caught,
                            src: caught,
                        });
                        e.scopes.set_type(caught, ty.clone());
                    }
                    (None, _) => {
                        let caught = e.scopes.anonymous();
                        e.push(Instr::Draw(caught));
                        e.push(Instr::Delete(caught));
                        e.release(caught, arm.span)?;
                    }
                }
                let produced = e.emit(arm.body, result)?;
                e.push(Instr::Leave);
                Ok(produced)
            })?;
            self.push(Instr::EndBlock);
            if let Some(ty) = self.scopes.type_of(produced).cloned() {
                types.push((arm.span, ty));
            }
        }

        let block = Label {
            kind: "try_arm",
            n: self.next_label(),
        };
        self.scopes.restore(&saved);
        self.push(Instr::Enter(block));
        let produced = self.emit(guard, result)?;
        self.push(Instr::Leave);
        self.push(Instr::EndBlock);

        if let Some(guard_ty) = self.scopes.type_of(produced).cloned() {
            for (arm_span, ty) in types {
                self.unify(&guard_ty, &ty, arm_span, |left, right| EmitError::TypeMismatch {
                    left,
                    right,
                    notes: vec![
                        "a catch arm must produce the type of the guarded expression".to_string(),
                    ],
                    span: arm_span,
                })?;
            }
            let ty = self.types.resolve(&guard_ty);
            self.scopes.set_type(result, ty);
        }
        Ok(result)
    }
}
