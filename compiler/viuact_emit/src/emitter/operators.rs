//! Operator calls: arithmetic, comparison, and text concatenation.
//!
//! Operands are evaluated left to right into disposable slots inside a child
//! scope, so a plain variable operand is read in place. Operators with more
//! than two operands fold from the left into the result slot.

use viuact_ir::{FormId, Operator, Span};
use viuact_types::Type;

use crate::{BinaryOp, EmitError, Instr, Slot};

use super::{type_mismatch, FnEmitter};

impl FnEmitter<'_> {
    pub(super) fn emit_operator(
        &mut self,
        op: Operator,
        args: &[FormId],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        if op.is_comparison() {
            self.emit_comparison(op, args, target, span)
        } else if op.is_arithmetic() {
            self.emit_arithmetic(op, args, target, span)
        } else {
            self.emit_concat(args, target, span)
        }
    }

    /// Evaluate one operand into a disposable slot. Pointer-typed values are
    /// accessed through the `*` sigil.
    fn operand(&mut self, form: FormId) -> Result<(Slot, Type), EmitError> {
        let span = self.ctx.arena.span(form);
        let slot = self.scopes.disposable();
        let produced = self.emit(form, slot)?;
        let ty = self.value_type(produced, span)?;
        let produced = if matches!(self.types.shallow_resolve(&ty), Type::Pointer(_))
            && !produced.inhibits_deref()
        {
            produced.as_pointer()
        } else {
            produced
        };
        Ok((produced, ty))
    }

    fn emit_arithmetic(
        &mut self,
        op: Operator,
        args: &[FormId],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let Some((first, rest)) = args.split_first().filter(|(_, rest)| !rest.is_empty()) else {
            return Err(EmitError::OperandCount {
                op: op.symbol(),
                expected: "at least 2",
                given: args.len(),
                span,
            });
        };
        let binary = match op {
            Operator::Add => BinaryOp::Add,
            Operator::Sub => BinaryOp::Sub,
            Operator::Mul => BinaryOp::Mul,
            _ => BinaryOp::Div,
        };
        let dest = self.materialise(target);

        let ty = self.child(span, |e| {
            let (lhs, lhs_ty) = e.operand(*first)?;
            e.require_integer(op, &lhs_ty, e.ctx.arena.span(*first))?;

            let mut acc = lhs;
            for form in rest {
                let form_span = e.ctx.arena.span(*form);
                let (rhs, rhs_ty) = e.operand(*form)?;
                e.unify(&lhs_ty, &rhs_ty, form_span, type_mismatch(form_span))?;
                // Unification may have bound a template operand to a non-integer.
                e.require_integer(op, &rhs_ty, form_span)?;
                e.push(Instr::Binary {
                    op: binary,
                    dest,
                    lhs: acc,
                    rhs,
                });
                e.release_anonymous(rhs, form_span)?;
                acc = dest;
            }
            e.release_anonymous(lhs, span)?;
            Ok(e.types.resolve(lhs_ty.strip_pointer()))
        })?;

        self.scopes.set_type(dest, ty);
        Ok(dest)
    }

    /// Unknown templates pass; they are checked again once unified.
    fn require_integer(&self, op: Operator, ty: &Type, span: Span) -> Result<(), EmitError> {
        let numeric = match self.types.shallow_resolve(ty).strip_pointer() {
            Type::Value { name, .. } => self.ctx.prims.is_integer(*name),
            Type::Template(_) => true,
            _ => false,
        };
        if numeric {
            return Ok(());
        }
        Err(EmitError::OperandType {
            op: op.symbol(),
            actual: self.show(ty),
            note: "arithmetic needs integer operands",
            span,
        })
    }

    fn emit_comparison(
        &mut self,
        op: Operator,
        args: &[FormId],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let [left, right] = args else {
            return Err(EmitError::OperandCount {
                op: op.symbol(),
                expected: "exactly 2",
                given: args.len(),
                span,
            });
        };
        let binary = match op {
            Operator::Lt => BinaryOp::Lt,
            Operator::Le => BinaryOp::Lte,
            Operator::Gt => BinaryOp::Gt,
            Operator::Ge => BinaryOp::Gte,
            _ => BinaryOp::Eq,
        };
        let dest = self.materialise(target);

        self.child(span, |e| {
            let (lhs, lhs_ty) = e.operand(*left)?;
            let (rhs, rhs_ty) = e.operand(*right)?;
            let right_span = e.ctx.arena.span(*right);
            e.unify(&lhs_ty, &rhs_ty, right_span, type_mismatch(right_span))?;
            e.push(Instr::Binary {
                op: binary,
                dest,
                lhs,
                rhs,
            });
            if op == Operator::Ne {
                e.push(Instr::Not { dest, src: dest });
            }
            e.release_anonymous(rhs, span)?;
            e.release_anonymous(lhs, span)
        })?;

        self.scopes.set_type(dest, self.ctx.prims.bool_type());
        Ok(dest)
    }

    fn emit_concat(
        &mut self,
        args: &[FormId],
        target: Slot,
        span: Span,
    ) -> Result<Slot, EmitError> {
        let Some((first, rest)) = args.split_first().filter(|(_, rest)| !rest.is_empty()) else {
            return Err(EmitError::OperandCount {
                op: Operator::Concat.symbol(),
                expected: "at least 2",
                given: args.len(),
                span,
            });
        };
        let dest = self.materialise(target);

        self.child(span, |e| {
            let lhs = e.text_operand(*first)?;
            let mut acc = lhs;
            for form in rest {
                let rhs = e.text_operand(*form)?;
                e.push(Instr::Binary {
                    op: BinaryOp::TextConcat,
                    dest,
                    lhs: acc,
                    rhs,
                });
                e.release_anonymous(rhs, span)?;
                acc = dest;
            }
            e.release_anonymous(lhs, span)
        })?;

        self.scopes.set_type(dest, self.ctx.prims.string_type());
        Ok(dest)
    }

    /// Operand of a concatenation, stringified unless it already is text.
    fn text_operand(&mut self, form: FormId) -> Result<Slot, EmitError> {
        let (slot, ty) = self.operand(form)?;
        let is_text = matches!(
            self.types.shallow_resolve(&ty).strip_pointer(),
            Type::Value { name, .. } if *name == self.ctx.prims.string
        );
        if is_text {
            return Ok(slot);
        }

        let dest = if slot.is_anonymous() && !slot.is_pointer() {
            slot
        } else {
            self.scopes.anonymous()
        };
        self.push(Instr::Stringify { dest, src: slot });
        self.scopes.set_type(dest, self.ctx.prims.string_type());
        Ok(dest)
    }
}
