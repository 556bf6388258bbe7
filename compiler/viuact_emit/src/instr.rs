//! Assembly instructions and compiled function bodies.
//!
//! Every instruction renders to exactly one line of VM assembly.

use std::fmt;

use viuact_types::FnType;

use crate::Slot;

/// Jump target, unique within one function.
///
/// Labels are numbered by a per-function counter, so structurally identical
/// forms emitted twice never collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    pub kind: &'static str,
    pub n: u32,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.n)
    }
}

/// Target of a call instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callable {
    /// Fully qualified `name/arity`.
    Symbol(String),
    /// Function value held in a slot.
    Slot(Slot),
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Symbol(symbol) => f.write_str(symbol),
            Callable::Slot(slot) => write!(f, "{slot}"),
        }
    }
}

/// Three-operand arithmetic, comparison, and text instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    TextConcat,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Eq => "eq",
            BinaryOp::Lt => "lt",
            BinaryOp::Lte => "lte",
            BinaryOp::Gt => "gt",
            BinaryOp::Gte => "gte",
            BinaryOp::TextConcat => "textconcat",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    AllocateRegisters(u32),
    Comment(String),
    Blank,
    Mark(Label),
    Jump(Label),
    /// `if cond then otherwise`
    Branch {
        cond: Slot,
        then: Label,
        otherwise: Label,
    },

    // ── Data movement ───────────────────────────────────────────────
    Move { dest: Slot, src: Slot },
    Ptr { dest: Slot, src: Slot },
    Delete(Slot),

    // ── Constructors ────────────────────────────────────────────────
    /// String literal, stored unquoted.
    Text { dest: Slot, value: String },
    /// Convert any value to its text form.
    Stringify { dest: Slot, src: Slot },
    Integer { dest: Slot, value: i64 },
    Atom { dest: Slot, value: String },
    Struct(Slot),
    StructInsert { target: Slot, key: Slot, value: Slot },
    StructAt { dest: Slot, source: Slot, key: Slot },
    StructRemove { dest: Slot, source: Slot, key: Slot },
    Vector(Slot),
    VectorPush { vector: Slot, element: Slot },

    // ── Operators ───────────────────────────────────────────────────
    Not { dest: Slot, src: Slot },
    Binary {
        op: BinaryOp,
        dest: Slot,
        lhs: Slot,
        rhs: Slot,
    },

    // ── Builtins ────────────────────────────────────────────────────
    Print(Slot),
    Echo(Slot),

    // ── Calls and function values ───────────────────────────────────
    Frame(usize),
    Call { dest: Slot, callee: Callable },
    Process { dest: Slot, callee: Callable },
    TailCall(Callable),
    Defer(Callable),
    FunctionRef { dest: Slot, symbol: String },
    Closure { dest: Slot, symbol: String },
    /// Copy `src` into register `index` of the closure held in `closure`.
    CaptureCopy { closure: Slot, index: u32, src: Slot },
    Return,

    // ── Exceptions ──────────────────────────────────────────────────
    Exception { dest: Slot, tag: Slot, value: Slot },
    Throw(Slot),
    Draw(Slot),
    ExceptionValue { dest: Slot, src: Slot },
    Try,
    Catch { tag: String, block: Label },
    EndBlock,
    Enter(Label),
    Leave,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::AllocateRegisters(n) => write!(f, "allocate_registers %{n} local"),
            Instr::Comment(text) => write!(f, "; {text}"),
            Instr::Blank => Ok(()),
            Instr::Mark(label) => write!(f, ".mark: {label}"),
            Instr::Jump(label) => write!(f, "jump {label}"),
            Instr::Branch {
                cond,
                then,
                otherwise,
            } => write!(f, "if {cond} {then} {otherwise}"),

            Instr::Move { dest, src } => write!(f, "move {dest} {src}"),
            Instr::Ptr { dest, src } => write!(f, "ptr {dest} {src}"),
            Instr::Delete(slot) => write!(f, "delete {slot}"),

            Instr::Text { dest, value } => write!(f, "text {dest} {value:?}"),
            Instr::Stringify { dest, src } => write!(f, "text {dest} {src}"),
            Instr::Integer { dest, value } => write!(f, "integer {dest} {value}"),
            Instr::Atom { dest, value } => write!(f, "atom {dest} '{value}'"),
            Instr::Struct(slot) => write!(f, "struct {slot}"),
            Instr::StructInsert { target, key, value } => {
                write!(f, "structinsert {target} {key} {value}")
            }
            Instr::StructAt { dest, source, key } => write!(f, "structat {dest} {source} {key}"),
            Instr::StructRemove { dest, source, key } => {
                write!(f, "structremove {dest} {source} {key}")
            }
            Instr::Vector(slot) => write!(f, "vector {slot}"),
            Instr::VectorPush { vector, element } => write!(f, "vpush {vector} {element}"),

            Instr::Not { dest, src } => write!(f, "not {dest} {src}"),
            Instr::Binary { op, dest, lhs, rhs } => {
                write!(f, "{} {dest} {lhs} {rhs}", op.mnemonic())
            }

            Instr::Print(slot) => write!(f, "print {slot}"),
            Instr::Echo(slot) => write!(f, "echo {slot}"),

            Instr::Frame(n) => write!(f, "frame %{n} arguments"),
            Instr::Call { dest, callee } => write!(f, "call {dest} {callee}"),
            Instr::Process { dest, callee } => write!(f, "process {dest} {callee}"),
            Instr::TailCall(callee) => write!(f, "tailcall {callee}"),
            Instr::Defer(callee) => write!(f, "defer {callee}"),
            Instr::FunctionRef { dest, symbol } => write!(f, "function {dest} {symbol}"),
            Instr::Closure { dest, symbol } => write!(f, "closure {dest} {symbol}"),
            Instr::CaptureCopy {
                closure,
                index,
                src,
            } => write!(f, "capturecopy {closure} %{index} {src}"),
            Instr::Return => f.write_str("return"),

            Instr::Exception { dest, tag, value } => write!(f, "exception {dest} {tag} {value}"),
            Instr::Throw(slot) => write!(f, "throw {slot}"),
            Instr::Draw(slot) => write!(f, "draw {slot}"),
            Instr::ExceptionValue { dest, src } => write!(f, "exception_value {dest} {src}"),
            Instr::Try => f.write_str("try"),
            Instr::Catch { tag, block } => write!(f, "catch '{tag}' .block: {block}"),
            Instr::EndBlock => f.write_str(".end"),
            Instr::Enter(block) => write!(f, "enter .block: {block}"),
            Instr::Leave => f.write_str("leave"),
        }
    }
}

/// A compiled function, ready to be written out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionCode {
    /// Fully qualified name without the arity suffix.
    pub name: String,
    pub arity: usize,
    /// Compiled as a closure: it captured values from an enclosing function.
    pub closure: bool,
    /// Declared signature, or the generalised inferred one for nested
    /// functions.
    pub signature: FnType,
    /// Complete body, from the register directive to the final `return`.
    pub body: Vec<Instr>,
}

impl FunctionCode {
    /// `name/arity`, as used by call instructions.
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.name, self.arity)
    }

    /// Local registers requested by the body.
    pub fn registers(&self) -> Option<u32> {
        self.body.iter().find_map(|instr| match instr {
            Instr::AllocateRegisters(n) => Some(*n),
            _ => None,
        })
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = if self.closure { ".closure:" } else { ".function:" };
        writeln!(f, "{header} {}", self.symbol())?;
        for instr in &self.body {
            match instr {
                Instr::Blank => writeln!(f)?,
                other => writeln!(f, "    {other}")?,
            }
        }
        write!(f, ".end")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use viuact_types::Type;

    use super::*;

    #[test]
    fn renders_assembly_lines() {
        let r = Slot::local(1);
        let label = Label {
            kind: "if_true",
            n: 0,
        };
        let cases = [
            (Instr::AllocateRegisters(3), "allocate_registers %3 local"),
            (
                Instr::Text {
                    dest: r,
                    value: "say \"hi\"".to_string(),
                },
                "text %1 local \"say \\\"hi\\\"\"",
            ),
            (
                Instr::Atom {
                    dest: r,
                    value: "tag".to_string(),
                },
                "atom %1 local 'tag'",
            ),
            (
                Instr::Move {
                    dest: Slot::argument(0),
                    src: r,
                },
                "move %0 arguments %1 local",
            ),
            (Instr::Mark(label), ".mark: if_true_0"),
            (
                Instr::Binary {
                    op: BinaryOp::Lte,
                    dest: Slot::local(0),
                    lhs: r,
                    rhs: Slot::local(2).as_pointer(),
                },
                "lte %0 local %1 local *2 local",
            ),
            (
                Instr::Call {
                    dest: Slot::VOID,
                    callee: Callable::Symbol("Std::Io::print/1".to_string()),
                },
                "call void Std::Io::print/1",
            ),
            (
                Instr::TailCall(Callable::Slot(r)),
                "tailcall %1 local",
            ),
            (
                Instr::CaptureCopy {
                    closure: r,
                    index: 2,
                    src: Slot::local(4),
                },
                "capturecopy %1 local %2 %4 local",
            ),
            (
                Instr::Catch {
                    tag: "Oops".to_string(),
                    block: Label {
                        kind: "catch_arm",
                        n: 1,
                    },
                },
                "catch 'Oops' .block: catch_arm_1",
            ),
        ];
        for (instr, text) in cases {
            assert_eq!(instr.to_string(), text);
        }
    }

    #[test]
    fn function_body_is_indented_between_header_and_end() {
        let code = FunctionCode {
            name: "main".to_string(),
            arity: 0,
            closure: false,
            signature: FnType {
                ret: Type::Void,
                params: Vec::new(),
                templates: Vec::new(),
            },
            body: vec![
                Instr::AllocateRegisters(1),
                Instr::Blank,
                Instr::Return,
            ],
        };
        assert_eq!(
            code.to_string(),
            ".function: main/0\n    allocate_registers %1 local\n\n    return\n.end"
        );
        assert_eq!(code.registers(), Some(1));
    }
}
