//! The destackifier: converts basic blocks from stack semantics into
//! three-address assignments over fresh symbolic variables.
//!
//! Stack state is threaded across blocks. Within a call frame the stack
//! flows block to block; on frame entry the outer stack is parked on a
//! saved-stack list and a fresh stack opened, and when the deferred call
//! record shows up after the frame's last op the matching saved stack is
//! restored (popping past entries whose depth does not match).

use alloy_primitives::{Address, I256, U256};
use vandal_types::{FastHashMap, OpCode, RawOp, TACBlock, TACOp, TACProgram, VarArena, VarId};

use crate::errors::TraceError;

#[derive(Debug, Default)]
struct SymStack {
    depth: u16,
    items: Vec<VarId>,
}

impl SymStack {
    fn new(depth: u16) -> Self {
        Self { depth, items: Vec::new() }
    }

    fn push(&mut self, id: VarId) {
        self.items.push(id);
    }

    fn pop(&mut self) -> Option<VarId> {
        self.items.pop()
    }

    /// Pop `n` items, top of stack first.
    fn pop_many(&mut self, n: usize) -> Option<Vec<VarId>> {
        if self.items.len() < n {
            return None
        }
        Some((0..n).map(|_| self.items.pop().unwrap()).collect())
    }

    /// Duplicate the `n`th item from the top (1-indexed).
    fn dup(&mut self, n: usize) -> bool {
        if self.items.len() < n {
            return false
        }
        let id = self.items[self.items.len() - n];
        self.items.push(id);
        true
    }

    /// Swap the top item with the one `n` places below it.
    fn swap(&mut self, n: usize) -> bool {
        let len = self.items.len();
        if len < n + 1 {
            return false
        }
        self.items.swap(len - 1, len - 1 - n);
        true
    }
}

/// Lifts a partitioned trace into a [`TACProgram`].
#[derive(Debug, Default)]
pub struct Destackifier {
    arena: VarArena,
    stack: SymStack,
    saved: Vec<SymStack>,
    var_count: u32,
    memory: FastHashMap<U256, Option<U256>>,
    storage: FastHashMap<U256, Option<U256>>,
}

/// Lift a partitioned trace in one shot.
pub fn lift_trace(blocks: Vec<Vec<RawOp>>, entry_address: Address) -> Result<TACProgram, TraceError> {
    Destackifier::new().lift(blocks, entry_address)
}

impl Destackifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The symbolic storage image accumulated by SSTOREs with a concrete key.
    pub fn storage(&self) -> &FastHashMap<U256, Option<U256>> {
        &self.storage
    }

    /// The symbolic memory image accumulated by MSTORE/MSTORE8 with a
    /// concrete offset.
    pub fn memory(&self) -> &FastHashMap<U256, Option<U256>> {
        &self.memory
    }

    pub fn lift(
        mut self,
        blocks: Vec<Vec<RawOp>>,
        entry_address: Address,
    ) -> Result<TACProgram, TraceError> {
        let mut tac_blocks = Vec::with_capacity(blocks.len());
        let mut prev_depth = None;

        for block in &blocks {
            let first = &block[0];
            self.enter_block(first, prev_depth)?;

            let mut ops = Vec::with_capacity(block.len());
            for op in block {
                self.translate(op, &mut ops)?;
            }

            let last = block.last().expect("blocks are non-empty");
            prev_depth = Some(last.depth);
            tac_blocks.push(TACBlock { entry_pc: first.pc, exit_pc: last.pc, ops });
        }

        Ok(TACProgram { blocks: tac_blocks, arena: self.arena, entry_address })
    }

    fn enter_block(&mut self, first: &RawOp, prev_depth: Option<u16>) -> Result<(), TraceError> {
        let Some(prev_depth) = prev_depth else {
            self.stack = SymStack::new(first.depth);
            return Ok(())
        };

        if first.depth > prev_depth {
            // frame entry: park the caller's stack
            let outer = std::mem::replace(&mut self.stack, SymStack::new(first.depth));
            self.saved.push(outer);
        } else if first.depth < prev_depth {
            // frame return: the deferred call record resumes the caller
            self.stack = self.restore_stack(first)?;
        }
        Ok(())
    }

    fn restore_stack(&mut self, first: &RawOp) -> Result<SymStack, TraceError> {
        let mismatch =
            || TraceError::StackDepthMismatch { depth: first.depth, op_index: first.op_index };
        let mut restored = self.saved.pop().ok_or_else(mismatch)?;
        while restored.depth != first.depth {
            restored = self.saved.pop().ok_or_else(mismatch)?;
        }
        Ok(restored)
    }

    fn translate(&mut self, op: &RawOp, ops: &mut Vec<TACOp>) -> Result<(), TraceError> {
        match op.opcode {
            OpCode::Dup(n) => {
                if !self.stack.dup(n as usize) {
                    return Err(underflow(op))
                }
            }
            OpCode::Swap(n) => {
                if !self.stack.swap(n as usize) {
                    return Err(underflow(op))
                }
            }
            OpCode::Pop => {
                self.stack.pop().ok_or_else(|| underflow(op))?;
            }
            OpCode::Push(_) => {
                let lhs = self.fresh(op.value, Vec::new());
                ops.push(tac(op, OpCode::Const, Vec::new(), Some(lhs)));
                self.stack.push(lhs);
            }
            OpCode::JumpDest => {
                ops.push(tac(op, op.opcode, Vec::new(), None));
            }
            OpCode::MLoad | OpCode::SLoad => {
                let args = self.pop_args(op)?;
                let lhs = self.fresh(op.value, args.clone());
                ops.push(tac(op, op.opcode, args, Some(lhs)));
                self.stack.push(lhs);
            }
            OpCode::MStore | OpCode::MStore8 => {
                let args = self.pop_args(op)?;
                if let Some(offset) = self.arena.value(args[0]) {
                    self.memory.insert(offset, self.arena.value(args[1]));
                }
                ops.push(tac(op, op.opcode, args, None));
            }
            OpCode::SStore => {
                let args = self.pop_args(op)?;
                if let Some(key) = self.arena.value(args[0]) {
                    self.storage.insert(key, self.arena.value(args[1]));
                }
                ops.push(tac(op, op.opcode, args, None));
            }
            _ if op.opcode.is_kind_one() => {
                let lhs = self.fresh(op.value, Vec::new());
                ops.push(tac(op, op.opcode, Vec::new(), Some(lhs)));
                self.stack.push(lhs);
            }
            _ if op.opcode.is_kind_two()
                || op.opcode.is_kind_four()
                || op.opcode.is_kind_five() =>
            {
                let args = self.pop_args(op)?;
                let lhs = self.fresh(op.value, args.clone());
                ops.push(tac(op, op.opcode, args, Some(lhs)));
                self.stack.push(lhs);
            }
            _ if op.opcode.is_kind_three_store_two() => {
                let args = self.pop_args(op)?;
                ops.push(tac(op, op.opcode, args, None));
            }
            _ if op.opcode.is_arithmetic() => {
                let args = self.pop_args(op)?;
                let folded = args
                    .iter()
                    .map(|&arg| self.arena.value(arg))
                    .collect::<Option<Vec<_>>>()
                    .map(|values| fold(op.opcode, &values));
                let lhs = self.fresh(folded, args.clone());
                ops.push(tac(op, op.opcode, args, Some(lhs)));
                self.stack.push(lhs);
            }
            _ => {
                // JUMP/JUMPI, LOG, halts, SHA3 and anything else with the
                // declared arities
                let args = self.pop_args(op)?;
                if op.opcode.push_arity() == 1 {
                    let lhs = self.fresh(None, args.clone());
                    ops.push(tac(op, op.opcode, args, Some(lhs)));
                    self.stack.push(lhs);
                } else {
                    ops.push(tac(op, op.opcode, args, None));
                }
            }
        }
        Ok(())
    }

    fn pop_args(&mut self, op: &RawOp) -> Result<Vec<VarId>, TraceError> {
        self.stack
            .pop_many(op.opcode.pop_arity())
            .ok_or_else(|| underflow(op))
    }

    fn fresh(&mut self, value: Option<U256>, parents: Vec<VarId>) -> VarId {
        let name = format!("V{}", self.var_count);
        self.var_count += 1;
        self.arena.alloc(name, value, parents)
    }
}

fn underflow(op: &RawOp) -> TraceError {
    TraceError::StackUnderflow { opcode: op.opcode.name(), op_index: op.op_index, pc: op.pc }
}

fn tac(raw: &RawOp, opcode: OpCode, args: Vec<VarId>, lhs: Option<VarId>) -> TACOp {
    TACOp {
        opcode,
        pc: raw.pc,
        depth: raw.depth,
        call_index: raw.call_index,
        op_index: raw.op_index,
        args,
        lhs,
        value: raw.value,
        extra: raw.extra,
    }
}

/// Constant folding over traced values, with EVM semantics. `args` is in
/// stack order, top first.
fn fold(opcode: OpCode, args: &[U256]) -> U256 {
    let a = args[0];
    let b = args.get(1).copied().unwrap_or_default();
    match opcode {
        OpCode::Add => a.wrapping_add(b),
        OpCode::Mul => a.wrapping_mul(b),
        OpCode::Sub => a.wrapping_sub(b),
        OpCode::Div => checked(b, || a / b),
        OpCode::SDiv => checked(b, || {
            let (a, b) = (I256::from_raw(a), I256::from_raw(b));
            a.checked_div(b).unwrap_or(I256::MIN).into_raw()
        }),
        OpCode::Mod => checked(b, || a % b),
        OpCode::SMod => checked(b, || {
            let (a, b) = (I256::from_raw(a), I256::from_raw(b));
            a.checked_rem(b).unwrap_or(I256::ZERO).into_raw()
        }),
        OpCode::AddMod => checked(args[2], || a.add_mod(b, args[2])),
        OpCode::MulMod => checked(args[2], || a.mul_mod(b, args[2])),
        OpCode::Exp => a.wrapping_pow(b),
        OpCode::SignExtend => sign_extend(a, b),
        OpCode::Lt => bool_word(a < b),
        OpCode::Gt => bool_word(a > b),
        OpCode::Slt => bool_word(I256::from_raw(a) < I256::from_raw(b)),
        OpCode::Sgt => bool_word(I256::from_raw(a) > I256::from_raw(b)),
        OpCode::Eq => bool_word(a == b),
        OpCode::IsZero => bool_word(a.is_zero()),
        OpCode::And => a & b,
        OpCode::Or => a | b,
        OpCode::Xor => a ^ b,
        OpCode::Not => !a,
        OpCode::Byte => byte(a, b),
        OpCode::Shl => word_shift(a, |s| b << s),
        OpCode::Shr => word_shift(a, |s| b >> s),
        OpCode::Sar => sar(a, b),
        _ => unreachable!("fold called on non-arithmetic opcode {opcode}"),
    }
}

fn checked(divisor: U256, f: impl FnOnce() -> U256) -> U256 {
    if divisor.is_zero() {
        U256::ZERO
    } else {
        f()
    }
}

fn bool_word(b: bool) -> U256 {
    U256::from(b as u8)
}

fn sign_extend(byte_index: U256, x: U256) -> U256 {
    if byte_index >= U256::from(31) {
        return x
    }
    let bit = byte_index.to::<usize>() * 8 + 7;
    let mask = U256::MAX << (bit + 1);
    if x.bit(bit) {
        x | mask
    } else {
        x & !mask
    }
}

fn byte(index: U256, x: U256) -> U256 {
    if index >= U256::from(32) {
        return U256::ZERO
    }
    let shift = (31 - index.to::<usize>()) * 8;
    (x >> shift) & U256::from(0xffu8)
}

fn word_shift(shift: U256, f: impl FnOnce(usize) -> U256) -> U256 {
    match usize::try_from(shift) {
        Ok(s) if s < 256 => f(s),
        _ => U256::ZERO,
    }
}

fn sar(shift: U256, value: U256) -> U256 {
    match usize::try_from(shift) {
        Ok(s) if s < 256 => I256::from_raw(value).asr(s).into_raw(),
        _ if value.bit(255) => U256::MAX,
        _ => U256::ZERO,
    }
}
