//! Three-address code produced by the lifter.

use alloy_primitives::{Address, U256};

use crate::{OpCode, VarArena, VarId};

/// A single three-address operation. `args` is the ordered operand list in
/// stack order, top of stack first; `lhs` is the defined variable for
/// value-producing ops.
#[derive(Debug, Clone)]
pub struct TACOp {
    pub opcode: OpCode,
    pub pc: u32,
    pub depth: u16,
    pub call_index: u32,
    pub op_index: u32,
    pub args: Vec<VarId>,
    pub lhs: Option<VarId>,
    pub value: Option<U256>,
    pub extra: Option<U256>,
}

impl TACOp {
    pub fn has_lhs(&self) -> bool {
        self.lhs.is_some()
    }
}

/// A run of TAC ops with single-entry control flow.
#[derive(Debug, Clone)]
pub struct TACBlock {
    pub entry_pc: u32,
    pub exit_pc: u32,
    pub ops: Vec<TACOp>,
}

impl TACBlock {
    pub fn last_op(&self) -> Option<&TACOp> {
        self.ops.last()
    }
}

/// A fully lifted trace: the block sequence plus the variable arena the
/// blocks' operands live in.
#[derive(Debug, Clone)]
pub struct TACProgram {
    pub blocks: Vec<TACBlock>,
    pub arena: VarArena,
    /// The top-level `to` address; executing address at depth 1.
    pub entry_address: Address,
}

impl TACProgram {
    /// All ops in trace order.
    pub fn ops(&self) -> impl Iterator<Item = &TACOp> {
        self.blocks.iter().flat_map(|block| block.ops.iter())
    }
}
