//! Partitioning of the raw op sequence into basic blocks.
//!
//! A block starts at every JUMPDEST and at every call-frame transition (the
//! depth of adjacent ops differs, covering both callee entry and the
//! deferred call record emitted when a sub-frame returns); a block ends
//! immediately after JUMP/JUMPI and after every halting op. The partition is
//! a total cover and every block is non-empty.

use vandal_types::{OpCode, RawOp};

pub fn partition_blocks(ops: Vec<RawOp>) -> Vec<Vec<RawOp>> {
    let mut blocks = Vec::new();
    let mut current: Vec<RawOp> = Vec::new();

    for op in ops {
        let boundary = current.last().map(|prev| {
            op.opcode == OpCode::JumpDest || prev.opcode.ends_block() || prev.depth != op.depth
        });
        if boundary == Some(true) {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(op);
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}
