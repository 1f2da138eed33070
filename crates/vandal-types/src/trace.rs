//! Raw operation records as they come off the wire format, before lifting.

use alloy_primitives::U256;

use crate::OpCode;

/// One executed EVM instruction from a linearized trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOp {
    /// Program counter within the executing contract.
    pub pc: u32,
    pub opcode: OpCode,
    /// Logical index of the sub-call frame this op executed in.
    pub call_index: u32,
    /// EVM call depth.
    pub depth: u16,
    /// Trace-global monotonically increasing index.
    pub op_index: u32,
    /// Concrete result captured at execution, where the opcode produces an
    /// externally observable word.
    pub value: Option<U256>,
    /// Secondary captured value (e.g. memory returned by a call).
    pub extra: Option<U256>,
}
