use alloy_primitives::B256;
use thiserror::Error;

/// Failures while acquiring, decoding or lifting a trace. Per-transaction
/// kinds are logged and skipped in streaming mode; fatal in one-shot mode.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("empty trace for transaction {0}")]
    EmptyTrace(B256),
    #[error("unknown opcode `{0}` on trace line {1}")]
    UnknownOpcode(String, usize),
    #[error("malformed trace line {0}: `{1}`")]
    BadLine(usize, String),
    #[error("bad value field on trace line {0}: `{1}`")]
    ValueParse(usize, String),
    #[error("stack underflow lifting {opcode} at op {op_index} (pc {pc})")]
    StackUnderflow { opcode: &'static str, op_index: u32, pc: u32 },
    #[error("no saved stack for depth {depth} at op {op_index}")]
    StackDepthMismatch { depth: u16, op_index: u32 },
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("rpc error: {0}")]
    Rpc(String),
}
