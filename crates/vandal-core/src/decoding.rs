//! Decoding of the line-oriented Vandal trace format.
//!
//! Each non-empty record is a 7-field CSV:
//! `pc,call_index,depth,opcode,_,_,value_spec` where `value_spec` is `0x`,
//! `0xHEX`, or `0xHEX:0xHEX` (primary:extra). The raw line number becomes the
//! trace-global `op_index`.

use alloy_primitives::{Address, B256, U256};
use serde::Deserialize;
use vandal_types::{OpCode, RawOp};

use crate::errors::TraceError;

/// Response envelope of `debug_traceVandalTransaction`.
#[derive(Debug, Clone, Deserialize)]
pub struct VandalTrace {
    /// Top-level callee; the executing address at depth 1.
    pub to: Address,
    /// The newline-separated op records.
    pub optrace: Option<String>,
    /// Op count reported by the node; absent for non-executing transactions.
    #[serde(rename = "Ops")]
    pub ops: Option<u64>,
    /// Filled in from the request, not the response body.
    #[serde(default)]
    pub tx_hash: B256,
}

/// Parse the trace body into raw op records.
pub fn decode_trace(trace: &VandalTrace) -> Result<Vec<RawOp>, TraceError> {
    let body = trace
        .optrace
        .as_deref()
        .ok_or(TraceError::EmptyTrace(trace.tx_hash))?;

    let mut ops = Vec::new();
    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue
        }
        ops.push(decode_line(index, line)?);
    }

    if ops.is_empty() {
        return Err(TraceError::EmptyTrace(trace.tx_hash))
    }
    Ok(ops)
}

fn decode_line(index: usize, line: &str) -> Result<RawOp, TraceError> {
    let bad_line = || TraceError::BadLine(index, line.to_string());

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 7 {
        return Err(bad_line())
    }

    let pc: u32 = fields[0].trim().parse().map_err(|_| bad_line())?;
    let call_index: u32 = fields[1].trim().parse().map_err(|_| bad_line())?;
    let depth: u16 = fields[2].trim().parse().map_err(|_| bad_line())?;

    let name = fields[3].trim();
    let opcode = OpCode::from_name(name)
        .ok_or_else(|| TraceError::UnknownOpcode(name.to_string(), index))?;

    let (value, extra) = decode_value(index, fields[6].trim())?;

    Ok(RawOp { pc, opcode, call_index, depth, op_index: index as u32, value, extra })
}

fn decode_value(index: usize, spec: &str) -> Result<(Option<U256>, Option<U256>), TraceError> {
    match spec.split_once(':') {
        Some((primary, extra)) => {
            let value = parse_hex(index, primary)?;
            let extra = if extra == "0x" { None } else { Some(parse_hex(index, extra)?) };
            Ok((Some(value), extra))
        }
        None => Ok((Some(parse_hex(index, spec)?), None)),
    }
}

// A bare `0x` denotes a zero word, per the tracer.
fn parse_hex(index: usize, field: &str) -> Result<U256, TraceError> {
    let digits = field
        .strip_prefix("0x")
        .ok_or_else(|| TraceError::ValueParse(index, field.to_string()))?;
    if digits.is_empty() {
        return Ok(U256::ZERO)
    }
    U256::from_str_radix(digits, 16).map_err(|_| TraceError::ValueParse(index, field.to_string()))
}
