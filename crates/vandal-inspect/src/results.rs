//! Materialized heuristic results.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use serde::Serialize;
use serde_json::{json, Value};
use vandal_types::VarArena;

use crate::meta_op::MetaOp;

/// One op of a result row, detached from the arena so results outlive the
/// analysis.
#[derive(Debug, Clone, Serialize)]
pub struct RowOp {
    pub opcode: &'static str,
    pub op_index: u32,
    pub call_index: u32,
    pub pc: u32,
    pub depth: u16,
    pub address: Option<Address>,
    /// Named slots with their concrete values, where known.
    pub vars: BTreeMap<String, Option<U256>>,
}

impl RowOp {
    pub fn from_meta(op: &MetaOp, arena: &VarArena) -> Self {
        Self {
            opcode: op.opcode.name(),
            op_index: op.op_index,
            call_index: op.call_index,
            pc: op.pc,
            depth: op.depth,
            address: op.address,
            vars: op
                .named_vars()
                .into_iter()
                .map(|(name, id)| (name, arena.value(id)))
                .collect(),
        }
    }

    /// Resolve an attribute or slot name for keyed projection.
    fn lookup(&self, attr: &str) -> Option<Value> {
        match attr {
            "op_index" => Some(json!(self.op_index)),
            "call_index" | "call_number" => Some(json!(self.call_index)),
            "pc" => Some(json!(self.pc)),
            "depth" => Some(json!(self.depth)),
            "opcode" => Some(json!(self.opcode)),
            "address" => Some(json!(self.address)),
            slot => self.vars.get(slot).map(|value| json!(value)),
        }
    }
}

/// The rows a view materialized, along with the projection keys the owning
/// heuristic declared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Results {
    pub keys: Vec<String>,
    pub rows: Vec<Vec<RowOp>>,
}

impl Results {
    pub fn new(keys: &[&str]) -> Self {
        Self { keys: keys.iter().map(|k| k.to_string()).collect(), rows: Vec::new() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn add_row(&mut self, row: Vec<RowOp>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Project each row through the declared keys (`CLASS.attribute`). Rows
    /// are matched by collapsed opcode name; keys without a matching op in
    /// the row are omitted. With no keys declared, the base attribute tuple
    /// of every row op is emitted.
    pub fn keyed_rows(&self) -> Vec<BTreeMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                if self.keys.is_empty() {
                    return row
                        .iter()
                        .flat_map(|op| {
                            ["op_index", "call_index", "pc", "depth", "address"]
                                .into_iter()
                                .filter_map(move |attr| {
                                    op.lookup(attr)
                                        .map(|value| (format!("{}.{attr}", op.opcode), value))
                                })
                        })
                        .collect()
                }
                self.keys
                    .iter()
                    .filter_map(|key| {
                        let (class, attr) = key.split_once('.')?;
                        let op = row.iter().find(|op| op.opcode == class)?;
                        Some((key.clone(), op.lookup(attr)?))
                    })
                    .collect()
            })
            .collect()
    }
}
