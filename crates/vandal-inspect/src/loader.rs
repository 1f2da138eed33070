//! Materializes per-opcode views from a lifted program.
//!
//! The loader walks the TAC graph once: the first pass resolves the
//! depth→address map from call-family records (which show up *after* their
//! sub-frame's ops in a linearized trace, hence two passes), the second
//! constructs a [`MetaOp`] for every op whose collapsed opcode name was
//! requested. Unrequested ops still participate in dataflow through the
//! shared variable arena.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256};
use vandal_types::{FastHashMap, FastHashSet, TACProgram, VarArena};

use crate::{
    meta_op::MetaOp,
    view::{OpFilter, OpView},
};

/// Index of a [`MetaOp`] in the loader's op table.
pub type OpId = usize;

pub struct OpLoader<'a> {
    program: &'a TACProgram,
    ops: Vec<MetaOp>,
    by_opcode: FastHashMap<&'static str, Vec<OpId>>,
    addresses: BTreeMap<u16, Address>,
}

impl<'a> OpLoader<'a> {
    pub fn new(program: &'a TACProgram, requested: &FastHashSet<&'static str>) -> Self {
        let addresses = resolve_addresses(program);

        let mut ops = Vec::new();
        let mut by_opcode: FastHashMap<&'static str, Vec<OpId>> = FastHashMap::default();
        for op in program.ops() {
            let name = op.opcode.name();
            if !requested.contains(name) {
                continue
            }
            by_opcode.entry(name).or_default().push(ops.len());
            ops.push(MetaOp {
                op_index: op.op_index,
                call_index: op.call_index,
                pc: op.pc,
                depth: op.depth,
                opcode: op.opcode,
                args: op.args.clone(),
                lhs: op.lhs,
                address: addresses.get(&op.depth).copied(),
            });
        }

        Self { program, ops, by_opcode, addresses }
    }

    /// A fresh, fully active view over one opcode, with the given filters
    /// applied. `None` when the trace never executed the opcode.
    pub fn get_ops(&self, opcode: &str, filters: &[OpFilter]) -> Option<OpView<'_>> {
        let ids = self.by_opcode.get(opcode)?;
        let name = self.ops[ids[0]].opcode.name();
        let mut view = OpView::new(self, name, ids.clone());
        view.filter(filters);
        Some(view)
    }

    pub fn arena(&self) -> &VarArena {
        &self.program.arena
    }

    pub fn addresses(&self) -> &BTreeMap<u16, Address> {
        &self.addresses
    }

    pub(crate) fn ops(&self) -> &[MetaOp] {
        &self.ops
    }
}

/// Depth 1 executes the top-level callee; each call record maps the next
/// depth to its target (the address stack argument for message calls, the
/// created address for CREATE/CREATE2).
fn resolve_addresses(program: &TACProgram) -> BTreeMap<u16, Address> {
    let mut addresses = BTreeMap::from([(1u16, program.entry_address)]);
    for op in program.ops() {
        let target = if op.opcode.is_kind_four() {
            op.args.get(1).and_then(|&arg| program.arena.value(arg))
        } else if op.opcode.is_kind_five() {
            op.lhs.and_then(|lhs| program.arena.value(lhs))
        } else {
            None
        };
        if let Some(word) = target {
            addresses.insert(op.depth + 1, Address::from_word(B256::from(word)));
        }
    }
    addresses
}

#[cfg(test)]
mod tests {
    use vandal_core::{decode_trace, lift_trace, partition_blocks, VandalTrace};

    use super::*;

    fn lift(optrace: &str, to: Address) -> TACProgram {
        let trace = VandalTrace {
            to,
            optrace: Some(optrace.to_string()),
            ops: Some(1),
            tx_hash: Default::default(),
        };
        let raw = decode_trace(&trace).unwrap();
        lift_trace(partition_blocks(raw), trace.to).unwrap()
    }

    fn requested(names: &[&'static str]) -> FastHashSet<&'static str> {
        names.iter().copied().collect()
    }

    #[test]
    fn loads_only_requested_opcodes() {
        let program = lift(
            "0,0,1,PUSH1,_,_,0x1\n2,0,1,SLOAD,_,_,0x2a\n4,0,1,TIMESTAMP,_,_,0x64",
            Address::ZERO,
        );
        let loader = OpLoader::new(&program, &requested(&["SLOAD"]));
        assert!(loader.get_ops("SLOAD", &[]).is_some());
        assert!(loader.get_ops("TIMESTAMP", &[]).is_none());
        assert!(loader.get_ops("CONST", &[]).is_none());
    }

    #[test]
    fn unrequested_ops_still_feed_dataflow() {
        // the ADD sits between the consts and the JUMPI condition; only
        // JUMPI is loaded, yet the const must remain an ancestor
        let program = lift(
            "0,0,1,PUSH1,_,_,0x1\n2,0,1,PUSH1,_,_,0x2\n4,0,1,ADD,_,_,0x\n5,0,1,PUSH1,_,_,0x9\n7,0,1,JUMPI,_,_,0x",
            Address::ZERO,
        );
        let loader = OpLoader::new(&program, &requested(&["JUMPI"]));
        let jumpi = &loader.ops()[0];
        let condition = jumpi.var(crate::meta_op::VarSlot::Destination).unwrap();
        let ancestors = loader.arena().ancestors(condition);
        // V0 (the first const) flows through the ADD into the tested word
        assert!(ancestors.len() >= 3);
    }

    #[test]
    fn address_map_covers_every_depth() {
        let callee = Address::repeat_byte(0xbe);
        let trace = [
            "0,0,1,PUSH1,_,_,0x0",
            "2,0,1,PUSH1,_,_,0x0",
            "4,0,1,PUSH1,_,_,0x0",
            "6,0,1,PUSH1,_,_,0x0",
            "8,0,1,PUSH1,_,_,0x0",
            &format!("10,0,1,PUSH20,_,_,{callee}") as &str,
            "31,0,1,PUSH2,_,_,0xffff",
            "0,1,2,PUSH1,_,_,0x1",
            "1,1,2,SLOAD,_,_,0x7",
            "2,1,2,PUSH1,_,_,0x0",
            "4,1,2,RETURN,_,_,0x",
            "34,0,1,CALL,_,_,0x1:0x",
            "35,0,1,STOP,_,_,0x",
        ]
        .join("\n");

        let entry = Address::repeat_byte(0x11);
        let program = lift(&trace, entry);
        let loader = OpLoader::new(&program, &requested(&["SLOAD", "CALL"]));

        assert_eq!(loader.addresses().get(&1), Some(&entry));
        assert_eq!(loader.addresses().get(&2), Some(&callee));

        let depths: std::collections::BTreeSet<u16> =
            program.ops().map(|op| op.depth).collect();
        for depth in depths {
            assert!(loader.addresses().contains_key(&depth));
        }

        // the loaded SLOAD carries the callee's executing address
        let sload = loader.ops().iter().find(|op| op.opcode.name() == "SLOAD").unwrap();
        assert_eq!(sload.address, Some(callee));
    }
}
