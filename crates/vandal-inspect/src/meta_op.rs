//! Typed per-opcode projections over lifted TAC ops.
//!
//! A [`MetaOp`] is the query engine's handle on one executed instruction:
//! its integer metadata, the executing address resolved from the
//! depth→address map, and named operand/result slots resolved by pattern
//! matching on the opcode.

use alloy_primitives::{Address, U256};
use vandal_types::{OpCode, VarId};

/// Integer-valued metadata attributes that filters compare on. Addresses
/// widen big-endian into the same word domain so one comparator path serves
/// every attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpAttr {
    OpIndex,
    CallIndex,
    Pc,
    Depth,
    Address,
}

/// Named operand/result slots. Which slots an opcode answers to is decided
/// by [`MetaOp::var`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSlot {
    Operand,
    Result,
    Left,
    Right,
    First,
    Second,
    Third,
    Base,
    Exponent,
    /// Forwarded gas of a call.
    Gas,
    /// The account a call/copy/selfdestruct targets.
    Target,
    /// Wei sent along with CALL/CALLCODE/CREATE.
    CallValue,
    InOffset,
    InSize,
    OutOffset,
    OutSize,
    /// The success flag a call pushes.
    Success,
    /// Storage key of SLOAD/SSTORE.
    Key,
    /// The primary data word: loaded/stored value, pushed constant, or the
    /// traced result of an environment op.
    Value,
    Condition,
    Destination,
    /// Memory offset operand.
    Offset,
    /// Source offset of the copy ops.
    DataOffset,
    Size,
    Topic(u8),
    /// Calldata index of CALLDATALOAD.
    Index,
    Salt,
}

#[derive(Debug, Clone)]
pub struct MetaOp {
    pub op_index: u32,
    pub call_index: u32,
    pub pc: u32,
    pub depth: u16,
    pub opcode: OpCode,
    /// Operands in stack order, top first.
    pub args: Vec<VarId>,
    pub lhs: Option<VarId>,
    /// Executing address at this op's depth, from the depth→address map.
    pub address: Option<Address>,
}

impl MetaOp {
    pub fn attr(&self, attr: OpAttr) -> U256 {
        match attr {
            OpAttr::OpIndex => U256::from(self.op_index),
            OpAttr::CallIndex => U256::from(self.call_index),
            OpAttr::Pc => U256::from(self.pc),
            OpAttr::Depth => U256::from(self.depth),
            OpAttr::Address => self
                .address
                .map(|a| U256::from_be_bytes(a.into_word().0))
                .unwrap_or_default(),
        }
    }

    /// Resolve a named slot to its variable, if this opcode carries it.
    pub fn var(&self, slot: VarSlot) -> Option<VarId> {
        use OpCode::*;
        use VarSlot::*;

        let arg = |i: usize| self.args.get(i).copied();

        match (self.opcode, slot) {
            (_, Result) => self.lhs,

            (Const | Push(_), Value) => self.lhs,

            (IsZero | Not, Operand) => arg(0),

            (
                Add | Mul | Sub | Div | SDiv | Mod | SMod | SignExtend | Lt | Gt | Slt | Sgt
                | Eq | And | Or | Xor | Byte | Shl | Shr | Sar,
                Left,
            ) => arg(0),
            (
                Add | Mul | Sub | Div | SDiv | Mod | SMod | SignExtend | Lt | Gt | Slt | Sgt
                | Eq | And | Or | Xor | Byte | Shl | Shr | Sar,
                Right,
            ) => arg(1),

            (AddMod | MulMod, First) => arg(0),
            (AddMod | MulMod, Second) => arg(1),
            (AddMod | MulMod, Third) => arg(2),

            (Exp, Base) => arg(0),
            (Exp, Exponent) => arg(1),

            // environment/block ops: one traced word
            (op, Value) if op.is_kind_one() => self.lhs,

            (Balance | ExtCodeSize | ExtCodeHash, Target) => arg(0),
            (op, Value) if op.is_kind_two() => self.lhs,
            (CallDataLoad, Index) => arg(0),
            (BlockHash, Operand) => arg(0),

            (Sha3, Offset) => arg(0),
            (Sha3, Size) => arg(1),

            (MLoad, Offset) => arg(0),
            (MLoad, Value) => self.lhs,
            (MStore | MStore8, Offset) => arg(0),
            (MStore | MStore8, Value) => arg(1),

            (SLoad, Key) => arg(0),
            (SLoad, Value) => self.lhs,
            (SStore, Key) => arg(0),
            (SStore, Value) => arg(1),

            (Jump, Destination) => arg(0),
            (JumpI, Condition) => arg(0),
            (JumpI, Destination) => arg(1),

            (Log(_), Offset) => arg(0),
            (Log(_), Size) => arg(1),
            (Log(n), Topic(i)) if i < n => arg(2 + i as usize),

            (Call | CallCode, VarSlot::Gas) => arg(0),
            (Call | CallCode, Target) => arg(1),
            (Call | CallCode, VarSlot::CallValue) => arg(2),
            (Call | CallCode, InOffset) => arg(3),
            (Call | CallCode, InSize) => arg(4),
            (Call | CallCode, OutOffset) => arg(5),
            (Call | CallCode, OutSize) => arg(6),
            (DelegateCall | StaticCall, VarSlot::Gas) => arg(0),
            (DelegateCall | StaticCall, Target) => arg(1),
            (DelegateCall | StaticCall, InOffset) => arg(2),
            (DelegateCall | StaticCall, InSize) => arg(3),
            (DelegateCall | StaticCall, OutOffset) => arg(4),
            (DelegateCall | StaticCall, OutSize) => arg(5),
            (op, Success) if op.is_kind_four() => self.lhs,

            (Create | Create2, VarSlot::CallValue) => arg(0),
            (Create | Create2, Offset) => arg(1),
            (Create | Create2, Size) => arg(2),
            (Create2, Salt) => arg(3),

            (Return | Revert, Offset) => arg(0),
            (Return | Revert, Size) => arg(1),

            (CallDataCopy | CodeCopy | ReturnDataCopy, Offset) => arg(0),
            (CallDataCopy | CodeCopy | ReturnDataCopy, DataOffset) => arg(1),
            (CallDataCopy | CodeCopy | ReturnDataCopy, Size) => arg(2),
            (ExtCodeCopy, Target) => arg(0),
            (ExtCodeCopy, Offset) => arg(1),
            (ExtCodeCopy, DataOffset) => arg(2),
            (ExtCodeCopy, Size) => arg(3),

            (SelfDestruct, Target) => arg(0),

            _ => None,
        }
    }

    /// The occupied named slots, for result serialization.
    pub fn named_vars(&self) -> Vec<(String, VarId)> {
        use VarSlot::*;

        let named: &[(&str, VarSlot)] = match self.opcode {
            OpCode::Call | OpCode::CallCode => &[
                ("gas", Gas),
                ("address", Target),
                ("value", CallValue),
                ("in_offset", InOffset),
                ("in_size", InSize),
                ("out_offset", OutOffset),
                ("out_size", OutSize),
                ("success", Success),
            ],
            OpCode::DelegateCall | OpCode::StaticCall => &[
                ("gas", Gas),
                ("address", Target),
                ("in_offset", InOffset),
                ("in_size", InSize),
                ("out_offset", OutOffset),
                ("out_size", OutSize),
                ("success", Success),
            ],
            OpCode::Create | OpCode::Create2 => &[
                ("value", CallValue),
                ("mem_offset", Offset),
                ("size", Size),
                ("salt", Salt),
                ("result", Result),
            ],
            OpCode::SLoad | OpCode::SStore => &[("key", Key), ("value", Value)],
            OpCode::MLoad | OpCode::MStore | OpCode::MStore8 => {
                &[("mem_offset", Offset), ("value", Value)]
            }
            OpCode::Jump => &[("destination", Destination)],
            OpCode::JumpI => &[("condition", Condition), ("destination", Destination)],
            OpCode::Log(_) => &[
                ("mem_offset", Offset),
                ("size", Size),
                ("topic_0", Topic(0)),
                ("topic_1", Topic(1)),
                ("topic_2", Topic(2)),
                ("topic_3", Topic(3)),
            ],
            OpCode::Return | OpCode::Revert => &[("mem_offset", Offset), ("size", Size)],
            OpCode::Sha3 => &[("mem_offset", Offset), ("size", Size), ("result", Result)],
            OpCode::IsZero | OpCode::Not => &[("operand", Operand), ("result", Result)],
            OpCode::AddMod | OpCode::MulMod => &[
                ("first", First),
                ("second", Second),
                ("third", Third),
                ("result", Result),
            ],
            OpCode::Exp => &[("base", Base), ("exponent", Exponent), ("result", Result)],
            op if op.is_arithmetic() => {
                &[("left", Left), ("right", Right), ("result", Result)]
            }
            op if op.is_kind_one() || op.is_kind_two() => &[("value", Value)],
            OpCode::Const | OpCode::Push(_) => &[("value", Value)],
            _ => &[],
        };

        named
            .iter()
            .filter_map(|&(name, slot)| self.var(slot).map(|id| (name.to_string(), id)))
            .collect()
    }

    /// Look up a slot by its serialized name, as used in output-key
    /// projections.
    pub fn var_by_name(&self, name: &str) -> Option<VarId> {
        self.named_vars()
            .into_iter()
            .find(|(slot, _)| slot == name)
            .map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(opcode: OpCode, args: usize, lhs: bool) -> MetaOp {
        MetaOp {
            op_index: 7,
            call_index: 1,
            pc: 42,
            depth: 2,
            opcode,
            args: (0..args as u32).map(VarId).collect(),
            lhs: lhs.then_some(VarId(99)),
            address: Some(Address::repeat_byte(0xaa)),
        }
    }

    #[test]
    fn call_slots_follow_stack_order() {
        let call = meta(OpCode::Call, 7, true);
        assert_eq!(call.var(VarSlot::Gas), Some(VarId(0)));
        assert_eq!(call.var(VarSlot::Target), Some(VarId(1)));
        assert_eq!(call.var(VarSlot::CallValue), Some(VarId(2)));
        assert_eq!(call.var(VarSlot::OutSize), Some(VarId(6)));
        assert_eq!(call.var(VarSlot::Success), Some(VarId(99)));
        assert_eq!(call.var(VarSlot::Key), None);
    }

    #[test]
    fn staticcall_has_no_value_slot() {
        let sc = meta(OpCode::StaticCall, 6, true);
        assert_eq!(sc.var(VarSlot::CallValue), None);
        assert_eq!(sc.var(VarSlot::Target), Some(VarId(1)));
        assert_eq!(sc.var(VarSlot::Success), Some(VarId(99)));
    }

    #[test]
    fn storage_and_branch_slots() {
        let sload = meta(OpCode::SLoad, 1, true);
        assert_eq!(sload.var(VarSlot::Key), Some(VarId(0)));
        assert_eq!(sload.var(VarSlot::Value), Some(VarId(99)));

        let sstore = meta(OpCode::SStore, 2, false);
        assert_eq!(sstore.var(VarSlot::Key), Some(VarId(0)));
        assert_eq!(sstore.var(VarSlot::Value), Some(VarId(1)));

        let jumpi = meta(OpCode::JumpI, 2, false);
        assert_eq!(jumpi.var(VarSlot::Condition), Some(VarId(0)));
        assert_eq!(jumpi.var(VarSlot::Destination), Some(VarId(1)));
    }

    #[test]
    fn log_topics_are_positional_and_bounded() {
        let log = meta(OpCode::Log(2), 4, false);
        assert_eq!(log.var(VarSlot::Offset), Some(VarId(0)));
        assert_eq!(log.var(VarSlot::Size), Some(VarId(1)));
        assert_eq!(log.var(VarSlot::Topic(0)), Some(VarId(2)));
        assert_eq!(log.var(VarSlot::Topic(1)), Some(VarId(3)));
        assert_eq!(log.var(VarSlot::Topic(2)), None);
    }

    #[test]
    fn address_attr_widens_big_endian() {
        let op = meta(OpCode::SLoad, 1, true);
        let word = op.attr(OpAttr::Address);
        assert_eq!(word, U256::from_be_bytes(Address::repeat_byte(0xaa).into_word().0));
        assert_eq!(op.attr(OpAttr::Depth), U256::from(2u8));
    }

    #[test]
    fn named_vars_skip_absent_slots() {
        let create = meta(OpCode::Create, 3, true);
        let names: Vec<_> = create.named_vars().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["value", "mem_offset", "size", "result"]);
    }
}
