//! Static registry of EVM opcodes: stack arities, behavioral categories and
//! the mnemonic lookup used by the trace decoder.
//!
//! The parameterized families (`PUSH1..PUSH32`, `DUP1..DUP16`,
//! `SWAP1..SWAP16`, `LOG0..LOG4`) are collapsed into a single variant
//! carrying `n`, mirroring how the lifter treats them. Two synthetic opcodes
//! exist only in lifted code: [`OpCode::Const`] (a lifted PUSH) and
//! [`OpCode::Nop`].

use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    /// `PUSH0..PUSH32`, carrying the pushed-byte count.
    Push(u8),
    /// `DUP1..DUP16`, carrying the duplicated stack slot (1-indexed).
    Dup(u8),
    /// `SWAP1..SWAP16`, carrying the swapped stack slot.
    Swap(u8),
    /// `LOG0..LOG4`, carrying the topic count.
    Log(u8),
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
    /// Synthetic: a PUSH lifted into a constant assignment.
    Const,
    /// Synthetic: an op with no TAC effect.
    Nop,
}

static OPCODES: phf::Map<&'static str, OpCode> = phf_map! {
    "STOP" => OpCode::Stop,
    "ADD" => OpCode::Add,
    "MUL" => OpCode::Mul,
    "SUB" => OpCode::Sub,
    "DIV" => OpCode::Div,
    "SDIV" => OpCode::SDiv,
    "MOD" => OpCode::Mod,
    "SMOD" => OpCode::SMod,
    "ADDMOD" => OpCode::AddMod,
    "MULMOD" => OpCode::MulMod,
    "EXP" => OpCode::Exp,
    "SIGNEXTEND" => OpCode::SignExtend,
    "LT" => OpCode::Lt,
    "GT" => OpCode::Gt,
    "SLT" => OpCode::Slt,
    "SGT" => OpCode::Sgt,
    "EQ" => OpCode::Eq,
    "ISZERO" => OpCode::IsZero,
    "AND" => OpCode::And,
    "OR" => OpCode::Or,
    "XOR" => OpCode::Xor,
    "NOT" => OpCode::Not,
    "BYTE" => OpCode::Byte,
    "SHL" => OpCode::Shl,
    "SHR" => OpCode::Shr,
    "SAR" => OpCode::Sar,
    "SHA3" => OpCode::Sha3,
    "KECCAK256" => OpCode::Sha3,
    "ADDRESS" => OpCode::Address,
    "BALANCE" => OpCode::Balance,
    "ORIGIN" => OpCode::Origin,
    "CALLER" => OpCode::Caller,
    "CALLVALUE" => OpCode::CallValue,
    "CALLDATALOAD" => OpCode::CallDataLoad,
    "CALLDATASIZE" => OpCode::CallDataSize,
    "CALLDATACOPY" => OpCode::CallDataCopy,
    "CODESIZE" => OpCode::CodeSize,
    "CODECOPY" => OpCode::CodeCopy,
    "GASPRICE" => OpCode::GasPrice,
    "EXTCODESIZE" => OpCode::ExtCodeSize,
    "EXTCODECOPY" => OpCode::ExtCodeCopy,
    "RETURNDATASIZE" => OpCode::ReturnDataSize,
    "RETURNDATACOPY" => OpCode::ReturnDataCopy,
    "EXTCODEHASH" => OpCode::ExtCodeHash,
    "BLOCKHASH" => OpCode::BlockHash,
    "COINBASE" => OpCode::Coinbase,
    "TIMESTAMP" => OpCode::Timestamp,
    "NUMBER" => OpCode::Number,
    "DIFFICULTY" => OpCode::Difficulty,
    "PREVRANDAO" => OpCode::Difficulty,
    "GASLIMIT" => OpCode::GasLimit,
    "CHAINID" => OpCode::ChainId,
    "SELFBALANCE" => OpCode::SelfBalance,
    "BASEFEE" => OpCode::BaseFee,
    "POP" => OpCode::Pop,
    "MLOAD" => OpCode::MLoad,
    "MSTORE" => OpCode::MStore,
    "MSTORE8" => OpCode::MStore8,
    "SLOAD" => OpCode::SLoad,
    "SSTORE" => OpCode::SStore,
    "JUMP" => OpCode::Jump,
    "JUMPI" => OpCode::JumpI,
    "PC" => OpCode::Pc,
    "MSIZE" => OpCode::MSize,
    "GAS" => OpCode::Gas,
    "JUMPDEST" => OpCode::JumpDest,
    "CREATE" => OpCode::Create,
    "CALL" => OpCode::Call,
    "CALLCODE" => OpCode::CallCode,
    "RETURN" => OpCode::Return,
    "DELEGATECALL" => OpCode::DelegateCall,
    "CREATE2" => OpCode::Create2,
    "STATICCALL" => OpCode::StaticCall,
    "REVERT" => OpCode::Revert,
    "INVALID" => OpCode::Invalid,
    "SELFDESTRUCT" => OpCode::SelfDestruct,
    "SUICIDE" => OpCode::SelfDestruct,
    "CONST" => OpCode::Const,
    "NOP" => OpCode::Nop,
};

impl OpCode {
    /// Resolve a trace mnemonic. The parameterized families are matched by
    /// prefix + numeric suffix, everything else through the static table.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(op) = OPCODES.get(name) {
            return Some(*op)
        }

        if let Some(n) = suffix(name, "PUSH") {
            return (n <= 32).then_some(OpCode::Push(n))
        }
        if let Some(n) = suffix(name, "DUP") {
            return (1..=16).contains(&n).then_some(OpCode::Dup(n))
        }
        if let Some(n) = suffix(name, "SWAP") {
            return (1..=16).contains(&n).then_some(OpCode::Swap(n))
        }
        if let Some(n) = suffix(name, "LOG") {
            return (n <= 4).then_some(OpCode::Log(n))
        }

        None
    }

    /// The collapsed mnemonic: parameterized families report their family
    /// name (`"PUSH"`, `"DUP"`, `"SWAP"`, `"LOG"`).
    pub const fn name(&self) -> &'static str {
        match self {
            OpCode::Stop => "STOP",
            OpCode::Add => "ADD",
            OpCode::Mul => "MUL",
            OpCode::Sub => "SUB",
            OpCode::Div => "DIV",
            OpCode::SDiv => "SDIV",
            OpCode::Mod => "MOD",
            OpCode::SMod => "SMOD",
            OpCode::AddMod => "ADDMOD",
            OpCode::MulMod => "MULMOD",
            OpCode::Exp => "EXP",
            OpCode::SignExtend => "SIGNEXTEND",
            OpCode::Lt => "LT",
            OpCode::Gt => "GT",
            OpCode::Slt => "SLT",
            OpCode::Sgt => "SGT",
            OpCode::Eq => "EQ",
            OpCode::IsZero => "ISZERO",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Xor => "XOR",
            OpCode::Not => "NOT",
            OpCode::Byte => "BYTE",
            OpCode::Shl => "SHL",
            OpCode::Shr => "SHR",
            OpCode::Sar => "SAR",
            OpCode::Sha3 => "SHA3",
            OpCode::Address => "ADDRESS",
            OpCode::Balance => "BALANCE",
            OpCode::Origin => "ORIGIN",
            OpCode::Caller => "CALLER",
            OpCode::CallValue => "CALLVALUE",
            OpCode::CallDataLoad => "CALLDATALOAD",
            OpCode::CallDataSize => "CALLDATASIZE",
            OpCode::CallDataCopy => "CALLDATACOPY",
            OpCode::CodeSize => "CODESIZE",
            OpCode::CodeCopy => "CODECOPY",
            OpCode::GasPrice => "GASPRICE",
            OpCode::ExtCodeSize => "EXTCODESIZE",
            OpCode::ExtCodeCopy => "EXTCODECOPY",
            OpCode::ReturnDataSize => "RETURNDATASIZE",
            OpCode::ReturnDataCopy => "RETURNDATACOPY",
            OpCode::ExtCodeHash => "EXTCODEHASH",
            OpCode::BlockHash => "BLOCKHASH",
            OpCode::Coinbase => "COINBASE",
            OpCode::Timestamp => "TIMESTAMP",
            OpCode::Number => "NUMBER",
            OpCode::Difficulty => "DIFFICULTY",
            OpCode::GasLimit => "GASLIMIT",
            OpCode::ChainId => "CHAINID",
            OpCode::SelfBalance => "SELFBALANCE",
            OpCode::BaseFee => "BASEFEE",
            OpCode::Pop => "POP",
            OpCode::MLoad => "MLOAD",
            OpCode::MStore => "MSTORE",
            OpCode::MStore8 => "MSTORE8",
            OpCode::SLoad => "SLOAD",
            OpCode::SStore => "SSTORE",
            OpCode::Jump => "JUMP",
            OpCode::JumpI => "JUMPI",
            OpCode::Pc => "PC",
            OpCode::MSize => "MSIZE",
            OpCode::Gas => "GAS",
            OpCode::JumpDest => "JUMPDEST",
            OpCode::Push(_) => "PUSH",
            OpCode::Dup(_) => "DUP",
            OpCode::Swap(_) => "SWAP",
            OpCode::Log(_) => "LOG",
            OpCode::Create => "CREATE",
            OpCode::Call => "CALL",
            OpCode::CallCode => "CALLCODE",
            OpCode::Return => "RETURN",
            OpCode::DelegateCall => "DELEGATECALL",
            OpCode::Create2 => "CREATE2",
            OpCode::StaticCall => "STATICCALL",
            OpCode::Revert => "REVERT",
            OpCode::Invalid => "INVALID",
            OpCode::SelfDestruct => "SELFDESTRUCT",
            OpCode::Const => "CONST",
            OpCode::Nop => "NOP",
        }
    }

    /// Stack words consumed. For DUP/SWAP this is the permuted slot count,
    /// the lifter elides them without popping.
    pub const fn pop_arity(&self) -> usize {
        match self {
            OpCode::Stop
            | OpCode::JumpDest
            | OpCode::Push(_)
            | OpCode::Invalid
            | OpCode::Const
            | OpCode::Nop => 0,

            OpCode::IsZero | OpCode::Not => 1,
            OpCode::AddMod | OpCode::MulMod => 3,
            OpCode::Add
            | OpCode::Mul
            | OpCode::Sub
            | OpCode::Div
            | OpCode::SDiv
            | OpCode::Mod
            | OpCode::SMod
            | OpCode::Exp
            | OpCode::SignExtend
            | OpCode::Lt
            | OpCode::Gt
            | OpCode::Slt
            | OpCode::Sgt
            | OpCode::Eq
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::Byte
            | OpCode::Shl
            | OpCode::Shr
            | OpCode::Sar
            | OpCode::Sha3 => 2,

            OpCode::Address
            | OpCode::Origin
            | OpCode::Caller
            | OpCode::CallValue
            | OpCode::CallDataSize
            | OpCode::CodeSize
            | OpCode::GasPrice
            | OpCode::ReturnDataSize
            | OpCode::Coinbase
            | OpCode::Timestamp
            | OpCode::Number
            | OpCode::Difficulty
            | OpCode::GasLimit
            | OpCode::ChainId
            | OpCode::SelfBalance
            | OpCode::BaseFee
            | OpCode::Pc
            | OpCode::MSize
            | OpCode::Gas => 0,

            OpCode::Balance
            | OpCode::CallDataLoad
            | OpCode::ExtCodeSize
            | OpCode::ExtCodeHash
            | OpCode::BlockHash
            | OpCode::Pop
            | OpCode::MLoad
            | OpCode::SLoad
            | OpCode::Jump
            | OpCode::SelfDestruct => 1,

            OpCode::CallDataCopy | OpCode::CodeCopy | OpCode::ReturnDataCopy => 3,
            OpCode::ExtCodeCopy => 4,

            OpCode::MStore
            | OpCode::MStore8
            | OpCode::SStore
            | OpCode::JumpI
            | OpCode::Return
            | OpCode::Revert => 2,

            OpCode::Dup(n) => *n as usize,
            OpCode::Swap(n) => *n as usize + 1,
            OpCode::Log(n) => *n as usize + 2,

            OpCode::Create => 3,
            OpCode::Create2 => 4,
            OpCode::Call | OpCode::CallCode => 7,
            OpCode::DelegateCall | OpCode::StaticCall => 6,
        }
    }

    /// Stack words produced.
    pub const fn push_arity(&self) -> usize {
        match self {
            OpCode::Dup(n) => *n as usize + 1,
            OpCode::Swap(n) => *n as usize + 1,
            _ => {
                if self.pushes_one() {
                    1
                } else {
                    0
                }
            }
        }
    }

    const fn pushes_one(&self) -> bool {
        match self {
            OpCode::Stop
            | OpCode::Pop
            | OpCode::CallDataCopy
            | OpCode::CodeCopy
            | OpCode::ReturnDataCopy
            | OpCode::ExtCodeCopy
            | OpCode::MStore
            | OpCode::MStore8
            | OpCode::SStore
            | OpCode::Jump
            | OpCode::JumpI
            | OpCode::JumpDest
            | OpCode::Log(_)
            | OpCode::Return
            | OpCode::Revert
            | OpCode::Invalid
            | OpCode::SelfDestruct
            | OpCode::Dup(_)
            | OpCode::Swap(_)
            | OpCode::Nop => false,
            _ => true,
        }
    }

    pub const fn is_push(&self) -> bool {
        matches!(self, OpCode::Push(_))
    }

    pub const fn is_dup(&self) -> bool {
        matches!(self, OpCode::Dup(_))
    }

    pub const fn is_swap(&self) -> bool {
        matches!(self, OpCode::Swap(_))
    }

    pub const fn is_log(&self) -> bool {
        matches!(self, OpCode::Log(_))
    }

    /// The call family: every op that opens a sub-frame.
    pub const fn is_call(&self) -> bool {
        self.is_kind_four() || self.is_kind_five()
    }

    /// Ops folded by constant propagation.
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            OpCode::Add
                | OpCode::Mul
                | OpCode::Sub
                | OpCode::Div
                | OpCode::SDiv
                | OpCode::Mod
                | OpCode::SMod
                | OpCode::AddMod
                | OpCode::MulMod
                | OpCode::Exp
                | OpCode::SignExtend
                | OpCode::Lt
                | OpCode::Gt
                | OpCode::Slt
                | OpCode::Sgt
                | OpCode::Eq
                | OpCode::IsZero
                | OpCode::And
                | OpCode::Or
                | OpCode::Xor
                | OpCode::Not
                | OpCode::Byte
                | OpCode::Shl
                | OpCode::Shr
                | OpCode::Sar
        )
    }

    /// Ops that terminate the executing frame.
    pub const fn possibly_halts(&self) -> bool {
        matches!(
            self,
            OpCode::Stop
                | OpCode::Return
                | OpCode::Revert
                | OpCode::Invalid
                | OpCode::SelfDestruct
        )
    }

    /// Ops after which a basic block always ends.
    pub const fn ends_block(&self) -> bool {
        self.possibly_halts() || matches!(self, OpCode::Jump | OpCode::JumpI)
    }

    /// No stack input, one traced output word.
    pub const fn is_kind_one(&self) -> bool {
        matches!(
            self,
            OpCode::CallValue
                | OpCode::Address
                | OpCode::Origin
                | OpCode::Caller
                | OpCode::GasPrice
                | OpCode::Timestamp
                | OpCode::Number
                | OpCode::Difficulty
                | OpCode::GasLimit
                | OpCode::Coinbase
                | OpCode::CodeSize
                | OpCode::ReturnDataSize
                | OpCode::CallDataSize
                | OpCode::ChainId
                | OpCode::SelfBalance
                | OpCode::BaseFee
                | OpCode::MSize
                | OpCode::Gas
                | OpCode::Pc
        )
    }

    /// Stack input, one traced output word.
    pub const fn is_kind_two(&self) -> bool {
        matches!(
            self,
            OpCode::CallDataLoad
                | OpCode::ExtCodeSize
                | OpCode::Balance
                | OpCode::BlockHash
                | OpCode::ExtCodeHash
        )
    }

    /// Multi-argument memory writers carrying the copied content as the
    /// traced value.
    pub const fn is_kind_three_store_two(&self) -> bool {
        matches!(
            self,
            OpCode::CallDataCopy
                | OpCode::CodeCopy
                | OpCode::ReturnDataCopy
                | OpCode::ExtCodeCopy
        )
    }

    /// Message calls: traced value is the success flag, extra the returned
    /// memory.
    pub const fn is_kind_four(&self) -> bool {
        matches!(
            self,
            OpCode::Call | OpCode::CallCode | OpCode::DelegateCall | OpCode::StaticCall
        )
    }

    /// Contract creation: traced value is the created address.
    pub const fn is_kind_five(&self) -> bool {
        matches!(self, OpCode::Create | OpCode::Create2)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpCode::Push(n) => write!(f, "PUSH{n}"),
            OpCode::Dup(n) => write!(f, "DUP{n}"),
            OpCode::Swap(n) => write!(f, "SWAP{n}"),
            OpCode::Log(n) => write!(f, "LOG{n}"),
            other => f.write_str(other.name()),
        }
    }
}

fn suffix(name: &str, family: &str) -> Option<u8> {
    name.strip_prefix(family)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_parameterized_families() {
        assert_eq!(OpCode::from_name("PUSH1"), Some(OpCode::Push(1)));
        assert_eq!(OpCode::from_name("PUSH32"), Some(OpCode::Push(32)));
        assert_eq!(OpCode::from_name("PUSH0"), Some(OpCode::Push(0)));
        assert_eq!(OpCode::from_name("DUP16"), Some(OpCode::Dup(16)));
        assert_eq!(OpCode::from_name("SWAP3"), Some(OpCode::Swap(3)));
        assert_eq!(OpCode::from_name("LOG0"), Some(OpCode::Log(0)));
        assert_eq!(OpCode::from_name("PUSH33"), None);
        assert_eq!(OpCode::from_name("DUP17"), None);
        assert_eq!(OpCode::from_name("LOG5"), None);
        assert_eq!(OpCode::from_name("BOGUS"), None);
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(OpCode::from_name("KECCAK256"), Some(OpCode::Sha3));
        assert_eq!(OpCode::from_name("SUICIDE"), Some(OpCode::SelfDestruct));
        assert_eq!(OpCode::from_name("PREVRANDAO"), Some(OpCode::Difficulty));
    }

    #[test]
    fn call_family_arities() {
        assert_eq!(OpCode::Call.pop_arity(), 7);
        assert_eq!(OpCode::CallCode.pop_arity(), 7);
        assert_eq!(OpCode::DelegateCall.pop_arity(), 6);
        assert_eq!(OpCode::StaticCall.pop_arity(), 6);
        assert_eq!(OpCode::Create.pop_arity(), 3);
        assert_eq!(OpCode::Create2.pop_arity(), 4);
        for op in [
            OpCode::Call,
            OpCode::CallCode,
            OpCode::DelegateCall,
            OpCode::StaticCall,
            OpCode::Create,
            OpCode::Create2,
        ] {
            assert!(op.is_call());
            assert_eq!(op.push_arity(), 1);
        }
    }

    #[test]
    fn log_pops_two_plus_topics() {
        for n in 0..=4u8 {
            assert_eq!(OpCode::Log(n).pop_arity(), 2 + n as usize);
            assert_eq!(OpCode::Log(n).push_arity(), 0);
        }
    }

    #[test]
    fn kind_classes_are_disjoint() {
        let classes: [fn(&OpCode) -> bool; 5] = [
            OpCode::is_kind_one,
            OpCode::is_kind_two,
            OpCode::is_kind_three_store_two,
            OpCode::is_kind_four,
            OpCode::is_kind_five,
        ];
        for name in OPCODES.keys() {
            let op = OpCode::from_name(name).unwrap();
            let hits = classes.iter().filter(|pred| pred(&op)).count();
            assert!(hits <= 1, "{op} is in {hits} kind classes");
        }
    }

    #[test]
    fn collapsed_names_round_trip() {
        for name in OPCODES.keys() {
            let op = OpCode::from_name(name).unwrap();
            assert_eq!(OpCode::from_name(op.name()), Some(op));
        }
    }

    #[test]
    fn block_terminators() {
        assert!(OpCode::Jump.ends_block());
        assert!(OpCode::JumpI.ends_block());
        assert!(OpCode::Revert.ends_block());
        assert!(!OpCode::Jump.possibly_halts());
        assert!(OpCode::SelfDestruct.possibly_halts());
        assert!(!OpCode::JumpDest.ends_block());
    }
}
