//! End-to-end runs of the four rules over synthetic traces.

use alloy_primitives::{Address, B256};
use vandal_core::{decode_trace, lift_trace, partition_blocks, VandalTrace};
use vandal_inspect::{
    FailedSend, Heuristic, OpLoader, Reentrancy, Results, TimestampDependency, UncheckedCall,
};

fn analyze(heuristic: &dyn Heuristic, optrace: &str, to: Address) -> Results {
    let trace = VandalTrace {
        to,
        optrace: Some(optrace.to_string()),
        ops: Some(1),
        tx_hash: B256::repeat_byte(0x77),
    };
    let raw = decode_trace(&trace).expect("decodes");
    let program = lift_trace(partition_blocks(raw), trace.to).expect("lifts");
    let requested = heuristic.required_ops().iter().copied().collect();
    let loader = OpLoader::new(&program, &requested);
    heuristic.analyze(&loader).expect("analyzes")
}

/// Seven zero-ish words then a CALL record; `value` and `success` control
/// the wei sent and the traced outcome.
fn call_prelude(value: u8, target: Address, success: u8) -> String {
    [
        "0,0,1,PUSH1,_,_,0x0".to_string(),
        "2,0,1,PUSH1,_,_,0x0".to_string(),
        "4,0,1,PUSH1,_,_,0x0".to_string(),
        "6,0,1,PUSH1,_,_,0x0".to_string(),
        format!("8,0,1,PUSH1,_,_,0x{value:x}"),
        format!("10,0,1,PUSH20,_,_,{target}"),
        "31,0,1,PUSH2,_,_,0x8fc".to_string(),
        format!("34,0,1,CALL,_,_,0x{success:x}:0x"),
    ]
    .join("\n")
}

#[test]
fn timestamp_dependency_positive() {
    let optrace = "0,0,1,TIMESTAMP,_,_,0x64\n\
        1,0,1,PUSH2,_,_,0x1000\n\
        4,0,1,LT,_,_,0x\n\
        5,0,1,PUSH1,_,_,0x9\n\
        7,0,1,JUMPI,_,_,0x\n\
        8,0,1,STOP,_,_,0x";
    let results = analyze(&TimestampDependency, optrace, Address::ZERO);
    assert!(results.is_vulnerable());
    assert_eq!(results.rows[0][0].opcode, "TIMESTAMP");
}

#[test]
fn timestamp_dependency_negative_when_unrelated_condition() {
    let optrace = "0,0,1,TIMESTAMP,_,_,0x64\n\
        1,0,1,POP,_,_,0x\n\
        2,0,1,PUSH1,_,_,0x1\n\
        4,0,1,PUSH1,_,_,0x9\n\
        6,0,1,JUMPI,_,_,0x\n\
        7,0,1,STOP,_,_,0x";
    let results = analyze(&TimestampDependency, optrace, Address::ZERO);
    assert!(!results.is_vulnerable());
}

#[test]
fn unchecked_call_positive() {
    let target = Address::repeat_byte(0xaa);
    let optrace = format!(
        "{}\n\
         35,0,1,POP,_,_,0x\n\
         36,0,1,PUSH1,_,_,0x1\n\
         38,0,1,PUSH1,_,_,0x2c\n\
         40,0,1,JUMPI,_,_,0x\n\
         44,0,1,STOP,_,_,0x",
        call_prelude(1, target, 1)
    );
    let results = analyze(&UncheckedCall, &optrace, Address::repeat_byte(0x11));
    assert!(results.is_vulnerable());
    assert_eq!(results.rows[0][0].opcode, "CALL");
}

#[test]
fn unchecked_call_negative_when_flag_is_branched_on() {
    let target = Address::repeat_byte(0xaa);
    let optrace = format!(
        "{}\n\
         35,0,1,ISZERO,_,_,0x\n\
         36,0,1,PUSH1,_,_,0x2c\n\
         38,0,1,JUMPI,_,_,0x\n\
         39,0,1,STOP,_,_,0x",
        call_prelude(1, target, 1)
    );
    let results = analyze(&UncheckedCall, &optrace, Address::repeat_byte(0x11));
    assert!(!results.is_vulnerable());
}

#[test]
fn failed_send_positive() {
    let target = Address::repeat_byte(0xaa);
    let optrace = format!(
        "{}\n\
         35,0,1,ISZERO,_,_,0x\n\
         36,0,1,PUSH1,_,_,0x30\n\
         38,0,1,JUMPI,_,_,0x\n\
         39,0,1,PUSH1,_,_,0x0\n\
         41,0,1,PUSH1,_,_,0x0\n\
         43,0,1,REVERT,_,_,0x",
        call_prelude(1, target, 0)
    );
    let results = analyze(&FailedSend, &optrace, Address::repeat_byte(0x11));
    assert!(results.is_vulnerable());
    let row = &results.rows[0];
    let opcodes: Vec<&str> = row.iter().map(|op| op.opcode).collect();
    assert_eq!(opcodes, ["JUMPI", "REVERT", "CALL"]);
}

#[test]
fn failed_send_negative_when_call_succeeds() {
    let target = Address::repeat_byte(0xaa);
    let optrace = format!(
        "{}\n\
         35,0,1,ISZERO,_,_,0x\n\
         36,0,1,PUSH1,_,_,0x30\n\
         38,0,1,JUMPI,_,_,0x\n\
         39,0,1,PUSH1,_,_,0x0\n\
         41,0,1,PUSH1,_,_,0x0\n\
         43,0,1,REVERT,_,_,0x",
        call_prelude(1, target, 1)
    );
    let results = analyze(&FailedSend, &optrace, Address::repeat_byte(0x11));
    assert!(!results.is_vulnerable());
}

#[test]
fn failed_send_negative_without_value() {
    let target = Address::repeat_byte(0xaa);
    let optrace = format!(
        "{}\n\
         35,0,1,ISZERO,_,_,0x\n\
         36,0,1,PUSH1,_,_,0x30\n\
         38,0,1,JUMPI,_,_,0x\n\
         39,0,1,PUSH1,_,_,0x0\n\
         41,0,1,PUSH1,_,_,0x0\n\
         43,0,1,REVERT,_,_,0x",
        call_prelude(0, target, 0)
    );
    let results = analyze(&FailedSend, &optrace, Address::repeat_byte(0x11));
    assert!(!results.is_vulnerable());
}

/// Contract A calls E, E re-enters A, and the re-entered frame branches on
/// a slot A later rewrites.
fn reentrant_call_chain(entry: Address, outsider: Address) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    // depth 1: A stages its call to E
    for pc in [0u32, 2, 4, 6, 8] {
        lines.push(format!("{pc},0,1,PUSH1,_,_,0x0"));
    }
    lines.push(format!("10,0,1,PUSH20,_,_,{outsider}"));
    lines.push("31,0,1,PUSH2,_,_,0xffff".to_string());
    // depth 2: E stages its call back into A
    for pc in [0u32, 2, 4, 6, 8] {
        lines.push(format!("{pc},1,2,PUSH1,_,_,0x0"));
    }
    lines.push(format!("10,1,2,PUSH20,_,_,{entry}"));
    lines.push("31,1,2,PUSH2,_,_,0xffff".to_string());
    // depth 3: re-entered A reads slot 1 and branches on it
    lines.push("0,2,3,PUSH1,_,_,0x1".to_string());
    lines.push("2,2,3,SLOAD,_,_,0x2a".to_string());
    lines.push("3,2,3,PUSH1,_,_,0x14".to_string());
    lines.push("5,2,3,JUMPI,_,_,0x".to_string());
    lines.push("20,2,3,JUMPDEST,_,_,0x".to_string());
    lines.push("21,2,3,PUSH1,_,_,0x0".to_string());
    lines.push("23,2,3,PUSH1,_,_,0x0".to_string());
    lines.push("25,2,3,RETURN,_,_,0x".to_string());
    // deferred call records unwind the frames
    lines.push("34,1,2,CALL,_,_,0x1:0x".to_string());
    lines.push("35,1,2,PUSH1,_,_,0x0".to_string());
    lines.push("37,1,2,RETURN,_,_,0x".to_string());
    lines.push("34,0,1,CALL,_,_,0x1:0x".to_string());
    lines.push("35,0,1,POP,_,_,0x".to_string());
    lines
}

fn sstore_tail() -> Vec<String> {
    vec![
        "36,0,1,PUSH1,_,_,0x7".to_string(),
        "38,0,1,PUSH1,_,_,0x1".to_string(),
        "40,0,1,SSTORE,_,_,0x".to_string(),
        "41,0,1,STOP,_,_,0x".to_string(),
    ]
}

#[test]
fn reentrancy_positive() {
    let entry = Address::repeat_byte(0x11);
    let outsider = Address::repeat_byte(0xee);

    let mut lines = reentrant_call_chain(entry, outsider);
    lines.extend(sstore_tail());
    let results = analyze(&Reentrancy, &lines.join("\n"), entry);

    assert!(results.is_vulnerable());
    let row = &results.rows[0];
    let opcodes: Vec<&str> = row.iter().map(|op| op.opcode).collect();
    assert_eq!(opcodes, ["SLOAD", "JUMPI", "SSTORE"]);
    assert_eq!(row[0].depth, 3);
    assert_eq!(row[2].depth, 1);
    assert_eq!(row[0].address, row[2].address);

    let keyed = results.keyed_rows();
    assert!(keyed[0].contains_key("SLOAD.op_index"));
    assert!(keyed[0].contains_key("SSTORE.address"));
}

#[test]
fn reentrancy_negative_when_store_precedes_load() {
    let entry = Address::repeat_byte(0x11);
    let outsider = Address::repeat_byte(0xee);

    // the same shape, but slot 1 is rewritten before the call chain runs
    let mut lines = vec![
        "100,0,1,PUSH1,_,_,0x7".to_string(),
        "102,0,1,PUSH1,_,_,0x1".to_string(),
        "104,0,1,SSTORE,_,_,0x".to_string(),
    ];
    lines.extend(reentrant_call_chain(entry, outsider));
    lines.push("41,0,1,STOP,_,_,0x".to_string());
    let results = analyze(&Reentrancy, &lines.join("\n"), entry);

    assert!(!results.is_vulnerable());
}

#[test]
fn reentrancy_negative_when_reentered_contract_differs() {
    let entry = Address::repeat_byte(0x11);
    let outsider = Address::repeat_byte(0xee);
    // E calls a third contract instead of re-entering A
    let other = Address::repeat_byte(0xcc);

    let mut lines = reentrant_call_chain(entry, outsider);
    let reentry = format!("10,1,2,PUSH20,_,_,{entry}");
    let position = lines.iter().position(|line| *line == reentry).unwrap();
    lines[position] = format!("10,1,2,PUSH20,_,_,{other}");
    lines.extend(sstore_tail());
    let results = analyze(&Reentrancy, &lines.join("\n"), entry);

    assert!(!results.is_vulnerable());
}

#[test]
fn clean_trace_has_no_findings() {
    let optrace = "0,0,1,PUSH1,_,_,0x3\n\
        2,0,1,PUSH1,_,_,0x4\n\
        4,0,1,ADD,_,_,0x\n\
        5,0,1,POP,_,_,0x\n\
        6,0,1,STOP,_,_,0x";
    let rules: [&dyn Heuristic; 4] =
        [&Reentrancy, &TimestampDependency, &UncheckedCall, &FailedSend];
    for rule in rules {
        let results = analyze(rule, optrace, Address::ZERO);
        assert!(!results.is_vulnerable(), "{} fired on a clean trace", rule.name());
    }
}
