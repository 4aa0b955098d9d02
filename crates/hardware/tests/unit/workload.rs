//! Workload Binding Tests.
//!
//! Covers how programs reach the simulator and how the pipeline uses them:
//! 1. **Images:** JSON program images loaded from disk through `binary_path`.
//! 2. **Echo:** The built-in program over configured arguments.
//! 3. **Opaque execution:** The pipeline only calls `fetch` and `execute`, and
//!    executes each correct-path instruction exactly once.

use std::io::Write;
use std::sync::Arc;

use o3sim_core::common::error::{Fault, SimError};
use o3sim_core::config::Config;
use o3sim_core::isa::program::{Program, load_workload};
use o3sim_core::isa::workload::{ExecOutcome, execute_micro_op};
use o3sim_core::{ExitCause, Simulator};
use pretty_assertions::assert_eq;

use crate::common::harness::{TestContext, bne, exit, independent_alu, li, test_config};
use crate::common::mocks::workload::{ScriptedWorkload, fetching_from};

// ══════════════════════════════════════════════════════════
// 1. Program images
// ══════════════════════════════════════════════════════════

const IMAGE: &str = r#"{
    "name": "json-exit",
    "code": [
        { "op": "li", "rd": 1, "imm": 4 },
        { "op": "alu_imm", "func": "add", "rd": 1, "rs1": 1, "imm": 5 },
        { "op": "exit", "rs1": 1 }
    ]
}"#;

#[test]
fn json_image_runs_from_binary_path() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(IMAGE.as_bytes()).unwrap();
    let config = Config {
        binary_path: file.path().display().to_string(),
        ..test_config()
    };

    let mut sim = Simulator::new(config).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(sim.workload().name(), "json-exit");
    assert_eq!(report.cause, ExitCause::WorkloadExited);
    assert_eq!(report.exit_code, Some(9));
}

#[test]
fn missing_image_is_a_workload_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = load_workload(&path.display().to_string(), &[]).unwrap_err();
    assert!(matches!(err, SimError::Workload(_)));
}

#[test]
fn malformed_and_empty_images_are_rejected() {
    assert!(matches!(
        Program::from_json(r#"{ "code": [ { "op": "teleport" } ] }"#),
        Err(SimError::Workload(_))
    ));
    assert!(matches!(
        Program::from_json(r#"{ "code": [] }"#),
        Err(SimError::Workload(_))
    ));
}

#[test]
fn images_naming_missing_registers_are_rejected() {
    let err = Program::from_json(r#"{ "code": [ { "op": "li", "rd": 40, "imm": 1 }, { "op": "exit" } ] }"#)
        .unwrap_err();
    assert!(matches!(err, SimError::Workload(ref msg) if msg.contains("instruction 0")), "{err}");
}

// ══════════════════════════════════════════════════════════
// 2. Echo
// ══════════════════════════════════════════════════════════

#[test]
fn echo_writes_its_arguments() {
    let args: Vec<String> = ["a", "longer", "argument list"].map(String::from).to_vec();
    let mut tc = TestContext::new(Program::echo(&args));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(0));
    assert_eq!(tc.sim.output().as_deref(), Some("a longer argument list\n"));
}

#[test]
fn unknown_binaries_fall_back_to_echo() {
    let args = vec!["hi".to_string()];
    let workload = load_workload("/usr/bin/true", &args).unwrap();
    let mut sim = Simulator::with_workload(test_config(), workload).unwrap();

    let report = sim.run().unwrap();

    assert_eq!(report.exit_code, Some(0));
    assert_eq!(sim.output().as_deref(), Some("hi\n"));
}

// ══════════════════════════════════════════════════════════
// 3. Opaque execution through a mocked executor
// ══════════════════════════════════════════════════════════

#[test]
fn each_correct_path_instruction_executes_once() {
    let program = independent_alu(5);
    let entry = program.pc_of(0);
    let mut executor = fetching_from(program);
    let _ = executor
        .expect_execute()
        .times(6)
        .returning(|inst, state| execute_micro_op(inst, state));

    let workload = ScriptedWorkload { executor, entry };
    let mut tc = TestContext::with_workload(test_config(), Arc::new(workload));

    let report = tc.run();
    assert_eq!(report.cause, ExitCause::WorkloadExited);
}

#[test]
fn wrong_path_instructions_are_never_executed() {
    let base = Program::new(Vec::new());
    let program = Program::new(vec![li(1, 1), bne(1, 0, base.pc_of(4)), li(2, 9), li(3, 9), exit(0)]);
    let entry = program.pc_of(0);
    let skipped = [program.pc_of(2), program.pc_of(3)];
    let mut executor = fetching_from(program);
    let _ = executor
        .expect_execute()
        .withf(move |inst, _| !skipped.contains(&inst.pc))
        .times(3)
        .returning(|inst, state| execute_micro_op(inst, state));

    let workload = ScriptedWorkload { executor, entry };
    let mut tc = TestContext::with_workload(test_config(), Arc::new(workload));

    let report = tc.run();
    assert_eq!(report.exit_code, Some(0));
    assert!(tc.cpu().stats.fetched_wrong_path >= 2);
}

#[test]
fn executor_faults_terminate_at_commit() {
    let program = independent_alu(4);
    let entry = program.pc_of(0);
    let bad = program.pc_of(2);
    let mut executor = fetching_from(program);
    let _ = executor.expect_execute().times(3).returning(move |inst, state| {
        if inst.pc == bad {
            ExecOutcome::faulted(inst.pc, Fault::IllegalInstruction { pc: inst.pc })
        } else {
            execute_micro_op(inst, state)
        }
    });

    let workload = ScriptedWorkload { executor, entry };
    let mut tc = TestContext::with_workload(test_config(), Arc::new(workload));

    let report = tc.run();
    assert_eq!(
        report.cause,
        ExitCause::Fault {
            cpu: 0,
            thread: 0,
            fault: Fault::IllegalInstruction { pc: bad },
        }
    );
    assert_eq!(tc.commits(0).len(), 2);
}
