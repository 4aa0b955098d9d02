//! Pipeline Unit Tests.
//!
//! Runs small micro-ISA programs through the out-of-order pipeline and checks:
//! 1. Stage widths bound throughput and independent work overlaps.
//! 2. Commit is in program order per thread, across SMT threads and CPUs.
//! 3. Mispredictions squash the wrong path without architectural side effects.
//! 4. A squash at any point leaves no younger instruction behind and leaks no
//!    physical registers.
//! 5. Data cache backpressure delays loads but never drops them, and data returning
//!    for a squashed load is discarded.

use std::collections::BTreeMap;

use o3sim_core::ExitCause;
use o3sim_core::core::pipeline::dyn_inst::InstStage;
use o3sim_core::isa::inst::{AluFunc, MicroOp};
use o3sim_core::isa::program::Program;
use pretty_assertions::assert_eq;

use crate::common::harness::{
    TestContext, addi, alu, bne, countdown_loop, exit, independent_alu, li, load, store, strided_loads,
    test_config,
};

/// Commit counts grouped by tick, in tick order.
fn commits_per_tick(tc: &TestContext) -> Vec<usize> {
    let mut groups: BTreeMap<u64, usize> = BTreeMap::new();
    for record in tc.commits(0) {
        *groups.entry(record.tick).or_default() += 1;
    }
    groups.into_values().collect()
}

// ══════════════════════════════════════════════════════════
// 1. Widths and overlap
// ══════════════════════════════════════════════════════════

#[test]
fn independent_alu_ops_commit_four_per_cycle() {
    let program = independent_alu(10);
    let pcs: Vec<u64> = (0..11).map(|i| program.pc_of(i)).collect();
    let mut tc = TestContext::new(program);

    let report = tc.run();

    assert_eq!(report.cause, ExitCause::WorkloadExited);
    assert_eq!(report.exit_code, Some(0));
    let committed: Vec<u64> = tc.commits(0).iter().map(|r| r.pc).collect();
    assert_eq!(committed, pcs);
    assert_eq!(commits_per_tick(&tc), vec![4, 4, 3]);

    // One cold instruction miss, then the pipeline drains in a handful of cycles.
    assert!(report.final_tick > 72_000);
    assert!(report.final_tick <= 90_000, "final tick {}", report.final_tick);
    assert_eq!(report.final_tick, tc.commits(0).last().unwrap().tick);
    assert_eq!(tc.cpu().stats.instructions_retired, 11);
    assert_eq!(tc.cpu().stats.inst_alu, 10);
}

#[test]
fn single_wide_pipeline_commits_one_per_cycle() {
    let mut config = test_config();
    config.pipeline = config.pipeline.with_uniform_width(1);
    let mut wide = TestContext::new(independent_alu(10));
    let mut narrow = TestContext::with_config(config, independent_alu(10));

    let wide_report = wide.run();
    let narrow_report = narrow.run();

    assert!(commits_per_tick(&narrow).iter().all(|&n| n == 1));
    assert!(narrow_report.final_tick > wide_report.final_tick);
    assert_eq!(narrow.cpu().stats.instructions_retired, 11);
}

#[test]
fn dependent_chain_produces_the_right_value() {
    let mut code = vec![li(1, 0)];
    code.extend((0..10).map(|_| addi(1, 1, 1)));
    code.push(exit(1));
    let mut tc = TestContext::new(Program::new(code));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(10));
    assert_eq!(report.process_exit_code(), 10);
    assert_eq!(tc.reg(0, 1), 10);
}

#[test]
fn long_latency_divide_still_commits_in_order() {
    let mut tc = TestContext::new(Program::new(vec![
        li(1, 84),
        li(2, 2),
        alu(AluFunc::Div, 3, 1, 2),
        addi(4, 0, 7),
        alu(AluFunc::Add, 5, 3, 4),
        exit(5),
    ]));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(49));
    let seqs: Vec<u64> = tc.commits(0).iter().map(|r| r.seq).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(tc.cpu().stats.inst_mul_div, 1);
}

#[test]
fn results_wait_in_executed_for_a_writeback_slot() {
    let mut config = test_config();
    config.pipeline.writeback_width = 1;
    let mut tc = TestContext::with_config(config, independent_alu(12));

    let mut seen = 0;
    for _ in 0..500 {
        seen = seen.max(tc.cpu().count_in_stage(0, InstStage::Executed));
        if seen > 0 || tc.cpu().all_exited() {
            break;
        }
        let _ = tc.step();
    }
    assert!(seen > 0, "four-wide issue should outrun single-wide writeback");

    let report = tc.run();
    assert_eq!(report.exit_code, Some(0));
    assert_eq!(tc.cpu().stats.instructions_retired, 13);
}

// ══════════════════════════════════════════════════════════
// 2. Control flow and speculation
// ══════════════════════════════════════════════════════════

#[test]
fn loop_back_edges_are_mispredicted_and_squashed() {
    let program = countdown_loop(5);
    let mut expected = vec![program.pc_of(0), program.pc_of(1)];
    for _ in 0..5 {
        expected.extend([program.pc_of(2), program.pc_of(3), program.pc_of(4)]);
    }
    expected.push(program.pc_of(5));
    let mut tc = TestContext::new(program);

    let report = tc.run();

    assert_eq!(report.exit_code, Some(15));
    let committed: Vec<u64> = tc.commits(0).iter().map(|r| r.pc).collect();
    assert_eq!(committed, expected);

    let stats = &tc.cpu().stats;
    assert_eq!(stats.branch_mispredictions, 4);
    assert_eq!(stats.branch_predictions, 1);
    assert_eq!(stats.inst_branch, 5);
    assert!(stats.squashes >= 4);
    assert!(stats.fetched_wrong_path > 0);
    assert!(stats.fetched > stats.instructions_retired);
}

#[test]
fn wrong_path_divide_by_zero_is_harmless() {
    let base = Program::new(Vec::new());
    let mut tc = TestContext::new(Program::new(vec![
        li(1, 1),
        bne(1, 0, base.pc_of(4)),
        alu(AluFunc::Div, 3, 1, 0),
        exit(0),
        li(2, 7),
        exit(2),
    ]));

    let report = tc.run();

    assert_eq!(report.cause, ExitCause::WorkloadExited);
    assert_eq!(report.exit_code, Some(7));
    assert_eq!(tc.reg(0, 3), 0);
    assert!(tc.cpu().stats.fetched_wrong_path >= 1);
}

#[test]
fn unconditional_jumps_are_predicted_taken() {
    let base = Program::new(Vec::new());
    let mut tc = TestContext::new(Program::new(vec![
        li(1, 3),
        MicroOp::Jump {
            target: base.pc_of(3),
        },
        li(1, 99),
        exit(1),
    ]));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(3));
    let stats = &tc.cpu().stats;
    assert_eq!(stats.branch_mispredictions, 0);
    assert_eq!(stats.fetched_wrong_path, 0);
    assert_eq!(stats.squashes, 1, "only the exit squash");
}

// ══════════════════════════════════════════════════════════
// 3. Squash recovery
// ══════════════════════════════════════════════════════════

#[test]
fn squash_leaves_nothing_younger_in_flight() {
    let mut code = vec![li(1, 0)];
    code.extend((0..30).map(|_| addi(1, 1, 1)));
    code.push(exit(1));
    let mut tc = TestContext::new(Program::new(code));
    // Fetch runs four wide while the chain commits one per cycle.
    while tc.cpu().insts.len() < 12 {
        let _ = tc.step();
    }
    let seqs: Vec<u64> = tc.cpu().insts.keys().copied().collect();
    let cut = seqs[seqs.len() / 2];

    tc.cpu_mut().squash(0, cut);

    let cpu = tc.cpu();
    assert!(cpu.insts.keys().all(|&s| s <= cut));
    assert!(cpu.fetch_queue.iter().all(|&s| s <= cut));
    assert!(cpu.decode_queue.iter().all(|&s| s <= cut));
    assert!(cpu.rename_queue.iter().all(|&s| s <= cut));
    assert!(cpu.rob.iter().all(|e| e.seq <= cut));
    assert!(cpu.iq.oldest_first().iter().all(|&s| s <= cut));
    assert_eq!(cpu.fetch[0].pc, cpu.threads[0].arch_pc);

    let report = tc.run();
    assert_eq!(report.exit_code, Some(30));
}

#[test]
fn wrong_path_instruction_with_a_bad_register_is_squashed_quietly() {
    let base = Program::new(Vec::new());
    let mut tc = TestContext::new(Program::new(vec![
        li(1, 1),
        bne(1, 0, base.pc_of(3)),
        li(40, 9),
        exit(1),
    ]));

    let report = tc.run();

    assert_eq!(report.cause, ExitCause::WorkloadExited);
    assert_eq!(report.exit_code, Some(1));
    assert!(tc.cpu().stats.fetched_wrong_path >= 1);
}

#[test]
fn finished_run_returns_every_physical_register() {
    let mut tc = TestContext::new(countdown_loop(8));
    let _ = tc.run();

    let cpu = tc.cpu();
    let phys = tc.sim.config().pipeline.phys_regs;
    assert!(cpu.insts.is_empty());
    assert!(cpu.rob.is_empty());
    assert!(cpu.iq.is_empty());
    assert_eq!(cpu.regs.free_count(), phys - 32);
}

// ══════════════════════════════════════════════════════════
// 4. Memory instructions
// ══════════════════════════════════════════════════════════

#[test]
fn loads_past_mshr_capacity_are_retried_not_dropped() {
    let mut tc = TestContext::new(strided_loads(6, 0x10_0000, 0x1000));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(21));
    assert!(tc.cpu().stats.load_rejections > 0);
    assert!(tc.sim.machine.memory.cpus[0].l1d.stats.rejected > 0);
    assert_eq!(tc.cpu().stats.inst_load, 6);
}

#[test]
fn data_for_a_squashed_load_is_discarded() {
    let addr = 0x4_0000;
    let mut tc = TestContext::new(Program::new(vec![li(1, addr), load(2, 1, 0), exit(2)]).with_data([(addr as u64, 5)]));

    let mut waiting = None;
    for _ in 0..500 {
        waiting = tc.cpu().insts.values().find(|i| i.waiting_on_memory).map(|i| i.seq);
        if waiting.is_some() {
            break;
        }
        let _ = tc.step();
    }
    let seq = waiting.unwrap();

    tc.cpu_mut().squash(0, seq - 1);
    assert!(!tc.cpu().insts.contains_key(&seq));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(5));
    assert!(tc.cpu().stats.suppressed_responses >= 1);
    assert_eq!(tc.commits(0).len(), 3);
    assert_eq!(tc.cpu().stats.inst_load, 1);
}

#[test]
fn store_then_load_reads_the_stored_value() {
    let mut tc = TestContext::new(Program::new(vec![
        li(1, 0x2_0000),
        li(2, 42),
        store(2, 1, 8),
        load(3, 1, 8),
        exit(3),
    ]));

    let report = tc.run();

    assert_eq!(report.exit_code, Some(42));
    assert_eq!(tc.cpu().threads[0].state.load(0x2_0008), 42);
    assert_eq!(tc.cpu().stats.inst_store, 1);
}

// ══════════════════════════════════════════════════════════
// 5. SMT and multiple CPUs
// ══════════════════════════════════════════════════════════

#[test]
fn smt_threads_commit_in_their_own_program_order() {
    let mut config = test_config();
    config.threads_per_cpu = 2;
    let mut tc = TestContext::with_config(config, countdown_loop(5));

    let report = tc.run();

    assert_eq!(report.cause, ExitCause::WorkloadExited);
    assert_eq!(report.exit_code, Some(15));
    for thread in 0..2 {
        let seqs: Vec<u64> = tc
            .commits(0)
            .iter()
            .filter(|r| r.thread == thread)
            .map(|r| r.seq)
            .collect();
        assert_eq!(seqs.len(), 18);
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(tc.reg(thread, 2), 15);
    }
    assert_eq!(tc.cpu().stats.instructions_retired, 36);
}

#[test]
fn every_cpu_runs_the_workload() {
    let mut config = test_config();
    config.cpu_count = 2;
    let mut tc = TestContext::with_config(config, countdown_loop(3));

    let report = tc.run();

    assert_eq!(report.cause, ExitCause::WorkloadExited);
    for cpu in 0..2 {
        assert_eq!(tc.commits(cpu).len(), 12);
        assert_eq!(tc.sim.machine.cpus[cpu].threads[0].state.reg(2), 9);
    }
    // Both cold fetches reach the shared crossbar in the same tick.
    assert!(tc.sim.machine.memory.system_xbar.stats.contended >= 1);
}
