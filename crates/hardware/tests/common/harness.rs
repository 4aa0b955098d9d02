use std::sync::Arc;

use o3sim_core::config::Config;
use o3sim_core::core::Cpu;
use o3sim_core::core::cpu::CommitRecord;
use o3sim_core::isa::inst::{AluFunc, BranchCond, MicroOp, Reg};
use o3sim_core::isa::program::Program;
use o3sim_core::isa::workload::Workload;
use o3sim_core::{ExitReport, Simulator};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once per test binary. Set `RUST_LOG` to see
/// pipeline traces for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Default configuration with the commit log enabled and a small memory range.
pub fn test_config() -> Config {
    Config {
        memory_size: "64MiB".into(),
        record_commits: true,
        ..Config::default()
    }
}

pub struct TestContext {
    pub sim: Simulator,
}

impl TestContext {
    /// Single-CPU, single-thread simulator running `program`.
    pub fn new(program: Program) -> Self {
        Self::with_config(test_config(), program)
    }

    pub fn with_config(config: Config, program: Program) -> Self {
        Self::with_workload(config, Arc::new(program))
    }

    pub fn with_workload(config: Config, workload: Arc<dyn Workload>) -> Self {
        init_tracing();
        let sim = Simulator::with_workload(config, workload).unwrap();
        Self { sim }
    }

    /// Runs to an exit condition, panicking on a host error.
    pub fn run(&mut self) -> ExitReport {
        self.sim.run().unwrap()
    }

    /// Convenience accessor for CPU 0.
    pub fn cpu(&self) -> &Cpu {
        &self.sim.machine.cpus[0]
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.sim.machine.cpus[0]
    }

    /// Commit log of `cpu`.
    pub fn commits(&self, cpu: usize) -> &[CommitRecord] {
        self.sim.machine.cpus[cpu].commit_log.as_deref().unwrap_or_default()
    }

    /// Committed value of `reg` on thread `thread` of CPU 0.
    pub fn reg(&self, thread: usize, reg: Reg) -> u64 {
        self.cpu().threads[thread].state.reg(reg)
    }

    /// Fires a single event.
    pub fn step(&mut self) -> u64 {
        self.sim.queue.advance(&mut self.sim.machine).unwrap()
    }
}

// ══════════════════════════════════════════════════════════
// Program builders
// ══════════════════════════════════════════════════════════

pub fn addi(rd: Reg, rs1: Reg, imm: i64) -> MicroOp {
    MicroOp::AluImm {
        func: AluFunc::Add,
        rd,
        rs1,
        imm,
    }
}

pub fn alu(func: AluFunc, rd: Reg, rs1: Reg, rs2: Reg) -> MicroOp {
    MicroOp::Alu { func, rd, rs1, rs2 }
}

pub fn li(rd: Reg, imm: i64) -> MicroOp {
    MicroOp::Li { rd, imm }
}

pub fn load(rd: Reg, rs1: Reg, offset: i64) -> MicroOp {
    MicroOp::Load { rd, rs1, offset }
}

pub fn store(rs2: Reg, rs1: Reg, offset: i64) -> MicroOp {
    MicroOp::Store { rs2, rs1, offset }
}

pub fn bne(rs1: Reg, rs2: Reg, target: u64) -> MicroOp {
    MicroOp::Branch {
        cond: BranchCond::Ne,
        rs1,
        rs2,
        target,
    }
}

pub fn exit(rs1: Reg) -> MicroOp {
    MicroOp::Exit { rs1 }
}

/// `n` independent immediate adds (each writes a different register from `r0`)
/// followed by `exit r0`.
pub fn independent_alu(n: usize) -> Program {
    let mut code: Vec<MicroOp> = (0..n)
        .map(|i| addi((i % 31 + 1) as Reg, 0, i as i64))
        .collect();
    code.push(exit(0));
    Program::new(code).named("independent-alu")
}

/// Counts r1 down from `iterations`, adding 3 to r2 each time, then exits with r2.
///
/// Every taken back-edge is mispredicted by the static predictor; the final
/// fall-through is predicted correctly.
pub fn countdown_loop(iterations: i64) -> Program {
    let base = Program::new(Vec::new());
    let body = base.pc_of(2);
    Program::new(vec![
        li(1, iterations),
        li(2, 0),
        addi(2, 2, 3),
        addi(1, 1, -1),
        bne(1, 0, body),
        exit(2),
    ])
    .named("countdown")
}

/// Loads from `n` distinct cache blocks starting at `base`, sums them into r3 and
/// exits with the sum.
pub fn strided_loads(n: usize, base: u64, stride: u64) -> Program {
    let mut code = vec![li(1, base as i64), li(3, 0)];
    for i in 0..n {
        code.push(load(2, 1, (i as u64 * stride) as i64));
        code.push(alu(AluFunc::Add, 3, 3, 2));
    }
    code.push(exit(3));
    let data = (0..n).map(|i| (base + i as u64 * stride, i as u64 + 1));
    Program::new(code).named("strided-loads").with_data(data)
}
