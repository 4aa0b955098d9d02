use mockall::automock;
use o3sim_core::core::cpu::context::ArchState;
use o3sim_core::isa::inst::StaticInst;
use o3sim_core::isa::program::Program;
use o3sim_core::isa::workload::{ExecOutcome, Workload};

/// The instruction-level half of a workload, mocked per test.
#[automock]
pub trait Executor {
    fn fetch(&self, pc: u64) -> Option<StaticInst>;
    fn execute(&self, inst: &StaticInst, state: &ArchState) -> ExecOutcome;
}

/// A workload whose fetch and execute calls go to a mock `Executor`.
#[derive(Debug)]
pub struct ScriptedWorkload<E> {
    pub executor: E,
    pub entry: u64,
}

impl<E: Executor + Send + Sync> Workload for ScriptedWorkload<E> {
    fn name(&self) -> &str {
        "scripted"
    }

    fn entry_pc(&self, _thread: usize) -> u64 {
        self.entry
    }

    fn fetch(&self, pc: u64) -> Option<StaticInst> {
        self.executor.fetch(pc)
    }

    fn execute(&self, inst: &StaticInst, state: &ArchState) -> ExecOutcome {
        self.executor.execute(inst, state)
    }
}

/// A mock executor that fetches from `program` and leaves `execute` to the test.
pub fn fetching_from(program: Program) -> MockExecutor {
    let mut mock = MockExecutor::new();
    let _ = mock
        .expect_fetch()
        .returning(move |pc| program.fetch(pc));
    mock
}
