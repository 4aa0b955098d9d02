//! Simulator: owns the event queue and the machine side-by-side.
//!
//! Events need mutable access to both the CPUs and the memory hierarchy, while the
//! queue itself is borrowed by whoever fires them. Keeping the queue outside the
//! `Machine` lets `EventQueue::advance` hand the machine to each action without any
//! borrow splitting.
//!
//! The run loop:
//! 1. **Startup:** Validates the configuration and the port wiring, builds the memory
//!    hierarchy and one `Cpu` per configured core, and schedules their first cycle.
//! 2. **Event loop:** Fires events in `(tick, priority, insertion)` order. Each CPU
//!    reschedules its own cycle while it has work.
//! 3. **Termination:** Stops on the first exit condition and reports the tick and cause.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::common::constants::priority;
use crate::common::error::{Fault, SimError};
use crate::common::units::Tick;
use crate::config::Config;
use crate::core::Cpu;
use crate::core::cpu::context::{CpuContext, ThreadStatus};
use crate::isa::program::load_workload;
use crate::isa::workload::Workload;
use crate::sim::event::EventQueue;
use crate::soc::builder::{Wiring, build_memory};
use crate::soc::memory::{MemResponse, MemoryHost, MemorySystem};

/// Why a simulation stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitCause {
    /// Every hardware thread committed an exit.
    WorkloadExited,
    /// A workload fault reached commit.
    Fault {
        /// CPU index.
        cpu: usize,
        /// Thread index.
        thread: usize,
        /// The fault.
        fault: Fault,
    },
    /// `max_ticks` was reached.
    TickLimit,
    /// A thread committed `max_insts` instructions.
    InstLimit,
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkloadExited => f.write_str("workload exited normally"),
            Self::Fault { fault, .. } => write!(f, "fault: {fault}"),
            Self::TickLimit => f.write_str("simulate() limit reached"),
            Self::InstLimit => f.write_str("a thread reached the max instruction count"),
        }
    }
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitReport {
    /// Tick at which the simulation stopped.
    pub final_tick: Tick,
    /// Why it stopped.
    pub cause: ExitCause,
    /// Exit code of the last thread to exit, for `WorkloadExited`.
    pub exit_code: Option<i64>,
}

impl ExitReport {
    /// Process exit status: 0 for a normal exit with code 0, otherwise non-zero.
    pub fn process_exit_code(&self) -> i32 {
        match (&self.cause, self.exit_code) {
            (ExitCause::WorkloadExited, Some(code)) => i32::try_from(code).unwrap_or(1),
            (ExitCause::WorkloadExited, None) => 0,
            _ => 1,
        }
    }
}

/// CPUs and memory hierarchy; the context every event runs against.
#[derive(Debug)]
pub struct Machine {
    /// Cores, indexed by CPU id.
    pub cpus: Vec<Cpu>,
    /// Memory hierarchy shared by all cores.
    pub memory: MemorySystem,
    error: Option<SimError>,
    last_exit: Option<i64>,
}

impl MemoryHost for Machine {
    fn memory(&mut self) -> &mut MemorySystem {
        &mut self.memory
    }

    fn deliver(&mut self, response: MemResponse, queue: &mut EventQueue<Self>) {
        if let Some(cpu) = self.cpus.get_mut(response.request.cpu) {
            cpu.handle_response(response, queue.now());
        }
    }
}

impl Machine {
    fn tick_cpu(&mut self, id: usize, queue: &mut EventQueue<Self>) {
        let cpu = &mut self.cpus[id];
        let active_before: Vec<bool> = cpu.threads.iter().map(CpuContext::is_active).collect();

        if let Err(e) = cpu.tick(&mut self.memory, queue) {
            self.error = Some(e);
            return;
        }

        for (ctx, was_active) in cpu.threads.iter().zip(active_before) {
            if let (true, ThreadStatus::Exited(code)) = (was_active, ctx.status) {
                self.last_exit = Some(code);
            }
        }
        if cpu.should_run() {
            schedule_cpu_tick(queue, id, cpu.period);
        } else {
            debug!(cpu = id, tick = queue.now(), "cpu stopped");
        }
    }

    fn exit_cause(&self) -> Option<ExitCause> {
        if let Some((cpu, (thread, fault))) = self
            .cpus
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.fault.map(|f| (i, f)))
        {
            return Some(ExitCause::Fault { cpu, thread, fault });
        }
        if self.cpus.iter().any(|c| c.inst_limit_reached) {
            return Some(ExitCause::InstLimit);
        }
        if self.cpus.iter().all(Cpu::all_exited) {
            return Some(ExitCause::WorkloadExited);
        }
        None
    }
}

fn schedule_cpu_tick(queue: &mut EventQueue<Machine>, id: usize, delay: Tick) {
    let _ = queue.schedule_in(delay, priority::CPU_TICK + id as i32, move |m: &mut Machine, q| {
        m.tick_cpu(id, q);
    });
}

/// Top-level simulator.
#[derive(Debug)]
pub struct Simulator {
    /// Global event queue and clock.
    pub queue: EventQueue<Machine>,
    /// CPUs and memory.
    pub machine: Machine,
    config: Config,
    workload: Arc<dyn Workload>,
}

impl Simulator {
    /// Builds a simulator for the workload named by `config.binary_path`.
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        let workload = load_workload(&config.binary_path, &config.arguments)?;
        Self::with_workload(config, workload)
    }

    /// Builds a simulator with the standard port wiring and an explicit workload.
    pub fn with_workload(config: Config, workload: Arc<dyn Workload>) -> Result<Self, SimError> {
        let wiring = Wiring::standard(config.cpu_count)?;
        Self::with_wiring(config, workload, &wiring)
    }

    /// Builds a simulator from an explicit port wiring.
    pub fn with_wiring(config: Config, workload: Arc<dyn Workload>, wiring: &Wiring) -> Result<Self, SimError> {
        config.validate()?;
        let memory = build_memory(&config, wiring)?;
        let cpus = (0..config.cpu_count)
            .map(|id| Cpu::new(id, &config, &workload))
            .collect::<Result<Vec<_>, _>>()?;

        let mut queue = EventQueue::new();
        for id in 0..cpus.len() {
            schedule_cpu_tick(&mut queue, id, 0);
        }
        info!(
            workload = workload.name(),
            cpus = config.cpu_count,
            threads = config.threads_per_cpu,
            clock = %config.clock,
            "simulator built"
        );

        Ok(Self {
            queue,
            machine: Machine {
                cpus,
                memory,
                error: None,
                last_exit: None,
            },
            config,
            workload,
        })
    }

    /// The configuration the simulator was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The workload every thread runs.
    pub fn workload(&self) -> &Arc<dyn Workload> {
        &self.workload
    }

    /// Schedules interrupt `vector` for `thread` of `cpu` at absolute `tick`.
    pub fn post_interrupt(&mut self, cpu: usize, thread: usize, tick: Tick, vector: u32) -> Result<(), SimError> {
        let exists = self
            .machine
            .cpus
            .get(cpu)
            .is_some_and(|c| thread < c.threads.len());
        if !exists {
            return Err(SimError::NoSuchThread { cpu, thread });
        }
        let _ = self.queue.schedule(tick, priority::INTERRUPT, move |m: &mut Machine, _| {
            if let Err(e) = m.cpus[cpu].post_interrupt(thread, vector) {
                m.error = Some(e);
            }
        })?;
        Ok(())
    }

    /// Runs until an exit condition.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by a CPU (deadlock) or the event queue.
    pub fn run(&mut self) -> Result<ExitReport, SimError> {
        let max_ticks = self.config.limits.max_ticks;
        loop {
            if let Some(e) = self.machine.error.take() {
                return Err(e);
            }
            if let Some(cause) = self.machine.exit_cause() {
                return Ok(self.report(self.queue.now(), cause));
            }
            let Some(next) = self.queue.peek_tick() else {
                return Err(SimError::EmptyQueue(self.queue.now()));
            };
            if max_ticks.is_some_and(|limit| next > limit) {
                let limit = max_ticks.unwrap_or(next);
                return Ok(self.report(limit, ExitCause::TickLimit));
            }
            let _ = self.queue.advance(&mut self.machine)?;
        }
    }

    fn report(&self, final_tick: Tick, cause: ExitCause) -> ExitReport {
        info!(final_tick, %cause, "simulation finished");
        ExitReport {
            final_tick,
            exit_code: matches!(cause, ExitCause::WorkloadExited)
                .then_some(self.machine.last_exit)
                .flatten(),
            cause,
        }
    }

    /// Program output of thread 0 on CPU 0, if the workload produces any.
    pub fn output(&self) -> Option<String> {
        let ctx = self.machine.cpus.first()?.threads.first()?;
        self.workload.output(&ctx.state)
    }

    /// Prints statistics for every CPU.
    pub fn print_stats(&self, sections: &[String]) {
        let caches = self.machine.memory.cache_stats();
        for cpu in &self.machine.cpus {
            cpu.stats.print_sections(cpu.id, &caches, sections);
        }
    }
}
