//! CPU Core Definition and Initialization.
//!
//! This module defines the central `Cpu` structure, the container for one
//! out-of-order core and its hardware threads. It coordinates the following:
//! 1. **Thread State:** One `CpuContext` and one fetch unit state per hardware thread.
//! 2. **Pipeline Structures:** Stage queues, ROB, issue queue, rename maps, physical
//!    registers and functional units, shared by all threads of the core.
//! 3. **Cycle Evaluation:** `tick` runs every stage once, commit first.
//! 4. **Memory Completions:** `handle_response` routes L1 responses to the waiting
//!    fetch unit or load and discards those that a squash made stale.
//! 5. **Squash:** `squash` removes a thread's younger in-flight instructions and
//!    rolls back everything they touched.

/// Hardware thread contexts and functional state.
pub mod context;

/// Per-thread interrupt controller.
pub mod interrupts;

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::common::error::{Fault, SimError};
use crate::common::units::Tick;
use crate::config::{Config, PipelineConfig};
use crate::core::cpu::context::{CpuContext, create_threads};
use crate::core::pipeline::dyn_inst::{DynInst, InstStage};
use crate::core::pipeline::iq::IssueQueue;
use crate::core::pipeline::rename::{PhysRegFile, RenameMap};
use crate::core::pipeline::rob::Rob;
use crate::core::pipeline::stages;
use crate::core::units::fu::FuPool;
use crate::isa::workload::Workload;
use crate::sim::event::EventQueue;
use crate::soc::memory::{MemResponse, MemoryHost, MemorySystem, Token};
use crate::stats::SimStats;

/// Fetch unit state of one hardware thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchState {
    /// Next PC to fetch.
    pub pc: u64,
    /// Incremented by every redirect; fetch responses carry the epoch they were
    /// requested in.
    pub epoch: u64,
    /// Instruction block currently buffered.
    pub block: Option<u64>,
    /// Instruction block requested from the L1I and not yet returned.
    pub pending: Option<u64>,
    /// Fetching past an unresolved mispredicted branch.
    pub wrong_path: bool,
    /// Stopped after an exit, a fault or an unmapped wrong-path PC.
    pub halted: bool,
}

/// One committed instruction, recorded when commit logging is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    /// Hardware thread.
    pub thread: usize,
    /// Sequence number.
    pub seq: u64,
    /// PC.
    pub pc: u64,
    /// Commit tick.
    pub tick: Tick,
}

/// One out-of-order core.
pub struct Cpu {
    /// CPU index.
    pub id: usize,
    /// Clock period in ticks.
    pub period: Tick,
    /// Stage widths and structure sizes.
    pub pipeline: PipelineConfig,
    /// Hardware threads.
    pub threads: Vec<CpuContext>,
    /// Fetch state per thread.
    pub fetch: Vec<FetchState>,
    /// Thread that fetch tries first next cycle.
    pub fetch_rr: usize,
    next_seq: u64,

    /// Every in-flight instruction by sequence number.
    pub insts: BTreeMap<u64, DynInst>,
    /// Fetched, waiting for decode.
    pub fetch_queue: VecDeque<u64>,
    /// Decoded, waiting for rename.
    pub decode_queue: VecDeque<u64>,
    /// Renamed, waiting for dispatch.
    pub rename_queue: VecDeque<u64>,
    /// Reorder buffer.
    pub rob: Rob,
    /// Issue queue.
    pub iq: IssueQueue,
    /// Rename map per thread.
    pub rename_maps: Vec<RenameMap>,
    /// Physical register free list and ready bits.
    pub regs: PhysRegFile,
    /// Functional units.
    pub fu: FuPool,
    /// Issued instructions by the tick their result is available.
    pub executing: BinaryHeap<Reverse<(Tick, u64)>>,
    /// Executed instructions waiting for a writeback slot, in completion order.
    pub executed: VecDeque<u64>,

    /// Statistics.
    pub stats: SimStats,
    /// Commit trace, if enabled.
    pub commit_log: Option<Vec<CommitRecord>>,
    /// Fault that reached commit, with its thread.
    pub fault: Option<(usize, Fault)>,
    /// A thread committed `max_insts` instructions.
    pub inst_limit_reached: bool,
    max_insts: Option<u64>,
    deadlock_threshold: u64,
    idle_cycles: u64,
    committed_this_cycle: usize,
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("id", &self.id)
            .field("threads", &self.threads)
            .field("in_flight", &self.insts.len())
            .field("rob", &self.rob.len())
            .field("iq", &self.iq.len())
            .finish_non_exhaustive()
    }
}

impl Cpu {
    /// Creates CPU `id` running `workload` on every hardware thread.
    pub fn new(id: usize, config: &Config, workload: &Arc<dyn Workload>) -> Result<Self, SimError> {
        let period = config.clock_period()?;
        let mem_limit = config.memory_bytes()?;
        let threads = create_threads(workload, config.threads_per_cpu, mem_limit);
        let fetch = threads
            .iter()
            .map(|t| FetchState {
                pc: t.arch_pc,
                ..FetchState::default()
            })
            .collect();
        let p = &config.pipeline;

        Ok(Self {
            id,
            period,
            pipeline: p.clone(),
            fetch,
            fetch_rr: 0,
            next_seq: 1,
            insts: BTreeMap::new(),
            fetch_queue: VecDeque::with_capacity(p.fetch_queue_size),
            decode_queue: VecDeque::with_capacity(p.stage_queue_size),
            rename_queue: VecDeque::with_capacity(p.stage_queue_size),
            rob: Rob::new(p.rob_entries),
            iq: IssueQueue::new(p.iq_entries),
            rename_maps: (0..threads.len()).map(RenameMap::new).collect(),
            regs: PhysRegFile::new(p.phys_regs, threads.len()),
            fu: FuPool::new(&p.fu, period),
            executing: BinaryHeap::new(),
            executed: VecDeque::new(),
            stats: SimStats::default(),
            commit_log: config.record_commits.then(Vec::new),
            fault: None,
            inst_limit_reached: false,
            max_insts: config.limits.max_insts,
            deadlock_threshold: config.limits.deadlock_threshold,
            idle_cycles: 0,
            committed_this_cycle: 0,
            threads,
        })
    }

    /// Hands out the next sequence number.
    pub(crate) fn alloc_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Returns true while any thread has not exited.
    pub fn is_active(&self) -> bool {
        self.threads.iter().any(CpuContext::is_active)
    }

    /// Returns true once every thread has exited.
    pub fn all_exited(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the CPU should keep being ticked.
    pub fn should_run(&self) -> bool {
        self.is_active() && self.fault.is_none() && !self.inst_limit_reached
    }

    /// Queues interrupt `vector` for `thread`.
    pub fn post_interrupt(&mut self, thread: usize, vector: u32) -> Result<(), SimError> {
        let cpu = self.id;
        let ctx = self
            .threads
            .get_mut(thread)
            .ok_or(SimError::NoSuchThread { cpu, thread })?;
        ctx.interrupts.post(vector);
        trace!(cpu, thread, vector, "interrupt posted");
        Ok(())
    }

    /// Evaluates one cycle.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ResourceExhaustion` when nothing has committed for the
    /// configured number of consecutive cycles while work is in flight.
    pub fn tick<H: MemoryHost>(&mut self, mem: &mut MemorySystem, queue: &mut EventQueue<H>) -> Result<(), SimError> {
        self.stats.cycles += 1;
        self.committed_this_cycle = 0;

        stages::commit_stage(self, mem, queue);
        stages::writeback_stage(self, queue.now());
        stages::issue_stage(self, mem, queue);
        stages::dispatch_stage(self);
        stages::rename_stage(self);
        stages::decode_stage(self);
        stages::fetch_stage(self, mem, queue);

        if self.committed_this_cycle > 0 || self.insts.is_empty() {
            self.idle_cycles = 0;
        } else {
            self.idle_cycles += 1;
            if self.idle_cycles >= self.deadlock_threshold {
                return Err(SimError::ResourceExhaustion {
                    cpu: self.id,
                    tick: queue.now(),
                    cycles: self.idle_cycles,
                    dump: self.dump(),
                });
            }
        }
        Ok(())
    }

    /// Counts a commit for the deadlock detector and the instruction limit.
    pub(crate) fn note_commit(&mut self, thread: usize) {
        self.committed_this_cycle += 1;
        if self
            .max_insts
            .is_some_and(|max| self.threads[thread].committed >= max)
        {
            self.inst_limit_reached = true;
        }
    }

    /// Routes a completed memory request to its consumer.
    pub fn handle_response(&mut self, response: MemResponse, now: Tick) {
        let req = response.request;
        match req.token {
            Token::Fetch { epoch } => {
                let Some(fs) = self.fetch.get_mut(req.thread) else {
                    return;
                };
                if fs.epoch == epoch && fs.pending == Some(req.addr) {
                    fs.pending = None;
                    fs.block = Some(req.addr);
                } else {
                    self.stats.suppressed_responses += 1;
                }
            }
            Token::Inst(seq) => match self.insts.get_mut(&seq) {
                Some(inst) if inst.waiting_on_memory => {
                    inst.waiting_on_memory = false;
                    inst.stage = InstStage::Executed;
                    self.executed.push_back(seq);
                    trace!(cpu = self.id, seq, tick = now, "load data returned");
                }
                _ => {
                    trace!(cpu = self.id, seq, "response for squashed load");
                    self.stats.suppressed_responses += 1;
                }
            },
            Token::StoreCommit(_) => {}
        }
    }

    /// Removes every in-flight instruction of `thread` younger than `after_seq` and
    /// redirects the thread's fetch to its correct-path PC.
    ///
    /// Rename mappings, physical registers and functional state are restored
    /// youngest-first. Passing 0 flushes the thread completely.
    pub fn squash(&mut self, thread: usize, after_seq: u64) {
        let victims: Vec<u64> = self
            .insts
            .range(after_seq + 1..)
            .filter(|(_, i)| i.thread == thread)
            .map(|(&seq, _)| seq)
            .rev()
            .collect();

        for seq in &victims {
            let Some(inst) = self.insts.remove(seq) else {
                continue;
            };
            if let (Some(arch), Some(phys), Some(prev)) = (inst.dest_arch, inst.dest_phys, inst.prev_phys) {
                let _ = self.rename_maps[thread].remap(arch, prev);
                self.regs.release(phys);
            }
            if let Some(undo) = inst.undo {
                self.threads[thread].undo(&undo);
            }
        }

        let gone = |seq: &u64| victims.binary_search_by(|v| seq.cmp(v)).is_ok();
        self.fetch_queue.retain(|s| !gone(s));
        self.decode_queue.retain(|s| !gone(s));
        self.rename_queue.retain(|s| !gone(s));
        self.executed.retain(|s| !gone(s));
        let _ = self.rob.flush_after(thread, after_seq);
        let _ = self.iq.flush_after(thread, after_seq);

        let fs = &mut self.fetch[thread];
        fs.epoch += 1;
        fs.block = None;
        fs.pending = None;
        fs.wrong_path = false;
        fs.halted = false;
        fs.pc = self.threads[thread].arch_pc;

        self.stats.squashes += 1;
        self.stats.squashed += victims.len() as u64;
        debug!(
            cpu = self.id,
            thread,
            after_seq,
            squashed = victims.len(),
            redirect = fs.pc,
            "squash"
        );
    }

    /// Human-readable pipeline state for deadlock reports.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "cpu{}: rob {}/{} iq {}/{} free regs {} fetchq {} decodeq {} renameq {} executing {} executed {}",
            self.id,
            self.rob.len(),
            self.rob.capacity(),
            self.iq.len(),
            self.pipeline.iq_entries,
            self.regs.free_count(),
            self.fetch_queue.len(),
            self.decode_queue.len(),
            self.rename_queue.len(),
            self.executing.len(),
            self.executed.len()
        );
        for (t, fs) in self.fetch.iter().enumerate() {
            let _ = writeln!(
                out,
                "  thread {t}: status {:?} arch_pc {:#x} fetch_pc {:#x} block {:?} pending {:?} wrong_path {} halted {}",
                self.threads[t].status,
                self.threads[t].arch_pc,
                fs.pc,
                fs.block,
                fs.pending,
                fs.wrong_path,
                fs.halted
            );
        }
        for entry in self.rob.iter().take(8) {
            if let Some(inst) = self.insts.get(&entry.seq) {
                let _ = writeln!(
                    out,
                    "  rob seq {} thread {} pc {:#x} {:?} stage {:?} waiting_on_memory {}",
                    inst.seq,
                    inst.thread,
                    inst.pc(),
                    inst.inst.op,
                    inst.stage,
                    inst.waiting_on_memory
                );
            }
        }
        out
    }

    /// Number of in-flight instructions of `thread` in `stage`.
    pub fn count_in_stage(&self, thread: usize, stage: InstStage) -> usize {
        self.insts
            .values()
            .filter(|i| i.thread == thread && i.stage == stage)
            .count()
    }
}
