//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics of one CPU. It provides:
//! 1. **Cycle and IPC:** Cycles evaluated, committed instructions and derived metrics.
//! 2. **Instruction mix:** Committed instructions by op class.
//! 3. **Speculation:** Fetched and squashed instructions, branch resolutions.
//! 4. **Stalls:** Backpressure events per structure (free list, ROB, IQ, MSHRs, FUs).
//! 5. **Cache hierarchy:** Per-level hit, miss, coalescing and rejection counts.

use std::time::Instant;

use crate::core::units::cache::CacheStats;
use crate::isa::inst::OpClass;

/// Per-CPU statistics.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// CPU cycles evaluated.
    pub cycles: u64,
    /// Instructions committed.
    pub instructions_retired: u64,

    /// Integer ALU instructions committed.
    pub inst_alu: u64,
    /// Integer multiply and divide instructions committed.
    pub inst_mul_div: u64,
    /// Floating-point instructions committed.
    pub inst_fp: u64,
    /// Loads committed.
    pub inst_load: u64,
    /// Stores committed.
    pub inst_store: u64,
    /// Branches and jumps committed.
    pub inst_branch: u64,
    /// No-ops, exits and returns from interrupt committed.
    pub inst_system: u64,

    /// Instructions fetched (both paths).
    pub fetched: u64,
    /// Instructions fetched on a mispredicted path.
    pub fetched_wrong_path: u64,
    /// Instructions removed by squashes.
    pub squashed: u64,
    /// Squash operations.
    pub squashes: u64,
    /// Control instructions whose static prediction was right.
    pub branch_predictions: u64,
    /// Control instructions whose static prediction was wrong.
    pub branch_mispredictions: u64,

    /// Cycles rename stalled on an empty free list.
    pub stalls_free_list: u64,
    /// Cycles dispatch stalled on a full ROB.
    pub stalls_rob_full: u64,
    /// Cycles dispatch stalled on a full IQ.
    pub stalls_iq_full: u64,
    /// Cycles fetch waited for an instruction block.
    pub stalls_icache: u64,
    /// Fetch requests the L1I rejected.
    pub fetch_rejections: u64,
    /// Load issues the L1D rejected.
    pub load_rejections: u64,
    /// Store commits the L1D rejected.
    pub store_rejections: u64,
    /// Issue attempts that found no free functional unit.
    pub fu_busy: u64,

    /// Memory responses for squashed instructions or stale fetch epochs.
    pub suppressed_responses: u64,
    /// Interrupts taken.
    pub interrupts_taken: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            instructions_retired: 0,
            inst_alu: 0,
            inst_mul_div: 0,
            inst_fp: 0,
            inst_load: 0,
            inst_store: 0,
            inst_branch: 0,
            inst_system: 0,
            fetched: 0,
            fetched_wrong_path: 0,
            squashed: 0,
            squashes: 0,
            branch_predictions: 0,
            branch_mispredictions: 0,
            stalls_free_list: 0,
            stalls_rob_full: 0,
            stalls_iq_full: 0,
            stalls_icache: 0,
            fetch_rejections: 0,
            load_rejections: 0,
            store_rejections: 0,
            fu_busy: 0,
            suppressed_responses: 0,
            interrupts_taken: 0,
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"instruction_mix"`, `"speculation"`,
/// `"stalls"`, `"memory"`. Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "instruction_mix", "speculation", "stalls", "memory"];

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

impl SimStats {
    /// Counts one committed instruction of class `class`.
    pub fn record_commit(&mut self, class: OpClass) {
        self.instructions_retired += 1;
        let slot = match class {
            OpClass::IntAlu => &mut self.inst_alu,
            OpClass::IntMul | OpClass::IntDiv => &mut self.inst_mul_div,
            OpClass::FpAlu | OpClass::FpMul => &mut self.inst_fp,
            OpClass::MemRead => &mut self.inst_load,
            OpClass::MemWrite => &mut self.inst_store,
            OpClass::Branch => &mut self.inst_branch,
            OpClass::NoOp => &mut self.inst_system,
        };
        *slot += 1;
    }

    /// Committed instructions per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instructions_retired as f64 / self.cycles as f64
        }
    }

    /// Prints the requested sections for CPU `cpu` to stdout.
    ///
    /// `caches` is the hierarchy-wide list from `MemorySystem::cache_stats`; only the
    /// levels named `cpu<N>.*` are printed. Pass an empty `sections` slice to print
    /// everything.
    pub fn print_sections(&self, cpu: usize, caches: &[(String, CacheStats)], sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64();
        let instr = self.instructions_retired.max(1);

        if want("summary") {
            let cpi = self.cycles as f64 / instr as f64;
            let khz = if seconds > 0.0 {
                (self.cycles as f64 / seconds) / 1000.0
            } else {
                0.0
            };
            println!("\n==========================================================");
            println!("CPU{cpu} SIMULATION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {:.4} s", seconds);
            println!("sim_cycles               {}", self.cycles);
            println!("sim_freq                 {:.2} kHz", khz);
            println!("sim_insts                {}", self.instructions_retired);
            println!("sim_ipc                  {:.4}", self.ipc());
            println!("sim_cpi                  {:.4}", cpi);
            println!("----------------------------------------------------------");
        }
        if want("instruction_mix") {
            println!("INSTRUCTION MIX");
            for (name, count) in [
                ("op.alu", self.inst_alu),
                ("op.mul_div", self.inst_mul_div),
                ("op.fp", self.inst_fp),
                ("op.load", self.inst_load),
                ("op.store", self.inst_store),
                ("op.branch", self.inst_branch),
                ("op.system", self.inst_system),
            ] {
                println!("  {:<22} {} ({:.2}%)", name, count, percent(count, instr));
            }
            println!("----------------------------------------------------------");
        }
        if want("speculation") {
            let resolved = self.branch_predictions + self.branch_mispredictions;
            println!("SPECULATION");
            println!("  fetch.insts            {}", self.fetched);
            println!("  fetch.wrong_path       {}", self.fetched_wrong_path);
            println!("  squash.count           {}", self.squashes);
            println!("  squash.insts           {}", self.squashed);
            println!("  bp.lookups             {}", resolved);
            println!("  bp.mispredicts         {}", self.branch_mispredictions);
            println!(
                "  bp.accuracy            {:.2}%",
                percent(self.branch_predictions, resolved)
            );
            println!("  interrupts             {}", self.interrupts_taken);
            println!("----------------------------------------------------------");
        }
        if want("stalls") {
            let cyc = self.cycles.max(1);
            println!("STALLS");
            for (name, count) in [
                ("rename.free_list", self.stalls_free_list),
                ("dispatch.rob_full", self.stalls_rob_full),
                ("dispatch.iq_full", self.stalls_iq_full),
                ("fetch.icache", self.stalls_icache),
            ] {
                println!("  {:<22} {} ({:.2}%)", name, count, percent(count, cyc));
            }
            println!("  fetch.rejected         {}", self.fetch_rejections);
            println!("  load.rejected          {}", self.load_rejections);
            println!("  store.rejected         {}", self.store_rejections);
            println!("  fu.busy                {}", self.fu_busy);
            println!("  suppressed_responses   {}", self.suppressed_responses);
            println!("----------------------------------------------------------");
        }
        if want("memory") {
            let prefix = format!("cpu{cpu}.");
            println!("MEMORY HIERARCHY");
            for (name, stats) in caches.iter().filter(|(n, _)| n.starts_with(&prefix)) {
                println!(
                    "  {:<10} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}% | mshr_hits: {} | rejected: {} | writebacks: {}",
                    name,
                    stats.hits + stats.misses,
                    stats.hits,
                    100.0 * stats.miss_rate(),
                    stats.mshr_hits,
                    stats.rejected,
                    stats.writebacks
                );
            }
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(cpu, caches, &[])`.
    pub fn print(&self, cpu: usize, caches: &[(String, CacheStats)]) {
        self.print_sections(cpu, caches, &[]);
    }
}
