//! Configuration system for the simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline hardware constants (widths, cache geometry, DRAM timing).
//! 2. **Structures:** Hierarchical config for the workload, pipeline, caches, memory, and limits.
//! 3. **Enums:** Memory controller and replacement policy types.
//! 4. **Validation:** `Config::validate` rejects impossible machines before simulation starts.
//!
//! Configuration is supplied as JSON (see `--config` on the CLI) or built from
//! `Config::default()`, which mirrors the single-CPU pipeline experiment: a 4-wide
//! out-of-order core at 1GHz with 16kB/64kB L1s and a 256kB L2.

use serde::Deserialize;

use crate::common::constants::NUM_ARCH_REGS;
use crate::common::error::ConfigError;
use crate::common::units::{self, Tick};

/// Default configuration constants for the simulator.
mod defaults {
    /// Workload binary when none is given.
    pub const BINARY: &str = "/bin/echo";

    /// Workload arguments when none are given.
    pub const ARGUMENTS: &str = "Hello gem5 pipeline";

    /// Core clock.
    pub const CLOCK: &str = "1GHz";

    /// Size of the single memory range starting at address 0.
    pub const MEMORY_SIZE: &str = "8192MiB";

    /// Stage width (instructions per cycle) for every pipeline stage.
    pub const WIDTH: usize = 4;

    /// Fetch queue capacity (fetched, not yet decoded).
    pub const FETCH_QUEUE: usize = 32;

    /// Capacity of the decode and rename inter-stage queues.
    pub const STAGE_QUEUE: usize = 16;

    /// Reorder buffer entries.
    pub const ROB_ENTRIES: usize = 192;

    /// Issue queue entries.
    pub const IQ_ENTRIES: usize = 64;

    /// Physical integer registers.
    pub const PHYS_REGS: usize = 256;

    /// Cache line size in bytes.
    pub const LINE_BYTES: u64 = 64;

    /// Fixed memory controller latency in core cycles (closed-page model).
    pub const MEM_LATENCY: u64 = 50;

    /// CAS latency in core cycles.
    pub const T_CAS: u64 = 14;

    /// RAS latency in core cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in core cycles.
    pub const T_PRE: u64 = 14;

    /// DRAM row size in bytes for the row-buffer model.
    pub const ROW_BYTES: u64 = 2048;

    /// Crossbar arbitration delay per contending requester, in core cycles.
    pub const XBAR_LATENCY: u64 = 1;

    /// Cycles without a commit (with work in flight) before declaring deadlock.
    pub const DEADLOCK_THRESHOLD: u64 = 10_000;
}

/// Memory controller implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryController {
    /// Closed-page, fixed-latency controller: every access costs `latency` cycles.
    #[default]
    Simple,
    /// Open-page controller with a single row buffer (CAS/RAS/precharge timing).
    #[serde(alias = "DRAM")]
    Dram,
}

/// Cache replacement policy algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Least Recently Used; ties broken by lowest way index.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// First In First Out (oldest fill is evicted).
    #[serde(alias = "Fifo")]
    Fifo,
}

/// Root configuration structure containing all simulator settings.
///
/// Every field has a documented default, so an empty JSON object is a valid
/// configuration.
///
/// # Examples
///
/// ```
/// use o3sim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.clock, "1GHz");
/// assert_eq!(config.pipeline.fetch_width, 4);
/// assert_eq!(config.l2.assoc, 8);
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use o3sim_core::config::{Config, MemoryController};
///
/// let json = r#"{
///     "clock": "2GHz",
///     "memory_size": "512MiB",
///     "cpu_count": 2,
///     "pipeline": { "fetch_width": 8, "commit_width": 8 },
///     "l1d": { "size": "32KiB", "assoc": 2, "tag_latency": 2, "data_latency": 2,
///              "response_latency": 2, "mshrs": 4, "tgts_per_mshr": 20 },
///     "memory": { "controller": "Dram" }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.cpu_count, 2);
/// assert_eq!(config.pipeline.fetch_width, 8);
/// assert_eq!(config.pipeline.decode_width, 4);
/// assert_eq!(config.l1d.size_bytes().unwrap(), 32 * 1024);
/// assert_eq!(config.memory.controller, MemoryController::Dram);
/// assert_eq!(config.clock_period().unwrap(), 500);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Workload program path. A `.json` path is loaded as a program image; anything
    /// else runs the built-in echo-like program over `arguments`.
    #[serde(default = "Config::default_binary")]
    pub binary_path: String,

    /// Workload arguments.
    #[serde(default = "Config::default_arguments")]
    pub arguments: Vec<String>,

    /// Core clock (`"1GHz"`, `"500ps"`, ...).
    #[serde(default = "Config::default_clock")]
    pub clock: String,

    /// Size of the memory range `[0, memory_size)`.
    #[serde(default = "Config::default_memory_size")]
    pub memory_size: String,

    /// Number of CPUs sharing the system crossbar.
    #[serde(default = "Config::default_one")]
    pub cpu_count: usize,

    /// Hardware threads per CPU.
    #[serde(default = "Config::default_one")]
    pub threads_per_cpu: usize,

    /// Pipeline widths and structure sizes.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// L1 instruction cache.
    #[serde(default = "CacheConfig::l1i")]
    pub l1i: CacheConfig,

    /// L1 data cache.
    #[serde(default = "CacheConfig::l1d")]
    pub l1d: CacheConfig,

    /// Unified private L2 cache.
    #[serde(default = "CacheConfig::l2")]
    pub l2: CacheConfig,

    /// Memory controller.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Crossbar parameters.
    #[serde(default)]
    pub interconnect: InterconnectConfig,

    /// Termination limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Record every committed instruction (thread, sequence number, pc, tick) on
    /// its CPU for later inspection.
    #[serde(default)]
    pub record_commits: bool,
}

impl Config {
    fn default_binary() -> String {
        defaults::BINARY.to_string()
    }

    fn default_arguments() -> Vec<String> {
        defaults::ARGUMENTS.split_whitespace().map(str::to_string).collect()
    }

    fn default_clock() -> String {
        defaults::CLOCK.to_string()
    }

    fn default_memory_size() -> String {
        defaults::MEMORY_SIZE.to_string()
    }

    fn default_one() -> usize {
        1
    }

    /// Clock period in ticks.
    pub fn clock_period(&self) -> Result<Tick, ConfigError> {
        units::parse_clock(&self.clock)
    }

    /// Memory range size in bytes.
    pub fn memory_bytes(&self) -> Result<u64, ConfigError> {
        units::parse_size(&self.memory_size)
    }

    /// Checks the configuration for values no machine could be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _ = self.clock_period()?;
        let bytes = self.memory_bytes()?;
        if bytes == 0 {
            return Err(ConfigError::Zero {
                what: "memory_size".into(),
            });
        }
        nonzero("cpu_count", self.cpu_count as u64)?;
        nonzero("threads_per_cpu", self.threads_per_cpu as u64)?;

        self.pipeline.validate(self.threads_per_cpu)?;
        self.l1i.validate("l1i")?;
        self.l1d.validate("l1d")?;
        self.l2.validate("l2")?;
        self.memory.validate()?;
        nonzero("limits.deadlock_threshold", self.limits.deadlock_threshold)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary_path: Self::default_binary(),
            arguments: Self::default_arguments(),
            clock: Self::default_clock(),
            memory_size: Self::default_memory_size(),
            cpu_count: 1,
            threads_per_cpu: 1,
            pipeline: PipelineConfig::default(),
            l1i: CacheConfig::l1i(),
            l1d: CacheConfig::l1d(),
            l2: CacheConfig::l2(),
            memory: MemoryConfig::default(),
            interconnect: InterconnectConfig::default(),
            limits: LimitsConfig::default(),
            record_commits: false,
        }
    }
}

fn nonzero(what: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { what: what.into() })
    } else {
        Ok(())
    }
}

fn power_of_two(what: &str, value: u64) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo {
            what: what.into(),
            value,
        })
    }
}

/// Pipeline widths and buffer sizes.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Instructions fetched per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub fetch_width: usize,
    /// Instructions decoded per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub decode_width: usize,
    /// Instructions renamed per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub rename_width: usize,
    /// Instructions dispatched into the ROB/IQ per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub dispatch_width: usize,
    /// Instructions issued to functional units per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub issue_width: usize,
    /// Instructions written back per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub writeback_width: usize,
    /// Instructions committed per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub commit_width: usize,

    /// Fetch queue capacity.
    #[serde(default = "PipelineConfig::default_fetch_queue")]
    pub fetch_queue_size: usize,
    /// Decode and rename queue capacity.
    #[serde(default = "PipelineConfig::default_stage_queue")]
    pub stage_queue_size: usize,
    /// Reorder buffer entries.
    #[serde(default = "PipelineConfig::default_rob")]
    pub rob_entries: usize,
    /// Issue queue entries.
    #[serde(default = "PipelineConfig::default_iq")]
    pub iq_entries: usize,
    /// Physical integer registers shared by all threads of a CPU.
    #[serde(default = "PipelineConfig::default_phys_regs")]
    pub phys_regs: usize,

    /// Functional unit pool.
    #[serde(default)]
    pub fu: FuPoolConfig,
}

impl PipelineConfig {
    fn default_width() -> usize {
        defaults::WIDTH
    }

    fn default_fetch_queue() -> usize {
        defaults::FETCH_QUEUE
    }

    fn default_stage_queue() -> usize {
        defaults::STAGE_QUEUE
    }

    fn default_rob() -> usize {
        defaults::ROB_ENTRIES
    }

    fn default_iq() -> usize {
        defaults::IQ_ENTRIES
    }

    fn default_phys_regs() -> usize {
        defaults::PHYS_REGS
    }

    /// Sets every stage width to `width`.
    pub fn with_uniform_width(mut self, width: usize) -> Self {
        self.fetch_width = width;
        self.decode_width = width;
        self.rename_width = width;
        self.dispatch_width = width;
        self.issue_width = width;
        self.writeback_width = width;
        self.commit_width = width;
        self
    }

    fn validate(&self, threads: usize) -> Result<(), ConfigError> {
        for (stage, width) in [
            ("fetch", self.fetch_width),
            ("decode", self.decode_width),
            ("rename", self.rename_width),
            ("dispatch", self.dispatch_width),
            ("issue", self.issue_width),
            ("writeback", self.writeback_width),
            ("commit", self.commit_width),
        ] {
            if width == 0 {
                return Err(ConfigError::ZeroWidth { stage });
            }
        }
        nonzero("pipeline.fetch_queue_size", self.fetch_queue_size as u64)?;
        nonzero("pipeline.stage_queue_size", self.stage_queue_size as u64)?;
        nonzero("pipeline.rob_entries", self.rob_entries as u64)?;
        nonzero("pipeline.iq_entries", self.iq_entries as u64)?;
        if self.phys_regs <= NUM_ARCH_REGS * threads {
            return Err(ConfigError::TooFewPhysRegs {
                phys: self.phys_regs,
                arch: NUM_ARCH_REGS,
                threads,
            });
        }
        self.fu.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_width: defaults::WIDTH,
            decode_width: defaults::WIDTH,
            rename_width: defaults::WIDTH,
            dispatch_width: defaults::WIDTH,
            issue_width: defaults::WIDTH,
            writeback_width: defaults::WIDTH,
            commit_width: defaults::WIDTH,
            fetch_queue_size: defaults::FETCH_QUEUE,
            stage_queue_size: defaults::STAGE_QUEUE,
            rob_entries: defaults::ROB_ENTRIES,
            iq_entries: defaults::IQ_ENTRIES,
            phys_regs: defaults::PHYS_REGS,
            fu: FuPoolConfig::default(),
        }
    }
}

/// One class of functional unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FuConfig {
    /// Number of identical units.
    pub count: usize,
    /// Cycles from issue to result.
    pub latency: u64,
    /// A pipelined unit accepts a new operation every cycle; otherwise it is busy
    /// for the full latency.
    #[serde(default = "FuConfig::default_pipelined")]
    pub pipelined: bool,
}

impl FuConfig {
    fn default_pipelined() -> bool {
        true
    }

    const fn new(count: usize, latency: u64, pipelined: bool) -> Self {
        Self {
            count,
            latency,
            pipelined,
        }
    }
}

/// Functional unit pool of one CPU.
#[derive(Debug, Clone, Deserialize)]
pub struct FuPoolConfig {
    /// Integer ALUs (also resolve branches).
    #[serde(default = "FuPoolConfig::default_int_alu")]
    pub int_alu: FuConfig,
    /// Integer multipliers.
    #[serde(default = "FuPoolConfig::default_int_mul")]
    pub int_mul: FuConfig,
    /// Integer dividers.
    #[serde(default = "FuPoolConfig::default_int_div")]
    pub int_div: FuConfig,
    /// Floating-point adders.
    #[serde(default = "FuPoolConfig::default_fp_alu")]
    pub fp_alu: FuConfig,
    /// Floating-point multipliers.
    #[serde(default = "FuPoolConfig::default_fp_mul")]
    pub fp_mul: FuConfig,
    /// Load/store address ports.
    #[serde(default = "FuPoolConfig::default_mem_port")]
    pub mem_port: FuConfig,
}

impl FuPoolConfig {
    fn default_int_alu() -> FuConfig {
        FuConfig::new(6, 1, true)
    }

    fn default_int_mul() -> FuConfig {
        FuConfig::new(2, 3, true)
    }

    fn default_int_div() -> FuConfig {
        FuConfig::new(1, 20, false)
    }

    fn default_fp_alu() -> FuConfig {
        FuConfig::new(4, 2, true)
    }

    fn default_fp_mul() -> FuConfig {
        FuConfig::new(2, 4, true)
    }

    fn default_mem_port() -> FuConfig {
        FuConfig::new(2, 1, true)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, fu) in [
            ("int_alu", self.int_alu),
            ("int_mul", self.int_mul),
            ("int_div", self.int_div),
            ("fp_alu", self.fp_alu),
            ("fp_mul", self.fp_mul),
            ("mem_port", self.mem_port),
        ] {
            nonzero(&format!("pipeline.fu.{name}.count"), fu.count as u64)?;
            nonzero(&format!("pipeline.fu.{name}.latency"), fu.latency)?;
        }
        Ok(())
    }
}

impl Default for FuPoolConfig {
    fn default() -> Self {
        Self {
            int_alu: Self::default_int_alu(),
            int_mul: Self::default_int_mul(),
            int_div: Self::default_int_div(),
            fp_alu: Self::default_fp_alu(),
            fp_mul: Self::default_fp_mul(),
            mem_port: Self::default_mem_port(),
        }
    }
}

/// Individual cache level configuration.
///
/// Latencies are in core cycles. Fields missing from JSON fall back to L1-style
/// values; an entirely missing level uses that level's own defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Capacity (`"16kB"`, `"256KiB"`, ...).
    #[serde(default = "CacheConfig::default_size")]
    pub size: String,
    /// Associativity (ways per set).
    #[serde(default = "CacheConfig::default_assoc")]
    pub assoc: usize,
    /// Tag lookup latency.
    #[serde(default = "CacheConfig::default_latency")]
    pub tag_latency: u64,
    /// Data array latency.
    #[serde(default = "CacheConfig::default_latency")]
    pub data_latency: u64,
    /// Latency from hit to response at the requester.
    #[serde(default = "CacheConfig::default_latency")]
    pub response_latency: u64,
    /// Miss status holding registers (outstanding block misses).
    #[serde(default = "CacheConfig::default_mshrs")]
    pub mshrs: usize,
    /// Requests one MSHR may coalesce.
    #[serde(default = "CacheConfig::default_tgts")]
    pub tgts_per_mshr: usize,
    /// Line size in bytes.
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: u64,
    /// Replacement policy.
    #[serde(default)]
    pub policy: ReplacementPolicy,
}

impl CacheConfig {
    fn default_size() -> String {
        "16kB".to_string()
    }

    fn default_assoc() -> usize {
        2
    }

    fn default_latency() -> u64 {
        1
    }

    fn default_mshrs() -> usize {
        4
    }

    fn default_tgts() -> usize {
        20
    }

    fn default_line() -> u64 {
        defaults::LINE_BYTES
    }

    /// Builds a cache configuration from the parameters every level shares.
    pub fn new(size: &str, assoc: usize, latency: u64, mshrs: usize, tgts_per_mshr: usize) -> Self {
        Self {
            size: size.to_string(),
            assoc,
            tag_latency: latency,
            data_latency: latency,
            response_latency: latency,
            mshrs,
            tgts_per_mshr,
            line_bytes: defaults::LINE_BYTES,
            policy: ReplacementPolicy::Lru,
        }
    }

    /// Default L1 instruction cache: 16kB, 2-way, 1-cycle, 4 MSHRs.
    pub fn l1i() -> Self {
        Self::new("16kB", 2, 1, 4, 20)
    }

    /// Default L1 data cache: 64kB, 2-way, 1-cycle, 4 MSHRs.
    pub fn l1d() -> Self {
        Self::new("64kB", 2, 1, 4, 20)
    }

    /// Default L2 cache: 256kB, 8-way, 10-cycle, 16 MSHRs.
    pub fn l2() -> Self {
        Self::new("256kB", 8, 10, 16, 20)
    }

    /// Capacity in bytes.
    pub fn size_bytes(&self) -> Result<u64, ConfigError> {
        units::parse_size(&self.size)
    }

    /// Number of sets implied by size, line size and associativity.
    pub fn num_sets(&self) -> Result<usize, ConfigError> {
        let size = self.size_bytes()?;
        let per_set = self.line_bytes.saturating_mul(self.assoc as u64);
        if per_set == 0 {
            return Ok(0);
        }
        Ok((size / per_set) as usize)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let size = self.size_bytes()?;
        power_of_two(&format!("{name}.size"), size)?;
        power_of_two(&format!("{name}.line_bytes"), self.line_bytes)?;
        nonzero(&format!("{name}.assoc"), self.assoc as u64)?;
        nonzero(&format!("{name}.mshrs"), self.mshrs as u64)?;
        nonzero(&format!("{name}.tgts_per_mshr"), self.tgts_per_mshr as u64)?;

        let sets = self.num_sets()?;
        let geometry_ok = sets > 0
            && sets.is_power_of_two()
            && (sets as u64) * self.line_bytes * self.assoc as u64 == size;
        if !geometry_ok {
            return Err(ConfigError::BadGeometry {
                cache: name.to_string(),
                size,
                assoc: self.assoc,
                line: self.line_bytes,
            });
        }
        Ok(())
    }
}

/// Main memory controller configuration. Latencies are in core cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory controller type.
    #[serde(default)]
    pub controller: MemoryController,

    /// Fixed access latency of the `Simple` controller.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,

    /// CAS latency (column access strobe).
    #[serde(default = "MemoryConfig::default_t_cas")]
    pub t_cas: u64,

    /// RAS latency (row access strobe).
    #[serde(default = "MemoryConfig::default_t_ras")]
    pub t_ras: u64,

    /// Precharge latency.
    #[serde(default = "MemoryConfig::default_t_pre")]
    pub t_pre: u64,

    /// Row size in bytes for the `Dram` controller.
    #[serde(default = "MemoryConfig::default_row_bytes")]
    pub row_bytes: u64,
}

impl MemoryConfig {
    fn default_latency() -> u64 {
        defaults::MEM_LATENCY
    }

    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }

    fn default_row_bytes() -> u64 {
        defaults::ROW_BYTES
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.controller {
            MemoryController::Simple => nonzero("memory.latency", self.latency),
            MemoryController::Dram => {
                nonzero("memory.t_cas", self.t_cas)?;
                power_of_two("memory.row_bytes", self.row_bytes)
            }
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            controller: MemoryController::default(),
            latency: defaults::MEM_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            row_bytes: defaults::ROW_BYTES,
        }
    }
}

/// Crossbar configuration. Delays are in core cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct InterconnectConfig {
    /// Per-CPU crossbar between the L1s and the L2.
    #[serde(default = "InterconnectConfig::default_latency")]
    pub l2_xbar_latency: u64,
    /// Shared crossbar between the L2s and the memory controller.
    #[serde(default = "InterconnectConfig::default_latency")]
    pub system_xbar_latency: u64,
}

impl InterconnectConfig {
    fn default_latency() -> u64 {
        defaults::XBAR_LATENCY
    }
}

impl Default for InterconnectConfig {
    fn default() -> Self {
        Self {
            l2_xbar_latency: defaults::XBAR_LATENCY,
            system_xbar_latency: defaults::XBAR_LATENCY,
        }
    }
}

/// Termination limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Stop once simulated time reaches this tick.
    #[serde(default)]
    pub max_ticks: Option<Tick>,
    /// Stop once any thread has committed this many instructions.
    #[serde(default)]
    pub max_insts: Option<u64>,
    /// Consecutive cycles without a commit, while work is in flight, that count
    /// as a deadlock.
    #[serde(default = "LimitsConfig::default_deadlock")]
    pub deadlock_threshold: u64,
}

impl LimitsConfig {
    fn default_deadlock() -> u64 {
        defaults::DEADLOCK_THRESHOLD
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ticks: None,
            max_insts: None,
            deadlock_threshold: defaults::DEADLOCK_THRESHOLD,
        }
    }
}
