//! Set-Associative Cache Level.
//!
//! This module implements one timing-only cache level (L1I, L1D or L2). It models:
//! 1. **Tag array:** Set-associative lines with valid and dirty bits; no data is stored.
//! 2. **Lookup:** `access` classifies a request as a hit, an allocated/coalesced miss,
//!    or a rejected miss when no MSHR can take it.
//! 3. **Fills:** `fill` installs the returning block, evicts a victim (counting dirty
//!    victims as writebacks) and hands back every target waiting on the block.
//!
//! A level never schedules events itself. The memory system turns the returned
//! classification into timed forwards and completions using the level's latencies.

/// Miss Status Holding Register table.
pub mod mshr;

/// Cache replacement policy implementations (LRU, FIFO).
pub mod policies;

use self::mshr::{MshrOutcome, MshrTable};
use self::policies::{FifoPolicy, LruPolicy, ReplacementPolicy};
use crate::common::data::AccessType;
use crate::common::error::ConfigError;
use crate::common::units::Tick;
use crate::config::{CacheConfig, ReplacementPolicy as PolicyType};

/// A request that can wait on an MSHR.
pub trait MissTarget {
    /// Returns true if the request writes the block once it arrives.
    fn is_write(&self) -> bool;
}

/// Cache line entry containing tag, validity, and dirty bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheLine {
    /// Address tag.
    pub tag: u64,
    /// Line holds a block.
    pub valid: bool,
    /// Line was written since it was filled.
    pub dirty: bool,
    /// Tick of the most recent hit or fill.
    pub last_access_tick: Tick,
    /// Tick the block was installed.
    pub fill_tick: Tick,
}

/// Classification of one access.
#[derive(Debug, PartialEq, Eq)]
pub enum AccessResult<T> {
    /// Block present; the target is returned for completion.
    Hit(T),
    /// Block absent; the target now waits on an MSHR. `coalesced` is false when a
    /// new MSHR was allocated and the block must be requested from the next level.
    MissAllocated {
        /// Joined an already outstanding miss.
        coalesced: bool,
    },
    /// Block absent and no MSHR could take the target; it is handed back so the
    /// requester can retry.
    MissRejected(T),
}

/// A victim pushed out by a fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eviction {
    /// Block address of the victim.
    pub addr: u64,
    /// Victim was dirty (counted as a writeback).
    pub dirty: bool,
}

/// Result of installing a returning block.
#[derive(Debug)]
pub struct Fill<T> {
    /// Requests that were waiting on the block, oldest first.
    pub targets: Vec<T>,
    /// Line evicted to make room, if the set was full.
    pub evicted: Option<Eviction>,
}

/// Per-level counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Accesses that found their block.
    pub hits: u64,
    /// Accepted misses (primary and coalesced).
    pub misses: u64,
    /// Misses that attached to an existing MSHR.
    pub mshr_hits: u64,
    /// Misses rejected for lack of an MSHR or target slot.
    pub rejected: u64,
    /// Blocks installed.
    pub fills: u64,
    /// Valid lines evicted.
    pub replacements: u64,
    /// Dirty lines evicted.
    pub writebacks: u64,
}

impl CacheStats {
    /// Fraction of accepted accesses that missed.
    pub fn miss_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }
}

/// One cache level with its tag array, replacement state and MSHRs.
///
/// `T` is the kind of request that waits on this level's misses: CPU requests for
/// an L1, L1 refills for an L2.
pub struct CacheLevel<T> {
    name: String,
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: u64,
    /// Tag lookup latency in cycles.
    pub tag_latency: u64,
    /// Data array latency in cycles.
    pub data_latency: u64,
    /// Hit-to-response latency in cycles.
    pub response_latency: u64,
    policy: Box<dyn ReplacementPolicy>,
    mshrs: MshrTable<T>,
    /// Hit, miss and writeback counters.
    pub stats: CacheStats,
}

impl<T> std::fmt::Debug for CacheLevel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLevel")
            .field("name", &self.name)
            .field("sets", &self.num_sets)
            .field("ways", &self.ways)
            .field("outstanding", &self.mshrs.outstanding())
            .finish_non_exhaustive()
    }
}

impl<T> CacheLevel<T> {
    /// Creates an empty (all lines invalid) cache level.
    ///
    /// # Errors
    ///
    /// Fails if the geometry in `config` is not valid.
    pub fn new(name: impl Into<String>, config: &CacheConfig) -> Result<Self, ConfigError> {
        let num_sets = config.num_sets()?;
        let ways = config.assoc;
        if num_sets == 0 || ways == 0 || !config.line_bytes.is_power_of_two() {
            return Err(ConfigError::BadGeometry {
                cache: name.into(),
                size: config.size_bytes()?,
                assoc: ways,
                line: config.line_bytes,
            });
        }

        let policy: Box<dyn ReplacementPolicy> = match config.policy {
            PolicyType::Lru => Box::new(LruPolicy::new(num_sets, ways)),
            PolicyType::Fifo => Box::new(FifoPolicy::new(num_sets, ways)),
        };

        Ok(Self {
            name: name.into(),
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes: config.line_bytes,
            tag_latency: config.tag_latency,
            data_latency: config.data_latency,
            response_latency: config.response_latency,
            policy,
            mshrs: MshrTable::new(config.mshrs, config.tgts_per_mshr),
            stats: CacheStats::default(),
        })
    }

    /// Level name (`"cpu0.l1d"`, ...).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line size in bytes.
    pub fn line_bytes(&self) -> u64 {
        self.line_bytes
    }

    /// Number of sets.
    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// Associativity.
    pub fn ways(&self) -> usize {
        self.ways
    }

    /// Cycles from a miss to its forward downstream (tag plus data).
    pub fn lookup_latency(&self) -> u64 {
        self.tag_latency + self.data_latency
    }

    /// Block-aligned address.
    #[inline]
    pub fn block_addr(&self, addr: u64) -> u64 {
        addr & !(self.line_bytes - 1)
    }

    #[inline]
    fn index(&self, addr: u64) -> (usize, u64) {
        let block = addr / self.line_bytes;
        let set = (block % self.num_sets as u64) as usize;
        let tag = block / self.num_sets as u64;
        (set, tag)
    }

    fn find_way(&self, set: usize, tag: u64) -> Option<usize> {
        let base = set * self.ways;
        self.lines[base..base + self.ways]
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    /// Checks if the cache holds the block containing `addr`.
    pub fn contains(&self, addr: u64) -> bool {
        let (set, tag) = self.index(addr);
        self.find_way(set, tag).is_some()
    }

    /// Returns the line holding `addr`, if present.
    pub fn line(&self, addr: u64) -> Option<&CacheLine> {
        let (set, tag) = self.index(addr);
        self.find_way(set, tag)
            .map(|way| &self.lines[set * self.ways + way])
    }

    /// Looks up `addr` and classifies the access.
    ///
    /// A hit refreshes replacement state (and dirties the line on a store). A miss
    /// is attached to an MSHR if one is available for the block, otherwise the
    /// target is returned in `MissRejected`.
    pub fn access(&mut self, addr: u64, kind: AccessType, now: Tick, target: T) -> AccessResult<T> {
        let (set, tag) = self.index(addr);
        if let Some(way) = self.find_way(set, tag) {
            let line = &mut self.lines[set * self.ways + way];
            line.last_access_tick = now;
            if kind.is_write() {
                line.dirty = true;
            }
            self.policy.update(set, way, now);
            self.stats.hits += 1;
            return AccessResult::Hit(target);
        }

        let block = self.block_addr(addr);
        match self.mshrs.enqueue(block, target, now) {
            MshrOutcome::Allocated => {
                self.stats.misses += 1;
                AccessResult::MissAllocated { coalesced: false }
            }
            MshrOutcome::Coalesced => {
                self.stats.misses += 1;
                self.stats.mshr_hits += 1;
                AccessResult::MissAllocated { coalesced: true }
            }
            MshrOutcome::Full(target) => {
                self.stats.rejected += 1;
                AccessResult::MissRejected(target)
            }
        }
    }

    /// Installs the block containing `addr` without touching the MSHRs.
    ///
    /// Picks the lowest invalid way, otherwise asks the replacement policy. Returns
    /// the evicted victim, if any.
    pub fn install(&mut self, addr: u64, dirty: bool, now: Tick) -> Option<Eviction> {
        let (set, tag) = self.index(addr);
        let base = set * self.ways;

        if let Some(way) = self.find_way(set, tag) {
            let line = &mut self.lines[base + way];
            line.dirty |= dirty;
            line.last_access_tick = now;
            self.policy.update(set, way, now);
            return None;
        }

        let way = self.lines[base..base + self.ways]
            .iter()
            .position(|line| !line.valid)
            .unwrap_or_else(|| self.policy.get_victim(set));

        let victim = self.lines[base + way];
        let evicted = victim.valid.then(|| {
            let victim_block = (victim.tag * self.num_sets as u64 + set as u64) * self.line_bytes;
            Eviction {
                addr: victim_block,
                dirty: victim.dirty,
            }
        });
        if let Some(ev) = evicted {
            self.stats.replacements += 1;
            if ev.dirty {
                self.stats.writebacks += 1;
            }
        }

        self.lines[base + way] = CacheLine {
            tag,
            valid: true,
            dirty,
            last_access_tick: now,
            fill_tick: now,
        };
        self.policy.fill(set, way, now);
        self.stats.fills += 1;
        evicted
    }

    /// The MSHR table, for inspection.
    pub fn mshrs(&self) -> &MshrTable<T> {
        &self.mshrs
    }

    /// Number of valid lines.
    pub fn valid_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.valid).count()
    }
}

impl<T: MissTarget> CacheLevel<T> {
    /// Completes the outstanding miss on the block containing `addr`.
    ///
    /// Installs the block (dirty if any waiting target is a write), releases the
    /// MSHR and returns the waiting targets.
    pub fn fill(&mut self, addr: u64, now: Tick) -> Fill<T> {
        let block = self.block_addr(addr);
        let targets = self.mshrs.release(block);
        let dirty = targets.iter().any(MissTarget::is_write);
        let evicted = self.install(block, dirty, now);
        Fill { targets, evicted }
    }
}
