//! Timing model of the memory hierarchy.
//!
//! The `MemorySystem` owns every cache level, the crossbars and the memory
//! controller. Requests enter through a CPU's L1I or L1D with `send`; everything
//! after that is a chain of scheduled events:
//! 1. **Hit:** completion delivered at `now + response_latency`.
//! 2. **Primary miss:** forwarded to the CPU's L2 (through its L2 crossbar) after the
//!    L1 tag and data latency. An L2 hit refills the L1 after the L2 response
//!    latency; an L2 miss goes through the system crossbar to the controller after
//!    the L2 tag and data latency.
//! 3. **Fill:** the controller's response installs the block in the L2 and then in
//!    every waiting L1, and every coalesced target completes at the fill tick.
//! 4. **Backpressure:** an L1 without a free MSHR rejects the request back to the
//!    CPU; an L2 without one rejects the forward, which is retried one cycle later
//!    while the L1 MSHR stays allocated.
//!
//! The hierarchy is generic over the `MemoryHost` that owns it so that events can
//! reach it again and hand completed requests back to the requesting CPU.

/// Memory controller implementations.
pub mod controller;

use tracing::trace;

use self::controller::{MemoryController, build_controller};
use crate::common::constants::priority;
use crate::common::data::{AccessType, L1Port};
use crate::common::error::SimError;
use crate::common::units::Tick;
use crate::config::Config;
use crate::core::units::cache::{AccessResult, CacheLevel, CacheStats, MissTarget};
use crate::sim::event::EventQueue;
use crate::soc::interconnect::Crossbar;

/// What a completed request was waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A load of the in-flight instruction with this sequence number.
    Inst(u64),
    /// An instruction block for the given fetch epoch.
    Fetch {
        /// Fetch epoch at request time.
        epoch: u64,
    },
    /// The cache write of a committed store with this sequence number.
    StoreCommit(u64),
}

/// A request entering the hierarchy from a CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRequest {
    /// Unique id, assigned by `MemorySystem::send`.
    pub id: u64,
    /// Requesting CPU.
    pub cpu: usize,
    /// Requesting hardware thread.
    pub thread: usize,
    /// Byte address.
    pub addr: u64,
    /// Fetch, load or store.
    pub kind: AccessType,
    /// Consumer identification, checked by the CPU on delivery.
    pub token: Token,
    /// Tick the request entered the L1.
    pub issued: Tick,
}

impl MemRequest {
    /// Creates a request; `id` and `issued` are filled in by `send`.
    pub fn new(cpu: usize, thread: usize, addr: u64, kind: AccessType, token: Token) -> Self {
        Self {
            id: 0,
            cpu,
            thread,
            addr,
            kind,
            token,
            issued: 0,
        }
    }
}

impl MissTarget for MemRequest {
    fn is_write(&self) -> bool {
        self.kind.is_write()
    }
}

impl MissTarget for L1Port {
    fn is_write(&self) -> bool {
        false
    }
}

/// A completed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemResponse {
    /// The original request.
    pub request: MemRequest,
    /// Completion tick.
    pub completed: Tick,
}

impl MemResponse {
    /// Ticks between entry into the L1 and completion.
    pub fn latency(&self) -> Tick {
        self.completed - self.request.issued
    }
}

/// Immediate classification of a `send`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    /// L1 hit; completion is scheduled.
    Hit,
    /// L1 miss accepted (new or coalesced MSHR target); completion follows the fill.
    Miss,
    /// No MSHR available; nothing was scheduled and the requester must retry.
    Rejected,
    /// Address outside the memory range; nothing was scheduled.
    OutOfRange,
}

/// Owner of a `MemorySystem` that events can reach.
pub trait MemoryHost: Sized + 'static {
    /// The memory system.
    fn memory(&mut self) -> &mut MemorySystem;

    /// Hands a completed request back to its CPU.
    fn deliver(&mut self, response: MemResponse, queue: &mut EventQueue<Self>);
}

/// Private hierarchy of one CPU.
#[derive(Debug)]
pub struct CpuCaches {
    /// Instruction cache.
    pub l1i: CacheLevel<MemRequest>,
    /// Data cache.
    pub l1d: CacheLevel<MemRequest>,
    /// Unified L2; its targets are the L1 ports waiting on a refill.
    pub l2: CacheLevel<L1Port>,
    /// Crossbar between the L1s and the L2.
    pub l2_xbar: Crossbar,
}

impl CpuCaches {
    fn l1(&mut self, port: L1Port) -> &mut CacheLevel<MemRequest> {
        match port {
            L1Port::Inst => &mut self.l1i,
            L1Port::Data => &mut self.l1d,
        }
    }
}

/// Hierarchy-wide counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemStats {
    /// Requests accepted from CPUs.
    pub requests: u64,
    /// Requests rejected back to CPUs.
    pub rejected: u64,
    /// Responses delivered to CPUs.
    pub responses: u64,
    /// L1-to-L2 forwards retried because the L2 had no free MSHR.
    pub forward_retries: u64,
}

/// The whole memory hierarchy.
pub struct MemorySystem {
    period: Tick,
    memory_bytes: u64,
    /// Per-CPU private caches.
    pub cpus: Vec<CpuCaches>,
    /// Crossbar between the L2s and the controller.
    pub system_xbar: Crossbar,
    controller: Box<dyn MemoryController>,
    next_id: u64,
    /// Request and retry counters.
    pub stats: MemStats,
}

impl std::fmt::Debug for MemorySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySystem")
            .field("cpus", &self.cpus.len())
            .field("controller", &self.controller.name())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl MemorySystem {
    /// Builds private caches for `config.cpu_count` CPUs, the system crossbar and
    /// the configured controller.
    pub fn new(config: &Config) -> Result<Self, SimError> {
        let period = config.clock_period()?;
        let memory_bytes = config.memory_bytes()?;
        let cpus = (0..config.cpu_count)
            .map(|cpu| -> Result<CpuCaches, SimError> {
                Ok(CpuCaches {
                    l1i: CacheLevel::new(format!("cpu{cpu}.l1i"), &config.l1i)?,
                    l1d: CacheLevel::new(format!("cpu{cpu}.l1d"), &config.l1d)?,
                    l2: CacheLevel::new(format!("cpu{cpu}.l2"), &config.l2)?,
                    l2_xbar: Crossbar::new(
                        format!("cpu{cpu}.l2bus"),
                        config.interconnect.l2_xbar_latency,
                    ),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            period,
            memory_bytes,
            cpus,
            system_xbar: Crossbar::new("membus", config.interconnect.system_xbar_latency),
            controller: build_controller(&config.memory),
            next_id: 0,
            stats: MemStats::default(),
        })
    }

    /// Clock period in ticks.
    pub fn period(&self) -> Tick {
        self.period
    }

    /// Size of the memory range in bytes.
    pub fn memory_bytes(&self) -> u64 {
        self.memory_bytes
    }

    /// The memory controller.
    pub fn controller(&self) -> &dyn MemoryController {
        self.controller.as_ref()
    }

    /// Statistics of every cache level as `(name, stats)`, CPU by CPU.
    pub fn cache_stats(&self) -> Vec<(String, CacheStats)> {
        self.cpus
            .iter()
            .flat_map(|c| {
                [
                    (c.l1i.name().to_string(), c.l1i.stats),
                    (c.l1d.name().to_string(), c.l1d.stats),
                    (c.l2.name().to_string(), c.l2.stats),
                ]
            })
            .collect()
    }

    /// Presents a request to the CPU's L1 and schedules whatever follows.
    pub fn send<H: MemoryHost>(&mut self, mut req: MemRequest, queue: &mut EventQueue<H>) -> SendStatus {
        if req.addr >= self.memory_bytes {
            return SendStatus::OutOfRange;
        }
        let now = queue.now();
        req.id = self.next_id;
        req.issued = now;

        let period = self.period;
        let port = L1Port::for_access(req.kind);
        let (cpu, addr, kind) = (req.cpu, req.addr, req.kind);
        let l1 = self.cpus[cpu].l1(port);

        match l1.access(addr, kind, now, req) {
            AccessResult::Hit(req) => {
                let delay = l1.response_latency * period;
                let _ = queue.schedule_in(delay, priority::MEM_RESPONSE, move |host: &mut H, q| {
                    complete(host, q, req);
                });
                self.accepted();
                SendStatus::Hit
            }
            AccessResult::MissAllocated { coalesced } => {
                if !coalesced {
                    let delay = l1.lookup_latency() * period;
                    let block = l1.block_addr(addr);
                    trace!(cpu, ?port, block, "L1 miss");
                    schedule_l2_forward(queue, delay, cpu, port, block);
                }
                self.accepted();
                SendStatus::Miss
            }
            AccessResult::MissRejected(_) => {
                self.stats.rejected += 1;
                SendStatus::Rejected
            }
        }
    }

    fn accepted(&mut self) {
        self.next_id += 1;
        self.stats.requests += 1;
    }
}

fn complete<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, request: MemRequest) {
    host.memory().stats.responses += 1;
    let response = MemResponse {
        request,
        completed: queue.now(),
    };
    host.deliver(response, queue);
}

fn schedule_l2_forward<H: MemoryHost>(queue: &mut EventQueue<H>, delay: Tick, cpu: usize, port: L1Port, block: u64) {
    let prio = priority::MEM_FORWARD + port.requester_id() as i32;
    let _ = queue.schedule_in(delay, prio, move |host: &mut H, q| {
        cross_l2_xbar(host, q, cpu, port, block);
    });
}

fn cross_l2_xbar<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, cpu: usize, port: L1Port, block: u64) {
    let mem = host.memory();
    let wait = mem.cpus[cpu].l2_xbar.grant(queue.now()) * mem.period;
    if wait == 0 {
        l2_access(host, queue, cpu, port, block);
    } else {
        let prio = priority::MEM_FORWARD + port.requester_id() as i32;
        let _ = queue.schedule_in(wait, prio, move |host: &mut H, q| {
            l2_access(host, q, cpu, port, block);
        });
    }
}

fn l2_access<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, cpu: usize, port: L1Port, block: u64) {
    let now = queue.now();
    let mem = host.memory();
    let period = mem.period;
    let l2 = &mut mem.cpus[cpu].l2;

    match l2.access(block, AccessType::Load, now, port) {
        AccessResult::Hit(port) => {
            let delay = l2.response_latency * period;
            let _ = queue.schedule_in(delay, priority::MEM_RESPONSE, move |host: &mut H, q| {
                fill_l1(host, q, cpu, port, block);
            });
        }
        AccessResult::MissAllocated { coalesced: false } => {
            let delay = l2.lookup_latency() * period;
            trace!(cpu, block, "L2 miss");
            let _ = queue.schedule_in(delay, priority::MEM_FORWARD + cpu as i32, move |host: &mut H, q| {
                cross_system_xbar(host, q, cpu, block);
            });
        }
        AccessResult::MissAllocated { coalesced: true } => {}
        AccessResult::MissRejected(port) => {
            mem.stats.forward_retries += 1;
            let prio = priority::MEM_FORWARD + port.requester_id() as i32;
            let _ = queue.schedule_in(period, prio, move |host: &mut H, q| {
                l2_access(host, q, cpu, port, block);
            });
        }
    }
}

fn cross_system_xbar<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, cpu: usize, block: u64) {
    let mem = host.memory();
    let wait = mem.system_xbar.grant(queue.now()) * mem.period;
    if wait == 0 {
        controller_access(host, queue, cpu, block);
    } else {
        let _ = queue.schedule_in(wait, priority::MEM_FORWARD + cpu as i32, move |host: &mut H, q| {
            controller_access(host, q, cpu, block);
        });
    }
}

fn controller_access<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, cpu: usize, block: u64) {
    let mem = host.memory();
    let delay = mem.controller.access_latency(block) * mem.period;
    let _ = queue.schedule_in(delay, priority::MEM_RESPONSE, move |host: &mut H, q| {
        fill_l2(host, q, cpu, block);
    });
}

fn fill_l2<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, cpu: usize, block: u64) {
    let fill = host.memory().cpus[cpu].l2.fill(block, queue.now());
    for port in fill.targets {
        fill_l1(host, queue, cpu, port, block);
    }
}

fn fill_l1<H: MemoryHost>(host: &mut H, queue: &mut EventQueue<H>, cpu: usize, port: L1Port, block: u64) {
    let fill = host.memory().cpus[cpu].l1(port).fill(block, queue.now());
    for request in fill.targets {
        complete(host, queue, request);
    }
}
