//! Memory Hierarchy Unit Tests.
//!
//! Drives the cache hierarchy through `MemorySystem::send` without a CPU:
//! 1. Miss latency is the sum of the lookup latencies and the controller latency.
//! 2. MSHR exhaustion rejects the request, which succeeds once a fill frees an entry.
//! 3. Crossbars only cost time when two requests arrive in the same tick.
//! 4. Stores dirty lines and same-block loads coalesce into one MSHR.

use o3sim_core::common::data::AccessType;
use o3sim_core::config::{CacheConfig, Config, MemoryController};
use o3sim_core::soc::memory::{MemRequest, SendStatus, Token};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::mocks::memory::{RecordingHost, load_req};

fn fetch_req(addr: u64) -> MemRequest {
    MemRequest::new(0, 0, addr, AccessType::Fetch, Token::Fetch { epoch: 0 })
}

// ══════════════════════════════════════════════════════════
// 1. Latency composition
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::default_machine(Config::default(), 72_000)]
#[case::fast_l2(Config { l2: CacheConfig::new("256kB", 8, 5, 16, 20), ..Config::default() }, 62_000)]
#[case::two_ghz(Config { clock: "2GHz".into(), ..Config::default() }, 36_000)]
#[case::slow_dram({
    let mut c = Config::default();
    c.memory.latency = 100;
    c
}, 122_000)]
fn cold_miss_costs_every_level(#[case] config: Config, #[case] expected: u64) {
    let (mut host, mut queue) = RecordingHost::new(&config);

    assert_eq!(host.memory.send(load_req(0, 0x4_0000, 1), &mut queue), SendStatus::Miss);
    host.drain(&mut queue);

    let response = host.response(1).unwrap();
    assert_eq!(response.latency(), expected);
    assert_eq!(response.completed, expected);
}

#[test]
fn warm_hit_costs_the_l1_response_latency() {
    let (mut host, mut queue) = RecordingHost::new(&Config::default());
    let _ = host.memory.send(load_req(0, 0x4_0000, 1), &mut queue);
    host.drain(&mut queue);

    assert_eq!(host.memory.send(load_req(0, 0x4_0008, 2), &mut queue), SendStatus::Hit);
    host.drain(&mut queue);

    assert_eq!(host.response(2).unwrap().latency(), 1_000);
    let l1d = &host.memory.cpus[0].l1d.stats;
    assert_eq!((l1d.hits, l1d.misses), (1, 1));
}

#[test]
fn l1i_miss_that_hits_the_l2_skips_memory() {
    let (mut host, mut queue) = RecordingHost::new(&Config::default());
    let _ = host.memory.send(load_req(0, 0x4_0000, 1), &mut queue);
    host.drain(&mut queue);
    let start = queue.now();

    assert_eq!(host.memory.send(fetch_req(0x4_0000), &mut queue), SendStatus::Miss);
    host.drain(&mut queue);

    let fetch = host
        .delivered
        .iter()
        .find(|r| r.request.kind == AccessType::Fetch)
        .unwrap();
    // L1I tag+data (2) then L2 response (10).
    assert_eq!(fetch.completed - start, 12_000);
    assert_eq!(host.memory.cpus[0].l2.stats.hits, 1);
    assert_eq!(host.memory.controller().accesses(), 1);
}

#[test]
fn dram_row_hits_are_cheaper_than_row_opens() {
    let mut config = Config::default();
    config.memory.controller = MemoryController::Dram;
    let (mut host, mut queue) = RecordingHost::new(&config);

    let _ = host.memory.send(load_req(0, 0x4_0000, 1), &mut queue);
    host.drain(&mut queue);
    // Different block, same 2kB row.
    let _ = host.memory.send(load_req(0, 0x4_0040, 2), &mut queue);
    host.drain(&mut queue);

    // 2 + 20 + (tRAS + tCAS) for the first, 2 + 20 + tCAS for the row hit.
    assert_eq!(host.response(1).unwrap().latency(), 50_000);
    assert_eq!(host.response(2).unwrap().latency(), 36_000);
    assert_eq!(host.memory.controller().name(), "dram");
}

#[test]
fn addresses_beyond_memory_are_out_of_range() {
    let config = Config {
        memory_size: "1MiB".into(),
        ..Config::default()
    };
    let (mut host, mut queue) = RecordingHost::new(&config);

    assert_eq!(
        host.memory.send(load_req(0, 1 << 20, 1), &mut queue),
        SendStatus::OutOfRange
    );
    assert!(queue.is_empty());
    assert_eq!(host.memory.stats.requests, 0);
}

// ══════════════════════════════════════════════════════════
// 2. MSHR backpressure
// ══════════════════════════════════════════════════════════

#[test]
fn fifth_distinct_miss_is_rejected_then_retried() {
    let (mut host, mut queue) = RecordingHost::new(&Config::default());
    let blocks: Vec<u64> = (0..5).map(|i| 0x10_0000 + i * 0x1000).collect();

    for (seq, &addr) in blocks.iter().take(4).enumerate() {
        assert_eq!(
            host.memory.send(load_req(0, addr, seq as u64), &mut queue),
            SendStatus::Miss
        );
    }
    assert_eq!(
        host.memory.send(load_req(0, blocks[4], 4), &mut queue),
        SendStatus::Rejected
    );
    assert_eq!(host.memory.cpus[0].l1d.mshrs().outstanding(), 4);
    assert_eq!(host.memory.cpus[0].l1d.stats.rejected, 1);
    assert_eq!(host.memory.stats.rejected, 1);

    host.drain(&mut queue);
    assert_eq!(host.delivered.len(), 4);
    assert_eq!(host.memory.cpus[0].l1d.mshrs().outstanding(), 0);

    assert_eq!(
        host.memory.send(load_req(0, blocks[4], 4), &mut queue),
        SendStatus::Miss
    );
    host.drain(&mut queue);
    assert_eq!(host.response(4).unwrap().latency(), 72_000);
}

#[test]
fn same_block_loads_coalesce_up_to_the_target_limit() {
    let config = Config {
        l1d: CacheConfig::new("64kB", 2, 1, 4, 2),
        ..Config::default()
    };
    let (mut host, mut queue) = RecordingHost::new(&config);

    assert_eq!(host.memory.send(load_req(0, 0x8000, 1), &mut queue), SendStatus::Miss);
    assert_eq!(host.memory.send(load_req(0, 0x8008, 2), &mut queue), SendStatus::Miss);
    assert_eq!(
        host.memory.send(load_req(0, 0x8010, 3), &mut queue),
        SendStatus::Rejected
    );
    assert_eq!(host.memory.cpus[0].l1d.mshrs().outstanding(), 1);
    assert_eq!(host.memory.cpus[0].l1d.stats.mshr_hits, 1);

    host.drain(&mut queue);
    let (a, b) = (host.response(1).unwrap(), host.response(2).unwrap());
    assert_eq!(a.completed, b.completed);
    assert_eq!(host.memory.controller().accesses(), 1);
}

#[test]
fn store_hit_dirties_the_line() {
    let (mut host, mut queue) = RecordingHost::new(&Config::default());
    let _ = host.memory.send(load_req(0, 0x2000, 1), &mut queue);
    host.drain(&mut queue);

    let store = MemRequest::new(0, 0, 0x2000, AccessType::Store, Token::StoreCommit(2));
    assert_eq!(host.memory.send(store, &mut queue), SendStatus::Hit);
    host.drain(&mut queue);

    let line = host.memory.cpus[0].l1d.line(0x2000).unwrap();
    assert!(line.valid);
    assert!(line.dirty);
}

// ══════════════════════════════════════════════════════════
// 3. Crossbar contention
// ══════════════════════════════════════════════════════════

#[test]
fn uncontended_crossbars_add_no_delay() {
    let (mut host, mut queue) = RecordingHost::new(&Config::default());
    let _ = host.memory.send(load_req(0, 0x4_0000, 1), &mut queue);
    host.drain(&mut queue);

    assert_eq!(host.memory.system_xbar.stats.grants, 1);
    assert_eq!(host.memory.system_xbar.stats.contended, 0);
    assert_eq!(host.memory.cpus[0].l2_xbar.stats.wait_cycles, 0);
}

#[test]
fn two_cpus_missing_together_serialize_on_the_system_crossbar() {
    let config = Config {
        cpu_count: 2,
        ..Config::default()
    };
    let (mut host, mut queue) = RecordingHost::new(&config);

    let _ = host.memory.send(load_req(0, 0x4_0000, 1), &mut queue);
    let _ = host.memory.send(load_req(1, 0x4_0000, 2), &mut queue);
    host.drain(&mut queue);

    // The lower CPU id is granted first; the other waits one crossbar cycle.
    assert_eq!(host.response(1).unwrap().latency(), 72_000);
    assert_eq!(host.response(2).unwrap().latency(), 73_000);
    assert_eq!(host.memory.system_xbar.stats.contended, 1);
    assert_eq!(host.memory.system_xbar.stats.wait_cycles, 1);
}

#[test]
fn instruction_side_wins_the_l2_crossbar() {
    let (mut host, mut queue) = RecordingHost::new(&Config::default());

    let _ = host.memory.send(fetch_req(0x1_0000), &mut queue);
    let _ = host.memory.send(load_req(0, 0x4_0000, 1), &mut queue);
    host.drain(&mut queue);

    let fetch = host
        .delivered
        .iter()
        .find(|r| r.request.kind == AccessType::Fetch)
        .unwrap();
    assert_eq!(fetch.latency(), 72_000);
    assert_eq!(host.response(1).unwrap().latency(), 73_000);
    assert_eq!(host.memory.cpus[0].l2_xbar.stats.contended, 1);
}
