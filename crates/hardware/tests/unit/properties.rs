//! Property Tests.
//!
//! Randomized checks of the invariants everything else relies on:
//! 1. Events fire in `(tick, priority, insertion)` order.
//! 2. LRU evicts the way with the oldest access, lowest untouched way first.
//! 3. MSHR occupancy never exceeds its capacity and accepted misses always complete.
//! 4. A squash at an arbitrary point never changes the architectural result.

use o3sim_core::config::Config;
use o3sim_core::core::units::cache::policies::{LruPolicy, ReplacementPolicy};
use o3sim_core::sim::EventQueue;
use o3sim_core::soc::memory::SendStatus;
use proptest::prelude::*;

use crate::common::harness::{TestContext, countdown_loop};
use crate::common::mocks::memory::{RecordingHost, load_req};

type Fired = Vec<usize>;

proptest! {
    #[test]
    fn events_fire_in_tick_priority_insertion_order(
        events in prop::collection::vec((0u64..40, -3i32..3), 1..60)
    ) {
        let mut queue: EventQueue<Fired> = EventQueue::new();
        for (i, &(tick, prio)) in events.iter().enumerate() {
            let _ = queue.schedule(tick, prio, move |log: &mut Fired, _| log.push(i)).unwrap();
        }

        let mut fired = Vec::new();
        while queue.advance(&mut fired).is_ok() {}

        let mut expected: Vec<usize> = (0..events.len()).collect();
        expected.sort_by_key(|&i| (events[i].0, events[i].1, i));
        prop_assert_eq!(fired, expected);
    }

    #[test]
    fn lru_victim_is_the_least_recently_touched_way(
        ways in 2usize..9,
        touches in prop::collection::vec(0usize..8, 0..40)
    ) {
        let mut lru = LruPolicy::new(1, ways);
        let mut stamps = vec![0u64; ways];
        for (i, &way) in touches.iter().enumerate() {
            let way = way % ways;
            let tick = i as u64 + 1;
            lru.update(0, way, tick);
            stamps[way] = tick;
        }

        let expected = (0..ways).min_by_key(|&w| (stamps[w], w)).unwrap();
        prop_assert_eq!(lru.get_victim(0), expected);
    }

    #[test]
    fn mshr_occupancy_is_bounded(
        blocks in prop::collection::vec(0u64..12, 1..24)
    ) {
        let config = Config::default();
        let capacity = config.l1d.mshrs;
        let (mut host, mut queue) = RecordingHost::new(&config);

        let mut accepted = 0;
        for (seq, &block) in blocks.iter().enumerate() {
            match host.memory.send(load_req(0, block * 64, seq as u64), &mut queue) {
                SendStatus::Miss | SendStatus::Hit => accepted += 1,
                SendStatus::Rejected => {}
                SendStatus::OutOfRange => prop_assert!(false, "address in range"),
            }
            prop_assert!(host.memory.cpus[0].l1d.mshrs().outstanding() <= capacity);
        }

        while queue.advance(&mut host).is_ok() {
            prop_assert!(host.memory.cpus[0].l1d.mshrs().outstanding() <= capacity);
        }
        prop_assert_eq!(host.delivered.len(), accepted);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn arbitrary_squash_preserves_the_result(steps in 0usize..600, pick in any::<prop::sample::Index>()) {
        let mut tc = TestContext::new(countdown_loop(6));
        for _ in 0..steps {
            if tc.cpu().all_exited() {
                break;
            }
            let _ = tc.step();
        }

        if !tc.cpu().all_exited() {
            let in_flight: Vec<u64> = tc.cpu().insts.keys().copied().collect();
            let cut = if in_flight.is_empty() { 0 } else { in_flight[pick.index(in_flight.len())] };
            tc.cpu_mut().squash(0, cut);
        }

        let report = tc.run();
        prop_assert_eq!(report.exit_code, Some(18));
        prop_assert_eq!(tc.reg(0, 1), 0);
        prop_assert_eq!(tc.reg(0, 2), 18);
        prop_assert!(tc.cpu().insts.is_empty());
        prop_assert_eq!(tc.cpu().regs.free_count(), tc.sim.config().pipeline.phys_regs - 32);
    }
}
