//! Discrete-event scheduler.
//!
//! The event queue owns the simulation clock. Every timed action in the simulator
//! (per-cycle CPU evaluation, cache forwards and fills, memory completions, interrupt
//! delivery) is a closure scheduled here. It provides:
//! 1. **Scheduling:** `schedule` at an absolute tick with a priority; the past is rejected.
//! 2. **Cancellation:** `cancel` marks a pending event dead; repeated calls are no-ops.
//! 3. **Advancing:** `advance` fires the earliest live event and moves the clock to it.
//!
//! Ordering is total and deterministic: `(tick, priority, insertion order)`, so two runs
//! with the same inputs fire the same events in the same order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;

use crate::common::error::SimError;
use crate::common::units::Tick;

/// Closure run when an event fires. It receives the simulation context and the queue
/// itself so it can schedule follow-up events.
pub type EventAction<C> = Box<dyn FnOnce(&mut C, &mut EventQueue<C>)>;

/// Handle to a scheduled event, used for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

struct ScheduledEvent<C> {
    tick: Tick,
    priority: i32,
    seq: u64,
    action: EventAction<C>,
}

impl<C> ScheduledEvent<C> {
    #[inline]
    fn key(&self) -> (Tick, i32, u64) {
        (self.tick, self.priority, self.seq)
    }
}

impl<C> PartialEq for ScheduledEvent<C> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<C> Eq for ScheduledEvent<C> {}

impl<C> PartialOrd for ScheduledEvent<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for ScheduledEvent<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the earliest key on top.
        other.key().cmp(&self.key())
    }
}

/// Global event queue and simulation clock.
pub struct EventQueue<C> {
    heap: BinaryHeap<ScheduledEvent<C>>,
    /// Sequence numbers scheduled but neither fired nor cancelled.
    pending: HashSet<u64>,
    /// Sequence numbers cancelled while still in the heap.
    cancelled: HashSet<u64>,
    now: Tick,
    next_seq: u64,
    fired: u64,
}

impl<C> Default for EventQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("now", &self.now)
            .field("pending", &self.pending.len())
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}

impl<C> EventQueue<C> {
    /// Creates an empty queue with the clock at tick 0.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            cancelled: HashSet::new(),
            now: 0,
            next_seq: 0,
            fired: 0,
        }
    }

    /// Current simulation tick.
    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Number of live (scheduled, not yet fired, not cancelled) events.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no live events remain.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total events fired so far.
    #[inline]
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Schedules `action` to run at absolute `tick`.
    ///
    /// Lower `priority` values fire first among events at the same tick; equal
    /// priorities fire in insertion order.
    pub fn schedule<F>(&mut self, tick: Tick, priority: i32, action: F) -> Result<EventHandle, SimError>
    where
        F: FnOnce(&mut C, &mut EventQueue<C>) + 'static,
    {
        if tick < self.now {
            return Err(SimError::InvalidSchedule { tick, now: self.now });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent {
            tick,
            priority,
            seq,
            action: Box::new(action),
        });
        let _ = self.pending.insert(seq);
        Ok(EventHandle(seq))
    }

    /// Schedules `action` to run `delay` ticks from now. Never fails.
    pub fn schedule_in<F>(&mut self, delay: Tick, priority: i32, action: F) -> EventHandle
    where
        F: FnOnce(&mut C, &mut EventQueue<C>) + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent {
            tick: self.now.saturating_add(delay),
            priority,
            seq,
            action: Box::new(action),
        });
        let _ = self.pending.insert(seq);
        EventHandle(seq)
    }

    /// Cancels a pending event.
    ///
    /// Returns true if this call cancelled it; false if it had already fired or been
    /// cancelled. The event stays in the heap and is discarded when it surfaces.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        if self.pending.remove(&handle.0) {
            let _ = self.cancelled.insert(handle.0);
            true
        } else {
            false
        }
    }

    /// Returns true if the event is still waiting to fire.
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.pending.contains(&handle.0)
    }

    /// Tick of the earliest live event, discarding cancelled events at the head.
    pub fn peek_tick(&mut self) -> Option<Tick> {
        while let Some(top) = self.heap.peek() {
            if self.cancelled.contains(&top.seq) {
                let seq = top.seq;
                let _ = self.heap.pop();
                let _ = self.cancelled.remove(&seq);
            } else {
                return Some(top.tick);
            }
        }
        None
    }

    /// Fires the earliest live event.
    ///
    /// The clock moves to the event's tick before its action runs. Returns that tick,
    /// or `SimError::EmptyQueue` if nothing is left to fire.
    pub fn advance(&mut self, ctx: &mut C) -> Result<Tick, SimError> {
        while let Some(event) = self.heap.pop() {
            if self.cancelled.remove(&event.seq) {
                continue;
            }
            let _ = self.pending.remove(&event.seq);
            self.now = event.tick;
            self.fired += 1;
            (event.action)(ctx, self);
            return Ok(event.tick);
        }
        Err(SimError::EmptyQueue(self.now))
    }
}
