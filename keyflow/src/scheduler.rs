//! Fixed-size deferred callback table.
//!
//! Callers schedule a payload to come due after a delay and get back a
//! [`TimerToken`]. Tokens are generation-counted: once a slot is cancelled or
//! fires, tokens from its earlier lives are dead, so a stale cancel can never
//! kill a newer timer reusing the slot.

use embassy_time::{Duration, Instant};

/// Handle to one scheduled entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerToken {
    slot: u8,
    generation: u16,
}

#[derive(Clone, Copy, Debug)]
struct Entry<P> {
    deadline: Instant,
    generation: u16,
    payload: P,
}

/// A table of up to `N` pending deferred payloads.
pub struct DeferredScheduler<P, const N: usize> {
    slots: [Option<Entry<P>>; N],
    // Last generation handed out per slot, bumped on every reuse
    generations: [u16; N],
}

impl<P: Copy, const N: usize> Default for DeferredScheduler<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy, const N: usize> DeferredScheduler<P, N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; N],
            generations: [0; N],
        }
    }

    /// Schedule `payload` to come due `delay` after `now`. Returns `None` and
    /// drops the request when the table is full.
    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: P) -> Option<TimerToken> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                let generation = self.generations[i].wrapping_add(1);
                self.generations[i] = generation;
                *slot = Some(Entry {
                    deadline: now + delay,
                    generation,
                    payload,
                });
                return Some(TimerToken {
                    slot: i as u8,
                    generation,
                });
            }
        }
        error!("deferred callback table is full, dropping a timer request");
        None
    }

    /// Cancel the entry behind `token`. Returns whether a live entry was
    /// removed; a token from a slot's earlier life is a no-op.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let slot = &mut self.slots[token.slot as usize];
        match slot {
            Some(entry) if entry.generation == token.generation => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Whether `token` still refers to a scheduled entry.
    pub fn is_pending(&self, token: TimerToken) -> bool {
        matches!(&self.slots[token.slot as usize], Some(entry) if entry.generation == token.generation)
    }

    /// Remove and return the payload of the earliest entry due at `now`.
    /// Call in a loop to drain everything due.
    pub fn pop_due(&mut self, now: Instant) -> Option<P> {
        let due = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|entry| (i, entry.deadline)))
            .filter(|(_, deadline)| *deadline <= now)
            .min_by_key(|(_, deadline)| *deadline)
            .map(|(i, _)| i)?;
        let entry = self.slots[due].take();
        entry.map(|entry| entry.payload)
    }

    /// The earliest deadline over all pending entries.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(|entry| entry.deadline).min()
    }
}
