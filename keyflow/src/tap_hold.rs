//! Tap-hold resolution with chord awareness.
//!
//! A dual-role key press opens a decision that is settled by one of: the key's
//! own release (tap), the tapping term elapsing (hold), or another key event
//! arriving while the decision is open. Interposed events go through the chord
//! rules: a same-hand press forces the tap interpretation, while cross-hand
//! and thumb chords keep the hold reachable and may settle it early.
//!
//! At most one decision is open at a time. A second dual-role press while one
//! is open settles the first, so every press is resolved exactly once, in
//! press order.

use embassy_time::Instant;
use heapless::Vec;
use keyflow_types::action::{Action, KeyAction};
use keyflow_types::modifier::ModifierCombination;

use crate::TAP_HOLD_BUFFER_SIZE;
use crate::config::{ChordHoldConfig, KeyProfile};
use crate::event::KeyboardEvent;

/// Upper bound of steps one event can produce: a commit plus a drained buffer
pub(crate) const RESOLVER_STEPS: usize = TAP_HOLD_BUFFER_SIZE + 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapHoldResolution {
    Tap,
    Hold,
}

/// A settled tap-hold decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedTapHold {
    /// The press event that opened the decision
    pub event: KeyboardEvent,
    pub tap: Action,
    pub hold: Action,
    pub resolution: TapHoldResolution,
}

impl ResolvedTapHold {
    /// The action the decision settled on.
    pub fn action(&self) -> Action {
        match self.resolution {
            TapHoldResolution::Tap => self.tap,
            TapHoldResolution::Hold => self.hold,
        }
    }
}

/// One consequence of feeding an event (or the clock) to the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverStep {
    /// A decision settled, execute its action
    Commit(ResolvedTapHold),
    /// A held-back event, run it through dispatch again
    Flush(KeyboardEvent),
}

/// What dispatch should do with the event it just handed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventDisposition {
    /// Execute the event's own action
    Execute,
    /// Resolver state changed underneath the event, run it through dispatch again
    Redispatch,
    /// The resolver holds the event back
    Buffered,
    /// The resolver consumed the event
    Consumed,
}

pub struct ResolverVerdict {
    /// Consequences to apply, in order, before handling `current`
    pub steps: Vec<ResolverStep, RESOLVER_STEPS>,
    pub current: EventDisposition,
}

impl ResolverVerdict {
    fn current(current: EventDisposition) -> Self {
        Self {
            steps: Vec::new(),
            current,
        }
    }
}

struct PendingTapHold {
    event: KeyboardEvent,
    tap: Action,
    hold: Action,
    profile: KeyProfile,
    hold_deadline: Instant,
    chord_deadline: Instant,
    /// The designated multi-behavior key skips the chord rules
    chord_exempt: bool,
    /// Chord window elapsed, the decision no longer gates other keys
    expired: bool,
}

/// The tap-hold resolver. One decision slot plus the hold-back buffer.
#[derive(Default)]
pub struct TapHoldResolver {
    pending: Option<PendingTapHold>,
    buffer: Vec<KeyboardEvent, TAP_HOLD_BUFFER_SIZE>,
}

impl TapHoldResolver {
    pub fn new() -> Self {
        Self {
            pending: None,
            buffer: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The modifiers an open decision would register if it settles as hold.
    /// Used to treat physically held but unresolved home-row mods as active.
    pub fn pending_hold_modifiers(&self) -> ModifierCombination {
        match &self.pending {
            Some(pending) => match pending.hold {
                Action::Modifier(m) => m,
                _ => ModifierCombination::new(),
            },
            None => ModifierCombination::new(),
        }
    }

    /// Feed one key event. `action` is the keymap action at the event's
    /// position, `profile` its timing profile and `quick_tap` whether the
    /// press falls in the quick-tap window of its own last tap.
    pub fn handle(
        &mut self,
        event: KeyboardEvent,
        action: KeyAction,
        profile: KeyProfile,
        chord: &ChordHoldConfig,
        chord_exempt: bool,
        quick_tap: bool,
    ) -> ResolverVerdict {
        if event.pressed {
            self.handle_press(event, action, profile, chord, chord_exempt, quick_tap)
        } else {
            self.handle_release(event)
        }
    }

    fn handle_press(
        &mut self,
        event: KeyboardEvent,
        action: KeyAction,
        profile: KeyProfile,
        chord: &ChordHoldConfig,
        chord_exempt: bool,
        quick_tap: bool,
    ) -> ResolverVerdict {
        let Some(pending) = self.pending.as_ref() else {
            let KeyAction::TapHold(tap, hold) = action else {
                return ResolverVerdict::current(EventDisposition::Execute);
            };
            if quick_tap {
                // Repeat the tap without opening a new decision
                let mut steps = Vec::new();
                let _ = steps.push(ResolverStep::Commit(ResolvedTapHold {
                    event,
                    tap,
                    hold,
                    resolution: TapHoldResolution::Tap,
                }));
                return ResolverVerdict {
                    steps,
                    current: EventDisposition::Consumed,
                };
            }
            debug!("tap-hold decision opened at {:?}", event.pos);
            self.pending = Some(PendingTapHold {
                event,
                tap,
                hold,
                profile,
                hold_deadline: event.timestamp + profile.tapping_term,
                chord_deadline: event.timestamp + chord.timeout,
                chord_exempt,
                expired: false,
            });
            return ResolverVerdict::current(EventDisposition::Consumed);
        };

        if pending.expired {
            if action.is_tap_hold() {
                // A stale decision can't keep the slot once another dual-role
                // key needs it. Held this long, it settles as hold.
                return ResolverVerdict {
                    steps: self.commit(TapHoldResolution::Hold),
                    current: EventDisposition::Redispatch,
                };
            }
            return ResolverVerdict::current(EventDisposition::Execute);
        }

        if pending.chord_exempt {
            if pending.profile.hold_on_other_press {
                return ResolverVerdict {
                    steps: self.commit(TapHoldResolution::Hold),
                    current: EventDisposition::Redispatch,
                };
            }
            return self.hold_back(event);
        }

        let is_chord = match (pending.event.pos.key(), event.pos.key()) {
            (Some(held), Some(other)) => chord.is_chord(held, other),
            // Encoder events never gate a decision
            _ => true,
        };

        if !is_chord {
            // Same-hand rollover, the held key was a tap all along
            return ResolverVerdict {
                steps: self.commit(TapHoldResolution::Tap),
                current: EventDisposition::Redispatch,
            };
        }

        if action.is_tap_hold() {
            // A second dual-role press settles the first as hold and takes the slot
            return ResolverVerdict {
                steps: self.commit(TapHoldResolution::Hold),
                current: EventDisposition::Redispatch,
            };
        }

        if pending.profile.hold_on_other_press || Self::is_eager_press(action, chord) {
            return ResolverVerdict {
                steps: self.commit(TapHoldResolution::Hold),
                current: EventDisposition::Redispatch,
            };
        }

        if pending.profile.permissive_hold {
            return self.hold_back(event);
        }

        // Default flow: the key processes now, the decision stays open
        ResolverVerdict::current(EventDisposition::Execute)
    }

    fn handle_release(&mut self, event: KeyboardEvent) -> ResolverVerdict {
        let Some(pending) = self.pending.as_ref() else {
            return ResolverVerdict::current(EventDisposition::Execute);
        };

        if pending.event.pos == event.pos {
            // Released within the tapping term: tap
            return ResolverVerdict {
                steps: self.commit(TapHoldResolution::Tap),
                current: EventDisposition::Redispatch,
            };
        }

        if self.buffer.iter().any(|e| e.pos == event.pos && e.pressed) {
            if !pending.expired && pending.profile.permissive_hold {
                // A full press-release nested inside the decision: hold
                return ResolverVerdict {
                    steps: self.commit(TapHoldResolution::Hold),
                    current: EventDisposition::Redispatch,
                };
            }
            return self.hold_back(event);
        }

        ResolverVerdict::current(EventDisposition::Execute)
    }

    /// Advance the clock. Settles the decision at the tapping term and lets
    /// the chord window lapse at its timeout.
    pub fn tick(&mut self, now: Instant) -> Vec<ResolverStep, RESOLVER_STEPS> {
        let (hold_due, chord_lapsed) = match &self.pending {
            Some(pending) => (
                now >= pending.hold_deadline,
                !pending.expired && now >= pending.chord_deadline,
            ),
            None => return Vec::new(),
        };
        if hold_due {
            return self.commit(TapHoldResolution::Hold);
        }
        if chord_lapsed {
            if let Some(pending) = self.pending.as_mut() {
                debug!("tap-hold chord window lapsed at {:?}", pending.event.pos);
                pending.expired = true;
            }
        }
        Vec::new()
    }

    /// The next instant at which [`tick`](Self::tick) has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| {
            if pending.expired {
                pending.hold_deadline
            } else {
                pending.hold_deadline.min(pending.chord_deadline)
            }
        })
    }

    fn is_eager_press(action: KeyAction, chord: &ChordHoldConfig) -> bool {
        match action {
            KeyAction::Single(Action::Key(key)) => chord.is_eager(key),
            _ => false,
        }
    }

    fn hold_back(&mut self, event: KeyboardEvent) -> ResolverVerdict {
        if self.buffer.push(event).is_err() {
            warn!("tap-hold buffer full, settling the open decision as hold");
            return ResolverVerdict {
                steps: self.commit(TapHoldResolution::Hold),
                current: EventDisposition::Redispatch,
            };
        }
        ResolverVerdict::current(EventDisposition::Buffered)
    }

    /// Settle the open decision and drain the hold-back buffer, in order.
    fn commit(&mut self, resolution: TapHoldResolution) -> Vec<ResolverStep, RESOLVER_STEPS> {
        let mut steps = Vec::new();
        if let Some(pending) = self.pending.take() {
            let _ = steps.push(ResolverStep::Commit(ResolvedTapHold {
                event: pending.event,
                tap: pending.tap,
                hold: pending.hold,
                resolution,
            }));
        }
        for event in self.buffer.iter() {
            let _ = steps.push(ResolverStep::Flush(*event));
        }
        self.buffer.clear();
        steps
    }
}
