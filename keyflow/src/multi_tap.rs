//! The designated multi-behavior key.
//!
//! One physical key (backspace on the reference board) carries four
//! behaviors, picked by the modifier state and the recent tap rhythm:
//!
//! - with a word modifier held: one whole-word delete, modifiers cleared
//!   around the emitted chord and restored byte-for-byte afterwards
//! - with shift held: forward delete for as long as the key is held
//! - three taps in quick succession: after a short grace period the key
//!   promotes to an autorepeating backspace
//! - otherwise: ordinary dispatch, including its own tap-hold layer
//!
//! Modifier checks use the effective state: modifiers already registered
//! plus the hold side of a still-unresolved dual-role key that is physically
//! down. The key itself is exempt from chord gating in the tap-hold resolver.

use embassy_time::Instant;

use crate::config::MultiTapConfig;
use crate::hid_state::HidModifiers;
use crate::scheduler::{DeferredScheduler, TimerToken};

/// Deferred payloads owned by the multi-behavior key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MultiTapTimer {
    /// Grace period after the third tap ran out, promote to repeat
    Promote,
    /// One autorepeat interval elapsed
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    /// Shift-delete held, waiting for release to restore modifiers
    ChordDelete,
    /// Third tap seen, promotion scheduled
    TriplePending,
    /// Autorepeat running
    RepeatActive,
}

/// What the engine should emit for a multi-behavior key transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultiTapCommand {
    /// Nothing to emit
    None,
    /// Not handled here, run the event through ordinary dispatch
    PassThrough,
    /// Tap word-delete: ctrl+backspace, or ctrl+delete when `forward`
    WordDelete { forward: bool },
    /// Register delete with the shift bits masked out of the report
    DeleteDown { masked: HidModifiers },
    /// Release delete and restore the modifier snapshot
    DeleteUp { restored: HidModifiers },
    /// Tap one backspace
    TapBackspace,
}

/// State machine of the multi-behavior key.
pub struct MultiTapKey {
    mode: Mode,
    pressed: bool,
    tap_count: u8,
    last_tap: Option<Instant>,
    /// Modifier snapshot taken when shift-delete starts
    saved_mods: HidModifiers,
    promote_token: Option<TimerToken>,
    repeat_token: Option<TimerToken>,
}

impl Default for MultiTapKey {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiTapKey {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Idle,
            pressed: false,
            tap_count: 0,
            last_tap: None,
            saved_mods: HidModifiers::new(),
            promote_token: None,
            repeat_token: None,
        }
    }

    /// Handle a press of the designated key. `modifiers` is the effective
    /// modifier state at press time.
    pub fn on_press<const N: usize>(
        &mut self,
        now: Instant,
        modifiers: HidModifiers,
        config: &MultiTapConfig,
        scheduler: &mut DeferredScheduler<MultiTapTimer, N>,
    ) -> MultiTapCommand {
        self.pressed = true;

        if modifiers.has_ctrl() {
            // Word delete fires on the press edge, the release is a no-op
            return MultiTapCommand::WordDelete {
                forward: modifiers.has_shift(),
            };
        }

        if modifiers.has_shift() {
            self.mode = Mode::ChordDelete;
            self.saved_mods = modifiers;
            return MultiTapCommand::DeleteDown {
                masked: modifiers & !HidModifiers::shift_mask(),
            };
        }

        let in_rhythm = self
            .last_tap
            .is_some_and(|last| now < last + config.triple_term);
        self.tap_count = if in_rhythm { self.tap_count + 1 } else { 1 };
        self.last_tap = Some(now);

        if self.tap_count >= 3 {
            debug!("multi-tap: third tap, scheduling repeat promotion");
            self.mode = Mode::TriplePending;
            if let Some(token) = self.promote_token.take() {
                scheduler.cancel(token);
            }
            self.promote_token = scheduler.schedule(now, config.promote_grace, MultiTapTimer::Promote);
            return MultiTapCommand::None;
        }

        MultiTapCommand::PassThrough
    }

    /// Handle a release of the designated key.
    pub fn on_release<const N: usize>(
        &mut self,
        scheduler: &mut DeferredScheduler<MultiTapTimer, N>,
    ) -> MultiTapCommand {
        self.pressed = false;
        match self.mode {
            Mode::ChordDelete => {
                self.mode = Mode::Idle;
                MultiTapCommand::DeleteUp {
                    restored: self.saved_mods,
                }
            }
            Mode::TriplePending => {
                // Released inside the grace period: the third tap was a
                // plain tap after all
                if let Some(token) = self.promote_token.take() {
                    scheduler.cancel(token);
                }
                self.mode = Mode::Idle;
                self.tap_count = 0;
                MultiTapCommand::TapBackspace
            }
            Mode::RepeatActive => {
                if let Some(token) = self.repeat_token.take() {
                    scheduler.cancel(token);
                }
                self.mode = Mode::Idle;
                self.tap_count = 0;
                MultiTapCommand::None
            }
            Mode::Idle => MultiTapCommand::PassThrough,
        }
    }

    /// Any other key pressed. Cancels a pending promotion; an already
    /// running repeat keeps going until the designated key is released.
    pub fn on_other_press<const N: usize>(&mut self, scheduler: &mut DeferredScheduler<MultiTapTimer, N>) {
        if self.mode == Mode::TriplePending {
            if let Some(token) = self.promote_token.take() {
                scheduler.cancel(token);
            }
            self.mode = Mode::Idle;
            self.tap_count = 0;
        }
    }

    /// A deferred payload came due.
    pub fn on_timer<const N: usize>(
        &mut self,
        timer: MultiTapTimer,
        now: Instant,
        config: &MultiTapConfig,
        scheduler: &mut DeferredScheduler<MultiTapTimer, N>,
    ) -> MultiTapCommand {
        match timer {
            MultiTapTimer::Promote => {
                self.promote_token = None;
                // The key may have been released or the promotion cancelled
                // between scheduling and firing
                if self.mode != Mode::TriplePending || !self.pressed {
                    return MultiTapCommand::None;
                }
                debug!("multi-tap: promoted to autorepeat");
                self.mode = Mode::RepeatActive;
                self.repeat_token = scheduler.schedule(now, config.repeat_interval, MultiTapTimer::Repeat);
                MultiTapCommand::TapBackspace
            }
            MultiTapTimer::Repeat => {
                self.repeat_token = None;
                if self.mode != Mode::RepeatActive || !self.pressed {
                    return MultiTapCommand::None;
                }
                self.repeat_token = scheduler.schedule(now, config.repeat_interval, MultiTapTimer::Repeat);
                MultiTapCommand::TapBackspace
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Init logger for tests
    #[ctor::ctor]
    fn init_log() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn setup() -> (MultiTapKey, DeferredScheduler<MultiTapTimer, 8>, MultiTapConfig) {
        (MultiTapKey::new(), DeferredScheduler::new(), MultiTapConfig::default())
    }

    fn shift() -> HidModifiers {
        HidModifiers::new().with_left_shift(true)
    }

    fn ctrl() -> HidModifiers {
        HidModifiers::new().with_left_ctrl(true)
    }

    #[test]
    fn plain_taps_pass_through() {
        let (mut key, mut scheduler, config) = setup();
        assert_eq!(
            key.on_press(at(0), HidModifiers::new(), &config, &mut scheduler),
            MultiTapCommand::PassThrough
        );
        assert_eq!(key.on_release(&mut scheduler), MultiTapCommand::PassThrough);
    }

    #[test]
    fn word_delete_on_ctrl() {
        let (mut key, mut scheduler, config) = setup();
        assert_eq!(
            key.on_press(at(0), ctrl(), &config, &mut scheduler),
            MultiTapCommand::WordDelete { forward: false }
        );
        assert_eq!(
            key.on_press(at(100), ctrl() | shift(), &config, &mut scheduler),
            MultiTapCommand::WordDelete { forward: true }
        );
    }

    #[test]
    fn shift_delete_restores_snapshot() {
        let (mut key, mut scheduler, config) = setup();
        let mods = shift() | HidModifiers::new().with_left_gui(true);
        let command = key.on_press(at(0), mods, &config, &mut scheduler);
        assert_eq!(
            command,
            MultiTapCommand::DeleteDown {
                masked: HidModifiers::new().with_left_gui(true)
            }
        );
        assert_eq!(key.on_release(&mut scheduler), MultiTapCommand::DeleteUp { restored: mods });
    }

    fn three_taps(
        key: &mut MultiTapKey,
        scheduler: &mut DeferredScheduler<MultiTapTimer, 8>,
        config: &MultiTapConfig,
    ) -> u64 {
        let none = HidModifiers::new();
        assert_eq!(key.on_press(at(0), none, config, scheduler), MultiTapCommand::PassThrough);
        assert_eq!(key.on_release(scheduler), MultiTapCommand::PassThrough);
        assert_eq!(key.on_press(at(100), none, config, scheduler), MultiTapCommand::PassThrough);
        assert_eq!(key.on_release(scheduler), MultiTapCommand::PassThrough);
        // The third tap is suppressed, promotion pending
        assert_eq!(key.on_press(at(200), none, config, scheduler), MultiTapCommand::None);
        200
    }

    #[test]
    fn triple_tap_promotes_after_grace() {
        let (mut key, mut scheduler, config) = setup();
        let third = three_taps(&mut key, &mut scheduler, &config);

        assert_eq!(scheduler.next_deadline(), Some(at(third + 80)));
        assert_eq!(scheduler.pop_due(at(third + 80)), Some(MultiTapTimer::Promote));
        assert_eq!(
            key.on_timer(MultiTapTimer::Promote, at(third + 80), &config, &mut scheduler),
            MultiTapCommand::TapBackspace
        );
        // Repeat tick keeps rescheduling itself
        assert_eq!(scheduler.pop_due(at(third + 115)), Some(MultiTapTimer::Repeat));
        assert_eq!(
            key.on_timer(MultiTapTimer::Repeat, at(third + 115), &config, &mut scheduler),
            MultiTapCommand::TapBackspace
        );
        assert_eq!(scheduler.next_deadline(), Some(at(third + 150)));
    }

    #[test]
    fn release_in_grace_period_is_single_tap() {
        let (mut key, mut scheduler, config) = setup();
        three_taps(&mut key, &mut scheduler, &config);

        assert_eq!(key.on_release(&mut scheduler), MultiTapCommand::TapBackspace);
        // The promotion was cancelled
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn release_stops_repeat_silently() {
        let (mut key, mut scheduler, config) = setup();
        let third = three_taps(&mut key, &mut scheduler, &config);
        scheduler.pop_due(at(third + 80));
        key.on_timer(MultiTapTimer::Promote, at(third + 80), &config, &mut scheduler);

        assert_eq!(key.on_release(&mut scheduler), MultiTapCommand::None);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn other_key_cancels_pending_promotion_only() {
        let (mut key, mut scheduler, config) = setup();
        three_taps(&mut key, &mut scheduler, &config);

        key.on_other_press(&mut scheduler);
        assert_eq!(scheduler.next_deadline(), None);
        // The promotion never fires
        assert_eq!(
            key.on_timer(MultiTapTimer::Promote, at(300), &config, &mut scheduler),
            MultiTapCommand::None
        );
    }

    #[test]
    fn other_key_does_not_stop_active_repeat() {
        let (mut key, mut scheduler, config) = setup();
        let third = three_taps(&mut key, &mut scheduler, &config);
        scheduler.pop_due(at(third + 80));
        key.on_timer(MultiTapTimer::Promote, at(third + 80), &config, &mut scheduler);

        key.on_other_press(&mut scheduler);
        assert_eq!(scheduler.pop_due(at(third + 115)), Some(MultiTapTimer::Repeat));
        assert_eq!(
            key.on_timer(MultiTapTimer::Repeat, at(third + 115), &config, &mut scheduler),
            MultiTapCommand::TapBackspace
        );
    }

    #[test]
    fn slow_taps_do_not_promote() {
        let (mut key, mut scheduler, config) = setup();
        let none = HidModifiers::new();
        for start in [0u64, 450, 900] {
            assert_eq!(
                key.on_press(at(start), none, &config, &mut scheduler),
                MultiTapCommand::PassThrough
            );
            assert_eq!(key.on_release(&mut scheduler), MultiTapCommand::PassThrough);
        }
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn rhythm_window_is_strict() {
        let (mut key, mut scheduler, config) = setup();
        let none = HidModifiers::new();
        key.on_press(at(0), none, &config, &mut scheduler);
        key.on_release(&mut scheduler);
        // Exactly at the term boundary the rhythm is broken
        key.on_press(at(400), none, &config, &mut scheduler);
        key.on_release(&mut scheduler);
        assert_eq!(key.on_press(at(500), none, &config, &mut scheduler), MultiTapCommand::PassThrough);
    }
}
