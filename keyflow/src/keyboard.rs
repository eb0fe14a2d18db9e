//! The engine core: consumes [`KeyboardEvent`]s, runs them through the
//! multi-behavior key, the tap-hold resolver and the keymap, and emits HID
//! reports to [`KEYBOARD_REPORT_CHANNEL`].

use core::cell::RefCell;

use embassy_futures::select::{Either, select};
use embassy_time::{Instant, Timer};
use heapless::Vec;
use keyflow_types::action::{Action, KeyAction};
use keyflow_types::keycode::KeyCode;
use keyflow_types::modifier::ModifierCombination;
use usbd_hid::descriptor::{MediaKeyboardReport, MouseReport};

use crate::TIMER_TABLE_SIZE;
use crate::channel::{KEY_EVENT_CHANNEL, KEYBOARD_REPORT_CHANNEL};
use crate::config::BehaviorConfig;
use crate::descriptor::KeyboardReport;
use crate::encoder::Direction;
use crate::event::{KeyboardEvent, KeyboardEventPos, RotaryEncoderPos};
use crate::hid::Report;
use crate::hid_state::HidModifiers;
use crate::keymap::KeyMap;
use crate::multi_tap::{MultiTapCommand, MultiTapKey, MultiTapTimer};
use crate::scheduler::DeferredScheduler;
use crate::tap_hold::{EventDisposition, ResolvedTapHold, ResolverStep, TapHoldResolution, TapHoldResolver};

/// Capacity of the committed-action table, effectively the rollover depth
const HELD_ACTIONS: usize = 16;

pub struct Keyboard<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize = 0> {
    /// Keymap
    pub(crate) keymap: &'a RefCell<KeyMap<'a, ROW, COL, NUM_LAYER, NUM_ENCODER>>,

    /// Options for configurable action behavior
    behavior: BehaviorConfig,

    tap_hold: TapHoldResolver,
    multi_tap: MultiTapKey,
    scheduler: DeferredScheduler<MultiTapTimer, TIMER_TABLE_SIZE>,

    /// Which position occupies each report slot
    registered_keys: [Option<KeyboardEventPos>; 6],
    /// Keycodes in the 6-key area of the keyboard report
    held_keycodes: [KeyCode; 6],
    /// Modifiers in the keyboard report
    held_modifiers: HidModifiers,
    /// The committed action per pressed position, released on key-up
    held_actions: Vec<(KeyboardEventPos, Action), HELD_ACTIONS>,
    /// Last settled tap, for the quick-tap window
    last_tap: Option<(KeyboardEventPos, Instant)>,
}

impl<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>
    Keyboard<'a, ROW, COL, NUM_LAYER, NUM_ENCODER>
{
    pub fn new(keymap: &'a RefCell<KeyMap<'a, ROW, COL, NUM_LAYER, NUM_ENCODER>>) -> Self {
        let behavior = keymap.borrow().behavior.clone();
        Keyboard {
            keymap,
            behavior,
            tap_hold: TapHoldResolver::new(),
            multi_tap: MultiTapKey::new(),
            scheduler: DeferredScheduler::new(),
            registered_keys: [None; 6],
            held_keycodes: [KeyCode::No; 6],
            held_modifiers: HidModifiers::default(),
            held_actions: Vec::new(),
            last_tap: None,
        }
    }

    /// Main processing task: receive events, run deferred work at its deadline.
    pub async fn run(&mut self) {
        loop {
            match self.next_deadline() {
                Some(deadline) => match select(KEY_EVENT_CHANNEL.receive(), Timer::at(deadline)).await {
                    Either::First(event) => self.process_event(event),
                    Either::Second(_) => self.tick(Instant::now()),
                },
                None => {
                    let event = KEY_EVENT_CHANNEL.receive().await;
                    self.process_event(event);
                }
            }
        }
    }

    /// The next instant deferred work comes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.tap_hold.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run all deferred work due at `now`.
    pub fn tick(&mut self, now: Instant) {
        while let Some(timer) = self.scheduler.pop_due(now) {
            let command = self
                .multi_tap
                .on_timer(timer, now, &self.behavior.multi_tap, &mut self.scheduler);
            let pos = self.behavior.multi_tap.pos;
            let event = KeyboardEvent::key(pos.row, pos.col, true, now);
            self.apply_multi_tap_command(command, event);
        }
        let steps = self.tap_hold.tick(now);
        for step in steps {
            self.apply_step(step);
        }
    }

    /// Process one input event. Deferred work due before the event's
    /// timestamp runs first, so ordering follows capture time.
    pub fn process_event(&mut self, event: KeyboardEvent) {
        self.tick(event.timestamp);
        match event.pos {
            KeyboardEventPos::RotaryEncoder(pos) => self.process_encoder_event(pos, event),
            KeyboardEventPos::Key(pos) => {
                if pos == self.behavior.multi_tap.pos {
                    self.process_multi_tap_event(event);
                } else {
                    if event.pressed {
                        self.multi_tap.on_other_press(&mut self.scheduler);
                    }
                    self.dispatch(event);
                }
            }
        }
    }

    fn process_encoder_event(&mut self, pos: RotaryEncoderPos, event: KeyboardEvent) {
        if !event.pressed {
            return;
        }
        if pos.direction == Direction::None {
            // The encoder's push button
            let action = self.behavior.encoder.click_action;
            self.tap_key_action(action, event);
            return;
        }
        let action = self.keymap.borrow().get_encoder_action(pos);
        match action {
            Some(action) if !action.is_empty() => self.tap_key_action(action, event),
            _ => debug!("no encoder binding on the active layer"),
        }
    }

    fn process_multi_tap_event(&mut self, event: KeyboardEvent) {
        let command = if event.pressed {
            let modifiers = self.effective_modifiers();
            self.multi_tap
                .on_press(event.timestamp, modifiers, &self.behavior.multi_tap, &mut self.scheduler)
        } else {
            self.multi_tap.on_release(&mut self.scheduler)
        };
        self.apply_multi_tap_command(command, event);
    }

    /// Modifiers already registered plus the hold side of a physically held
    /// but still unresolved dual-role key.
    fn effective_modifiers(&self) -> HidModifiers {
        self.held_modifiers | HidModifiers::from(self.tap_hold.pending_hold_modifiers())
    }

    fn apply_multi_tap_command(&mut self, command: MultiTapCommand, event: KeyboardEvent) {
        match command {
            MultiTapCommand::None => {}
            MultiTapCommand::PassThrough => {
                let action = self.keymap.borrow_mut().get_action_with_layer_cache(event);
                self.dispatch_action(event, action, true);
            }
            MultiTapCommand::WordDelete { forward } => self.send_word_delete(forward, event),
            MultiTapCommand::DeleteDown { masked } => {
                self.held_modifiers = masked;
                self.register_keycode(KeyCode::Delete, event);
                self.send_keyboard_report();
            }
            MultiTapCommand::DeleteUp { restored } => {
                self.unregister_keycode(KeyCode::Delete, event);
                self.send_keyboard_report();
                self.held_modifiers = restored;
                self.send_keyboard_report();
            }
            MultiTapCommand::TapBackspace => self.tap_key(KeyCode::Backspace, event),
        }
    }

    /// One whole-word delete: the surrounding modifier state is cleared so
    /// the emitted chord is exactly ctrl plus one key, then restored
    /// byte-for-byte.
    fn send_word_delete(&mut self, forward: bool, event: KeyboardEvent) {
        let saved = self.held_modifiers;
        let key = if forward { KeyCode::Delete } else { KeyCode::Backspace };

        self.held_modifiers = HidModifiers::new();
        self.send_keyboard_report();
        self.held_modifiers = HidModifiers::new().with_left_ctrl(true);
        self.register_keycode(key, event);
        self.send_keyboard_report();
        self.unregister_keycode(key, event);
        self.held_modifiers = HidModifiers::new();
        self.send_keyboard_report();
        self.held_modifiers = saved;
        self.send_keyboard_report();
    }

    fn dispatch(&mut self, event: KeyboardEvent) {
        let action = self.keymap.borrow_mut().get_action_with_layer_cache(event);
        self.dispatch_action(event, action, false);
    }

    /// Run one event through the tap-hold resolver and execute the outcome.
    /// `chord_exempt` marks the designated multi-behavior key.
    fn dispatch_action(&mut self, event: KeyboardEvent, mut action: KeyAction, chord_exempt: bool) {
        loop {
            let profile = match event.pos.key() {
                Some(pos) => self.behavior.tap_hold.profile_for(pos),
                None => Default::default(),
            };
            let quick_tap = event.pressed
                && action.is_tap_hold()
                && profile.quick_tap_term.as_ticks() > 0
                && self
                    .last_tap
                    .is_some_and(|(pos, at)| pos == event.pos && event.timestamp < at + profile.quick_tap_term);

            let verdict = self
                .tap_hold
                .handle(event, action, profile, &self.behavior.chord_hold, chord_exempt, quick_tap);
            for step in verdict.steps {
                self.apply_step(step);
            }
            match verdict.current {
                EventDisposition::Execute => {
                    self.execute(event, action);
                    return;
                }
                EventDisposition::Redispatch => {
                    // The resolver settled a decision underneath this event,
                    // look its action up again on the updated layer state
                    action = self.keymap.borrow_mut().get_action_with_layer_cache(event);
                }
                EventDisposition::Buffered | EventDisposition::Consumed => return,
            }
        }
    }

    fn apply_step(&mut self, step: ResolverStep) {
        match step {
            ResolverStep::Commit(resolved) => self.apply_commit(resolved),
            ResolverStep::Flush(event) => self.dispatch(event),
        }
    }

    fn apply_commit(&mut self, resolved: ResolvedTapHold) {
        debug!("tap-hold settled: {:?} at {:?}", resolved.resolution, resolved.event.pos);
        if resolved.resolution == TapHoldResolution::Tap {
            self.last_tap = Some((resolved.event.pos, resolved.event.timestamp));
        }
        self.execute_press(resolved.action(), resolved.event);
    }

    fn execute(&mut self, event: KeyboardEvent, action: KeyAction) {
        if event.pressed {
            match action {
                KeyAction::No | KeyAction::Transparent => {}
                KeyAction::Single(action) => self.execute_press(action, event),
                // Reachable only while a lapsed decision keeps the slot, the
                // key behaves as its tap side
                KeyAction::TapHold(tap, _) => self.execute_press(tap, event),
            }
        } else {
            // Releases undo whatever the press committed. A release without
            // a committed action (e.g. a suppressed press) is a no-op.
            let index = self.held_actions.iter().position(|(pos, _)| *pos == event.pos);
            if let Some(index) = index {
                let (_, action) = self.held_actions.swap_remove(index);
                self.execute_release(action, event);
            }
        }
    }

    fn execute_press(&mut self, action: Action, event: KeyboardEvent) {
        if matches!(action, Action::No | Action::Transparent) {
            return;
        }
        if self.held_actions.push((event.pos, action)).is_err() {
            warn!("committed action table is full, dropping {:?}", action);
            return;
        }
        match action {
            Action::No | Action::Transparent => {}
            Action::Key(key) => self.press_key(key, event),
            Action::Modifier(modifiers) => {
                self.register_modifiers(modifiers);
                self.send_keyboard_report();
            }
            Action::KeyWithModifier(key, modifiers) => {
                self.register_modifiers(modifiers);
                self.press_key(key, event);
            }
            Action::LayerOn(layer) => self.keymap.borrow_mut().activate_layer(layer),
            Action::LayerOff(layer) => self.keymap.borrow_mut().deactivate_layer(layer),
            Action::LayerToggle(layer) => self.keymap.borrow_mut().toggle_layer(layer),
            Action::DefaultLayer(layer) => {
                let mut keymap = self.keymap.borrow_mut();
                if keymap.get_default_layer() != layer {
                    debug!("default layer switched to {}", layer);
                    keymap.set_default_layer(layer);
                }
            }
        }
    }

    fn execute_release(&mut self, action: Action, event: KeyboardEvent) {
        match action {
            Action::No | Action::Transparent => {}
            Action::Key(key) => self.release_key(key, event),
            Action::Modifier(modifiers) => {
                self.unregister_modifiers(modifiers);
                self.send_keyboard_report();
            }
            Action::KeyWithModifier(key, modifiers) => {
                self.release_key(key, event);
                self.unregister_modifiers(modifiers);
                self.send_keyboard_report();
            }
            Action::LayerOn(layer) => self.keymap.borrow_mut().deactivate_layer(layer),
            Action::LayerOff(_) | Action::LayerToggle(_) | Action::DefaultLayer(_) => {}
        }
    }

    fn tap_key_action(&mut self, action: KeyAction, event: KeyboardEvent) {
        match action {
            KeyAction::Single(Action::Key(key)) => self.tap_key(key, event),
            _ => debug!("only key actions can be tapped, ignoring {:?}", action),
        }
    }

    fn tap_key(&mut self, key: KeyCode, event: KeyboardEvent) {
        self.press_key(key, event);
        self.release_key(key, event);
    }

    fn press_key(&mut self, key: KeyCode, event: KeyboardEvent) {
        if key.is_modifier() {
            self.register_modifiers(key.to_modifiers());
            self.send_keyboard_report();
        } else if let Some(consumer) = key.process_as_consumer() {
            self.send_media_report(consumer as u16);
        } else if key.is_mouse_wheel() {
            self.send_mouse_wheel(key);
        } else if key.is_basic() {
            self.register_keycode(key, event);
            self.send_keyboard_report();
        }
    }

    fn release_key(&mut self, key: KeyCode, event: KeyboardEvent) {
        if key.is_modifier() {
            self.unregister_modifiers(key.to_modifiers());
            self.send_keyboard_report();
        } else if key.process_as_consumer().is_some() {
            self.send_media_report(0);
        } else if key.is_mouse_wheel() {
            // Wheel taps are single impulses, nothing to release
        } else if key.is_basic() {
            self.unregister_keycode(key, event);
            self.send_keyboard_report();
        }
    }

    /// Register a key to be sent in hid report.
    fn register_keycode(&mut self, key: KeyCode, event: KeyboardEvent) {
        // First, find the report slot according to the position
        let slot = self
            .registered_keys
            .iter()
            .position(|pos| *pos == Some(event.pos));

        // If the slot is found, update the key in the slot
        if let Some(index) = slot {
            self.held_keycodes[index] = key;
            self.registered_keys[index] = Some(event.pos);
        } else {
            // Otherwise, find the first free slot
            if let Some(index) = self.held_keycodes.iter().position(|&k| k == KeyCode::No) {
                self.held_keycodes[index] = key;
                self.registered_keys[index] = Some(event.pos);
            }
        }
    }

    /// Unregister a key from hid report.
    fn unregister_keycode(&mut self, key: KeyCode, event: KeyboardEvent) {
        // First, find the report slot according to the position
        let slot = self
            .registered_keys
            .iter()
            .position(|pos| *pos == Some(event.pos));

        // If the slot is found, release the key in the slot
        if let Some(index) = slot {
            self.held_keycodes[index] = KeyCode::No;
            self.registered_keys[index] = None;
        } else {
            // Otherwise, release the first same key
            if let Some(index) = self.held_keycodes.iter().position(|&k| k == key) {
                self.held_keycodes[index] = KeyCode::No;
                self.registered_keys[index] = None;
            }
        }
    }

    /// Register a modifier combination to be sent in hid report.
    fn register_modifiers(&mut self, modifiers: ModifierCombination) {
        self.held_modifiers |= HidModifiers::from(modifiers);
    }

    /// Unregister a modifier combination from hid report.
    fn unregister_modifiers(&mut self, modifiers: ModifierCombination) {
        self.held_modifiers &= !HidModifiers::from(modifiers);
    }

    fn send_keyboard_report(&self) {
        self.send_report(Report::KeyboardReport(KeyboardReport {
            modifier: self.held_modifiers.into_bits(),
            reserved: 0,
            leds: 0,
            keycodes: self.held_keycodes.map(|k| k as u8),
        }));
    }

    fn send_media_report(&self, usage_id: u16) {
        self.send_report(Report::MediaKeyboardReport(MediaKeyboardReport { usage_id }));
    }

    fn send_mouse_wheel(&self, key: KeyCode) {
        let (wheel, pan) = match key {
            KeyCode::MouseWheelUp => (1, 0),
            KeyCode::MouseWheelDown => (-1, 0),
            KeyCode::MouseWheelLeft => (0, -1),
            KeyCode::MouseWheelRight => (0, 1),
            _ => return,
        };
        self.send_report(Report::MouseReport(MouseReport {
            buttons: 0,
            x: 0,
            y: 0,
            wheel,
            pan,
        }));
    }

    fn send_report(&self, report: Report) {
        // The engine core is synchronous, a full channel drops the report
        if KEYBOARD_REPORT_CHANNEL.try_send(report).is_err() {
            warn!("report channel is full, dropping a report");
        }
    }
}
