pub mod test_macro;

use core::cell::RefCell;

use embassy_futures::block_on;
use embassy_time::{Duration, Instant};
use heapless::Vec;
use keyflow::action::{EncoderAction, KeyAction};
use keyflow::channel::{KEY_EVENT_CHANNEL, KEYBOARD_REPORT_CHANNEL};
use keyflow::config::{BehaviorConfig, KeyProfile, MultiTapConfig, TapHoldConfig};
use keyflow::descriptor::KeyboardReport;
use keyflow::event::{KeyPos, KeyboardEvent};
use keyflow::hid::Report;
use keyflow::keyboard::Keyboard;
use keyflow::keymap::KeyMap;
use keyflow::modifier::{ALT, CTRL, GUI, SHIFT};
use keyflow::{a, df, encoder, k, layer, lt, mt, tg};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const KC_LCTRL: u8 = 1 << 0;
pub const KC_LSHIFT: u8 = 1 << 1;
pub const KC_LGUI: u8 = 1 << 3;

/// A 3x5+3 split layout folded into an 8x5 matrix: rows 0-3 are the left
/// half with row 3 as its thumb cluster, rows 4-7 the right half with row 7.
/// The multi-behavior key sits at (7, 1), layer-tapping to the number layer.
#[rustfmt::skip]
pub const fn get_keymap() -> [[[KeyAction; 5]; 8]; 4] {
    [
        layer!([
            [k!(Q), k!(W), k!(F), k!(P), k!(B)],
            [mt!(A, GUI), mt!(R, ALT), mt!(S, CTRL), mt!(T, SHIFT), k!(G)],
            [k!(Z), k!(X), k!(C), k!(D), k!(V)],
            [a!(No), k!(Escape), lt!(1, Space), k!(Tab), a!(No)],
            [k!(J), k!(L), k!(U), k!(Y), k!(Quote)],
            [k!(M), mt!(N, SHIFT), mt!(E, CTRL), mt!(I, ALT), mt!(O, GUI)],
            [k!(K), k!(H), k!(Comma), k!(Dot), k!(Slash)],
            [a!(No), lt!(2, Backspace), k!(Enter), a!(No), a!(No)]
        ]),
        layer!([
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(No), a!(Transparent), a!(No), a!(No)],
            [k!(Left), k!(Down), k!(Up), k!(Right), a!(No)],
            [k!(Home), k!(PageDown), k!(PageUp), k!(End), a!(No)],
            [tg!(2), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(Transparent), a!(No), a!(No), a!(No)]
        ]),
        layer!([
            [k!(Kc1), k!(Kc2), k!(Kc3), k!(Kc4), k!(Kc5)],
            [k!(Kc6), k!(Kc7), k!(Kc8), k!(Kc9), k!(Kc0)],
            [a!(No), df!(1), a!(No), a!(No), a!(No)],
            [a!(No), a!(No), a!(Transparent), a!(No), a!(No)],
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [k!(Minus), k!(Equal), k!(LeftBracket), k!(RightBracket), a!(No)],
            [a!(Transparent), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(Transparent), a!(No), a!(No), a!(No)]
        ]),
        layer!([
            [k!(F1), k!(F2), k!(F3), k!(F4), k!(F5)],
            [k!(F6), k!(F7), k!(F8), k!(F9), k!(F10)],
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(No), a!(Transparent), a!(No), a!(No)],
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(No), a!(No), a!(No), a!(No)],
            [a!(Transparent), a!(No), a!(No), a!(No), a!(No)],
            [a!(No), a!(Transparent), a!(No), a!(No), a!(No)]
        ]),
    ]
}

/// One encoder: wheel on the base layer, arrows on nav, volume on num.
pub fn get_encoder_map() -> [[EncoderAction; 1]; 4] {
    [
        [encoder!(k!(MouseWheelUp), k!(MouseWheelDown))],
        [encoder!(k!(Right), k!(Left))],
        [encoder!(k!(AudioVolUp), k!(AudioVolDown))],
        [EncoderAction::default()],
    ]
}

/// Timing in the shape of the reference board: longer terms for the pinky
/// home-row mods and the thumb keys, permissive hold on the space thumb,
/// hold-on-other-press on the multi-behavior thumb.
pub fn get_behavior_config() -> BehaviorConfig {
    let mut profiles: Vec<(KeyPos, KeyProfile), 16> = Vec::new();
    for pos in [KeyPos { row: 1, col: 0 }, KeyPos { row: 5, col: 4 }] {
        let _ = profiles.push((
            pos,
            KeyProfile {
                tapping_term: Duration::from_millis(230),
                ..KeyProfile::default()
            },
        ));
    }
    let _ = profiles.push((
        KeyPos { row: 3, col: 2 },
        KeyProfile {
            tapping_term: Duration::from_millis(250),
            permissive_hold: true,
            ..KeyProfile::default()
        },
    ));
    let _ = profiles.push((
        KeyPos { row: 7, col: 1 },
        KeyProfile {
            tapping_term: Duration::from_millis(250),
            hold_on_other_press: true,
            ..KeyProfile::default()
        },
    ));

    BehaviorConfig {
        tri_layer: Some([1, 2, 3]),
        tap_hold: TapHoldConfig {
            profiles,
            ..TapHoldConfig::default()
        },
        multi_tap: MultiTapConfig {
            pos: KeyPos { row: 7, col: 1 },
            ..MultiTapConfig::default()
        },
        ..BehaviorConfig::default()
    }
}

pub fn wrap_keymap<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>(
    keymap: [[[KeyAction; COL]; ROW]; NUM_LAYER],
    encoders: Option<[[EncoderAction; NUM_ENCODER]; NUM_LAYER]>,
    config: BehaviorConfig,
) -> &'static RefCell<KeyMap<'static, ROW, COL, NUM_LAYER, NUM_ENCODER>> {
    // Leaking is fine in tests, every test runs in its own process
    let keymap = Box::leak(Box::new(keymap));
    let encoders = encoders.map(|e| &mut *Box::leak(Box::new(e)));
    let keymap = block_on(KeyMap::new(keymap, encoders, config));
    Box::leak(Box::new(keyflow::keymap::wrap_keymap(keymap)))
}

pub fn create_test_keyboard_with_config(config: BehaviorConfig) -> Keyboard<'static, 8, 5, 4, 1> {
    Keyboard::new(wrap_keymap(get_keymap(), Some(get_encoder_map()), config))
}

pub fn create_test_keyboard() -> Keyboard<'static, 8, 5, 4, 1> {
    create_test_keyboard_with_config(get_behavior_config())
}

#[derive(Debug, Clone)]
pub struct TestKeyPress {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
    /// Capture time of this key event in milliseconds
    pub at: u64,
}

/// Push a key sequence through the engine core in capture-time order,
/// optionally let the clock run on to `tick_to`, then verify the exact
/// keyboard report sequence.
pub fn run_key_sequence_test<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>(
    keyboard: &mut Keyboard<'_, ROW, COL, NUM_LAYER, NUM_ENCODER>,
    key_sequence: &[TestKeyPress],
    tick_to: Option<u64>,
    expected_reports: &[KeyboardReport],
) {
    KEY_EVENT_CHANNEL.clear();
    KEYBOARD_REPORT_CHANNEL.clear();

    for key in key_sequence {
        keyboard.process_event(KeyboardEvent::key(key.row, key.col, key.pressed, Instant::from_millis(key.at)));
    }
    if let Some(at) = tick_to {
        keyboard.tick(Instant::from_millis(at));
    }

    assert_eq!(drain_keyboard_reports(), expected_reports);
}

/// Drain the report channel, keeping keyboard reports only.
pub fn drain_keyboard_reports() -> std::vec::Vec<KeyboardReport> {
    let mut reports = std::vec::Vec::new();
    while let Ok(report) = KEYBOARD_REPORT_CHANNEL.try_receive() {
        if let Report::KeyboardReport(report) = report {
            reports.push(report);
        }
    }
    reports
}

/// Drain the report channel, keeping everything.
pub fn drain_reports() -> std::vec::Vec<Report> {
    let mut reports = std::vec::Vec::new();
    while let Ok(report) = KEYBOARD_REPORT_CHANNEL.try_receive() {
        reports.push(report);
    }
    reports
}
