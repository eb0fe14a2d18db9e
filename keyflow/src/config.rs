//! Behavior configuration of the engine.

use embassy_time::Duration;
use heapless::Vec;
use keyflow_types::action::KeyAction;
use keyflow_types::keycode::KeyCode;

use crate::encoder::ClickEdge;
use crate::event::KeyPos;

/// Maximum number of per-position timing profile overrides
pub const MAX_KEY_PROFILES: usize = 16;

/// Config struct for the whole engine behavior
#[derive(Clone, Debug, Default)]
pub struct BehaviorConfig {
    pub tri_layer: Option<[u8; 3]>,
    pub tap_hold: TapHoldConfig,
    pub chord_hold: ChordHoldConfig,
    pub multi_tap: MultiTapConfig,
    pub encoder: EncoderConfig,
}

/// Per-position timing profile of a tap-hold key.
///
/// Positions without an override in [`TapHoldConfig::profiles`] use
/// [`TapHoldConfig::default_profile`].
#[derive(Clone, Copy, Debug)]
pub struct KeyProfile {
    /// Time after which an unresolved press commits as hold
    pub tapping_term: Duration,
    /// Commit as hold when another key pressed after this one is released first
    pub permissive_hold: bool,
    /// Commit as hold as soon as any other key is pressed
    pub hold_on_other_press: bool,
    /// Re-pressing within this window of the last tap repeats the tap,
    /// bypassing resolution. Zero disables quick tap.
    pub quick_tap_term: Duration,
}

impl Default for KeyProfile {
    fn default() -> Self {
        Self {
            tapping_term: Duration::from_millis(200),
            permissive_hold: false,
            hold_on_other_press: false,
            quick_tap_term: Duration::from_millis(0),
        }
    }
}

/// Config for tap-hold resolution timing.
#[derive(Clone, Debug, Default)]
pub struct TapHoldConfig {
    pub default_profile: KeyProfile,
    pub profiles: Vec<(KeyPos, KeyProfile), MAX_KEY_PROFILES>,
}

impl TapHoldConfig {
    /// The profile of a position, falling back to the default profile.
    pub fn profile_for(&self, pos: KeyPos) -> KeyProfile {
        self.profiles
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, profile)| *profile)
            .unwrap_or(self.default_profile)
    }
}

/// Config for the chord override of tap-hold resolution.
///
/// A "chord" is a pending tap-hold key plus another key pressed while its
/// decision is open. Chording keys on the same hand forces the tap
/// interpretation; the hold interpretation stays reachable only across hands
/// or through a thumb key.
#[derive(Clone, Debug)]
pub struct ChordHoldConfig {
    /// Rows below this index belong to the left half
    pub split_row: u8,
    /// Thumb cluster rows chord with everything
    pub thumb_rows: [u8; 2],
    /// A decision left open this long stops gating other keys
    pub timeout: Duration,
    /// Custom chord predicate, replaces the row-based split when set
    pub chord_predicate: Option<fn(KeyPos, KeyPos) -> bool>,
    /// Custom eager-key predicate, replaces the built-in allow-list when set
    pub eager_keys: Option<fn(KeyCode) -> bool>,
}

impl Default for ChordHoldConfig {
    fn default() -> Self {
        Self {
            split_row: 4,
            thumb_rows: [3, 7],
            timeout: Duration::from_millis(1000),
            chord_predicate: None,
            eager_keys: None,
        }
    }
}

impl ChordHoldConfig {
    fn is_thumb(&self, row: u8) -> bool {
        self.thumb_rows.contains(&row)
    }

    /// Whether `held` + `other` counts as a chord, i.e. the hold
    /// interpretation of `held` remains reachable.
    pub fn is_chord(&self, held: KeyPos, other: KeyPos) -> bool {
        if let Some(predicate) = self.chord_predicate {
            return predicate(held, other);
        }
        if self.is_thumb(held.row) || self.is_thumb(other.row) {
            return true;
        }
        (held.row < self.split_row) != (other.row < self.split_row)
    }

    /// Whether a key commits a chording hold eagerly, so the modifier applies
    /// to the key itself. Covers common one-handed shortcuts.
    pub fn is_eager(&self, key: KeyCode) -> bool {
        if let Some(predicate) = self.eager_keys {
            return predicate(key);
        }
        matches!(
            key,
            KeyCode::A | KeyCode::C | KeyCode::S | KeyCode::T | KeyCode::V | KeyCode::W | KeyCode::X | KeyCode::Z
        )
    }
}

/// Config for the designated multi-behavior key.
#[derive(Clone, Debug)]
pub struct MultiTapConfig {
    /// Position of the multi-behavior key
    pub pos: KeyPos,
    /// Maximum gap between taps counted towards a triple tap
    pub triple_term: Duration,
    /// Grace period between the third tap and repeat promotion
    pub promote_grace: Duration,
    /// Interval of the repeat tick once promoted
    pub repeat_interval: Duration,
}

impl Default for MultiTapConfig {
    fn default() -> Self {
        Self {
            pos: KeyPos { row: 7, col: 1 },
            triple_term: Duration::from_millis(400),
            promote_grace: Duration::from_millis(80),
            repeat_interval: Duration::from_millis(35),
        }
    }
}

/// Config for a quadrature encoder wired into a matrix row.
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Matrix row carrying the encoder contacts
    pub row: u8,
    /// Column bit of the A phase
    pub col_a: u8,
    /// Column bit of the B phase
    pub col_b: u8,
    /// Column bit of the push button
    pub col_button: u8,
    /// Which button edge fires the click action
    pub click_edge: ClickEdge,
    /// Action tapped on click, on every layer
    pub click_action: KeyAction,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            row: 1,
            col_a: 5,
            col_b: 0,
            col_button: 4,
            click_edge: ClickEdge::Press,
            click_action: KeyAction::Single(keyflow_types::action::Action::Key(KeyCode::MediaPlayPause)),
        }
    }
}
