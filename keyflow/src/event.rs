//! Input events accepted by the engine.
//!
//! Producers (matrix scanners, encoder readers, split halves) stamp each
//! event at capture time and push it to [`crate::channel::KEY_EVENT_CHANNEL`].
//! All timing decisions downstream use the carried timestamp, never the
//! processing time.

use embassy_time::Instant;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use crate::encoder::Direction;

/// A timestamped key state change at some position of the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardEvent {
    /// Where the event happened
    pub pos: KeyboardEventPos,
    /// Whether the key is pressed. For encoder rotation, a press/release pair
    /// frames one detent.
    pub pressed: bool,
    /// Capture time of the event
    pub timestamp: Instant,
}

impl KeyboardEvent {
    /// Create a key event from a matrix position.
    pub fn key(row: u8, col: u8, pressed: bool, timestamp: Instant) -> Self {
        Self {
            pos: KeyboardEventPos::key_pos(row, col),
            pressed,
            timestamp,
        }
    }

    /// Create a rotary encoder event.
    pub fn rotary_encoder(id: u8, direction: Direction, pressed: bool, timestamp: Instant) -> Self {
        Self {
            pos: KeyboardEventPos::RotaryEncoder(RotaryEncoderPos { id, direction }),
            pressed,
            timestamp,
        }
    }
}

/// The position type of a [`KeyboardEvent`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyboardEventPos {
    Key(KeyPos),
    RotaryEncoder(RotaryEncoderPos),
}

impl KeyboardEventPos {
    pub fn key_pos(row: u8, col: u8) -> Self {
        Self::Key(KeyPos { row, col })
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Self::Key(_))
    }

    /// The matrix position if this is a key event.
    pub fn key(&self) -> Option<KeyPos> {
        match self {
            Self::Key(pos) => Some(*pos),
            Self::RotaryEncoder(_) => None,
        }
    }
}

/// A matrix position.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyPos {
    pub row: u8,
    pub col: u8,
}

/// A rotary encoder position: which encoder, and which way it turned.
/// [`Direction::None`] marks the encoder's push button.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotaryEncoderPos {
    pub id: u8,
    pub direction: Direction,
}
