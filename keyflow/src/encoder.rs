//! Quadrature encoder decoding, including encoders wired into a matrix row.
//!
//! The two quadrature phases and the push button of such an encoder occupy
//! column bits of an ordinary matrix row. [`MatrixEncoder`] strips those bits
//! from the scanned row so they never reach key processing, and turns phase
//! transitions into rotation events.

use heapless::Vec;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use embassy_time::Instant;

use crate::config::EncoderConfig;
use crate::event::KeyboardEvent;

/// The encoder direction is either `Clockwise`, `CounterClockwise`, or `None`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// A clockwise turn
    Clockwise,
    /// A counterclockwise turn
    CounterClockwise,
    /// No change
    None,
}

/// Which edge of the push button fires the click action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClickEdge {
    #[default]
    Press,
    Release,
}

/// Half-resolution quadrature decoder.
///
/// Phase state is the A contact in bit 0 and the B contact in bit 1. Only the
/// two transitions out of the detent state emit a direction; every other
/// transition updates the stored state silently, which makes the decoder
/// self-recovering after contact bounce.
#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    state: u8,
}

impl QuadratureDecoder {
    pub const fn new() -> Self {
        Self { state: 0 }
    }

    /// Feed one sample of both phases, returning the detected rotation.
    pub fn decode(&mut self, pin_a: bool, pin_b: bool) -> Option<Direction> {
        let state = (pin_a as u8) | ((pin_b as u8) << 1);
        let prev = self.state;
        self.state = state;
        if prev != 0b00 {
            return None;
        }
        match state {
            0b01 => Some(Direction::CounterClockwise),
            0b10 => Some(Direction::Clockwise),
            _ => None,
        }
    }
}

/// Rotation and click detected in one row scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderScan {
    pub rotation: Option<Direction>,
    pub clicked: bool,
}

/// A quadrature encoder occupying column bits of a matrix row.
pub struct MatrixEncoder {
    id: u8,
    config: EncoderConfig,
    decoder: QuadratureDecoder,
    button_pressed: bool,
}

impl MatrixEncoder {
    pub fn new(id: u8, config: EncoderConfig) -> Self {
        Self {
            id,
            config,
            decoder: QuadratureDecoder::new(),
            button_pressed: false,
        }
    }

    /// Process one scanned row. Returns `None` when the row doesn't carry
    /// this encoder. Otherwise the encoder's column bits are cleared from
    /// `row_state` so key processing never sees them, and the decoded
    /// rotation and click edge are returned. The button is sampled before
    /// the bits are cleared.
    pub fn scan_row(&mut self, row: u8, row_state: &mut u32) -> Option<EncoderScan> {
        if row != self.config.row {
            return None;
        }

        let pin_a = *row_state & (1 << self.config.col_a) != 0;
        let pin_b = *row_state & (1 << self.config.col_b) != 0;
        let button = *row_state & (1 << self.config.col_button) != 0;

        *row_state &= !((1 << self.config.col_a) | (1 << self.config.col_b) | (1 << self.config.col_button));

        let rotation = self.decoder.decode(pin_a, pin_b);
        let clicked = match self.config.click_edge {
            ClickEdge::Press => button && !self.button_pressed,
            ClickEdge::Release => !button && self.button_pressed,
        };
        self.button_pressed = button;

        Some(EncoderScan { rotation, clicked })
    }

    /// Like [`scan_row`](Self::scan_row), but already shaped as engine events.
    pub fn scan_row_to_events(&mut self, row: u8, row_state: &mut u32, now: Instant) -> Vec<KeyboardEvent, 2> {
        let mut events = Vec::new();
        if let Some(scan) = self.scan_row(row, row_state) {
            if let Some(direction) = scan.rotation {
                let _ = events.push(KeyboardEvent::rotary_encoder(self.id, direction, true, now));
            }
            if scan.clicked {
                let _ = events.push(KeyboardEvent::rotary_encoder(self.id, Direction::None, true, now));
            }
        }
        events
    }
}
