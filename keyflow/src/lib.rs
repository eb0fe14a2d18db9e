//! Keyflow is an input-event decision engine for split keyboards. It turns
//! timestamped switch events into HID reports, resolving tap-hold keys with
//! chord awareness, decoding matrix-integrated quadrature encoders and
//! driving multi-behavior keys from a deferred callback table.
#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

#[macro_use]
pub mod macros;

pub mod channel;
pub mod config;
pub mod descriptor;
pub mod encoder;
pub mod event;
pub mod hid;
pub mod hid_state;
pub mod keyboard;
pub mod keymap;
pub mod layout_macro;
pub mod multi_tap;
pub mod scheduler;
pub mod tap_hold;

pub use keyflow_types::{action, keycode, modifier};

/// The mutex type guarding the exposed channels
pub type RawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Capacity of the input event channel
pub const EVENT_CHANNEL_SIZE: usize = 16;
/// Capacity of the outgoing report channel
pub const REPORT_CHANNEL_SIZE: usize = 16;
/// Number of slots in the deferred callback table
pub const TIMER_TABLE_SIZE: usize = 8;
/// Maximum number of key events held back while a tap-hold decision is open
pub const TAP_HOLD_BUFFER_SIZE: usize = 8;
