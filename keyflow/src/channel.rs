//! Exposed channels between event producers, the engine and the report consumer

use embassy_sync::channel::Channel;
pub use embassy_sync::{blocking_mutex, channel};

use crate::event::KeyboardEvent;
use crate::hid::Report;
use crate::{EVENT_CHANNEL_SIZE, RawMutex, REPORT_CHANNEL_SIZE};

/// Channel for key events only
pub static KEY_EVENT_CHANNEL: Channel<RawMutex, KeyboardEvent, EVENT_CHANNEL_SIZE> = Channel::new();
/// Channel for resolved reports from the engine to the hid writer
pub static KEYBOARD_REPORT_CHANNEL: Channel<RawMutex, Report, REPORT_CHANNEL_SIZE> = Channel::new();
