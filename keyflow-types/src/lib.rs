//! # Keyflow Types
//!
//! Fundamental type definitions shared by the keyflow input-event engine.
//!
//! - [`action`] - Key actions stored in the keymap (key presses, layer operations, tap-hold)
//! - [`keycode`] - Keycode definitions, a subset of the HID usage tables plus media keys
//! - [`modifier`] - Modifier key combinations and operations

#![no_std]

pub mod action;
pub mod keycode;
pub mod modifier;
