use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::modifier::ModifierCombination;

/// Key codes sent to the host, a subset of the HID keyboard/keypad usage page
/// plus the media and mouse keys commonly placed on encoder layers.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyCode {
    /// Reserved, no-key.
    No = 0x00,
    /// `a` and `A`
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,
    /// `1` and `!`
    Kc1 = 0x1E,
    Kc2 = 0x1F,
    Kc3 = 0x20,
    Kc4 = 0x21,
    Kc5 = 0x22,
    Kc6 = 0x23,
    Kc7 = 0x24,
    Kc8 = 0x25,
    Kc9 = 0x26,
    /// `0` and `)`
    Kc0 = 0x27,
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    /// `-` and `_`
    Minus = 0x2D,
    /// `=` and `+`
    Equal = 0x2E,
    LeftBracket = 0x2F,
    RightBracket = 0x30,
    Backslash = 0x31,
    NonusHash = 0x32,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,
    NumLock = 0x53,
    NonusBackslash = 0x64,
    Application = 0x65,
    AudioMute = 0xA8,
    AudioVolUp = 0xA9,
    AudioVolDown = 0xAA,
    MediaNextTrack = 0xAB,
    MediaPrevTrack = 0xAC,
    MediaStop = 0xAD,
    MediaPlayPause = 0xAE,
    /// Brightness Up
    BrightnessUp = 0xBD,
    /// Brightness Down
    BrightnessDown = 0xBE,
    MouseWheelUp = 0xD9,
    MouseWheelDown = 0xDA,
    MouseWheelLeft = 0xDB,
    MouseWheelRight = 0xDC,
    /// Left Control
    LCtrl = 0xE0,
    /// Left Shift
    LShift = 0xE1,
    /// Left Alt
    LAlt = 0xE2,
    /// Left GUI
    LGui = 0xE3,
    /// Right Control
    RCtrl = 0xE4,
    /// Right Shift
    RShift = 0xE5,
    /// Right Alt
    RAlt = 0xE6,
    /// Right GUI
    RGui = 0xE7,
}

impl KeyCode {
    /// Returns `true` if the keycode goes into the 6-key area of the keyboard report.
    pub fn is_basic(self) -> bool {
        KeyCode::No <= self && self < KeyCode::AudioMute
    }

    /// Returns `true` if the keycode is a modifier keycode
    pub fn is_modifier(self) -> bool {
        KeyCode::LCtrl <= self && self <= KeyCode::RGui
    }

    /// Returns `true` if the keycode is a mouse wheel keycode
    pub fn is_mouse_wheel(self) -> bool {
        KeyCode::MouseWheelUp <= self && self <= KeyCode::MouseWheelRight
    }

    /// Modifier combination with the bit corresponding to this modifier keycode set.
    pub fn to_modifiers(self) -> ModifierCombination {
        match self {
            KeyCode::LCtrl => ModifierCombination::new().with_ctrl(true),
            KeyCode::LShift => ModifierCombination::new().with_shift(true),
            KeyCode::LAlt => ModifierCombination::new().with_alt(true),
            KeyCode::LGui => ModifierCombination::new().with_gui(true),
            KeyCode::RCtrl => ModifierCombination::new().with_right(true).with_ctrl(true),
            KeyCode::RShift => ModifierCombination::new().with_right(true).with_shift(true),
            KeyCode::RAlt => ModifierCombination::new().with_right(true).with_alt(true),
            KeyCode::RGui => ModifierCombination::new().with_right(true).with_gui(true),
            _ => ModifierCombination::new(),
        }
    }

    /// Some hid keycodes are sent on the consumer page instead, for host compatibility
    pub fn process_as_consumer(self) -> Option<ConsumerKey> {
        match self {
            KeyCode::AudioMute => Some(ConsumerKey::Mute),
            KeyCode::AudioVolUp => Some(ConsumerKey::VolumeIncrement),
            KeyCode::AudioVolDown => Some(ConsumerKey::VolumeDecrement),
            KeyCode::MediaNextTrack => Some(ConsumerKey::NextTrack),
            KeyCode::MediaPrevTrack => Some(ConsumerKey::PrevTrack),
            KeyCode::MediaStop => Some(ConsumerKey::StopPlay),
            KeyCode::MediaPlayPause => Some(ConsumerKey::PlayPause),
            KeyCode::BrightnessUp => Some(ConsumerKey::BrightnessUp),
            KeyCode::BrightnessDown => Some(ConsumerKey::BrightnessDown),
            _ => None,
        }
    }
}

impl ::postcard::experimental::max_size::MaxSize for KeyCode {
    const POSTCARD_MAX_SIZE: usize = 1usize;
}

impl From<u8> for KeyCode {
    fn from(value: u8) -> Self {
        Self::from_repr(value).unwrap_or(KeyCode::No)
    }
}

/// Keys in consumer page
/// Ref: <https://www.usb.org/sites/default/files/documents/hut1_12v2.pdf#page=75>
#[non_exhaustive]
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsumerKey {
    No = 0x00,
    /// <https://www.usb.org/sites/default/files/hutrr41_0.pdf>
    BrightnessUp = 0x6F,
    BrightnessDown = 0x70,
    // 15.7 Transport Controls
    NextTrack = 0xB5,
    PrevTrack = 0xB6,
    StopPlay = 0xB7,
    PlayPause = 0xCD,
    // 15.9.1 Audio Controls - Volume
    Mute = 0xE2,
    VolumeIncrement = 0xE9,
    VolumeDecrement = 0xEA,
}

impl ::postcard::experimental::max_size::MaxSize for ConsumerKey {
    const POSTCARD_MAX_SIZE: usize = 3usize;
}
