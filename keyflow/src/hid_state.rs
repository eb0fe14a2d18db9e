use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use bitfield_struct::bitfield;
use keyflow_types::modifier::ModifierCombination;

/// The modifier byte of a HID keyboard report.
#[bitfield(u8, order = Lsb)]
#[derive(Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidModifiers {
    #[bits(1)]
    pub(crate) left_ctrl: bool,
    #[bits(1)]
    pub(crate) left_shift: bool,
    #[bits(1)]
    pub(crate) left_alt: bool,
    #[bits(1)]
    pub(crate) left_gui: bool,
    #[bits(1)]
    pub(crate) right_ctrl: bool,
    #[bits(1)]
    pub(crate) right_shift: bool,
    #[bits(1)]
    pub(crate) right_alt: bool,
    #[bits(1)]
    pub(crate) right_gui: bool,
}

impl BitOr for HidModifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}
impl BitAnd for HidModifiers {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() & rhs.into_bits())
    }
}
impl Not for HidModifiers {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_bits(!self.into_bits())
    }
}
impl BitAndAssign for HidModifiers {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}
impl BitOrAssign for HidModifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl HidModifiers {
    pub const fn new_from(
        left_ctrl: bool,
        left_shift: bool,
        left_alt: bool,
        left_gui: bool,
        right_ctrl: bool,
        right_shift: bool,
        right_alt: bool,
        right_gui: bool,
    ) -> Self {
        Self::new()
            .with_left_ctrl(left_ctrl)
            .with_left_shift(left_shift)
            .with_left_alt(left_alt)
            .with_left_gui(left_gui)
            .with_right_ctrl(right_ctrl)
            .with_right_shift(right_shift)
            .with_right_alt(right_alt)
            .with_right_gui(right_gui)
    }

    /// Mask covering both shift bits.
    pub const fn shift_mask() -> Self {
        Self::new().with_left_shift(true).with_right_shift(true)
    }

    /// Mask covering both ctrl bits.
    pub const fn ctrl_mask() -> Self {
        Self::new().with_left_ctrl(true).with_right_ctrl(true)
    }

    pub const fn has_shift(&self) -> bool {
        self.left_shift() || self.right_shift()
    }

    pub const fn has_ctrl(&self) -> bool {
        self.left_ctrl() || self.right_ctrl()
    }

    pub const fn is_empty(&self) -> bool {
        self.into_bits() == 0
    }
}

impl From<ModifierCombination> for HidModifiers {
    fn from(m: ModifierCombination) -> Self {
        if m.right() {
            Self::new_from(false, false, false, false, m.ctrl(), m.shift(), m.alt(), m.gui())
        } else {
            Self::new_from(m.ctrl(), m.shift(), m.alt(), m.gui(), false, false, false, false)
        }
    }
}
