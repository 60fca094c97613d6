//! X11 core modifier masks.
//!
//! Bit `i` of a modifier mask corresponds to row `i` of the server's
//! modifier mapping.

/// Shift.
pub const SHIFT_MASK: u8 = 1 << 0;
/// Caps Lock.
pub const LOCK_MASK: u8 = 1 << 1;
/// Control.
pub const CONTROL_MASK: u8 = 1 << 2;
/// Mod1, usually Alt.
pub const MOD1_MASK: u8 = 1 << 3;
/// Mod2, usually Num Lock.
pub const MOD2_MASK: u8 = 1 << 4;
pub const MOD3_MASK: u8 = 1 << 5;
/// Mod4, usually Super.
pub const MOD4_MASK: u8 = 1 << 6;
/// Mod5, usually AltGr / ISO_Level3_Shift.
pub const MOD5_MASK: u8 = 1 << 7;

/// Number of rows in the modifier mapping.
pub const MODIFIER_COUNT: usize = 8;

/// The lock modifier whose state is ignored when capturing keys.
pub const IGNORED_LOCK_MASK: u8 = MOD2_MASK;

/// Returns `true` if `effective` holds any modifier other than the ignored
/// lock bit.
#[inline]
pub fn has_active_modifiers(effective: u32) -> bool {
    (effective & !u32::from(IGNORED_LOCK_MASK) & 0xff) != 0
}

/// Mask for the modifier mapping row `index`.
#[inline]
pub fn index_to_mask(index: usize) -> u8 {
    if index < MODIFIER_COUNT {
        1 << index
    } else {
        0
    }
}
