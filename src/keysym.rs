//! Keysym helpers.
//!
//! A keysym names the symbol a key produces, independent of where the key
//! sits on the keyboard. Values follow `X11/keysymdef.h`.

/// An X11 keysym value.
pub type Keysym = u32;

pub const NO_SYMBOL: Keysym = 0;
pub const BACKSPACE: Keysym = 0xff08;
pub const TAB: Keysym = 0xff09;
pub const RETURN: Keysym = 0xff0d;
pub const ESCAPE: Keysym = 0xff1b;
pub const SHIFT_L: Keysym = 0xffe1;
pub const SHIFT_R: Keysym = 0xffe2;
pub const CONTROL_L: Keysym = 0xffe3;
pub const CONTROL_R: Keysym = 0xffe4;
pub const ALT_L: Keysym = 0xffe9;
pub const ALT_R: Keysym = 0xffea;
pub const SUPER_L: Keysym = 0xffeb;
pub const ISO_LEVEL3_SHIFT: Keysym = 0xfe03;

/// Offset added to a Unicode code point outside Latin-1 to form its keysym.
const UNICODE_OFFSET: Keysym = 0x0100_0000;

/// Map a character to the keysym that types it.
///
/// Latin-1 characters are their own keysyms. Line breaks, tab and
/// backspace map to the corresponding function keysyms; other control
/// characters have no keysym.
pub fn char_to_keysym(c: char) -> Option<Keysym> {
    let cp = c as u32;
    match c {
        '\n' | '\r' => Some(RETURN),
        '\t' => Some(TAB),
        '\u{8}' => Some(BACKSPACE),
        '\u{1b}' => Some(ESCAPE),
        ' '..='~' | '\u{a0}'..='\u{ff}' => Some(cp),
        c if c.is_control() => None,
        _ => Some(UNICODE_OFFSET | cp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_maps_directly() {
        assert_eq!(char_to_keysym('a'), Some(0x61));
        assert_eq!(char_to_keysym('A'), Some(0x41));
        assert_eq!(char_to_keysym(' '), Some(0x20));
        assert_eq!(char_to_keysym('~'), Some(0x7e));
        assert_eq!(char_to_keysym('é'), Some(0xe9));
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(char_to_keysym('\n'), Some(RETURN));
        assert_eq!(char_to_keysym('\t'), Some(TAB));
        assert_eq!(char_to_keysym('\u{8}'), Some(BACKSPACE));
        assert_eq!(char_to_keysym('\u{0}'), None);
        assert_eq!(char_to_keysym('\u{7f}'), None);
    }

    #[test]
    fn test_unicode_uses_offset() {
        assert_eq!(char_to_keysym('€'), Some(0x0100_20ac));
        assert_eq!(char_to_keysym('ж'), Some(0x0100_0436));
    }
}
