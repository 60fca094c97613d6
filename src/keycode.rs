//! Static key name <-> X11 keycode table.
//!
//! The table covers the function, number, letter and punctuation rows of
//! an ANSI-style layout plus the space bar, as reported by the evdev X
//! driver. Keys outside the table are invisible to the capture engine; no
//! attempt is made to detect the actual layout.

/// Every key in the table, in keycode-table order.
pub const KEYS: &[&str] = &[
    // Function row
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
    // Number row
    "`", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "-", "=", "\\",
    // Upper row
    "q", "w", "e", "r", "t", "y", "u", "i", "o", "p", "[", "]",
    // Home row
    "a", "s", "d", "f", "g", "h", "j", "k", "l", ";", "'",
    // Bottom row
    "z", "x", "c", "v", "b", "n", "m", ",", ".", "/",
    // Space bar
    "space",
];

/// Convert an X11 keycode to its key name.
pub fn keycode_to_key(code: u8) -> Option<&'static str> {
    let key = match code {
        // Function row
        67 => "F1",
        68 => "F2",
        69 => "F3",
        70 => "F4",
        71 => "F5",
        72 => "F6",
        73 => "F7",
        74 => "F8",
        75 => "F9",
        76 => "F10",
        95 => "F11",
        96 => "F12",

        // Number row
        49 => "`",
        10 => "1",
        11 => "2",
        12 => "3",
        13 => "4",
        14 => "5",
        15 => "6",
        16 => "7",
        17 => "8",
        18 => "9",
        19 => "0",
        20 => "-",
        21 => "=",
        51 => "\\",

        // Upper row
        24 => "q",
        25 => "w",
        26 => "e",
        27 => "r",
        28 => "t",
        29 => "y",
        30 => "u",
        31 => "i",
        32 => "o",
        33 => "p",
        34 => "[",
        35 => "]",

        // Home row
        38 => "a",
        39 => "s",
        40 => "d",
        41 => "f",
        42 => "g",
        43 => "h",
        44 => "j",
        45 => "k",
        46 => "l",
        47 => ";",
        48 => "'",

        // Bottom row
        52 => "z",
        53 => "x",
        54 => "c",
        55 => "v",
        56 => "b",
        57 => "n",
        58 => "m",
        59 => ",",
        60 => ".",
        61 => "/",

        65 => "space",

        _ => return None,
    };
    Some(key)
}

/// Convert a key name to its X11 keycode.
pub fn key_to_keycode(key: &str) -> Option<u8> {
    let code = match key {
        // Function row
        "F1" => 67,
        "F2" => 68,
        "F3" => 69,
        "F4" => 70,
        "F5" => 71,
        "F6" => 72,
        "F7" => 73,
        "F8" => 74,
        "F9" => 75,
        "F10" => 76,
        "F11" => 95,
        "F12" => 96,

        // Number row
        "`" => 49,
        "1" => 10,
        "2" => 11,
        "3" => 12,
        "4" => 13,
        "5" => 14,
        "6" => 15,
        "7" => 16,
        "8" => 17,
        "9" => 18,
        "0" => 19,
        "-" => 20,
        "=" => 21,
        "\\" => 51,

        // Upper row
        "q" => 24,
        "w" => 25,
        "e" => 26,
        "r" => 27,
        "t" => 28,
        "y" => 29,
        "u" => 30,
        "i" => 31,
        "o" => 32,
        "p" => 33,
        "[" => 34,
        "]" => 35,

        // Home row
        "a" => 38,
        "s" => 39,
        "d" => 40,
        "f" => 41,
        "g" => 42,
        "h" => 43,
        "j" => 44,
        "k" => 45,
        "l" => 46,
        ";" => 47,
        "'" => 48,

        // Bottom row
        "z" => 52,
        "x" => 53,
        "c" => 54,
        "v" => 55,
        "b" => 56,
        "n" => 57,
        "m" => 58,
        "," => 59,
        "." => 60,
        "/" => 61,

        "space" => 65,

        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keycode_round_trips() {
        for code in 0..=u8::MAX {
            if let Some(key) = keycode_to_key(code) {
                assert_eq!(key_to_keycode(key), Some(code), "key {key:?}");
            }
        }
    }

    #[test]
    fn test_keys_list_matches_table() {
        let mapped = (0..=u8::MAX).filter_map(keycode_to_key).count();
        assert_eq!(KEYS.len(), mapped);
        for key in KEYS {
            let code = key_to_keycode(key).expect("listed key has a keycode");
            assert_eq!(keycode_to_key(code), Some(*key));
        }
    }

    #[test]
    fn test_untracked_keys() {
        // Escape, Shift_L, Return
        assert_eq!(keycode_to_key(9), None);
        assert_eq!(keycode_to_key(50), None);
        assert_eq!(keycode_to_key(36), None);
        assert_eq!(key_to_keycode("Escape"), None);
        assert_eq!(key_to_keycode("A"), None);
        assert_eq!(key_to_keycode(""), None);
    }

    #[test]
    fn test_known_positions() {
        assert_eq!(key_to_keycode("a"), Some(38));
        assert_eq!(key_to_keycode("space"), Some(65));
        assert_eq!(key_to_keycode("F11"), Some(95));
        assert_eq!(keycode_to_key(51), Some("\\"));
    }
}
