use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// PC Set-1 make code. Extended keys carry the `0xE0` prefix in the high
/// byte, so any value above `0xFF` needs the extended-key flag when
/// synthesized.
pub type ScanCode = u16;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown key \"{0}\"")]
pub struct ParseKeyError(pub String);

macro_rules! keys {
    ( $( $variant:ident = $sc:literal ),+ $(,)? ) => {
        /// Keyboard keys addressable by the bindings tables.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $( $variant, )+
        }

        /// Every key, in declaration order.
        pub const ALL_KEYS: &[Key] = &[ $( Key::$variant, )+ ];

        impl Key {
            /// Set-1 make code of this key.
            pub fn scan_code(self) -> ScanCode {
                match self {
                    $( Key::$variant => $sc, )+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( Key::$variant => stringify!($variant), )+
                }
            }
        }
    };
}

keys! {
    Escape = 0x01,
    D1 = 0x02,
    D2 = 0x03,
    D3 = 0x04,
    D4 = 0x05,
    D5 = 0x06,
    D6 = 0x07,
    D7 = 0x08,
    D8 = 0x09,
    D9 = 0x0A,
    D0 = 0x0B,
    Minus = 0x0C,
    Equals = 0x0D,
    Backspace = 0x0E,
    Tab = 0x0F,
    Q = 0x10,
    W = 0x11,
    E = 0x12,
    R = 0x13,
    T = 0x14,
    Y = 0x15,
    U = 0x16,
    I = 0x17,
    O = 0x18,
    P = 0x19,
    LeftBracket = 0x1A,
    RightBracket = 0x1B,
    Enter = 0x1C,
    LeftCtrl = 0x1D,
    A = 0x1E,
    S = 0x1F,
    D = 0x20,
    F = 0x21,
    G = 0x22,
    H = 0x23,
    J = 0x24,
    K = 0x25,
    L = 0x26,
    Semicolon = 0x27,
    Apostrophe = 0x28,
    Grave = 0x29,
    LeftShift = 0x2A,
    Backslash = 0x2B,
    Z = 0x2C,
    X = 0x2D,
    C = 0x2E,
    V = 0x2F,
    B = 0x30,
    N = 0x31,
    M = 0x32,
    Comma = 0x33,
    Period = 0x34,
    Slash = 0x35,
    RightShift = 0x36,
    NumPadMultiply = 0x37,
    LeftAlt = 0x38,
    Space = 0x39,
    CapsLock = 0x3A,
    F1 = 0x3B,
    F2 = 0x3C,
    F3 = 0x3D,
    F4 = 0x3E,
    F5 = 0x3F,
    F6 = 0x40,
    F7 = 0x41,
    F8 = 0x42,
    F9 = 0x43,
    F10 = 0x44,
    NumPad7 = 0x47,
    NumPad8 = 0x48,
    NumPad9 = 0x49,
    NumPadMinus = 0x4A,
    NumPad4 = 0x4B,
    NumPad5 = 0x4C,
    NumPad6 = 0x4D,
    NumPadPlus = 0x4E,
    NumPad1 = 0x4F,
    NumPad2 = 0x50,
    NumPad3 = 0x51,
    NumPad0 = 0x52,
    NumPadDecimal = 0x53,
    F11 = 0x57,
    F12 = 0x58,
    NumPadEnter = 0xE01C,
    RightCtrl = 0xE01D,
    NumPadDivide = 0xE035,
    RightAlt = 0xE038,
    Home = 0xE047,
    Up = 0xE048,
    PageUp = 0xE049,
    Left = 0xE04B,
    Right = 0xE04D,
    End = 0xE04F,
    Down = 0xE050,
    PageDown = 0xE051,
    Insert = 0xE052,
    Delete = 0xE053,
}

impl Key {
    /// Whether synthesis of this key needs the extended-key flag.
    pub fn is_extended(self) -> bool {
        self.scan_code() > 0xFF
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KEYS
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| ParseKeyError(s.to_string()))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for key in ALL_KEYS {
            assert_eq!(key.name().parse::<Key>(), Ok(*key));
        }
        assert!("SuperKey".parse::<Key>().is_err());
    }

    #[test]
    fn arrow_and_nav_keys_are_extended() {
        for key in [Key::Up, Key::Down, Key::Left, Key::Right, Key::Delete, Key::PageDown, Key::End] {
            assert!(key.is_extended(), "{key}");
            assert_eq!(key.scan_code() >> 8, 0xE0);
        }
        for key in [Key::LeftAlt, Key::LeftShift, Key::Space, Key::F6, Key::NumPad0] {
            assert!(!key.is_extended(), "{key}");
        }
    }

    #[test]
    fn scan_codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for key in ALL_KEYS {
            assert!(seen.insert(key.scan_code()), "duplicate code for {key}");
        }
    }

    #[test]
    fn known_make_codes() {
        assert_eq!(Key::LeftAlt.scan_code(), 0x38);
        assert_eq!(Key::F6.scan_code(), 0x40);
        assert_eq!(Key::Up.scan_code(), 0xE048);
        assert_eq!(Key::D1.scan_code(), 0x02);
        assert_eq!(Key::D0.scan_code(), 0x0B);
    }
}
