use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Virtual buttons that are not auxiliary: the four face buttons, four
/// shoulders, two modifiers and two stick clicks. Devices with more physical
/// buttons than this map the surplus to aux slots.
pub const NON_AUX_VIRTUAL_BUTTONS: usize = 12;

/// How many of a device's physical buttons land on aux slots, capped by the
/// five aux identities available.
pub fn aux_button_count(physical_buttons: u16) -> usize {
    usize::from(physical_buttons)
        .saturating_sub(NON_AUX_VIRTUAL_BUTTONS)
        .min(5)
}

/// Device-independent button identity used by the mapping layers.
///
/// The `StartShifted*`/`MenuShifted*` variants are the alternate identities a
/// shiftable button takes while the corresponding modifier is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VirtualButton {
    X,
    A,
    B,
    Y,
    L1,
    R1,
    L2,
    R2,
    Start,
    Menu,
    L3,
    R3,
    Aux1,
    Aux2,
    Aux3,
    Aux4,
    Aux5,
    HatUp,
    HatRight,
    HatDown,
    HatLeft,
    StartShiftedX,
    StartShiftedA,
    StartShiftedB,
    StartShiftedY,
    StartShiftedL1,
    StartShiftedR1,
    StartShiftedL2,
    StartShiftedR2,
    MenuShiftedX,
    MenuShiftedA,
    MenuShiftedB,
    MenuShiftedY,
    MenuShiftedL1,
    MenuShiftedR1,
    MenuShiftedL2,
    MenuShiftedR2,
}

use self::VirtualButton::*;

/// Every variant in index order.
pub const ALL_VIRTUAL_BUTTONS: [VirtualButton; VirtualButton::COUNT] = [
    X,
    A,
    B,
    Y,
    L1,
    R1,
    L2,
    R2,
    Start,
    Menu,
    L3,
    R3,
    Aux1,
    Aux2,
    Aux3,
    Aux4,
    Aux5,
    HatUp,
    HatRight,
    HatDown,
    HatLeft,
    StartShiftedX,
    StartShiftedA,
    StartShiftedB,
    StartShiftedY,
    StartShiftedL1,
    StartShiftedR1,
    StartShiftedL2,
    StartShiftedR2,
    MenuShiftedX,
    MenuShiftedA,
    MenuShiftedB,
    MenuShiftedY,
    MenuShiftedL1,
    MenuShiftedR1,
    MenuShiftedL2,
    MenuShiftedR2,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown virtual button \"{0}\"")]
pub struct ParseButtonError(pub String);

impl VirtualButton {
    pub const COUNT: usize = 37;

    /// Stable position in the state vector.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_VIRTUAL_BUTTONS.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            X => "X",
            A => "A",
            B => "B",
            Y => "Y",
            L1 => "L1",
            R1 => "R1",
            L2 => "L2",
            R2 => "R2",
            Start => "Start",
            Menu => "Menu",
            L3 => "L3",
            R3 => "R3",
            Aux1 => "Aux1",
            Aux2 => "Aux2",
            Aux3 => "Aux3",
            Aux4 => "Aux4",
            Aux5 => "Aux5",
            HatUp => "HatUp",
            HatRight => "HatRight",
            HatDown => "HatDown",
            HatLeft => "HatLeft",
            StartShiftedX => "StartShiftedX",
            StartShiftedA => "StartShiftedA",
            StartShiftedB => "StartShiftedB",
            StartShiftedY => "StartShiftedY",
            StartShiftedL1 => "StartShiftedL1",
            StartShiftedR1 => "StartShiftedR1",
            StartShiftedL2 => "StartShiftedL2",
            StartShiftedR2 => "StartShiftedR2",
            MenuShiftedX => "MenuShiftedX",
            MenuShiftedA => "MenuShiftedA",
            MenuShiftedB => "MenuShiftedB",
            MenuShiftedY => "MenuShiftedY",
            MenuShiftedL1 => "MenuShiftedL1",
            MenuShiftedR1 => "MenuShiftedR1",
            MenuShiftedL2 => "MenuShiftedL2",
            MenuShiftedR2 => "MenuShiftedR2",
        }
    }

    /// Shifted identities of a shiftable button, `(start, menu)`.
    pub fn shifted(self) -> Option<(VirtualButton, VirtualButton)> {
        match self {
            X => Some((StartShiftedX, MenuShiftedX)),
            A => Some((StartShiftedA, MenuShiftedA)),
            B => Some((StartShiftedB, MenuShiftedB)),
            Y => Some((StartShiftedY, MenuShiftedY)),
            L1 => Some((StartShiftedL1, MenuShiftedL1)),
            R1 => Some((StartShiftedR1, MenuShiftedR1)),
            L2 => Some((StartShiftedL2, MenuShiftedL2)),
            R2 => Some((StartShiftedR2, MenuShiftedR2)),
            _ => None,
        }
    }
}

impl fmt::Display for VirtualButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VirtualButton {
    type Err = ParseButtonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_VIRTUAL_BUTTONS
            .iter()
            .find(|b| b.name() == s)
            .copied()
            .ok_or_else(|| ParseButtonError(s.to_string()))
    }
}

impl Serialize for VirtualButton {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for VirtualButton {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
