use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use padrun_keysend::Key;
use padrun_virtual::{
    aux_button_count, PadMap, VirtualButton, NON_AUX_VIRTUAL_BUTTONS,
};

use crate::error::{ConfigFormatError, ProfileError};

use padrun_virtual::VirtualButton::*;

/// Ordered physical-slot to virtual-button table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PadMapping {
    slots: Vec<VirtualButton>,
}

impl Default for PadMapping {
    fn default() -> Self {
        Self {
            slots: vec![
                X, A, B, Y, L1, R1, L2, R2, Start, Menu, L3, R3, Aux1, Aux2,
                Aux3, Aux4, Aux5,
            ],
        }
    }
}

impl PadMapping {
    pub fn slots(&self) -> &[VirtualButton] {
        &self.slots
    }

    /// Concrete per-device map: one entry per physical button, surplus
    /// buttons beyond the mapped slots left unbound.
    pub fn for_device(&self, button_count: u16) -> PadMap {
        let mapped = (NON_AUX_VIRTUAL_BUTTONS + aux_button_count(button_count))
            .min(usize::from(button_count))
            .min(self.slots.len());
        let mut slots: Vec<Option<VirtualButton>> =
            self.slots[..mapped].iter().copied().map(Some).collect();
        slots.resize(usize::from(button_count), None);
        PadMap::new(slots)
    }
}

/// Virtual button to game-function label. An empty label means the button is
/// deliberately bound to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FunctionMap {
    entries: BTreeMap<VirtualButton, String>,
}

impl Default for FunctionMap {
    fn default() -> Self {
        let pairs: &[(VirtualButton, &str)] = &[
            (HatUp, "Up"),
            (HatDown, "Down"),
            (HatLeft, "Left"),
            (HatRight, "Right"),
            (X, "Jump"),
            (A, "Action"),
            (B, "Roll"),
            (Y, "Draw"),
            (L1, "Look"),
            (R1, "Walk"),
            (L2, "Duck"),
            (R2, "Dash"),
            (Start, "Inventory"),
            (Menu, "Pause"),
            (L3, "Quick Load"),
            (R3, "Quick Save"),
            (StartShiftedX, "3"),
            (StartShiftedA, "1"),
            (StartShiftedB, "2"),
            (StartShiftedY, "4"),
            (StartShiftedL1, "5"),
            (StartShiftedR1, "Flare"),
            (StartShiftedL2, "6"),
            (StartShiftedR2, "7"),
            (MenuShiftedX, ""),
            (MenuShiftedA, ""),
            (MenuShiftedB, ""),
            (MenuShiftedY, ""),
            (MenuShiftedL1, "9"),
            (MenuShiftedR1, ""),
            (MenuShiftedL2, "0"),
            (MenuShiftedR2, "8"),
            (Aux1, ""),
            (Aux2, ""),
            (Aux3, ""),
            (Aux4, ""),
        ];
        Self {
            entries: pairs
                .iter()
                .map(|&(b, f)| (b, f.to_string()))
                .collect(),
        }
    }
}

impl FunctionMap {
    /// Function label bound to `button`, if any. Absent and empty entries
    /// both read as unbound.
    pub fn function(&self, button: VirtualButton) -> Option<&str> {
        self.entries
            .get(&button)
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    pub fn set(&mut self, button: VirtualButton, function: impl Into<String>) {
        self.entries.insert(button, function.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Game-function label to keyboard key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyBindings {
    entries: BTreeMap<String, Key>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let pairs: &[(&str, Key)] = &[
            ("Up", Key::Up),
            ("Right", Key::Right),
            ("Down", Key::Down),
            ("Left", Key::Left),
            ("Duck", Key::Period),
            ("Dash", Key::Slash),
            ("Walk", Key::LeftShift),
            ("Jump", Key::LeftAlt),
            ("Action", Key::LeftCtrl),
            ("Draw", Key::Space),
            ("Flare", Key::Comma),
            ("Look", Key::NumPad0),
            ("Roll", Key::End),
            ("Inventory", Key::Escape),
            ("StepLeft", Key::Delete),
            ("StepRight", Key::PageDown),
            ("1", Key::D1),
            ("2", Key::D2),
            ("3", Key::D3),
            ("4", Key::D4),
            ("5", Key::D5),
            ("6", Key::D6),
            ("7", Key::D7),
            ("8", Key::D8),
            ("9", Key::D9),
            ("0", Key::D0),
            ("Quick Load", Key::F6),
            ("Quick Save", Key::F5),
            ("Pause", Key::P),
        ];
        Self {
            entries: pairs
                .iter()
                .map(|&(f, k)| (f.to_string(), k))
                .collect(),
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, function: &str) -> Option<Key> {
        self.entries.get(function).copied()
    }

    pub fn set(&mut self, function: impl Into<String>, key: Key) {
        self.entries.insert(function.into(), key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three tables the input pipeline is configured from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mappings {
    pub gamepad: PadMapping,
    pub functions: FunctionMap,
    pub keys: KeyBindings,
}

/// Outcome of a lenient load: usable mappings plus every malformed entry
/// that was skipped or defaulted.
#[derive(Debug)]
pub struct Loaded {
    pub mappings: Mappings,
    pub issues: Vec<ConfigFormatError>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMappings {
    #[serde(default)]
    gamepad: Option<Vec<String>>,
    #[serde(default)]
    functions: Option<BTreeMap<String, String>>,
    #[serde(default)]
    keys: Option<BTreeMap<String, String>>,
}

impl Mappings {
    pub fn load(path: &Path) -> Result<Loaded, ProfileError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parses the YAML document, falling back to defaults entry-by-entry.
    /// Only unreadable YAML is a hard error.
    pub fn from_yaml(text: &str) -> Result<Loaded, ProfileError> {
        let raw: RawMappings = serde_yaml::from_str(text)?;
        let mut mappings = Mappings::default();
        let mut issues = Vec::new();

        if let Some(slots) = raw.gamepad {
            for (i, entry) in slots.iter().enumerate() {
                match entry.parse::<VirtualButton>() {
                    Ok(button) => {
                        if i < mappings.gamepad.slots.len() {
                            mappings.gamepad.slots[i] = button;
                        } else {
                            mappings.gamepad.slots.push(button);
                        }
                    }
                    Err(e) => issues.push(ConfigFormatError {
                        table: "gamepad",
                        entry: entry.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
        }

        if let Some(functions) = raw.functions {
            for (button, function) in functions {
                match button.parse::<VirtualButton>() {
                    Ok(button) => {
                        mappings.functions.entries.insert(button, function);
                    }
                    Err(e) => issues.push(ConfigFormatError {
                        table: "functions",
                        entry: button,
                        reason: e.to_string(),
                    }),
                }
            }
        }

        if let Some(keys) = raw.keys {
            for (function, key) in keys {
                match key.parse::<Key>() {
                    Ok(key) => {
                        mappings.keys.entries.insert(function, key);
                    }
                    Err(e) => issues.push(ConfigFormatError {
                        table: "keys",
                        entry: function,
                        reason: e.to_string(),
                    }),
                }
            }
        }

        Ok(Loaded { mappings, issues })
    }

    pub fn to_yaml(&self) -> Result<String, ProfileError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_have_the_documented_shape() {
        let mappings = Mappings::default();
        assert_eq!(mappings.gamepad.slots().len(), 17);
        assert_eq!(mappings.gamepad.slots()[0], X);
        assert_eq!(mappings.gamepad.slots()[8], Start);

        assert_eq!(mappings.functions.function(X), Some("Jump"));
        assert_eq!(mappings.functions.function(StartShiftedR1), Some("Flare"));
        // empty label and missing entry both read unbound
        assert_eq!(mappings.functions.function(Aux1), None);
        assert_eq!(mappings.functions.function(Aux5), None);

        assert_eq!(mappings.keys.key_for("Jump"), Some(Key::LeftAlt));
        assert_eq!(mappings.keys.key_for("Up"), Some(Key::Up));
        assert_eq!(mappings.keys.key_for("Quick Load"), Some(Key::F6));
        assert_eq!(mappings.keys.len(), 29);
    }

    #[test]
    fn yaml_round_trip_preserves_all_tables() {
        let mut original = Mappings::default();
        original.functions.set(Aux1, "StepLeft");
        original.keys.set("Flare", Key::F9);

        let text = original.to_yaml().unwrap();
        let loaded = Mappings::from_yaml(&text).unwrap();
        assert!(loaded.issues.is_empty());
        assert_eq!(loaded.mappings, original);
    }

    #[test]
    fn malformed_entries_fall_back_without_aborting() {
        let text = "\
gamepad:
  - Y
  - NotAButton
  - X
functions:
  L1: Sprint
  Bogus: Sprint
keys:
  Jump: RightAlt
  Draw: NotAKey
";
        let loaded = Mappings::from_yaml(text).unwrap();
        let mappings = &loaded.mappings;

        // slot 1 keeps its default, neighbours still parse
        assert_eq!(mappings.gamepad.slots()[0], Y);
        assert_eq!(mappings.gamepad.slots()[1], A);
        assert_eq!(mappings.gamepad.slots()[2], X);

        assert_eq!(mappings.functions.function(L1), Some("Sprint"));
        assert_eq!(mappings.keys.key_for("Jump"), Some(Key::RightAlt));
        // skipped entry leaves the default in place
        assert_eq!(mappings.keys.key_for("Draw"), Some(Key::Space));

        let tables: Vec<_> = loaded.issues.iter().map(|i| i.table).collect();
        assert_eq!(tables, vec!["gamepad", "functions", "keys"]);
    }

    #[test]
    fn empty_document_loads_pure_defaults() {
        let loaded = Mappings::from_yaml("{}").unwrap();
        assert!(loaded.issues.is_empty());
        assert_eq!(loaded.mappings, Mappings::default());
    }

    #[test]
    fn device_map_respects_the_aux_heuristic() {
        let mapping = PadMapping::default();

        // 13 buttons: all twelve base slots plus one aux
        let map = mapping.for_device(13);
        assert_eq!(map.len(), 13);
        assert_eq!(map.get(11), Some(R3));
        assert_eq!(map.get(12), Some(Aux1));

        // more buttons than mapped slots: surplus stays unbound
        let map = mapping.for_device(20);
        assert_eq!(map.len(), 20);
        assert_eq!(map.get(16), Some(Aux5));
        assert_eq!(map.get(17), None);

        // small device: truncated to its own button count
        let map = mapping.for_device(10);
        assert_eq!(map.len(), 10);
        assert_eq!(map.get(9), Some(Menu));
    }
}
