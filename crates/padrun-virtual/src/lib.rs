mod button;
mod pad;

pub use crate::button::{
    aux_button_count, ParseButtonError, VirtualButton, ALL_VIRTUAL_BUTTONS,
    NON_AUX_VIRTUAL_BUTTONS,
};
pub use crate::pad::{
    PadMap, VirtualChange, VirtualPad, VirtualReport, MODIFIER_TAP_RELEASE,
};
