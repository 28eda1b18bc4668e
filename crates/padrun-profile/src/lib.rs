mod error;
mod mappings;

pub use crate::error::{ConfigFormatError, ProfileError};
pub use crate::mappings::{
    FunctionMap, KeyBindings, Loaded, Mappings, PadMapping,
};
