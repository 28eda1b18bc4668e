pub mod injector;
pub mod logging;
pub mod runner;
pub mod session;

pub use crate::injector::{compile_key_table, KeyInjector, NO_SCAN_CODE};
pub use crate::runner::{Runner, RunnerError};
pub use crate::session::{SessionGuard, SessionSlot};
