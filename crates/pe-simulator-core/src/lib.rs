pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "simulator")]
pub mod simulator;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::SimulatorError;
pub use types::*;

/// Standard result type for all simulator operations
pub type SimulatorResult<T> = Result<T, SimulatorError>;
