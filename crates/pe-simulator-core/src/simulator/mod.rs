//! Private equity / private debt investment simulator.
//!
//! The pipeline runs in dependency order: fee model, schedule generator,
//! recycling & cash engine, aggregator. Every stage is a pure function of the
//! [`SimulationInput`](params::SimulationInput); nothing is carried between
//! runs.

pub mod aggregate;
pub mod compare;
pub mod engine;
pub mod fees;
pub mod params;
pub mod recycling;
pub mod schedule;

pub use engine::{project, simulate, SimulationOutput};
pub use params::{
    validate_input, DebtSchedule, InvestorProfile, ManualCalendar, ReturnMethod,
    SimulationInput, Strategy,
};
