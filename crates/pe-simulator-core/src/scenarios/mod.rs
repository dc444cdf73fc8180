pub mod sensitivity;

pub use sensitivity::{
    run_sensitivity, OutputMetric, SensitivityInput, SensitivityOutput, SensitivityVariable,
    SimulationParameter,
};
