//! Error types for the core engine.

/// Failures the core can report. Every variant here is a configuration
/// error caught at construction time (see `NeatConfig::validate`); the
/// core never wraps the caller's fitness function in this type — if it
/// panics or returns something degenerate, that is the caller's concern.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum NeatError {
    #[error("sensor count must be greater than zero")]
    InvalidSensorCount,

    #[error("output count must be greater than zero")]
    InvalidOutputCount,

    #[error("demography (population size) must be greater than zero")]
    InvalidDemography,

    #[error("unknown initial topology: {0}")]
    UnknownInitialTopology(String),

    #[error("sensor name list has {got} entries, expected {expected}")]
    SensorNameCountMismatch { expected: usize, got: usize },

    #[error("output name list has {got} entries, expected {expected}")]
    OutputNameCountMismatch { expected: usize, got: usize },
}
