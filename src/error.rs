//! Configuration errors.
//!
//! Everything in this enum is detected while building the catalog, the
//! grid, the rule set, or the compiled model — always before the solving
//! capability is invoked. A compilation that fails never submits a
//! partial model for solving.
//!
//! Infeasibility and budget exhaustion are *not* errors: they are
//! terminal [`SolveStatus`](crate::models::SolveStatus) values reported
//! by the solver.

use thiserror::Error;

/// An error in the problem configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A session row has a blank required field.
    #[error("session row {row} is missing required field `{field}`")]
    MissingField { row: usize, field: &'static str },

    /// A session row declares zero or negative weekly hours.
    #[error("session row {row} declares non-positive weekly hours ({hours})")]
    NonPositiveHours { row: usize, hours: f64 },

    /// Declared hours do not divide evenly by the slot granularity.
    ///
    /// Never silently rounded: the caller must pick a granularity that
    /// divides every declared duration.
    #[error(
        "weekly hours {hours} do not divide evenly into {granularity_minutes}-minute slots \
         (session row {row})"
    )]
    NonIntegralQuota {
        row: usize,
        hours: f64,
        granularity_minutes: u32,
    },

    /// The slot granularity must be a positive number of minutes.
    #[error("slot granularity must be a positive number of minutes")]
    ZeroGranularity,

    /// A rule override names a rule that is not registered.
    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    /// Two rules were registered under the same name.
    #[error("duplicate rule `{0}`")]
    DuplicateRule(String),

    /// The slot grid is structurally invalid.
    #[error("malformed slot grid: {0}")]
    MalformedGrid(String),

    /// A rule references a slot outside the grid.
    #[error("rule `{rule}` references a slot outside the grid (day {day}, period {period})")]
    SlotOutOfRange {
        rule: String,
        day: usize,
        period: usize,
    },

    /// A generation was requested before any session data was loaded.
    #[error("no session data loaded")]
    NoSessionData,
}
