use thiserror::Error;

/// Errors surfaced while assembling and sealing an immunity model.
///
/// Both variants indicate problems that must be fixed before a simulation
/// starts: bad scenario data for `ConfigurationIncomplete`, a caller bug for
/// `PreconditionViolated`. Neither is a transient runtime condition, so there
/// is no retry path anywhere in this crate.
#[derive(Debug, Error)]
pub enum ImmunityError {
    /// A registered event type or variant lacks a required table row, or a
    /// supplied parameter is outside its valid range. Detected eagerly when
    /// the model is sealed, before any simulated day runs.
    #[error("incomplete immunity configuration: {0}")]
    ConfigurationIncomplete(String),

    /// The caller broke an API precondition, e.g. writing a table cell for an
    /// ID that was never registered. Indicates an integration bug rather than
    /// bad scenario data.
    #[error("immunity engine precondition violated: {0}")]
    PreconditionViolated(String),
}
