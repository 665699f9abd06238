use aws_sdk_sfn::error::SdkError;
use aws_sdk_sfn::operation::start_execution::StartExecutionError;
use thiserror::Error;

/// Errors from forwarding an upload notification to a state machine.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The notification has no records, or a record lacks its bucket name or object key.
    #[error("malformed upload notification: {0}")]
    MalformedEvent(String),
    /// A required setting is absent.
    #[error("missing configuration: {0} is not set")]
    MissingConfiguration(&'static str),
    /// The StartExecution call failed. Carried as returned by the SDK.
    #[error(transparent)]
    StartExecution(#[from] SdkError<StartExecutionError>),
    #[error("could not serialize state machine input: {0}")]
    InvalidInput(#[from] serde_json::Error),
}
