//! UploadTrigger library for starting AWS Step Functions executions from S3 events.
//!
//! This library processes S3 events triggered when objects are uploaded to an input bucket,
//! extracts the bucket name and object key of each record, and starts one execution of the
//! configured state machine per record with `{"bucket": ..., "key": ...}` as its input.

mod config;
mod error;

pub use config::{Config, STATE_MACHINE_ARN_VAR, VERBOSE_VAR, verbose_from_env};
pub use error::TriggerError;

use anyhow::Result;
use aws_lambda_events::s3::{S3Event, S3EventRecord};
use aws_sdk_sfn::operation::start_execution::StartExecutionOutput;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;
use std::borrow::Cow;

pub const APP_NAME: &str = "uploadtrigger";

pub const STARTED_BODY: &str = "Started the state machine execution.";

/// Sets up a stdout logger: DEBUG (verbose) or INFO for this crate and `calling_module`,
/// WARN for everything else.
pub fn set_up_logger<T>(calling_module: T, verbose: bool) -> Result<()>
where
    T: Into<Cow<'static, str>>,
{
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(APP_NAME, level)
        .level_for(calling_module, level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

/// Input of one state machine execution, copied verbatim from an S3 event record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkflowInput {
    pub bucket: String,
    pub key: String,
}

impl TryFrom<&S3EventRecord> for WorkflowInput {
    type Error = TriggerError;

    fn try_from(record: &S3EventRecord) -> Result<Self, Self::Error> {
        let bucket = record.s3.bucket.name.clone().ok_or_else(|| {
            TriggerError::MalformedEvent(format!("Bucket not found in {record:?}"))
        })?;

        let key = record.s3.object.key.clone().ok_or_else(|| {
            TriggerError::MalformedEvent(format!("Key not found in {record:?}"))
        })?;

        Ok(Self { bucket, key })
    }
}

/// A started execution, as reported by StartExecution.
///
/// `start_date` is `None` when the reported date cannot be represented as a UTC timestamp; the
/// execution has still started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStarted {
    pub bucket: String,
    pub key: String,
    pub execution_arn: String,
    pub start_date: Option<DateTime<Utc>>,
}

impl ExecutionStarted {
    fn new(input: &WorkflowInput, output: &StartExecutionOutput) -> Self {
        let reported = output.start_date();
        let start_date = DateTime::from_timestamp(reported.secs(), reported.subsec_nanos());
        if start_date.is_none() {
            warn!("Unrepresentable start date for {}: {reported:?}", output.execution_arn());
        }

        Self {
            bucket: input.bucket.clone(),
            key: input.key.clone(),
            execution_arn: output.execution_arn().to_string(),
            start_date,
        }
    }
}

/// The value returned to the Lambda runtime once every execution has started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: String,
}

impl Response {
    pub fn started() -> Self {
        Self {
            status_code: 200,
            body: STARTED_BODY.to_string(),
        }
    }
}

/// Forwards S3 upload notifications to a Step Functions state machine.
#[derive(Clone, Debug)]
pub struct Trigger {
    sfn_client: aws_sdk_sfn::Client,
    config: Config,
}

impl Trigger {
    pub fn new(sfn_client: aws_sdk_sfn::Client, config: Config) -> Self {
        Self { sfn_client, config }
    }

    /// Extracts one [`WorkflowInput`] per record, in record order.
    ///
    /// # Errors
    /// * Returns [`TriggerError::MalformedEvent`] if there are no records, or if any record
    ///   lacks a bucket name or object key
    pub fn workflow_inputs(event: &S3Event) -> Result<Vec<WorkflowInput>, TriggerError> {
        if event.records.is_empty() {
            return Err(TriggerError::MalformedEvent(
                "No records found in S3 event".to_string(),
            ));
        }

        event.records.iter().map(WorkflowInput::try_from).collect()
    }

    /// Starts a single execution of the configured state machine.
    ///
    /// # Arguments
    /// * `input` - Bucket and key passed to the execution as its JSON input
    ///
    /// # Returns
    /// * `Result<ExecutionStarted, TriggerError>` - The execution ARN and start date reported by
    ///   Step Functions
    ///
    /// # Errors
    /// * Returns [`TriggerError::StartExecution`] with the SDK error if the call fails
    /// * Returns [`TriggerError::InvalidInput`] if `input` cannot be serialized
    pub async fn start_execution(
        &self,
        input: &WorkflowInput,
    ) -> Result<ExecutionStarted, TriggerError> {
        let state_machine_arn = &self.config.state_machine_arn;
        debug!(
            "Start Execution: {state_machine_arn} <-- {}:{}",
            input.bucket, input.key
        );

        let output = self
            .sfn_client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .input(serde_json::to_string(input)?)
            .send()
            .await?;

        let started = ExecutionStarted::new(input, &output);
        info!(
            "Start Execution Succeeded: {} <-- {}:{}",
            started.execution_arn, started.bucket, started.key
        );

        Ok(started)
    }

    /// Starts one execution per record of `event`.
    ///
    /// Every record is validated before the first execution is started, so a malformed event
    /// starts nothing. Executions are started concurrently and the first failure is returned;
    /// starts still in flight at that point are dropped and not logged.
    ///
    /// # Arguments
    /// * `event` - S3 event containing records of uploaded objects
    ///
    /// # Returns
    /// * `Result<Vec<ExecutionStarted>, TriggerError>` - One entry per record, in record order
    ///
    /// # Errors
    /// * Returns [`TriggerError::MalformedEvent`] if the event has no records or a record lacks
    ///   its bucket name or object key
    /// * Returns the first error from [`Trigger::start_execution`]
    pub async fn trigger(&self, event: &S3Event) -> Result<Vec<ExecutionStarted>, TriggerError> {
        debug!("Event: {event:?}");

        let inputs = Self::workflow_inputs(event)?;
        debug!("{} execution(s) to start", inputs.len());

        try_join_all(inputs.iter().map(|input| self.start_execution(input))).await
    }

    /// Handles one S3 event, answering with the fixed [`Response::started`] on success.
    ///
    /// The StartExecution responses are logged, never returned.
    ///
    /// # Arguments
    /// * `event` - S3 event delivered to the Lambda
    ///
    /// # Errors
    /// * Returns any error from [`Trigger::trigger`], unchanged
    pub async fn handle(&self, event: &S3Event) -> Result<Response, TriggerError> {
        self.trigger(event).await?;

        Ok(Response::started())
    }
}
