use crate::error::TriggerError;
use std::env;

pub const STATE_MACHINE_ARN_VAR: &str = "STATE_MACHINE_ARN";
pub const VERBOSE_VAR: &str = "VERBOSE";

/// Settings fixed for the lifetime of a [`crate::Trigger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub state_machine_arn: String,
}

impl Config {
    pub fn new<S>(state_machine_arn: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            state_machine_arn: state_machine_arn.into(),
        }
    }

    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// * Returns [`TriggerError::MissingConfiguration`] if `STATE_MACHINE_ARN` is unset or empty
    pub fn from_env() -> Result<Self, TriggerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TriggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let state_machine_arn = lookup(STATE_MACHINE_ARN_VAR)
            .filter(|arn| !arn.trim().is_empty())
            .ok_or(TriggerError::MissingConfiguration(STATE_MACHINE_ARN_VAR))?;

        Ok(Self::new(state_machine_arn))
    }
}

/// Whether the environment asks for DEBUG logging.
pub fn verbose_from_env() -> bool {
    is_truthy(env::var(VERBOSE_VAR).ok().as_deref())
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true")
    )
}
