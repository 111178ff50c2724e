//! Dispatcher configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// How strictly a resolved handler's parameter must match the registered event type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// The parameter type must equal the event type.
    #[default]
    Strict,
    /// A parameter accepting a supertype of the event type is also accepted.
    Permissive,
}

/// Whether `add_listener` may register capabilities on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    Disabled,
    Enabled,
    /// Enabled until client code calls `register` explicitly.
    #[default]
    UntilExplicitRegistration,
}

/// What `clear` wipes besides the registration table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Subscriptions survive and become orphaned until their event types are registered again.
    #[default]
    KeepListeners,
    /// Subscriptions are dropped too.
    Everything,
}

#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(pattern = "immutable", default)]
#[serde(default)]
pub struct BlackboardConfig {
    pub resolution: ResolutionMode,
    pub inference: InferenceMode,
    /// Validate every marked method of a capability hierarchy at registration time.
    pub construction_check: bool,
    pub clear_policy: ClearPolicy,
    /// Emit per-listener trace lines while subscribing and dispatching.
    pub verbose: bool,
}

impl Default for BlackboardConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionMode::default(),
            inference: InferenceMode::default(),
            construction_check: true,
            clear_policy: ClearPolicy::default(),
            verbose: false,
        }
    }
}

impl BlackboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `BLACKBOARD_*` environment variables, falling back to defaults for
    /// anything missing or malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            resolution: env_enum("BLACKBOARD_RESOLUTION").unwrap_or(defaults.resolution),
            inference: env_enum("BLACKBOARD_INFERENCE").unwrap_or(defaults.inference),
            construction_check: env_bool("BLACKBOARD_CONSTRUCTION_CHECK")
                .unwrap_or(defaults.construction_check),
            clear_policy: env_enum("BLACKBOARD_CLEAR_POLICY").unwrap_or(defaults.clear_policy),
            verbose: env_bool("BLACKBOARD_VERBOSE").unwrap_or(defaults.verbose),
        }
    }
}

/// Settings for [`setup_logging`](crate::logging::setup_logging).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Directory for daily rolling log files. Console only when unset.
    pub logs_path: Option<PathBuf>,
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "blackboard=info".to_string(),
            logs_path: None,
            max_log_files: 7,
        }
    }
}

fn env_enum<T: DeserializeOwned>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase())) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {key}={raw:?}: {e}");
            None
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring {key}={raw:?}: expected a boolean");
            None
        }
    }
}
