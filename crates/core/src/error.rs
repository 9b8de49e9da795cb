/// Result alias that carries the custom [`BeatVizError`] type.
pub type Result<T> = std::result::Result<T, BeatVizError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BeatVizError {
    /// Free-form message for conditions that have no dedicated variant.
    #[error("{0}")]
    Message(String),
    /// A configuration value was rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No animation is registered under the requested class name.
    #[error("unknown animation class `{0}`")]
    UnknownAnimation(String),
    /// The animation has no parameter with the requested object name.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    /// A parameter refused the provided value.
    #[error("invalid value `{value}` for parameter `{parameter}`")]
    InvalidValue { parameter: String, value: String },
    /// The role identifier is not part of the registered role space.
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    /// The role exists but nothing is currently bound to it.
    #[error("role `{0}` is not bound")]
    UnboundRole(String),
    /// A binding referenced a group or animation that no longer exists.
    #[error("target not found: {0}")]
    TargetNotFound(String),
    /// The clock source delivered a tick that does not follow the last one.
    #[error("tick {tick} delivered after tick {last}")]
    OutOfOrderTick { tick: u64, last: u64 },
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl BeatVizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid_value(parameter: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter: parameter.to_string(),
            value: value.into(),
        }
    }
}

impl From<&str> for BeatVizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatVizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
