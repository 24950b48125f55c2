use std::fmt;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Custom error type for parallm operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing from the environment
    MissingApiKey(String)
  , /// Network unreachable, connection reset, TLS failure
    Transport(String)
  , /// Credential rejected by the endpoint
    Auth(String)
  , /// Endpoint throttled the request
    RateLimited(String)
  , /// Any other non-success response
    Api
    {   status: u16
      , message: String
    }
  , /// Payload did not have the expected shape
    MalformedResponse(String)
  , /// Per-call deadline exceeded
    Timeout(Duration)
  , /// Dispatch deadline elapsed before the call finished
    Abandoned(Duration)
  , /// A spawned model task panicked
    TaskPanicked(String)
  , /// No runtime to spawn model tasks onto
    FatalSubstrate(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Writing or reading a persisted batch failed
    Persistence(String)
  , /// Terminal or other local I/O failure
    Io(String)
}

/// Coarse error category, persisted next to the error detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind
{   Transport
  , Auth
  , RateLimit
  , Api
  , MalformedResponse
  , Timeout
  , Internal
  , FatalSubstrate
  , Configuration
  , Persistence
  , Io
}

impl Error
{   /// Category of this error
    pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::Transport(_) => ErrorKind::Transport
          , Error::MissingApiKey(_) | Error::Auth(_) => ErrorKind::Auth
          , Error::RateLimited(_) => ErrorKind::RateLimit
          , Error::Api { .. } => ErrorKind::Api
          , Error::MalformedResponse(_) => ErrorKind::MalformedResponse
          , Error::Timeout(_) | Error::Abandoned(_) => ErrorKind::Timeout
          , Error::TaskPanicked(_) => ErrorKind::Internal
          , Error::FatalSubstrate(_) => ErrorKind::FatalSubstrate
          , Error::InvalidConfiguration(_) => ErrorKind::Configuration
          , Error::Persistence(_) => ErrorKind::Persistence
          , Error::Io(_) => ErrorKind::Io
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(var) => {
              write!(f, "Missing API key: {} is not set", var)
            }
          , Error::Transport(msg) => {
              write!(f, "Transport error: {}", msg)
            }
          , Error::Auth(msg) => {
              write!(f, "Authentication failed: {}", msg)
            }
          , Error::RateLimited(msg) => {
              write!(f, "Rate limited: {}", msg)
            }
          , Error::Api { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , Error::MalformedResponse(msg) => {
              write!(f, "Malformed response: {}", msg)
            }
          , Error::Timeout(after) => {
              write!(f,
                "Request timed out after {:.2}s",
                after.as_secs_f64()
              )
            }
          , Error::Abandoned(after) => {
              write!(f,
                "Abandoned at dispatch deadline after {:.2}s",
                after.as_secs_f64()
              )
            }
          , Error::TaskPanicked(msg) => {
              write!(f, "Model task panicked: {}", msg)
            }
          , Error::FatalSubstrate(msg) => {
              write!(f, "Cannot start model tasks: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Persistence(msg) => {
              write!(f, "Persistence error: {}", msg)
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::Persistence(format!(
          "{} at line {} column {}",
          e, e.line(), e.column()
        ))
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_kind_mapping()
    {   assert_eq!(
          Error::Timeout(Duration::from_secs(2)).kind(),
          ErrorKind::Timeout
        );
        assert_eq!(
          Error::Abandoned(Duration::from_secs(2)).kind(),
          ErrorKind::Timeout
        );
        assert_eq!(
          Error::MissingApiKey("X".to_string()).kind(),
          ErrorKind::Auth
        );
        assert_eq!(
          Error::Api { status: 500, message: "boom".to_string() }
            .kind(),
          ErrorKind::Api
        );
    }

    #[test]
    fn test_timeout_display_names_deadline()
    {   let e = Error::Timeout(Duration::from_secs(2));
        assert_eq!(e.to_string(), "Request timed out after 2.00s");
    }

    #[test]
    fn test_kind_serializes_snake_case()
    {   let json = serde_json::to_string(&ErrorKind::RateLimit)
          .unwrap();
        assert_eq!(json, "\"rate_limit\"");
    }
}
