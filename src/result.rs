//! Per-model results and the batch a dispatch produces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{Error, ErrorKind};
use crate::request::{CompletionResponse, ModelId, PromptMessage, TokenUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status
{   Success
  , Failure
}

/// Outcome of one model task
///
/// `content` is set iff the status is `Success`; `error_detail` and
/// `error_kind` are set iff it is `Failure`. Use the constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult
{   pub model: ModelId
  , pub status: Status
  , pub content: Option<String>
  , pub error_detail: Option<String>
  , pub error_kind: Option<ErrorKind>
  , pub elapsed: Duration
  , /// `elapsed` as float seconds, for readers of the JSON file
    #[serde(default)]
    pub elapsed_secs: f64
  , pub usage: Option<TokenUsage>
  , /// Model name echoed by the endpoint
    pub response_model: Option<String>
  , pub finish_reason: Option<String>
  , /// Position in arrival order within the batch
    pub arrival: usize
}

impl ModelResult
{   pub fn success(
      model: ModelId
    , response: CompletionResponse
    , elapsed: Duration
    ) -> Self
    {   ModelResult
        {   model
          , status: Status::Success
          , content: Some(response.text)
          , error_detail: None
          , error_kind: None
          , elapsed
          , elapsed_secs: elapsed.as_secs_f64()
          , usage: response.usage
          , response_model: response.model
          , finish_reason: response.finish_reason
          , arrival: 0
        }
    }

    pub fn failure(
      model: ModelId
    , error: &Error
    , elapsed: Duration
    ) -> Self
    {   ModelResult
        {   model
          , status: Status::Failure
          , content: None
          , error_detail: Some(error.to_string())
          , error_kind: Some(error.kind())
          , elapsed
          , elapsed_secs: elapsed.as_secs_f64()
          , usage: None
          , response_model: None
          , finish_reason: None
          , arrival: 0
        }
    }

    /// Stamp the arrival index; only the dispatcher calls this
    pub(crate) fn arrived(mut self, arrival: usize) -> Self
    {   self.arrival = arrival;
        self
    }

    pub fn is_success(&self) -> bool
    {   self.status == Status::Success
    }

    pub fn total_tokens(&self) -> u32
    {   self.usage.map(|u| u.total_tokens).unwrap_or(0)
    }
}

/// Every result of one dispatch, plus the prompt and creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchBatch
{   pub prompt: PromptMessage
  , pub created_at: DateTime<Utc>
  , /// In arrival order
    pub results: Vec<ModelResult>
}

impl DispatchBatch
{   pub fn len(&self) -> usize
    {   self.results.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.results.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ModelResult>
    {   self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ModelResult>
    {   self.results.iter().filter(|r| !r.is_success())
    }

    /// Results for `model`; more than one if it was requested twice
    pub fn for_model<'a>(
      &'a self
    , model: &'a str
    ) -> impl Iterator<Item = &'a ModelResult> + 'a
    {   self.results.iter().filter(move |r| r.model == model)
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn response(text: &str, total: u32) -> CompletionResponse
    {   CompletionResponse
        {   text: text.to_string()
          , model: None
          , finish_reason: Some("stop".to_string())
          , usage: Some(TokenUsage
            {   prompt_tokens: 1
              , completion_tokens: total - 1
              , total_tokens: total
            })
        }
    }

    #[test]
    fn test_success_fields()
    {   let r = ModelResult::success(
          "a".to_string(),
          response("pong", 5),
          Duration::from_millis(100)
        );
        assert!(r.is_success());
        assert_eq!(r.content.as_deref(), Some("pong"));
        assert!(r.error_detail.is_none() && r.error_kind.is_none());
        assert_eq!(r.total_tokens(), 5);
    }

    #[test]
    fn test_failure_fields()
    {   let err = Error::Transport("connection reset".to_string());
        let r = ModelResult::failure(
          "b".to_string(),
          &err,
          Duration::from_millis(40)
        );
        assert!(!r.is_success());
        assert!(r.content.is_none() && r.usage.is_none());
        assert_eq!(
          r.error_detail.as_deref(),
          Some("Transport error: connection reset")
        );
        assert_eq!(r.error_kind, Some(ErrorKind::Transport));
        assert_eq!(r.total_tokens(), 0);
        assert_eq!(r.elapsed, Duration::from_millis(40));
    }

    #[test]
    fn test_elapsed_serialized_as_float_seconds_too()
    {   let r = ModelResult::success(
          "a".to_string(),
          response("pong", 5),
          Duration::from_millis(1500)
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["elapsed_secs"], serde_json::json!(1.5));
        assert_eq!(json["elapsed"]["secs"], serde_json::json!(1));
        assert_eq!(json["elapsed"]["nanos"], serde_json::json!(500_000_000));

        let back: ModelResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_batch_filters()
    {   let batch = DispatchBatch
        {   prompt: PromptMessage::user("ping")
          , created_at: Utc::now()
          , results: vec![
              ModelResult::success(
                "a".to_string(), response("x", 2), Duration::ZERO
              ),
              ModelResult::failure(
                "b".to_string(),
                &Error::RateLimited("slow".to_string()),
                Duration::ZERO
              ).arrived(1),
              ModelResult::success(
                "a".to_string(), response("y", 3), Duration::ZERO
              ).arrived(2),
            ]
        };
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.successes().count(), 2);
        assert_eq!(batch.failures().count(), 1);
        assert_eq!(batch.for_model("a").count(), 2);
    }
}
