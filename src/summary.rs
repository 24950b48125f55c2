//! Summary metrics over a dispatch batch

use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::ErrorKind;
use crate::request::ModelId;
use crate::result::{DispatchBatch, ModelResult};

/// Timing statistics over successful results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats
{   pub fastest_model: ModelId
  , pub min: Duration
  , pub slowest_model: ModelId
  , pub max: Duration
  , pub mean: Duration
}

/// Aggregates are only defined when at least one model answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate
{   NoSuccessfulResults
  , Timing(TimingStats)
}

/// Token totals over successful results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals
{   pub prompt: u64
  , pub completion: u64
  , pub total: u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedModel
{   pub model: ModelId
  , pub kind: Option<ErrorKind>
  , pub detail: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary
{   pub total: usize
  , pub succeeded: usize
  , pub failed: Vec<FailedModel>
  , pub aggregate: Aggregate
  , pub tokens: TokenTotals
}

impl Summary
{   pub fn fastest(&self) -> Option<&ModelId>
    {   match &self.aggregate
        {   Aggregate::Timing(t) => Some(&t.fastest_model)
          , Aggregate::NoSuccessfulResults => None
        }
    }
}

/// Compute summary metrics; failures are excluded from timing and tokens
pub fn summarize(batch: &DispatchBatch) -> Summary
{   let ranked = ranking(batch);
    let successes: Vec<&ModelResult> = ranked
      .iter()
      .copied()
      .filter(|r| r.is_success())
      .collect();

    let failed = batch.failures()
      .map(|r| FailedModel
      {   model: r.model.clone()
        , kind: r.error_kind
        , detail: r.error_detail.clone().unwrap_or_default()
      })
      .collect();

    let mut tokens = TokenTotals::default();
    for usage in successes.iter().filter_map(|r| r.usage)
    {   tokens.prompt += u64::from(usage.prompt_tokens);
        tokens.completion += u64::from(usage.completion_tokens);
        tokens.total += u64::from(usage.total_tokens);
    }

    let aggregate = match (successes.first(), successes.last())
    {   (Some(fastest), Some(slowest)) => {
          let sum: Duration = successes.iter().map(|r| r.elapsed).sum();
          let count = u32::try_from(successes.len()).unwrap_or(u32::MAX);
          Aggregate::Timing(TimingStats
          {   fastest_model: fastest.model.clone()
            , min: fastest.elapsed
            , slowest_model: slowest.model.clone()
            , max: slowest.elapsed
            , mean: sum / count
          })
        }
      , _ => Aggregate::NoSuccessfulResults
    };

    Summary
    {   total: batch.len()
      , succeeded: successes.len()
      , failed
      , aggregate
      , tokens
    }
}

/// Display order: successes fastest first, then failures in arrival order
///
/// The sort is stable, so equal times keep arrival order.
pub fn ranking(batch: &DispatchBatch) -> Vec<&ModelResult>
{   let mut ranked: Vec<&ModelResult> = batch.successes().collect();
    ranked.sort_by_key(|r| r.elapsed);
    ranked.extend(batch.failures());
    ranked
}

#[cfg(test)]
mod tests
{   use super::*;
    use chrono::Utc;
    use crate::error::Error;
    use crate::request::{CompletionResponse, PromptMessage, TokenUsage};

    fn ok(model: &str, ms: u64, total: u32) -> ModelResult
    {   ModelResult::success(
          model.to_string(),
          CompletionResponse
          {   text: "pong".to_string()
            , model: None
            , finish_reason: None
            , usage: Some(TokenUsage
              {   prompt_tokens: 1
                , completion_tokens: total - 1
                , total_tokens: total
              })
          },
          Duration::from_millis(ms)
        )
    }

    fn failed(model: &str) -> ModelResult
    {   ModelResult::failure(
          model.to_string(),
          &Error::Timeout(Duration::from_secs(2)),
          Duration::from_secs(2)
        )
    }

    fn batch(results: Vec<ModelResult>) -> DispatchBatch
    {   DispatchBatch
        {   prompt: PromptMessage::user("ping")
          , created_at: Utc::now()
          , results
        }
    }

    #[test]
    fn test_aggregates_skip_failures()
    {   let b = batch(vec![ok("C", 300, 7), failed("B"), ok("A", 100, 5)]);
        let s = summarize(&b);
        assert_eq!(s.total, 3);
        assert_eq!(s.succeeded, 2);
        assert_eq!(s.tokens.total, 12);
        assert_eq!(s.tokens.prompt, 2);
        match s.aggregate
        {   Aggregate::Timing(t) => {
              assert_eq!(t.fastest_model, "A");
              assert_eq!(t.slowest_model, "C");
              assert_eq!(t.min, Duration::from_millis(100));
              assert_eq!(t.max, Duration::from_millis(300));
              assert_eq!(t.mean, Duration::from_millis(200));
            }
          , other => panic!("unexpected aggregate: {:?}", other)
        }
        assert_eq!(s.failed.len(), 1);
        assert_eq!(s.failed[0].model, "B");
        assert_eq!(s.failed[0].kind, Some(ErrorKind::Timeout));
    }

    #[test]
    fn test_all_failures_is_marked_not_computed()
    {   let s = summarize(&batch(vec![failed("A"), failed("B")]));
        assert_eq!(s.aggregate, Aggregate::NoSuccessfulResults);
        assert_eq!(s.tokens, TokenTotals::default());
        assert_eq!(s.failed.len(), 2);
        assert_eq!(s.fastest(), None);
    }

    #[test]
    fn test_empty_batch()
    {   let s = summarize(&batch(vec![]));
        assert_eq!(s.total, 0);
        assert_eq!(s.aggregate, Aggregate::NoSuccessfulResults);
    }

    #[test]
    fn test_ranking_puts_failures_last()
    {   let b = batch(vec![failed("X"), ok("slow", 900, 2), ok("quick", 10, 2)]);
        let order: Vec<&str> = ranking(&b)
          .iter()
          .map(|r| r.model.as_str())
          .collect();
        assert_eq!(order, vec!["quick", "slow", "X"]);
    }

    #[test]
    fn test_success_without_usage_counts_zero_tokens()
    {   let mut r = ok("A", 10, 3);
        r.usage = None;
        let s = summarize(&batch(vec![r]));
        assert_eq!(s.tokens.total, 0);
        assert_eq!(s.succeeded, 1);
    }
}
