//! One model, one attempt, one result

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use log::{debug, warn};
use crate::error::Error;
use crate::providers::CompletionClient;
use crate::request::{ModelId, PromptMessage};
use crate::result::ModelResult;

/// Runs a single completion under a deadline and normalizes the outcome
///
/// Never returns an error: every failure, including the deadline, is
/// folded into a `Failure` result so sibling tasks are unaffected.
#[derive(Clone)]
pub struct ModelTask
{   client: Arc<dyn CompletionClient>
  , timeout: Duration
}

impl ModelTask
{   pub fn new(
      client: Arc<dyn CompletionClient>
    , timeout: Duration
    ) -> Self
    {   ModelTask { client, timeout }
    }

    pub fn timeout(&self) -> Duration
    {   self.timeout
    }

    pub async fn run(
      &self
    , model: ModelId
    , prompt: &PromptMessage
    ) -> ModelResult
    {   debug!("Querying model: {}", model);

        let start = Instant::now();
        let outcome = tokio::time::timeout(
          self.timeout,
          self.client.generate_completion(&model, prompt)
        ).await;
        let elapsed = start.elapsed();

        match outcome
        {   Ok(Ok(response)) => {
              debug!(
                "{} answered in {:.2}s",
                model, elapsed.as_secs_f64()
              );
              ModelResult::success(model, response, elapsed)
            }
          , Ok(Err(e)) => {
              warn!("Error querying {}: {}", model, e);
              ModelResult::failure(model, &e, elapsed)
            }
          , Err(_) => {
              warn!(
                "{} did not answer within {:.2}s",
                model, self.timeout.as_secs_f64()
              );
              ModelResult::failure(
                model,
                &Error::Timeout(self.timeout),
                elapsed
              )
            }
        }
    }
}
