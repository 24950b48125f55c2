//! Fan one prompt out to many models and gather every result
//!
//! Each model gets its own spawned task. Tasks share nothing but the
//! read-only client handle and prompt; each one reports back on an
//! unbounded channel, tagged with the slot it was launched for. The
//! dispatcher drains the channel until every slot has reported (the
//! barrier), stamping arrival order as results come in.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use log::{debug, error, info, warn};
use crate::config::DispatchConfig;
use crate::error::Error;
use crate::providers::CompletionClient;
use crate::request::{ModelId, PromptMessage};
use crate::result::{DispatchBatch, ModelResult};
use crate::task::ModelTask;

/// What a finished task sends back: its launch slot and result
type SlotReport = (usize, ModelResult);

/// Parallel dispatcher over one shared completion client
///
/// Fan-out is one task per requested model with no admission control;
/// batches are a handful of models. A large model list would want a
/// bounded pool in front of `spawn`.
pub struct Dispatcher
{   task: ModelTask
  , dispatch_timeout: Option<Duration>
}

impl Dispatcher
{   pub fn new(
      client: Arc<dyn CompletionClient>
    , timeout: Duration
    ) -> Self
    {   Dispatcher
        {   task: ModelTask::new(client, timeout)
          , dispatch_timeout: None
        }
    }

    pub fn from_config(
      client: Arc<dyn CompletionClient>
    , config: &DispatchConfig
    ) -> Self
    {   Dispatcher::new(client, config.timeout())
          .with_dispatch_timeout(config.dispatch_timeout())
    }

    /// Abandon tasks still running after `deadline`
    pub fn with_dispatch_timeout(
      mut self
    , deadline: Option<Duration>
    ) -> Self
    {   self.dispatch_timeout = deadline;
        self
    }

    /// Query every model in `models` with `prompt` concurrently
    ///
    /// Returns one result per entry of `models` (duplicates included),
    /// in arrival order. Individual failures never fail the dispatch;
    /// the only error is being unable to spawn onto a tokio runtime.
    pub async fn dispatch(
      &self
    , models: &[ModelId]
    , prompt: &PromptMessage
    ) -> Result<DispatchBatch, Error>
    {   let created_at = Utc::now();
        let runtime = tokio::runtime::Handle::try_current()
          .map_err(|e| {
            error!("No runtime for model tasks: {}", e);
            Error::FatalSubstrate(e.to_string())
          })?;

        info!("Dispatching prompt to {} models", models.len());
        if models.is_empty()
        {   return Ok(DispatchBatch
            {   prompt: prompt.clone()
              , created_at
              , results: vec![]
            });
        }

        let prompt_arc = Arc::new(prompt.clone());
        let (report_tx, mut report_rx)
          = mpsc::unbounded_channel::<SlotReport>();
        let started = Instant::now();

        let handles: Vec<JoinHandle<()>> = models
          .iter()
          .enumerate()
          .map(|(slot, model)| {
            let task = self.task.clone();
            let prompt = prompt_arc.clone();
            let model = model.clone();
            let report_tx = report_tx.clone();
            runtime.spawn(async move {
              let result = task.run(model, &prompt).await;
              let _ = report_tx.send((slot, result));
            })
          })
          .collect();
        drop(report_tx);

        let mut reported = vec![false; models.len()];
        let mut results = Vec::with_capacity(models.len());
        // A deadline past the clock's range is no deadline at all
        let deadline = self.dispatch_timeout
          .and_then(|d| started.checked_add(d));
        let mut deadline_hit = false;

        while results.len() < models.len()
        {   let next = match deadline
            {   Some(at) => {
                  match tokio::time::timeout_at(at, report_rx.recv()).await
                  {   Ok(next) => next
                    , Err(_) => {
                        warn!(
                          "Dispatch deadline reached with {} of {} results",
                          results.len(), models.len()
                        );
                        deadline_hit = true;
                        break;
                      }
                  }
                }
              , None => report_rx.recv().await
            };
            match next
            {   Some(report) => {
                  accept(report, &mut reported, &mut results);
                }
              , None => break
            };
        }

        // Stragglers past the deadline are cancelled; everything else
        // has already ended once the channel is closed
        if deadline_hit
        {   for (slot, handle) in handles.iter().enumerate()
            {   if !reported[slot]
                {   handle.abort();
                }
            }
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (slot, handle) in handles.into_iter().enumerate()
        {   if reported[slot]
            {   continue;
            }
            outcomes.push((slot, handle.await));
        }
        let elapsed = started.elapsed();

        // A task may have reported after the deadline but before abort
        while let Ok(report) = report_rx.try_recv()
        {   accept(report, &mut reported, &mut results);
        }

        for (slot, outcome) in outcomes
        {   if reported[slot]
            {   continue;
            }
            let model = models[slot].clone();
            let error = match outcome
            {   Err(e) if e.is_panic() => {
                  Error::TaskPanicked(panic_message(e.into_panic()))
                }
              , Err(e) if e.is_cancelled() => Error::Abandoned(elapsed)
              , Err(e) => Error::TaskPanicked(e.to_string())
              , Ok(()) => Error::TaskPanicked(
                  "task finished without reporting".to_string()
                )
            };
            error!("No result from {}: {}", model, error);
            let arrival = results.len();
            results.push(
              ModelResult::failure(model, &error, elapsed)
                .arrived(arrival)
            );
        }

        debug!(
          "Dispatch finished in {:.2}s",
          started.elapsed().as_secs_f64()
        );
        Ok(DispatchBatch
        {   prompt: prompt.clone()
          , created_at
          , results
        })
    }
}

fn accept(
  (slot, result): SlotReport
, reported: &mut [bool]
, results: &mut Vec<ModelResult>
)
{   reported[slot] = true;
    let arrival = results.len();
    results.push(result.arrived(arrival));
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String
{   if let Some(s) = payload.downcast_ref::<&str>()
    {   s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>()
    {   s.clone()
    } else
    {   "unknown panic".to_string()
    }
}
