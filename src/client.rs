use std::path::PathBuf;
use std::sync::Arc;
use log::{debug, error, info};
use crate::config::CompareConfig;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::providers::{CompletionClient, OpenRouterClient};
use crate::request::{ModelDescriptor, ModelId, PromptMessage};
use crate::result::DispatchBatch;
use crate::summary::{summarize, Summary};

/// A finished dispatch with its summary
#[derive(Debug, Clone)]
pub struct Comparison
{   pub batch: DispatchBatch
  , pub summary: Summary
}

impl Comparison
{   pub fn render(&self) -> String
    {   crate::report::render(&self.batch, &self.summary)
    }
}

/// How a compare run ended when nothing fatal happened
#[derive(Debug)]
pub enum RunOutcome
{   /// Blank prompt, nothing was sent
    EmptyPrompt
  , Compared
    {   comparison: Comparison
      , /// `None` when saving was switched off
        saved: Option<Result<PathBuf, Error>>
    }
}

/// Process exit status for a run
///
/// Failed models and a failed save still count as a finished run
/// (`Ok(RunOutcome::Compared { .. })`); only configuration, credential,
/// terminal and runtime errors surface as `Err` and are non-zero.
pub fn exit_code<T>(run: &Result<T, Error>) -> u8
{   match run
    {   Ok(_) => 0
      , Err(_) => 1
    }
}

/// Main entry point: one configured client, one model list
///
/// Built once at startup from a `CompareConfig`; the configuration is
/// never modified afterwards.
pub struct Comparer
{   config: CompareConfig
  , client: Arc<dyn CompletionClient>
  , dispatcher: Dispatcher
}

impl Comparer
{   /// Build against OpenRouter, reading the API key from the
    /// environment variable the config names
    pub fn from_config(config: CompareConfig)
      -> Result<Self, Error>
    {   config.validate()?;
        let api_key = config.api_key()?;
        let client = OpenRouterClient::new(api_key, &config.provider);
        Ok(Comparer::with_client(config, Arc::new(client)))
    }

    /// Build against any completion client
    pub fn with_client(
      config: CompareConfig
    , client: Arc<dyn CompletionClient>
    ) -> Self
    {   debug!("Creating Comparer for {} models", config.models.len());
        let dispatcher
          = Dispatcher::from_config(client.clone(), &config.dispatch);
        Comparer
        {   config
          , client
          , dispatcher
        }
    }

    pub fn config(&self) -> &CompareConfig
    {   &self.config
    }

    pub fn models(&self) -> &[ModelId]
    {   &self.config.models
    }

    /// Send `prompt` to every configured model and summarize
    pub async fn compare(&self, prompt: &PromptMessage)
      -> Result<Comparison, Error>
    {   let batch = self.dispatcher
          .dispatch(&self.config.models, prompt)
          .await?;
        let summary = summarize(&batch);
        info!(
          "{} of {} models answered",
          summary.succeeded, summary.total
        );
        Ok(Comparison { batch, summary })
    }

    /// Compare, then save unless `save` is off
    ///
    /// A save failure is logged and handed back in the outcome rather
    /// than failing the run.
    pub async fn run(&self, prompt: &PromptMessage, save: bool)
      -> Result<RunOutcome, Error>
    {   if prompt.is_blank()
        {   return Ok(RunOutcome::EmptyPrompt);
        }
        let comparison = self.compare(prompt).await?;
        let saved = save.then(|| {
          self.save(&comparison).map_err(|e| {
            error!("{}", e);
            e
          })
        });
        Ok(RunOutcome::Compared { comparison, saved })
    }

    /// Persist under the configured output directory
    pub fn save(&self, comparison: &Comparison)
      -> Result<PathBuf, Error>
    {   crate::persist::persist(&comparison.batch, &self.config.output_dir)
    }

    pub async fn list_models(&self)
      -> Result<Vec<ModelDescriptor>, Error>
    {   self.client.list_models().await
    }
}
