pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod result;
pub mod task;
pub mod dispatch;
pub mod summary;
pub mod report;
pub mod persist;
pub mod catalog;
pub mod client;

/*

parallm (parallel LLMs): send one prompt to many models at once
and compare what comes back.

parallm/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and crate layout
│   ├── error.rs        # Error type and error categories
│   ├── config.rs       # Provider / dispatch configuration
│   ├── request.rs      # Prompt, response and catalog types
│   ├── providers/      # Completion client trait + OpenRouter
│   ├── task.rs         # One model, one attempt, one result
│   ├── dispatch.rs     # Fan-out and barrier over all models
│   ├── result.rs       # ModelResult and DispatchBatch
│   ├── summary.rs      # Fastest/slowest/mean, token totals
│   ├── report.rs       # Comparison view
│   ├── persist.rs      # comparison_results_*.json files
│   ├── catalog.rs      # Model catalog report sorted by price
│   ├── client.rs       # Comparer: config + client + dispatcher
│   └── bin/parallm.rs  # Interactive CLI
└── tests/              # Integration tests

Flow: prompt -> Dispatcher -> one ModelTask per model -> ModelResults
-> DispatchBatch -> summary / report / persist.

*/

pub use client::{exit_code, Comparer, Comparison, RunOutcome};
pub use config::CompareConfig;
pub use dispatch::Dispatcher;
pub use error::{Error, ErrorKind};
pub use providers::{CompletionClient, OpenRouterClient};
pub use request::
{   ChatMessage
  , CompletionResponse
  , ModelDescriptor
  , ModelId
  , PromptMessage
  , Role
  , TokenUsage
};
pub use result::{DispatchBatch, ModelResult, Status};
pub use summary::{summarize, Aggregate, Summary};
pub use task::ModelTask;
