//! parallm CLI
//!
//! Prompts for free text, queries every configured model in parallel,
//! prints the comparison and saves the batch as JSON.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use clap::{Parser, Subcommand};
use log::error;
use parallm::config::parse_model_list;
use parallm::
{   exit_code
  , CompareConfig
  , Comparer
  , Error
  , PromptMessage
  , RunOutcome
};

#[derive(Parser, Debug)]
#[command(
  name = "parallm",
  version,
  about = "Compare LLM answers side by side",
  args_conflicts_with_subcommands = true
)]
struct Cli
{   #[command(subcommand)]
    command: Option<Command>

  , /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>

  , /// More logging (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8

  , #[command(flatten)]
    compare: CompareArgs
}

#[derive(clap::Args, Debug)]
struct CompareArgs
{   /// Comma separated model ids, overriding the configuration
    #[arg(long)]
    models: Option<String>

  , /// Per-model timeout in seconds
    #[arg(long)]
    timeout: Option<u64>

  , /// Abandon models still running after this many seconds
    #[arg(long)]
    dispatch_timeout: Option<u64>

  , /// Directory for comparison_results_*.json
    #[arg(long)]
    output_dir: Option<PathBuf>

  , /// Prompt text; read from stdin when omitted
    #[arg(long)]
    prompt: Option<String>

  , /// Do not write the results file
    #[arg(long)]
    no_save: bool
}

#[derive(Subcommand, Debug)]
enum Command
{   /// Query all models with one prompt (default)
    Compare(CompareArgs)
  , /// Write the model catalog, priciest first
    Models
    {   /// Report file
        #[arg(long, default_value = "models.txt")]
        output: PathBuf
    }
}

#[tokio::main]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command
    {   Some(Command::Models { output }) => {
          finish(run_models(cli.config, output).await)
        }
      , Some(Command::Compare(args)) => {
          finish(run_compare(cli.config, args).await)
        }
      , None => finish(run_compare(cli.config, cli.compare).await)
    };
    ExitCode::from(code)
}

fn finish<T>(run: Result<T, Error>) -> u8
{   if let Err(e) = &run
    {   error!("{}", e);
        eprintln!("Error: {}", e);
    }
    exit_code(&run)
}

fn init_logging(verbose: u8)
{   let default = match verbose
    {   0 => "warn"
      , 1 => "debug"
      , _ => "trace"
    };
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or(default)
    ).init();
}

fn load_config(
  path: Option<PathBuf>
, args: &CompareArgs
) -> Result<CompareConfig, Error>
{   let mut config = CompareConfig::load(path.as_deref())?;
    if let Some(raw) = &args.models
    {   config.models = parse_model_list(raw);
    }
    if let Some(secs) = args.timeout
    {   config.dispatch.timeout_secs = secs;
    }
    if let Some(secs) = args.dispatch_timeout
    {   config.dispatch.dispatch_timeout_secs = Some(secs);
    }
    if let Some(dir) = &args.output_dir
    {   config.output_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run_compare(
  config_path: Option<PathBuf>
, args: CompareArgs
) -> Result<RunOutcome, Error>
{   let config = load_config(config_path, &args)?;
    let comparer = Comparer::from_config(config)?;

    println!("Multi-Model Comparison Tool");
    println!("Models: {}\n", comparer.models().join(", "));

    let text = match args.prompt
    {   Some(text) => text
      , None => read_prompt()?
    };
    let prompt = PromptMessage::user(text);
    if !prompt.is_blank()
    {   println!("\nQuerying models in parallel...\n");
    }

    let outcome = comparer.run(&prompt, !args.no_save).await?;
    match &outcome
    {   RunOutcome::EmptyPrompt => {
          println!("Prompt cannot be empty. Exiting.");
        }
      , RunOutcome::Compared { comparison, saved } => {
          println!("{}", comparison.render());
          match saved
          {   Some(Ok(path)) => {
                println!("Results saved to: {}", path.display());
              }
            , Some(Err(e)) => eprintln!("Could not save results: {}", e)
            , None => {}
          }
        }
    }
    Ok(outcome)
}

fn read_prompt() -> Result<String, Error>
{   print!("Enter your prompt:\n> ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn run_models(
  config_path: Option<PathBuf>
, output: PathBuf
) -> Result<(), Error>
{   let config = CompareConfig::load(config_path.as_deref())?;
    let source = format!("{}/models", config.provider.api_base);
    let comparer = Comparer::from_config(config)?;

    println!("Fetching models from {}...", source);
    let models = tokio::time::timeout(
      Duration::from_secs(comparer.config().dispatch.timeout_secs),
      comparer.list_models()
    )
      .await
      .map_err(|_| {
        Error::Timeout(Duration::from_secs(
          comparer.config().dispatch.timeout_secs
        ))
      })??;

    println!("Saving models to {}...", output.display());
    parallm::catalog::write_catalog(&output, &models, &source)?;
    println!("Successfully saved {} models to {}", models.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_bare_flags_select_compare()
    {   let cli = Cli::try_parse_from(
          ["parallm", "--models", "a/one,b/two", "--no-save"]
        ).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.compare.models.as_deref(), Some("a/one,b/two"));
        assert!(cli.compare.no_save);
    }

    #[test]
    fn test_compare_flags_before_subcommand_are_rejected()
    {   assert!(Cli::try_parse_from(
          ["parallm", "--models", "a/one", "compare"]
        ).is_err());
        assert!(Cli::try_parse_from(
          ["parallm", "--timeout", "5", "models"]
        ).is_err());
    }

    #[test]
    fn test_subcommand_takes_its_own_flags()
    {   let cli = Cli::try_parse_from(
          ["parallm", "compare", "--models", "a/one", "--timeout", "5"]
        ).unwrap();
        match cli.command
        {   Some(Command::Compare(args)) => {
              assert_eq!(args.models.as_deref(), Some("a/one"));
              assert_eq!(args.timeout, Some(5));
            }
          , other => panic!("unexpected command {:?}", other)
        }

        let cli = Cli::try_parse_from(
          ["parallm", "models", "--output", "catalog.txt"]
        ).unwrap();
        assert!(matches!(
          cli.command,
          Some(Command::Models { ref output })
            if output == &PathBuf::from("catalog.txt")
        ));
    }
}
