//! gitai - CLI entry point.

use std::process;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dialoguer::Password;
use tracing_subscriber::EnvFilter;

use gitai::commit::{CommitFlow, FlowOutcome, TerminalPrompter};
use gitai::config::{ConfigStore, ConfigUpdate, FileConfigStore, Provider};
use gitai::git::GitRepository;
use gitai::llm::HfInferenceClient;

/// Propose commit messages for staged changes using a hosted LLM.
#[derive(Parser, Debug)]
#[command(name = "gitai")]
#[command(about = "Propose commit messages for staged changes using a hosted LLM")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a message for the staged changes and commit on approval
    Commit,

    /// Inspect or change the stored configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the active configuration (token masked)
    Show,

    /// Store the Hugging Face API token
    SetToken {
        /// Token value; prompted for (hidden) when omitted
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove the stored API token
    DeleteToken,

    /// Restore default generation parameters
    Reset {
        /// Also remove the stored API token
        #[arg(long)]
        include_token: bool,
    },

    /// Change individual generation parameters
    Update(UpdateArgs),

    /// Print the config file location
    Path,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// Model identifier, e.g. meta-llama/Llama-3.1-8B-Instruct
    #[arg(long)]
    model: Option<String>,

    /// Inference provider (auto lets the router choose)
    #[arg(long)]
    provider: Option<Provider>,

    /// Sampling temperature between 0.0 and 1.0
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens the model may generate
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Maximum characters of the final commit message
    #[arg(long)]
    max_length: Option<usize>,

    /// System prompt sent with every request
    #[arg(long)]
    system_prompt: Option<String>,

    /// Maximum number of retries per commit
    #[arg(long, conflicts_with = "no_retry_limit")]
    max_retries: Option<u32>,

    /// Remove the retry cap
    #[arg(long)]
    no_retry_limit: bool,
}

impl From<UpdateArgs> for ConfigUpdate {
    fn from(args: UpdateArgs) -> Self {
        let max_retries = if args.no_retry_limit {
            Some(None)
        } else {
            args.max_retries.map(Some)
        };

        ConfigUpdate {
            system_prompt: args.system_prompt,
            model: args.model,
            provider: args.provider,
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            max_length: args.max_length,
            max_retries,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {cause}");
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

async fn run(command: Command) -> Result<()> {
    let store = FileConfigStore::default_location().context("Failed to locate config file")?;

    match command {
        Command::Commit => run_commit(&store).await,
        Command::Config(cmd) => run_config(&store, cmd),
    }
}

async fn run_commit(store: &dyn ConfigStore) -> Result<()> {
    let repo = GitRepository::discover(".")
        .context("Not a git repository. Run gitai from within a git repository.")?;

    let config = store.load().context("Failed to load configuration")?;
    let token = store
        .credential()
        .context("Failed to read API token")?
        .map(|c| c.value);
    let client = HfInferenceClient::new(token)?;
    let mut prompter = TerminalPrompter::new();

    let mut flow = CommitFlow::new(&repo, &client, &mut prompter, config);
    match flow.run().await? {
        FlowOutcome::NoChanges => {
            println!("No staged changes. Stage with 'git add' first.");
        }
        FlowOutcome::Committed { summary, .. } => {
            println!("Committed: {summary}");
        }
        FlowOutcome::Aborted => {
            println!("Aborted. Nothing was committed.");
        }
    }

    Ok(())
}

fn run_config(store: &FileConfigStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("config file:    {}", store.path().display());
            print!("{}", store.describe()?);
        }

        ConfigCommand::SetToken { token } => {
            let token = match token {
                Some(t) => t,
                None => Password::new()
                    .with_prompt("Hugging Face API token")
                    .with_confirmation("Confirm token", "Tokens do not match")
                    .interact()
                    .context("Failed to read token")?,
            };
            store.set_token(&token)?;
            println!("Token saved to {}", store.path().display());
        }

        ConfigCommand::DeleteToken => {
            if store.delete_token()? {
                println!("Stored token removed.");
            } else {
                println!("No stored token to remove.");
            }
        }

        ConfigCommand::Reset { include_token } => {
            store.reset(include_token)?;
            if include_token {
                println!("Configuration and token reset to defaults.");
            } else {
                println!("Configuration reset to defaults (token kept).");
            }
        }

        ConfigCommand::Update(args) => {
            let update = ConfigUpdate::from(args);
            if update.is_empty() {
                bail!("Nothing to update. Pass at least one option (see 'gitai config update --help').");
            }
            let current = store.load()?;
            let updated = update.apply_to(&current)?;
            store.save(&updated)?;
            println!("Configuration updated.");
            print!("{}", store.describe()?);
        }

        ConfigCommand::Path => {
            println!("{}", store.path().display());
        }
    }

    Ok(())
}
