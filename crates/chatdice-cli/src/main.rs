// ABOUTME: Command-line interface for the chatdice roll engine.
// ABOUTME: Rolls chat lines, lists rule systems, shows help, and tokenizes parameter commands.

use std::path::PathBuf;
use std::process;

use chatdice::{
    format_roll_result, parse_commands, ApiVersion, Config, DiceBot, GameSystemGroup,
    ResultMessage,
};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatdice")]
#[command(about = "Interpret chat dice commands like '3 2d6>=7' or 'choice[a,b]'")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Engine selection shared by every subcommand. Overrides CHATDICE_* variables.
#[derive(Args)]
struct EngineArgs {
    /// Rule system id (e.g. "Cthulhu7th")
    #[arg(short, long)]
    system: Option<String>,

    /// Dice API base URL; the embedded engine is used when unset
    #[arg(long)]
    api_url: Option<String>,

    /// Dice API version: v1 or v2
    #[arg(long)]
    api_version: Option<ApiVersion>,

    /// JSON file with roll tables
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Seed for the embedded engine
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll one chat line
    Roll {
        /// Chat text (e.g. "x3 CC<=50", "ＳＸ２ 1d20")
        text: String,

        /// Name shown as the roller
        #[arg(long, default_value = "You")]
        sender: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Roll every line read from stdin
    Chat {
        #[arg(long, default_value = "You")]
        sender: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Show help for the selected rule system
    Help {
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// List the available rule systems
    Systems {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Annotate a roll trace for display
    Format {
        /// Result text (e.g. "(2D6) ＞ 7[3,4] ＞ 7")
        text: String,

        #[arg(short, long, default_value = chatdice::DEFAULT_SYSTEM)]
        system: String,
    },
    /// Split parameter operations like "HP-3:MP+1" out of a line
    Operations {
        text: String,

        /// Allow quoted target names
        #[arg(long)]
        quote: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chatdice=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(command: Commands) -> chatdice::Result<()> {
    match command {
        Commands::Roll {
            text,
            sender,
            json,
            engine,
        } => {
            let (bot, system) = build_bot(engine)?;
            let Some(outcome) = bot.roll_command(&text, &system).await else {
                tracing::debug!(text = %text, "no roll");
                return Ok(());
            };
            let message = bot.message(&outcome, &sender);
            if json {
                println!("{}", serde_json::to_string_pretty(&message)?);
            } else {
                print_message(&message);
            }
        }
        Commands::Chat { sender, engine } => {
            let (bot, system) = build_bot(engine)?;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(outcome) = bot.roll_command(&line, &system).await {
                    print_message(&bot.message(&outcome, &sender));
                }
            }
        }
        Commands::Help { engine } => {
            let (bot, system) = build_bot(engine)?;
            for help in bot.help_messages(&system).await {
                println!("{}", help);
                println!();
            }
        }
        Commands::Systems { json, engine } => {
            let (bot, _) = build_bot(engine)?;
            let groups = bot.catalog().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                print_catalog(&groups);
            }
        }
        Commands::Format { text, system } => {
            println!("{}", format_roll_result(&text, &system));
        }
        Commands::Operations { text, quote } => {
            let info = parse_commands(&text, quote);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}

/// Environment configuration with command-line overrides applied.
fn build_bot(args: EngineArgs) -> chatdice::Result<(DiceBot, String)> {
    let mut config = Config::from_env()?;
    if let Some(system) = args.system {
        config.system = system;
    }
    if args.api_url.is_some() {
        config.api_url = args.api_url;
    }
    if let Some(version) = args.api_version {
        config.api_version = version;
    }
    if args.tables.is_some() {
        config.tables = args.tables;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let bot = DiceBot::new(config.build_engine()?).with_tables(config.load_tables()?);
    tracing::debug!(
        system = %config.system,
        engine = %bot.engine().label(),
        tables = bot.tables().len(),
        "bot ready"
    );
    Ok((bot, config.system))
}

fn print_message(message: &ResultMessage) {
    println!("[{}] {}", message.from, message.name);
    println!("{}", message.text);
}

fn print_catalog(groups: &[GameSystemGroup]) {
    for group in groups {
        println!("{}", group.index);
        for entry in &group.infos {
            println!("  {:<24} {}", entry.id, entry.name);
        }
    }
}
