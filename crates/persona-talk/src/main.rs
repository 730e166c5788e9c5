//! Command-line client: chat with a persona, manage Gems, browse learning logs.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use persona_talk::console::{
    ChatInput, ConsoleSink, HELP, finish_saves, log_line, reply_text,
};
use persona_talk_config::{LayeredConfigOptions, PersonaTalkConfig};
use persona_talk_core::{
    ConversationSession, DispatchHandle, HttpCompletionGateway, NoticeBoard, Persona,
    SessionError, SideEffectDispatcher, StaticPrincipalProvider, TurnOutcome,
    renderer_from_config,
};
use persona_talk_protocol::{
    EventSink, GemDraft, GemId, GemPatch, Message, Principal, PrincipalProvider, Role,
};
use persona_talk_store::{GemStore, JsonGemStore, SqliteLearningLogStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Command-line options.
#[derive(Parser)]
#[command(name = "persona-talk", version)]
struct Cli {
    /// Extra persona-talk.json5 layered over the user and cwd files
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with a persona
    Chat(ChatArgs),
    /// Manage custom personas
    #[command(subcommand)]
    Gems(GemsCommand),
    /// List saved learning records, newest first
    Logs(LogsArgs),
}

#[derive(Args)]
struct ChatArgs {
    /// `coach`, `tutor` or a Gem id
    #[arg(long, default_value = "coach")]
    persona: String,
    /// Signed-in user id; records are not saved without one
    #[arg(long)]
    user: Option<String>,
    /// Start with read-aloud turned off
    #[arg(long)]
    no_speech: bool,
}

#[derive(Subcommand)]
enum GemsCommand {
    /// List Gems, newest first
    List,
    /// Print one Gem including its instruction text
    Show { id: GemId },
    /// Create a Gem
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "💎")]
        icon: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        instruction: String,
    },
    /// Change fields of a Gem
    Update {
        id: GemId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        instruction: Option<String>,
    },
    /// Delete a Gem
    Delete { id: GemId },
}

#[derive(Args)]
struct LogsArgs {
    /// Signed-in user id; listing requires one
    #[arg(long)]
    user: Option<String>,
    /// Show every user's records instead of only your own
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    persona_talk::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Command::Chat(args) => run_chat(config, args).await,
        Command::Gems(command) => run_gems(config, command).await,
        Command::Logs(args) => run_logs(config, args).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PersonaTalkConfig> {
    let cwd = std::env::current_dir().context("cwd")?;
    info!("loading layered config from cwd: {}", cwd.display());
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = path {
        options = options.with_runtime_path(path);
    }
    let layered = PersonaTalkConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}

fn open_gem_store(config: &PersonaTalkConfig) -> anyhow::Result<JsonGemStore> {
    let Some(path) = config.storage.gems_file() else {
        bail!("no data directory available; set storage.gems_path");
    };
    Ok(JsonGemStore::new(path))
}

fn open_log_store(config: &PersonaTalkConfig) -> anyhow::Result<SqliteLearningLogStore> {
    let Some(path) = config.storage.logs_file() else {
        bail!("no data directory available; set storage.logs_path");
    };
    SqliteLearningLogStore::open(&path)
        .with_context(|| format!("failed to open learning log store at {}", path.display()))
}

async fn run_chat(config: PersonaTalkConfig, args: ChatArgs) -> anyhow::Result<()> {
    let gems = open_gem_store(&config)?;
    let persona = Persona::resolve(&args.persona, &config.personas, &gems)
        .await
        .context("failed to resolve persona")?;
    let gateway = HttpCompletionGateway::from_config(&config.gateway, persona.settings().clone())
        .context("failed to build completion gateway")?;

    let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::new());
    let notices = NoticeBoard::new(
        Duration::from_millis(config.notice.duration_ms),
        Some(sink.clone()),
    );
    let principals = principal_provider(args.user.as_deref());
    let logs = Arc::new(open_log_store(&config)?);
    let dispatcher = Arc::new(SideEffectDispatcher::new(principals, logs).with_notices(notices));
    let speech = renderer_from_config(&config.speech, Some(sink.clone()));

    println!("{} {}  (/help for commands)", persona.icon(), persona.name());
    let session = ConversationSession::builder(persona, Arc::new(gateway))
        .speech(speech)
        .speech_enabled(config.speech.enabled && !args.no_speech)
        .dispatcher(dispatcher)
        .event_sink(sink)
        .build();
    for message in session.history() {
        print_message(&session, &message);
    }

    let mut saves: Vec<DispatchHandle> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        let outcome = match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Message(text) => session.submit(&text).await,
            ChatInput::Retry => session.retry().await,
            ChatInput::Speech(enabled) => {
                session.set_speech_enabled(enabled);
                println!("read-aloud {}", if enabled { "on" } else { "off" });
                continue;
            }
            ChatInput::Stop => {
                session.stop_speaking();
                continue;
            }
            ChatInput::History => {
                for message in session.history() {
                    print_message(&session, &message);
                }
                continue;
            }
            ChatInput::Help => {
                println!("{HELP}");
                continue;
            }
            ChatInput::Quit => break,
            ChatInput::Unknown(command) => {
                println!("unknown command: {command}");
                continue;
            }
        };
        match outcome {
            Ok(TurnOutcome::Completed(reply)) => {
                println!(
                    "{} {}",
                    session.persona().icon(),
                    reply_text(&reply.visible_text)
                );
                saves.extend(reply.dispatch);
            }
            Ok(TurnOutcome::Ignored) => println!("(still waiting for the previous reply)"),
            Err(SessionError::NothingToRetry) => println!("nothing to retry"),
            Err(err @ SessionError::Gateway(_)) => {
                eprintln!("{err}");
                eprintln!("type /retry to resend");
            }
            Err(err) => eprintln!("{err}"),
        }
    }
    session.stop_speaking();
    finish_saves(saves).await;
    Ok(())
}

fn principal_provider(user: Option<&str>) -> Arc<dyn PrincipalProvider> {
    match user {
        Some(user) => Arc::new(StaticPrincipalProvider::signed_in(Principal::new(user))),
        None => Arc::new(StaticPrincipalProvider::anonymous()),
    }
}

fn print_message(session: &ConversationSession, message: &Message) {
    match message.role {
        Role::User => println!("> {}", message.content),
        Role::Assistant => println!(
            "{} {}",
            session.persona().icon(),
            reply_text(&message.content)
        ),
    }
}

async fn run_gems(config: PersonaTalkConfig, command: GemsCommand) -> anyhow::Result<()> {
    let store = open_gem_store(&config)?;
    match command {
        GemsCommand::List => {
            for gem in store.list().await.context("failed to list gems")? {
                println!("{}  {} {}  {}", gem.id, gem.icon, gem.name, gem.description);
            }
        }
        GemsCommand::Show { id } => {
            let Some(gem) = store.get(id).await.context("failed to read gem")? else {
                bail!("gem not found: {id}");
            };
            println!("{} {}", gem.icon, gem.name);
            println!("id: {}", gem.id);
            println!("created: {}", gem.created_at.to_rfc3339());
            if !gem.description.is_empty() {
                println!("{}", gem.description);
            }
            println!();
            println!("{}", gem.instruction_text);
        }
        GemsCommand::Create {
            name,
            icon,
            description,
            instruction,
        } => {
            if instruction.trim().is_empty() {
                bail!("instruction text must not be empty");
            }
            let gem = store
                .create(GemDraft {
                    name,
                    icon,
                    description,
                    instruction_text: instruction,
                })
                .await
                .context("failed to create gem")?;
            println!("{}", gem.id);
        }
        GemsCommand::Update {
            id,
            name,
            icon,
            description,
            instruction,
        } => {
            let gem = store
                .update(
                    id,
                    GemPatch {
                        name,
                        icon,
                        description,
                        instruction_text: instruction,
                    },
                )
                .await
                .context("failed to update gem")?;
            println!("updated {} {}", gem.icon, gem.name);
        }
        GemsCommand::Delete { id } => {
            if !store.delete(id).await.context("failed to delete gem")? {
                bail!("gem not found: {id}");
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn run_logs(config: PersonaTalkConfig, args: LogsArgs) -> anyhow::Result<()> {
    let store = Arc::new(open_log_store(&config)?);
    let reader = SideEffectDispatcher::new(principal_provider(args.user.as_deref()), store);
    let logs = if args.all {
        reader.list_all_logs().await
    } else {
        reader.list_own_logs().await
    }
    .context("failed to list learning logs")?;
    if logs.is_empty() {
        println!("no learning records yet");
    }
    for log in &logs {
        println!("{}", log_line(log));
    }
    Ok(())
}
