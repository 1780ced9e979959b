use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use kitchen_voice::config::EngineKind;
use kitchen_voice::intent;
use kitchen_voice::recognition::{self, RecognitionSession, SessionControl, StdinRecognitionEngine};
use kitchen_voice::{
    CommandSpeechEngine, Config, ConsoleSpeechEngine, Kitchen, Priority, RecipeCatalog,
    SpeechEngine, SpeechQueue, SpeechSettings, spawn_timer_countdown,
};

/// Kitchen - hands-free voice assistant for cooking
#[derive(Parser)]
#[command(name = "kitchen", version, about)]
struct Cli {
    /// Recipe catalog (TOML) to use instead of the built-in recipes
    #[arg(long, env = "KITCHEN_RECIPES")]
    recipes: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for typed commands on stdin (default)
    Listen,
    /// Show how an utterance is classified
    Classify {
        /// Utterance to classify
        utterance: String,
    },
    /// Speak text through the configured speech engine
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the kitchen voice assistant.")]
        text: String,
    },
    /// List recipes, optionally filtered by name or cuisine
    Recipes {
        /// Search text
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,kitchen_voice=info",
        1 => "info,kitchen_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if cli.recipes.is_some() {
        config.recipes_path = cli.recipes;
    }

    match cli.command.unwrap_or(Command::Listen) {
        Command::Listen => listen(&config).await,
        Command::Classify { utterance } => classify(&utterance),
        Command::Say { text } => say(&config, &text).await,
        Command::Recipes { query } => list_recipes(&config, query.as_deref()),
    }
}

/// Run the interactive voice session
async fn listen(config: &Config) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    let speech = speech_queue(config)?;
    let kitchen = Arc::new(Kitchen::new(catalog, speech));

    let mut notifications = kitchen.subscribe();
    tokio::spawn(async move {
        while let Ok(n) = notifications.recv().await {
            println!("[{}] {}", n.title, n.description);
        }
    });

    let countdown = spawn_timer_countdown(&kitchen, config.timing.tick_interval);

    let (events_tx, events_rx) = recognition::event_channel();
    let engine = Arc::new(StdinRecognitionEngine::new(events_tx.clone()));
    let session = RecognitionSession::new(
        Arc::clone(&kitchen),
        engine.clone(),
        events_tx,
        config.timing.clone(),
    );

    let (controls_tx, controls_rx) = mpsc::channel(8);
    let session_task = tokio::spawn(session.run(events_rx, controls_rx));
    controls_tx.send(SessionControl::Start).await?;

    tracing::info!("kitchen assistant ready - type a command, Ctrl-D to quit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("interrupted");
        }
        () = engine.closed() => tracing::debug!("input closed"),
    }

    drop(controls_tx);
    session_task.await?;
    countdown.abort();

    let state = kitchen.snapshot();
    tracing::info!(
        timers = state.timers.len(),
        shopping = state.shopping_list.len(),
        "session ended"
    );

    Ok(())
}

/// Print the intent for an utterance
fn classify(utterance: &str) -> anyhow::Result<()> {
    let output = match intent::classify_with_rule(utterance) {
        Some((rule, intent)) => serde_json::json!({ "rule": rule, "intent": intent }),
        None => serde_json::json!({ "rule": null, "intent": intent::Intent::Unrecognized }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Speak text once
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    let speech = speech_queue(config)?;
    speech.speak(text, Priority::High).await;
    Ok(())
}

/// Print the recipe catalog
fn list_recipes(config: &Config, query: Option<&str>) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    let recipes: Vec<_> = match query {
        Some(q) => catalog.search(q),
        None => catalog.all().iter().collect(),
    };

    if recipes.is_empty() {
        println!("No recipes found");
        return Ok(());
    }

    for recipe in recipes {
        println!(
            "{:>3}  {:<20} {:<10} {:>4} min  serves {}",
            recipe.id,
            recipe.name,
            recipe.cuisine,
            recipe.total_time(),
            recipe.servings
        );
    }

    Ok(())
}

fn load_catalog(config: &Config) -> anyhow::Result<RecipeCatalog> {
    Ok(match &config.recipes_path {
        Some(path) => RecipeCatalog::load(path)?,
        None => RecipeCatalog::builtin(),
    })
}

fn speech_queue(config: &Config) -> anyhow::Result<SpeechQueue> {
    let engine: Arc<dyn SpeechEngine> = match config.voice.engine {
        EngineKind::Console => Arc::new(ConsoleSpeechEngine::new()),
        EngineKind::Command => Arc::new(CommandSpeechEngine::new(config.voice.command.as_str())?),
    };

    Ok(SpeechQueue::new(
        engine,
        SpeechSettings::from(&config.voice),
        config.timing.utterance_gap,
    ))
}
