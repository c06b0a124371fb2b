//! `artisan` command-line entry point.
//!
//! Hosts one intake session on the terminal, bootstraps the local runtime
//! directory, and exposes one-shot classification for prompt debugging.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use uuid::Uuid;

use artisan::backend::rest::RestBackend;
use artisan::backend::sqlite::SqliteBackend;
use artisan::backend::Backend;
use artisan::config::{
    load_config_or_default, runtime_paths, BackendKind, Config, RuntimePaths, DEFAULT_CONFIG_TOML,
};
use artisan::credentials::{
    enforce_private_file_permissions, load_credentials, Credentials, BACKEND_API_KEY,
    GOOGLE_MAPS_API_KEY, OPENAI_API_KEY,
};
use artisan::geocoding::google::GoogleGeocoder;
use artisan::geocoding::Geocoder;
use artisan::intake::generator::SERVICE_CATALOG;
use artisan::intake::{
    Classifier, FieldValidator, IntakeSession, RequestSubmitter, ResponseGenerator, Transcript,
};
use artisan::logging;
use artisan::providers::openai::OpenAiProvider;
use artisan::providers::LlmProvider;

const ENV_TEMPLATE: &str = "OPENAI_API_KEY=\nGOOGLE_MAPS_API_KEY=\nBACKEND_API_KEY=\n";

#[derive(Debug, Parser)]
#[command(name = "artisan", version, about = "Conversational service-request intake")]
struct Cli {
    /// Runtime directory (defaults to ~/.artisan).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the runtime directory, default config, and local database.
    Init,
    /// Run an interactive intake session.
    Chat {
        /// Client the request is filed for.
        #[arg(long)]
        client_id: Uuid,
    },
    /// Classify one message and print the result as JSON.
    Classify {
        /// Message text.
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = match cli.home {
        Some(root) => RuntimePaths::from_root(root),
        None => runtime_paths()?,
    };

    match cli.command {
        Command::Init => {
            logging::init_cli();
            init(&paths).await
        }
        Command::Chat { client_id } => {
            let _guard = logging::init_session(&paths.logs_dir)?;
            chat(&paths, client_id).await
        }
        Command::Classify { text } => {
            logging::init_cli();
            classify(&paths, &text.join(" ")).await
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn init(paths: &RuntimePaths) -> anyhow::Result<()> {
    std::fs::create_dir_all(&paths.root)
        .with_context(|| format!("failed to create {}", paths.root.display()))?;

    if !paths.config_file.exists() {
        std::fs::write(&paths.config_file, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("failed to write {}", paths.config_file.display()))?;
        info!(path = %paths.config_file.display(), "config written");
    }
    if !paths.env_file.exists() {
        std::fs::write(&paths.env_file, ENV_TEMPLATE)
            .with_context(|| format!("failed to write {}", paths.env_file.display()))?;
        enforce_private_file_permissions(&paths.env_file)?;
        info!(path = %paths.env_file.display(), "credentials template written");
    }

    let config = load_config_or_default(&paths.config_file)?;
    let sqlite = SqliteBackend::connect(&paths.database_url(&config.backend))
        .await
        .context("failed to open local database")?;
    sqlite.init_schema().await?;
    let added = sqlite.seed_services(SERVICE_CATALOG).await?;

    println!("Runtime directory: {}", paths.root.display());
    println!("Services added: {added}");
    println!("Add your API keys to {}", paths.env_file.display());
    Ok(())
}

async fn chat(paths: &RuntimePaths, client_id: Uuid) -> anyhow::Result<()> {
    let config = load_config_or_default(&paths.config_file)?;
    let credentials = load_runtime_credentials(paths)?;
    let backend = build_backend(paths, &config, &credentials).await?;
    let mut session = build_session(&config, &credentials, backend);

    println!("Bonjour ! Décrivez le service dont vous avez besoin.");
    println!("(/form affiche la demande, /confirm l'envoie, /reset recommence, /quit quitte)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/reset" => {
                session.reset();
                println!("Nouvelle demande. De quel service avez-vous besoin ?");
            }
            "/form" => println!("{}", session.summary()),
            "/confirm" => {
                let reply = session.confirm(client_id).await;
                println!("{}", reply.text);
            }
            text => {
                let reply = session.handle_message(text).await;
                println!("{}", reply.text);
                if reply.complete {
                    println!("\n{}\nTapez /confirm pour envoyer la demande.", session.summary());
                }
            }
        }
    }

    info!("intake session ended");
    Ok(())
}

async fn classify(paths: &RuntimePaths, text: &str) -> anyhow::Result<()> {
    let config = load_config_or_default(&paths.config_file)?;
    let credentials = load_runtime_credentials(paths)?;
    let classifier = Classifier::new(build_provider(&config, &credentials)).with_sampling(
        config.llm.classify_temperature,
        config.llm.max_tokens,
    );

    let classification = classifier.classify(text, &Transcript::new()).await;
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn load_runtime_credentials(paths: &RuntimePaths) -> anyhow::Result<Credentials> {
    if paths.env_file.exists() {
        load_credentials(&paths.env_file)
    } else {
        warn!(path = %paths.env_file.display(), "no credentials file, remote services disabled");
        Ok(Credentials::default())
    }
}

fn build_provider(config: &Config, credentials: &Credentials) -> Option<Arc<dyn LlmProvider>> {
    let key = credentials.api_key(OPENAI_API_KEY)?;
    Some(Arc::new(OpenAiProvider::with_endpoint(
        config.llm.model.clone(),
        config.llm.endpoint.clone(),
        key,
    )))
}

fn build_geocoder(config: &Config, credentials: &Credentials) -> Option<Arc<dyn Geocoder>> {
    let key = credentials.api_key(GOOGLE_MAPS_API_KEY)?;
    Some(Arc::new(GoogleGeocoder::new(&config.geocoding, key)))
}

async fn build_backend(
    paths: &RuntimePaths,
    config: &Config,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn Backend>> {
    match config.backend.kind {
        BackendKind::Sqlite => {
            let sqlite = SqliteBackend::connect(&paths.database_url(&config.backend))
                .await
                .context("failed to open local database")?;
            sqlite.init_schema().await?;
            Ok(Arc::new(sqlite))
        }
        BackendKind::Rest => {
            let url = config
                .backend
                .rest_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("[backend] rest_url is required for kind = \"rest\""))?;
            let key = credentials
                .api_key(BACKEND_API_KEY)
                .ok_or_else(|| anyhow::anyhow!("missing required credential: {BACKEND_API_KEY}"))?;
            Ok(Arc::new(RestBackend::new(url, key)?))
        }
    }
}

fn build_session(
    config: &Config,
    credentials: &Credentials,
    backend: Arc<dyn Backend>,
) -> IntakeSession {
    let provider = build_provider(config, credentials);
    if provider.is_none() {
        warn!("{OPENAI_API_KEY} not set, the assistant will only apologise");
    }

    IntakeSession::new(
        Classifier::new(provider.clone())
            .with_sampling(config.llm.classify_temperature, config.llm.max_tokens),
        FieldValidator::new(build_geocoder(config, credentials)),
        ResponseGenerator::new(provider)
            .with_sampling(config.llm.reply_temperature, config.llm.max_tokens),
        RequestSubmitter::new(backend),
    )
}
