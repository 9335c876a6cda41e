mod commands;
mod config;
mod render;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ChatSession, HttpAnalysisBackend, SessionEvent, UploadFile};
use shared::domain::MessageRole;
use storage::{FileStore, SessionStore};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, HELP};

#[derive(Parser, Debug)]
#[command(about = "Chat with your Excel files through the analysis backend")]
struct Args {
    /// Flat key/value toml file with api_url, data_dir and query_timeout_secs.
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    query_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config);
    if let Some(v) = args.api_url {
        settings.api_url = v;
    }
    if let Some(v) = args.data_dir {
        settings.data_dir = v;
    }
    if let Some(v) = args.query_timeout_secs {
        settings.query_timeout_secs = v;
    }
    settings.validate()?;
    info!(
        api_url = %settings.api_url,
        data_dir = %settings.data_dir.display(),
        query_timeout_secs = settings.query_timeout_secs,
        "sheetchat: starting"
    );

    let kv = FileStore::new(settings.data_dir.clone())?;
    let backend = HttpAnalysisBackend::new(&settings.api_url)?;
    let mut session = ChatSession::restore(Arc::new(backend), SessionStore::new(Arc::new(kv)))
        .with_query_timeout(settings.query_timeout());

    println!("sheetchat: connected to {}", settings.api_url);
    for message in session.messages() {
        println!("{}", render::render_message(message));
    }
    println!("{}", render::render_status(session.state()));
    println!("Type /help for commands.");

    let printer = tokio::spawn(print_events(session.subscribe_events()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match commands::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Invalid(reason) => println!("{reason}"),
            Command::Status => println!("{}", render::render_status(session.state())),
            Command::History => {
                for message in session.messages() {
                    println!("{}", render::render_message(message));
                }
            }
            Command::Compare => {
                session.request_comparison_mode();
                println!("Comparison mode: upload two files, together or one at a time.");
            }
            Command::Clear => session.clear(),
            Command::Upload(paths) => upload(&mut session, &paths).await,
            Command::Ask(question) => {
                if let Err(err) = session.query(&question).await {
                    debug!("sheetchat: question not answered: {err}");
                }
            }
        }
    }

    drop(session);
    let _ = printer.await;
    Ok(())
}

async fn upload(session: &mut ChatSession, paths: &[PathBuf]) {
    let refused: Vec<String> = paths
        .iter()
        .filter(|path| !commands::is_spreadsheet(path))
        .map(|path| path.display().to_string())
        .collect();
    if !refused.is_empty() {
        println!(
            "Only Excel files (.xlsx, .xls) can be uploaded: {}",
            refused.join(", ")
        );
        return;
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match read_upload(path).await {
            Ok(file) => files.push(file),
            Err(err) => {
                println!("{err:#}");
                return;
            }
        }
    }

    if let Err(err) = session.upload(files).await {
        debug!("sheetchat: upload not completed: {err}");
    }
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadFile::new(name, bytes))
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended(message)) => {
                if message.role == MessageRole::User {
                    continue;
                }
                println!("{}", render::render_message(&message));
            }
            Ok(SessionEvent::ModeChanged(mode)) => debug!(?mode, "sheetchat: mode changed"),
            Ok(SessionEvent::MessageRemoved(_)) => {}
            Ok(SessionEvent::Cleared) => println!("Conversation cleared."),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "sheetchat: event printer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
