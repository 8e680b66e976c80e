//! Line-oriented browser for a draft-aware document store.
//!
//! Usage:
//!   superpane                      # generated demo dataset
//!   superpane --config pane.yaml   # pane and/or HTTP store from YAML

mod config;
mod demo;
mod repl;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::BrowserConfig;
use repl::{render, Command, HELP};
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use superpane::api::{default_search_field, selectable_fields, searchable_fields};
use superpane::types::{DocumentStore, LogicalDocument};
use superpane::{
    FieldDescriptor, MemoryStore, PageState, PaginatedClient, PaneConfig, PaneSignal, PaneSignals,
};
use superpane_http::HttpStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "superpane")]
#[command(about = "Browse a draft-aware document store page by page")]
struct Args {
    /// Config file with optional `pane` and `store` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document type to list, overriding the config
    #[arg(short = 't', long = "type")]
    type_name: Option<String>,

    /// Rows per page, overriding the config
    #[arg(long)]
    page_size: Option<usize>,

    /// Number of generated documents when no store is configured
    #[arg(long, default_value = "120")]
    demo_size: usize,

    /// Log file (defaults to ~/.config/superpane/superpane.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let browser = match &args.config {
        Some(path) => BrowserConfig::load_from_file(path)?,
        None => BrowserConfig::default(),
    };

    let mut demo_store: Option<Arc<MemoryStore>> = None;
    let store: Arc<dyn DocumentStore> = if let Some(store_config) = browser.store.clone() {
        Arc::new(HttpStore::new(store_config)?)
    } else {
        info!(size = args.demo_size, "using generated demo dataset");
        let store = Arc::new(demo::store(args.demo_size));
        demo_store = Some(store.clone());
        store
    };
    let schema = if demo_store.is_some() {
        demo::schema()
    } else {
        Vec::new()
    };

    let mut pane = match (browser.pane, &demo_store) {
        (Some(pane), _) => pane,
        (None, Some(_)) => PaneConfig::new(demo::DEMO_TYPE)
            .with_columns(demo::default_columns())
            .with_search_field(default_search_field(&schema)),
        (None, None) => PaneConfig::default(),
    };
    if let Some(type_name) = args.type_name {
        pane.type_name = type_name;
    }
    if let Some(page_size) = args.page_size {
        pane.page_size = page_size;
    }
    pane.validate().context("Pane configuration is incomplete")?;

    run(store, demo_store.as_deref(), &schema, pane).await
}

async fn run(
    store: Arc<dyn DocumentStore>,
    demo_store: Option<&MemoryStore>,
    schema: &[FieldDescriptor],
    pane: PaneConfig,
) -> Result<()> {
    let client = PaginatedClient::new(store, pane);
    let signals = PaneSignals::new();
    let _binding = client.bind_signals(&signals);
    let renderer = tokio::spawn(render_changes(client.subscribe()));

    println!("type 'help' for commands");
    client.load().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(e) = execute(&client, &signals, demo_store, schema, command).await {
                    eprintln!("{}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    client.close().await;
    renderer.abort();
    Ok(())
}

async fn execute(
    client: &PaginatedClient,
    signals: &PaneSignals,
    demo_store: Option<&MemoryStore>,
    schema: &[FieldDescriptor],
    command: Command,
) -> Result<()> {
    match command {
        Command::Next => client.next_page().await,
        Command::Previous => client.previous_page().await,
        Command::Page(page) => client.set_page(page - 1).await,
        Command::PageSize(size) => client.set_page_size(size).await?,
        Command::Search(text) => client.set_user_query(text).await,
        Command::SearchField(field) => client.set_search_field(field).await,
        Command::Columns(columns) => client.set_columns(columns).await,
        Command::Fields => {
            if schema.is_empty() {
                bail!("no schema available for this store");
            }
            let searchable = searchable_fields(schema);
            for field in selectable_fields(schema) {
                let marker = if searchable.iter().any(|s| s.path == field.path) {
                    "  [searchable]"
                } else {
                    ""
                };
                let indent = "  ".repeat(usize::from(field.level) + 1);
                println!("{}{} ({}){}", indent, field.path, field.kind, marker);
            }
        }
        Command::Refresh => {
            signals.notify(PaneSignal::Refresh);
        }
        Command::Edit { id, title } => {
            let Some(store) = demo_store else {
                bail!("edit only works on the demo dataset");
            };
            store
                .edit_draft(&id, [("title".to_string(), Value::String(title))])
                .await;
        }
        Command::Publish(id) => {
            let Some(store) = demo_store else {
                bail!("publish only works on the demo dataset");
            };
            if !store.publish(&id).await {
                bail!("{} has no draft to publish", id);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

/// Print the page whenever its rows or the total change, whatever caused it.
async fn render_changes(mut states: watch::Receiver<PageState>) {
    let mut shown: Option<(Vec<LogicalDocument>, u64)> = None;
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        let key = (state.results.clone(), state.total);
        if shown.as_ref() != Some(&key) {
            println!("{}", render(&state));
            shown = Some(key);
        }
    }
}

fn default_log_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => {
            let mut path = PathBuf::from(home);
            path.push(".config");
            path.push("superpane");
            std::fs::create_dir_all(&path).ok();
            path.push("superpane.log");
            path
        }
        None => PathBuf::from("superpane.log"),
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let path = args.log_file.clone().unwrap_or_else(default_log_path);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    // Default to INFO level, can be overridden with RUST_LOG
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level))
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(log_file)).with_ansi(false))
        .init();
    Ok(())
}
