//! CLI command implementations
//!
//! Each command builds an in-process stack (memory store, TTL counter cache,
//! outbox) from the configuration, runs one operation, drains the outbox and
//! prints the result as a single JSON object.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cache::TtlCounterCache;
use crate::config::CoreConfig;
use crate::docno::Allocation;
use crate::model::{BulkImport, ModuleKind, TransactionPayload, TransactionalDocument};
use crate::outbox::Outbox;
use crate::sink::{MemorySyncNotifier, TracingReplicationSink};
use crate::store::{DocumentRepository, InMemoryDocumentStore};
use crate::transaction::TransactionService;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_documents, write_error, write_response};

type Document = TransactionalDocument<TransactionPayload>;

/// Parse arguments, run the command and print its response
pub fn run() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse_args();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(run_command(cli.command)) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Logs go to stderr so stdout stays a single JSON object
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute a parsed command, returning the response payload
pub async fn run_command(command: Command) -> CliResult<Value> {
    match command {
        Command::Import {
            config,
            module,
            shop,
            user,
            input,
            existing,
        } => {
            let config = load_config(config.as_deref())?;
            let items: Vec<TransactionPayload> = read_documents(&input)?;
            let seed = load_seed(existing.as_deref())?;

            let outcome = import(config, module, &shop, &user, items, seed).await?;
            Ok(serde_json::to_value(outcome)?)
        }

        Command::NextDocNo {
            config,
            module,
            shop,
            date,
            existing,
        } => {
            let config = load_config(config.as_deref())?;
            let seed = load_seed(existing.as_deref())?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());

            let allocation = next_doc_no(config, module, &shop, date, seed).await?;
            Ok(json!({
                "docno": allocation.doc_no,
                "prefix": allocation.prefix,
                "seq": allocation.seq,
            }))
        }
    }
}

/// Bulk-import `items` into `module` for `shop_id`
pub async fn import(
    config: CoreConfig,
    module: ModuleKind,
    shop_id: &str,
    auth_user: &str,
    items: Vec<TransactionPayload>,
    seed: Vec<Document>,
) -> CliResult<BulkImport> {
    let store = seeded_store(seed).await?;
    let notifier = Arc::new(MemorySyncNotifier::new());
    let outbox = Outbox::start(config.outbox.clone());

    let service = TransactionService::new(
        module,
        store,
        Arc::new(TtlCounterCache::new()),
        Arc::new(TracingReplicationSink::new(module.name())),
        outbox.clone(),
        config,
    )
    .with_notifier(notifier.clone());

    let outcome = service.save_in_batch(shop_id, auth_user, items).await;
    outbox.shutdown().await;

    info!(
        shop_id,
        dirty = ?notifier.dirty_modules(shop_id),
        stats = ?outbox.stats(),
        "import finished"
    );
    Ok(outcome?)
}

/// Allocation the next document of `module` dated `date` would receive
pub async fn next_doc_no(
    config: CoreConfig,
    module: ModuleKind,
    shop_id: &str,
    date: NaiveDate,
    seed: Vec<Document>,
) -> CliResult<Allocation> {
    let store = seeded_store(seed).await?;
    let outbox = Outbox::start(config.outbox.clone());

    let service = TransactionService::new(
        module,
        store,
        Arc::new(TtlCounterCache::new()),
        Arc::new(TracingReplicationSink::new(module.name())),
        outbox.clone(),
        config,
    );

    let allocator = service.allocator();
    let prefix = allocator.prefix(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    let allocation = allocator.allocate(shop_id, &prefix).await;
    outbox.shutdown().await;

    Ok(allocation?)
}

fn load_config(path: Option<&Path>) -> CliResult<CoreConfig> {
    match path {
        Some(path) => Ok(CoreConfig::load(path)?),
        None => Ok(CoreConfig::default()),
    }
}

fn load_seed(path: Option<&Path>) -> CliResult<Vec<Document>> {
    match path {
        Some(path) => read_documents(path),
        None => Ok(Vec::new()),
    }
}

async fn seeded_store(
    seed: Vec<Document>,
) -> CliResult<Arc<InMemoryDocumentStore<TransactionPayload>>> {
    let store = Arc::new(InMemoryDocumentStore::new());
    if !seed.is_empty() {
        let count = seed.len();
        store
            .create_in_batch(seed)
            .await
            .map_err(|e| CliError::invalid_input(format!("Seed documents rejected: {}", e)))?;
        info!(count, "store seeded");
    }
    Ok(store)
}
