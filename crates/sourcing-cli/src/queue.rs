//! Queue inspection and manual edits.

use anyhow::Context;
use clap::Subcommand;
use sourcing_core::{AppConfig, QueueItem, QueueStatus};
use sourcing_queue::{filter_by_status, JsonFileStore, QueueStore};

use crate::{fmt_opt, truncate};

#[derive(Debug, Subcommand)]
pub enum QueueCommands {
    /// List queue items
    List {
        /// Only show items in this status (e.g. error, pending, registered)
        #[arg(long)]
        status: Option<String>,
    },
    /// Mark an item deleted; the record is kept for audit
    Delete {
        /// Queue item id, or the product number for records without one
        id: String,
    },
}

pub(crate) fn run_queue(config: &AppConfig, command: QueueCommands) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&config.queue_path);
    match command {
        QueueCommands::List { status } => run_queue_list(&store, status.as_deref()),
        QueueCommands::Delete { id } => run_queue_delete(&store, &id),
    }
}

/// # Errors
///
/// Returns an error if the queue cannot be loaded.
pub(crate) fn run_queue_list(store: &dyn QueueStore, status: Option<&str>) -> anyhow::Result<()> {
    let items = store.load().context("failed to load queue")?;
    let shown: Vec<&QueueItem> = match status {
        Some(s) => filter_by_status(&items, &QueueStatus::from(s)),
        None => items.iter().collect(),
    };

    if shown.is_empty() {
        println!(
            "no queue items{}",
            status.map(|s| format!(" with status {s}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<16}{:<32}{:<16}{:>6}{:>12}  ERROR",
        "ID", "NAME", "STATUS", "RETRY", "SALE PRICE"
    );
    for item in &shown {
        println!(
            "{:<16}{:<32}{:<16}{:>6}{:>12}  {}",
            truncate(&item.key(), 14),
            truncate(item.name(), 28),
            item.status,
            fmt_opt(item.retry_count),
            fmt_opt(item.sale_price),
            truncate(&fmt_opt(item.error.as_deref()), 60)
        );
    }
    println!();
    println!("{} of {} items", shown.len(), items.len());
    Ok(())
}

/// # Errors
///
/// Returns an error if the item does not exist, is already deleted, or the
/// queue cannot be loaded or saved.
pub(crate) fn run_queue_delete(store: &dyn QueueStore, id: &str) -> anyhow::Result<()> {
    if id.is_empty() {
        anyhow::bail!("queue item id must be non-empty");
    }
    let mut items = store.load().context("failed to load queue")?;
    let item = items
        .iter_mut()
        .find(|item| item.key() == id)
        .ok_or_else(|| anyhow::anyhow!("queue item '{id}' not found"))?;

    let previous = item.status.clone();
    item.mark_deleted()?;
    store.save(&items).context("failed to save queue")?;

    tracing::info!(item_id = id, from = %previous, "queue item deleted");
    println!("{id}: {previous} -> deleted");
    Ok(())
}
