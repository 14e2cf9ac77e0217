use anyhow::Context;
use sourcing_core::AppConfig;
use sourcing_queue::{run_retry_sweep, JsonFileStore, RetryOptions, RetryOutcome, RetryReport};

use crate::{fmt_opt, truncate};

/// Sweep `error` items back to `pending`.
///
/// # Errors
///
/// Returns an error if the queue cannot be loaded or saved.
pub(crate) fn run_retry(
    config: &AppConfig,
    dry_run: bool,
    abandon_exhausted: bool,
    max_retries: Option<u32>,
) -> anyhow::Result<()> {
    let options = RetryOptions {
        max_retries: max_retries.unwrap_or(config.max_retries),
        dry_run,
        abandon_exhausted,
    };
    let store = JsonFileStore::new(&config.queue_path);

    let report = run_retry_sweep(&store, &options).context("retry sweep failed")?;
    print_report(&report, options.max_retries);
    Ok(())
}

fn print_report(report: &RetryReport, max_retries: u32) {
    if report.outcomes.is_empty() {
        println!("no items in error");
        return;
    }

    println!("{:<16}{:<32}{:>9}  {:<12}ERROR", "ID", "NAME", "ATTEMPT", "OUTCOME");
    for outcome in &report.outcomes {
        let (item_id, name, attempt, error, label) = match outcome {
            RetryOutcome::Reset {
                item_id,
                name,
                attempt,
                error,
            } => (item_id, name, attempt, error, "pending"),
            RetryOutcome::Exhausted {
                item_id,
                name,
                attempt,
                error,
            } => (item_id, name, attempt, error, "exhausted"),
            RetryOutcome::Abandoned {
                item_id,
                name,
                attempt,
                error,
            } => (item_id, name, attempt, error, "abandoned"),
        };
        println!(
            "{:<16}{:<32}{:>9}  {:<12}{}",
            truncate(item_id, 14),
            truncate(name, 28),
            format!("{attempt}/{max_retries}"),
            label,
            truncate(&fmt_opt(error.as_deref()), 60)
        );
    }

    println!();
    println!(
        "{} reset to pending, {} over the retry limit, {} abandoned{}",
        report.reset_count(),
        report.exhausted_count(),
        report.abandoned_count(),
        if report.dry_run { " (dry run, queue not modified)" } else { "" }
    );
}
