//! Retry sweep: recovers failed queue items to `pending` up to a bounded
//! number of attempts.
//!
//! Only `error` items are considered. An item whose next attempt would exceed
//! `max_retries` is left exactly as it is and only logged, unless the operator
//! asked to abandon such items, in which case it moves to `error_permanent`.
//! Running the sweep twice in a row is a no-op the second time.

use sourcing_core::{QueueItem, QueueStatus};

use crate::error::StoreError;
use crate::store::QueueStore;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub dry_run: bool,
    /// Move exhausted items to `error_permanent` instead of leaving them in `error`.
    pub abandon_exhausted: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            dry_run: false,
            abandon_exhausted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Moved (or would move, in a dry run) back to `pending`.
    Reset {
        item_id: String,
        name: String,
        attempt: u32,
        error: Option<String>,
    },
    /// Over the retry bound; left untouched.
    Exhausted {
        item_id: String,
        name: String,
        attempt: u32,
        error: Option<String>,
    },
    /// Over the retry bound and moved to `error_permanent`.
    Abandoned {
        item_id: String,
        name: String,
        attempt: u32,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub outcomes: Vec<RetryOutcome>,
    pub dry_run: bool,
}

impl RetryReport {
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.count(|o| matches!(o, RetryOutcome::Reset { .. }))
    }

    #[must_use]
    pub fn exhausted_count(&self) -> usize {
        self.count(|o| matches!(o, RetryOutcome::Exhausted { .. }))
    }

    #[must_use]
    pub fn abandoned_count(&self) -> usize {
        self.count(|o| matches!(o, RetryOutcome::Abandoned { .. }))
    }

    /// Whether a non-dry sweep changed anything that needs saving.
    #[must_use]
    pub fn mutated(&self) -> bool {
        !self.dry_run && (self.reset_count() > 0 || self.abandoned_count() > 0)
    }

    fn count(&self, pred: impl Fn(&RetryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Runs the retry decision over `items` in place.
///
/// In dry-run mode nothing is mutated; the report shows what would happen.
pub fn retry_sweep(items: &mut [QueueItem], options: &RetryOptions) -> RetryReport {
    let mut outcomes = Vec::new();

    for item in items
        .iter_mut()
        .filter(|item| item.status == QueueStatus::Error)
    {
        let attempt = item.next_retry_attempt();
        let name = item.name().to_owned();
        let error = item.error.clone();

        if attempt > options.max_retries {
            tracing::warn!(
                item_id = %item.key(),
                attempt,
                max_retries = options.max_retries,
                error = error.as_deref().unwrap_or(""),
                "retry limit exceeded; leaving item in error"
            );

            if options.abandon_exhausted {
                if !options.dry_run {
                    if let Err(e) = item.transition_to(QueueStatus::ErrorPermanent) {
                        tracing::error!(
                            item_id = %item.key(),
                            error = %e,
                            "could not abandon item"
                        );
                        continue;
                    }
                }
                outcomes.push(RetryOutcome::Abandoned {
                    item_id: item.key().into_owned(),
                    name,
                    attempt,
                    error,
                });
            } else {
                outcomes.push(RetryOutcome::Exhausted {
                    item_id: item.key().into_owned(),
                    name,
                    attempt,
                    error,
                });
            }
            continue;
        }

        if !options.dry_run {
            if let Err(e) = item.recover_for_retry(options.max_retries) {
                tracing::error!(item_id = %item.key(), error = %e, "retry reset rejected");
                continue;
            }
        }

        tracing::info!(
            item_id = %item.key(),
            attempt,
            dry_run = options.dry_run,
            "reset to pending"
        );
        outcomes.push(RetryOutcome::Reset {
            item_id: item.key().into_owned(),
            name,
            attempt,
            error,
        });
    }

    RetryReport {
        outcomes,
        dry_run: options.dry_run,
    }
}

/// Loads the queue once, sweeps it, and saves once if anything changed.
///
/// # Errors
///
/// Returns [`StoreError`] if the queue cannot be loaded or saved. A failed
/// save leaves the stored queue as it was.
pub fn run_retry_sweep(
    store: &dyn QueueStore,
    options: &RetryOptions,
) -> Result<RetryReport, StoreError> {
    let mut items = store.load()?;
    let report = retry_sweep(&mut items, options);
    if report.mutated() {
        store.save(&items)?;
    }
    Ok(report)
}
