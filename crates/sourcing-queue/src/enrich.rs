//! Bounded-concurrency fan-out over sourced items.
//!
//! Each item is processed independently: one failing lookup never aborts its
//! siblings. Output order always matches input order.

use std::fmt::Display;
use std::future::Future;

use futures::stream::{self, StreamExt};

/// Runs `op` over every input with at most `concurrency` calls in flight and
/// returns the per-item results in input order.
pub async fn fan_out<T, R, E, F, Fut>(
    inputs: Vec<T>,
    concurrency: usize,
    op: F,
) -> Vec<Result<R, E>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let op = &op;
    stream::iter(inputs)
        .map(move |input| op(input))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichReport<T> {
    pub items: Vec<T>,
    pub failed: usize,
}

/// Enriches every item; a failed lookup degrades to the unenriched input.
pub async fn enrich_all<T, E, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    enrich: F,
) -> EnrichReport<T>
where
    T: Clone,
    E: Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let enrich = &enrich;
    let results = fan_out(items, concurrency, move |item: T| async move {
        let original = item.clone();
        match enrich(item).await {
            Ok(enriched) => Ok::<T, T>(enriched),
            Err(e) => {
                tracing::warn!(error = %e, "enrichment failed; keeping unenriched item");
                Err(original)
            }
        }
    })
    .await;

    let mut failed = 0;
    let items = results
        .into_iter()
        .map(|r| {
            r.unwrap_or_else(|original| {
                failed += 1;
                original
            })
        })
        .collect();

    EnrichReport { items, failed }
}
