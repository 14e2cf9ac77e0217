//! Batch repricing of queued items from wholesale cost.
//!
//! Evaluation is pure: [`evaluate`] decides what an item's price should be and
//! whether the change is large enough to act on. [`reprice_sweep`] applies the
//! accepted changes in place unless the sweep is a dry run.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sourcing_core::{AppConfig, QueueItem, QueueStatus};
use sourcing_queue::QueueStore;

use crate::error::PricingError;
use crate::multipliers::CategoryMultiplierTable;
use crate::rounding::round_to_tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Platform take-rate deducted from the sale price.
    pub fee_rate: Decimal,
    /// Minimum relative price difference that justifies a change.
    pub change_threshold: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            fee_rate: Decimal::new(108, 3),
            change_threshold: Decimal::new(20, 2),
        }
    }
}

impl PricingPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fee_rate: config.fee_rate,
            change_threshold: config.change_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceChange {
    pub item_id: String,
    pub name: String,
    pub vendor_item_id: Option<String>,
    pub source_price: i64,
    pub multiplier: Decimal,
    pub matched_keyword: Option<String>,
    pub old_sale_price: i64,
    pub new_sale_price: i64,
    pub relative_diff: Decimal,
    pub margin: i64,
    pub margin_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepriceSkip {
    TerminalStatus(QueueStatus),
    MissingSourcePrice,
    Malformed(String),
    BelowThreshold { relative_diff: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepriceOutcome {
    Changed(PriceChange),
    Skipped { item_id: String, reason: RepriceSkip },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepriceReport {
    pub outcomes: Vec<RepriceOutcome>,
    pub dry_run: bool,
}

/// Per-reason skip totals for the summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub terminal: usize,
    pub missing_source_price: usize,
    pub malformed: usize,
    pub below_threshold: usize,
}

impl RepriceReport {
    pub fn changes(&self) -> impl Iterator<Item = &PriceChange> {
        self.outcomes.iter().filter_map(|o| match o {
            RepriceOutcome::Changed(change) => Some(change),
            RepriceOutcome::Skipped { .. } => None,
        })
    }

    #[must_use]
    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    #[must_use]
    pub fn skip_counts(&self) -> SkipCounts {
        let mut counts = SkipCounts::default();
        for outcome in &self.outcomes {
            if let RepriceOutcome::Skipped { reason, .. } = outcome {
                match reason {
                    RepriceSkip::TerminalStatus(_) => counts.terminal += 1,
                    RepriceSkip::MissingSourcePrice => counts.missing_source_price += 1,
                    RepriceSkip::Malformed(_) => counts.malformed += 1,
                    RepriceSkip::BelowThreshold { .. } => counts.below_threshold += 1,
                }
            }
        }
        counts
    }

    #[must_use]
    pub fn mutated(&self) -> bool {
        !self.dry_run && self.change_count() > 0
    }
}

/// Half-up rounding to an integer, matching how prices were historically
/// rounded (`-2.5` rounds to `-2`).
fn round_half_up(value: Decimal) -> Option<i64> {
    (value + Decimal::new(5, 1)).floor().to_i64()
}

/// `round(source_price × multiplier)` lifted to the tier grid.
///
/// Returns `None` if the arithmetic overflows.
#[must_use]
pub fn compute_price(source_price: i64, multiplier: Decimal) -> Option<i64> {
    let raw = Decimal::from(source_price).checked_mul(multiplier)?;
    let raw = round_half_up(raw)?;
    round_to_tier(raw)
}

/// `(margin, margin_rate)` for a sale price. `sale_price` must be positive.
#[must_use]
pub fn compute_margin(
    sale_price: i64,
    source_price: i64,
    fee_rate: Decimal,
) -> Option<(i64, i64)> {
    if sale_price <= 0 {
        return None;
    }
    let fee = (Decimal::from(sale_price) * fee_rate)
        .round_dp_with_strategy(0, RoundingStrategy::ToNegativeInfinity)
        .to_i64()?;
    let margin = sale_price.checked_sub(source_price)?.checked_sub(fee)?;
    let rate = round_half_up(
        Decimal::from(margin) / Decimal::from(sale_price) * Decimal::ONE_HUNDRED,
    )?;
    Some((margin, rate))
}

/// Decides the repricing outcome for one item without touching it.
#[must_use]
pub fn evaluate(
    item: &QueueItem,
    table: &CategoryMultiplierTable,
    policy: &PricingPolicy,
) -> RepriceOutcome {
    let skip = |reason| RepriceOutcome::Skipped {
        item_id: item.key().into_owned(),
        reason,
    };

    if !item.status.is_repriceable() {
        return skip(RepriceSkip::TerminalStatus(item.status.clone()));
    }

    let Some(source_price) = item.effective_source_price() else {
        return skip(RepriceSkip::MissingSourcePrice);
    };
    if source_price < 0 {
        return skip(RepriceSkip::Malformed(format!(
            "negative source price {source_price}"
        )));
    }

    let old_sale_price = match item.sale_price {
        Some(p) if p > 0 => p,
        Some(p) => {
            return skip(RepriceSkip::Malformed(format!(
                "non-positive sale price {p}"
            )))
        }
        None => return skip(RepriceSkip::Malformed("missing sale price".to_string())),
    };

    let matched = table.resolve(item.name());
    let Some(new_sale_price) = compute_price(source_price, matched.multiplier) else {
        return skip(RepriceSkip::Malformed(
            "price computation overflowed".to_string(),
        ));
    };

    let relative_diff =
        Decimal::from(old_sale_price - new_sale_price).abs() / Decimal::from(old_sale_price);
    if relative_diff < policy.change_threshold {
        return skip(RepriceSkip::BelowThreshold { relative_diff });
    }

    let Some((margin, margin_rate)) =
        compute_margin(new_sale_price, source_price, policy.fee_rate)
    else {
        return skip(RepriceSkip::Malformed(format!(
            "cannot compute margin for price {new_sale_price}"
        )));
    };

    RepriceOutcome::Changed(PriceChange {
        item_id: item.key().into_owned(),
        name: item.name().to_owned(),
        vendor_item_id: item.vendor_item_id.clone(),
        source_price,
        multiplier: matched.multiplier,
        matched_keyword: matched.keyword.map(str::to_owned),
        old_sale_price,
        new_sale_price,
        relative_diff,
        margin,
        margin_rate,
    })
}

/// Writes an accepted change onto its item.
pub fn apply_change(item: &mut QueueItem, change: &PriceChange, now: DateTime<Utc>) {
    item.old_sale_price = Some(change.old_sale_price);
    item.sale_price = Some(change.new_sale_price);
    item.unit_cost = Some(change.source_price);
    item.margin = Some(change.margin);
    item.margin_rate = Some(change.margin_rate);
    item.price_fixed_at = Some(now);
}

/// Evaluates every item and, unless `dry_run`, applies accepted changes in
/// place. Items below the threshold are not touched at all.
pub fn reprice_sweep(
    items: &mut [QueueItem],
    table: &CategoryMultiplierTable,
    policy: &PricingPolicy,
    dry_run: bool,
    now: DateTime<Utc>,
) -> RepriceReport {
    let mut outcomes = Vec::with_capacity(items.len());

    for item in items.iter_mut() {
        let outcome = evaluate(item, table, policy);
        match &outcome {
            RepriceOutcome::Changed(change) => {
                tracing::info!(
                    item_id = %change.item_id,
                    old = change.old_sale_price,
                    new = change.new_sale_price,
                    margin = change.margin,
                    dry_run,
                    "price change"
                );
                if !dry_run {
                    apply_change(item, change, now);
                }
            }
            RepriceOutcome::Skipped {
                item_id,
                reason: RepriceSkip::Malformed(reason),
            } => {
                tracing::warn!(item_id = %item_id, reason = %reason, "skipping malformed item");
            }
            RepriceOutcome::Skipped { .. } => {}
        }
        outcomes.push(outcome);
    }

    RepriceReport { outcomes, dry_run }
}

/// Loads the queue, sweeps it, and saves once if any price changed.
///
/// # Errors
///
/// Returns [`PricingError::Store`] if the queue cannot be loaded or saved.
pub fn run_reprice_sweep(
    store: &dyn QueueStore,
    table: &CategoryMultiplierTable,
    policy: &PricingPolicy,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<RepriceReport, PricingError> {
    let mut items = store.load()?;
    let report = reprice_sweep(&mut items, table, policy, dry_run, now);
    if report.mutated() {
        store.save(&items)?;
    }
    Ok(report)
}
