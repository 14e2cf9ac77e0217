//! `reprice` command: batch repricing sweep over the queue file.
//!
//! The queue is read once and written once. With `--apply` the committed
//! prices are then pushed to the marketplace; a failed push is reported and
//! never rolls the queue back.

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use sourcing_core::AppConfig;
use sourcing_gateway::MarketplaceGateway;
use sourcing_pricing::{
    run_reprice_sweep, CategoryMultiplierTable, PriceChange, PricingPolicy, RepriceReport,
};
use sourcing_queue::{fan_out, JsonFileStore};

use crate::truncate;

/// Result of pushing one new price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    Pushed {
        item_id: String,
        price: i64,
        status: u16,
    },
    Rejected {
        item_id: String,
        status: u16,
        message: String,
    },
    Failed {
        item_id: String,
        error: String,
    },
}

/// # Errors
///
/// Returns an error if the multiplier table or queue cannot be loaded, or the
/// queue cannot be saved. Skipped items never cause an error.
pub(crate) async fn run_reprice(
    config: &AppConfig,
    dry_run: bool,
    apply: bool,
    user: Option<&str>,
) -> anyhow::Result<()> {
    if apply && user.is_none() {
        anyhow::bail!(
            "--apply needs --user (or SOURCING_USER_ID) to pick marketplace credentials"
        );
    }

    let table = match &config.multipliers_path {
        Some(path) => CategoryMultiplierTable::load(path)
            .with_context(|| format!("loading multiplier table {}", path.display()))?,
        None => CategoryMultiplierTable::default(),
    };
    let policy = PricingPolicy::from_config(config);
    let store = JsonFileStore::new(&config.queue_path);
    // Fail before the sweep commits anything.
    let gateway = if apply {
        Some(crate::gateway::build_gateway(config)?)
    } else {
        None
    };

    let report = run_reprice_sweep(&store, &table, &policy, dry_run, Utc::now())
        .context("reprice sweep failed")?;
    print_report(&report);

    if dry_run {
        println!("dry run: queue not modified");
        return Ok(());
    }
    if report.change_count() > 0 {
        println!(
            "{} updated ({} items)",
            store.path().display(),
            report.change_count()
        );
    }

    if let (Some(gateway), Some(user)) = (gateway, user) {
        let changes: Vec<PriceChange> = report.changes().cloned().collect();
        let outcomes = push_prices(&gateway, user, changes, config.enrich_concurrency).await;
        print_push_outcomes(&outcomes);
    }

    Ok(())
}

/// Pushes every change that has a `vendorItemId` with bounded concurrency.
pub(crate) async fn push_prices(
    gateway: &MarketplaceGateway,
    user: &str,
    changes: Vec<PriceChange>,
    concurrency: usize,
) -> Vec<PushOutcome> {
    let pushable: Vec<(String, String, i64)> = changes
        .into_iter()
        .filter_map(|c| {
            c.vendor_item_id
                .map(|vendor_item_id| (c.item_id, vendor_item_id, c.new_sale_price))
        })
        .collect();

    let results = fan_out(
        pushable,
        concurrency,
        |(item_id, vendor_item_id, price)| async move {
            match gateway.update_price(user, &vendor_item_id, price).await {
                Ok(resp) if resp.is_success() => Ok(PushOutcome::Pushed {
                    item_id,
                    price,
                    status: resp.status,
                }),
                Ok(resp) => Err(PushOutcome::Rejected {
                    item_id,
                    status: resp.status,
                    message: resp
                        .body
                        .get("message")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_owned(),
                }),
                Err(e) => Err(PushOutcome::Failed {
                    item_id,
                    error: e.to_string(),
                }),
            }
        },
    )
    .await;

    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|failure| failure))
        .collect()
}

fn print_report(report: &RepriceReport) {
    let header = format!(
        "{:<16}{:<32}{:>10}{:>12}{:>12}{:>7}{:>9}{:>10}{:>6}",
        "ID", "NAME", "SOURCE", "OLD", "NEW", "MULT", "DIFF", "MARGIN", "RATE"
    );
    println!("{header}");
    for change in report.changes() {
        let diff_pct = (change.relative_diff * Decimal::ONE_HUNDRED).round_dp(1);
        println!(
            "{:<16}{:<32}{:>10}{:>12}{:>12}{:>7}{:>8}%{:>10}{:>5}%",
            truncate(&change.item_id, 14),
            truncate(&change.name, 28),
            change.source_price,
            change.old_sale_price,
            change.new_sale_price,
            change.multiplier.to_string(),
            diff_pct.to_string(),
            change.margin,
            change.margin_rate
        );
    }

    let skips = report.skip_counts();
    println!();
    println!(
        "{} price changes{}; skipped: {} below threshold, {} terminal, {} without source price, {} malformed",
        report.change_count(),
        if report.dry_run { " (dry run)" } else { "" },
        skips.below_threshold,
        skips.terminal,
        skips.missing_source_price,
        skips.malformed
    );
}

fn print_push_outcomes(outcomes: &[PushOutcome]) {
    if outcomes.is_empty() {
        println!("no changed items carry a vendorItemId; nothing pushed");
        return;
    }

    println!();
    println!("{:<16}{:<10}{:>8}  DETAIL", "ID", "PUSH", "STATUS");
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            PushOutcome::Pushed {
                item_id,
                price,
                status,
            } => {
                println!("{:<16}{:<10}{:>8}  {price}", truncate(item_id, 14), "ok", status);
            }
            PushOutcome::Rejected {
                item_id,
                status,
                message,
            } => {
                failed += 1;
                println!("{:<16}{:<10}{:>8}  {message}", truncate(item_id, 14), "rejected", status);
            }
            PushOutcome::Failed { item_id, error } => {
                failed += 1;
                println!("{:<16}{:<10}{:>8}  {error}", truncate(item_id, 14), "failed", "\u{2014}");
            }
        }
    }
    println!();
    println!("pushed {} of {} prices", outcomes.len() - failed, outcomes.len());
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use sourcing_core::CredentialRecord;
    use sourcing_gateway::{CredentialSource, GatewayClient, GatewayError};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct OneUser;

    impl CredentialSource for OneUser {
        fn active_credentials(&self, user_id: &str) -> Result<Vec<CredentialRecord>, GatewayError> {
            Ok(vec![CredentialRecord {
                user_id: user_id.to_owned(),
                alias: None,
                access_key: "ak".to_owned(),
                secret_key: "sk".to_owned(),
                vendor_id: "A0001".to_owned(),
                vendor_user_id: None,
                is_active: true,
                created_at: None,
            }])
        }
    }

    fn change(item_id: &str, vendor_item_id: Option<&str>, price: i64) -> PriceChange {
        PriceChange {
            item_id: item_id.to_owned(),
            name: "블루투스 이어폰".to_owned(),
            vendor_item_id: vendor_item_id.map(str::to_owned),
            source_price: 5_000,
            multiplier: Decimal::new(20, 1),
            matched_keyword: Some("이어폰".to_owned()),
            old_sale_price: 30_000,
            new_sale_price: price,
            relative_diff: Decimal::new(667, 3),
            margin: 3_920,
            margin_rate: 39,
        }
    }

    #[tokio::test]
    async fn apply_with_broken_gateway_config_leaves_queue_untouched() {
        let dir = std::env::temp_dir().join(format!("sourcing-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let queue_path = dir.join("register_queue.json");
        let raw = r#"[{"id":"a","status":"priced","displayName":"블루투스 이어폰",
            "sourcePrice":5000,"salePrice":30000,"vendorItemId":"111"}]"#;
        std::fs::write(&queue_path, raw).unwrap();

        let config = AppConfig {
            env: sourcing_core::Environment::Test,
            log_level: "info".to_owned(),
            queue_path: queue_path.clone(),
            credentials_path: dir.join("credentials.json"),
            multipliers_path: None,
            fee_rate: Decimal::new(108, 3),
            change_threshold: Decimal::new(20, 2),
            max_retries: 3,
            enrich_concurrency: 2,
            marketplace_base_url: "not a url".to_owned(),
            proxy_url: None,
            proxy_key: None,
            gateway_timeout_secs: 5,
            gateway_max_429_retries: 0,
            gateway_backoff_base_ms: 1,
            proxy_bind_addr: "127.0.0.1:0".parse().unwrap(),
        };

        assert!(run_reprice(&config, false, true, Some("u1")).await.is_err());
        assert_eq!(std::fs::read_to_string(&queue_path).unwrap(), raw);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn pushes_only_items_with_vendor_item_id_and_reports_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/providers/seller_api/apis/api/v1/marketplace/vendor-items/111/prices/10000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "SUCCESS"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v2/providers/seller_api/apis/api/v1/marketplace/vendor-items/222/prices/12500"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"code": "ERROR", "message": "price locked"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = MarketplaceGateway::new(
            GatewayClient::with_base_url(&server.uri(), 5).unwrap(),
            None,
            Arc::new(OneUser),
        );
        let outcomes = push_prices(
            &gateway,
            "u1",
            vec![
                change("a", Some("111"), 10_000),
                change("b", None, 9_000),
                change("c", Some("222"), 12_500),
            ],
            2,
        )
        .await;

        assert_eq!(
            outcomes,
            vec![
                PushOutcome::Pushed {
                    item_id: "a".to_owned(),
                    price: 10_000,
                    status: 200
                },
                PushOutcome::Rejected {
                    item_id: "c".to_owned(),
                    status: 400,
                    message: "price locked".to_owned()
                },
            ]
        );
    }
}
