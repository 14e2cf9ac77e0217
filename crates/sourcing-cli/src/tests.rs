use clap::Parser;

use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["sourcing-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn reprice_defaults_to_commit_without_apply() {
    let cli = Cli::try_parse_from(["sourcing-cli", "reprice"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Reprice {
            dry_run: false,
            apply: false,
            ..
        })
    ));
}

#[test]
fn reprice_dry_run() {
    let cli = Cli::try_parse_from(["sourcing-cli", "reprice", "--dry-run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Reprice { dry_run: true, .. })
    ));
}

#[test]
fn reprice_apply_with_user() {
    let cli =
        Cli::try_parse_from(["sourcing-cli", "reprice", "--apply", "--user", "u-1"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Reprice {
            apply: true,
            user: Some(ref u),
            ..
        }) if u == "u-1"
    ));
}

#[test]
fn reprice_dry_run_conflicts_with_apply() {
    assert!(Cli::try_parse_from(["sourcing-cli", "reprice", "--dry-run", "--apply"]).is_err());
}

#[test]
fn retry_flags() {
    let cli = Cli::try_parse_from([
        "sourcing-cli",
        "retry",
        "--dry-run",
        "--abandon-exhausted",
        "--max-retries",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Retry {
            dry_run: true,
            abandon_exhausted: true,
            max_retries: Some(5)
        })
    ));
}

#[test]
fn retry_defaults() {
    let cli = Cli::try_parse_from(["sourcing-cli", "retry"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Retry {
            dry_run: false,
            abandon_exhausted: false,
            max_retries: None
        })
    ));
}

#[test]
fn queue_list_with_status() {
    let cli = Cli::try_parse_from(["sourcing-cli", "queue", "list", "--status", "error"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Queue {
            command: QueueCommands::List { status: Some(ref s) }
        }) if s == "error"
    ));
}

#[test]
fn queue_delete_takes_id() {
    let cli = Cli::try_parse_from(["sourcing-cli", "queue", "delete", "dome-42"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Queue {
            command: QueueCommands::Delete { ref id }
        }) if id == "dome-42"
    ));
}

#[test]
fn gateway_call_parses_all_options() {
    let cli = Cli::try_parse_from([
        "sourcing-cli",
        "gateway",
        "call",
        "get",
        "/v2/providers/seller_api/apis/api/v1/marketplace/seller-products",
        "--query",
        "vendorId=A0001",
        "--user",
        "u-1",
        "--direct",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Gateway {
            command: GatewayCommands::Call {
                direct: true,
                query: Some(_),
                body: None,
                ..
            }
        })
    ));
}

#[test]
fn gateway_request_parsing_validates_input() {
    let req = gateway::parse_request("put", "/v2/x", Some("?a=1"), Some(r#"{"price": 100}"#))
        .expect("valid request");
    assert_eq!(req.method.as_str(), "PUT");
    assert_eq!(req.query, "a=1");
    assert_eq!(req.body, Some(serde_json::json!({"price": 100})));

    assert!(gateway::parse_request("GET", "v2/x", None, None).is_err());
    assert!(gateway::parse_request("GET", "/v2/x", None, Some("{oops")).is_err());
}

#[test]
fn truncate_counts_characters() {
    assert_eq!(truncate("블루투스 이어폰", 4), "블루투스...");
    assert_eq!(truncate("short", 10), "short");
}
