//! Routing tests for `MarketplaceGateway`: proxy, direct and fallback.

use std::sync::Arc;

use serde_json::json;
use sourcing_core::CredentialRecord;
use sourcing_gateway::{
    CredentialSource, GatewayClient, GatewayError, GatewayMode, GatewayRequest,
    MarketplaceGateway, ProxyClient,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORDERS_PATH: &str = "/v2/providers/openapi/apis/api/v4/vendors/A0001/ordersheets";
const PROXY_KEY: &str = "shared-proxy-key";

struct StaticSource(Vec<CredentialRecord>);

impl CredentialSource for StaticSource {
    fn active_credentials(&self, user_id: &str) -> Result<Vec<CredentialRecord>, GatewayError> {
        Ok(self
            .0
            .iter()
            .filter(|c| c.is_active && c.user_id == user_id)
            .cloned()
            .collect())
    }
}

fn record(user_id: &str) -> CredentialRecord {
    CredentialRecord {
        user_id: user_id.to_owned(),
        alias: None,
        access_key: "ak".to_owned(),
        secret_key: "sk".to_owned(),
        vendor_id: "A0001".to_owned(),
        vendor_user_id: None,
        is_active: true,
        created_at: None,
    }
}

fn gateway(
    marketplace: &str,
    proxy: Option<&str>,
    creds: Vec<CredentialRecord>,
) -> MarketplaceGateway {
    let direct = GatewayClient::with_base_url(marketplace, 5).expect("direct client");
    let proxy = proxy.map(|url| ProxyClient::new(url, PROXY_KEY, 5).expect("proxy client"));
    MarketplaceGateway::new(direct, proxy, Arc::new(StaticSource(creds)))
}

// Nothing listens on the discard port.
const DEAD_PROXY: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn direct_mode_uses_resolved_credentials() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .and(header("x-requested-by", "A0001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&marketplace)
        .await;

    let gw = gateway(&marketplace.uri(), None, vec![record("u1")]);
    assert_eq!(gw.mode(), GatewayMode::Direct);

    let response = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.expect("call");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn direct_mode_without_credentials_fails_cleanly() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&marketplace)
        .await;

    let gw = gateway(&marketplace.uri(), None, vec![]);
    let err = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.unwrap_err();
    assert!(matches!(err, GatewayError::NoCredentials { .. }));
}

#[tokio::test]
async fn indirect_mode_forwards_with_proxy_headers() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&marketplace)
        .await;

    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/marketplace{ORDERS_PATH}")))
        .and(header("x-proxy-key", PROXY_KEY))
        .and(header("x-user-id", "u1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-upstream-status", "200")
                .set_body_json(json!({"data": [{"orderId": 1}]})),
        )
        .expect(1)
        .mount(&proxy)
        .await;

    let gw = gateway(&marketplace.uri(), Some(&proxy.uri()), vec![record("u1")]);
    assert_eq!(gw.mode(), GatewayMode::Indirect);

    let response = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.expect("call");
    assert_eq!(response.body["data"][0]["orderId"], 1);
}

#[tokio::test]
async fn marketplace_error_through_proxy_is_not_a_fallback_trigger() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&marketplace)
        .await;

    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-upstream-status", "400")
                .set_body_json(json!({"code": "ERROR", "message": "bad request"})),
        )
        .mount(&proxy)
        .await;

    let gw = gateway(&marketplace.uri(), Some(&proxy.uri()), vec![record("u1")]);
    let response = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.expect("call");

    assert_eq!(response.status, 400);
    assert_eq!(response.body["message"], "bad request");
}

#[tokio::test]
async fn unreachable_proxy_falls_back_to_direct() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"via": "direct"})))
        .expect(1)
        .mount(&marketplace)
        .await;

    let gw = gateway(&marketplace.uri(), Some(DEAD_PROXY), vec![record("u1")]);
    let response = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.expect("call");

    assert_eq!(response.body["via"], "direct");
}

#[tokio::test]
async fn proxy_rejection_without_upstream_marker_falls_back() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"via": "direct"})))
        .expect(1)
        .mount(&marketplace)
        .await;

    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid proxy key"})),
        )
        .mount(&proxy)
        .await;

    let gw = gateway(&marketplace.uri(), Some(&proxy.uri()), vec![record("u1")]);
    let response = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.expect("call");

    assert_eq!(response.body["via"], "direct");
}

#[tokio::test]
async fn failed_fallback_returns_the_proxy_error() {
    let marketplace = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&marketplace)
        .await;

    let gw = gateway(&marketplace.uri(), Some(DEAD_PROXY), vec![]);
    let err = gw.call("u1", &GatewayRequest::get(ORDERS_PATH)).await.unwrap_err();

    assert!(matches!(err, GatewayError::ProxyTransport(_)));
}

#[tokio::test]
async fn update_price_puts_to_vendor_item_path() {
    let marketplace = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(
            "/v2/providers/seller_api/apis/api/v1/marketplace/vendor-items/3000123/prices/10000",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "SUCCESS"})))
        .expect(1)
        .mount(&marketplace)
        .await;

    let gw = gateway(&marketplace.uri(), None, vec![record("u1")]);
    let response = gw.update_price("u1", "3000123", 10_000).await.expect("call");
    assert!(response.is_success());
}
