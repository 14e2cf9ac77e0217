pub mod client;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod proxy;
pub(crate) mod retry;
pub mod signer;
pub mod types;

pub use client::{GatewayClient, REQUESTED_BY_HEADER, SIGNED_DATE_HEADER};
pub use credentials::{
    resolve_active, ChainedCredentialSource, CredentialSource, EnvCredentialSource,
    FileCredentialSource,
};
pub use error::GatewayError;
pub use gateway::{price_update_path, GatewayMode, MarketplaceGateway};
pub use proxy::{
    ProxyClient, PROXY_KEY_HEADER, PROXY_ROUTE_PREFIX, UPSTREAM_STATUS_HEADER, USER_ID_HEADER,
};
pub use signer::{sign, signed_date, SignedRequest, SIGNED_DATE_FORMAT};
pub use types::{GatewayRequest, GatewayResponse};

pub use reqwest::Method;
