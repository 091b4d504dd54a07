use std::net::IpAddr;
use std::str::FromStr;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use cidr::IpCidr;
use metrics_core::model::X_REAL_IP_HEADER;
use tracing::error;

/// Subnet admission, first stage of the protection chain: the declared
/// client IP (`X-Real-IP`) must fall inside the configured CIDR block.
#[derive(Clone)]
pub struct TrustedSubnet(pub IpCidr);

impl FromStr for TrustedSubnet {
    type Err = cidr::errors::NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

pub async fn check_ip(State(subnet): State<TrustedSubnet>, request: Request, next: Next) -> Result<Response, StatusCode> {
    let client_ip = request
        .headers()
        .get(X_REAL_IP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<IpAddr>().ok());

    let Some(client_ip) = client_ip else {
        error!(header = ?request.headers().get(X_REAL_IP_HEADER), "missing or unparseable X-Real-IP header");
        return Err(StatusCode::FORBIDDEN);
    };

    if !subnet.0.contains(&client_ip) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
