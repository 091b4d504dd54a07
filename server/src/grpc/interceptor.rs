use cidr::IpCidr;
use metrics_core::model::X_REAL_IP_HEADER;
use tonic::{Request, Status};

/// CIDR admission for every RPC, mirroring the HTTP chain's first stage
/// against the `X-Real-IP` metadata entry. A tonic `Interceptor` only
/// sees metadata, not the decoded message, so the HMAC and RSA stages
/// (which operate on request bytes) have no gRPC equivalent here: that
/// protection applies to the HTTP transport only.
#[derive(Clone)]
pub struct ProtectionInterceptor {
    trusted_subnet: Option<IpCidr>,
}

impl ProtectionInterceptor {
    pub fn new(trusted_subnet: Option<IpCidr>) -> Self {
        Self { trusted_subnet }
    }
}

impl tonic::service::Interceptor for ProtectionInterceptor {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        let Some(subnet) = &self.trusted_subnet else {
            return Ok(request);
        };

        let client_ip = request
            .metadata()
            .get(X_REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<std::net::IpAddr>().ok());

        match client_ip {
            Some(ip) if subnet.contains(&ip) => Ok(request),
            _ => Err(Status::permission_denied("client IP is not in the trusted subnet")),
        }
    }
}
