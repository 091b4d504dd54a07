pub mod interceptor;
pub mod service;

pub use interceptor::ProtectionInterceptor;
pub use service::MetricsService;
