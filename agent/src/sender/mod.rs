pub mod pool;
pub mod transport;

pub use pool::SenderPool;
pub use transport::{GrpcTransport, HttpTransport, Transport, TransportError};
