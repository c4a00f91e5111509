//! Object store client with a circuit breaker guarding its mutating calls.

mod backend;
mod circuit_breaker;
mod client;

pub use backend::build_object_store;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitStats, CircuitState};
pub use client::ObjectStoreClient;

pub use object_store::ObjectMeta;
