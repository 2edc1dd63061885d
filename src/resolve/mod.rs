//! DNS resolution: retryable client, record bundles, endpoint parsing.

pub mod client;
pub mod endpoint;
pub mod record;

// Re-export public API
pub use client::{ResolverClient, ResolverOptions};
pub use endpoint::{load_resolvers, ResolverEndpoint};
pub use record::{rcode_from_name, rcode_name, DnsRecord, TraceData};
