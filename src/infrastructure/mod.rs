//! Adapters behind the domain ports: in-memory stores providing the atomic
//! conditional primitives, the HMAC gateway and notification sinks.

pub mod gateway;
pub mod in_memory;
pub mod notify;
