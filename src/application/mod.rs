//! Application layer containing the core business logic orchestration.
//!
//! The scheduler and the two orchestrators drive the domain through the
//! store ports; every invariant that matters under concurrency is delegated
//! to the stores' conditional primitives.

pub mod booking;
pub mod ledger;
pub mod membership;
pub mod scheduler;
