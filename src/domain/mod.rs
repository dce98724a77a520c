//! Domain model of the settlement engine: value objects, entities and the
//! ports the application layer drives.

pub mod booking;
pub mod membership;
pub mod money;
pub mod ports;
pub mod slot;
pub mod wallet;
