//! Shared mutable state behind `RwLock`ed maps. Engines stay pure; every
//! compare-and-write lives inside one store critical section.

pub mod games;
pub mod membership;
pub mod picks;

pub use games::GameStore;
pub use membership::MembershipStore;
pub use picks::{GradeWrite, PickStore};
