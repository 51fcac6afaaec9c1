//! Implementations of the wire-visible parts of the Lightning gossip protocol that survive
//! signature stripping.

pub mod features;
pub mod msgs;
