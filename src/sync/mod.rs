//! Synchronization building blocks used by the pools.

pub mod gate;

pub use gate::StartGate;
