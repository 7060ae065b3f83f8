/// Testing utilities for the Byzantine Generals workspace
///
/// Provides:
/// - Proptest generators for delivery streams
/// - Seeded RNG helpers for reproducible tests
/// - Roster fixtures for protocol scenarios

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;
