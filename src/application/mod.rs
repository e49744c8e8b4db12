//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `CorrelationEngine`, which matches billing
//! requests to the store callbacks that answer them, and the
//! `ScenarioRunner`, which replays scripted sessions against it.

pub mod engine;
pub mod scenario;
