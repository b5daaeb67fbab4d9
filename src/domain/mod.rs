//! Core domain types and logic.

pub mod candidate;
pub mod risk;
pub mod allocator;
pub mod execution;
pub mod portfolio;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod scoring;
pub mod config_validation;
pub mod error;
