//! Core domain types and decision logic.

pub mod instrument;
pub mod coarse;
pub mod ranking;
pub mod basket;
pub mod schedule;
pub mod drawdown;
pub mod allocator;
pub mod strategy;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
