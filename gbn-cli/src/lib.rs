//! CLI support library for the GBN simulator

pub mod config;

pub use config::{Scenario, ScenarioError};
