pub mod common;
pub mod data_loader;
pub mod dataset;
pub mod export;
pub mod generate_commands;
pub mod plan;
pub mod plan_execution;
pub mod report;
