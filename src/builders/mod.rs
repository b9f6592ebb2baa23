//! Builders to assemble planner services from configuration.

pub mod planner_builder;

pub use planner_builder::{Planner, PlannerBuilder};
