pub mod plan;
pub mod steps;
