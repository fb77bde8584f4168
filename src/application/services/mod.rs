//! Application services

pub mod scenario;

pub use scenario::ScenarioService;
