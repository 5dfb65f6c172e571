pub mod loader;
pub mod reports;
pub mod runner;
pub mod seeds;

pub use loader::FileLoader;
pub use runner::{RunReport, run_seeds};
pub use seeds::resolve_seed_inputs;
