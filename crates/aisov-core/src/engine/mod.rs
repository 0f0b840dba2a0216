pub mod runner;

pub use runner::{ClassifyStats, RunCoordinator, RunSummary};
