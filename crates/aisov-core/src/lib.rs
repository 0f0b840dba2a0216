pub mod catalogue;
pub mod classify;
pub mod cluster;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;

pub mod report;
pub mod storage;
