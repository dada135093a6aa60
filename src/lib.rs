pub mod batch;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod context;
pub mod discover;
pub mod ledger;
pub mod processor;
pub mod summary;
pub mod util;
