pub mod cleanup;
pub mod config;
pub mod execution;
pub mod installer;
pub mod inventory;
pub mod models;
pub(crate) mod process_utils;
pub mod reconcile;
pub mod transfer;
