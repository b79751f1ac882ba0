//! Intent Recognition Service.
//!
//! Turns a configured set of intents into a recognition prompt, validates what
//! a generation model returns against a closed Output Contract, and serves the
//! result over HTTP.

pub mod auth;
pub mod config;
pub mod data_sources;
pub mod db;
pub mod endpoint;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod recognition;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
mod test_support;
