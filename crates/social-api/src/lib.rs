//! HTTP surface for the follow recommender.

pub mod app;
pub mod config;
pub mod server;
