// src/provider/mod.rs
pub mod client;
pub mod models;

pub use client::{YahooClient, DEFAULT_BASE_URL};
