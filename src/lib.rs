//! Job sheet bot
//!
//! Receives LINE webhook deliveries, pulls work-order fields out of chat
//! messages with a fixed table of patterns, and upserts one row per job ID
//! into a Google Sheets spreadsheet.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
