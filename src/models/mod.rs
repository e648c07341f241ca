pub mod job;
pub mod webhook;
