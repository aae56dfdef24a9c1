// src/lib.rs — Library root for groundwork

pub mod cli;
pub mod core;
pub mod infra;
pub mod provider;
