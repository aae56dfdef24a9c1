// src/core/mod.rs — Research loop engine

pub mod citations;
pub mod conversation;
pub mod executor;
pub mod finalizer;
pub mod orchestrator;
pub mod prompts;
pub mod search_cache;
pub mod types;
