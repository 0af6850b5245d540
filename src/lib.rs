// src/lib.rs — Library root for velle

pub mod api;
pub mod audit;
pub mod cli;
pub mod core;
pub mod infra;
pub mod injector;
pub mod mcp;
pub mod registry;
pub mod util;
