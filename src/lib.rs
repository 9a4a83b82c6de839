// src/lib.rs

//! sheetpress: spreadsheet ranges published as live and dated JSON snapshots

pub mod error;
pub mod models;
pub mod pipeline;
pub mod runtime;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
