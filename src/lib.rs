#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod document;
pub mod export;
pub mod ingest;
pub mod insights;
pub mod library;
pub mod logging;
pub mod notes;
pub mod pagination;
pub mod viewer;
