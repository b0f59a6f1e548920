pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod retry;
pub mod uploader;
pub mod writer;
