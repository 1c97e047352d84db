pub mod app;
pub mod config;
pub mod files;
pub mod pipeline;
pub mod provider;
pub mod publish;
pub mod shared;
