pub mod candidate_store;
pub mod commands;
pub mod errors;
pub mod export;
pub mod extraction_client;
pub mod gemini;
pub mod logging;
pub mod models;
pub mod response_parser;
pub mod scoring;
pub mod secret_store;
pub mod service;
pub mod settings_store;
pub mod text_extractor;
