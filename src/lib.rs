pub mod chat;
pub mod config;
pub mod gateway;
pub mod gemini_client;
pub mod web_server;
