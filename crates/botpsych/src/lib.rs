//! Core library for the BotPsych screening service.
//!
//! `screening` owns the question catalog, the scoring engine and assessment
//! history; `access` owns accounts and bearer tokens; `chat` relays assistant
//! conversations to the configured LLM provider.

pub mod access;
pub mod chat;
pub mod config;
pub mod error;
pub mod screening;
pub mod telemetry;
