//! Chatter Server - local speak event hub.
//!
//! This crate provides the server component of Chatter, responsible for:
//! - Receiving speak events over `POST /speak`
//! - Broadcasting them to every avatar client connected on `/ws`
//!
//! # Architecture
//!
//! The server sits between monitors (event producers) and avatar clients
//! (event consumers). Events are relayed in real time without persistent
//! storage; a client that connects late does not see earlier events.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod routes;
pub mod types;
