//! FACEOFF relay server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod config;
pub mod lobby;
pub mod routes;
pub mod state;
pub mod wire;
pub mod ws;
