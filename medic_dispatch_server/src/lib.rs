//! # Medic dispatch server
//! This crate hosts the HTTP front end for the medic dispatch engine. It is responsible for:
//! Authenticating callers with their access tokens and checking their role against each route.
//! Translating requests into calls on the engine's dispatch, query and notification APIs.
//! Holding the realtime websocket connections that status and location updates are pushed over.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/ws?token=...`: The realtime websocket.
//! * `/api/...`: The order, medic, admin and subscription routes. See [routes](routes/index.html).
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod socket;

#[cfg(test)]
mod endpoint_tests;
