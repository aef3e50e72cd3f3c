//! Foodcoop member dashboard.
//!
//! This crate provides the dashboard server as a library, allowing it to be
//! tested and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod plugins;
pub mod routes;
pub mod services;
pub mod state;
