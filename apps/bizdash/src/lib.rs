//! # bizdash
//!
//! The back-office service around `bizdash-core`: the HTTP API the
//! dashboard talks to, the admin CLI, and configuration loading.

pub mod api;
pub mod cli;
pub mod config;
