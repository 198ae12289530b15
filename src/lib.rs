//! Core library for the `stress-test` CLI.
//!
//! This crate provides the building blocks used by the binary: CLI argument
//! types, configuration loading, the request model, request execution and
//! bounded dispatch, and outcome aggregation. The primary user-facing
//! interface is the `stress-test` command-line application.
pub mod args;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod metrics;
