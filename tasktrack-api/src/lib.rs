//! # TaskTrack API Server Library
//!
//! This library provides the HTTP layer for TaskTrack: routing, access
//! control, request extraction and error mapping over the domain services in
//! `tasktrack-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON/path/query extractors with `ApiError` rejections
//! - `middleware`: Access gate and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
