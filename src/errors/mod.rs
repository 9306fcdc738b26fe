//! HTTP-facing error types

pub mod app_error;
