//! HTTP request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `emotion` - Text emotion detection
//! - `story` - Story and narration generation
//! - `audio` - Narration audio download

pub mod api;
pub mod audio;
pub mod emotion;
pub mod story;
