//! Integration tests for Quarry
//!
//! Cross-component scenarios driven through the public API with a
//! scripted backend.

mod download;
mod facade;
