//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and position planning into use-case APIs.
//! - Keep HTTP/serialization layers decoupled from storage details.

pub mod task_service;
