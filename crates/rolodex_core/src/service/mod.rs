//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, append and fold into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod document_service;

pub use document_service::DocumentService;
