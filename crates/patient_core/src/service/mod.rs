//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and repository calls into use-case level APIs.
//! - Keep CLI callers decoupled from storage details.

pub mod patient_service;
