//! Repository layer over whole-collection storage.
//!
//! # Responsibility
//! - Define use-case oriented patient data access contracts.
//! - Isolate load/save details from service orchestration.
//!
//! # Invariants
//! - Repository writes only accept validated `Patient` values.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to storage errors.

pub mod patient_repo;
