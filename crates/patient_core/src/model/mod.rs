//! Patient domain model.
//!
//! # Responsibility
//! - Define the validated record shape shared by store, repository and
//!   service layers.
//! - Keep derived attributes (`bmi`, `verdict`) out of persisted state.
//!
//! # Invariants
//! - Every patient is identified by a non-blank `PatientId` collection key.

pub mod patient;
