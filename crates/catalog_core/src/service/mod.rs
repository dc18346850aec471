//! Request-level services layered over the stores.
//!
//! # Responsibility
//! - Validate caller requests before anything reaches storage.
//! - Keep callers decoupled from the concrete store implementation.

pub mod service_type_service;
