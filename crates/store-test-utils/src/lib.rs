//! Shared test utilities for the local-store workspace.
//!
//! This crate provides standardised fixtures so the store's test suites do
//! not each rebuild the same temporary trees. It is a dev-dependency only,
//! never published.
//!
//! # Modules
//!
//! - [`store`]: [`TestStore`](store::TestStore) builder around a temporary root

pub mod store;
