//! Operation Stores (spec.md §4.5): parallel `Get`/`Save`/`Cleanup`
//! interfaces for Validation, Changeset and Instance records, each with an
//! in-memory reference implementation.

pub mod changesets;
pub mod instances;
pub mod validations;

use thiserror::Error;

/// A typed not-found error, distinguishable by `kind` so the Controller can
/// match on it for 404 — except Changesets, whose "not found" the
/// deploy/destroy path maps to 400 instead (spec.md §4.5, §7).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("not found")]
pub struct NotFound;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}
