//! Persistence ports for the reconciliation engine and their adapters.
//!
//! - [`MembershipReadPort`] loads the immutable snapshots a run computes over
//! - [`MembershipWritePort`] replaces a family+season membership set atomically,
//!   guarded by an optimistic [`Revision`](common::Revision)
//! - [`InMemoryMembershipStore`] backs tests and local runs
//! - [`PostgresMembershipStore`] backs deployments

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryMembershipStore;
pub use postgres::PostgresMembershipStore;
pub use store::{
    MembershipReadPort, MembershipStore, MembershipWritePort, ReconciliationInputs, StatusMap,
};
