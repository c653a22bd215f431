//! Domain layer of the membership system.
//!
//! This crate provides the family-season reconciliation engine:
//! - Pricing resolution for membership and workshop fees
//! - Fee calculation with the multi-member discount and donation credit
//! - Payment aggregation over completed payments
//! - The status reconciler deriving each member's membership status
//! - `ReconciliationService`, the atomic load → compute → persist action

pub mod error;
pub mod reconciliation;

pub use error::DomainError;
pub use reconciliation::{
    CountedPayment, FamilyStatement, FeeBreakdown, FeeCalculator, FundingOutcome, MemberFee,
    PaymentAggregator, PaymentSummary, PricingResolver, Reconciliation, ReconciliationError,
    ReconciliationReport, ReconciliationService, StatementLine, StatusReconciler, WorkshopFee,
};
