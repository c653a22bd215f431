//! Family-season reconciliation engine and related types.

mod fees;
mod payments;
mod pricing;
mod reconciler;
mod service;
mod statement;

pub use fees::{FeeBreakdown, FeeCalculator, MemberFee, WorkshopFee};
pub use payments::{CountedPayment, PaymentAggregator, PaymentSummary};
pub use pricing::PricingResolver;
pub use reconciler::{FundingOutcome, Reconciliation, StatusReconciler};
pub use service::{ReconciliationReport, ReconciliationService};
pub use statement::{FamilyStatement, StatementLine};

use common::{Money, SeasonId, WorkshopId};
use thiserror::Error;

/// Errors raised by the pure reconciliation computation.
///
/// Any of these aborts the run before anything is written.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// A registration references a workshop with no price for the season.
    #[error("No price for workshop {workshop_id} in season {season_id}")]
    PricingNotFound {
        workshop_id: WorkshopId,
        season_id: SeasonId,
    },

    /// The season's membership fee is negative.
    #[error("Invalid configuration for season {season_id}: membership fee {fee} is negative")]
    NegativeMembershipFee { season_id: SeasonId, fee: Money },

    /// A workshop price row holds a negative amount.
    #[error("Invalid configuration for season {season_id}: workshop {workshop_id} is priced at {amount}")]
    NegativeWorkshopPrice {
        season_id: SeasonId,
        workshop_id: WorkshopId,
        amount: Money,
    },

    /// The season's discount lies outside 0–100.
    #[error("Invalid configuration for season {season_id}: discount {percent}% is outside 0-100")]
    DiscountOutOfRange { season_id: SeasonId, percent: i32 },

    /// The season ends before it starts.
    #[error("Invalid configuration for season {season_id}: {start_year} is after {end_year}")]
    InvertedYears {
        season_id: SeasonId,
        start_year: i32,
        end_year: i32,
    },

    /// The season is inactive; its statuses are frozen.
    #[error("Season {0} is inactive; memberships are frozen")]
    SeasonFrozen(SeasonId),
}
