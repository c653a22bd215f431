//! Membership status derivation for a family and season.

use std::collections::BTreeSet;

use common::{
    FamilyId, FamilySnapshot, MemberId, MembershipSet, MembershipStatus, Money, Payment, SeasonId,
    SeasonSnapshot,
};
use membership_store::StatusMap;
use serde::Serialize;

use super::{
    FeeBreakdown, FeeCalculator, PaymentAggregator, PaymentSummary, PricingResolver,
    ReconciliationError,
};

/// How the family's funds compare to what it owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingOutcome {
    /// No member has intent for the season; nothing to assign.
    NoIntent,

    /// Nothing is due, or funds cover everything due.
    FullyFunded,

    /// Something is due and nothing has been received.
    Unfunded,

    /// Funds cover part of what is due.
    PartiallyFunded,
}

impl FundingOutcome {
    fn classify(fees: &FeeBreakdown, payments: &PaymentSummary) -> Self {
        if fees.is_empty() {
            FundingOutcome::NoIntent
        } else if fees.total_due.is_zero() || payments.total_received >= fees.total_due {
            FundingOutcome::FullyFunded
        } else if payments.total_received.is_zero() {
            FundingOutcome::Unfunded
        } else {
            FundingOutcome::PartiallyFunded
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundingOutcome::NoIntent => "no_intent",
            FundingOutcome::FullyFunded => "fully_funded",
            FundingOutcome::Unfunded => "unfunded",
            FundingOutcome::PartiallyFunded => "partially_funded",
        }
    }
}

impl std::fmt::Display for FundingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one reconciliation computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub family_id: FamilyId,
    pub season_id: SeasonId,

    /// The complete membership set to persist, ordered by member.
    pub statuses: StatusMap,

    pub fees: FeeBreakdown,
    pub payments: PaymentSummary,
    pub outcome: FundingOutcome,

    /// `max(0, total_due − total_received)`.
    pub balance_due: Money,

    /// Overpayment carried as credit: `max(0, total_received − total_due)`.
    pub credit: Money,
}

impl Reconciliation {
    pub fn status_of(&self, member_id: MemberId) -> Option<MembershipStatus> {
        self.statuses.get(&member_id).copied()
    }

    pub fn count(&self, status: MembershipStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }
}

/// Derives membership statuses for a family as a unit.
///
/// Reconciliation is a pure function of the loaded snapshots: the same
/// family, season, payments and current set always produce the same
/// statuses.
///
/// Allocation policy for partial payments: the funding pool (funds received
/// plus the family's donation credit) is walked in member id order. Each
/// member whose net fee fits in what remains becomes `Active` and consumes
/// it; a member that does not fit stays `Pending` and the walk moves on, so a
/// cheaper member further down the order can still be funded.
#[derive(Debug, Clone, Copy)]
pub struct StatusReconciler<'a> {
    season: &'a SeasonSnapshot,
}

impl<'a> StatusReconciler<'a> {
    pub fn new(season: &'a SeasonSnapshot) -> Self {
        Self { season }
    }

    /// Computes the statuses of every member of `family`.
    ///
    /// Every `Cancelled` row of the current set is carried into the result,
    /// whether or not the member is still in the family, and those members
    /// are left out of fees and allocation. Members without intent get no
    /// row. Fails with `SeasonFrozen` for an inactive season.
    pub fn reconcile(
        &self,
        family: &FamilySnapshot,
        payments: &[Payment],
        current: &MembershipSet,
    ) -> Result<Reconciliation, ReconciliationError> {
        let season = &self.season.season;
        if season.status.is_frozen() {
            return Err(ReconciliationError::SeasonFrozen(season.id));
        }

        let pricing = PricingResolver::new(self.season);
        pricing.validate()?;

        let mut statuses: StatusMap = current.carried_over();
        let excluded: BTreeSet<MemberId> = statuses.keys().copied().collect();

        let fees = FeeCalculator::new(pricing).calculate(family, &excluded)?;
        let payments = PaymentAggregator::new(family.family.id, season.id).aggregate(payments);
        let outcome = FundingOutcome::classify(&fees, &payments);

        match outcome {
            FundingOutcome::NoIntent => {}
            FundingOutcome::FullyFunded => {
                for member in &fees.members {
                    statuses.insert(member.member_id, MembershipStatus::Active);
                }
            }
            FundingOutcome::Unfunded => {
                for member in &fees.members {
                    statuses.insert(member.member_id, MembershipStatus::Pending);
                }
            }
            FundingOutcome::PartiallyFunded => {
                let mut remaining = payments.total_received + fees.donation_credit;
                for member in &fees.members {
                    let status = if member.net <= remaining {
                        remaining -= member.net;
                        MembershipStatus::Active
                    } else {
                        MembershipStatus::Pending
                    };
                    statuses.insert(member.member_id, status);
                }
            }
        }

        Ok(Reconciliation {
            family_id: family.family.id,
            season_id: season.id,
            balance_due: (fees.total_due - payments.total_received).floor_zero(),
            credit: (payments.total_received - fees.total_due).floor_zero(),
            statuses,
            fees,
            payments,
            outcome,
        })
    }
}
