//! Domain error types.

use common::{FamilyId, MemberId, SeasonId, WorkshopId};
use membership_store::StoreError;
use thiserror::Error;

use crate::reconciliation::ReconciliationError;

/// Errors returned by the reconciliation service.
///
/// Every variant means the run was aborted before anything was written.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A family, season or member does not exist.
    #[error("{0}")]
    NotFound(StoreError),

    /// A registration references a workshop with no price for the season.
    #[error("No price for workshop {workshop_id} in season {season_id}")]
    PricingNotFound {
        workshop_id: WorkshopId,
        season_id: SeasonId,
    },

    /// Season parameters are invalid.
    #[error("{0}")]
    Configuration(String),

    /// Another run changed the membership set between load and write.
    #[error("{0}")]
    ConcurrencyConflict(StoreError),

    /// The season is inactive and its statuses are frozen.
    #[error("Season {0} is inactive; memberships are frozen")]
    SeasonInactive(SeasonId),

    /// The member does not belong to the family.
    #[error("Member {member_id} does not belong to family {family_id}")]
    MemberNotInFamily {
        family_id: FamilyId,
        member_id: MemberId,
    },

    /// The store failed.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound(_) | DomainError::MemberNotInFamily { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict(_))
    }

    /// Returns true for errors caused by the season's configuration rather
    /// than by the store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::PricingNotFound { .. }
                | DomainError::Configuration(_)
                | DomainError::SeasonInactive(_)
        )
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MemberNotFound {
                family_id,
                member_id,
            } => DomainError::MemberNotInFamily {
                family_id,
                member_id,
            },
            e if e.is_not_found() => DomainError::NotFound(e),
            e @ StoreError::ConcurrencyConflict { .. } => DomainError::ConcurrencyConflict(e),
            e => DomainError::Store(e),
        }
    }
}

impl From<ReconciliationError> for DomainError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::PricingNotFound {
                workshop_id,
                season_id,
            } => DomainError::PricingNotFound {
                workshop_id,
                season_id,
            },
            ReconciliationError::SeasonFrozen(season_id) => DomainError::SeasonInactive(season_id),
            e @ (ReconciliationError::NegativeMembershipFee { .. }
            | ReconciliationError::NegativeWorkshopPrice { .. }
            | ReconciliationError::DiscountOutOfRange { .. }
            | ReconciliationError::InvertedYears { .. }) => DomainError::Configuration(e.to_string()),
        }
    }
}
