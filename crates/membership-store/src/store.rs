use std::collections::BTreeMap;

use async_trait::async_trait;
use common::{
    FamilyId, FamilySnapshot, MemberId, MembershipSet, MembershipStatus, Payment, Revision,
    SeasonId, SeasonSnapshot,
};

use crate::Result;

/// Statuses of one family+season, keyed and ordered by member.
pub type StatusMap = BTreeMap<MemberId, MembershipStatus>;

/// Everything a reconciliation run computes over, read from one consistent
/// view of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationInputs {
    pub family: FamilySnapshot,
    pub season: SeasonSnapshot,
    pub payments: Vec<Payment>,
    pub memberships: MembershipSet,
}

/// Read side of the repository.
///
/// Each method returns an owned snapshot.
#[async_trait]
pub trait MembershipReadPort: Send + Sync {
    /// Loads the family, season, completed payments and memberships at once.
    ///
    /// All four reads observe the same state: a concurrent writer either
    /// happened entirely before the snapshot or not at all. Fails with
    /// `FamilyNotFound` before `SeasonNotFound`.
    async fn load_reconciliation_inputs(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<ReconciliationInputs>;

    /// Loads a family, all of its members and their registrations for `season_id`.
    ///
    /// Fails with `FamilyNotFound` if the family does not exist.
    async fn load_family_with_members_and_registrations(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<FamilySnapshot>;

    /// Loads a season and every workshop price defined for it.
    ///
    /// Fails with `SeasonNotFound` if the season does not exist.
    async fn load_season_with_prices(&self, season_id: SeasonId) -> Result<SeasonSnapshot>;

    /// Loads the family's completed payments tagged with `season_id`.
    async fn load_completed_payments(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<Vec<Payment>>;

    /// Loads the current membership set, or an empty set at the initial
    /// revision if none has been written yet.
    async fn load_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<MembershipSet>;
}

/// Write side of the repository.
#[async_trait]
pub trait MembershipWritePort: Send + Sync {
    /// Replaces the whole membership set of a family+season.
    ///
    /// The write is atomic: either every row is replaced or none is. If the
    /// stored revision differs from `expected`, nothing is written and
    /// `ConcurrencyConflict` is returned.
    ///
    /// Returns the new revision.
    async fn save_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
        expected: Revision,
        statuses: &StatusMap,
    ) -> Result<Revision>;
}

/// A store that implements both ports.
pub trait MembershipStore: MembershipReadPort + MembershipWritePort {}

impl<T: MembershipReadPort + MembershipWritePort + ?Sized> MembershipStore for T {}
