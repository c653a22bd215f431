use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    Family, FamilyId, FamilySnapshot, Member, MemberId, MembershipSet, Money, Payment, PaymentId,
    PaymentStatus, Revision, Season, SeasonId, SeasonSnapshot, WorkshopId, WorkshopPrice,
    WorkshopRegistration,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{MembershipReadPort, MembershipWritePort, ReconciliationInputs, StatusMap},
};

#[derive(Debug, Default)]
struct State {
    seasons: HashMap<SeasonId, Season>,
    prices: Vec<WorkshopPrice>,
    families: HashMap<FamilyId, Family>,
    members: BTreeMap<MemberId, Member>,
    intents: HashSet<(MemberId, SeasonId)>,
    registrations: Vec<WorkshopRegistration>,
    payments: BTreeMap<PaymentId, Payment>,
    donations: HashMap<(FamilyId, SeasonId), Money>,
    memberships: HashMap<(FamilyId, SeasonId), MembershipSet>,
    saves: usize,
}

/// In-memory membership store for testing and local runs.
///
/// Provides the same port semantics as the PostgreSQL implementation: reads
/// return owned snapshots and `save_memberships` checks the revision and
/// replaces the set under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryMembershipStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryMembershipStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_season(&self, season: Season) {
        self.state.write().await.seasons.insert(season.id, season);
    }

    /// Sets the price of a workshop for a season, replacing any previous row
    /// for the same pair.
    pub async fn set_workshop_price(
        &self,
        workshop_id: WorkshopId,
        season_id: SeasonId,
        amount: Money,
    ) {
        let mut state = self.state.write().await;
        state
            .prices
            .retain(|p| !(p.workshop_id == workshop_id && p.season_id == season_id));
        state.prices.push(WorkshopPrice {
            workshop_id,
            season_id,
            amount,
        });
    }

    pub async fn upsert_family(&self, family: Family) {
        self.state.write().await.families.insert(family.id, family);
    }

    /// Adds a member. Registrations carried by `member` are stored as well;
    /// its `membership_requested` flag is ignored, use [`request_membership`].
    ///
    /// [`request_membership`]: Self::request_membership
    pub async fn add_member(&self, member: Member) {
        let mut state = self.state.write().await;
        state.registrations.extend(member.registrations.iter().copied());
        let base = Member {
            membership_requested: false,
            registrations: Vec::new(),
            ..member
        };
        state.members.insert(base.id, base);
    }

    pub async fn request_membership(&self, member_id: MemberId, season_id: SeasonId) {
        self.state
            .write()
            .await
            .intents
            .insert((member_id, season_id));
    }

    pub async fn register(&self, member_id: MemberId, workshop_id: WorkshopId, season_id: SeasonId) {
        self.state
            .write()
            .await
            .registrations
            .push(WorkshopRegistration {
                member_id,
                workshop_id,
                season_id,
            });
    }

    pub async fn record_payment(&self, payment: Payment) {
        self.state
            .write()
            .await
            .payments
            .insert(payment.id, payment);
    }

    /// Moves a payment to `status`, stamping `updated_at` (and `settled_at`
    /// when it completes). Returns false if the payment does not exist.
    pub async fn set_payment_status(
        &self,
        payment_id: PaymentId,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> bool {
        let mut state = self.state.write().await;
        let Some(payment) = state.payments.get_mut(&payment_id) else {
            return false;
        };
        payment.status = status;
        payment.updated_at = at;
        payment.settled_at = match status {
            PaymentStatus::Completed => Some(at),
            PaymentStatus::Pending | PaymentStatus::Cancelled => None,
        };
        true
    }

    pub async fn set_donation_credit(&self, family_id: FamilyId, season_id: SeasonId, amount: Money) {
        self.state
            .write()
            .await
            .donations
            .insert((family_id, season_id), amount);
    }

    /// Returns how many membership sets have been written.
    pub async fn save_count(&self) -> usize {
        self.state.read().await.saves
    }
}

impl State {
    fn family_snapshot(&self, family_id: FamilyId, season_id: SeasonId) -> Result<FamilySnapshot> {
        let family = self
            .families
            .get(&family_id)
            .cloned()
            .ok_or(StoreError::FamilyNotFound(family_id))?;

        let members = self
            .members
            .values()
            .filter(|m| m.family_id == family_id)
            .map(|m| Member {
                membership_requested: self.intents.contains(&(m.id, season_id)),
                registrations: self
                    .registrations
                    .iter()
                    .filter(|r| r.member_id == m.id && r.season_id == season_id)
                    .copied()
                    .collect(),
                ..m.clone()
            })
            .collect();

        let donation_credit = self
            .donations
            .get(&(family_id, season_id))
            .copied()
            .unwrap_or_default();

        Ok(FamilySnapshot {
            family,
            season_id,
            members,
            donation_credit,
        })
    }

    fn season_snapshot(&self, season_id: SeasonId) -> Result<SeasonSnapshot> {
        let season = self
            .seasons
            .get(&season_id)
            .cloned()
            .ok_or(StoreError::SeasonNotFound(season_id))?;
        let mut prices: Vec<_> = self
            .prices
            .iter()
            .filter(|p| p.season_id == season_id)
            .copied()
            .collect();
        prices.sort_by_key(|p| p.workshop_id);
        Ok(SeasonSnapshot { season, prices })
    }

    fn completed_payments(&self, family_id: FamilyId, season_id: SeasonId) -> Vec<Payment> {
        let mut payments: Vec<_> = self
            .payments
            .values()
            .filter(|p| {
                p.family_id == family_id
                    && p.season_id == season_id
                    && p.status.counts_as_received()
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| {
            a.settlement_date()
                .cmp(&b.settlement_date())
                .then(a.id.cmp(&b.id))
        });
        payments
    }

    fn membership_set(&self, family_id: FamilyId, season_id: SeasonId) -> MembershipSet {
        self.memberships
            .get(&(family_id, season_id))
            .cloned()
            .unwrap_or_else(|| MembershipSet::empty(family_id, season_id))
    }
}

#[async_trait]
impl MembershipReadPort for InMemoryMembershipStore {
    async fn load_reconciliation_inputs(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<ReconciliationInputs> {
        let state = self.state.read().await;
        Ok(ReconciliationInputs {
            family: state.family_snapshot(family_id, season_id)?,
            season: state.season_snapshot(season_id)?,
            payments: state.completed_payments(family_id, season_id),
            memberships: state.membership_set(family_id, season_id),
        })
    }

    async fn load_family_with_members_and_registrations(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<FamilySnapshot> {
        self.state.read().await.family_snapshot(family_id, season_id)
    }

    async fn load_season_with_prices(&self, season_id: SeasonId) -> Result<SeasonSnapshot> {
        self.state.read().await.season_snapshot(season_id)
    }

    async fn load_completed_payments(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<Vec<Payment>> {
        Ok(self.state.read().await.completed_payments(family_id, season_id))
    }

    async fn load_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<MembershipSet> {
        Ok(self.state.read().await.membership_set(family_id, season_id))
    }
}

#[async_trait]
impl MembershipWritePort for InMemoryMembershipStore {
    async fn save_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
        expected: Revision,
        statuses: &StatusMap,
    ) -> Result<Revision> {
        let mut state = self.state.write().await;

        let stored = state.membership_set(family_id, season_id);
        let actual = stored.revision;
        if actual != expected {
            return Err(StoreError::ConcurrencyConflict {
                family_id,
                season_id,
                expected,
                actual,
            });
        }

        if !state.seasons.contains_key(&season_id) {
            return Err(StoreError::SeasonNotFound(season_id));
        }
        // A member who left the family may keep the row it already has.
        for member_id in statuses.keys() {
            let belongs = state
                .members
                .get(member_id)
                .is_some_and(|m| m.family_id == family_id)
                || stored.statuses.contains_key(member_id);
            if !belongs {
                return Err(StoreError::MemberNotFound {
                    family_id,
                    member_id: *member_id,
                });
            }
        }

        let revision = actual.next();
        state.memberships.insert(
            (family_id, season_id),
            MembershipSet {
                family_id,
                season_id,
                revision,
                statuses: statuses.clone(),
            },
        );
        state.saves += 1;
        tracing::debug!(%family_id, %season_id, %revision, rows = statuses.len(), "membership set replaced");

        Ok(revision)
    }
}
