//! Reconciliation action: load, compute, persist.

use std::time::Instant;

use common::{FamilyId, MemberId, MembershipSet, MembershipStatus, Revision, SeasonId};
use membership_store::MembershipStore;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;

use super::{FamilyStatement, Reconciliation, StatusReconciler};

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub reconciliation: Reconciliation,
    pub statement: FamilyStatement,

    /// Revision of the membership set after the run.
    pub revision: Revision,

    /// False when the computed statuses equal the stored ones and nothing
    /// was written.
    pub written: bool,
}

/// Entry point for reconciling a family's memberships for a season.
///
/// Each run reads one snapshot, computes statuses with [`StatusReconciler`]
/// and replaces the family's membership set in a single revision-checked
/// write. Any failure aborts the run before the write.
pub struct ReconciliationService<S: MembershipStore> {
    store: S,
}

impl<S: MembershipStore> ReconciliationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recomputes and persists the statuses of every member of the family
    /// for the season.
    #[tracing::instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn reconcile_family_season(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<ReconciliationReport, DomainError> {
        Self::measured(self.run(family_id, season_id, None)).await
    }

    /// Computes what a run would produce without writing anything.
    #[tracing::instrument(skip(self))]
    pub async fn preview(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<FamilyStatement, DomainError> {
        let snapshot = self
            .store
            .load_reconciliation_inputs(family_id, season_id)
            .await?;
        let reconciliation = StatusReconciler::new(&snapshot.season).reconcile(
            &snapshot.family,
            &snapshot.payments,
            &snapshot.memberships,
        )?;
        Ok(FamilyStatement::new(
            &snapshot.family,
            &snapshot.season,
            &reconciliation,
        ))
    }

    /// Cancels a member's membership and recomputes the rest of the family
    /// in the same write.
    #[tracing::instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn withdraw_member(
        &self,
        family_id: FamilyId,
        member_id: MemberId,
        season_id: SeasonId,
    ) -> Result<ReconciliationReport, DomainError> {
        Self::measured(self.run(family_id, season_id, Some(member_id))).await
    }

    /// Sets one member's status directly, bypassing the computation.
    ///
    /// This is the only way to change statuses of an inactive season. The
    /// next run on an active season recomputes everything but `Cancelled`.
    #[tracing::instrument(skip(self))]
    pub async fn override_status(
        &self,
        family_id: FamilyId,
        member_id: MemberId,
        season_id: SeasonId,
        status: MembershipStatus,
    ) -> Result<MembershipSet, DomainError> {
        let family = self
            .store
            .load_family_with_members_and_registrations(family_id, season_id)
            .await?;
        if family.member(member_id).is_none() {
            return Err(DomainError::MemberNotInFamily {
                family_id,
                member_id,
            });
        }
        let season = self.store.load_season_with_prices(season_id).await?;
        let mut set = self.store.load_memberships(family_id, season_id).await?;

        let previous = set.statuses.insert(member_id, status);
        set.revision = self
            .store
            .save_memberships(family_id, season_id, set.revision, &set.statuses)
            .await?;

        tracing::warn!(
            %family_id,
            %member_id,
            %season_id,
            season_status = %season.season.status,
            previous = previous.map(|s| s.as_str()),
            new = %status,
            "membership status overridden"
        );
        metrics::counter!("reconciliation_overrides_total").increment(1);
        Ok(set)
    }

    /// Returns the persisted membership set of the family for the season.
    #[tracing::instrument(skip(self))]
    pub async fn current_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<MembershipSet, DomainError> {
        self.store
            .load_family_with_members_and_registrations(family_id, season_id)
            .await?;
        self.store.load_season_with_prices(season_id).await?;
        Ok(self.store.load_memberships(family_id, season_id).await?)
    }

    async fn run(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
        withdraw: Option<MemberId>,
    ) -> Result<ReconciliationReport, DomainError> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let snapshot = self
            .store
            .load_reconciliation_inputs(family_id, season_id)
            .await?;
        let expected = snapshot.memberships.revision;

        let mut basis = snapshot.memberships.clone();
        if let Some(member_id) = withdraw {
            if snapshot.family.member(member_id).is_none() {
                return Err(DomainError::MemberNotInFamily {
                    family_id,
                    member_id,
                });
            }
            basis
                .statuses
                .insert(member_id, MembershipStatus::Cancelled);
        }

        let reconciliation = StatusReconciler::new(&snapshot.season).reconcile(
            &snapshot.family,
            &snapshot.payments,
            &basis,
        )?;
        let statement = FamilyStatement::new(&snapshot.family, &snapshot.season, &reconciliation);

        let written = reconciliation.statuses != snapshot.memberships.statuses;
        let revision = if written {
            self.store
                .save_memberships(family_id, season_id, expected, &reconciliation.statuses)
                .await?
        } else {
            expected
        };

        tracing::info!(
            %run_id,
            outcome = %reconciliation.outcome,
            active = reconciliation.count(MembershipStatus::Active),
            pending = reconciliation.count(MembershipStatus::Pending),
            cancelled = reconciliation.count(MembershipStatus::Cancelled),
            total_due = %reconciliation.fees.total_due,
            total_received = %reconciliation.payments.total_received,
            written,
            %revision,
            "family reconciled"
        );

        Ok(ReconciliationReport {
            run_id,
            reconciliation,
            statement,
            revision,
            written,
        })
    }

    async fn measured(
        run: impl Future<Output = Result<ReconciliationReport, DomainError>>,
    ) -> Result<ReconciliationReport, DomainError> {
        metrics::counter!("reconciliation_runs_total").increment(1);
        let started = Instant::now();

        let result = run.await;

        metrics::histogram!("reconciliation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::counter!("reconciliation_failed").increment(1);
            if e.is_conflict() {
                metrics::counter!("reconciliation_conflicts_total").increment(1);
            }
            tracing::warn!(
                error = %e,
                configuration = e.is_configuration(),
                "reconciliation aborted"
            );
        }
        result
    }
}
