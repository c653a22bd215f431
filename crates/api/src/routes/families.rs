//! Reconciliation trigger and membership read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{FamilyId, MemberId, Membership, MembershipSet, MembershipStatus, SeasonId};
use domain::{FamilyStatement, ReconciliationReport, ReconciliationService};
use membership_store::MembershipStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MembershipStore> {
    pub service: ReconciliationService<S>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct OverrideStatusRequest {
    pub status: MembershipStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReconciliationResponse {
    pub run_id: String,
    pub written: bool,
    pub revision: i64,
    pub statement: FamilyStatement,
}

impl From<ReconciliationReport> for ReconciliationResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            written: report.written,
            revision: report.revision.as_i64(),
            statement: report.statement,
        }
    }
}

#[derive(Serialize)]
pub struct MembershipsResponse {
    pub family_id: FamilyId,
    pub season_id: SeasonId,
    pub revision: i64,
    pub memberships: Vec<Membership>,
}

impl From<MembershipSet> for MembershipsResponse {
    fn from(set: MembershipSet) -> Self {
        Self {
            family_id: set.family_id,
            season_id: set.season_id,
            revision: set.revision.as_i64(),
            memberships: set.rows(),
        }
    }
}

// -- Handlers --

/// POST /families/{family_id}/seasons/{season_id}/reconcile
pub async fn reconcile<S: MembershipStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((family_id, season_id)): Path<(i64, i64)>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let report = state
        .service
        .reconcile_family_season(FamilyId::new(family_id), SeasonId::new(season_id))
        .await?;
    Ok(Json(report.into()))
}

/// GET /families/{family_id}/seasons/{season_id}/statement
pub async fn statement<S: MembershipStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((family_id, season_id)): Path<(i64, i64)>,
) -> Result<Json<FamilyStatement>, ApiError> {
    let statement = state
        .service
        .preview(FamilyId::new(family_id), SeasonId::new(season_id))
        .await?;
    Ok(Json(statement))
}

/// GET /families/{family_id}/seasons/{season_id}/memberships
pub async fn memberships<S: MembershipStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((family_id, season_id)): Path<(i64, i64)>,
) -> Result<Json<MembershipsResponse>, ApiError> {
    let set = state
        .service
        .current_memberships(FamilyId::new(family_id), SeasonId::new(season_id))
        .await?;
    Ok(Json(set.into()))
}

/// POST /families/{family_id}/seasons/{season_id}/members/{member_id}/withdraw
pub async fn withdraw<S: MembershipStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((family_id, season_id, member_id)): Path<(i64, i64, i64)>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let report = state
        .service
        .withdraw_member(
            FamilyId::new(family_id),
            MemberId::new(member_id),
            SeasonId::new(season_id),
        )
        .await?;
    Ok(Json(report.into()))
}

/// PUT /families/{family_id}/seasons/{season_id}/members/{member_id}/status
pub async fn override_status<S: MembershipStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((family_id, season_id, member_id)): Path<(i64, i64, i64)>,
    Json(req): Json<OverrideStatusRequest>,
) -> Result<Json<MembershipsResponse>, ApiError> {
    let set = state
        .service
        .override_status(
            FamilyId::new(family_id),
            MemberId::new(member_id),
            SeasonId::new(season_id),
            req.status,
        )
        .await?;
    Ok(Json(set.into()))
}
