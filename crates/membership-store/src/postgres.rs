use std::collections::BTreeMap;

use async_trait::async_trait;
use common::{
    Family, FamilyId, FamilySnapshot, Member, MemberId, MembershipSet, MembershipStatus, Money,
    Payment, PaymentId, PaymentStatus, PaymentType, Revision, Season, SeasonId, SeasonSnapshot,
    SeasonStatus, WorkshopId, WorkshopPrice, WorkshopRegistration,
};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{MembershipReadPort, MembershipWritePort, ReconciliationInputs, StatusMap},
};

/// PostgreSQL-backed membership store.
#[derive(Clone)]
pub struct PostgresMembershipStore {
    pool: PgPool,
}

impl PostgresMembershipStore {
    /// Creates a new PostgreSQL membership store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_season(row: &PgRow) -> Result<Season> {
        Ok(Season {
            id: SeasonId::new(row.try_get("id")?),
            start_year: row.try_get("start_year")?,
            end_year: row.try_get("end_year")?,
            status: row.try_get::<String, _>("status")?.parse::<SeasonStatus>()?,
            membership_amount: Money::from_cents(row.try_get("membership_amount_cents")?),
            discount_percent: row.try_get("discount_percent")?,
            total_donations: Money::from_cents(row.try_get("total_donations_cents")?),
        })
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        Ok(Payment {
            id: PaymentId::new(row.try_get("id")?),
            family_id: FamilyId::new(row.try_get("family_id")?),
            season_id: SeasonId::new(row.try_get("season_id")?),
            payment_type: row
                .try_get::<String, _>("payment_type")?
                .parse::<PaymentType>()?,
            status: row.try_get::<String, _>("status")?.parse::<PaymentStatus>()?,
            amount: Money::from_cents(row.try_get("amount_cents")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            settled_at: row.try_get("settled_at")?,
        })
    }

    async fn fetch_family(
        conn: &mut PgConnection,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<FamilySnapshot> {
        let family_row = sqlx::query("SELECT id, name, email, phone FROM families WHERE id = $1")
            .bind(family_id.as_i64())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(StoreError::FamilyNotFound(family_id))?;

        let family = Family {
            id: family_id,
            name: family_row.try_get("name")?,
            email: family_row.try_get("email")?,
            phone: family_row.try_get("phone")?,
        };

        let registration_rows = sqlx::query(
            r#"
            SELECT wr.member_id, wr.workshop_id
            FROM workshop_registrations wr
            JOIN members m ON m.id = wr.member_id
            WHERE m.family_id = $1 AND wr.season_id = $2
            ORDER BY wr.member_id ASC, wr.workshop_id ASC
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_all(&mut *conn)
        .await?;

        let mut registrations: BTreeMap<MemberId, Vec<WorkshopRegistration>> = BTreeMap::new();
        for row in &registration_rows {
            let member_id = MemberId::new(row.try_get("member_id")?);
            registrations
                .entry(member_id)
                .or_default()
                .push(WorkshopRegistration {
                    member_id,
                    workshop_id: WorkshopId::new(row.try_get("workshop_id")?),
                    season_id,
                });
        }

        let member_rows = sqlx::query(
            r#"
            SELECT m.id, m.first_name, m.last_name,
                   (r.member_id IS NOT NULL) AS membership_requested
            FROM members m
            LEFT JOIN membership_requests r ON r.member_id = m.id AND r.season_id = $2
            WHERE m.family_id = $1
            ORDER BY m.id ASC
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_all(&mut *conn)
        .await?;

        let members = member_rows
            .iter()
            .map(|row| -> Result<Member> {
                let id = MemberId::new(row.try_get("id")?);
                Ok(Member {
                    id,
                    family_id,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    membership_requested: row.try_get("membership_requested")?,
                    registrations: registrations.remove(&id).unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let donation_cents: Option<i64> = sqlx::query_scalar(
            "SELECT amount_cents FROM family_donations WHERE family_id = $1 AND season_id = $2",
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(FamilySnapshot {
            family,
            season_id,
            members,
            donation_credit: Money::from_cents(donation_cents.unwrap_or(0)),
        })
    }

    async fn fetch_season(conn: &mut PgConnection, season_id: SeasonId) -> Result<SeasonSnapshot> {
        let row = sqlx::query(
            r#"
            SELECT id, start_year, end_year, status, membership_amount_cents,
                   discount_percent, total_donations_cents
            FROM seasons
            WHERE id = $1
            "#,
        )
        .bind(season_id.as_i64())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::SeasonNotFound(season_id))?;
        let season = Self::row_to_season(&row)?;

        let price_rows = sqlx::query(
            r#"
            SELECT workshop_id, amount_cents
            FROM workshop_prices
            WHERE season_id = $1
            ORDER BY workshop_id ASC
            "#,
        )
        .bind(season_id.as_i64())
        .fetch_all(&mut *conn)
        .await?;

        let prices = price_rows
            .iter()
            .map(|row| -> Result<WorkshopPrice> {
                Ok(WorkshopPrice {
                    workshop_id: WorkshopId::new(row.try_get("workshop_id")?),
                    season_id,
                    amount: Money::from_cents(row.try_get("amount_cents")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SeasonSnapshot { season, prices })
    }

    async fn fetch_completed_payments(
        conn: &mut PgConnection,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, family_id, season_id, payment_type, status, amount_cents,
                   created_at, updated_at, settled_at
            FROM payments
            WHERE family_id = $1 AND season_id = $2 AND status = 'completed'
            ORDER BY COALESCE(settled_at, updated_at) ASC, id ASC
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(Self::row_to_payment).collect()
    }

    async fn fetch_memberships(
        conn: &mut PgConnection,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<MembershipSet> {
        let revision: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM membership_sets WHERE family_id = $1 AND season_id = $2",
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(revision) = revision else {
            return Ok(MembershipSet::empty(family_id, season_id));
        };

        let rows = sqlx::query(
            r#"
            SELECT member_id, status
            FROM memberships
            WHERE family_id = $1 AND season_id = $2
            ORDER BY member_id ASC
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_all(&mut *conn)
        .await?;

        let mut statuses = BTreeMap::new();
        for row in &rows {
            let status = row.try_get::<String, _>("status")?.parse::<MembershipStatus>()?;
            statuses.insert(MemberId::new(row.try_get("member_id")?), status);
        }

        Ok(MembershipSet {
            family_id,
            season_id,
            revision: Revision::new(revision),
            statuses,
        })
    }
}

#[async_trait]
impl MembershipReadPort for PostgresMembershipStore {
    async fn load_reconciliation_inputs(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<ReconciliationInputs> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let family = Self::fetch_family(&mut tx, family_id, season_id).await?;
        let season = Self::fetch_season(&mut tx, season_id).await?;
        let payments = Self::fetch_completed_payments(&mut tx, family_id, season_id).await?;
        let memberships = Self::fetch_memberships(&mut tx, family_id, season_id).await?;
        tx.commit().await?;

        Ok(ReconciliationInputs {
            family,
            season,
            payments,
            memberships,
        })
    }

    async fn load_family_with_members_and_registrations(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<FamilySnapshot> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_family(&mut conn, family_id, season_id).await
    }

    async fn load_season_with_prices(&self, season_id: SeasonId) -> Result<SeasonSnapshot> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_season(&mut conn, season_id).await
    }

    async fn load_completed_payments(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_completed_payments(&mut conn, family_id, season_id).await
    }

    async fn load_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
    ) -> Result<MembershipSet> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_memberships(&mut conn, family_id, season_id).await
    }
}

#[async_trait]
impl MembershipWritePort for PostgresMembershipStore {
    async fn save_memberships(
        &self,
        family_id: FamilyId,
        season_id: SeasonId,
        expected: Revision,
        statuses: &StatusMap,
    ) -> Result<Revision> {
        let mut tx = self.pool.begin().await?;

        // Ensure the revision row exists, then lock it for the rest of the transaction
        sqlx::query(
            r#"
            INSERT INTO membership_sets (family_id, season_id, revision)
            VALUES ($1, $2, 0)
            ON CONFLICT (family_id, season_id) DO NOTHING
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                if db_err.constraint() == Some("membership_sets_family_id_fkey") {
                    StoreError::FamilyNotFound(family_id)
                } else {
                    StoreError::SeasonNotFound(season_id)
                }
            }
            other => StoreError::Database(other),
        })?;

        let actual: i64 = sqlx::query_scalar(
            r#"
            SELECT revision FROM membership_sets
            WHERE family_id = $1 AND season_id = $2
            FOR UPDATE
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .fetch_one(&mut *tx)
        .await?;

        let actual = Revision::new(actual);
        if actual != expected {
            return Err(StoreError::ConcurrencyConflict {
                family_id,
                season_id,
                expected,
                actual,
            });
        }

        // A member who left the family may keep the row it already has.
        let member_ids: Vec<i64> = statuses.keys().map(|id| id.as_i64()).collect();
        let known: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM members WHERE family_id = $1 AND id = ANY($2)
            UNION
            SELECT member_id FROM memberships
            WHERE family_id = $1 AND season_id = $3 AND member_id = ANY($2)
            "#,
        )
        .bind(family_id.as_i64())
        .bind(&member_ids)
        .bind(season_id.as_i64())
        .fetch_all(&mut *tx)
        .await?;
        if let Some(missing) = member_ids.iter().find(|id| !known.contains(id)) {
            return Err(StoreError::MemberNotFound {
                family_id,
                member_id: MemberId::new(*missing),
            });
        }

        sqlx::query("DELETE FROM memberships WHERE family_id = $1 AND season_id = $2")
            .bind(family_id.as_i64())
            .bind(season_id.as_i64())
            .execute(&mut *tx)
            .await?;

        for (member_id, status) in statuses {
            sqlx::query(
                r#"
                INSERT INTO memberships (member_id, season_id, family_id, status)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(member_id.as_i64())
            .bind(season_id.as_i64())
            .bind(family_id.as_i64())
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        let revision = actual.next();
        sqlx::query(
            r#"
            UPDATE membership_sets
            SET revision = $3, updated_at = NOW()
            WHERE family_id = $1 AND season_id = $2
            "#,
        )
        .bind(family_id.as_i64())
        .bind(season_id.as_i64())
        .bind(revision.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(%family_id, %season_id, %revision, rows = statuses.len(), "membership set replaced");

        Ok(revision)
    }
}
