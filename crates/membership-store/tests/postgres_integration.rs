//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p membership-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::{
    FamilyId, MemberId, MembershipStatus, Money, PaymentId, Revision, SeasonId, SeasonStatus,
    WorkshopId,
};
use membership_store::{
    MembershipReadPort, MembershipWritePort, PostgresMembershipStore, StatusMap, StoreError,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

const FAMILY: FamilyId = FamilyId::new(1);
const SEASON: SeasonId = SeasonId::new(2024);

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_membership_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and seeded tables
async fn get_test_store() -> PostgresMembershipStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE memberships, membership_sets, payments, family_donations, \
         workshop_registrations, membership_requests, members, families, workshop_prices, seasons",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::raw_sql(
        r#"
        INSERT INTO seasons (id, start_year, end_year, status, membership_amount_cents, discount_percent)
        VALUES (2024, 2024, 2025, 'active', 10000, 20),
               (2023, 2023, 2024, 'inactive', 9000, 0);
        INSERT INTO workshop_prices (workshop_id, season_id, amount_cents)
        VALUES (1, 2024, 4500), (2, 2024, 3000), (1, 2023, 4000);
        INSERT INTO families (id, name, email) VALUES (1, 'Martin', 'martin@example.org'), (2, 'Petit', NULL);
        INSERT INTO members (id, family_id, first_name) VALUES (10, 1, 'Hugo'), (11, 1, 'Lea'), (20, 2, 'Zoe');
        INSERT INTO membership_requests (member_id, season_id) VALUES (10, 2024);
        INSERT INTO workshop_registrations (member_id, workshop_id, season_id)
        VALUES (11, 2, 2024), (11, 1, 2024), (11, 1, 2023);
        INSERT INTO family_donations (family_id, season_id, amount_cents) VALUES (1, 2024, 1500);
        INSERT INTO payments (id, family_id, season_id, payment_type, status, amount_cents, updated_at, settled_at)
        VALUES (1, 1, 2024, 'check', 'completed', 5000, '2024-09-10T10:00:00Z', '2024-09-10T10:00:00Z'),
               (2, 1, 2024, 'cash', 'cancelled', 7000, '2024-09-05T10:00:00Z', NULL),
               (3, 1, 2024, 'card', 'completed', 2000, '2024-09-01T10:00:00Z', NULL),
               (4, 1, 2023, 'transfer', 'completed', 9000, '2023-09-01T10:00:00Z', '2023-09-01T10:00:00Z'),
               (5, 1, 2024, 'transfer', 'pending', 1000, '2024-09-02T10:00:00Z', NULL);
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresMembershipStore::new(pool)
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn load_family_snapshot_for_season() {
    let store = get_test_store().await;

    let snapshot = store
        .load_family_with_members_and_registrations(FAMILY, SEASON)
        .await
        .unwrap();

    assert_eq!(snapshot.family.name, "Martin");
    assert_eq!(snapshot.members.len(), 2);
    assert_eq!(snapshot.members[0].id, MemberId::new(10));
    assert!(snapshot.members[0].membership_requested);
    assert!(snapshot.members[0].registrations.is_empty());

    let workshops: Vec<_> = snapshot.members[1]
        .registrations
        .iter()
        .map(|r| r.workshop_id)
        .collect();
    assert_eq!(workshops, vec![WorkshopId::new(1), WorkshopId::new(2)]);
    assert_eq!(snapshot.donation_credit, Money::from_cents(1500));
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn load_season_with_prices() {
    let store = get_test_store().await;

    let snapshot = store.load_season_with_prices(SEASON).await.unwrap();
    assert_eq!(snapshot.season.status, SeasonStatus::Active);
    assert_eq!(snapshot.season.membership_amount, Money::from_units(100));
    assert_eq!(snapshot.season.discount_percent, 20);
    assert_eq!(snapshot.prices.len(), 2);
    assert_eq!(
        snapshot.price_for(WorkshopId::new(1)).unwrap().amount,
        Money::from_cents(4500)
    );

    let frozen = store
        .load_season_with_prices(SeasonId::new(2023))
        .await
        .unwrap();
    assert_eq!(frozen.season.status, SeasonStatus::Inactive);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn missing_rows_are_not_found() {
    let store = get_test_store().await;

    let err = store
        .load_family_with_members_and_registrations(FamilyId::new(99), SEASON)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FamilyNotFound(_)));

    let err = store
        .load_season_with_prices(SeasonId::new(1999))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SeasonNotFound(_)));
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn completed_payments_in_settlement_order() {
    let store = get_test_store().await;

    let payments = store.load_completed_payments(FAMILY, SEASON).await.unwrap();
    let ids: Vec<_> = payments.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![PaymentId::new(3), PaymentId::new(1)]);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn save_replaces_the_whole_set() {
    let store = get_test_store().await;

    let mut statuses = StatusMap::new();
    statuses.insert(MemberId::new(10), MembershipStatus::Active);
    statuses.insert(MemberId::new(11), MembershipStatus::Pending);
    let revision = store
        .save_memberships(FAMILY, SEASON, Revision::initial(), &statuses)
        .await
        .unwrap();
    assert_eq!(revision, Revision::new(1));

    let mut statuses = StatusMap::new();
    statuses.insert(MemberId::new(11), MembershipStatus::Active);
    let revision = store
        .save_memberships(FAMILY, SEASON, revision, &statuses)
        .await
        .unwrap();
    assert_eq!(revision, Revision::new(2));

    let set = store.load_memberships(FAMILY, SEASON).await.unwrap();
    assert_eq!(set.revision, Revision::new(2));
    assert_eq!(set.statuses, statuses);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn stale_revision_conflicts_without_writing() {
    let store = get_test_store().await;

    let mut statuses = StatusMap::new();
    statuses.insert(MemberId::new(10), MembershipStatus::Active);
    store
        .save_memberships(FAMILY, SEASON, Revision::initial(), &statuses)
        .await
        .unwrap();

    let mut other = StatusMap::new();
    other.insert(MemberId::new(10), MembershipStatus::Pending);
    let err = store
        .save_memberships(FAMILY, SEASON, Revision::initial(), &other)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConcurrencyConflict { .. }));

    let set = store.load_memberships(FAMILY, SEASON).await.unwrap();
    assert_eq!(set.statuses, statuses);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn foreign_member_rolls_back_the_save() {
    let store = get_test_store().await;

    let mut statuses = StatusMap::new();
    statuses.insert(MemberId::new(10), MembershipStatus::Active);
    statuses.insert(MemberId::new(20), MembershipStatus::Active);
    let err = store
        .save_memberships(FAMILY, SEASON, Revision::initial(), &statuses)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MemberNotFound { .. }));

    let set = store.load_memberships(FAMILY, SEASON).await.unwrap();
    assert_eq!(set.revision, Revision::initial());
    assert!(set.statuses.is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn reconciliation_inputs_read_in_one_transaction() {
    let store = get_test_store().await;

    let mut statuses = StatusMap::new();
    statuses.insert(MemberId::new(11), MembershipStatus::Cancelled);
    store
        .save_memberships(FAMILY, SEASON, Revision::initial(), &statuses)
        .await
        .unwrap();

    let inputs = store
        .load_reconciliation_inputs(FAMILY, SEASON)
        .await
        .unwrap();

    assert_eq!(
        inputs.family,
        store
            .load_family_with_members_and_registrations(FAMILY, SEASON)
            .await
            .unwrap()
    );
    assert_eq!(inputs.season.prices.len(), 2);
    let ids: Vec<_> = inputs.payments.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![PaymentId::new(3), PaymentId::new(1)]);
    assert_eq!(inputs.memberships.revision, Revision::new(1));
    assert_eq!(inputs.memberships.statuses, statuses);

    let err = store
        .load_reconciliation_inputs(FAMILY, SeasonId::new(1999))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SeasonNotFound(_)));
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn departed_member_keeps_cancelled_row() {
    let store = get_test_store().await;

    let mut statuses = StatusMap::new();
    statuses.insert(MemberId::new(11), MembershipStatus::Cancelled);
    let revision = store
        .save_memberships(FAMILY, SEASON, Revision::initial(), &statuses)
        .await
        .unwrap();

    sqlx::query("UPDATE members SET family_id = 2 WHERE id = 11")
        .execute(store.pool())
        .await
        .unwrap();

    statuses.insert(MemberId::new(10), MembershipStatus::Pending);
    let revision = store
        .save_memberships(FAMILY, SEASON, revision, &statuses)
        .await
        .unwrap();
    assert_eq!(revision, Revision::new(2));

    let set = store.load_memberships(FAMILY, SEASON).await.unwrap();
    assert_eq!(set.statuses, statuses);
}
