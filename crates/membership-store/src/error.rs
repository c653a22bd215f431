use common::{FamilyId, MemberId, ParseVocabError, Revision, SeasonId};
use thiserror::Error;

/// Errors that can occur when interacting with the membership store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Family not found: {0}")]
    FamilyNotFound(FamilyId),

    #[error("Season not found: {0}")]
    SeasonNotFound(SeasonId),

    #[error("Member {member_id} not found in family {family_id}")]
    MemberNotFound {
        family_id: FamilyId,
        member_id: MemberId,
    },

    /// The membership set was written by someone else since it was loaded.
    #[error(
        "Concurrency conflict for family {family_id} season {season_id}: expected revision {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        family_id: FamilyId,
        season_id: SeasonId,
        expected: Revision,
        actual: Revision,
    },

    /// A stored row holds a value outside its vocabulary.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] ParseVocabError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::FamilyNotFound(_)
                | StoreError::SeasonNotFound(_)
                | StoreError::MemberNotFound { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
