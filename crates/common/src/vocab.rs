//! Closed vocabularies exchanged with the persistence layer.
//!
//! The relational store keeps these as lowercase strings. They are parsed at
//! the boundary and matched exhaustively everywhere else.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored string did not match any variant of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {vocabulary} value: {value:?}")]
pub struct ParseVocabError {
    pub vocabulary: &'static str,
    pub value: String,
}

impl ParseVocabError {
    fn new(vocabulary: &'static str, value: &str) -> Self {
        Self {
            vocabulary,
            value: value.to_string(),
        }
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Check,
    Transfer,
    Card,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Check => "check",
            PaymentType::Transfer => "transfer",
            PaymentType::Card => "card",
        }
    }
}

impl FromStr for PaymentType {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentType::Cash),
            "check" => Ok(PaymentType::Check),
            "transfer" => Ok(PaymentType::Transfer),
            "card" => Ok(PaymentType::Card),
            other => Err(ParseVocabError::new("payment type", other)),
        }
    }
}

/// Settlement state of a payment.
///
/// ```text
/// Pending ──┬──► Completed
///           └──► Cancelled
/// ```
///
/// Only `Completed` payments count toward funds received. `Cancelled` rows are
/// kept for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl PaymentStatus {
    /// Returns true if the payment counts toward funds received.
    pub fn counts_as_received(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(ParseVocabError::new("payment status", other)),
        }
    }
}

/// Whether a season still accepts automatic reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeasonStatus {
    #[default]
    Active,
    /// Frozen: statuses only change through an administrative override.
    Inactive,
}

impl SeasonStatus {
    pub fn is_frozen(&self) -> bool {
        matches!(self, SeasonStatus::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonStatus::Active => "active",
            SeasonStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for SeasonStatus {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SeasonStatus::Active),
            "inactive" => Ok(SeasonStatus::Inactive),
            other => Err(ParseVocabError::new("season status", other)),
        }
    }
}

/// Membership status of one member for one season.
///
/// State transitions:
/// ```text
/// (no row) ──► Pending ◄──► Active
///                 │            │
///                 └────────────┴──► Cancelled   (explicit withdrawal only)
/// ```
///
/// The reconciler moves members between `Pending` and `Active`. `Cancelled`
/// is set only by an explicit withdrawal or an administrative override, and a
/// cancelled row is never rewritten by a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    #[default]
    Pending,
    Active,
    Cancelled,
}

impl MembershipStatus {
    /// Returns true if a reconciliation run may overwrite this status.
    pub fn is_reconcilable(&self) -> bool {
        match self {
            MembershipStatus::Pending | MembershipStatus::Active => true,
            MembershipStatus::Cancelled => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MembershipStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Active => "active",
            MembershipStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MembershipStatus::Pending),
            "active" => Ok(MembershipStatus::Active),
            "cancelled" => Ok(MembershipStatus::Cancelled),
            other => Err(ParseVocabError::new("membership status", other)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(PaymentType, PaymentStatus, SeasonStatus, MembershipStatus);
