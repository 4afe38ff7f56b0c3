//! Typed views of ledger entities, decoded from read results.

use serde::{Deserialize, Serialize};

/// Amounts travel as decimal strings: JSON numbers cannot carry a full `u128`.
pub mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
            Repr::Number(n) => Ok(u128::from(n)),
        }
    }
}

/// A registered knowledge domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub mapped_target: Option<String>,
    #[serde(with = "amount", default)]
    pub total_contributions: u128,
}

/// A registered idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRecord {
    pub id: String,
    pub creator: String,
    pub title: String,
    #[serde(with = "amount", default)]
    pub total_royalties: u128,
}

/// Lifecycle of a backup request on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Pending,
    Completed,
    Cancelled,
}

/// A backup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRequestRecord {
    pub id: String,
    pub requester: String,
    pub data_hash: String,
    pub status: BackupStatus,
    #[serde(default)]
    pub provider: Option<String>,
}
