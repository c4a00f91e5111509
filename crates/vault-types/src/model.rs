use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant namespace: a directory under the collections root and its catalog row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Lifecycle state of a catalog row. READY is the only state read endpoints surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectStatus {
    Ready,
    Updating,
    Deleted,
}

impl ObjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectStatus::Ready => "READY",
            ObjectStatus::Updating => "UPDATING",
            ObjectStatus::Deleted => "DELETED",
        }
    }
}

impl std::str::FromStr for ObjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(ObjectStatus::Ready),
            "UPDATING" => Ok(ObjectStatus::Updating),
            "DELETED" => Ok(ObjectStatus::Deleted),
            other => Err(format!("unknown object status: {other}")),
        }
    }
}

/// One file mirrored into the object store, and its catalog bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub id: i64,
    pub collection: String,
    pub name: String,
    pub object_key: String,
    pub hash_sha256: String,
    pub size_bytes: i64,
    pub status: ObjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
