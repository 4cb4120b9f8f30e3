//! Domain types for API keys and scopes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Permission granted to an API key. Reads are anonymous, so only writes
/// carry a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiScope {
    EquipmentWrite,
    ExerciseWrite,
}

impl ApiScope {
    /// Returns the slug used for serialization and DB storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EquipmentWrite => "equipment_write",
            Self::ExerciseWrite => "exercise_write",
        }
    }

    pub fn all() -> &'static [ApiScope] {
        &[Self::EquipmentWrite, Self::ExerciseWrite]
    }
}

impl Display for ApiScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScope(pub String);

impl Display for UnknownScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown api scope `{}`", self.0)
    }
}

impl std::error::Error for UnknownScope {}

impl FromStr for ApiScope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equipment_write" => Ok(Self::EquipmentWrite),
            "exercise_write" => Ok(Self::ExerciseWrite),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub name: String,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub scopes: Vec<ApiScope>,
    pub expires_at: Option<OffsetDateTime>,
    pub revoked_at: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl ApiKeyRecord {
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        if self.revoked_at.is_some_and(|revoked_at| revoked_at <= now) {
            return false;
        }
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}
