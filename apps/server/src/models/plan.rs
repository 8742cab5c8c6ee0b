use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Subscription plan
///
/// The catalog is static: changing a limit requires a redeploy, and existing
/// records keep their stored limit until the plan is applied again.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    /// Every plan in the catalog
    pub const ALL: [Plan; 2] = [Plan::Free, Plan::Pro];

    /// Monthly prompt allowance for this plan
    pub fn prompts_limit(self) -> i32 {
        match self {
            Plan::Free => 10,
            Plan::Pro => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            _ => Err(AppError::InvalidPlan(s.to_string())),
        }
    }
}
