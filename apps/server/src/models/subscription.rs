//! Subscription ledger models.
//!
//! Every mutation of a subscription row goes through one of the typed update
//! structs below, so the exact set of columns a write touches is fixed by its
//! type rather than by whichever optional fields a caller happened to pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::billing_period::{compute_billing_period, BillingPeriod};
use crate::models::Plan;

// =============================================================================
// Caller Identity
// =============================================================================

/// Opaque authenticated user identifier supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a raw identifier. Blank identifiers are treated as "no identity".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Subscription Record
// =============================================================================

/// Per-user subscription record (at most one per user)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub plan: Plan,
    pub prompts_limit: i32,
    pub prompts_used: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// True once the current period has elapsed
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.period_end
    }

    /// Prompts left in the stored period, never negative
    pub fn remaining(&self) -> i32 {
        (self.prompts_limit - self.prompts_used).max(0)
    }

    /// Quota as it should be displayed at `now`
    ///
    /// A stale record is shown as already rolled over. Nothing is persisted;
    /// the rollover itself happens on the next ensure or consume.
    pub fn quota_status(&self, now: DateTime<Utc>) -> QuotaStatus {
        if self.is_stale(now) {
            let period = compute_billing_period(now);
            QuotaStatus::new(self.plan, self.prompts_limit, 0, period.end)
        } else {
            QuotaStatus::new(
                self.plan,
                self.prompts_limit,
                self.prompts_used,
                self.period_end,
            )
        }
    }

    /// Converts to the API representation
    pub fn to_response(&self) -> SubscriptionResponse {
        SubscriptionResponse {
            id: self.id,
            user_id: self.user_id.clone(),
            plan: self.plan,
            prompts_limit: self.prompts_limit,
            prompts_used: self.prompts_used,
            period_start: self.period_start,
            period_end: self.period_end,
            period_start_ms: self.period_start.timestamp_millis(),
            period_end_ms: self.period_end.timestamp_millis(),
            created_at: self.created_at,
        }
    }
}

/// API representation of a subscription
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub user_id: String,
    pub plan: Plan,
    pub prompts_limit: i32,
    pub prompts_used: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub period_start_ms: i64,
    pub period_end_ms: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Quota Status
// =============================================================================

/// Read-only view of a user's quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub has_quota: bool,
    pub remaining: i32,
    pub limit: i32,
    pub used: i32,
    pub plan: Plan,
    pub period_end: DateTime<Utc>,
    pub period_end_ms: i64,
}

impl QuotaStatus {
    fn new(plan: Plan, limit: i32, used: i32, period_end: DateTime<Utc>) -> Self {
        Self {
            has_quota: used < limit,
            remaining: (limit - used).max(0),
            limit,
            used,
            plan,
            period_end,
            period_end_ms: period_end.timestamp_millis(),
        }
    }

    /// Virtual free-plan view for a user with no record yet
    pub fn free_default(now: DateTime<Utc>) -> Self {
        let plan = Plan::Free;
        Self::new(plan, plan.prompts_limit(), 0, compute_billing_period(now).end)
    }
}

/// Result of a successful consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsumeResult {
    pub remaining: i32,
}

/// Response for ensure-subscription
#[derive(Debug, Serialize)]
pub struct EnsureSubscriptionResponse {
    pub id: Uuid,
}

/// DTO for the internal plan endpoint
#[derive(Debug, Deserialize)]
pub struct ApplyPlanRequest {
    pub plan: String,
}

// =============================================================================
// Typed Mutations
// =============================================================================

/// Insert for a brand-new subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: String,
    pub plan: Plan,
    pub prompts_limit: i32,
    pub period: BillingPeriod,
}

impl NewSubscription {
    pub fn for_user(user: &UserId, plan: Plan, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.as_str().to_string(),
            plan,
            prompts_limit: plan.prompts_limit(),
            period: compute_billing_period(now),
        }
    }
}

/// Period reset: `prompts_used` goes back to 0 and both bounds move together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloverUpdate {
    pub period: BillingPeriod,
}

impl RolloverUpdate {
    pub fn for_time(now: DateTime<Utc>) -> Self {
        Self {
            period: compute_billing_period(now),
        }
    }
}

/// Increment of `prompts_used` for a consume that fits in the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeUpdate {
    pub prompts_used: i32,
    pub remaining: i32,
}

impl ConsumeUpdate {
    /// Plans a consume of `count` prompts against a current (non-stale) record
    ///
    /// Rejects without side effects when the balance cannot cover `count`.
    pub fn plan(record: &Subscription, count: i32) -> AppResult<Self> {
        if count < 1 {
            return Err(AppError::Validation(format!(
                "Prompt count must be at least 1, got {}",
                count
            )));
        }

        let remaining = record.prompts_limit - record.prompts_used;
        if remaining < count {
            return Err(AppError::QuotaExceeded {
                remaining: remaining.max(0),
            });
        }

        Ok(Self {
            prompts_used: record.prompts_used + count,
            remaining: remaining - count,
        })
    }
}

/// Plan change: limit follows the catalog, usage and period are untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanUpdate {
    pub plan: Plan,
    pub prompts_limit: i32,
}

impl PlanUpdate {
    pub fn for_plan(plan: Plan) -> Self {
        Self {
            plan,
            prompts_limit: plan.prompts_limit(),
        }
    }
}
