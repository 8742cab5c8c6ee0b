//! Test fixtures for the subscription ledger
//!
//! Helpers that put subscription rows into states the public API only reaches
//! over time (elapsed periods, partially used quota).

#![allow(dead_code)]

use chrono::{Duration, Utc};
use promptmeter::models::{Subscription, UserId};
use promptmeter::services::SubscriptionService;
use sqlx::PgPool;
use uuid::Uuid;

/// A fresh user id that no other test shares
pub fn unique_user() -> UserId {
    UserId::new(format!("user_{}", Uuid::new_v4().simple())).expect("non-empty user id")
}

/// Ensures a subscription and returns the stored record
pub async fn create_subscription(pool: &PgPool, user: &UserId) -> Subscription {
    SubscriptionService::ensure_subscription(pool, user)
        .await
        .expect("Failed to ensure subscription");
    get_subscription(pool, user).await
}

/// Reads the stored record, panicking if it does not exist
pub async fn get_subscription(pool: &PgPool, user: &UserId) -> Subscription {
    SubscriptionService::get_by_user(pool, user)
        .await
        .expect("Failed to read subscription")
        .expect("Subscription should exist")
}

/// Overwrites `prompts_used` directly
pub async fn set_prompts_used(pool: &PgPool, user: &UserId, used: i32) {
    sqlx::query("UPDATE subscriptions SET prompts_used = $1 WHERE user_id = $2")
        .bind(used)
        .bind(user.as_str())
        .execute(pool)
        .await
        .expect("Failed to set prompts_used");
}

/// Moves the stored period into the past so it has elapsed
pub async fn backdate_period(pool: &PgPool, user: &UserId) {
    let end = Utc::now() - Duration::days(31);
    let start = end - Duration::days(30);

    sqlx::query("UPDATE subscriptions SET period_start = $1, period_end = $2 WHERE user_id = $3")
        .bind(start)
        .bind(end)
        .bind(user.as_str())
        .execute(pool)
        .await
        .expect("Failed to backdate period");
}
