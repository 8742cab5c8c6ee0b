use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ConsumeResult, ConsumeUpdate, NewSubscription, Plan, PlanUpdate, QuotaStatus,
    RolloverUpdate, Subscription, UserId,
};

/// Monthly prompt ledger
///
/// Reads never persist anything. Writes run in a transaction holding the
/// user's row lock (`SELECT ... FOR UPDATE`), so concurrent consumers for one
/// user serialize while different users never contend.
pub struct SubscriptionService;

impl SubscriptionService {
    /// Gets the subscription record for a user, if any
    pub async fn get_by_user(pool: &PgPool, user: &UserId) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    /// Makes sure the user has a current subscription record
    ///
    /// Creates a free-plan record on first use and rolls a stale record over
    /// in place. Idempotent.
    pub async fn ensure_subscription(pool: &PgPool, user: &UserId) -> AppResult<Uuid> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        match Self::ensure_inner(&mut tx, user, Plan::Free, now).await {
            Ok(subscription) => {
                tx.commit().await?;
                Ok(subscription.id)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Reads the caller's quota
    ///
    /// Returns `None` when there is no caller identity. A user without a record
    /// sees the free-plan defaults and a stale record is shown as rolled over;
    /// neither case writes anything.
    pub async fn check_quota(
        pool: &PgPool,
        identity: Option<&UserId>,
    ) -> AppResult<Option<QuotaStatus>> {
        let Some(user) = identity else {
            return Ok(None);
        };

        let now = Utc::now();
        let status = match Self::get_by_user(pool, user).await? {
            Some(subscription) => subscription.quota_status(now),
            None => QuotaStatus::free_default(now),
        };

        Ok(Some(status))
    }

    /// Consumes `count` prompts
    ///
    /// Either the full count is deducted or nothing is. Fails with
    /// `SubscriptionNotFound` if `ensure_subscription` was never called and
    /// with `QuotaExceeded` when the balance cannot cover `count`.
    pub async fn consume_prompt(
        pool: &PgPool,
        user: &UserId,
        count: i32,
    ) -> AppResult<ConsumeResult> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        match Self::consume_inner(&mut tx, user, count, now).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback().await?;
                if let AppError::QuotaExceeded { remaining } = &e {
                    log::warn!(
                        "Consume of {} prompt(s) rejected for user {} ({} remaining)",
                        count,
                        user,
                        remaining
                    );
                }
                Err(e)
            }
        }
    }

    /// Applies a plan from the catalog (billing provider event)
    ///
    /// Usage and period are kept; only plan and limit change. Creates the
    /// record on the requested plan if the user has none.
    pub async fn apply_plan(
        pool: &PgPool,
        user: &UserId,
        plan_id: &str,
    ) -> AppResult<Subscription> {
        let plan: Plan = plan_id.parse()?;
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        match Self::apply_plan_inner(&mut tx, user, plan, now).await {
            Ok(subscription) => {
                tx.commit().await?;
                log::info!(
                    "Applied plan {} to user {} (limit {}, used {})",
                    subscription.plan,
                    user,
                    subscription.prompts_limit,
                    subscription.prompts_used
                );
                Ok(subscription)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Find-or-create within a transaction, leaving the row locked and current
    async fn ensure_inner(
        tx: &mut Transaction<'_, Postgres>,
        user: &UserId,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        let new = NewSubscription::for_user(user, plan, now);

        // Concurrent creators block on the unique key; the loser inserts nothing
        let inserted = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (user_id, plan, prompts_limit, prompts_used, period_start, period_end)
            VALUES ($1, $2, $3, 0, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&new.user_id)
        .bind(new.plan)
        .bind(new.prompts_limit)
        .bind(new.period.start)
        .bind(new.period.end)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(subscription) = inserted {
            log::info!(
                "Created {} subscription {} for user {}",
                subscription.plan,
                subscription.id,
                user
            );
            return Ok(subscription);
        }

        let existing = Self::lock_for_update(tx, user)
            .await?
            .ok_or_else(|| AppError::SubscriptionNotFound(user.to_string()))?;

        Self::rollover_if_stale(tx, existing, now).await
    }

    async fn apply_plan_inner(
        tx: &mut Transaction<'_, Postgres>,
        user: &UserId,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        let subscription = Self::ensure_inner(tx, user, plan, now).await?;
        Self::apply_plan_update(tx, subscription.id, &PlanUpdate::for_plan(plan)).await
    }

    async fn consume_inner(
        tx: &mut Transaction<'_, Postgres>,
        user: &UserId,
        count: i32,
        now: DateTime<Utc>,
    ) -> AppResult<ConsumeResult> {
        let subscription = Self::lock_for_update(tx, user)
            .await?
            .ok_or_else(|| AppError::SubscriptionNotFound(user.to_string()))?;

        let subscription = Self::rollover_if_stale(tx, subscription, now).await?;

        let update = ConsumeUpdate::plan(&subscription, count)?;
        Self::apply_consume(tx, subscription.id, &update).await?;

        Ok(ConsumeResult {
            remaining: update.remaining,
        })
    }

    /// Locks the user's row until the transaction ends
    async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        user: &UserId,
    ) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(subscription)
    }

    async fn rollover_if_stale(
        tx: &mut Transaction<'_, Postgres>,
        subscription: Subscription,
        now: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        if !subscription.is_stale(now) {
            return Ok(subscription);
        }

        let update = RolloverUpdate::for_time(now);
        let fresh = Self::apply_rollover(tx, subscription.id, &update).await?;

        log::info!(
            "Rolled over subscription {} (used {} -> 0, period ends {})",
            subscription.id,
            subscription.prompts_used,
            fresh.period_end
        );

        Ok(fresh)
    }

    async fn apply_rollover(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        update: &RolloverUpdate,
    ) -> AppResult<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET prompts_used = 0,
                period_start = $2,
                period_end = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.period.start)
        .bind(update.period.end)
        .fetch_one(&mut **tx)
        .await?;

        Ok(subscription)
    }

    async fn apply_consume(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        update: &ConsumeUpdate,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET prompts_used = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.prompts_used)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn apply_plan_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        update: &PlanUpdate,
    ) -> AppResult<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET plan = $2,
                prompts_limit = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.plan)
        .bind(update.prompts_limit)
        .fetch_one(&mut **tx)
        .await?;

        Ok(subscription)
    }
}
