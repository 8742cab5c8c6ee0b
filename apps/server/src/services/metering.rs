//! Quota-gated execution of metered operations.
//!
//! Every billed capability runs through [`MeteringService::run`]:
//!
//! 1. require a caller identity
//! 2. ensure the subscription record exists and is current
//! 3. check the balance covers the operation's cost, before any paid work
//! 4. run the operation under a timeout, holding no ledger lock
//! 5. on success, consume only the units that actually completed
//! 6. on failure, timeout or caller cancellation, consume nothing and let the
//!    operation mark its partial state as failed
//!
//! Features assigned to the external authority skip the ledger entirely and
//! are checked and tracked against the [`UsageTracker`] instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::config::MeteringConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Feature, MeterAuthority, MeteredOutcome, MeteringPolicy, UserId};
use crate::services::usage_tracker::{HttpUsageTracker, UsageTracker};
use crate::services::SubscriptionService;

/// An externally costly action (LLM call, image generation, scrape)
#[async_trait]
pub trait MeteredOperation: Send + Sync {
    type Output: Send;

    /// Feature this operation is billed under
    fn feature(&self) -> Feature;

    /// Units requested; the balance must cover this before `run` is called
    fn cost(&self) -> i32 {
        1
    }

    /// Performs the work and reports how many units completed
    async fn run(&self) -> AppResult<MeteredOutcome<Self::Output>>;

    /// Called when `run` fails, times out, or is abandoned because the caller
    /// dropped the metering future
    ///
    /// Operations that persisted partial state (e.g. a pending analysis
    /// record) mark it failed here. On cancellation the hook runs on a
    /// spawned task with `OperationCancelled`.
    async fn on_failure(&self, _error: &AppError) {}
}

/// Hands `on_failure` to a spawned task if dropped while still armed
///
/// Armed for the duration of the operation itself. A caller that drops the
/// metering future mid-operation (client disconnect, outer timeout) drops
/// this guard armed.
struct CancelGuard<O: MeteredOperation + 'static> {
    op: Option<Arc<O>>,
}

impl<O: MeteredOperation + 'static> CancelGuard<O> {
    fn arm(op: Arc<O>) -> Self {
        Self { op: Some(op) }
    }

    fn disarm(&mut self) {
        self.op = None;
    }
}

impl<O: MeteredOperation + 'static> Drop for CancelGuard<O> {
    fn drop(&mut self) {
        let Some(op) = self.op.take() else {
            return;
        };

        let feature = op.feature();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::warn!("{} cancelled by caller, marking it failed", feature);
                handle.spawn(async move {
                    op.on_failure(&AppError::OperationCancelled).await;
                });
            }
            Err(_) => {
                log::error!(
                    "{} cancelled outside a runtime, failure hook not run",
                    feature
                );
            }
        }
    }
}

/// Runs metered operations against the ledger or the external tracker
#[derive(Clone)]
pub struct MeteringService {
    pool: PgPool,
    policy: MeteringPolicy,
    tracker: Option<Arc<dyn UsageTracker>>,
    timeout: Duration,
}

impl MeteringService {
    /// Builds the service from configuration
    pub fn new(pool: PgPool, config: &MeteringConfig) -> AppResult<Self> {
        let tracker = match config.usage_tracker {
            Some(ref tracker_config) => {
                Some(Arc::new(HttpUsageTracker::new(tracker_config)?) as Arc<dyn UsageTracker>)
            }
            None => None,
        };

        Ok(Self {
            pool,
            policy: config.policy(),
            tracker,
            timeout: config.operation_timeout,
        })
    }

    /// Ledger-only service with the given timeout
    pub fn with_timeout(pool: PgPool, timeout: Duration) -> Self {
        Self {
            pool,
            policy: MeteringPolicy::ledger_only(),
            tracker: None,
            timeout,
        }
    }

    /// Replaces the policy and external tracker
    pub fn with_tracker(
        mut self,
        policy: MeteringPolicy,
        tracker: Arc<dyn UsageTracker>,
    ) -> Self {
        self.policy = policy;
        self.tracker = Some(tracker);
        self
    }

    pub fn policy(&self) -> &MeteringPolicy {
        &self.policy
    }

    /// Runs `op` for the caller, charging only completed work
    pub async fn run<O: MeteredOperation + 'static>(
        &self,
        identity: Option<&UserId>,
        op: Arc<O>,
    ) -> AppResult<O::Output> {
        let user = identity.ok_or(AppError::NotAuthenticated)?;
        let feature = op.feature();
        let cost = op.cost();

        if cost < 1 {
            return Err(AppError::Validation(format!(
                "Operation cost must be at least 1, got {}",
                cost
            )));
        }

        let authority = self.policy.authority_for(feature);
        self.precheck(user, feature, cost, authority).await?;

        let mut guard = CancelGuard::arm(Arc::clone(&op));
        let result = tokio::time::timeout(self.timeout, op.run()).await;
        guard.disarm();

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                log::warn!("{} failed for user {}: {}", feature, user, e);
                op.on_failure(&e).await;
                return Err(e);
            }
            Err(_) => {
                let e = AppError::OperationTimedOut(self.timeout);
                log::warn!("{} timed out for user {}", feature, user);
                op.on_failure(&e).await;
                return Err(e);
            }
        };

        // Never bill more than was requested
        let units = outcome.units_completed.clamp(0, cost);
        if units > 0 {
            self.charge(user, feature, units, authority).await?;
        }

        Ok(outcome.value)
    }

    async fn precheck(
        &self,
        user: &UserId,
        feature: Feature,
        cost: i32,
        authority: MeterAuthority,
    ) -> AppResult<()> {
        match authority {
            MeterAuthority::Ledger => {
                SubscriptionService::ensure_subscription(&self.pool, user).await?;

                let status = SubscriptionService::check_quota(&self.pool, Some(user))
                    .await?
                    .ok_or(AppError::NotAuthenticated)?;

                if status.remaining < cost {
                    log::warn!(
                        "{} refused for user {}: needs {}, {} remaining",
                        feature,
                        user,
                        cost,
                        status.remaining
                    );
                    return Err(AppError::QuotaExceeded {
                        remaining: status.remaining,
                    });
                }
            }
            MeterAuthority::External => {
                if !self.tracker()?.check(user, feature, cost).await? {
                    log::warn!("{} refused for user {} by usage tracker", feature, user);
                    return Err(AppError::QuotaExceeded { remaining: 0 });
                }
            }
        }

        Ok(())
    }

    async fn charge(
        &self,
        user: &UserId,
        feature: Feature,
        units: i32,
        authority: MeterAuthority,
    ) -> AppResult<()> {
        let result = match authority {
            MeterAuthority::Ledger => {
                SubscriptionService::consume_prompt(&self.pool, user, units)
                    .await
                    .map(|_| ())
            }
            MeterAuthority::External => self.tracker()?.track(user, feature, units).await,
        };

        if let Err(ref e) = result {
            log::error!(
                "Failed to charge {} unit(s) of {} for user {}: {}",
                units,
                feature,
                user,
                e
            );
        }

        result
    }

    fn tracker(&self) -> AppResult<&Arc<dyn UsageTracker>> {
        self.tracker.as_ref().ok_or_else(|| {
            AppError::Internal("Usage tracker is not configured".to_string())
        })
    }
}
