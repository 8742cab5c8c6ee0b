pub mod billing_period;
pub mod metering;
pub mod plan;
pub mod subscription;

pub use billing_period::{compute_billing_period, BillingPeriod};
pub use metering::{Feature, MeterAuthority, MeteredOutcome, MeteringPolicy};
pub use plan::Plan;
pub use subscription::{
    ApplyPlanRequest, ConsumeResult, ConsumeUpdate, EnsureSubscriptionResponse, NewSubscription,
    PlanUpdate, QuotaStatus, RolloverUpdate, Subscription, SubscriptionResponse, UserId,
};
