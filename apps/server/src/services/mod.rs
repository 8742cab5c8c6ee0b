pub mod metering;
pub mod subscription;
pub mod usage_tracker;

pub use crate::models::{compute_billing_period, BillingPeriod};
pub use metering::{MeteredOperation, MeteringService};
pub use subscription::SubscriptionService;
pub use usage_tracker::{HttpUsageTracker, UsageTracker};
