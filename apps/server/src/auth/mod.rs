pub mod billing;
pub mod identity;

pub use billing::{verify_bearer, BillingAuth};
pub use identity::{identity_from_request, AuthenticatedCaller, CallerIdentity};
