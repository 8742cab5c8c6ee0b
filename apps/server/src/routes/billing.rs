use actix_web::{web, HttpResponse};

use crate::auth::BillingAuth;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ApplyPlanRequest, UserId};
use crate::services::SubscriptionService;

/// PUT /internal/subscriptions/{user_id}/plan - Apply a plan from the billing provider
pub async fn apply_plan(
    pool: web::Data<DbPool>,
    _auth: BillingAuth, // Requires the billing webhook secret
    path: web::Path<String>,
    body: web::Json<ApplyPlanRequest>,
) -> AppResult<HttpResponse> {
    let user = UserId::new(path.into_inner())
        .ok_or_else(|| AppError::Validation("user_id cannot be empty".to_string()))?;

    let subscription = SubscriptionService::apply_plan(pool.get_ref(), &user, &body.plan).await?;

    Ok(HttpResponse::Ok().json(subscription.to_response()))
}

/// Configure internal billing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/internal/subscriptions")
            .route("/{user_id}/plan", web::put().to(apply_plan)),
    );
}
