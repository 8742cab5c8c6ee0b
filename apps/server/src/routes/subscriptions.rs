use actix_web::{web, HttpResponse};

use crate::auth::{AuthenticatedCaller, CallerIdentity};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::EnsureSubscriptionResponse;
use crate::services::SubscriptionService;

/// GET /api/quota - Current quota, or `null` without a caller identity
pub async fn get_quota(pool: web::Data<DbPool>, caller: CallerIdentity) -> AppResult<HttpResponse> {
    let status = SubscriptionService::check_quota(pool.get_ref(), caller.user()).await?;

    Ok(HttpResponse::Ok().json(status))
}

/// GET /api/subscription - The caller's subscription record, or `null`
pub async fn get_subscription(
    pool: web::Data<DbPool>,
    caller: AuthenticatedCaller,
) -> AppResult<HttpResponse> {
    let subscription = SubscriptionService::get_by_user(pool.get_ref(), &caller.0).await?;

    Ok(HttpResponse::Ok().json(subscription.map(|s| s.to_response())))
}

/// POST /api/subscription - Ensure the caller has a current subscription
pub async fn ensure_subscription(
    pool: web::Data<DbPool>,
    caller: AuthenticatedCaller,
) -> AppResult<HttpResponse> {
    let id = SubscriptionService::ensure_subscription(pool.get_ref(), &caller.0).await?;

    Ok(HttpResponse::Ok().json(EnsureSubscriptionResponse { id }))
}

/// Configure quota and subscription routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/quota", web::get().to(get_quota)).service(
        web::scope("/api/subscription")
            .route("", web::get().to(get_subscription))
            .route("", web::post().to(ensure_subscription)),
    );
}
