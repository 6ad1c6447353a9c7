use actix_web::{post, web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::billing::CheckoutService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCheckoutRequest {
    pub plan_role: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsCheckoutRequest {
    pub amount: i64,
    pub price: f64,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinkResponse {
    pub checkout_link: String,
}

#[post("/plan")]
pub async fn create_plan_checkout(
    checkout_service: web::Data<CheckoutService>,
    request: web::Json<PlanCheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Creating plan checkout ({}) for user {}", request.plan_role, request.user_id);
    let checkout_link = checkout_service
        .plan_checkout(&request.plan_role, &request.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(CheckoutLinkResponse { checkout_link }))
}

#[post("/credits")]
pub async fn create_credits_checkout(
    checkout_service: web::Data<CheckoutService>,
    request: web::Json<CreditsCheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Creating credits checkout ({}) for user {}", request.amount, request.user_id);
    let checkout_link = checkout_service
        .credits_checkout(request.amount, request.price, &request.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(CheckoutLinkResponse { checkout_link }))
}
