use actix_web::{get, web, HttpResponse};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::clients::WooCommerceClient;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub page: Option<u32>,
}

#[get("/woocommerce/products")]
pub async fn list_woocommerce_products(
    woocommerce: web::Data<WooCommerceClient>,
    query: web::Query<CatalogQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1);
    let products = woocommerce.fetch_products(page).await?;
    debug!("Fetched {} catalog products (page {})", products.len(), page);
    Ok(HttpResponse::Ok().json(json!({ "products": products })))
}
