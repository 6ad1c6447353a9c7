use actix_web::{post, web, HttpResponse};

use crate::error::AppError;
use crate::services::layout::{plan_layout, LayoutRequest};

#[post("/plan")]
pub async fn plan_poster_layout(request: web::Json<LayoutRequest>) -> Result<HttpResponse, AppError> {
    let plan = plan_layout(&request)?;
    Ok(HttpResponse::Ok().json(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn test_plan_endpoint() {
        let app = test::init_service(App::new().service(web::scope("/layout").service(plan_poster_layout))).await;

        let req = test::TestRequest::post()
            .uri("/layout/plan")
            .set_json(json!({"format": "tv", "products": [{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}]}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mode"], "grid");
        assert_eq!(body["columns"], 3);
        assert_eq!(body["rows"], 2);
        assert_eq!(body["compact"], true);
        assert_eq!(body["cards"][0]["elements"]["image"]["scale"], 1.0);

        let req = test::TestRequest::post()
            .uri("/layout/plan")
            .set_json(json!({"format": "poster", "products": []}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
