use actix_web::{web, HttpResponse};
use log::warn;
use serde_json::json;

use crate::handlers::error_json;
use crate::services::{AiProxyService, AiTask};

/// `{task, data}` in, `{response}` or `{error}` out.
pub async fn ai_proxy(ai_proxy_service: web::Data<AiProxyService>, body: web::Json<serde_json::Value>) -> HttpResponse {
    let task = match AiTask::from_value(body.into_inner()) {
        Ok(task) => task,
        Err(e) => return error_json(&e),
    };

    match ai_proxy_service.run(&task).await {
        Ok(response) => HttpResponse::Ok().json(json!({ "response": response })),
        Err(e) => {
            warn!("AI task {} failed: {}", task.name(), e);
            error_json(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::OpenAiClient;
    use crate::clients::http_client::new_api_client;
    use crate::config::settings::OpenAiConfig;
    use actix_web::{test, App};
    use std::time::Duration;

    fn service(api_key: Option<&str>, base_url: String) -> AiProxyService {
        let config = OpenAiConfig {
            api_key: api_key.map(str::to_string),
            base_url,
            text_model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
        };
        AiProxyService::new(OpenAiClient::new(&config, new_api_client(Duration::from_secs(5))))
    }

    #[actix_web::test]
    async fn test_marketing_copy_is_wrapped_in_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "\"Ofertas Imperdíveis\""}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service(Some("sk-test"), server.url())))
                .service(web::scope("/ai-proxy").route("", web::post().to(ai_proxy))),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/ai-proxy")
            .set_json(json!({"task": "generateMarketingCopy", "data": {"topic": "feira"}}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["response"], "Ofertas Imperdíveis");
    }

    #[actix_web::test]
    async fn test_missing_key_and_unknown_task_map_to_status() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service(None, "http://127.0.0.1:9".to_string())))
                .service(web::scope("/ai-proxy").route("", web::post().to(ai_proxy))),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/ai-proxy")
            .set_json(json!({"task": "generateMarketingCopy", "data": {"topic": "feira"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("OPENAI_API_KEY"));

        let req = test::TestRequest::post()
            .uri("/ai-proxy")
            .set_json(json!({"task": "teleport", "data": {}}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
