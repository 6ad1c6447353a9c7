use actix_web::{post, web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};

use crate::clients::MetaGraphClient;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostImageRequest {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    pub page_access_token: Option<String>,
    pub page_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostImageResponse {
    pub success: bool,
    pub post_id: String,
    pub message: String,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// The caller supplies its own page token; no stored credentials are used.
#[post("/meta/post-image")]
pub async fn post_image(
    meta_client: web::Data<MetaGraphClient>,
    request: web::Json<PostImageRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let image_url = required(Some(request.image_url));
    let token = required(request.page_access_token);
    let page_id = required(request.page_id);

    let (Some(token), Some(page_id), Some(image_url)) = (token, page_id, image_url) else {
        return Err(AppError::BadRequest(
            "Missing required parameters (pageAccessToken, pageId, imageUrl)".to_string(),
        ));
    };

    let post_id = meta_client
        .post_image(&token, &page_id, &image_url, &request.caption)
        .await?;
    info!("Published image to Instagram for page {} as {}", page_id, post_id);

    Ok(HttpResponse::Ok().json(PostImageResponse {
        success: true,
        post_id,
        message: "Postagem publicada com sucesso!".to_string(),
    }))
}
