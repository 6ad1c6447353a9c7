use actix_web::{web, HttpResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::info;
use serde::{Deserialize, Serialize};

use crate::clients::SpeechSynthesizer;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    pub audio_content: String,
}

pub async fn synthesize_speech(
    synthesizer: web::Data<dyn SpeechSynthesizer>,
    request: web::Json<SpeechRequest>,
) -> Result<HttpResponse, AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text is required".to_string()));
    }

    let audio = synthesizer.synthesize(text).await?;
    info!("Synthesized {} bytes of speech", audio.len());

    Ok(HttpResponse::Ok().json(SpeechResponse {
        audio_content: STANDARD.encode(audio),
    }))
}
