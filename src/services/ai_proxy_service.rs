use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::clients::OpenAiClient;
use crate::error::AppError;
use crate::models::Product;

/// A generation task as posted by the editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "task", content = "data", rename_all = "camelCase")]
pub enum AiTask {
    GenerateMarketingCopy { topic: String },
    ParseProductsFromText { text: String },
    GenerateBackgroundImage { prompt: String },
    GenerateAdScript { products: Vec<Product> },
}

impl AiTask {
    /// Unknown task names and missing fields are caller errors.
    pub fn from_value(payload: Value) -> Result<Self, AppError> {
        serde_json::from_value(payload).map_err(|e| AppError::BadRequest(format!("Invalid AI task: {}", e)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AiTask::GenerateMarketingCopy { .. } => "generateMarketingCopy",
            AiTask::ParseProductsFromText { .. } => "parseProductsFromText",
            AiTask::GenerateBackgroundImage { .. } => "generateBackgroundImage",
            AiTask::GenerateAdScript { .. } => "generateAdScript",
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        let empty = match self {
            AiTask::GenerateMarketingCopy { topic } => topic.trim().is_empty(),
            AiTask::ParseProductsFromText { text } => text.trim().is_empty(),
            AiTask::GenerateBackgroundImage { prompt } => prompt.trim().is_empty(),
            AiTask::GenerateAdScript { products } => products.is_empty(),
        };
        if empty {
            return Err(AppError::BadRequest(format!("{} requires non-empty input", self.name())));
        }
        Ok(())
    }
}

pub struct AiProxyService {
    openai: OpenAiClient,
}

impl AiProxyService {
    pub fn new(openai: OpenAiClient) -> Self {
        Self { openai }
    }

    /// Runs the task and returns the value placed under `response`.
    pub async fn run(&self, task: &AiTask) -> Result<Value, AppError> {
        task.validate()?;
        info!("Running AI task {}", task.name());

        let response = match task {
            AiTask::GenerateMarketingCopy { topic } => json!(self.openai.generate_marketing_copy(topic).await?),
            AiTask::ParseProductsFromText { text } => json!(self.openai.parse_products_from_text(text).await?),
            AiTask::GenerateBackgroundImage { prompt } => {
                json!(self.openai.generate_background_image(prompt).await?)
            }
            AiTask::GenerateAdScript { products } => json!(self.openai.generate_ad_script(products).await?),
        };
        Ok(response)
    }
}
