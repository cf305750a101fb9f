//! Image-understanding client: reads title, author, ISBN and genre off photos.
//!
//! [`OpenAiVision`] talks to any OpenAI-compatible chat completions API. The
//! photos go in as `image_url` parts pointing at the temporary signed URLs;
//! the answer is requested as a JSON object.

use crate::types::BookIdentity;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Vision API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Vision answer is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Vision API returned no answer")]
    EmptyAnswer,
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
}

/// Anything that can identify a book from photo URLs.
pub trait VisionClient {
    fn identify(&self, image_urls: &[&str]) -> Result<BookIdentity, VisionError>;
}

const SYSTEM_PROMPT: &str = "You identify books from photos of their covers and copyright pages. \
Answer with a JSON object with the keys title, author, isbn and genre. \
Use null for anything you cannot read. Keep the title and author in the book's own language.";

const USER_PROMPT: &str = "Identify this book.";

pub struct OpenAiVision {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl OpenAiVision {
    pub fn new(
        api_base: &str,
        model: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, VisionError> {
        let api_key = api_key.ok_or(VisionError::MissingApiKey)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl VisionClient for OpenAiVision {
    fn identify(&self, image_urls: &[&str]) -> Result<BookIdentity, VisionError> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = build_request(&self.model, image_urls);
        debug!(model = %self.model, images = image_urls.len(), "sending vision request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json()?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(VisionError::EmptyAnswer)?;
        parse_identity(&content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    content: Option<String>,
}

fn build_request(model: &str, image_urls: &[&str]) -> ChatRequest {
    let mut user = vec![ContentPart::Text {
        text: USER_PROMPT.into(),
    }];
    user.extend(image_urls.iter().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: url.to_string(),
        },
    }));

    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: vec![ContentPart::Text {
                    text: SYSTEM_PROMPT.into(),
                }],
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
        response_format: ResponseFormat {
            kind: "json_object",
        },
        temperature: 0.0,
    }
}

/// Parse the model's answer, tolerating a Markdown code fence around the JSON.
pub fn parse_identity(content: &str) -> Result<BookIdentity, VisionError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    let identity: BookIdentity = serde_json::from_str(body.trim())?;
    Ok(identity.normalized())
}
