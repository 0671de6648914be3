use std::time::Duration;

use base64::Engine as _;

use crate::{
    assets::decode::Photo,
    foundation::{
        config::GatewayConfig,
        error::{BoothError, BoothResult},
    },
};

/// Message fragments the generation backend uses when a model cannot take image input.
const UNSUPPORTED_INPUT_MARKERS: [&str; 2] = [
    "image in input is not supported",
    "not supported for this model",
];

/// One generated image, base64-encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedImage {
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Response body shared by `stylize` and `generate`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}

impl GenerateResponse {
    /// Wrap encoded image bytes as a single-image response.
    pub fn from_image_bytes(bytes: &[u8]) -> Self {
        Self {
            images: vec![GeneratedImage {
                image_base64: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            }],
        }
    }

    /// Decode the first image, failing with "missing result" when there is none.
    pub fn first_photo(&self) -> BoothResult<Photo> {
        let b64 = self
            .images
            .first()
            .and_then(|img| img.image_base64.as_deref())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BoothError::gateway("missing result: response carried no image"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| BoothError::decode(format!("image_base64 is not valid base64: {e}")))?;
        Photo::from_encoded(&bytes)
    }
}

/// Boundary to the generative image backend.
#[async_trait::async_trait]
pub trait StylizationGateway: Send + Sync {
    /// Restyle `image_png` according to `prompt`.
    async fn stylize(
        &self,
        image_png: &[u8],
        prompt: &str,
        image_count: u32,
    ) -> BoothResult<GenerateResponse>;

    /// Text-only generation.
    async fn generate(&self, prompt: &str, image_count: u32) -> BoothResult<GenerateResponse>;
}

/// Map a backend failure message to [`BoothError::UnsupportedModelInput`] or
/// [`BoothError::Gateway`].
pub fn classify_failure(message: impl Into<String>) -> BoothError {
    let message = message.into();
    let lower = message.to_ascii_lowercase();
    if UNSUPPORTED_INPUT_MARKERS.iter().any(|m| lower.contains(m)) {
        BoothError::UnsupportedModelInput(message)
    } else {
        BoothError::Gateway(message)
    }
}

const ERROR_MESSAGE_POINTERS: [&str; 4] = [
    "/detail/error/message",
    "/detail/message",
    "/error/message",
    "/detail",
];

/// Pull the most specific error message out of a backend error body.
///
/// Checks `detail.error.message`, `detail.message`, `error.message`, then a string
/// `detail`, and falls back to the raw body.
pub fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for pointer in ERROR_MESSAGE_POINTERS {
            if let Some(msg) = value.pointer(pointer).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.trim().to_string();
                }
            }
        }
    }
    trimmed.to_string()
}

/// [`StylizationGateway`] speaking the booth backend's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    number_of_images: u32,
}

impl HttpGateway {
    pub fn new(cfg: &GatewayConfig) -> BoothResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| BoothError::config(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read_response(resp: reqwest::Response) -> BoothResult<GenerateResponse> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BoothError::gateway(format!("read response body: {e}")))?;
        if !status.is_success() {
            let msg = extract_error_message(&body);
            let msg = if msg.is_empty() {
                format!("HTTP {status}")
            } else {
                msg
            };
            tracing::warn!(%status, message = %msg, "gateway request failed");
            return Err(classify_failure(msg));
        }
        serde_json::from_str(&body)
            .map_err(|e| BoothError::gateway(format!("malformed response body: {e}")))
    }
}

#[async_trait::async_trait]
impl StylizationGateway for HttpGateway {
    #[tracing::instrument(skip(self, image_png, prompt), fields(bytes = image_png.len()))]
    async fn stylize(
        &self,
        image_png: &[u8],
        prompt: &str,
        image_count: u32,
    ) -> BoothResult<GenerateResponse> {
        let part = reqwest::multipart::Part::bytes(image_png.to_vec())
            .file_name("photo.png")
            .mime_str("image/png")
            .map_err(|e| BoothError::gateway(format!("build multipart: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("prompt", prompt.to_string())
            .text("number_of_images", image_count.to_string())
            .text("model", self.model.clone())
            .part("image", part);
        let resp = self
            .client
            .post(self.endpoint("/api/stylize"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_failure(format!("stylize request: {e}")))?;
        Self::read_response(resp).await
    }

    #[tracing::instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str, image_count: u32) -> BoothResult<GenerateResponse> {
        let resp = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&GenerateRequest {
                prompt,
                number_of_images: image_count,
            })
            .send()
            .await
            .map_err(|e| classify_failure(format!("generate request: {e}")))?;
        Self::read_response(resp).await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stylize/gateway.rs"]
mod tests;
