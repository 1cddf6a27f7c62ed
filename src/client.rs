use log::{info, warn};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::TextKind;
use crate::config::{Settings, SettingsStore};
use crate::error::{Result, TranslateError};
use crate::protocol::{ReplyData, TranslateReply};
use crate::request::{self, ModelKind, PreparedRequest};
use crate::response;

/// Pooled connections are bound to the runtime that opened them, so each
/// translator (one per worker runtime) gets its own client.
fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

/// The privileged side of the pipeline: reads settings, talks HTTP.
#[derive(Clone)]
pub struct Translator {
    http: reqwest::Client,
    store: Arc<SettingsStore>,
}

impl Translator {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self {
            http: http_client(),
            store,
        }
    }

    async fn send(&self, req: &PreparedRequest) -> Result<(StatusCode, Vec<u8>)> {
        let resp = self
            .http
            .post(&req.endpoint)
            .bearer_auth(&req.credential)
            .json(&req.body)
            .send()
            .await
            .map_err(TranslateError::network)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(TranslateError::network)?;
        Ok((status, body.to_vec()))
    }

    pub async fn translate(&self, text: &str, kind: TextKind) -> Result<TranslateReply> {
        let settings = self.store.get_with_defaults();
        let req = request::build_translation(&settings, text, kind)?;
        info!(
            "Translating {} chars as {:?} with model {}",
            text.chars().count(),
            kind,
            settings.model_id
        );
        let (status, body) = self.send(&req).await?;
        let content = response::interpret(status, &body)?;

        if req.model_kind == ModelKind::DedicatedTranslation {
            return Ok(TranslateReply {
                data: ReplyData::Text(content.trim().to_string()),
                is_translation_model: true,
            });
        }
        let data = if req.expects_entry {
            match response::parse_dictionary(&content) {
                Some(entry) => ReplyData::Entry(entry),
                None => ReplyData::Text(content.trim().to_string()),
            }
        } else {
            ReplyData::Text(content.trim().to_string())
        };
        Ok(TranslateReply {
            data,
            is_translation_model: false,
        })
    }

    /// Sends the probe request with the given (possibly unsaved) settings.
    pub async fn test_connection(&self, settings: &Settings) -> Result<String> {
        let req = request::build_probe(settings)
            .map_err(|_| TranslateError::Config("Please fill in the complete API settings".into()))?;
        info!("Testing connection to {} with model {}", req.endpoint, settings.model_id);
        let (status, body) = self.send(&req).await?;
        response::interpret_probe(status, &body).map_err(|e| match e {
            TranslateError::Api { message, status } => TranslateError::Api {
                message: message.replacen("API request failed", "Connection failed", 1),
                status,
            },
            other => other,
        })?;
        Ok("Connection succeeded!".to_string())
    }
}
