use serde::Serialize;

use crate::classify::TextKind;
use crate::config::Settings;
use crate::error::{Result, TranslateError};

/// Models that only take language hints and return translated text.
pub const DEDICATED_TRANSLATION_MODELS: [&str; 3] = ["qwen-mt-plus", "qwen-mt-flash", "qwen-mt-lite"];

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

const WORD_PROMPT: &str = r#"You are a professional English-Chinese dictionary. Explain the following English word in Chinese.
Reply with exactly one JSON object in the following shape and nothing else:
{
  "word": "the lemma",
  "phonetic": "IPA transcription, e.g. /wɜːrd/",
  "meanings": [
    {
      "pos": "part of speech, e.g. n. / v. / adj. / adv.",
      "definitions": ["Chinese definition 1", "Chinese definition 2"],
      "examples": [
        {"en": "English example sentence", "zh": "Chinese translation"}
      ]
    }
  ]
}

Word: "#;

const PARAGRAPH_PROMPT: &str = "Translate the following English text into Chinese.
1. Keep the translation accurate, fluent and natural.
2. Preserve the tone and style of the original.
3. Return only the translation, without explanations or any other content.

Text: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Generic,
    DedicatedTranslation,
}

/// Case-insensitive substring match against [`DEDICATED_TRANSLATION_MODELS`].
pub fn model_kind(model_id: &str) -> ModelKind {
    let lower = model_id.to_lowercase();
    if DEDICATED_TRANSLATION_MODELS.iter().any(|m| lower.contains(m)) {
        ModelKind::DedicatedTranslation
    } else {
        ModelKind::Generic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: &'static str,
    pub target: &'static str,
}

impl LanguagePair {
    pub const ZH_TO_EN: LanguagePair = LanguagePair { source: "Chinese", target: "English" };
    pub const AUTO_TO_ZH: LanguagePair = LanguagePair { source: "auto", target: "Chinese" };
    pub const EN_TO_ZH: LanguagePair = LanguagePair { source: "English", target: "Chinese" };

    /// Mostly-Chinese text (more than 30% CJK ideographs) goes to English,
    /// everything else goes to Chinese.
    pub fn detect(text: &str) -> Self {
        let total = text.chars().count();
        let han = text.chars().filter(|c| ('\u{4e00}'..='\u{9fa5}').contains(c)).count();
        if han > 0 && han as f64 > total as f64 * 0.3 {
            Self::ZH_TO_EN
        } else {
            Self::AUTO_TO_ZH
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOptions {
    pub source_lang: &'static str,
    pub target_lang: &'static str,
}

impl From<LanguagePair> for TranslationOptions {
    fn from(pair: LanguagePair) -> Self {
        Self {
            source_lang: pair.source,
            target_lang: pair.target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_options: Option<TranslationOptions>,
}

impl ChatRequest {
    fn user(model: &str, content: String) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage { role: "user", content }],
            temperature: None,
            max_tokens: None,
            response_format: None,
            translation_options: None,
        }
    }
}

/// A fully-formed call: where to POST, what to send, and how to read the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub endpoint: String,
    pub credential: String,
    pub model_kind: ModelKind,
    /// Whether the interpreter should try to read a dictionary entry.
    pub expects_entry: bool,
    pub body: ChatRequest,
}

pub fn chat_endpoint(base: &str) -> String {
    let base = base.trim();
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{}{}", base, CHAT_COMPLETIONS_PATH)
}

fn require_config(settings: &Settings) -> Result<()> {
    if settings.is_configured() {
        Ok(())
    } else {
        Err(TranslateError::missing_config())
    }
}

pub fn build_translation(settings: &Settings, text: &str, kind: TextKind) -> Result<PreparedRequest> {
    require_config(settings)?;
    let model_kind = model_kind(&settings.model_id);
    let body = match model_kind {
        ModelKind::DedicatedTranslation => {
            let mut body = ChatRequest::user(&settings.model_id, text.to_string());
            body.translation_options = Some(LanguagePair::detect(text).into());
            body
        }
        ModelKind::Generic if kind.is_word() => {
            let mut body = ChatRequest::user(&settings.model_id, format!("{}{}", WORD_PROMPT, text));
            body.temperature = Some(0.3);
            body.max_tokens = Some(1000);
            body.response_format = Some(ResponseFormat { kind: "json_object" });
            body
        }
        ModelKind::Generic => {
            let mut body = ChatRequest::user(&settings.model_id, format!("{}{}", PARAGRAPH_PROMPT, text));
            body.temperature = Some(0.7);
            body.max_tokens = Some(2000);
            body
        }
    };
    Ok(PreparedRequest {
        endpoint: chat_endpoint(&settings.endpoint_base_url),
        credential: settings.credential.trim().to_string(),
        model_kind,
        expects_entry: model_kind == ModelKind::Generic && kind.is_word(),
        body,
    })
}

/// The smallest request that proves endpoint, credential and model work.
pub fn build_probe(settings: &Settings) -> Result<PreparedRequest> {
    require_config(settings)?;
    let model_kind = model_kind(&settings.model_id);
    let mut body = ChatRequest::user(&settings.model_id, "Hello".to_string());
    match model_kind {
        ModelKind::DedicatedTranslation => {
            body.translation_options = Some(LanguagePair::EN_TO_ZH.into());
        }
        ModelKind::Generic => body.max_tokens = Some(5),
    }
    Ok(PreparedRequest {
        endpoint: chat_endpoint(&settings.endpoint_base_url),
        credential: settings.credential.trim().to_string(),
        model_kind,
        expects_entry: false,
        body,
    })
}
