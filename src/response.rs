use log::warn;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TranslateError};

/// Models often send `null` for fields they have nothing for; read it as empty.
fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Example {
    Pair {
        #[serde(default, deserialize_with = "null_as_default")]
        en: String,
        #[serde(default, deserialize_with = "null_as_default")]
        zh: String,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Meaning {
    #[serde(deserialize_with = "null_as_default")]
    pub pos: String,
    #[serde(deserialize_with = "null_as_default")]
    pub definitions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub meanings: Vec<Meaning>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

fn api_error(status: StatusCode, body: &[u8]) -> TranslateError {
    let provider = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty());
    let detail = provider.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_u16().to_string())
    });
    TranslateError::Api {
        message: format!("API request failed: {}", detail),
        status: Some(status.as_u16()),
    }
}

fn parse_choices(body: &[u8]) -> Result<Vec<Choice>> {
    let parsed: ChatResponse = serde_json::from_slice(body)
        .map_err(|_| TranslateError::Format("API returned malformed data".into()))?;
    if parsed.choices.is_empty() {
        return Err(TranslateError::Format("API returned malformed data".into()));
    }
    Ok(parsed.choices)
}

/// Validates a chat-completion response and returns the first choice's content.
pub fn interpret(status: StatusCode, body: &[u8]) -> Result<String> {
    if !status.is_success() {
        return Err(api_error(status, body));
    }
    parse_choices(body)?
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| TranslateError::Format("API returned no content".into()))
}

/// Connection test: success only needs a non-empty `choices` list.
pub fn interpret_probe(status: StatusCode, body: &[u8]) -> Result<()> {
    if !status.is_success() {
        return Err(api_error(status, body));
    }
    parse_choices(body)
        .map(|_| ())
        .map_err(|_| TranslateError::Format("Unexpected response format".into()))
}

/// Finds the first balanced `{ ... }` in `text`, skipping braces inside JSON strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort read of a dictionary entry out of free-form model output.
/// `None` means "show it as plain text", never an error.
pub fn parse_dictionary(content: &str) -> Option<DictionaryEntry> {
    let candidate = extract_json_object(content)?;
    match serde_json::from_str::<DictionaryEntry>(candidate) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Dictionary JSON parse failed, falling back to text: {}", e);
            None
        }
    }
}
