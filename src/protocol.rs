//! Messages exchanged between the overlay and the network worker.

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::response::DictionaryEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundRequest {
    #[serde(rename_all = "camelCase")]
    Translate { text: String, is_word_mode: bool },
    TestConnection { settings: Settings },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyData {
    Entry(DictionaryEntry),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateReply {
    pub data: ReplyData,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_translation_model: bool,
}
