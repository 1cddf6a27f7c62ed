use crate::config::{Settings, DEFAULT_MODEL};
use crate::error::TranslateError;

/// Trigger keys offered by the settings window.
pub const TRIGGER_KEYS: [&str; 4] = ["Control", "Alt", "Shift", "Meta"];

/// Editable copy of the settings, as shown in the settings window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsForm {
    pub endpoint_base_url: String,
    pub credential: String,
    pub model_id: String,
    pub trigger_key: String,
    pub show_credential: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
}

impl SettingsForm {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            endpoint_base_url: s.endpoint_base_url.clone(),
            credential: s.credential.clone(),
            model_id: s.model_id.clone(),
            trigger_key: s.trigger_key.clone(),
            show_credential: false,
        }
    }

    /// Values as they would be saved: trimmed, with a blank model falling back to the default.
    pub fn to_settings(&self) -> Settings {
        let model = self.model_id.trim();
        Settings {
            endpoint_base_url: self.endpoint_base_url.trim().to_string(),
            credential: self.credential.trim().to_string(),
            model_id: if model.is_empty() { DEFAULT_MODEL } else { model }.to_string(),
            trigger_key: self.trigger_key.clone(),
        }
    }

    /// Settings for the connection test, or the message to show instead.
    pub fn probe_settings(&self) -> Result<Settings, String> {
        let s = self.to_settings();
        if s.endpoint_base_url.is_empty() {
            return Err("Please enter the API base URL".into());
        }
        if s.credential.is_empty() {
            return Err("Please enter the API key".into());
        }
        Ok(s)
    }
}

impl TestOutcome {
    pub fn from_result(res: Result<String, TranslateError>) -> Self {
        match res {
            Ok(message) => Self { success: true, message },
            Err(e) => Self { success: false, message: e.to_string() },
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}
