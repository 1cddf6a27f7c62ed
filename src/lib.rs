//! Select text, press a key, read the translation.
//!
//! The overlay side ([`controller`]) decides what to show; the network side
//! ([`background`], [`client`]) talks to an OpenAI-compatible
//! chat-completions endpoint. They meet only through [`protocol`] messages.

pub mod background;
pub mod classify;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod overlay;
pub mod protocol;
pub mod request;
pub mod response;
pub mod selection;
pub mod settings_form;

pub use error::{Result, TranslateError};
