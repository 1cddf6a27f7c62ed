use std::sync::Arc;

use serde_json::json;
use smart_translate::classify::TextKind;
use smart_translate::client::Translator;
use smart_translate::config::{Settings, SettingsStore};
use smart_translate::protocol::ReplyData;
use smart_translate::TranslateError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

fn translator_for(server: &MockServer, model: &str) -> Translator {
    let store = Arc::new(SettingsStore::in_memory());
    store
        .set(&Settings {
            endpoint_base_url: format!("{}/v1/", server.uri()),
            credential: "sk-test".into(),
            model_id: model.into(),
            ..Settings::default()
        })
        .unwrap();
    Translator::new(store)
}

#[tokio::test]
async fn paragraph_translation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 2000})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  你好，世界  ")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = translator_for(&server, "gpt-4o-mini")
        .translate("hello world", TextKind::Paragraph)
        .await
        .unwrap();
    assert_eq!(reply.data, ReplyData::Text("你好，世界".into()));
    assert!(!reply.is_translation_model);
}

#[tokio::test]
async fn word_mode_reads_embedded_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"prefix {"word":"cat","meanings":[]} suffix"#)),
        )
        .mount(&server)
        .await;

    let reply = translator_for(&server, "gpt-4o-mini")
        .translate("cat", TextKind::Word)
        .await
        .unwrap();
    match reply.data {
        ReplyData::Entry(entry) => assert_eq!(entry.word, "cat"),
        other => panic!("expected entry, got {other:?}"),
    }
}

#[tokio::test]
async fn word_mode_falls_back_to_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("not json at all")))
        .mount(&server)
        .await;

    let reply = translator_for(&server, "gpt-4o-mini")
        .translate("cat", TextKind::Word)
        .await
        .unwrap();
    assert_eq!(reply.data, ReplyData::Text("not json at all".into()));
}

#[tokio::test]
async fn dedicated_model_is_always_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "translation_options": {"source_lang": "auto", "target_lang": "Chinese"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"word":"猫"}"#)))
        .mount(&server)
        .await;

    let reply = translator_for(&server, "Qwen-MT-Plus")
        .translate("cat", TextKind::Word)
        .await
        .unwrap();
    assert!(reply.is_translation_model);
    assert_eq!(reply.data, ReplyData::Text(r#"{"word":"猫"}"#.into()));
}

#[tokio::test]
async fn provider_error_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})))
        .mount(&server)
        .await;

    let err = translator_for(&server, "gpt-4")
        .translate("hello world", TextKind::Paragraph)
        .await
        .unwrap_err();
    match err {
        TranslateError::Api { message, status } => {
            assert!(message.contains("bad key"));
            assert_eq!(status, Some(401));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_format_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = translator_for(&server, "gpt-4")
        .translate("hello world", TextKind::Paragraph)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::Format(_)));
}

#[tokio::test]
async fn missing_settings_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SettingsStore::in_memory());
    store
        .set(&Settings {
            endpoint_base_url: server.uri(),
            credential: String::new(),
            ..Settings::default()
        })
        .unwrap();
    let err = Translator::new(store)
        .translate("hello", TextKind::Word)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::Config(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let store = Arc::new(SettingsStore::in_memory());
    store
        .set(&Settings {
            // Port 9 (discard) on localhost is expected to refuse connections.
            endpoint_base_url: "http://127.0.0.1:9".into(),
            credential: "sk-test".into(),
            ..Settings::default()
        })
        .unwrap();
    let err = Translator::new(store)
        .translate("hello world", TextKind::Paragraph)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::Api { status: None, .. }));
    assert!(err.to_string().starts_with("Network error"));
}

#[tokio::test]
async fn connection_test() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"max_tokens": 5, "messages": [{"role": "user", "content": "Hello"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi")))
        .mount(&server)
        .await;

    let translator = Translator::new(Arc::new(SettingsStore::in_memory()));
    let settings = Settings {
        endpoint_base_url: server.uri(),
        credential: "sk-test".into(),
        model_id: "gpt-4".into(),
        ..Settings::default()
    };
    assert_eq!(
        translator.test_connection(&settings).await.unwrap(),
        "Connection succeeded!"
    );

    let blank = Settings::default();
    assert!(matches!(
        translator.test_connection(&blank).await,
        Err(TranslateError::Config(_))
    ));
}

#[tokio::test]
async fn connection_test_reports_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {"message": "no access"}})))
        .mount(&server)
        .await;

    let translator = Translator::new(Arc::new(SettingsStore::in_memory()));
    let settings = Settings {
        endpoint_base_url: server.uri(),
        credential: "sk-test".into(),
        ..Settings::default()
    };
    let err = translator.test_connection(&settings).await.unwrap_err();
    assert_eq!(err.to_string(), "Connection failed: no access");
}
