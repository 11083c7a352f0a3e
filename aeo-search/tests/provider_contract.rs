//! Provider contract tests.
//!
//! Each answer engine and the SerpAPI client is pointed at a wiremock
//! server. These verify:
//! - request shape (path, auth, key body fields)
//! - response mapping onto `ProviderPayload`
//! - non-success statuses become `SearchError::Provider` with a bounded body
//! - the full measure → normalise → score path over live HTTP

use std::collections::BTreeMap;

use aeo_search::engines::{GeminiEngine, OpenAiEngine, PerplexityEngine};
use aeo_search::http::ERROR_BODY_LIMIT;
use aeo_search::{
    AnswerEngine, Provider, ProviderPayload, RawCitation, SearchConfig, SearchError,
    SerpApiClient, MISSING_CREDENTIAL,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SearchConfig {
    let mut config = SearchConfig::default();
    for provider in Provider::all() {
        config.provider_mut(*provider).base_url = server.uri();
        config.provider_mut(*provider).timeout_seconds = 5;
    }
    config.serpapi.base_url = server.uri();
    config
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gemini_sends_grounded_search_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(json!({
            "tools": [{"google_search": {}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "The Acme kettle "}, {"text": "is sold widely."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://shop.com/acme", "title": "shop.com"}},
                    {"web": {"uri": "https://other.com/acme", "title": "other.com"}}
                ]}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = GeminiEngine::new(&config_for(&server), "gemini-key").expect("engine");
    let payload = engine.query("Acme Kettle Acme").await.expect("query");

    assert_eq!(
        payload,
        ProviderPayload::Structured {
            answer: "The Acme kettle is sold widely.".into(),
            citations: vec![
                RawCitation::titled("https://shop.com/acme", "shop.com"),
                RawCitation::titled("https://other.com/acme", "other.com"),
            ],
        }
    );
}

#[tokio::test]
async fn gemini_empty_candidates_is_no_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let engine = GeminiEngine::new(&config_for(&server), "k").expect("engine");
    let err = engine.query("x").await.unwrap_err();
    assert!(matches!(err, SearchError::Provider(ref m) if m == "No response"));
}

// ────────────────────────────────────────────────────────────────────────────
// Perplexity
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn perplexity_uses_bearer_auth_and_requests_citations() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer pplx-key"))
        .and(body_partial_json(json!({"model": "sonar", "return_citations": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "See https://shop.com/acme."}}],
            "citations": ["https://shop.com/acme", {"url": "https://b.com", "title": "B"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = PerplexityEngine::new(&config_for(&server), "pplx-key").expect("engine");
    let payload = engine.query("Acme Kettle").await.expect("query");

    match payload {
        ProviderPayload::Structured { answer, citations } => {
            assert_eq!(answer, "See https://shop.com/acme.");
            assert_eq!(citations.len(), 2);
            assert_eq!(citations[1], RawCitation::titled("https://b.com", "B"));
        }
        other => panic!("expected structured payload, got {other:?}"),
    }
}

#[tokio::test]
async fn perplexity_error_status_is_provider_error_with_truncated_body() {
    let server = MockServer::start().await;
    let long_body = "x".repeat(ERROR_BODY_LIMIT * 2);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(long_body))
        .mount(&server)
        .await;

    let engine = PerplexityEngine::new(&config_for(&server), "k").expect("engine");
    let err = engine.query("x").await.unwrap_err();

    let SearchError::Provider(message) = err else {
        panic!("expected provider error");
    };
    assert!(message.starts_with("perplexity HTTP 429: "));
    assert_eq!(
        message.len(),
        "perplexity HTTP 429: ".len() + ERROR_BODY_LIMIT
    );
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_returns_free_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Try https://a.com"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = OpenAiEngine::new(&config_for(&server), "sk-test").expect("engine");
    let payload = engine.query("Acme").await.expect("query");
    assert_eq!(
        payload,
        ProviderPayload::FreeText {
            answer: "Try https://a.com".into()
        }
    );
}

#[tokio::test]
async fn openai_invalid_json_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let engine = OpenAiEngine::new(&config_for(&server), "k").expect("engine");
    let err = engine.query("x").await.unwrap_err();
    assert!(matches!(err, SearchError::Parse(_)));
}

// ────────────────────────────────────────────────────────────────────────────
// SerpAPI
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn serpapi_sends_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Acme Kettle Acme"))
        .and(query_param("api_key", "serp-key"))
        .and(query_param("engine", "google"))
        .and(query_param("num", "10"))
        .and(query_param("hl", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic_results": [
                {"position": 1, "title": "Acme Kettle", "link": "https://shop.com/acme", "snippet": "Buy"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SerpApiClient::new(&config_for(&server).serpapi, "serp-key").expect("client");
    let results = client.search("Acme Kettle Acme").await.expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].link, "https://shop.com/acme");
}

#[tokio::test]
async fn serpapi_error_status_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let client = SerpApiClient::new(&config_for(&server).serpapi, "bad").expect("client");
    let err = client.search("x").await.unwrap_err();
    assert!(err.to_string().contains("serpapi HTTP 401: Invalid API key"));
}

// ────────────────────────────────────────────────────────────────────────────
// End to end over HTTP
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn measure_presence_isolates_failing_provider() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Found it."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://shop.com/acme", "title": "Acme"}}
                ]}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let mut keys = BTreeMap::new();
    keys.insert(Provider::Gemini, "g".to_string());
    keys.insert(Provider::Perplexity, "p".to_string());

    let reports = aeo_search::measure_presence("Acme", "shop.com", &config_for(&server), &keys)
        .await
        .expect("measure");

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[&Provider::Gemini].score.score, 100);
    assert!(reports[&Provider::Gemini].error.is_none());

    let perplexity = &reports[&Provider::Perplexity];
    assert_eq!(perplexity.score.score, 0);
    assert!(perplexity.citations.is_empty());
    assert!(perplexity
        .error
        .as_deref()
        .is_some_and(|e| e.contains("perplexity HTTP 500")));

    assert_eq!(
        reports[&Provider::OpenAi].error.as_deref(),
        Some(MISSING_CREDENTIAL)
    );
}
