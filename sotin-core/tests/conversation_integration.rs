//! End-to-end conversation tests: controller + HTTP gateway + exports.
//!
//! The backend is a wiremock server, so these run without any external service.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sotin_core::export::text::{outline, TurnOutline};
use sotin_core::{
    ControllerState, ConversationController, ExportCapabilities, ExportConfig, ExportError,
    ExportFormat, ExportPipeline, GatewayConfig, GatewayError, HttpGateway, Role,
    SequentialIdGenerator, SessionStore, SotinError,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn controller_for(server: &MockServer, timeout: Duration) -> Arc<ConversationController> {
    let gateway = HttpGateway::new(GatewayConfig::new(format!("{}/chat", server.uri()), timeout))
        .expect("Failed to create gateway");
    let store = SessionStore::new("vk", Arc::new(SequentialIdGenerator::new("session")));
    Arc::new(ConversationController::new(store, Arc::new(gateway)))
}

// ===========================================================================
// TEST 1: capital of France, one citation without snippet
// ===========================================================================
#[tokio::test]
async fn test_paris_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({
            "user_id": "vk",
            "session_id": "session-0",
            "message": "What is the capital of France?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "final_answer": "Paris",
            "citations": [{ "title": "Wiki", "url": "https://en.wikipedia.org/wiki/Paris" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::from_secs(5));
    controller
        .submit("What is the capital of France?")
        .await
        .expect("submit should settle");

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.turns.len(), 2);
    assert_eq!(snapshot.turns[0].role, Role::User);

    let assistant = &snapshot.turns[1];
    assert_eq!(assistant.content, "Paris");
    assert_eq!(assistant.citations.len(), 1);
    let citation = &assistant.citations[0];
    assert_eq!(citation.title.as_deref(), Some("Wiki"));
    assert_eq!(
        citation.url.as_deref(),
        Some("https://en.wikipedia.org/wiki/Paris")
    );
    assert!(citation.snippet.is_none(), "snippet must be absent, not empty");
}

// ===========================================================================
// TEST 2: backend too slow -> empty assistant turn + timeout signal
// ===========================================================================
#[tokio::test]
async fn test_timeout_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "final_answer": "too late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::from_millis(200));
    let result = controller.submit("Summarize today's top AI stories.").await;

    assert!(
        matches!(result, Err(SotinError::Gateway(GatewayError::Timeout(_)))),
        "Expected timeout, got {:?}",
        result
    );
    assert_eq!(controller.state(), ControllerState::Idle);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.turns.len(), 2);
    assert_eq!(snapshot.turns[1].content, "");
    assert!(snapshot.turns[1].citations.is_empty());
}

// ===========================================================================
// TEST 3: no document capability -> PDF refused, Markdown still works
// ===========================================================================
#[tokio::test]
async fn test_document_capability_absent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "final_answer": "hi" })))
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::from_secs(5));
    controller.submit("hello").await.unwrap();
    let snapshot = controller.snapshot();

    let pipeline = ExportPipeline::new(ExportCapabilities::text_only(), &ExportConfig::default());
    assert!(matches!(
        pipeline.export(ExportFormat::Pdf, &snapshot),
        Err(ExportError::CapabilityUnavailable(ExportFormat::Pdf))
    ));

    let markdown = pipeline.render_markdown(&snapshot);
    assert!(markdown.contains("User:\n> hello\n"));
    assert!(markdown.contains("Assistant:\n> hi\n"));
}

// ===========================================================================
// TEST 4: second submit while awaiting -> RequestInProgress, session untouched
// ===========================================================================
#[tokio::test]
async fn test_concurrent_submit_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "final_answer": "done" }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::from_secs(5));
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("first").await })
    };

    // Wait until the first cycle owns the controller.
    while controller.state() != ControllerState::AwaitingResponse {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second = controller.submit("second").await;
    assert!(matches!(second, Err(SotinError::RequestInProgress)));
    assert!(controller.snapshot().is_empty());

    first.await.unwrap().expect("first submit should settle");
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.turns.len(), 2);
    assert_eq!(snapshot.turns[0].content, "first");
    assert_eq!(snapshot.turns[1].content, "done");
}

// ===========================================================================
// TEST 5: transcript re-parse recovers roles and citation counts
// ===========================================================================
#[tokio::test]
async fn test_transcript_round_trip_and_idempotence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "message": "headlines" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "final_answer": "Three stories today.",
            "citations": [
                { "title": "Reuters", "url": "https://reuters.com/a", "snippet": "Markets rose." },
                { "url": "https://bbc.co.uk/b" },
                { "title": "", "url": " ", "snippet": null }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "message": "broken" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::from_secs(5));
    controller.submit("headlines").await.unwrap();
    assert!(controller.submit("broken").await.is_err());

    let snapshot = controller.snapshot();
    let pipeline = ExportPipeline::new(ExportCapabilities::probe(), &ExportConfig::default());

    let first = pipeline.render_markdown(&snapshot);
    let second = pipeline.render_markdown(&snapshot);
    assert_eq!(first, second, "Markdown export must be byte-identical");

    assert_eq!(
        outline(&first),
        vec![
            TurnOutline { role: Role::User, citations: 0 },
            TurnOutline { role: Role::Assistant, citations: 3 },
            TurnOutline { role: Role::User, citations: 0 },
            TurnOutline { role: Role::Assistant, citations: 0 },
        ]
    );
    assert!(first.contains("  3. (no details)\n"), "blank citation keeps its slot");

    if pipeline.capabilities().document {
        let pdf_a = pipeline.render_pdf(&snapshot).unwrap();
        let pdf_b = pipeline.render_pdf(&snapshot).unwrap();
        assert_eq!(pdf_a, pdf_b);
    }
}

// ===========================================================================
// TEST 6: reset starts a new session id and the backend sees it
// ===========================================================================
#[tokio::test]
async fn test_reset_sends_new_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "session_id": "session-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "final_answer": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "session_id": "session-0" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "final_answer": "old" })))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller_for(&server, Duration::from_secs(5));
    controller.submit("one").await.unwrap();
    assert_eq!(controller.reset().unwrap(), "session-1");

    let exchange = controller.submit("two").await.unwrap();
    assert_eq!(exchange.user.sequence_index, 0, "numbering restarts after reset");
    assert_eq!(exchange.assistant.content, "fresh");
    assert_eq!(controller.snapshot().turns.len(), 2);
}
