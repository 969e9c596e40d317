//! HTTP client tests against a local one-route server.
//!
//! The server speaks just enough HTTP/1.1 to answer `POST /v1/chat/completions`
//! with a canned status and body, and records every request it sees.

use medclare::{
    AnalysisConfig, Analyzer, ChatBackend, ChatError, ChatMessage, CompletionOptions,
    HttpChatClient,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

async fn serve(status: u16, body: &'static str) -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut socket).await;
            seen.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    CannedServer {
        base_url: format!("http://{addr}/v1"),
        requests,
    }
}

/// Like [`serve`], but the first `stalled` connections read the request and
/// then never answer.
async fn serve_after_stall(stalled: usize, body: &'static str) -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    tokio::spawn(async move {
        let mut accepted = 0usize;
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            accepted += 1;
            let request = read_request(&mut socket).await;
            seen.lock().unwrap().push(request);

            if accepted <= stalled {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(socket);
                });
                continue;
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    CannedServer {
        base_url: format!("http://{addr}/v1"),
        requests,
    }
}

/// Read headers plus a `Content-Length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn config(base_url: &str) -> AnalysisConfig {
    AnalysisConfig::builder()
        .api_key("sk-test-123")
        .base_url(base_url)
        .models(["test/model-a", "test/model-b"])
        .api_timeout_secs(5)
        .build()
        .unwrap()
}

#[tokio::test]
async fn successful_completion_returns_content() {
    let server = serve(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"Hello from the model"}}]}"#,
    )
    .await;
    let client = HttpChatClient::new(&config(&server.base_url)).unwrap();

    let content = client
        .complete(
            "test/model-a",
            &[ChatMessage::user("Explain my report")],
            &CompletionOptions {
                temperature: Some(0.2),
                max_tokens: Some(64),
            },
        )
        .await
        .unwrap();
    assert_eq!(content, "Hello from the model");

    let requests = server.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert!(req.starts_with("POST /v1/chat/completions "));
    assert!(req
        .to_ascii_lowercase()
        .contains("authorization: bearer sk-test-123"));
    assert!(req.contains(r#""model":"test/model-a""#));
    assert!(req.contains("Explain my report"));
    assert!(req.contains(r#""max_tokens":64"#));
}

#[tokio::test]
async fn server_error_becomes_status() {
    let server = serve(500, r#"{"error":{"message":"upstream exploded"}}"#).await;
    let client = HttpChatClient::new(&config(&server.base_url)).unwrap();

    let err = client
        .complete("test/model-a", &[ChatMessage::user("hi")], &CompletionOptions::default())
        .await
        .unwrap_err();
    match err {
        ChatError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_content_is_empty() {
    let server = serve(200, r#"{"choices":[{"message":{"role":"assistant"}}]}"#).await;
    let client = HttpChatClient::new(&config(&server.base_url)).unwrap();

    let err = client
        .complete("test/model-a", &[ChatMessage::user("hi")], &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyContent));
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    // Bind then drop, so the port is very likely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpChatClient::new(&config(&format!("http://{addr}/v1"))).unwrap();
    let err = client
        .complete("test/model-a", &[ChatMessage::user("hi")], &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Transport(_)));
}

#[tokio::test]
async fn translate_against_failing_server_returns_english() {
    let server = serve(503, "Service Unavailable").await;
    let analyzer = Analyzer::from_config(config(&server.base_url)).unwrap();

    let english = "Your results are normal.\n\n### Key Recommendations\n\n- Keep it up.\n";
    let out = analyzer
        .translate(english, "Glucose 90 mg/dL", "Spanish")
        .await
        .unwrap();
    assert_eq!(out, english);
    // Both candidates were tried.
    assert_eq!(server.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn silent_server_times_out() {
    let server = serve_after_stall(usize::MAX, "{}").await;
    let config = AnalysisConfig::builder()
        .api_key("sk-test-123")
        .base_url(&server.base_url)
        .models(["test/model-a"])
        .api_timeout_secs(1)
        .build()
        .unwrap();
    let client = HttpChatClient::new(&config).unwrap();

    let err = client
        .complete("test/model-a", &[ChatMessage::user("hi")], &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ChatError::Timeout { secs: 1 }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn timed_out_model_falls_through_to_next_candidate() {
    let server = serve_after_stall(
        1,
        r#"{"choices":[{"message":{"role":"assistant","content":"Sus resultados son normales."}}]}"#,
    )
    .await;
    let config = AnalysisConfig::builder()
        .api_key("sk-test-123")
        .base_url(&server.base_url)
        .models(["test/slow-model", "test/fast-model"])
        .api_timeout_secs(1)
        .build()
        .unwrap();
    let analyzer = Analyzer::from_config(config).unwrap();

    let out = analyzer
        .translate("Your results are normal.\n", "Glucose 90 mg/dL", "Spanish")
        .await
        .unwrap();
    assert_eq!(out, "Sus resultados son normales.\n");

    let requests = server.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains(r#""model":"test/slow-model""#));
    assert!(requests[1].contains(r#""model":"test/fast-model""#));
}
