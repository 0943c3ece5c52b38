use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use openai_compat_api::{
    ChatCompletionRequest, OpenAiCompatClient, OpenAiCompatConfig, OpenAiCompatError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

fn allow_local_integration() -> bool {
    std::env::var("OPENAI_COMPAT_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
enum ScriptedResponse {
    Respond {
        status: u16,
        delay_ms: u64,
        body: String,
    },
    Reset,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn respond(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        delay_ms: 0,
        body: body.to_string(),
    }
}

fn client_for(server: &ScriptedServer, max_retries: u32) -> OpenAiCompatClient {
    let config = OpenAiCompatConfig::new("llama2")
        .with_endpoint(&server.base_url)
        .with_max_retries(max_retries);
    OpenAiCompatClient::new(config).expect("client")
}

const STOP_BODY: &str = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"all done"},"finish_reason":"stop"}]}"#;

#[tokio::test]
async fn complete_integration_successful_stop() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(200, STOP_BODY)]).await;
    let client = client_for(&server, 0);

    let response = client
        .complete(&ChatCompletionRequest::new("llama2", "hi"), None)
        .await
        .expect("completion should succeed");

    let choice = response.first_choice().expect("one choice");
    assert!(choice.is_stop());
    assert_eq!(choice.message.content.as_deref(), Some("all done"));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn complete_integration_retryable_then_success() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        respond(503, r#"{"error":{"message":"overloaded"}}"#),
        respond(200, STOP_BODY),
    ])
    .await;
    let client = client_for(&server, 3);

    let response = timeout(
        Duration::from_secs(12),
        client.complete(&ChatCompletionRequest::new("llama2", "hi"), None),
    )
    .await
    .expect("retry path should be bounded")
    .expect("completion should eventually succeed");

    assert!(response.first_choice().is_some_and(|choice| choice.is_stop()));
    assert_eq!(server.request_count(), 2);

    server.shutdown();
}

#[tokio::test]
async fn complete_integration_non_retryable_status_fails_explicitly() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(
        400,
        r#"{"error":{"message":"invalid request"}}"#,
    )])
    .await;
    let client = client_for(&server, 3);

    let error = client
        .complete(&ChatCompletionRequest::new("llama2", "hi"), None)
        .await
        .expect_err("completion should fail");

    assert!(
        matches!(&error, OpenAiCompatError::Status(code, message) if code.as_u16() == 400 && message == "invalid request")
    );
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn complete_integration_cancellation_during_slow_response() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        delay_ms: 2_000,
        body: STOP_BODY.to_string(),
    }])
    .await;
    let client = Arc::new(client_for(&server, 0));

    let cancellation = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn({
        let client = Arc::clone(&client);
        let cancellation = Arc::clone(&cancellation);
        async move {
            client
                .complete(&ChatCompletionRequest::new("llama2", "hi"), Some(&cancellation))
                .await
        }
    });

    sleep(Duration::from_millis(120)).await;
    cancellation.store(true, Ordering::Release);

    let result = timeout(Duration::from_secs(1), task)
        .await
        .expect("cancelled task should resolve before the server responds")
        .expect("join handle should resolve")
        .expect_err("cancellation should abort the request");

    assert!(matches!(result, OpenAiCompatError::Cancelled));
    server.shutdown();
}

#[tokio::test]
async fn complete_integration_connection_reset_then_retry_exhausted() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse::Reset, ScriptedResponse::Reset]).await;
    let client = client_for(&server, 1);

    let error = timeout(
        Duration::from_secs(10),
        client.complete(&ChatCompletionRequest::new("llama2", "hi"), None),
    )
    .await
    .expect("retry path should resolve")
    .expect_err("connection reset should surface as failure");

    assert!(matches!(
        error,
        OpenAiCompatError::RetryExhausted { status: None, .. }
    ));
    assert!(server.request_count() >= 2);

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
) {
    if read_request_headers(&mut socket).await.is_err() {
        return;
    }

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| respond(500, r#"{"error":"unexpected request"}"#));

    match response {
        ScriptedResponse::Reset => {}
        ScriptedResponse::Respond {
            status,
            delay_ms,
            body,
        } => {
            if delay_ms > 0 {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            let payload = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                status_reason(status),
                body.len(),
            );

            let _ = socket.write_all(payload.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_request_headers(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            return Ok(());
        }
    }
}
