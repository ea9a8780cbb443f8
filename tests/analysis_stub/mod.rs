use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

/// How the stub answers `/v1/responses`.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Well-formed metadata JSON derived from the request's label.
    Metadata,
    /// Syntactically broken model output.
    Malformed,
    /// HTTP 500 with an OpenAI-style error body.
    ServerError,
}

pub struct AnalysisStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AnalysisStub {
    pub fn spawn(behavior: StubBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start analysis stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/v1/responses" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                if let StubBehavior::ServerError = behavior {
                    let body = serde_json::json!({
                        "error": { "message": "stub exploded" }
                    });
                    let _ = request.respond(
                        tiny_http::Response::from_string(body.to_string()).with_status_code(500),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };
                let input = parsed
                    .get("input")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                let output_text = match behavior {
                    StubBehavior::Metadata => serde_json::json!({
                        "title": format!("Insights for {input}"),
                        "summary": "A concise overview.",
                        "keywords": ["alpha", "beta"],
                        "suggested_theme": "Modern"
                    })
                    .to_string(),
                    StubBehavior::Malformed => "{not valid json".to_string(),
                    StubBehavior::ServerError => unreachable!(),
                };

                let response_body = serde_json::json!({
                    "id": "resp_stub",
                    "object": "response",
                    "model": parsed.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
                    "output": [
                        {
                            "type": "message",
                            "role": "assistant",
                            "content": [
                                { "type": "output_text", "text": output_text }
                            ]
                        }
                    ],
                    "output_text": output_text
                });

                let mut response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(200);
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                response = response.with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for AnalysisStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
