use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use unmask_client::{ClientConfig, GradioClient, MaskPredictor, SpaceRef, UnmaskError};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    body: String,
}

type Route = fn(&str, &str, u16) -> (u16, String);

/// Serves every connection on a loopback port with `route` and records each request.
fn serve(route: Route) -> (u16, Arc<Mutex<Vec<Recorded>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(s) => s,
                Err(_) => break,
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut content_length = 0;
            let mut authorization = None;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    match name.to_ascii_lowercase().as_str() {
                        "content-length" => content_length = value.trim().parse().unwrap(),
                        "authorization" => authorization = Some(value.trim().to_string()),
                        _ => {}
                    }
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            let body = String::from_utf8(body).unwrap();

            let (status, payload) = route(&method, &path, port);
            seen.lock().unwrap().push(Recorded {
                method,
                path,
                authorization,
                body,
            });

            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                payload.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });

    (port, log)
}

fn prediction_json() -> String {
    r#"{"label": "Ukraine", "confidences": [{"label": "Kyiv", "confidence": 0.2}, {"label": "Ukraine", "confidence": 0.7}]}"#.to_string()
}

fn file_route(method: &str, path: &str, port: u16) -> (u16, String) {
    match (method, path) {
        ("GET", "/api/spaces/owner/unmask/host") => {
            (200, format!(r#"{{"subdomain": "owner-unmask", "host": "http://127.0.0.1:{port}/"}}"#))
        }
        ("POST", "/call/predict") => (200, r#"{"event_id": "ev42"}"#.to_string()),
        ("GET", "/call/predict/ev42") => (
            200,
            format!(
                "event: heartbeat\ndata: null\n\nevent: complete\ndata: [{{\"path\": \"/tmp/gradio/out.json\", \"url\": \"http://127.0.0.1:{port}/file=/tmp/gradio/out.json\"}}]\n\n"
            ),
        ),
        ("GET", "/file=/tmp/gradio/out.json") => (200, prediction_json()),
        _ => (404, "not found".to_string()),
    }
}

#[test]
fn resolves_space_and_follows_file_reference() -> anyhow::Result<()> {
    let (port, log) = serve(file_route);

    let mut config = ClientConfig::new(
        "owner/unmask".parse::<SpaceRef>()?,
        Some("hf_test_token".to_string()),
    );
    config.hub_api = format!("http://127.0.0.1:{port}/api/spaces");

    let client = GradioClient::connect(config)?;
    assert_eq!(client.host(), format!("http://127.0.0.1:{port}"));

    let prediction = client.predict("Russian forces attacked [MASK] last night.")?;
    assert_eq!(prediction.label, "Ukraine");
    assert_eq!(prediction.confidences.get("Kyiv"), Some(0.2));

    let log = log.lock().unwrap();
    let paths: Vec<&str> = log.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "/api/spaces/owner/unmask/host",
            "/call/predict",
            "/call/predict/ev42",
            "/file=/tmp/gradio/out.json"
        ]
    );
    assert!(log
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer hf_test_token")));

    let call = &log[1];
    assert_eq!(call.method, "POST");
    let sent: serde_json::Value = serde_json::from_str(&call.body)?;
    assert_eq!(
        sent,
        serde_json::json!({"data": ["Russian forces attacked [MASK] last night."]})
    );
    Ok(())
}

fn inline_route(method: &str, path: &str, _port: u16) -> (u16, String) {
    match (method, path) {
        ("POST", "/call/unmask") => (200, r#"{"event_id": "e1"}"#.to_string()),
        ("GET", "/call/unmask/e1") => (200, format!("event: complete\ndata: [{}]\n\n", prediction_json())),
        _ => (404, "not found".to_string()),
    }
}

#[test]
fn accepts_inline_prediction_without_token() -> anyhow::Result<()> {
    let (port, log) = serve(inline_route);

    let mut config = ClientConfig::new(format!("http://127.0.0.1:{port}").parse()?, None);
    config.api_name = "unmask".to_string();

    let client = GradioClient::connect(config)?;
    let prediction = client.predict("The peace treaty was signed in [MASK].")?;

    assert_eq!(prediction.label, "Ukraine");
    assert_eq!(prediction.confidences.len(), 2);
    assert!(log.lock().unwrap().iter().all(|r| r.authorization.is_none()));
    Ok(())
}

fn failing_route(method: &str, path: &str, _port: u16) -> (u16, String) {
    match (method, path) {
        ("POST", "/call/predict") => (200, r#"{"event_id": "bad"}"#.to_string()),
        ("GET", "/call/predict/bad") => (200, "event: error\ndata: null\n\n".to_string()),
        _ => (401, "Invalid credentials".to_string()),
    }
}

#[test]
fn surfaces_remote_and_http_failures() -> anyhow::Result<()> {
    let (port, _log) = serve(failing_route);

    let client = GradioClient::connect(ClientConfig::new(
        format!("http://127.0.0.1:{port}").parse()?,
        None,
    ))?;
    assert!(matches!(
        client.predict("Negotiations took place in [MASK] last week."),
        Err(UnmaskError::Remote(_))
    ));

    let mut config = ClientConfig::new("owner/private".parse()?, None);
    config.hub_api = format!("http://127.0.0.1:{port}/api/spaces");
    match GradioClient::connect(config) {
        Err(UnmaskError::Status { status, body, .. }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "Invalid credentials");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connect should fail"),
    }
    Ok(())
}
