use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use refract_client::{Error, HttpTransport, Transport};

/// Accept one connection, read one request, answer with `status_line`.
/// Returns the raw request head and the body.
fn serve_once(status_line: &'static str) -> (String, thread::JoinHandle<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let handle = thread::spawn(move || handle_one(listener, status_line));
    (base, handle)
}

fn handle_one(listener: TcpListener, status_line: &str) -> (String, String) {
    let (mut stream, _) = listener.accept().expect("accept");

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).expect("read request");
        assert!(n > 0, "connection closed before headers arrived");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).expect("read body");
        assert!(n > 0, "connection closed before body arrived");
        body.extend_from_slice(&chunk[..n]);
    }

    let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
    stream.write_all(response.as_bytes()).expect("write response");
    (head, String::from_utf8_lossy(&body).to_string())
}

#[test]
fn status_201_is_success() {
    let (base, server) = serve_once("HTTP/1.1 201 Created");
    let transport = HttpTransport::new(&base).expect("transport");

    let line = "{\"device_id\":\"DEV1\",\"ts\":\"2023-11-14T22:13:20Z\",\"value\":1.3330,\"unit\":\"RI\",\"temperature_c\":25.00}";
    transport.deliver(line).expect("deliver");

    let (head, body) = server.join().expect("server thread");
    let head_lower = head.to_ascii_lowercase();
    assert!(head.starts_with("POST /api/v1/readings HTTP/1.1"), "{head}");
    assert!(head_lower.contains("content-type: application/json"), "{head}");
    assert_eq!(body, line);
}

#[test]
fn non_201_status_is_permanent_failure() {
    let (base, server) = serve_once("HTTP/1.1 200 OK");
    let transport = HttpTransport::new(&base).expect("transport");

    let err = transport.deliver("{}").expect_err("expected failure");
    assert!(!err.retryable, "{err}");
    server.join().expect("server thread");
}

#[test]
fn server_error_is_retryable_failure() {
    let (base, server) = serve_once("HTTP/1.1 503 Service Unavailable");
    let transport = HttpTransport::new(&base).expect("transport");

    let err = transport.deliver("{}").expect_err("expected failure");
    assert!(err.retryable, "{err}");
    server.join().expect("server thread");
}

#[test]
fn connection_refused_is_retryable_failure() {
    // Grab a port that nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let transport = HttpTransport::new(&base).expect("transport");
    let err = transport.deliver("{}").expect_err("expected failure");
    assert!(err.retryable, "{err}");
}

#[test]
fn endpoint_is_joined_onto_base_url() {
    let transport = HttpTransport::new("http://example.com:9000/").expect("transport");
    assert_eq!(
        transport.url().as_str(),
        "http://example.com:9000/api/v1/readings"
    );
}

#[test]
fn invalid_server_url_is_rejected() {
    assert!(matches!(
        HttpTransport::new("not a url"),
        Err(Error::Invalid(_))
    ));
}
