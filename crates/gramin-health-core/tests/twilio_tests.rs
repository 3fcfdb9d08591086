//! Twilio dispatcher tests against a local one-shot HTTP responder.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use gramin_health_core::alert::{AlertDispatcher, AlertError, TwilioConfig, TwilioDispatcher};

/// Read one HTTP request (headers plus Content-Length body).
fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve a single response, returning the API base and the captured request.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let api_base = format!("http://{}/2010-04-01", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        request
    });

    (api_base, handle)
}

fn config_for(api_base: String) -> TwilioConfig {
    TwilioConfig {
        account_sid: Some("AC123".into()),
        auth_token: Some("secret".into()),
        from_number: Some("+15550001111".into()),
        health_worker_phone: Some("+919123456789".into()),
        api_base,
    }
}

#[test]
fn test_created_response_is_ok() {
    let (api_base, server) = serve_once("HTTP/1.1 201 Created", r#"{"sid":"SM1","status":"queued"}"#);

    let dispatcher = TwilioDispatcher::new(&config_for(api_base)).unwrap();
    dispatcher
        .send("+919876543210", "High BP: 160/100")
        .unwrap();

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /2010-04-01/Accounts/AC123/Messages.json "));

    let lower = request.to_ascii_lowercase();
    // base64("AC123:secret")
    assert!(lower.contains("authorization: basic qumxmjm6c2vjcmv0"));
    assert!(request.contains("QUMxMjM6c2VjcmV0"));
    assert!(lower.contains("content-type: application/x-www-form-urlencoded"));

    let (_, form) = request.split_once("\r\n\r\n").unwrap();
    let fields: Vec<&str> = form.split('&').collect();
    assert!(fields.contains(&"To=%2B919123456789"));
    assert!(fields.contains(&"From=%2B15550001111"));
    assert!(fields.contains(&"Body=ALERT+from+%2B919876543210%3A+High+BP%3A+160%2F100"));
}

#[test]
fn test_rejected_request_is_status_error() {
    let (api_base, server) = serve_once(
        "HTTP/1.1 400 Bad Request",
        r#"{"code":21211,"message":"The 'To' number is not a valid phone number."}"#,
    );

    let dispatcher = TwilioDispatcher::new(&config_for(api_base)).unwrap();
    let err = dispatcher.send("+919876543210", "Low sugar: 50").unwrap_err();
    server.join().unwrap();

    match err {
        AlertError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("21211"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn test_refused_connection_is_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let api_base = format!("http://127.0.0.1:{}/2010-04-01", port);

    let dispatcher = TwilioDispatcher::new(&config_for(api_base)).unwrap();
    let err = dispatcher.send("+919876543210", "High BP: 160/100").unwrap_err();

    assert!(matches!(err, AlertError::Transport(_)));
}
