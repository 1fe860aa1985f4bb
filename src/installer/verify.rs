//! Credential verification against the server's login endpoint.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Login endpoint path on the server.
pub const LOGIN_PATH: &str = "/rvl/login";

const TIMEOUT: Duration = Duration::from_secs(30);

/// Why the server refused (or never answered) the login.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("500 Internal Server Error.")]
    ServerError,

    #[error("Incorrect username/password.")]
    BadCredentials,

    #[error("Login failure, status code: {0}")]
    LoginFailed(u16),

    #[error("Could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },
}

/// Map a login response status to the verification outcome.
pub fn classify_status(status: u16) -> Result<(), VerifyError> {
    match status {
        200..=299 => Ok(()),
        500 => Err(VerifyError::ServerError),
        403 => Err(VerifyError::BadCredentials),
        other => Err(VerifyError::LoginFailed(other)),
    }
}

#[derive(Serialize)]
struct Login<'a> {
    name: &'a str,
    password: &'a str,
}

/// Posts credentials to `<base_url>/rvl/login`.
pub struct Verifier {
    base_url: String,
    agent: ureq::Agent,
}

impl Verifier {
    /// Verifier for a server reached over HTTPS by hostname or IP.
    pub fn for_server(address: &str) -> Self {
        Self::with_base_url(format!("https://{}", address))
    }

    /// Verifier against an explicit base URL (scheme and authority).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(TIMEOUT).build(),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, LOGIN_PATH)
    }

    /// Submit `username`/`password` once. No retries.
    pub fn verify(&self, username: &str, password: &str) -> Result<(), VerifyError> {
        let url = self.login_url();
        tracing::debug!(url = %url, "verifying credentials");

        let result = self
            .agent
            .post(&url)
            .send_json(Login {
                name: username,
                password,
            });

        match result {
            Ok(response) => classify_status(response.status()),
            Err(ureq::Error::Status(status, _)) => classify_status(status),
            Err(ureq::Error::Transport(transport)) => Err(VerifyError::Unreachable {
                url,
                reason: transport.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve exactly one request with `status`, returning the request body.
    fn one_shot_server(status: u16) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header.trim().is_empty() {
                    break;
                }
                let lower = header.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            )
            .unwrap();
            tx.send(format!("{}{}", request_line.trim(), String::from_utf8(body).unwrap()))
                .unwrap();
        });

        (base, rx)
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200), Ok(()));
        assert_eq!(classify_status(500), Err(VerifyError::ServerError));
        assert_eq!(classify_status(403), Err(VerifyError::BadCredentials));
        assert_eq!(classify_status(404), Err(VerifyError::LoginFailed(404)));
    }

    #[test]
    fn test_messages() {
        assert_eq!(VerifyError::ServerError.to_string(), "500 Internal Server Error.");
        assert_eq!(VerifyError::BadCredentials.to_string(), "Incorrect username/password.");
        assert_eq!(
            VerifyError::LoginFailed(401).to_string(),
            "Login failure, status code: 401"
        );
    }

    #[test]
    fn test_login_url() {
        assert_eq!(
            Verifier::for_server("tp.example.com").login_url(),
            "https://tp.example.com/rvl/login"
        );
    }

    #[test]
    fn test_successful_login_posts_json() {
        let (base, rx) = one_shot_server(200);

        Verifier::with_base_url(base).verify("admin", "secret").unwrap();

        let request = rx.recv().unwrap();
        assert!(request.starts_with("POST /rvl/login HTTP/1.1"));
        assert!(request.ends_with(r#"{"name":"admin","password":"secret"}"#));
    }

    #[test]
    fn test_forbidden_maps_to_bad_credentials() {
        let (base, _rx) = one_shot_server(403);
        let err = Verifier::with_base_url(base).verify("admin", "wrong").unwrap_err();
        assert_eq!(err, VerifyError::BadCredentials);
    }

    #[test]
    fn test_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = Verifier::with_base_url(base).verify("a", "b").unwrap_err();
        assert!(matches!(err, VerifyError::Unreachable { .. }));
    }
}
