use crate::error::{Result, UpdaterError};
use crate::project::SmokeTestSpec;
use colored::Colorize;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("template-updater/", env!("CARGO_PKG_VERSION"));

/// A check run against a deployed preview. `Ok(false)` is a failed check;
/// `Err` means the check could not be carried out.
pub trait SmokeTest {
    fn name(&self) -> String;
    fn check(&self, url: &str) -> Result<bool>;
}

/// HTTP GET helper shared by the smoke tests. Preview environments often
/// serve self-signed certificates, so a TLS failure is retried once without
/// certificate verification.
#[derive(Clone)]
pub struct HttpProbe {
    verified: Client,
    unverified: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::build(timeout, true)
    }

    fn build(timeout: Duration, use_system_proxy: bool) -> Result<Self> {
        let client = |accept_invalid_certs: bool| {
            let mut builder = Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .danger_accept_invalid_certs(accept_invalid_certs);
            if !use_system_proxy {
                builder = builder.no_proxy();
            }
            builder.build()
        };

        Ok(Self {
            verified: client(false)?,
            unverified: client(true)?,
        })
    }

    pub fn get(&self, url: &str) -> Result<Response> {
        match self.verified.get(url).send() {
            Ok(response) => Ok(response),
            Err(err) if is_tls_error(&err) => {
                tracing::warn!(url, error = %err, "TLS verification failed, retrying without it");
                Ok(self.unverified.get(url).send()?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Looks for a TLS failure among the causes of `err`. The top-level message
/// is skipped because it echoes the request URL.
fn is_tls_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Appends `path` to the preview URL, keeping any path the URL already has.
fn join(base: &str, path: &str) -> Result<String> {
    if path == "/" {
        return Ok(base.to_string());
    }
    let mut url = Url::parse(base).map_err(|e| UpdaterError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    Ok(url.to_string())
}

/// Passes iff the preview answers 200 OK.
pub struct BasicSmokeTest {
    probe: HttpProbe,
}

impl BasicSmokeTest {
    pub fn new(probe: HttpProbe) -> Self {
        Self { probe }
    }
}

impl SmokeTest for BasicSmokeTest {
    fn name(&self) -> String {
        "basic smoke test".to_string()
    }

    fn check(&self, url: &str) -> Result<bool> {
        StatusSmokeTest::new(self.probe.clone(), "/", 200).check(url)
    }
}

/// Passes iff `<url><path>` answers with the expected status code.
pub struct StatusSmokeTest {
    probe: HttpProbe,
    path: String,
    expected_status: u16,
}

impl StatusSmokeTest {
    pub fn new(probe: HttpProbe, path: impl Into<String>, expected_status: u16) -> Self {
        Self {
            probe,
            path: path.into(),
            expected_status,
        }
    }
}

impl SmokeTest for StatusSmokeTest {
    fn name(&self) -> String {
        format!("status {} on {}", self.expected_status, self.path)
    }

    fn check(&self, url: &str) -> Result<bool> {
        let target = join(url, &self.path)?;
        let response = self.probe.get(&target)?;
        let code = response.status().as_u16();
        if code != self.expected_status {
            println!(
                "   {} Test failed on {} with code {}",
                "✗".red(),
                response.url(),
                code.to_string().red()
            );
            return Ok(false);
        }
        Ok(true)
    }
}

/// Passes iff `<url><path>` answers 200 with a body matching `pattern`.
pub struct BodySmokeTest {
    probe: HttpProbe,
    path: String,
    pattern: Regex,
}

impl BodySmokeTest {
    pub fn new(probe: HttpProbe, path: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            probe,
            path: path.into(),
            pattern: Regex::new(pattern)?,
        })
    }
}

impl SmokeTest for BodySmokeTest {
    fn name(&self) -> String {
        format!("body of {} matches /{}/", self.path, self.pattern)
    }

    fn check(&self, url: &str) -> Result<bool> {
        let target = join(url, &self.path)?;
        let response = self.probe.get(&target)?;
        let code = response.status().as_u16();
        let final_url = response.url().to_string();
        if code != 200 {
            println!(
                "   {} Test failed on {} with code {}",
                "✗".red(),
                final_url,
                code.to_string().red()
            );
            return Ok(false);
        }

        let body = response.text()?;
        if !self.pattern.is_match(&body) {
            println!(
                "   {} Test failed on {}: body does not match /{}/",
                "✗".red(),
                final_url,
                self.pattern
            );
            return Ok(false);
        }
        Ok(true)
    }
}

/// The basic check followed by the project's declared tests.
pub fn build_smoke_tests(probe: &HttpProbe, specs: &[SmokeTestSpec]) -> Result<Vec<Box<dyn SmokeTest>>> {
    let mut tests: Vec<Box<dyn SmokeTest>> = vec![Box::new(BasicSmokeTest::new(probe.clone()))];
    for spec in specs {
        let test: Box<dyn SmokeTest> = match spec {
            SmokeTestSpec::Status {
                path,
                expected_status,
            } => Box::new(StatusSmokeTest::new(probe.clone(), path, *expected_status)),
            SmokeTestSpec::Body { path, pattern } => {
                Box::new(BodySmokeTest::new(probe.clone(), path, pattern)?)
            }
        };
        tests.push(test);
    }
    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Serves `responses` in order, one per connection, on a loopback port.
    fn serve(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        thread::spawn(move || {
            for (code, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap() > 0 {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }
                let reply = format!(
                    "HTTP/1.1 {code} Status\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
        });
        format!("http://{address}")
    }

    fn probe() -> HttpProbe {
        HttpProbe::build(Duration::from_secs(5), false).unwrap()
    }

    #[test]
    fn basic_test_passes_on_ok() {
        let url = serve(vec![(200, "hello")]);
        assert!(BasicSmokeTest::new(probe()).check(&url).unwrap());
    }

    #[test]
    fn basic_test_fails_on_service_unavailable() {
        let url = serve(vec![(503, "down")]);
        assert!(!BasicSmokeTest::new(probe()).check(&url).unwrap());
    }

    #[test]
    fn status_test_expects_configured_code() {
        let url = serve(vec![(403, ""), (200, "")]);
        let test = StatusSmokeTest::new(probe(), "/admin", 403);
        assert!(test.check(&url).unwrap());
        assert!(!test.check(&url).unwrap());
    }

    #[test]
    fn body_test_matches_pattern() {
        let url = serve(vec![(200, "<h1>Welcome to Drupal</h1>"), (200, "maintenance")]);
        let test = BodySmokeTest::new(probe(), "/", "Welcome to \\w+").unwrap();
        assert!(test.check(&url).unwrap());
        assert!(!test.check(&url).unwrap());
    }

    #[test]
    fn connection_errors_propagate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let result = BasicSmokeTest::new(probe()).check(&format!("http://{address}"));
        assert!(matches!(result, Err(UpdaterError::Http(_))));
    }

    #[test]
    fn joins_paths_onto_preview_url() {
        assert_eq!(
            join("https://pr-3.example.com/", "/user/login").unwrap(),
            "https://pr-3.example.com/user/login"
        );
        assert_eq!(
            join("https://pr-3.example.com", "/").unwrap(),
            "https://pr-3.example.com"
        );
        assert_eq!(
            join("https://pr-3.example.com/app", "/health").unwrap(),
            "https://pr-3.example.com/app/health"
        );
        assert_eq!(
            join("https://pr-3.example.com/app/", "health").unwrap(),
            "https://pr-3.example.com/app/health"
        );
    }

    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        cause: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.cause.as_deref().map(|c| c as _)
        }
    }

    fn layered(top: &'static str, cause: &'static str) -> Layer {
        Layer {
            message: top,
            cause: Some(Box::new(Layer {
                message: cause,
                cause: None,
            })),
        }
    }

    #[test]
    fn classifies_tls_failures_by_cause() {
        assert!(is_tls_error(&layered(
            "error sending request",
            "invalid peer certificate: UnknownIssuer"
        )));
        assert!(is_tls_error(&layered(
            "error sending request",
            "error:0A00010B:SSL routines::wrong version number"
        )));
        assert!(!is_tls_error(&layered(
            "error sending request",
            "Connection refused (os error 111)"
        )));
        // Only causes count: the top-level message carries the URL.
        assert!(!is_tls_error(&layered(
            "error sending request for url (https://ssl-tls.example.com/)",
            "operation timed out"
        )));
    }

    /// Answers every connection with plain HTTP, so a TLS client fails its
    /// handshake. Returns the address and the number of accepted connections.
    fn serve_plaintext() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut hello = [0u8; 1024];
                let _ = stream.read(&mut hello);
                let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
            }
        });
        (format!("https://{address}"), accepted)
    }

    #[test]
    fn tls_failure_is_retried_once_without_verification() {
        let (url, accepted) = serve_plaintext();
        let err = probe().get(&url).unwrap_err();

        match &err {
            UpdaterError::Http(inner) => assert!(is_tls_error(inner), "not a TLS error: {inner:?}"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn declared_tests_follow_basic_test() {
        let specs = vec![
            SmokeTestSpec::Status {
                path: "/health".into(),
                expected_status: 204,
            },
            SmokeTestSpec::Body {
                path: "/".into(),
                pattern: "ok".into(),
            },
        ];
        let tests = build_smoke_tests(&probe(), &specs).unwrap();
        let names: Vec<_> = tests.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            ["basic smoke test", "status 204 on /health", "body of / matches /ok/"]
        );
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let specs = vec![SmokeTestSpec::Body {
            path: "/".into(),
            pattern: "(".into(),
        }];
        assert!(matches!(
            build_smoke_tests(&probe(), &specs),
            Err(UpdaterError::Regex(_))
        ));
    }
}
