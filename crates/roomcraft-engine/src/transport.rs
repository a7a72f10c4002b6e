use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Multipart body kept as plain data so tests can inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl FormBody {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn to_multipart(&self) -> Result<MultipartForm> {
        let mut form = MultipartForm::new();
        for (key, value) in &self.fields {
            form = form.text(key.clone(), value.clone());
        }
        for file in &self.files {
            let part = MultipartPart::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)
                .with_context(|| format!("invalid mime '{}' for {}", file.mime, file.file_name))?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(FormBody),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer: None,
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, payload: Value) -> Self {
        self.body = RequestBody::Json(payload);
        self
    }

    pub fn form(mut self, form: FormBody) -> Self {
        self.body = RequestBody::Form(form);
        self
    }
}

/// Status and raw body of an upstream answer; interpreting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One synchronous HTTP exchange. Errors mean nothing usable came back
/// (DNS, TLS, timeout, body read); any status code is an `Ok` reply.
pub trait Transport: Send + Sync {
    fn send(&self, request: &OutboundRequest) -> Result<UpstreamReply>;
}

pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &OutboundRequest) -> Result<UpstreamReply> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
            Method::Patch => self.http.patch(&request.url),
            Method::Delete => self.http.delete(&request.url),
        };
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(payload) => builder.json(payload),
            RequestBody::Form(form) => builder.multipart(form.to_multipart()?),
        };
        let response = builder
            .send()
            .with_context(|| format!("request failed ({})", request.url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("response body read failed ({})", request.url))?;
        Ok(UpstreamReply { status, body })
    }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use serde_json::Value;

    use super::{OutboundRequest, Transport, UpstreamReply};

    /// Replays canned replies in order and records every request it was sent.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<UpstreamReply, String>>>,
        pub(crate) sent: Mutex<Vec<OutboundRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(self, status: u16, body: Value) -> Self {
            self.reply_text(status, &body.to_string())
        }

        pub(crate) fn reply_text(self, status: u16, body: &str) -> Self {
            if let Ok(mut replies) = self.replies.lock() {
                replies.push_back(Ok(UpstreamReply {
                    status,
                    body: body.to_string(),
                }));
            }
            self
        }

        pub(crate) fn fail(self, message: &str) -> Self {
            if let Ok(mut replies) = self.replies.lock() {
                replies.push_back(Err(message.to_string()));
            }
            self
        }

        pub(crate) fn requests(&self) -> Vec<OutboundRequest> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }

        pub(crate) fn calls_to(&self, fragment: &str) -> usize {
            self.requests()
                .iter()
                .filter(|request| request.url.contains(fragment))
                .count()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, request: &OutboundRequest) -> Result<UpstreamReply> {
            self.sent
                .lock()
                .map_err(|_| anyhow!("sent log poisoned"))?
                .push(request.clone());
            let next = self
                .replies
                .lock()
                .map_err(|_| anyhow!("reply queue poisoned"))?
                .pop_front();
            match next {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted reply left for {}", request.url)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_builder_collects_auth_headers_and_body() {
        let request = OutboundRequest::new(Method::Post, "https://x.test/rpc")
            .bearer("token")
            .header("apikey", "anon")
            .json(json!({"a": 1}));
        assert_eq!(request.bearer.as_deref(), Some("token"));
        assert_eq!(request.headers, vec![("apikey".to_string(), "anon".to_string())]);
        assert_eq!(request.body, RequestBody::Json(json!({"a": 1})));
    }

    #[test]
    fn form_body_builds_a_multipart_form() -> anyhow::Result<()> {
        let form = FormBody {
            fields: vec![("prompt".to_string(), "hi".to_string())],
            files: vec![FilePart {
                field: "image".to_string(),
                file_name: "room.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            }],
        };
        assert_eq!(form.field("prompt"), Some("hi"));
        assert_eq!(form.field("size"), None);
        form.to_multipart()?;
        Ok(())
    }

    #[test]
    fn reply_success_range_and_truncation() {
        assert!(UpstreamReply { status: 204, body: String::new() }.is_success());
        assert!(!UpstreamReply { status: 402, body: String::new() }.is_success());
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
