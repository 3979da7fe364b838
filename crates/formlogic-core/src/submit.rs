//! Sending filled-in forms to their configured endpoint.
//!
//! The body is `{"meta": <schema meta>, "data": <field values>}`, omitted for
//! `GET`. One [`Submitter`] runs at most one request at a time; a second
//! `submit` while one is in flight is refused rather than queued.

use crate::engine::Engine;
use crate::runtime::FieldValues;
use crate::schema::{DEFAULT_METHOD, FormMeta, FormSchema, JSON_CONTENT_TYPE};
use crate::validation::{FormErrors, ValidationError};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("fix the validation errors before submitting ({} field(s))", .0.len())]
    Invalid(FormErrors),
    #[error("no submission target configured (target.uri)")]
    MissingTarget,
    #[error("a submission is already in progress")]
    InFlight,
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("{}", status_message(.status, .body))]
    Status { status: u16, body: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not encode submission: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The response body, or `HTTP <status>` when the server sent none.
fn status_message(status: &u16, body: &str) -> String {
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    meta: &'a FormMeta,
    data: &'a FieldValues,
}

/// A fully resolved request, ready to hand to an HTTP client.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

pub fn build_request(
    schema: &FormSchema,
    values: &FieldValues,
) -> Result<SubmitRequest, SubmitError> {
    let url = schema.target.uri.trim();
    if url.is_empty() {
        return Err(SubmitError::MissingTarget);
    }

    let method_name = match schema.target.method.trim() {
        "" => DEFAULT_METHOD.to_string(),
        name => name.to_ascii_uppercase(),
    };
    let method = Method::from_bytes(method_name.as_bytes())
        .map_err(|_| SubmitError::InvalidMethod(method_name.clone()))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &schema.target.headers {
        if name.is_empty() {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| SubmitError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| SubmitError::InvalidHeader(name.clone()))?;
        headers.insert(header_name, header_value);
    }
    let content_type_set = headers
        .get(CONTENT_TYPE)
        .is_some_and(|v| !v.as_bytes().iter().all(u8::is_ascii_whitespace));
    if !content_type_set {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }

    let body = if method == Method::GET {
        None
    } else {
        Some(serde_json::to_vec(&Payload {
            meta: &schema.meta,
            data: values,
        })?)
    };

    Ok(SubmitRequest {
        method,
        url: url.to_string(),
        headers,
        body,
    })
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Submitter {
    client: reqwest::Client,
    in_flight: AtomicBool,
}

impl Default for Submitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Submitter {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate `values` against `schema` and send them. Returns the
    /// response body on a 2xx answer.
    pub async fn submit(
        &self,
        engine: &Engine,
        schema: &FormSchema,
        values: &FieldValues,
    ) -> Result<String, SubmitError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SubmitError::InFlight)?;

        let errors = engine.validate(&schema.fields, values)?;
        if !errors.is_empty() {
            return Err(SubmitError::Invalid(errors));
        }
        let request = build_request(schema, values)?;
        self.send(request).await
    }

    /// Send an already built request without validating anything.
    pub async fn send(&self, request: SubmitRequest) -> Result<String, SubmitError> {
        let SubmitRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            info!(%method, %url, status = status.as_u16(), "form submitted");
            Ok(text)
        } else {
            warn!(%method, %url, status = status.as_u16(), "form submission rejected");
            Err(SubmitError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
