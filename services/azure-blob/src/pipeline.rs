// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::sync::Arc;
use std::time::Duration;

use azblob_core::{
    collect_body, Context, Error, ErrorKind, HttpBody, HttpSend, OsEnv, ProvideCredential,
    Result, Signer,
};
use azblob_http_send_reqwest::ReqwestHttpSend;
use bytes::Bytes;
use http::header::USER_AGENT;
use http::{HeaderMap, HeaderValue, StatusCode};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::constants::*;
use crate::models::xml::{from_xml, ErrorBody};
use crate::request::BlobRequest;
use crate::{Credential, RequestSigner, SharedKeyCredential, StaticCredentialProvider};

const MAX_APPLICATION_ID_LEN: usize = 24;

/// How failed tries are retried.
///
/// The delay before try `n` (1-based, counting the first retry as 1) is
/// `(2^n - 1) * retry_delay`, capped at `max_retry_delay`.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Retries after the first try; `0` disables retrying.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
    /// Upper bound for a single try, until the response headers arrive.
    pub try_timeout: Option<Duration>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(4),
            max_retry_delay: Duration::from_secs(120),
            try_timeout: None,
        }
    }
}

impl RetryOptions {
    pub(crate) fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.min(31))
            .unwrap_or(u32::MAX)
            .saturating_sub(1);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(self.max_retry_delay)
            .min(self.max_retry_delay)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryOptions {
    /// Appended to the `User-Agent`. At most 24 characters without spaces.
    pub application_id: Option<String>,
}

impl TelemetryOptions {
    fn user_agent(&self) -> Result<String> {
        let base = format!("azblob/{}", env!("CARGO_PKG_VERSION"));
        let Some(id) = self.application_id.as_deref().filter(|v| !v.is_empty()) else {
            return Ok(base);
        };
        if id.len() > MAX_APPLICATION_ID_LEN || id.contains(char::is_whitespace) {
            return Err(Error::config_invalid(format!(
                "application id must be at most {MAX_APPLICATION_ID_LEN} characters without spaces: '{id}'"
            )));
        }
        Ok(format!("{base} {id}"))
    }
}

/// What the pipeline logs about every try.
///
/// Request and response lines go to `debug`; header values not listed in
/// `allowed_headers` are printed as `REDACTED`.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub log_headers: bool,
    /// Lowercase names of headers whose values may be logged.
    pub allowed_headers: Vec<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        let allowed_headers = [
            "content-length",
            "content-range",
            "content-type",
            "date",
            "etag",
            "last-modified",
            "user-agent",
            X_MS_BLOB_TYPE,
            X_MS_CLIENT_REQUEST_ID,
            X_MS_DATE,
            X_MS_ERROR_CODE,
            X_MS_RANGE,
            X_MS_REQUEST_ID,
            X_MS_VERSION,
        ];
        Self {
            log_headers: false,
            allowed_headers: allowed_headers.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Options shared by every client built from the same root.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub retry: RetryOptions,
    pub telemetry: TelemetryOptions,
    pub logging: LoggingOptions,
    /// Transport every request goes through, a default [`reqwest::Client`]
    /// when unset.
    pub transport: Option<Arc<dyn HttpSend>>,
}

impl ClientOptions {
    pub fn with_transport(mut self, transport: impl HttpSend) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_reqwest_client(self, client: reqwest::Client) -> Self {
        self.with_transport(ReqwestHttpSend::new(client))
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.telemetry.application_id = Some(application_id.into());
        self
    }
}

/// Stamps, signs, sends and retries the requests of one client tree.
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    ctx: Context,
    signer: Option<Signer<Credential>>,
    shared_key: Option<SharedKeyCredential>,
    options: Arc<ClientOptions>,
    user_agent: HeaderValue,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Pipeline signing with a fixed credential, anonymous when `None`.
    pub(crate) fn new(credential: Option<Credential>, options: ClientOptions) -> Result<Self> {
        let shared_key = credential.as_ref().and_then(|v| v.shared_key()).cloned();
        let mut pipeline = Self::build(options)?;
        pipeline.signer = credential.map(|cred| {
            Signer::new(
                pipeline.ctx.clone(),
                StaticCredentialProvider::new(cred),
                RequestSigner::new(),
            )
        });
        pipeline.shared_key = shared_key;
        Ok(pipeline)
    }

    /// Pipeline signing with whatever `provider` loads.
    pub(crate) fn with_provider(
        provider: impl ProvideCredential<Credential = Credential>,
        options: ClientOptions,
    ) -> Result<Self> {
        let mut pipeline = Self::build(options)?;
        pipeline.signer = Some(Signer::new(
            pipeline.ctx.clone(),
            provider,
            RequestSigner::new(),
        ));
        Ok(pipeline)
    }

    fn build(options: ClientOptions) -> Result<Self> {
        let transport = options
            .transport
            .clone()
            .unwrap_or_else(|| Arc::new(ReqwestHttpSend::default()));
        let ctx = Context::new()
            .with_shared_http_send(transport)
            .with_env(OsEnv);
        let user_agent = HeaderValue::from_str(&options.telemetry.user_agent()?)?;

        Ok(Self {
            ctx,
            signer: None,
            shared_key: None,
            options: Arc::new(options),
            user_agent,
            cancel: CancellationToken::new(),
        })
    }

    /// The same pipeline, aborted once `token` is cancelled.
    pub(crate) fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The account key this pipeline signs with, needed to build SAS urls.
    pub(crate) fn shared_key(&self) -> Option<&SharedKeyCredential> {
        self.shared_key.as_ref()
    }

    /// Send a request and return the response as soon as its headers arrive.
    ///
    /// Non-2xx responses are turned into [`ErrorKind::Service`] errors.
    pub(crate) async fn send(&self, req: BlobRequest) -> Result<http::Response<HttpBody>> {
        let mut template = req.build()?;
        self.stamp(template.headers_mut())?;

        let retry = &self.options.retry;
        let mut retries = 0;
        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::canceled("request canceled")),
                r = self.try_once(&template) => r,
            };

            let err = match result {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };
            if retries >= retry.max_retries || !should_retry(&err) {
                return Err(err);
            }

            retries += 1;
            let delay = retry.delay(retries);
            warn!(
                "{} {} failed, retry {retries}/{} after {delay:?}: {err}",
                template.method(),
                redact_uri(template.uri()),
                retry.max_retries
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::canceled("request canceled")),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Send a request and collect the whole response body.
    pub(crate) async fn send_bytes(&self, req: BlobRequest) -> Result<http::Response<Bytes>> {
        let (parts, body) = self.send(req).await?.into_parts();
        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::canceled("request canceled")),
            r = collect_body(body) => r?,
        };
        Ok(http::Response::from_parts(parts, body))
    }

    fn stamp(&self, headers: &mut HeaderMap) -> Result<()> {
        headers.insert(X_MS_VERSION, HeaderValue::from_static(SERVICE_VERSION));
        // Same id for every try, so the service logs can be correlated.
        headers.insert(
            X_MS_CLIENT_REQUEST_ID,
            HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())?,
        );
        headers.insert(USER_AGENT, self.user_agent.clone());
        Ok(())
    }

    async fn try_once(&self, template: &http::Request<Bytes>) -> Result<http::Response<HttpBody>> {
        let (mut parts, body) = clone_request(template).into_parts();
        if let Some(signer) = &self.signer {
            signer.sign(&mut parts, None).await?;
        }
        let req = http::Request::from_parts(parts, body);
        self.log_request(&req);

        let fut = self.ctx.http_send_streaming(req);
        let resp = match self.options.retry.try_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| Error::transient(format!("try timed out after {timeout:?}")))??,
            None => fut.await?,
        };
        self.log_response(&resp);

        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(service_error(resp).await)
    }

    fn log_request(&self, req: &http::Request<Bytes>) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        debug!(
            "request: {} {}{}",
            req.method(),
            redact_uri(req.uri()),
            self.format_headers(req.headers())
        );
    }

    fn log_response(&self, resp: &http::Response<HttpBody>) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        debug!(
            "response: {}{}",
            resp.status(),
            self.format_headers(resp.headers())
        );
    }

    fn format_headers(&self, headers: &HeaderMap) -> String {
        let logging = &self.options.logging;
        if !logging.log_headers {
            return String::new();
        }

        headers
            .iter()
            .map(|(k, v)| {
                let name = k.as_str();
                let value = if logging.allowed_headers.iter().any(|h| h == name) {
                    v.to_str().unwrap_or("<non-utf8>")
                } else {
                    "REDACTED"
                };
                format!("\n  {name}: {value}")
            })
            .collect()
    }
}

fn clone_request(req: &http::Request<Bytes>) -> http::Request<Bytes> {
    let mut new = http::Request::new(req.body().clone());
    *new.method_mut() = req.method().clone();
    *new.uri_mut() = req.uri().clone();
    *new.headers_mut() = req.headers().clone();
    new
}

fn should_retry(err: &Error) -> bool {
    if err.is_transient() {
        return true;
    }
    err.kind() == ErrorKind::Service
        && matches!(
            err.status(),
            Some(
                StatusCode::REQUEST_TIMEOUT
                    | StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            )
        )
}

/// Turn a non-2xx response into an error carrying status and service code.
pub(crate) async fn service_error(resp: http::Response<HttpBody>) -> Error {
    let (parts, body) = resp.into_parts();
    // A broken error body must not hide the status.
    let body = collect_body(body).await.unwrap_or_default();
    let parsed: ErrorBody = if body.is_empty() {
        ErrorBody::default()
    } else {
        from_xml(&body).unwrap_or_default()
    };

    let code = parts
        .headers
        .get(X_MS_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .or(parsed.code);
    let message = parsed.message.unwrap_or_else(|| {
        parts
            .status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    });

    let err = Error::service(parts.status, message);
    match code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

/// Path and query of the uri, with the SAS signature masked.
fn redact_uri(uri: &http::Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };
    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, _)) if k.eq_ignore_ascii_case("sig") => format!("{k}=REDACTED"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{query}", uri.path())
}
