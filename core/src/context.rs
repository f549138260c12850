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

use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Streaming body of an http response.
///
/// Chunks are delivered in order; an `Err` item ends the body.
pub type HttpBody = BoxStream<'static, Result<Bytes>>;

/// Context provides the environment for request signing and sending.
///
/// ## Important
///
/// azblob provides NO default transport. Users MUST configure an [`HttpSend`]
/// before any network operation; an unconfigured context fails every send.
///
/// ## Example
///
/// ```
/// use azblob_core::{Context, OsEnv};
///
/// let ctx = Context::new().with_env(OsEnv);
/// ```
#[derive(Clone)]
pub struct Context {
    http: Arc<dyn HttpSend>,
    env: Arc<dyn Env>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("http", &self.http)
            .field("env", &self.env)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new Context with no-op implementations.
    pub fn new() -> Self {
        Self {
            http: Arc::new(NoopHttpSend),
            env: Arc::new(NoopEnv),
        }
    }

    /// Replace the HTTP client implementation.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Arc::new(http);
        self
    }

    /// Replace the HTTP client implementation with a shared one.
    pub fn with_shared_http_send(mut self, http: Arc<dyn HttpSend>) -> Self {
        self.http = http;
        self
    }

    /// Replace the environment implementation.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Send http request and return the response with a streaming body.
    #[inline]
    pub async fn http_send_streaming(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<HttpBody>> {
        self.http.http_send(req).await
    }

    /// Send http request and return the response with the whole body.
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (parts, body) = self.http.http_send(req).await?.into_parts();
        let bs = collect_body(body).await?;
        Ok(http::Response::from_parts(parts, bs))
    }

    /// Get the environment variable.
    ///
    /// - Returns `Some(v)` if the environment variable is found and is valid utf-8.
    /// - Returns `None` if the environment variable is not found or value is invalid.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Returns an hashmap of (variable, value) pairs of strings, for all the
    /// environment variables of the current process.
    #[inline]
    pub fn env_vars(&self) -> HashMap<String, String> {
        self.env.vars()
    }
}

/// Collect a streaming body into one buffer.
pub async fn collect_body(mut body: HttpBody) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// HttpSend is the transport every request goes through.
///
/// Implementations must return the response as soon as the headers arrive
/// and stream the body, so that large downloads never need to be buffered.
/// Network failures should be reported as [`crate::ErrorKind::Transient`].
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<HttpBody>>;
}

/// Env is where credentials and config look up environment variables.
pub trait Env: Debug + Send + Sync + 'static {
    /// Get an environment variable.
    ///
    /// - Returns `Some(v)` if the environment variable is found and is valid utf-8.
    /// - Returns `None` if the environment variable is not found or value is invalid.
    fn var(&self, key: &str) -> Option<String>;

    /// Returns an hashmap of (variable, value) pairs of strings, for all the
    /// environment variables of the current process.
    fn vars(&self) -> HashMap<String, String>;
}

/// Implements Env for the OS context.
#[derive(Debug, Copy, Clone)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }
}

/// StaticEnv provides a static env environment.
///
/// This is useful for testing or for providing a fixed environment.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// The environment variables to use.
    pub envs: HashMap<String, String>,
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }

    fn vars(&self) -> HashMap<String, String> {
        self.envs.clone()
    }
}

/// NoopHttpSend is a no-op implementation that always returns an error.
///
/// This is used when no HTTP client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, _req: http::Request<Bytes>) -> Result<http::Response<HttpBody>> {
        Err(Error::unexpected(
            "HTTP sending not supported: no HTTP client configured",
        ))
    }
}

/// NoopEnv is a no-op implementation that always returns None/empty.
///
/// This is used when no environment is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnv;

impl Env for NoopEnv {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }

    fn vars(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[derive(Debug)]
    struct ChunkedHttpSend;

    #[async_trait::async_trait]
    impl HttpSend for ChunkedHttpSend {
        async fn http_send(
            &self,
            _req: http::Request<Bytes>,
        ) -> Result<http::Response<HttpBody>> {
            let chunks = vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
            Ok(http::Response::new(stream::iter(chunks).boxed()))
        }
    }

    #[tokio::test]
    async fn test_http_send_collects_body() {
        let ctx = Context::new().with_http_send(ChunkedHttpSend);
        let req = http::Request::get("https://example.com").body(Bytes::new()).unwrap();

        let resp = ctx.http_send(req).await.unwrap();
        assert_eq!(resp.body().as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_noop_http_send_fails() {
        let ctx = Context::new();
        let req = http::Request::get("https://example.com").body(Bytes::new()).unwrap();

        assert!(ctx.http_send(req).await.is_err());
    }

    #[test]
    fn test_static_env() {
        let ctx = Context::new().with_env(StaticEnv {
            envs: HashMap::from([("AZBLOB_ACCOUNT_NAME".to_string(), "acct".to_string())]),
        });

        assert_eq!(ctx.env_var("AZBLOB_ACCOUNT_NAME").as_deref(), Some("acct"));
        assert_eq!(ctx.env_var("MISSING"), None);
    }
}
