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

//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! Response bodies are streamed chunk by chunk so that large blob downloads
//! never have to be buffered in memory.
//!
//! ```no_run
//! use azblob_core::Context;
//! use azblob_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use async_trait::async_trait;
use azblob_core::{Error, HttpBody, HttpSend, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Transport that sends requests with a [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<HttpBody>> {
        let req = Request::try_from(req).map_err(classify)?;
        log::trace!("sending {} {}", req.method(), req.url());

        let resp: http::Response<_> = self.client.execute(req).await.map_err(classify)?.into();

        let (parts, body) = resp.into_parts();
        let body: HttpBody = Box::pin(body.into_data_stream().map_err(classify));
        Ok(http::Response::from_parts(parts, body))
    }
}

/// Map reqwest errors into azblob errors.
///
/// Anything that happened on the wire is transient, a request that reqwest
/// refused to build is not.
fn classify(err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::request_invalid("failed to build http request").with_source(err);
    }

    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        return Error::transient("http request failed").with_source(err);
    }

    Error::unexpected("http request failed").with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use azblob_core::{Context, ErrorKind};

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let ctx = Context::new().with_http_send(ReqwestHttpSend::default());

        // Port 9 (discard) on localhost is closed in test environments.
        let req = http::Request::get("http://127.0.0.1:9/container/blob")
            .body(Bytes::new())
            .unwrap();

        let err = ctx.http_send(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}
