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

//! A download body that survives dropped connections.
//!
//! [`RetryReader`] streams the body of a ranged GET. When the body breaks
//! with a transient error, it asks its [`RangeGetter`] for the rest of the
//! range, pinned to the ETag of the first response, and carries on as if
//! nothing happened.

use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use azblob_core::{Error, HttpBody, Result};
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::{Stream, StreamExt, TryStreamExt};
use http::header::ETAG;
use http::StatusCode;
use log::{debug, warn};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// The part of a blob that still has to be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpGetterInfo {
    /// Offset of the next byte to deliver.
    pub offset: u64,
    /// Bytes left to deliver, `None` reads to the end of the blob.
    pub count: Option<u64>,
    /// ETag every resumed read must still match.
    pub etag: Option<String>,
}

/// Issue a ranged GET for the remaining part of a download.
///
/// Implementations must send `If-Match: <etag>` when `info.etag` is set.
#[async_trait]
pub trait RangeGetter: Send + Sync + 'static {
    async fn get_range(&self, info: HttpGetterInfo) -> Result<http::Response<HttpBody>>;
}

/// Called on every failed read with `(fail_count, error, offset, count,
/// will_retry)`. `fail_count` starts at 1.
pub type FailedReadNotifier = Arc<dyn Fn(u32, &Error, u64, Option<u64>, bool) + Send + Sync>;

#[derive(Clone)]
pub struct RetryReaderOptions {
    /// Resume requests issued before giving up; `0` never resumes.
    pub max_retry_requests: u32,
    /// Treat a body that ends before the requested range was delivered as a
    /// transient failure.
    pub treat_early_close_as_error: bool,
    pub notify_failed_read: Option<FailedReadNotifier>,
}

impl Default for RetryReaderOptions {
    fn default() -> Self {
        Self {
            max_retry_requests: 3,
            treat_early_close_as_error: true,
            notify_failed_read: None,
        }
    }
}

impl Debug for RetryReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryReaderOptions")
            .field("max_retry_requests", &self.max_retry_requests)
            .field("treat_early_close_as_error", &self.treat_early_close_as_error)
            .field("notify_failed_read", &self.notify_failed_read.is_some())
            .finish()
    }
}

enum State {
    /// Nothing requested yet.
    Idle,
    Streaming(HttpBody),
    /// Waiting for the response of a range request.
    Retrying(BoxFuture<'static, Result<http::Response<HttpBody>>>),
    Closed,
    Failed,
}

impl Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Idle => "Idle",
            State::Streaming(_) => "Streaming",
            State::Retrying(_) => "Retrying",
            State::Closed => "Closed",
            State::Failed => "Failed",
        })
    }
}

/// A [`Stream`] of blob bytes that resumes broken downloads.
///
/// Once the reader yields an error it's done: every later poll returns
/// `None`.
pub struct RetryReader {
    getter: Arc<dyn RangeGetter>,
    info: HttpGetterInfo,
    options: RetryReaderOptions,
    state: State,
    fail_count: u32,
    retries: u32,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
}

impl Debug for RetryReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryReader")
            .field("info", &self.info)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("fail_count", &self.fail_count)
            .finish()
    }
}

impl RetryReader {
    /// Continue from the body of a response that was already received.
    ///
    /// `info` describes what `body` is expected to deliver.
    pub fn new(
        body: HttpBody,
        info: HttpGetterInfo,
        getter: Arc<dyn RangeGetter>,
        options: RetryReaderOptions,
    ) -> Self {
        Self {
            getter,
            info,
            options,
            state: State::Streaming(body),
            fail_count: 0,
            retries: 0,
            cancelled: None,
        }
    }

    /// Start without a body; the first poll issues the initial request.
    pub fn lazy(
        info: HttpGetterInfo,
        getter: Arc<dyn RangeGetter>,
        options: RetryReaderOptions,
    ) -> Self {
        Self {
            state: State::Idle,
            ..Self::new(futures::stream::empty().boxed(), info, getter, options)
        }
    }

    /// Fail with [`azblob_core::ErrorKind::Canceled`] once `token` is
    /// cancelled, instead of reading or resuming.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    /// What is left to read.
    pub fn info(&self) -> &HttpGetterInfo {
        &self.info
    }

    /// Release the underlying connection. Closing twice is a no-op.
    pub fn close(&mut self) {
        if !matches!(self.state, State::Closed) {
            debug!("retry reader closed at offset {}", self.info.offset);
        }
        self.state = State::Closed;
    }

    /// Read everything that's left into one buffer.
    pub async fn read_all(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Adapt into a [`futures::io::AsyncRead`].
    pub fn into_async_read(self) -> impl futures::io::AsyncRead + Send + Unpin {
        self.map_err(std::io::Error::other).into_async_read()
    }

    fn fetch(&self) -> BoxFuture<'static, Result<http::Response<HttpBody>>> {
        let getter = self.getter.clone();
        let info = self.info.clone();
        Box::pin(async move { getter.get_range(info).await })
    }

    /// Check that a range response still serves the same blob.
    fn accept(&mut self, resp: http::Response<HttpBody>) -> Result<HttpBody> {
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        match (&self.info.etag, etag) {
            (Some(expected), Some(actual)) if *expected != actual => {
                return Err(Error::content_changed(format!(
                    "blob etag changed from {expected} to {actual} at offset {}",
                    self.info.offset
                )));
            }
            (None, Some(actual)) => self.info.etag = Some(actual),
            _ => {}
        }
        Ok(resp.into_body())
    }

    /// Record a failure and either schedule a resume or give up.
    ///
    /// Returns the error to surface when giving up.
    fn fail(&mut self, err: Error) -> Option<Error> {
        let err = if err.status() == Some(StatusCode::PRECONDITION_FAILED) {
            Error::content_changed(format!(
                "blob changed before offset {} was read",
                self.info.offset
            ))
            .with_source(err)
        } else {
            err
        };

        self.fail_count += 1;
        let will_retry = err.is_transient() && self.retries < self.options.max_retry_requests;
        if let Some(notify) = &self.options.notify_failed_read {
            notify(
                self.fail_count,
                &err,
                self.info.offset,
                self.info.count,
                will_retry,
            );
        }

        if !will_retry {
            self.state = State::Failed;
            return Some(err);
        }

        self.retries += 1;
        warn!(
            "read failed at offset {}, resuming ({}/{}): {err}",
            self.info.offset, self.retries, self.options.max_retry_requests
        );
        // Dropping the old body releases its connection.
        self.state = State::Retrying(self.fetch());
        None
    }

    /// Account for a delivered chunk, trimming anything past the range.
    fn advance(&mut self, mut chunk: Bytes) -> Bytes {
        if let Some(count) = self.info.count {
            if chunk.len() as u64 > count {
                chunk.truncate(count as usize);
            }
            self.info.count = Some(count - chunk.len() as u64);
        }
        self.info.offset += chunk.len() as u64;
        chunk
    }
}

impl Stream for RetryReader {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if matches!(this.state, State::Closed | State::Failed) {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_mut() {
            if cancelled.as_mut().poll(cx).is_ready() {
                this.state = State::Failed;
                return Poll::Ready(Some(Err(Error::canceled("download canceled"))));
            }
        }

        loop {
            match &mut this.state {
                State::Idle => {
                    this.state = State::Retrying(this.fetch());
                }
                State::Retrying(fut) => match fut.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(resp)) => match this.accept(resp) {
                        Ok(body) => this.state = State::Streaming(body),
                        Err(err) => {
                            if let Some(err) = this.fail(err) {
                                return Poll::Ready(Some(Err(err)));
                            }
                        }
                    },
                    Poll::Ready(Err(err)) => {
                        if let Some(err) = this.fail(err) {
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                },
                State::Streaming(body) => match body.as_mut().poll_next(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(Ok(chunk))) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        let chunk = this.advance(chunk);
                        if this.info.count == Some(0) {
                            this.state = State::Closed;
                        }
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    Poll::Ready(Some(Err(err))) => {
                        if let Some(err) = this.fail(err) {
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                    Poll::Ready(None) => {
                        let early = matches!(this.info.count, Some(n) if n > 0);
                        if early && this.options.treat_early_close_as_error {
                            let err = Error::transient(format!(
                                "body ended early at offset {}, {} bytes missing",
                                this.info.offset,
                                this.info.count.unwrap_or_default()
                            ));
                            if let Some(err) = this.fail(err) {
                                return Poll::Ready(Some(Err(err)));
                            }
                            continue;
                        }
                        this.state = State::Closed;
                        return Poll::Ready(None);
                    }
                },
                State::Closed | State::Failed => return Poll::Ready(None),
            }
        }
    }
}
