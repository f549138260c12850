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

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use azblob::{ClientOptions, Credential, RetryOptions};
use azblob_core::{HttpBody, HttpSend, Result};
use bytes::Bytes;
use futures::StreamExt;

pub const ACCOUNT_URL: &str = "https://account.blob.core.windows.net";

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type Reply = Result<http::Response<Vec<Result<Bytes>>>>;

/// Transport replaying a queue of canned replies and recording every request.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    sent: Arc<Mutex<Vec<SentRequest>>>,
}

impl MockTransport {
    pub fn reply(&self, status: u16, headers: &[(&str, &str)], body: &str) -> &Self {
        let chunks = if body.is_empty() {
            vec![]
        } else {
            vec![Ok(Bytes::from(body.to_string()))]
        };
        self.reply_chunks(status, headers, chunks)
    }

    pub fn reply_chunks(
        &self,
        status: u16,
        headers: &[(&str, &str)],
        chunks: Vec<Result<Bytes>>,
    ) -> &Self {
        let mut builder = http::Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(builder.body(chunks).unwrap()));
        self
    }

    pub fn fail(&self, err: azblob::Error) -> &Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpSend for MockTransport {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<HttpBody>> {
        let (parts, body) = req.into_parts();
        self.sent.lock().unwrap().push(SentRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("mock transport ran out of replies");
        reply.map(|resp| resp.map(|chunks| futures::stream::iter(chunks).boxed()))
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn options(transport: &MockTransport) -> ClientOptions {
    ClientOptions::default()
        .with_transport(transport.clone())
        .with_retry(RetryOptions {
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
            max_retry_delay: Duration::from_millis(4),
            try_timeout: None,
        })
}

pub fn shared_key() -> Credential {
    Credential::with_shared_key("account", "a2V5").unwrap()
}
