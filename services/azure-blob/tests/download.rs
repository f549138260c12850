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

mod common;

use std::sync::{Arc, Mutex};

use azblob::models::HttpRange;
use azblob::{BlobClient, DownloadOptions, ErrorKind, RetryReaderOptions};
use bytes::Bytes;
use common::{init_logger, options, shared_key, MockTransport, ACCOUNT_URL};
use futures::{AsyncReadExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn blob(transport: &MockTransport) -> BlobClient {
    BlobClient::new(
        &format!("{ACCOUNT_URL}/container/data.bin"),
        Some(shared_key()),
        options(transport),
    )
    .unwrap()
}

fn broken() -> azblob::Error {
    azblob::Error::transient("connection reset by peer")
}

#[tokio::test]
async fn test_download_resumes_where_the_body_broke() {
    init_logger();
    let transport = MockTransport::default();
    transport
        .reply_chunks(
            200,
            &[("content-length", "10"), ("etag", "\"0x8D1\"")],
            vec![Ok(Bytes::from_static(b"hello")), Err(broken())],
        )
        .reply(
            206,
            &[("content-length", "5"), ("etag", "\"0x8D1\"")],
            "world",
        );

    let content = blob(&transport)
        .download_to_bytes(DownloadOptions::default())
        .await
        .unwrap();
    assert_eq!(content, Bytes::from_static(b"helloworld"));

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].header("x-ms-range"), None);
    assert_eq!(sent[1].header("x-ms-range"), Some("bytes=5-9"));
    assert_eq!(sent[1].header("if-match"), Some("\"0x8D1\""));
    assert!(sent[1].header("authorization").is_some());
}

#[tokio::test]
async fn test_download_resumes_inside_a_range() {
    init_logger();
    let transport = MockTransport::default();
    transport
        .reply_chunks(
            206,
            &[("content-length", "10"), ("etag", "\"v1\"")],
            vec![Ok(Bytes::from_static(b"abcd")), Err(broken())],
        )
        .reply_chunks(
            206,
            &[("content-length", "6"), ("etag", "\"v1\"")],
            vec![Ok(Bytes::from_static(b"ef")), Err(broken())],
        )
        .reply(206, &[("content-length", "4"), ("etag", "\"v1\"")], "ghij");

    let failures = Arc::new(Mutex::new(Vec::new()));
    let recorded = failures.clone();
    let opts = DownloadOptions {
        range: HttpRange::new(100, Some(10)),
        retry_reader: RetryReaderOptions {
            notify_failed_read: Some(Arc::new(
                move |n: u32,
                      _: &azblob::Error,
                      offset: u64,
                      count: Option<u64>,
                      will_retry: bool| {
                    recorded.lock().unwrap().push((n, offset, count, will_retry));
                },
            )),
            ..Default::default()
        },
        ..Default::default()
    };

    let content = blob(&transport).download_to_bytes(opts).await.unwrap();
    assert_eq!(content, Bytes::from_static(b"abcdefghij"));

    let ranges: Vec<_> = transport
        .sent()
        .iter()
        .map(|r| r.header("x-ms-range").unwrap_or_default().to_string())
        .collect();
    assert_eq!(ranges, vec!["bytes=100-109", "bytes=104-109", "bytes=106-109"]);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![(1, 104, Some(6), true), (2, 106, Some(4), true)]
    );
}

#[tokio::test]
async fn test_download_fails_when_blob_is_replaced() {
    init_logger();
    let transport = MockTransport::default();
    transport
        .reply_chunks(
            200,
            &[("content-length", "8"), ("etag", "\"old\"")],
            vec![Ok(Bytes::from_static(b"1234")), Err(broken())],
        )
        .reply(
            412,
            &[("x-ms-error-code", "ConditionNotMet")],
            "",
        );

    let mut resp = blob(&transport)
        .download(DownloadOptions::default())
        .await
        .unwrap();
    let body = resp.body();

    assert_eq!(
        body.next().await.unwrap().unwrap(),
        Bytes::from_static(b"1234")
    );
    let err = body.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContentChanged);
    assert!(body.next().await.is_none());
}

#[tokio::test]
async fn test_download_gives_up_after_max_retry_requests() {
    init_logger();
    let transport = MockTransport::default();
    transport.reply_chunks(
        200,
        &[("content-length", "4"), ("etag", "\"e\"")],
        vec![Ok(Bytes::from_static(b"ab")), Err(broken())],
    );

    let opts = DownloadOptions {
        retry_reader: RetryReaderOptions {
            max_retry_requests: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let err = blob(&transport).download_to_bytes(opts).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_download_as_async_read() {
    init_logger();
    let transport = MockTransport::default();
    transport.reply_chunks(
        200,
        &[("content-length", "11"), ("etag", "\"e\"")],
        vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"reader")),
        ],
    );

    let resp = blob(&transport)
        .download(DownloadOptions::default())
        .await
        .unwrap();
    assert_eq!(resp.properties.content_length, Some(11));

    let mut content = String::new();
    resp.into_body()
        .into_async_read()
        .read_to_string(&mut content)
        .await
        .unwrap();
    // Bytes past the announced length are dropped.
    assert_eq!(content, "hello reade");
}

#[tokio::test]
async fn test_download_observes_cancellation() {
    init_logger();
    let transport = MockTransport::default();
    transport.reply_chunks(
        200,
        &[("content-length", "8"), ("etag", "\"e\"")],
        vec![Ok(Bytes::from_static(b"1234")), Ok(Bytes::from_static(b"5678"))],
    );

    let token = CancellationToken::new();
    let client = blob(&transport).with_cancellation(token.clone());
    let mut resp = client.download(DownloadOptions::default()).await.unwrap();

    token.cancel();
    let err = resp.body().next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Canceled);

    let err = client
        .download(DownloadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Canceled);
    assert_eq!(transport.sent().len(), 1);
}
