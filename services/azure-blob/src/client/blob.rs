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

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use azblob_core::{Error, HttpBody, ProvideCredential, Result};
use bytes::Bytes;
use http::header::IF_MATCH;
use http::StatusCode;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{sign_url, AppendBlobClient, BlockBlobClient, LeaseClient, PageBlobClient};
use crate::models::xml::{from_xml, tags_to_xml, TagsXml};
use crate::models::{
    validate_metadata, AccessTier, BlobHttpHeaders, BlobProperties, CopyResponse, CpkInfo,
    DeleteSnapshotsOption, HttpRange, LeaseAccessConditions, Metadata, ModifiedAccessConditions,
    OperationResponse, RehydratePriority, SnapshotResponse,
};
use crate::pipeline::{ClientOptions, Pipeline};
use crate::request::BlobRequest;
use crate::retry_reader::{HttpGetterInfo, RangeGetter, RetryReader, RetryReaderOptions};
use crate::sas::BlobSasSignatureValues;
use crate::{BlobUrlParts, Credential};

/// User defined tags of a blob, kept sorted by key.
pub type BlobTags = BTreeMap<String, String>;

const MAX_TAGS: usize = 10;

/// Lease and conditions of a blob operation.
#[derive(Debug, Clone, Default)]
pub struct BlobAccessOptions {
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Part of the blob to read, the whole blob by default.
    pub range: HttpRange,
    /// Ask for the MD5 of the range; only valid for ranges up to 4 MiB.
    pub range_get_content_md5: bool,
    /// Key the blob was written with, if any; also sent when resuming.
    pub cpk: Option<CpkInfo>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
    /// How a broken body is resumed.
    pub retry_reader: RetryReaderOptions,
}

#[derive(Debug, Clone, Default)]
pub struct SetMetadataOptions {
    /// Key the blob was written with; metadata is encrypted with it too.
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct CreateSnapshotOptions {
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteBlobOptions {
    /// Required when deleting a blob that has snapshots.
    pub delete_snapshots: Option<DeleteSnapshotsOption>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct SetTierOptions {
    /// Priority of moving a blob out of the archive tier.
    pub rehydrate_priority: Option<RehydratePriority>,
    pub lease: LeaseAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct StartCopyOptions {
    /// Metadata of the destination; the source's metadata when empty.
    pub metadata: Metadata,
    pub tier: Option<AccessTier>,
    pub rehydrate_priority: Option<RehydratePriority>,
    /// Conditions on the source blob.
    pub source_conditions: ModifiedAccessConditions,
    /// Conditions on the destination blob.
    pub conditions: ModifiedAccessConditions,
    pub lease: LeaseAccessConditions,
}

/// Result of a download.
///
/// The body resumes on its own when the connection breaks, as long as the
/// blob keeps the ETag it had when the download started.
#[derive(Debug)]
pub struct DownloadResponse {
    pub status: StatusCode,
    pub properties: BlobProperties,
    body: RetryReader,
}

impl DownloadResponse {
    pub fn body(&mut self) -> &mut RetryReader {
        &mut self.body
    }

    pub fn into_body(self) -> RetryReader {
        self.body
    }
}

/// Issue the ranged GETs a [`RetryReader`] resumes with.
#[derive(Debug)]
struct BlobRangeGetter {
    url: Url,
    pipeline: Pipeline,
    lease: LeaseAccessConditions,
    cpk: Option<CpkInfo>,
}

#[async_trait]
impl RangeGetter for BlobRangeGetter {
    async fn get_range(&self, info: HttpGetterInfo) -> Result<http::Response<HttpBody>> {
        let req = BlobRequest::get(&self.url)
            .range(HttpRange::new(info.offset, info.count))?
            .lease(&self.lease)
            .encryption(self.cpk.as_ref(), None)
            .header_opt(IF_MATCH.as_str(), info.etag.as_deref());
        self.pipeline.send(req).await
    }
}

/// Client of a single blob, of any type.
#[derive(Debug, Clone)]
pub struct BlobClient {
    url: Url,
    pipeline: Pipeline,
}

impl BlobClient {
    /// Create a client for a blob url, anonymous when `credential` is
    /// `None`.
    pub fn new(url: &str, credential: Option<Credential>, options: ClientOptions) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            pipeline: Pipeline::new(credential, options)?,
        })
    }

    /// Create a client signing with whatever `provider` loads.
    pub fn with_provider(
        url: &str,
        provider: impl ProvideCredential<Credential = Credential>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            pipeline: Pipeline::with_provider(provider, options)?,
        })
    }

    pub(crate) fn from_parts(url: Url, pipeline: Pipeline) -> Self {
        Self { url, pipeline }
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self::from_parts(self.url.clone(), self.pipeline.with_cancellation(token))
    }

    /// A client of the given snapshot of this blob, or of the base blob when
    /// `snapshot` is empty.
    pub fn with_snapshot(&self, snapshot: &str) -> Result<Self> {
        let mut parts = BlobUrlParts::from_url(&self.url)?;
        parts.snapshot = Some(snapshot.to_string()).filter(|v| !v.is_empty());
        parts.version_id = None;
        Ok(Self::from_parts(parts.to_url()?, self.pipeline.clone()))
    }

    /// A client of the given version of this blob, or of the current version
    /// when `version_id` is empty.
    ///
    /// Reads and deletes through the returned client address that version
    /// only.
    pub fn with_version_id(&self, version_id: &str) -> Result<Self> {
        let mut parts = BlobUrlParts::from_url(&self.url)?;
        parts.version_id = Some(version_id.to_string()).filter(|v| !v.is_empty());
        parts.snapshot = None;
        Ok(Self::from_parts(parts.to_url()?, self.pipeline.clone()))
    }

    pub fn into_block_blob_client(self) -> BlockBlobClient {
        BlockBlobClient::from_blob(self)
    }

    pub fn into_page_blob_client(self) -> PageBlobClient {
        PageBlobClient::from_blob(self)
    }

    pub fn into_append_blob_client(self) -> AppendBlobClient {
        AppendBlobClient::from_blob(self)
    }

    /// A lease client for this blob, proposing a random lease id when
    /// `lease_id` is `None`.
    pub fn lease_client(&self, lease_id: Option<String>) -> LeaseClient {
        LeaseClient::for_blob(self.url.clone(), self.pipeline.clone(), lease_id)
    }

    /// Start reading the blob.
    ///
    /// The returned body is pinned to the ETag of this response: if the blob
    /// changes while a broken read is resumed, the body fails with
    /// `ContentChanged` instead of mixing two versions.
    pub async fn download(&self, options: DownloadOptions) -> Result<DownloadResponse> {
        if options.range_get_content_md5 && options.range.count.map_or(true, |c| c > 4 << 20) {
            return Err(Error::request_invalid(
                "range content md5 requires a range of at most 4 MiB",
            ));
        }

        let req = BlobRequest::get(&self.url)
            .range(options.range)?
            .header_opt(
                "x-ms-range-get-content-md5",
                options.range_get_content_md5.then_some("true"),
            )
            .encryption(options.cpk.as_ref(), None)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send(req).await?;

        let status = resp.status();
        let properties = BlobProperties::from_headers(resp.headers())?;
        let info = HttpGetterInfo {
            offset: options.range.offset,
            count: properties.content_length.or(options.range.count),
            etag: properties.etag.clone(),
        };
        let getter = Arc::new(BlobRangeGetter {
            url: self.url.clone(),
            pipeline: self.pipeline.clone(),
            lease: options.lease,
            cpk: options.cpk,
        });
        let body = RetryReader::new(resp.into_body(), info, getter, options.retry_reader)
            .with_cancellation(self.pipeline.cancellation().clone());

        Ok(DownloadResponse {
            status,
            properties,
            body,
        })
    }

    /// Download the requested range into memory.
    pub async fn download_to_bytes(&self, options: DownloadOptions) -> Result<Bytes> {
        self.download(options).await?.into_body().read_all().await
    }

    pub async fn get_properties(&self, options: BlobAccessOptions) -> Result<BlobProperties> {
        let req = BlobRequest::head(&self.url)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        BlobProperties::from_headers(resp.headers())
    }

    pub async fn delete(&self, options: DeleteBlobOptions) -> Result<OperationResponse> {
        let req = BlobRequest::delete(&self.url)
            .header_opt("x-ms-delete-snapshots", options.delete_snapshots)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// Restore a soft deleted blob and its snapshots.
    pub async fn undelete(&self) -> Result<OperationResponse> {
        let req = BlobRequest::put(&self.url).query("comp", "undelete");
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// Replace the HTTP properties of the blob; unset fields are cleared.
    pub async fn set_http_headers(
        &self,
        headers: &BlobHttpHeaders,
        options: BlobAccessOptions,
    ) -> Result<OperationResponse> {
        let req = BlobRequest::put(&self.url)
            .query("comp", "properties")
            .http_headers(headers)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// Replace all metadata of the blob.
    pub async fn set_metadata(
        &self,
        metadata: &Metadata,
        options: SetMetadataOptions,
    ) -> Result<OperationResponse> {
        validate_metadata(metadata)?;
        let req = BlobRequest::put(&self.url)
            .query("comp", "metadata")
            .metadata(metadata)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// Take a read-only snapshot, with `metadata` replacing the base blob's
    /// when not empty.
    pub async fn create_snapshot(
        &self,
        metadata: &Metadata,
        options: CreateSnapshotOptions,
    ) -> Result<SnapshotResponse> {
        validate_metadata(metadata)?;
        let req = BlobRequest::put(&self.url)
            .query("comp", "snapshot")
            .metadata(metadata)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        SnapshotResponse::from_headers(resp.headers())
    }

    pub async fn set_tier(
        &self,
        tier: AccessTier,
        options: SetTierOptions,
    ) -> Result<OperationResponse> {
        let req = BlobRequest::put(&self.url)
            .query("comp", "tier")
            .header("x-ms-access-tier", tier)
            .header_opt("x-ms-rehydrate-priority", options.rehydrate_priority)
            .lease(&options.lease);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// Start an asynchronous server side copy from `source`.
    ///
    /// Poll [`BlobClient::get_properties`] for the copy status.
    pub async fn start_copy_from_url(
        &self,
        source: &Url,
        options: StartCopyOptions,
    ) -> Result<CopyResponse> {
        validate_metadata(&options.metadata)?;
        let req = BlobRequest::put(&self.url)
            .header("x-ms-copy-source", source)
            .header_opt("x-ms-access-tier", options.tier)
            .header_opt("x-ms-rehydrate-priority", options.rehydrate_priority)
            .metadata(&options.metadata)
            .source_conditions(&options.source_conditions)
            .conditions(&options.conditions)
            .lease(&options.lease);
        let resp = self.pipeline.send_bytes(req).await?;
        CopyResponse::from_headers(resp.headers())
    }

    /// Abort a pending copy, leaving an empty destination blob.
    pub async fn abort_copy_from_url(
        &self,
        copy_id: &str,
        lease: &LeaseAccessConditions,
    ) -> Result<OperationResponse> {
        if copy_id.is_empty() {
            return Err(Error::request_invalid("copy id must not be empty"));
        }
        let req = BlobRequest::put(&self.url)
            .query("comp", "copy")
            .query("copyid", copy_id)
            .header("x-ms-copy-action", "abort")
            .lease(lease);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// Replace all tags of the blob, at most ten.
    pub async fn set_tags(&self, tags: &BlobTags) -> Result<OperationResponse> {
        if tags.len() > MAX_TAGS {
            return Err(Error::request_invalid(format!(
                "a blob carries at most {MAX_TAGS} tags, got {}",
                tags.len()
            )));
        }
        let req = BlobRequest::put(&self.url)
            .query("comp", "tags")
            .content_type("application/xml")
            .body(tags_to_xml(tags).into());
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    pub async fn get_tags(&self) -> Result<BlobTags> {
        let req = BlobRequest::get(&self.url).query("comp", "tags");
        let resp = self.pipeline.send_bytes(req).await?;
        let tags: TagsXml = from_xml(resp.body())?;
        Ok(tags
            .tag_set
            .tags
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect())
    }

    /// The blob url with a service SAS attached.
    ///
    /// Container, blob and snapshot of `values` are taken from the url.
    /// Requires a shared key credential.
    pub fn sas_url(&self, values: &BlobSasSignatureValues) -> Result<Url> {
        sign_url(&self.pipeline, &self.url, |parts, key| {
            BlobSasSignatureValues {
                container_name: parts.container_name.clone(),
                blob_name: parts.blob_name.clone(),
                snapshot: parts.snapshot.clone(),
                ..values.clone()
            }
            .sign(key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessTier, BlobType};
    use crate::pipeline::tests::{test_credential, test_options, ScriptedHttpSend};
    use crate::sas::BlobSasPermissions;
    use azblob_core::ErrorKind;
    use chrono::TimeZone;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://account.blob.core.windows.net/container/dir/blob.txt";

    fn client(http: &ScriptedHttpSend) -> BlobClient {
        BlobClient::new(URL, Some(test_credential()), test_options(http)).unwrap()
    }

    #[tokio::test]
    async fn test_download_resumes_with_if_match() {
        let http = ScriptedHttpSend::default();
        http.push_chunks(
            206,
            &[
                ("etag", "\"0x1\""),
                ("content-length", "10"),
                ("content-range", "bytes 100-109/200"),
                ("x-ms-blob-type", "BlockBlob"),
            ],
            vec![
                Ok(Bytes::from_static(b"0123")),
                Err(Error::transient("connection reset")),
            ],
        )
        .push(206, &[("etag", "\"0x1\"")], "456789");

        let mut resp = client(&http)
            .download(DownloadOptions {
                range: HttpRange::new(100, Some(10)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.properties.blob_type, Some(BlobType::BlockBlob));

        let mut data = Vec::new();
        while let Some(chunk) = resp.body().next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, b"0123456789");

        let requests = http.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].headers["x-ms-range"], "bytes=100-109");
        assert_eq!(requests[1].headers["x-ms-range"], "bytes=104-109");
        assert_eq!(requests[1].headers["if-match"], "\"0x1\"");
    }

    #[tokio::test]
    async fn test_download_resumes_with_encryption_key() {
        let http = ScriptedHttpSend::default();
        http.push_chunks(
            200,
            &[("etag", "\"0x1\""), ("content-length", "4")],
            vec![
                Ok(Bytes::from_static(b"ab")),
                Err(Error::transient("connection reset")),
            ],
        )
        .push(206, &[("etag", "\"0x1\"")], "cd");
        let cpk = CpkInfo::new(&[4u8; 32]);

        let data = client(&http)
            .download_to_bytes(DownloadOptions {
                cpk: Some(cpk.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(data.as_ref(), b"abcd");

        let requests = http.requests();
        assert_eq!(requests.len(), 2);
        for req in &requests {
            assert_eq!(req.headers["x-ms-encryption-key"], cpk.encryption_key);
            assert_eq!(req.headers["x-ms-encryption-algorithm"], "AES256");
        }
    }

    #[tokio::test]
    async fn test_metadata_and_snapshot_carry_encryption() {
        let http = ScriptedHttpSend::default();
        http.push(200, &[], "")
            .push(201, &[("x-ms-snapshot", "2022-03-01T08:12:34.0000000Z")], "");
        let c = client(&http);
        let cpk = CpkInfo::new(&[5u8; 32]);
        let metadata = Metadata::from([("owner".to_string(), "ops".to_string())]);

        c.set_metadata(
            &metadata,
            SetMetadataOptions {
                cpk: Some(cpk.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("comp=metadata"));
        assert_eq!(req.headers["x-ms-meta-owner"], "ops");
        assert_eq!(req.headers["x-ms-encryption-key"], cpk.encryption_key);

        let snapshot = c
            .create_snapshot(
                &Metadata::new(),
                CreateSnapshotOptions {
                    encryption_scope: Some("scope-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            snapshot.snapshot.as_deref(),
            Some("2022-03-01T08:12:34.0000000Z")
        );
        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("comp=snapshot"));
        assert_eq!(req.headers["x-ms-encryption-scope"], "scope-1");
    }

    #[tokio::test]
    async fn test_download_detects_changed_blob() {
        let http = ScriptedHttpSend::default();
        http.push_chunks(
            200,
            &[("etag", "\"0x1\""), ("content-length", "8")],
            vec![
                Ok(Bytes::from_static(b"abcd")),
                Err(Error::transient("connection reset")),
            ],
        )
        .push(
            412,
            &[("x-ms-error-code", "ConditionNotMet")],
            "",
        );

        let err = client(&http)
            .download_to_bytes(DownloadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContentChanged);
    }

    #[tokio::test]
    async fn test_download_to_bytes() {
        let http = ScriptedHttpSend::default();
        http.push(200, &[("etag", "\"0x1\""), ("content-length", "5")], "hello");

        let data = client(&http)
            .download_to_bytes(DownloadOptions::default())
            .await
            .unwrap();
        assert_eq!(data.as_ref(), b"hello");
        assert!(!http.last_request().headers.contains_key("x-ms-range"));
    }

    #[tokio::test]
    async fn test_empty_or_overflowing_range_is_not_sent() {
        let http = ScriptedHttpSend::default();
        http.push(206, &[("etag", "\"0x1\""), ("content-length", "1")], "a");
        let c = client(&http);

        for range in [HttpRange::new(10, Some(0)), HttpRange::new(u64::MAX, Some(2))] {
            let err = c
                .download_to_bytes(DownloadOptions {
                    range,
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        }
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_range_md5_needs_small_range() {
        let http = ScriptedHttpSend::default();
        let err = client(&http)
            .download(DownloadOptions {
                range_get_content_md5: true,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[tokio::test]
    async fn test_set_tier_and_delete() {
        let http = ScriptedHttpSend::default();
        http.push(200, &[], "").push(202, &[], "");
        let c = client(&http);

        c.set_tier(AccessTier::Archive, SetTierOptions::default())
            .await
            .unwrap();
        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("comp=tier"));
        assert_eq!(req.headers["x-ms-access-tier"], "Archive");

        c.delete(DeleteBlobOptions {
            delete_snapshots: Some(DeleteSnapshotsOption::Include),
            lease: LeaseAccessConditions::new("lease-1"),
            ..Default::default()
        })
        .await
        .unwrap();
        let req = http.last_request();
        assert_eq!(req.method, http::Method::DELETE);
        assert_eq!(req.headers["x-ms-delete-snapshots"], "include");
        assert_eq!(req.headers["x-ms-lease-id"], "lease-1");
    }

    #[tokio::test]
    async fn test_tags() {
        let http = ScriptedHttpSend::default();
        http.push(204, &[], "").push(
            200,
            &[],
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Tags><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag></TagSet></Tags>",
        );
        let c = client(&http);

        let tags = BlobTags::from([("env".to_string(), "prod".to_string())]);
        c.set_tags(&tags).await.unwrap();
        assert!(String::from_utf8(http.last_request().body.to_vec())
            .unwrap()
            .contains("<Tag><Key>env</Key><Value>prod</Value></Tag>"));

        assert_eq!(c.get_tags().await.unwrap(), tags);
    }

    #[tokio::test]
    async fn test_copy() {
        let http = ScriptedHttpSend::default();
        http.push(
            202,
            &[("x-ms-copy-id", "copy-1"), ("x-ms-copy-status", "pending")],
            "",
        )
        .push(204, &[], "");
        let c = client(&http);

        let source = Url::parse("https://other.blob.core.windows.net/c/src").unwrap();
        let resp = c
            .start_copy_from_url(&source, StartCopyOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.copy_id.as_deref(), Some("copy-1"));
        assert_eq!(
            http.last_request().headers["x-ms-copy-source"],
            "https://other.blob.core.windows.net/c/src"
        );

        c.abort_copy_from_url("copy-1", &LeaseAccessConditions::default())
            .await
            .unwrap();
        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("comp=copy&copyid=copy-1"));
        assert_eq!(req.headers["x-ms-copy-action"], "abort");
    }

    #[test]
    fn test_with_snapshot() {
        let http = ScriptedHttpSend::default();
        let c = client(&http)
            .with_snapshot("2011-03-09T01:42:34.9360000Z")
            .unwrap();
        assert_eq!(
            c.url().as_str(),
            "https://account.blob.core.windows.net/container/dir/blob.txt?snapshot=2011-03-09T01%3A42%3A34.9360000Z"
        );

        let base = c.with_snapshot("").unwrap();
        assert_eq!(base.url().as_str(), URL);
    }

    #[tokio::test]
    async fn test_delete_version() {
        let http = ScriptedHttpSend::default();
        http.push(202, &[], "");
        let version = client(&http)
            .with_snapshot("2011-03-09T01:42:34.9360000Z")
            .unwrap()
            .with_version_id("2022-03-01T08:12:34.1234567Z")
            .unwrap();

        version.delete(DeleteBlobOptions::default()).await.unwrap();
        let req = http.last_request();
        assert_eq!(req.method, http::Method::DELETE);
        assert_eq!(
            req.uri.query(),
            Some("versionid=2022-03-01T08%3A12%3A34.1234567Z")
        );

        let current = version.with_version_id("").unwrap();
        assert_eq!(current.url().as_str(), URL);
    }

    #[test]
    fn test_sas_url() {
        let http = ScriptedHttpSend::default();
        let expiry = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        let values = BlobSasSignatureValues::for_blob(
            "",
            "",
            "r".parse::<BlobSasPermissions>().unwrap(),
            expiry,
        );

        let url = client(&http).sas_url(&values).unwrap();
        assert_eq!(url.path(), "/container/dir/blob.txt");
        assert!(url.query().unwrap().contains("&sr=b&sp=r&sig="));
    }
}
