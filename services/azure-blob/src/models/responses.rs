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

//! Typed results of blob service operations.
//!
//! Most operations answer with headers only; the XML bodies are decoded in
//! [`super::xml`] and folded in here.

use std::fmt::Display;
use std::str::FromStr;

use azblob_core::hash::base64_decode;
use azblob_core::time::{parse_http_date, DateTime};
use azblob_core::{Error, Result};
use http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use http::HeaderMap;
use serde::Deserialize;

use super::xml::{BlockListXml, PageListXml};
use super::{
    AccessTier, AccountKind, BlobType, CopyStatus, LeaseDuration, LeaseState, LeaseStatus,
    Metadata, PublicAccessType, SignedIdentifier, SkuName,
};
use crate::constants::*;

/// Read typed values out of response headers.
///
/// Missing or empty headers are `None`; present but malformed ones are an
/// error, never silently dropped.
pub(crate) struct HeaderReader<'a> {
    headers: &'a HeaderMap,
}

impl<'a> HeaderReader<'a> {
    pub(crate) fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }

    pub(crate) fn string(&self, name: impl http::header::AsHeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    pub(crate) fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(name) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|e| {
                Error::unexpected(format!("header {name} has invalid value '{v}': {e}"))
            }),
        }
    }

    pub(crate) fn date(&self, name: impl http::header::AsHeaderName) -> Result<Option<DateTime>> {
        self.string(name).map(|v| parse_http_date(&v)).transpose()
    }

    pub(crate) fn base64(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.string(name).map(|v| base64_decode(&v)).transpose()
    }

    pub(crate) fn etag(&self) -> Option<String> {
        self.string(ETAG)
    }

    pub(crate) fn last_modified(&self) -> Result<Option<DateTime>> {
        self.date(LAST_MODIFIED)
    }

    pub(crate) fn request_id(&self) -> Option<String> {
        self.string(X_MS_REQUEST_ID)
    }

    /// Every `x-ms-meta-*` header, with the prefix stripped.
    pub(crate) fn metadata(&self) -> Metadata {
        self.headers
            .iter()
            .filter_map(|(k, v)| {
                let key = k.as_str().strip_prefix(X_MS_META_PREFIX)?;
                let value = v.to_str().ok()?;
                Some((key.to_string(), value.to_string()))
            })
            .collect()
    }
}

/// A block of a block blob.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    /// Base64 encoded block id.
    pub name: String,
    pub size: u64,
}

/// An inclusive byte range of a page blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
}

/// Result of operations that only report the target's new identity.
#[derive(Debug, Clone, Default)]
pub struct OperationResponse {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub request_id: Option<String>,
}

impl OperationResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            etag: h.etag(),
            last_modified: h.last_modified()?,
            request_id: h.request_id(),
        })
    }
}

/// Result of writing a whole blob: upload, commit or create.
#[derive(Debug, Clone, Default)]
pub struct UploadResponse {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub content_md5: Option<Vec<u8>>,
    pub version_id: Option<String>,
    pub request_server_encrypted: Option<bool>,
    /// Hash of the client provided key the data was encrypted with.
    pub encryption_key_sha256: Option<String>,
    pub encryption_scope: Option<String>,
    pub request_id: Option<String>,
}

impl UploadResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            etag: h.etag(),
            last_modified: h.last_modified()?,
            content_md5: h.base64(CONTENT_MD5)?,
            version_id: h.string("x-ms-version-id"),
            request_server_encrypted: h.parse("x-ms-request-server-encrypted")?,
            encryption_key_sha256: h.string(X_MS_ENCRYPTION_KEY_SHA256),
            encryption_scope: h.string(X_MS_ENCRYPTION_SCOPE),
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageBlockResponse {
    pub content_md5: Option<Vec<u8>>,
    pub request_server_encrypted: Option<bool>,
    pub request_id: Option<String>,
}

impl StageBlockResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            content_md5: h.base64(CONTENT_MD5)?,
            request_server_encrypted: h.parse("x-ms-request-server-encrypted")?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppendBlockResponse {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub content_md5: Option<Vec<u8>>,
    /// Offset at which the block was appended.
    pub append_offset: Option<u64>,
    pub committed_block_count: Option<u32>,
    pub request_id: Option<String>,
}

impl AppendBlockResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            etag: h.etag(),
            last_modified: h.last_modified()?,
            content_md5: h.base64(CONTENT_MD5)?,
            append_offset: h.parse("x-ms-blob-append-offset")?,
            committed_block_count: h.parse("x-ms-blob-committed-block-count")?,
            request_id: h.request_id(),
        })
    }
}

/// Result of page writes and of page blob resizes.
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub content_md5: Option<Vec<u8>>,
    pub blob_sequence_number: Option<i64>,
    pub request_id: Option<String>,
}

impl PageResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            etag: h.etag(),
            last_modified: h.last_modified()?,
            content_md5: h.base64(CONTENT_MD5)?,
            blob_sequence_number: h.parse("x-ms-blob-sequence-number")?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotResponse {
    /// Opaque snapshot id, pass it to `BlobClient::with_snapshot`.
    pub snapshot: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub request_id: Option<String>,
}

impl SnapshotResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            snapshot: h.string("x-ms-snapshot"),
            etag: h.etag(),
            last_modified: h.last_modified()?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CopyResponse {
    pub copy_id: Option<String>,
    pub copy_status: Option<CopyStatus>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub request_id: Option<String>,
}

impl CopyResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            copy_id: h.string("x-ms-copy-id"),
            copy_status: h.parse("x-ms-copy-status")?,
            etag: h.etag(),
            last_modified: h.last_modified()?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeaseResponse {
    pub lease_id: Option<String>,
    /// Seconds until a broken lease expires.
    pub lease_time: Option<u32>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub request_id: Option<String>,
}

impl LeaseResponse {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            lease_id: h.string(X_MS_LEASE_ID),
            lease_time: h.parse("x-ms-lease-time")?,
            etag: h.etag(),
            last_modified: h.last_modified()?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountInfo {
    pub sku_name: Option<SkuName>,
    pub account_kind: Option<AccountKind>,
    pub request_id: Option<String>,
}

impl AccountInfo {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            sku_name: h.parse("x-ms-sku-name")?,
            account_kind: h.parse("x-ms-account-kind")?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerProperties {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub metadata: Metadata,
    pub lease_status: Option<LeaseStatus>,
    pub lease_state: Option<LeaseState>,
    pub lease_duration: Option<LeaseDuration>,
    pub public_access: Option<PublicAccessType>,
    pub has_immutability_policy: Option<bool>,
    pub has_legal_hold: Option<bool>,
    pub request_id: Option<String>,
}

impl ContainerProperties {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            etag: h.etag(),
            last_modified: h.last_modified()?,
            metadata: h.metadata(),
            lease_status: h.parse("x-ms-lease-status")?,
            lease_state: h.parse("x-ms-lease-state")?,
            lease_duration: h.parse("x-ms-lease-duration")?,
            public_access: h.parse("x-ms-blob-public-access")?,
            has_immutability_policy: h.parse("x-ms-has-immutability-policy")?,
            has_legal_hold: h.parse("x-ms-has-legal-hold")?,
            request_id: h.request_id(),
        })
    }
}

/// Properties of a blob, as returned by `Get Blob Properties` and
/// `Get Blob`.
#[derive(Debug, Clone, Default)]
pub struct BlobProperties {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub creation_time: Option<DateTime>,
    pub metadata: Metadata,
    pub blob_type: Option<BlobType>,
    /// Size of the returned body, the whole blob for `Get Blob Properties`.
    pub content_length: Option<u64>,
    /// `bytes start-end/total` for ranged reads.
    pub content_range: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub content_md5: Option<Vec<u8>>,
    pub blob_sequence_number: Option<i64>,
    pub committed_block_count: Option<u32>,
    pub access_tier: Option<AccessTier>,
    pub access_tier_inferred: Option<bool>,
    pub lease_status: Option<LeaseStatus>,
    pub lease_state: Option<LeaseState>,
    pub lease_duration: Option<LeaseDuration>,
    pub copy_id: Option<String>,
    pub copy_status: Option<CopyStatus>,
    pub copy_source: Option<String>,
    pub copy_progress: Option<String>,
    pub server_encrypted: Option<bool>,
    pub encryption_key_sha256: Option<String>,
    pub encryption_scope: Option<String>,
    pub version_id: Option<String>,
    /// Whether this is the current version of a versioned blob.
    pub is_current_version: Option<bool>,
    pub tag_count: Option<u32>,
    pub is_sealed: Option<bool>,
    pub request_id: Option<String>,
}

impl BlobProperties {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            etag: h.etag(),
            last_modified: h.last_modified()?,
            creation_time: h.date("x-ms-creation-time")?,
            metadata: h.metadata(),
            blob_type: h.parse(X_MS_BLOB_TYPE)?,
            content_length: h.parse(CONTENT_LENGTH.as_str())?,
            content_range: h.string(CONTENT_RANGE),
            content_type: h.string(CONTENT_TYPE),
            content_encoding: h.string(CONTENT_ENCODING),
            content_language: h.string(CONTENT_LANGUAGE),
            content_disposition: h.string(CONTENT_DISPOSITION),
            cache_control: h.string(CACHE_CONTROL),
            content_md5: h.base64(CONTENT_MD5)?,
            blob_sequence_number: h.parse("x-ms-blob-sequence-number")?,
            committed_block_count: h.parse("x-ms-blob-committed-block-count")?,
            access_tier: h.parse("x-ms-access-tier")?,
            access_tier_inferred: h.parse("x-ms-access-tier-inferred")?,
            lease_status: h.parse("x-ms-lease-status")?,
            lease_state: h.parse("x-ms-lease-state")?,
            lease_duration: h.parse("x-ms-lease-duration")?,
            copy_id: h.string("x-ms-copy-id"),
            copy_status: h.parse("x-ms-copy-status")?,
            copy_source: h.string("x-ms-copy-source"),
            copy_progress: h.string("x-ms-copy-progress"),
            server_encrypted: h.parse("x-ms-server-encrypted")?,
            encryption_key_sha256: h.string(X_MS_ENCRYPTION_KEY_SHA256),
            encryption_scope: h.string(X_MS_ENCRYPTION_SCOPE),
            version_id: h.string("x-ms-version-id"),
            is_current_version: h.parse("x-ms-is-current-version")?,
            tag_count: h.parse("x-ms-tag-count")?,
            is_sealed: h.parse("x-ms-blob-sealed")?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockList {
    pub committed_blocks: Vec<Block>,
    pub uncommitted_blocks: Vec<Block>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub blob_content_length: Option<u64>,
    pub request_id: Option<String>,
}

impl BlockList {
    pub(crate) fn from_parts(headers: &HeaderMap, body: BlockListXml) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            committed_blocks: body.committed_blocks.blocks,
            uncommitted_blocks: body.uncommitted_blocks.blocks,
            etag: h.etag(),
            last_modified: h.last_modified()?,
            blob_content_length: h.parse("x-ms-blob-content-length")?,
            request_id: h.request_id(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageList {
    pub page_ranges: Vec<PageRange>,
    pub clear_ranges: Vec<PageRange>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub blob_content_length: Option<u64>,
    pub request_id: Option<String>,
}

impl PageList {
    pub(crate) fn from_parts(headers: &HeaderMap, body: PageListXml) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            page_ranges: body.page_ranges,
            clear_ranges: body.clear_ranges,
            etag: h.etag(),
            last_modified: h.last_modified()?,
            blob_content_length: h.parse("x-ms-blob-content-length")?,
            request_id: h.request_id(),
        })
    }
}

/// Public access level and stored access policies of a container.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicyResponse {
    pub public_access: Option<PublicAccessType>,
    pub signed_identifiers: Vec<SignedIdentifier>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime>,
    pub request_id: Option<String>,
}

impl AccessPolicyResponse {
    pub(crate) fn from_parts(
        headers: &HeaderMap,
        signed_identifiers: Vec<SignedIdentifier>,
    ) -> Result<Self> {
        let h = HeaderReader::new(headers);
        Ok(Self {
            public_access: h.parse("x-ms-blob-public-access")?,
            signed_identifiers,
            etag: h.etag(),
            last_modified: h.last_modified()?,
            request_id: h.request_id(),
        })
    }
}
