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

use azblob_core::hash::base64_decode;
use azblob_core::{Error, Result};
use bytes::Bytes;
use url::Url;

use super::BlobClient;
use crate::constants::X_MS_BLOB_TYPE;
use crate::models::xml::{block_list_to_xml, from_xml, BlockListXml};
use crate::models::{
    validate_metadata, AccessTier, BlobHttpHeaders, BlobType, BlockList, BlockListType,
    BlockLookup, CpkInfo, HttpRange, LeaseAccessConditions, Metadata, ModifiedAccessConditions,
    StageBlockResponse, UploadResponse,
};
use crate::request::BlobRequest;

/// Largest body of a single `Put Blob`.
pub const MAX_UPLOAD_BLOB_BYTES: usize = 256 * 1024 * 1024;
/// Largest block of a `Put Block`.
pub const MAX_STAGE_BLOCK_BYTES: usize = 100 * 1024 * 1024;
/// Committed blocks of one blob.
const MAX_BLOCKS: usize = 50_000;
/// Decoded length of a block id.
const MAX_BLOCK_ID_BYTES: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct UploadBlockBlobOptions {
    pub http_headers: BlobHttpHeaders,
    pub metadata: Metadata,
    pub tier: Option<AccessTier>,
    /// MD5 of the body, checked by the service on arrival.
    pub content_md5: Option<Vec<u8>>,
    /// Encrypt the data with a key the caller holds.
    pub cpk: Option<CpkInfo>,
    /// Encrypt the data with a scope defined on the account.
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct StageBlockOptions {
    pub content_md5: Option<Vec<u8>>,
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct StageBlockFromUrlOptions {
    /// Part of the source to copy, the whole source by default.
    pub source_range: HttpRange,
    pub source_content_md5: Option<Vec<u8>>,
    pub source_conditions: ModifiedAccessConditions,
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct CommitBlockListOptions {
    pub http_headers: BlobHttpHeaders,
    pub metadata: Metadata,
    pub tier: Option<AccessTier>,
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

/// Client of a block blob: a blob assembled from blocks of up to 100 MiB.
#[derive(Debug, Clone)]
pub struct BlockBlobClient {
    blob: BlobClient,
}

impl BlockBlobClient {
    pub(crate) fn from_blob(blob: BlobClient) -> Self {
        Self { blob }
    }

    pub fn url(&self) -> &Url {
        self.blob.url()
    }

    /// The generic blob operations of this blob.
    pub fn blob_client(&self) -> &BlobClient {
        &self.blob
    }

    /// Create or replace the blob with `body` in a single request.
    pub async fn upload(
        &self,
        body: Bytes,
        options: UploadBlockBlobOptions,
    ) -> Result<UploadResponse> {
        if body.len() > MAX_UPLOAD_BLOB_BYTES {
            return Err(Error::request_invalid(format!(
                "upload body of {} bytes exceeds {MAX_UPLOAD_BLOB_BYTES}, stage blocks instead",
                body.len()
            )));
        }
        validate_metadata(&options.metadata)?;

        let req = BlobRequest::put(self.url())
            .header(X_MS_BLOB_TYPE, BlobType::BlockBlob)
            .header_opt("x-ms-access-tier", options.tier)
            .content_md5(options.content_md5.as_deref())
            .http_headers(&options.http_headers)
            .metadata(&options.metadata)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions)
            .body(body);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        UploadResponse::from_headers(resp.headers())
    }

    /// Upload a block that becomes part of the blob once committed.
    pub async fn stage_block(
        &self,
        block_id: &str,
        body: Bytes,
        options: StageBlockOptions,
    ) -> Result<StageBlockResponse> {
        validate_block_ids([block_id])?;
        if body.is_empty() || body.len() > MAX_STAGE_BLOCK_BYTES {
            return Err(Error::request_invalid(format!(
                "block must hold 1 to {MAX_STAGE_BLOCK_BYTES} bytes, got {}",
                body.len()
            )));
        }

        let req = BlobRequest::put(self.url())
            .query("comp", "block")
            .query("blockid", block_id)
            .content_md5(options.content_md5.as_deref())
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .body(body);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        StageBlockResponse::from_headers(resp.headers())
    }

    /// Stage a block whose content the service reads from `source`.
    ///
    /// `source` must be public or carry a SAS.
    pub async fn stage_block_from_url(
        &self,
        block_id: &str,
        source: &Url,
        options: StageBlockFromUrlOptions,
    ) -> Result<StageBlockResponse> {
        validate_block_ids([block_id])?;

        let req = BlobRequest::put(self.url())
            .query("comp", "block")
            .query("blockid", block_id)
            .header("x-ms-copy-source", source)
            .header_opt("x-ms-source-range", options.source_range.format()?)
            .header_opt(
                "x-ms-source-content-md5",
                options
                    .source_content_md5
                    .as_deref()
                    .map(azblob_core::hash::base64_encode),
            )
            .source_conditions(&options.source_conditions)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        StageBlockResponse::from_headers(resp.headers())
    }

    /// Write the blob from staged and committed blocks, in this order.
    pub async fn commit_block_list(
        &self,
        blocks: &[BlockLookup],
        options: CommitBlockListOptions,
    ) -> Result<UploadResponse> {
        if blocks.len() > MAX_BLOCKS {
            return Err(Error::request_invalid(format!(
                "a blob holds at most {MAX_BLOCKS} blocks, got {}",
                blocks.len()
            )));
        }
        validate_block_ids(blocks.iter().map(BlockLookup::id))?;
        validate_metadata(&options.metadata)?;

        let req = BlobRequest::put(self.url())
            .query("comp", "blocklist")
            .header_opt("x-ms-access-tier", options.tier)
            .http_headers(&options.http_headers)
            .metadata(&options.metadata)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions)
            .content_type("application/xml")
            .body(block_list_to_xml(blocks).into());
        let resp = self.blob.pipeline().send_bytes(req).await?;
        UploadResponse::from_headers(resp.headers())
    }

    pub async fn get_block_list(
        &self,
        list_type: BlockListType,
        lease: &LeaseAccessConditions,
    ) -> Result<BlockList> {
        let req = BlobRequest::get(self.url())
            .query("comp", "blocklist")
            .query("blocklisttype", list_type)
            .lease(lease);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        let body: BlockListXml = from_xml(resp.body())?;
        BlockList::from_parts(resp.headers(), body)
    }
}

/// Block ids must be base64 and, within one blob, of the same length.
fn validate_block_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut expected_len = None;
    for id in ids {
        let decoded = base64_decode(id).map_err(|e| {
            Error::request_invalid(format!("block id '{id}' is not base64")).with_source(e)
        })?;
        if decoded.is_empty() || decoded.len() > MAX_BLOCK_ID_BYTES {
            return Err(Error::request_invalid(format!(
                "block id '{id}' must decode to 1 to {MAX_BLOCK_ID_BYTES} bytes"
            )));
        }
        match expected_len {
            None => expected_len = Some(id.len()),
            Some(len) if len != id.len() => {
                return Err(Error::request_invalid(format!(
                    "block ids of one blob must have the same length, '{id}' differs"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
