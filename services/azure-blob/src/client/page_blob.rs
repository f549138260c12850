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

use azblob_core::{Error, Result};
use bytes::Bytes;
use url::Url;

use super::{BlobAccessOptions, BlobClient};
use crate::constants::X_MS_BLOB_TYPE;
use crate::models::xml::{from_xml, PageListXml};
use crate::models::{
    validate_metadata, BlobHttpHeaders, BlobType, CpkInfo, HttpRange, LeaseAccessConditions,
    Metadata, ModifiedAccessConditions, PageList, PageResponse, SequenceNumberAction, UploadResponse,
};
use crate::request::BlobRequest;

/// Page blobs are written in units of this many bytes.
pub const PAGE_SIZE: u64 = 512;
/// Largest body of a single `Put Page`.
const MAX_UPLOAD_PAGES_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct CreatePageBlobOptions {
    /// Initial sequence number, `0` when unset.
    pub sequence_number: Option<i64>,
    pub http_headers: BlobHttpHeaders,
    pub metadata: Metadata,
    /// Encrypt the data with a key the caller holds.
    pub cpk: Option<CpkInfo>,
    /// Encrypt the data with a scope defined on the account.
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct UploadPagesOptions {
    pub content_md5: Option<Vec<u8>>,
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

/// Client of a page blob: a sparse blob of 512-byte pages, written at random
/// offsets.
#[derive(Debug, Clone)]
pub struct PageBlobClient {
    blob: BlobClient,
}

impl PageBlobClient {
    pub(crate) fn from_blob(blob: BlobClient) -> Self {
        Self { blob }
    }

    pub fn url(&self) -> &Url {
        self.blob.url()
    }

    pub fn blob_client(&self) -> &BlobClient {
        &self.blob
    }

    /// Create an empty page blob of `size` bytes, replacing any existing blob.
    pub async fn create(&self, size: u64, options: CreatePageBlobOptions) -> Result<UploadResponse> {
        check_aligned("size", size)?;
        validate_metadata(&options.metadata)?;

        let req = BlobRequest::put(self.url())
            .header(X_MS_BLOB_TYPE, BlobType::PageBlob)
            .header("x-ms-blob-content-length", size)
            .header_opt("x-ms-blob-sequence-number", options.sequence_number)
            .http_headers(&options.http_headers)
            .metadata(&options.metadata)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        UploadResponse::from_headers(resp.headers())
    }

    /// Write `body` at `offset`; both must be page aligned.
    pub async fn upload_pages(
        &self,
        offset: u64,
        body: Bytes,
        options: UploadPagesOptions,
    ) -> Result<PageResponse> {
        let len = body.len() as u64;
        check_aligned("offset", offset)?;
        check_aligned("body length", len)?;
        if len == 0 || len > MAX_UPLOAD_PAGES_BYTES {
            return Err(Error::request_invalid(format!(
                "pages must hold 1 to {MAX_UPLOAD_PAGES_BYTES} bytes, got {len}"
            )));
        }

        let req = BlobRequest::put(self.url())
            .query("comp", "page")
            .header("x-ms-page-write", "update")
            .range(HttpRange::new(offset, Some(len)))?
            .content_md5(options.content_md5.as_deref())
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions)
            .body(body);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        PageResponse::from_headers(resp.headers())
    }

    /// Free the pages of `range`, which must be page aligned and bounded.
    pub async fn clear_pages(
        &self,
        range: HttpRange,
        options: BlobAccessOptions,
    ) -> Result<PageResponse> {
        check_range(range)?;

        let req = BlobRequest::put(self.url())
            .query("comp", "page")
            .header("x-ms-page-write", "clear")
            .range(range)?
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        PageResponse::from_headers(resp.headers())
    }

    /// Valid and cleared page ranges within `range`.
    pub async fn get_page_ranges(
        &self,
        range: HttpRange,
        options: BlobAccessOptions,
    ) -> Result<PageList> {
        let req = BlobRequest::get(self.url())
            .query("comp", "pagelist")
            .range(range)?
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        let body: PageListXml = from_xml(resp.body())?;
        PageList::from_parts(resp.headers(), body)
    }

    /// Grow or shrink the blob to `size` bytes.
    pub async fn resize(&self, size: u64, options: BlobAccessOptions) -> Result<PageResponse> {
        check_aligned("size", size)?;

        let req = BlobRequest::put(self.url())
            .query("comp", "properties")
            .header("x-ms-blob-content-length", size)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        PageResponse::from_headers(resp.headers())
    }

    /// Change the sequence number.
    ///
    /// `max` and `update` need a `sequence_number`; `increment` must not
    /// carry one.
    pub async fn update_sequence_number(
        &self,
        action: SequenceNumberAction,
        sequence_number: Option<i64>,
        options: BlobAccessOptions,
    ) -> Result<PageResponse> {
        match (action, sequence_number) {
            (SequenceNumberAction::Increment, Some(_)) => {
                return Err(Error::request_invalid(
                    "increment doesn't take a sequence number",
                ))
            }
            (SequenceNumberAction::Max | SequenceNumberAction::Update, None) => {
                return Err(Error::request_invalid(format!(
                    "{action} requires a sequence number"
                )))
            }
            (_, Some(n)) if n < 0 => {
                return Err(Error::request_invalid(format!(
                    "sequence number must not be negative, got {n}"
                )))
            }
            _ => {}
        }

        let req = BlobRequest::put(self.url())
            .query("comp", "properties")
            .header("x-ms-sequence-number-action", action)
            .header_opt("x-ms-blob-sequence-number", sequence_number)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        PageResponse::from_headers(resp.headers())
    }
}

fn check_aligned(what: &str, v: u64) -> Result<()> {
    if v % PAGE_SIZE != 0 {
        return Err(Error::request_invalid(format!(
            "{what} {v} is not a multiple of {PAGE_SIZE}"
        )));
    }
    Ok(())
}

/// A page range must be aligned and bounded.
fn check_range(range: HttpRange) -> Result<()> {
    let count = range
        .count
        .filter(|c| *c > 0)
        .ok_or_else(|| Error::request_invalid("page range must have a length"))?;
    check_aligned("range offset", range.offset)?;
    check_aligned("range length", count)
}
