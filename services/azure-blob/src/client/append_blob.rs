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

use super::BlobClient;
use crate::constants::X_MS_BLOB_TYPE;
use crate::models::{
    validate_metadata, AppendBlockResponse, BlobHttpHeaders, BlobType, CpkInfo,
    LeaseAccessConditions, Metadata, ModifiedAccessConditions, OperationResponse, UploadResponse,
};
use crate::request::BlobRequest;

/// Largest block of a single `Append Block`.
pub const MAX_APPEND_BLOCK_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct CreateAppendBlobOptions {
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
pub struct AppendBlockOptions {
    pub content_md5: Option<Vec<u8>>,
    /// Fail unless the blob is exactly this long before the append.
    pub append_position: Option<u64>,
    /// Fail if the append would grow the blob past this length.
    pub max_size: Option<u64>,
    pub cpk: Option<CpkInfo>,
    pub encryption_scope: Option<String>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

/// Client of an append blob: a blob that only grows at its end.
#[derive(Debug, Clone)]
pub struct AppendBlobClient {
    blob: BlobClient,
}

impl AppendBlobClient {
    pub(crate) fn from_blob(blob: BlobClient) -> Self {
        Self { blob }
    }

    pub fn url(&self) -> &Url {
        self.blob.url()
    }

    pub fn blob_client(&self) -> &BlobClient {
        &self.blob
    }

    /// Create an empty append blob, replacing any existing blob.
    pub async fn create(&self, options: CreateAppendBlobOptions) -> Result<UploadResponse> {
        validate_metadata(&options.metadata)?;

        let req = BlobRequest::put(self.url())
            .header(X_MS_BLOB_TYPE, BlobType::AppendBlob)
            .http_headers(&options.http_headers)
            .metadata(&options.metadata)
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        UploadResponse::from_headers(resp.headers())
    }

    pub async fn append_block(
        &self,
        body: Bytes,
        options: AppendBlockOptions,
    ) -> Result<AppendBlockResponse> {
        if body.is_empty() || body.len() > MAX_APPEND_BLOCK_BYTES {
            return Err(Error::request_invalid(format!(
                "append block must hold 1 to {MAX_APPEND_BLOCK_BYTES} bytes, got {}",
                body.len()
            )));
        }

        let req = BlobRequest::put(self.url())
            .query("comp", "appendblock")
            .header_opt("x-ms-blob-condition-appendpos", options.append_position)
            .header_opt("x-ms-blob-condition-maxsize", options.max_size)
            .content_md5(options.content_md5.as_deref())
            .encryption(options.cpk.as_ref(), options.encryption_scope.as_deref())
            .lease(&options.lease)
            .conditions(&options.conditions)
            .body(body);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        AppendBlockResponse::from_headers(resp.headers())
    }

    /// Make the blob read-only; later appends fail.
    pub async fn seal(
        &self,
        append_position: Option<u64>,
        lease: &LeaseAccessConditions,
        conditions: &ModifiedAccessConditions,
    ) -> Result<OperationResponse> {
        let req = BlobRequest::put(self.url())
            .query("comp", "seal")
            .header_opt("x-ms-blob-condition-appendpos", append_position)
            .lease(lease)
            .conditions(conditions);
        let resp = self.blob.pipeline().send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }
}
