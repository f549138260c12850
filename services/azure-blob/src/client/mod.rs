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

//! Typed clients for the service, containers, blobs and leases.
//!
//! Clients are cheap to clone. Every client derived from another shares its
//! pipeline, so credentials, retry options and cancellation carry over.

use azblob_core::{Error, Result};
use url::Url;

use crate::pipeline::Pipeline;
use crate::sas::SasQueryParameters;
use crate::{BlobUrlParts, SharedKeyCredential};

mod service;
pub use service::{
    CreateContainerOptions, DeleteContainerOptions, ListContainersOptions, ServiceClient,
};

mod container;
pub use container::{
    ContainerAccessOptions, ContainerClient, ListBlobsOptions, SetAccessPolicyOptions,
};

mod blob;
pub use blob::{
    BlobAccessOptions, BlobClient, BlobTags, CreateSnapshotOptions, DeleteBlobOptions,
    DownloadOptions, DownloadResponse, SetMetadataOptions, SetTierOptions, StartCopyOptions,
};

mod block_blob;
pub use block_blob::{
    BlockBlobClient, CommitBlockListOptions, StageBlockFromUrlOptions, StageBlockOptions,
    UploadBlockBlobOptions, MAX_STAGE_BLOCK_BYTES, MAX_UPLOAD_BLOB_BYTES,
};

mod page_blob;
pub use page_blob::{CreatePageBlobOptions, PageBlobClient, UploadPagesOptions, PAGE_SIZE};

mod append_blob;
pub use append_blob::{
    AppendBlobClient, AppendBlockOptions, CreateAppendBlobOptions, MAX_APPEND_BLOCK_BYTES,
};

mod lease;
pub use lease::LeaseClient;

/// Sign a SAS for `url` with the pipeline's account key and attach it.
fn sign_url(
    pipeline: &Pipeline,
    url: &Url,
    sign: impl FnOnce(&BlobUrlParts, &SharedKeyCredential) -> Result<SasQueryParameters>,
) -> Result<Url> {
    let key = pipeline.shared_key().ok_or_else(|| {
        Error::credential_invalid("building a SAS url requires a shared key credential")
    })?;

    let mut parts = BlobUrlParts::from_url(url)?;
    parts.sas = sign(&parts, key)?;
    parts.to_url()
}

fn require_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::request_invalid(format!("{kind} name must not be empty")));
    }
    Ok(())
}
