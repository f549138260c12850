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

//! Azure Blob Storage client
//!
//! This crate talks to the Azure Blob service over its REST API:
//! - Shared Key, SAS and bearer token (OAuth) authentication
//! - Service and account SAS generation
//! - Typed clients for the service, containers, block/page/append blobs and leases
//! - Downloads that resume transparently after a dropped connection
//!
//! # Example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use azblob::{ClientOptions, Credential, DownloadOptions, ServiceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let credential = Credential::with_shared_key("account", "a2V5")?;
//!     let service = ServiceClient::new(
//!         "https://account.blob.core.windows.net",
//!         Some(credential),
//!         ClientOptions::default(),
//!     )?;
//!
//!     let blob = service.container_client("container")?.blob_client("hello.txt")?;
//!     let content = blob.download_to_bytes(DownloadOptions::default()).await?;
//!     println!("read {} bytes", content.len());
//!
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::Config;

mod connection_string;

mod credential;
pub use credential::{Credential, SharedKeyCredential};

mod sign_request;
pub use sign_request::{canonicalize, string_to_sign, RequestSigner};

pub mod sas;

mod provide_credential;
pub use provide_credential::*;

pub mod models;

mod request;

mod pipeline;
pub use pipeline::{ClientOptions, LoggingOptions, RetryOptions, TelemetryOptions};

mod retry_reader;
pub use retry_reader::{
    FailedReadNotifier, HttpGetterInfo, RangeGetter, RetryReader, RetryReaderOptions,
};

mod pager;
pub use pager::Pager;

mod url_parts;
pub use url_parts::BlobUrlParts;

mod client;
pub use client::*;

pub use azblob_core::{Context, Error, ErrorKind, Result};
