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

use azblob_core::time::DateTime;
use azblob_core::{Error, Result};

use super::{
    check_time_range, format_time, BlobSasPermissions, ContainerSasPermissions, IpRange,
    SasProtocol, SasQueryParameters,
};
use crate::constants::SERVICE_VERSION;
use crate::SharedKeyCredential;

/// Values of a service SAS for a container or a blob.
///
/// An empty `blob_name` signs for the whole container. Setting `snapshot`
/// signs for that snapshot of the blob.
///
/// [Construct a service SAS](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#version-2018-11-09-and-later)
#[derive(Debug, Clone)]
pub struct BlobSasSignatureValues {
    /// Service version, defaults to the version this crate speaks.
    pub version: String,
    pub protocol: Option<SasProtocol>,
    pub start: Option<DateTime>,
    pub expiry: Option<DateTime>,
    /// Rendered [`BlobSasPermissions`] or [`ContainerSasPermissions`].
    pub permissions: Option<String>,
    pub ip_range: Option<IpRange>,
    /// Name of a stored access policy on the container.
    pub identifier: Option<String>,
    pub container_name: String,
    pub blob_name: String,
    pub snapshot: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
}

impl Default for BlobSasSignatureValues {
    fn default() -> Self {
        Self {
            version: SERVICE_VERSION.to_string(),
            protocol: None,
            start: None,
            expiry: None,
            permissions: None,
            ip_range: None,
            identifier: None,
            container_name: String::new(),
            blob_name: String::new(),
            snapshot: None,
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            content_type: None,
        }
    }
}

impl BlobSasSignatureValues {
    /// Values for a SAS over a whole container.
    pub fn for_container(
        container_name: impl Into<String>,
        permissions: ContainerSasPermissions,
        expiry: DateTime,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            permissions: Some(permissions.to_string()),
            expiry: Some(expiry),
            ..Default::default()
        }
    }

    /// Values for a SAS over a single blob.
    pub fn for_blob(
        container_name: impl Into<String>,
        blob_name: impl Into<String>,
        permissions: BlobSasPermissions,
        expiry: DateTime,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            blob_name: blob_name.into(),
            permissions: Some(permissions.to_string()),
            expiry: Some(expiry),
            ..Default::default()
        }
    }

    /// Sign these values with the account key.
    ///
    /// Without a stored access policy `identifier`, both `expiry` and
    /// `permissions` are required.
    pub fn sign(&self, credential: &SharedKeyCredential) -> Result<SasQueryParameters> {
        if self.container_name.is_empty() {
            return Err(Error::request_invalid("container name is required for a SAS"));
        }
        if self.identifier.is_none() && (self.expiry.is_none() || self.permissions.is_none()) {
            return Err(Error::request_invalid(
                "SAS without an identifier requires both expiry and permissions",
            ));
        }
        check_time_range(self.start, self.expiry)?;

        let resource = match (self.blob_name.is_empty(), &self.snapshot) {
            (true, _) => "c",
            (false, None) => "b",
            (false, Some(_)) => "bs",
        };

        // Normalize the permission string into the fixed order.
        let permissions = match (&self.permissions, resource) {
            (None, _) => String::new(),
            (Some(p), "c") => p.parse::<ContainerSasPermissions>()?.to_string(),
            (Some(p), _) => p.parse::<BlobSasPermissions>()?.to_string(),
        };

        let start = format_time(self.start);
        let expiry = format_time(self.expiry);
        let canonical_name = canonical_name(
            credential.account_name(),
            &self.container_name,
            &self.blob_name,
        );
        let ip_range = self.ip_range.map(|v| v.to_string()).unwrap_or_default();
        let protocol = self.protocol.map(|v| v.to_string()).unwrap_or_default();
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();

        let fields: [String; 15] = [
            permissions.clone(),
            start.clone(),
            expiry.clone(),
            canonical_name,
            opt(&self.identifier),
            ip_range.clone(),
            protocol.clone(),
            self.version.clone(),
            resource.to_string(),
            opt(&self.snapshot),
            opt(&self.cache_control),
            opt(&self.content_disposition),
            opt(&self.content_encoding),
            opt(&self.content_language),
            opt(&self.content_type),
        ];
        let string_to_sign = fields.join("\n");

        let signature = credential.compute_hmac_sha256(&string_to_sign);

        Ok(SasQueryParameters {
            version: Some(self.version.clone()),
            protocol: Some(protocol),
            start: Some(start),
            expiry: Some(expiry),
            ip_range: Some(ip_range),
            identifier: self.identifier.clone(),
            resource: Some(resource.to_string()),
            permissions: Some(permissions),
            cache_control: self.cache_control.clone(),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            content_language: self.content_language.clone(),
            content_type: self.content_type.clone(),
            signature: Some(signature),
            ..Default::default()
        })
    }
}

/// `/blob/<account>/<container>[/<blob>]`
fn canonical_name(account: &str, container: &str, blob: &str) -> String {
    let mut s = format!("/blob/{account}/{container}");
    if !blob.is_empty() {
        s.push('/');
        s.push_str(&blob.replace('\\', "/"));
    }
    s
}
