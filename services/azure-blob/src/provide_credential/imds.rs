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

use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use azblob_core::time::{now, parse_rfc3339, DateTime};
use azblob_core::utils::Redact;
use azblob_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use chrono::TimeZone;

use crate::constants::*;
use crate::Credential;

const IMDS_API_VERSION: &str = "2018-02-01";
const STORAGE_RESOURCE: &str = "https://storage.azure.com/";

/// Load credential from Azure Instance Metadata Service (IMDS).
///
/// This loader attempts to retrieve an access token from the Azure Instance Metadata Service
/// which is available on Azure VMs and other Azure compute resources.
///
/// A user assigned identity is selected by object id, client id or resource
/// id, in that order of preference.
///
/// Reference: <https://learn.microsoft.com/en-us/azure/app-service/overview-managed-identity?tabs=portal,http#using-the-rest-protocol>
#[derive(Default, Clone)]
pub struct ImdsCredentialProvider {
    object_id: Option<String>,
    client_id: Option<String>,
    msi_res_id: Option<String>,
    endpoint: Option<String>,
    msi_secret: Option<String>,
}

impl Debug for ImdsCredentialProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImdsCredentialProvider")
            .field("object_id", &self.object_id)
            .field("client_id", &self.client_id)
            .field("msi_res_id", &self.msi_res_id)
            .field("endpoint", &self.endpoint)
            .field("msi_secret", &Redact::from(&self.msi_secret))
            .finish()
    }
}

impl ImdsCredentialProvider {
    /// Create a new IMDS loader.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_msi_res_id(mut self, msi_res_id: impl Into<String>) -> Self {
        self.msi_res_id = Some(msi_res_id.into());
        self
    }

    /// Use another identity endpoint, like the one of App Service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Value of the `X-IDENTITY-HEADER` sent to a custom endpoint.
    pub fn with_msi_secret(mut self, msi_secret: impl Into<String>) -> Self {
        self.msi_secret = Some(msi_secret.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let token = get_access_token(self, ctx).await?;

        let expires_on = match token.expires_on.as_deref() {
            None | Some("") => now() + chrono::TimeDelta::minutes(10),
            Some(v) => parse_expires_on(v)?,
        };

        Ok(Some(Credential::with_bearer_token(
            &token.access_token,
            Some(expires_on),
        )))
    }
}

#[derive(serde::Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_on: Option<String>,
}

/// IMDS answers with unix seconds, some hosts with a timestamp.
fn parse_expires_on(v: &str) -> Result<DateTime> {
    if let Ok(secs) = v.parse::<i64>() {
        return chrono::Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| Error::unexpected(format!("invalid expires_on: {v}")));
    }
    parse_rfc3339(v)
        .map_err(|e| Error::unexpected("failed to parse expires_on time").with_source(e))
}

async fn get_access_token(
    p: &ImdsCredentialProvider,
    ctx: &Context,
) -> Result<AccessTokenResponse> {
    let pick = |v: &Option<String>, key: &str| {
        v.clone()
            .or_else(|| ctx.env_var(key))
            .filter(|v| !v.is_empty())
    };

    let endpoint =
        pick(&p.endpoint, AZURE_MSI_ENDPOINT).unwrap_or_else(|| IMDS_ENDPOINT.to_string());

    // The serializer is not Send, so it must be gone before the first await.
    let url = {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("api-version", IMDS_API_VERSION)
            .append_pair("resource", STORAGE_RESOURCE);
        if let Some(object_id) = pick(&p.object_id, AZURE_OBJECT_ID) {
            query.append_pair("object_id", &object_id);
        } else if let Some(client_id) = pick(&p.client_id, AZURE_CLIENT_ID) {
            query.append_pair("client_id", &client_id);
        } else if let Some(msi_res_id) = pick(&p.msi_res_id, AZURE_MSI_RES_ID) {
            query.append_pair("msi_res_id", &msi_res_id);
        }
        format!("{endpoint}?{}", query.finish())
    };

    let mut req = http::Request::builder()
        .method(http::Method::GET)
        .uri(&url)
        .header("Metadata", "true");

    if let Some(msi_secret) = pick(&p.msi_secret, AZURE_MSI_SECRET) {
        req = req.header("X-IDENTITY-HEADER", msi_secret);
    }

    let req = req.body(Bytes::new())?;

    let resp = ctx.http_send(req).await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = String::from_utf8_lossy(resp.body());
        return Err(Error::credential_invalid(format!(
            "IMDS request failed with status {status}: {body}"
        ))
        .with_status(status));
    }

    serde_json::from_slice(resp.body())
        .map_err(|e| Error::unexpected("failed to parse IMDS response").with_source(e))
}
