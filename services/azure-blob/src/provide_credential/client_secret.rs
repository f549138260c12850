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
use azblob_core::time::now;
use azblob_core::utils::Redact;
use azblob_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;

use crate::constants::*;
use crate::Credential;

/// Load credential from Azure Client Secret.
///
/// This loader implements the Azure Client Secret authentication flow,
/// which allows applications to authenticate to Azure services using
/// a client ID and client secret. Values not set on the provider are read
/// from [`AZURE_TENANT_ID`], [`AZURE_CLIENT_ID`], [`AZURE_CLIENT_SECRET`]
/// and [`AZURE_AUTHORITY_HOST`].
///
/// Reference: <https://learn.microsoft.com/en-us/azure/active-directory/develop/v2-oauth2-client-creds-grant-flow>
#[derive(Default, Clone)]
pub struct ClientSecretCredentialProvider {
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    authority_host: Option<String>,
}

impl Debug for ClientSecretCredentialProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredentialProvider")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &Redact::from(&self.client_secret))
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

impl ClientSecretCredentialProvider {
    /// Create a new client secret loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tenant ID.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the client ID.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the client secret.
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set the authority host, like `https://login.microsoftonline.com`.
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = Some(authority_host.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for ClientSecretCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let pick = |v: &Option<String>, key: &str| {
            v.clone()
                .or_else(|| ctx.env_var(key))
                .filter(|v| !v.is_empty())
        };

        let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            pick(&self.tenant_id, AZURE_TENANT_ID),
            pick(&self.client_id, AZURE_CLIENT_ID),
            pick(&self.client_secret, AZURE_CLIENT_SECRET),
        ) else {
            return Ok(None);
        };
        let authority_host = pick(&self.authority_host, AZURE_AUTHORITY_HOST)
            .unwrap_or_else(|| AZURE_PUBLIC_CLOUD.to_string());

        let token =
            get_client_secret_token(&tenant_id, &client_id, &client_secret, &authority_host, ctx)
                .await?;

        let expires_on = now()
            + chrono::TimeDelta::try_seconds(token.expires_in as i64)
                .unwrap_or(chrono::TimeDelta::minutes(10));

        Ok(Some(Credential::with_bearer_token(
            &token.access_token,
            Some(expires_on),
        )))
    }
}

#[derive(serde::Deserialize)]
struct ClientSecretTokenResponse {
    access_token: String,
    expires_in: u64,
}

async fn get_client_secret_token(
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
    authority_host: &str,
    ctx: &Context,
) -> Result<ClientSecretTokenResponse> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        tenant_id
    );

    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("scope", STORAGE_SCOPE)
        .append_pair("client_id", client_id)
        .append_pair("client_secret", client_secret)
        .append_pair("grant_type", "client_credentials")
        .finish();

    let req = http::Request::builder()
        .method(http::Method::POST)
        .uri(&url)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from(body))?;

    log::debug!("requesting client secret token from {url}");
    let resp = ctx.http_send(req).await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = String::from_utf8_lossy(resp.body());
        return Err(Error::credential_invalid(format!(
            "client secret request failed with status {status}: {body}"
        ))
        .with_status(status));
    }

    serde_json::from_slice(resp.body())
        .map_err(|e| Error::unexpected("failed to parse client secret response").with_source(e))
}
