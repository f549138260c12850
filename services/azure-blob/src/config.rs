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

use azblob_core::utils::Redact;
use azblob_core::{Context, Result};

use crate::constants::*;
use crate::{connection_string, Credential};

/// Config carries all the configuration for the blob service.
#[derive(Clone, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ACCOUNT_NAME`] or [`AZURE_STORAGE_ACCOUNT_NAME`]
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZBLOB_ACCOUNT_KEY`] or [`AZURE_STORAGE_ACCOUNT_KEY`]
    pub account_key: Option<String>,
    /// `sas_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_SAS_TOKEN`]
    pub sas_token: Option<String>,
    /// Blob service endpoint, like `https://account.blob.core.windows.net`.
    ///
    /// - env value: [`AZBLOB_ENDPOINT`]
    pub endpoint: Option<String>,
    /// `tenant_id` value will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_TENANT_ID`]
    pub tenant_id: Option<String>,
    /// Application id of the service principal, or of a user assigned
    /// managed identity.
    ///
    /// - env value: [`AZURE_CLIENT_ID`]
    pub client_id: Option<String>,
    /// `client_secret` value will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_CLIENT_SECRET`]
    pub client_secret: Option<String>,
    /// `authority_host` value will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_AUTHORITY_HOST`]
    /// - default to [`AZURE_PUBLIC_CLOUD`] when the client secret flow runs.
    pub authority_host: Option<String>,
    /// Object id of a user assigned managed identity.
    ///
    /// The values of client_id and msi_res_id are discarded
    pub object_id: Option<String>,
    /// ARM resource id of a user assigned managed identity.
    ///
    /// The values of object_id and client_id are discarded
    pub msi_res_id: Option<String>,
    /// Endpoint of the identity service, defaults to the instance metadata
    /// service.
    pub msi_endpoint: Option<String>,
    /// Header value sent to a custom identity endpoint.
    ///
    /// This header mitigates server-side request forgery (SSRF) attacks.
    pub msi_secret: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("sas_token", &Redact::from(&self.sas_token))
            .field("endpoint", &self.endpoint)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &Redact::from(&self.client_secret))
            .field("authority_host", &self.authority_host)
            .field("object_id", &self.object_id)
            .field("msi_res_id", &self.msi_res_id)
            .field("msi_endpoint", &self.msi_endpoint)
            .field("msi_secret", &Redact::from(&self.msi_secret))
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Values already set on this config win over the environment.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();
        let get = |keys: &[&str]| keys.iter().find_map(|k| envs.get(*k).cloned());

        let pairs: [(&mut Option<String>, &[&str]); 12] = [
            (
                &mut self.account_name,
                &[AZBLOB_ACCOUNT_NAME, AZURE_STORAGE_ACCOUNT_NAME],
            ),
            (
                &mut self.account_key,
                &[AZBLOB_ACCOUNT_KEY, AZURE_STORAGE_ACCOUNT_KEY],
            ),
            (&mut self.sas_token, &[AZURE_STORAGE_SAS_TOKEN]),
            (&mut self.endpoint, &[AZBLOB_ENDPOINT]),
            (&mut self.tenant_id, &[AZURE_TENANT_ID]),
            (&mut self.client_id, &[AZURE_CLIENT_ID]),
            (&mut self.client_secret, &[AZURE_CLIENT_SECRET]),
            (&mut self.authority_host, &[AZURE_AUTHORITY_HOST]),
            (&mut self.object_id, &[AZURE_OBJECT_ID]),
            (&mut self.msi_res_id, &[AZURE_MSI_RES_ID]),
            (&mut self.msi_endpoint, &[AZURE_MSI_ENDPOINT]),
            (&mut self.msi_secret, &[AZURE_MSI_SECRET]),
        ];
        for (field, keys) in pairs {
            if field.is_none() {
                *field = get(keys);
            }
        }

        self
    }

    /// Parses an [Azure connection string][1] into a configuration object.
    ///
    /// An example of a connection string looks like:
    ///
    /// ```txt
    /// AccountName=mystorageaccount;
    /// AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;
    /// BlobEndpoint=https://mystorageaccount.blob.core.windows.net
    /// ```
    ///
    /// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
    pub fn try_from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str)
    }

    /// The static credential this config describes, if any.
    ///
    /// A SAS token wins over an account key.
    pub fn credential(&self) -> Result<Option<Credential>> {
        if let Some(token) = self.sas_token.as_deref().filter(|v| !v.is_empty()) {
            return Ok(Some(Credential::with_sas_token(token)));
        }

        match (&self.account_name, &self.account_key) {
            (Some(name), Some(key)) if !name.is_empty() => {
                Ok(Some(Credential::with_shared_key(name, key)?))
            }
            _ => Ok(None),
        }
    }
}
