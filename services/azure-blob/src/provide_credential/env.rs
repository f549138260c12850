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

use async_trait::async_trait;
use azblob_core::{Context, ProvideCredential, Result};

use crate::constants::*;
use crate::credential::Credential;

/// Load a static credential from environment variables.
///
/// Checked in order:
///
/// - [`AZBLOB_ACCOUNT_NAME`] / [`AZURE_STORAGE_ACCOUNT_NAME`] with
///   [`AZBLOB_ACCOUNT_KEY`] / [`AZURE_STORAGE_ACCOUNT_KEY`]
/// - [`AZURE_STORAGE_SAS_TOKEN`]
/// - [`AZURE_STORAGE_BEARER_TOKEN`]
#[derive(Clone, Debug, Default)]
pub struct EnvCredentialProvider {}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        let account_name = envs
            .get(AZBLOB_ACCOUNT_NAME)
            .or_else(|| envs.get(AZURE_STORAGE_ACCOUNT_NAME));
        let account_key = envs
            .get(AZBLOB_ACCOUNT_KEY)
            .or_else(|| envs.get(AZURE_STORAGE_ACCOUNT_KEY));

        if let (Some(account_name), Some(account_key)) = (account_name, account_key) {
            return Ok(Some(Credential::with_shared_key(account_name, account_key)?));
        }

        if let Some(sas_token) = envs.get(AZURE_STORAGE_SAS_TOKEN) {
            return Ok(Some(Credential::with_sas_token(sas_token)));
        }

        if let Some(bearer_token) = envs.get(AZURE_STORAGE_BEARER_TOKEN) {
            return Ok(Some(Credential::with_bearer_token(bearer_token, None)));
        }

        Ok(None)
    }
}
