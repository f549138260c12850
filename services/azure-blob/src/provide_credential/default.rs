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

use std::sync::Arc;

use async_trait::async_trait;
use azblob_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

use crate::provide_credential::{
    ClientSecretCredentialProvider, ConfigCredentialProvider, EnvCredentialProvider,
    ImdsCredentialProvider,
};
use crate::{Config, Credential};

/// Default loader that tries multiple credential sources in order.
///
/// 1. Environment (account key, SAS token, bearer token)
/// 2. Configuration (account key, SAS token)
/// 3. Client secret (service principal)
/// 4. IMDS (managed identity)
///
/// A source that fails is logged and skipped.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::with_config(Arc::new(Config::default()))
    }
}

impl DefaultCredentialProvider {
    /// Create a new default loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chain around a loaded [`Config`].
    pub fn with_config(config: Arc<Config>) -> Self {
        let mut client_secret = ClientSecretCredentialProvider::new();
        if let Some(v) = &config.tenant_id {
            client_secret = client_secret.with_tenant_id(v);
        }
        if let Some(v) = &config.client_id {
            client_secret = client_secret.with_client_id(v);
        }
        if let Some(v) = &config.client_secret {
            client_secret = client_secret.with_client_secret(v);
        }
        if let Some(v) = &config.authority_host {
            client_secret = client_secret.with_authority_host(v);
        }

        let mut imds = ImdsCredentialProvider::new();
        if let Some(v) = &config.object_id {
            imds = imds.with_object_id(v);
        }
        if let Some(v) = &config.client_id {
            imds = imds.with_client_id(v);
        }
        if let Some(v) = &config.msi_res_id {
            imds = imds.with_msi_res_id(v);
        }
        if let Some(v) = &config.msi_endpoint {
            imds = imds.with_endpoint(v);
        }
        if let Some(v) = &config.msi_secret {
            imds = imds.with_msi_secret(v);
        }

        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ConfigCredentialProvider::new(config))
            .push(client_secret)
            .push(imds);

        Self { chain }
    }

    /// Load the config from environment variables and build the chain.
    pub fn from_env(ctx: &Context) -> Self {
        Self::with_config(Arc::new(Config::default().from_env(ctx)))
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::provide_credential::tests::MockHttpSend;
    use azblob_core::StaticEnv;
    use http::StatusCode;
    use std::collections::HashMap;

    fn ctx(envs: &[(&str, &str)], mock: MockHttpSend) -> Context {
        Context::new().with_http_send(mock).with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_env_comes_first() {
        let mock = MockHttpSend::new(StatusCode::OK, "{}");
        let ctx = ctx(
            &[(AZBLOB_ACCOUNT_NAME, "test_account"), (AZBLOB_ACCOUNT_KEY, "dGVzdF9rZXk=")],
            mock.clone(),
        );

        let cred = DefaultCredentialProvider::from_env(&ctx)
            .provide_credential(&ctx)
            .await
            .unwrap()
            .unwrap();
        match cred {
            Credential::SharedKey(key) => assert_eq!(key.account_name(), "test_account"),
            v => panic!("unexpected credential: {v:?}"),
        }
        assert!(mock.last_request().is_none());
    }

    #[tokio::test]
    async fn test_config_sas_token() {
        let mock = MockHttpSend::new(StatusCode::OK, "{}");
        let ctx = ctx(&[], mock);
        let config = Config::try_from_connection_string(
            "BlobEndpoint=https://acct.blob.core.windows.net;SharedAccessSignature=sv=2019-12-12&sig=abc",
        )
        .unwrap();

        let cred = DefaultCredentialProvider::with_config(Arc::new(config))
            .provide_credential(&ctx)
            .await
            .unwrap()
            .unwrap();
        match cred {
            Credential::SasToken { token } => assert_eq!(token, "sv=2019-12-12&sig=abc"),
            v => panic!("unexpected credential: {v:?}"),
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_client_secret() {
        let mock = MockHttpSend::new(
            StatusCode::OK,
            r#"{"expires_in":3599,"access_token":"aad-token"}"#,
        );
        let ctx = ctx(
            &[
                (AZURE_TENANT_ID, "tenant"),
                (AZURE_CLIENT_ID, "client"),
                (AZURE_CLIENT_SECRET, "secret"),
            ],
            mock.clone(),
        );

        let cred = DefaultCredentialProvider::from_env(&ctx)
            .provide_credential(&ctx)
            .await
            .unwrap()
            .unwrap();
        match cred {
            Credential::BearerToken { token, .. } => assert_eq!(token, "aad-token"),
            v => panic!("unexpected credential: {v:?}"),
        }
        let req = mock.last_request().unwrap();
        assert!(req.uri.to_string().starts_with(AZURE_PUBLIC_CLOUD));
    }

    #[tokio::test]
    async fn test_nothing_available() {
        let ctx = ctx(&[], MockHttpSend::new(StatusCode::BAD_REQUEST, ""));

        let cred = DefaultCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap();
        assert!(cred.is_none());
    }
}
