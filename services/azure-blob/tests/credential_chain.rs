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

//! Clients signing with credentials loaded by a provider chain.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use azblob::{
    BlobAccessOptions, BlobClient, ContainerClient, Credential, ErrorKind, ServiceClient,
    StaticCredentialProvider,
};
use azblob_core::{Context, ProvideCredential, ProvideCredentialChain, Result};
use common::{init_logger, options, MockTransport, ACCOUNT_URL};
use pretty_assertions::assert_eq;

/// Provider that counts how often it was asked.
#[derive(Debug)]
struct CountingProvider {
    credential: Option<Credential>,
    calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    fn new(credential: Option<Credential>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                credential,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl ProvideCredential for CountingProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.credential.clone())
    }
}

#[tokio::test]
async fn test_chain_stops_at_first_success() {
    let (empty, empty_calls) = CountingProvider::new(None);
    let (sas, sas_calls) = CountingProvider::new(Some(Credential::with_sas_token("sv=1&sig=a")));
    let (key, key_calls) =
        CountingProvider::new(Some(Credential::with_shared_key("account", "a2V5").unwrap()));

    let chain = ProvideCredentialChain::new().push(empty).push(sas).push(key);
    let cred = chain.provide_credential(&Context::new()).await.unwrap();

    assert!(matches!(cred, Some(Credential::SasToken { ref token }) if token == "sv=1&sig=a"));
    assert_eq!(empty_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sas_calls.load(Ordering::SeqCst), 1);
    assert_eq!(key_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_client_reuses_the_loaded_credential() {
    init_logger();
    let transport = MockTransport::default();
    transport.reply(200, &[], "").reply(200, &[], "");

    let (provider, calls) =
        CountingProvider::new(Some(Credential::with_bearer_token("token-1", None)));
    let blob = BlobClient::with_provider(
        &format!("{ACCOUNT_URL}/container/blob"),
        provider,
        options(&transport),
    )
    .unwrap();

    blob.get_properties(BlobAccessOptions::default())
        .await
        .unwrap();
    blob.get_properties(BlobAccessOptions::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for req in transport.sent() {
        assert_eq!(req.header("authorization"), Some("Bearer token-1"));
    }
}

#[tokio::test]
async fn test_client_signs_with_static_provider() {
    init_logger();
    let transport = MockTransport::default();
    transport.reply(201, &[], "");

    let service = ServiceClient::with_provider(
        ACCOUNT_URL,
        StaticCredentialProvider::new_shared_key("account", "a2V5").unwrap(),
        options(&transport),
    )
    .unwrap();
    service
        .create_container("logs", Default::default())
        .await
        .unwrap();

    let req = &transport.sent()[0];
    assert_eq!(req.uri.path(), "/logs");
    assert_eq!(req.uri.query(), Some("restype=container"));
    assert!(req
        .header("authorization")
        .unwrap()
        .starts_with("SharedKey account:"));
}

#[tokio::test]
async fn test_no_credential_from_chain_fails_before_sending() {
    init_logger();
    let transport = MockTransport::default();

    let chain: ProvideCredentialChain<Credential> = ProvideCredentialChain::new();
    let container = ContainerClient::with_provider(
        &format!("{ACCOUNT_URL}/container"),
        chain,
        options(&transport),
    )
    .unwrap();

    let err = container
        .get_properties(&Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert!(transport.sent().is_empty());
}
