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

use azblob_core::{Error, ProvideCredential, Result};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{require_name, sign_url, ContainerClient};
use crate::models::xml::{from_xml, service_properties_to_xml};
use crate::models::{
    join_include, validate_metadata, AccountInfo, LeaseAccessConditions, ListContainersInclude,
    ListContainersSegment, Metadata, ModifiedAccessConditions, OperationResponse,
    PublicAccessType, StorageServiceProperties,
};
use crate::pager::Pager;
use crate::pipeline::{ClientOptions, Pipeline};
use crate::request::{join_segment, BlobRequest};
use crate::sas::AccountSasSignatureValues;
use crate::{Config, Credential};

#[derive(Debug, Clone, Default)]
pub struct CreateContainerOptions {
    pub metadata: Metadata,
    /// Anonymous read access, private when `None`.
    pub access: Option<PublicAccessType>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteContainerOptions {
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct ListContainersOptions {
    pub prefix: Option<String>,
    /// Continue a listing from a marker returned earlier.
    pub marker: Option<String>,
    /// Page size, the service caps it at 5000.
    pub max_results: Option<u32>,
    pub include: Vec<ListContainersInclude>,
}

/// Client of a storage account's blob service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    url: Url,
    pipeline: Pipeline,
}

impl ServiceClient {
    /// Create a client for `url`, anonymous when `credential` is `None`.
    pub fn new(url: &str, credential: Option<Credential>, options: ClientOptions) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            pipeline: Pipeline::new(credential, options)?,
        })
    }

    /// Create a client signing with whatever `provider` loads.
    pub fn with_provider(
        url: &str,
        provider: impl ProvideCredential<Credential = Credential>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            pipeline: Pipeline::with_provider(provider, options)?,
        })
    }

    /// Create a client from the endpoint and static credential of `config`.
    pub fn from_config(config: &Config, options: ClientOptions) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config_invalid("blob endpoint is required"))?;
        Self::new(endpoint, config.credential()?, options)
    }

    /// Create a client from an Azure storage connection string.
    pub fn from_connection_string(conn_str: &str, options: ClientOptions) -> Result<Self> {
        Self::from_config(&Config::try_from_connection_string(conn_str)?, options)
    }

    pub(crate) fn from_parts(url: Url, pipeline: Pipeline) -> Self {
        Self { url, pipeline }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// A client whose requests fail with `Canceled` once `token` fires.
    ///
    /// Clients derived from the returned one share the token.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self::from_parts(self.url.clone(), self.pipeline.with_cancellation(token))
    }

    pub fn container_client(&self, container_name: &str) -> Result<ContainerClient> {
        require_name("container", container_name)?;
        Ok(ContainerClient::from_parts(
            join_segment(&self.url, container_name)?,
            self.pipeline.clone(),
        ))
    }

    pub async fn create_container(
        &self,
        container_name: &str,
        options: CreateContainerOptions,
    ) -> Result<(ContainerClient, OperationResponse)> {
        let client = self.container_client(container_name)?;
        let resp = client.create(options).await?;
        Ok((client, resp))
    }

    pub async fn delete_container(
        &self,
        container_name: &str,
        options: DeleteContainerOptions,
    ) -> Result<OperationResponse> {
        self.container_client(container_name)?.delete(options).await
    }

    /// List the containers of the account, one page per request.
    pub fn list_containers(&self, options: ListContainersOptions) -> Pager<ListContainersSegment> {
        let pipeline = self.pipeline.clone();
        let url = self.url.clone();
        let marker = options.marker.clone();

        Pager::new(marker, move |marker| {
            let req = BlobRequest::get(&url)
                .query("comp", "list")
                .query_opt("prefix", options.prefix.as_deref())
                .query_opt("marker", marker)
                .query_opt("maxresults", options.max_results)
                .query_opt("include", join_include(&options.include));
            let pipeline = pipeline.clone();

            async move {
                let resp = pipeline.send_bytes(req).await?;
                let page: ListContainersSegment = from_xml(resp.body())?;
                let next = page.next_marker.clone();
                Ok((page, next))
            }
            .boxed()
        })
    }

    pub async fn get_account_info(&self) -> Result<AccountInfo> {
        let req = BlobRequest::get(&self.url)
            .query("restype", "account")
            .query("comp", "properties");
        let resp = self.pipeline.send_bytes(req).await?;
        AccountInfo::from_headers(resp.headers())
    }

    /// Logging, metrics, CORS and retention settings of the account.
    pub async fn get_properties(&self) -> Result<StorageServiceProperties> {
        let req = BlobRequest::get(&self.url)
            .query("restype", "service")
            .query("comp", "properties");
        let resp = self.pipeline.send_bytes(req).await?;
        from_xml(resp.body())
    }

    /// Replace the sections of the account settings that `properties` sets.
    pub async fn set_properties(
        &self,
        properties: &StorageServiceProperties,
    ) -> Result<OperationResponse> {
        properties.validate()?;

        let req = BlobRequest::put(&self.url)
            .query("restype", "service")
            .query("comp", "properties")
            .content_type("application/xml")
            .body(service_properties_to_xml(properties).into());
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// The service url with an account SAS attached.
    ///
    /// Requires a shared key credential.
    pub fn sas_url(&self, values: &AccountSasSignatureValues) -> Result<Url> {
        sign_url(&self.pipeline, &self.url, |_, key| values.sign(key))
    }
}

impl CreateContainerOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_metadata(&self.metadata)
    }
}
