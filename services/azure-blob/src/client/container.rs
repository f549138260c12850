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

use super::{
    require_name, sign_url, AppendBlobClient, BlobClient, BlockBlobClient,
    CreateContainerOptions, DeleteContainerOptions, LeaseClient, PageBlobClient,
};
use crate::models::xml::{from_xml, signed_identifiers_to_xml, SignedIdentifiersXml};
use crate::models::{
    join_include, validate_metadata, validate_signed_identifiers, AccessPolicyResponse,
    ContainerProperties, LeaseAccessConditions, ListBlobsInclude, ListBlobsSegment, Metadata,
    ModifiedAccessConditions, OperationResponse, PublicAccessType, SignedIdentifier,
};
use crate::pager::Pager;
use crate::pipeline::{ClientOptions, Pipeline};
use crate::request::{join_blob_name, BlobRequest};
use crate::sas::BlobSasSignatureValues;
use crate::{BlobUrlParts, Credential};

/// Lease and conditions of a container operation.
#[derive(Debug, Clone, Default)]
pub struct ContainerAccessOptions {
    pub lease: LeaseAccessConditions,
    /// The service only honors `if_modified_since` and `if_unmodified_since`
    /// on containers.
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct SetAccessPolicyOptions {
    /// Anonymous read access, private when `None`.
    pub access: Option<PublicAccessType>,
    pub lease: LeaseAccessConditions,
    pub conditions: ModifiedAccessConditions,
}

#[derive(Debug, Clone, Default)]
pub struct ListBlobsOptions {
    pub prefix: Option<String>,
    /// Continue a listing from a marker returned earlier.
    pub marker: Option<String>,
    /// Page size, the service caps it at 5000.
    pub max_results: Option<u32>,
    pub include: Vec<ListBlobsInclude>,
}

/// Client of a single container.
#[derive(Debug, Clone)]
pub struct ContainerClient {
    url: Url,
    pipeline: Pipeline,
}

impl ContainerClient {
    /// Create a client for a container url, anonymous when `credential` is
    /// `None`.
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

    pub(crate) fn from_parts(url: Url, pipeline: Pipeline) -> Self {
        Self { url, pipeline }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self::from_parts(self.url.clone(), self.pipeline.with_cancellation(token))
    }

    pub fn blob_client(&self, blob_name: &str) -> Result<BlobClient> {
        require_name("blob", blob_name)?;
        Ok(BlobClient::from_parts(
            join_blob_name(&self.url, blob_name)?,
            self.pipeline.clone(),
        ))
    }

    pub fn block_blob_client(&self, blob_name: &str) -> Result<BlockBlobClient> {
        Ok(self.blob_client(blob_name)?.into_block_blob_client())
    }

    pub fn page_blob_client(&self, blob_name: &str) -> Result<PageBlobClient> {
        Ok(self.blob_client(blob_name)?.into_page_blob_client())
    }

    pub fn append_blob_client(&self, blob_name: &str) -> Result<AppendBlobClient> {
        Ok(self.blob_client(blob_name)?.into_append_blob_client())
    }

    /// A lease client for this container, proposing a random lease id when
    /// `lease_id` is `None`.
    pub fn lease_client(&self, lease_id: Option<String>) -> LeaseClient {
        LeaseClient::for_container(self.url.clone(), self.pipeline.clone(), lease_id)
    }

    fn request(&self, req: BlobRequest) -> BlobRequest {
        req.query("restype", "container")
    }

    pub async fn create(&self, options: CreateContainerOptions) -> Result<OperationResponse> {
        options.validate()?;
        let req = self
            .request(BlobRequest::put(&self.url))
            .metadata(&options.metadata)
            .header_opt("x-ms-blob-public-access", options.access);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    pub async fn delete(&self, options: DeleteContainerOptions) -> Result<OperationResponse> {
        let req = self
            .request(BlobRequest::delete(&self.url))
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    pub async fn get_properties(
        &self,
        lease: &LeaseAccessConditions,
    ) -> Result<ContainerProperties> {
        let req = self.request(BlobRequest::head(&self.url)).lease(lease);
        let resp = self.pipeline.send_bytes(req).await?;
        ContainerProperties::from_headers(resp.headers())
    }

    /// Replace all metadata of the container.
    pub async fn set_metadata(
        &self,
        metadata: &Metadata,
        options: ContainerAccessOptions,
    ) -> Result<OperationResponse> {
        validate_metadata(metadata)?;
        let req = self
            .request(BlobRequest::put(&self.url))
            .query("comp", "metadata")
            .metadata(metadata)
            .lease(&options.lease)
            .conditions(&options.conditions);
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    pub async fn get_access_policy(
        &self,
        lease: &LeaseAccessConditions,
    ) -> Result<AccessPolicyResponse> {
        let req = self
            .request(BlobRequest::get(&self.url))
            .query("comp", "acl")
            .lease(lease);
        let resp = self.pipeline.send_bytes(req).await?;
        let identifiers: SignedIdentifiersXml = if resp.body().is_empty() {
            SignedIdentifiersXml::default()
        } else {
            from_xml(resp.body())?
        };
        AccessPolicyResponse::from_parts(resp.headers(), identifiers.items)
    }

    /// Replace the public access level and all stored access policies.
    ///
    /// At most five identifiers are accepted; they are checked before
    /// anything is sent.
    pub async fn set_access_policy(
        &self,
        identifiers: &[SignedIdentifier],
        options: SetAccessPolicyOptions,
    ) -> Result<OperationResponse> {
        validate_signed_identifiers(identifiers)?;
        let req = self
            .request(BlobRequest::put(&self.url))
            .query("comp", "acl")
            .header_opt("x-ms-blob-public-access", options.access)
            .lease(&options.lease)
            .conditions(&options.conditions)
            .content_type("application/xml")
            .body(signed_identifiers_to_xml(identifiers).into());
        let resp = self.pipeline.send_bytes(req).await?;
        OperationResponse::from_headers(resp.headers())
    }

    /// List every blob under the container, ignoring `/`.
    pub fn list_blobs_flat(&self, options: ListBlobsOptions) -> Pager<ListBlobsSegment> {
        self.list_blobs(None, options)
    }

    /// List blobs and virtual directories one level below `prefix`.
    pub fn list_blobs_hierarchy(
        &self,
        delimiter: &str,
        options: ListBlobsOptions,
    ) -> Result<Pager<ListBlobsSegment>> {
        if delimiter.is_empty() {
            return Err(Error::request_invalid("delimiter must not be empty"));
        }
        Ok(self.list_blobs(Some(delimiter.to_string()), options))
    }

    fn list_blobs(
        &self,
        delimiter: Option<String>,
        options: ListBlobsOptions,
    ) -> Pager<ListBlobsSegment> {
        let pipeline = self.pipeline.clone();
        let url = self.url.clone();
        let marker = options.marker.clone();

        Pager::new(marker, move |marker| {
            let req = BlobRequest::get(&url)
                .query("restype", "container")
                .query("comp", "list")
                .query_opt("prefix", options.prefix.as_deref())
                .query_opt("delimiter", delimiter.as_deref())
                .query_opt("marker", marker)
                .query_opt("maxresults", options.max_results)
                .query_opt("include", join_include(&options.include));
            let pipeline = pipeline.clone();

            async move {
                let resp = pipeline.send_bytes(req).await?;
                let page: ListBlobsSegment = from_xml(resp.body())?;
                let next = page.next_marker.clone();
                Ok((page, next))
            }
            .boxed()
        })
    }

    /// The container url with a service SAS attached.
    ///
    /// The container name of `values` is taken from the url. Requires a
    /// shared key credential.
    pub fn sas_url(&self, values: &BlobSasSignatureValues) -> Result<Url> {
        sign_url(&self.pipeline, &self.url, |parts: &BlobUrlParts, key| {
            BlobSasSignatureValues {
                container_name: parts.container_name.clone(),
                blob_name: String::new(),
                snapshot: None,
                ..values.clone()
            }
            .sign(key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessPolicy;
    use crate::pipeline::tests::{test_credential, test_options, ScriptedHttpSend};
    use crate::sas::ContainerSasPermissions;
    use azblob_core::ErrorKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://account.blob.core.windows.net/container";

    fn client(http: &ScriptedHttpSend) -> ContainerClient {
        ContainerClient::new(URL, Some(test_credential()), test_options(http)).unwrap()
    }

    fn policy() -> AccessPolicy {
        let t = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        AccessPolicy {
            start: Some(t),
            expiry: Some(t + chrono::TimeDelta::days(1)),
            permission: Some("rl".parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn test_set_access_policy() {
        let http = ScriptedHttpSend::default();
        http.push(200, &[], "");

        client(&http)
            .set_access_policy(
                &[SignedIdentifier::new("read-only", policy())],
                SetAccessPolicyOptions {
                    access: Some(PublicAccessType::Container),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("restype=container&comp=acl"));
        assert_eq!(req.headers["x-ms-blob-public-access"], "container");
        assert_eq!(req.headers["content-type"], "application/xml");
        let body = String::from_utf8(req.body.to_vec()).unwrap();
        assert!(body.contains("<Id>read-only</Id>"));
        assert!(body.contains("<Permission>rl</Permission>"));
    }

    #[tokio::test]
    async fn test_too_many_identifiers_are_not_sent() {
        let http = ScriptedHttpSend::default();
        let identifiers: Vec<_> = (0..6)
            .map(|i| SignedIdentifier::new(format!("id{i}"), policy()))
            .collect();

        let err = client(&http)
            .set_access_policy(&identifiers, SetAccessPolicyOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_access_policy() {
        let http = ScriptedHttpSend::default();
        http.push(
            200,
            &[("x-ms-blob-public-access", "blob")],
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><SignedIdentifiers><SignedIdentifier><Id>p1</Id><AccessPolicy><Start>2022-03-01T08:12:34.0000000Z</Start><Expiry>2022-03-02T08:12:34.0000000Z</Expiry><Permission>rl</Permission></AccessPolicy></SignedIdentifier></SignedIdentifiers>",
        );

        let resp = client(&http)
            .get_access_policy(&LeaseAccessConditions::default())
            .await
            .unwrap();
        assert_eq!(resp.public_access, Some(PublicAccessType::Blob));
        assert_eq!(resp.signed_identifiers.len(), 1);
        assert_eq!(resp.signed_identifiers[0].id, "p1");
        assert_eq!(resp.signed_identifiers[0].access_policy, Some(policy()));
    }

    #[tokio::test]
    async fn test_list_blobs_hierarchy() {
        let http = ScriptedHttpSend::default();
        http.push(
            200,
            &[],
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults ServiceEndpoint=\"https://account.blob.core.windows.net/\" ContainerName=\"container\"><Prefix>logs/</Prefix><Delimiter>/</Delimiter><Blobs><Blob><Name>logs/a.txt</Name><Properties><Etag>0x1</Etag><Content-Length>3</Content-Length><BlobType>BlockBlob</BlobType></Properties></Blob><BlobPrefix><Name>logs/2022/</Name></BlobPrefix></Blobs><NextMarker /></EnumerationResults>",
        );

        let mut pager = client(&http)
            .list_blobs_hierarchy(
                "/",
                ListBlobsOptions {
                    prefix: Some("logs/".to_string()),
                    include: vec![ListBlobsInclude::Metadata, ListBlobsInclude::Snapshots],
                    ..Default::default()
                },
            )
            .unwrap();
        let page = pager.next_page().await.unwrap().unwrap();
        assert!(!pager.more());

        assert_eq!(page.blobs().len(), 1);
        assert_eq!(page.blobs()[0].name, "logs/a.txt");
        assert_eq!(page.prefixes().collect::<Vec<_>>(), vec!["logs/2022/"]);
        assert_eq!(
            http.last_request().uri.query(),
            Some("restype=container&comp=list&prefix=logs/&delimiter=/&include=metadata%2Csnapshots")
        );
    }

    #[tokio::test]
    async fn test_get_properties() {
        let http = ScriptedHttpSend::default();
        http.push(
            200,
            &[
                ("etag", "\"0x3\""),
                ("x-ms-meta-owner", "ops"),
                ("x-ms-lease-state", "available"),
            ],
            "",
        );

        let props = client(&http)
            .get_properties(&LeaseAccessConditions::default())
            .await
            .unwrap();
        assert_eq!(props.metadata.get("owner").map(String::as_str), Some("ops"));
        assert_eq!(http.last_request().method, http::Method::HEAD);
    }

    #[test]
    fn test_child_clients() {
        let http = ScriptedHttpSend::default();
        let c = client(&http);
        assert_eq!(
            c.blob_client("a/b c").unwrap().url().as_str(),
            "https://account.blob.core.windows.net/container/a/b%20c"
        );
        assert_eq!(
            c.blob_client("").unwrap_err().kind(),
            ErrorKind::RequestInvalid
        );
    }

    #[test]
    fn test_sas_url() {
        let http = ScriptedHttpSend::default();
        let expiry = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        let values = BlobSasSignatureValues::for_container(
            "ignored",
            "rl".parse::<ContainerSasPermissions>().unwrap(),
            expiry,
        );

        let url = client(&http).sas_url(&values).unwrap();
        let query = url.query().unwrap();
        assert!(query.starts_with("sv=2019-12-12&se=2022-03-01T08%3A12%3A34Z&sr=c&sp=rl&sig="));
        assert_eq!(url.path(), "/container");
    }
}
