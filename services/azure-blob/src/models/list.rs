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
use serde::Deserialize;

use super::xml::{de_opt_http_date, de_opt_parse, de_opt_string};
use super::{
    AccessTier, BlobType, CopyStatus, LeaseDuration, LeaseState, LeaseStatus, Metadata,
    PublicAccessType,
};

/// One page of `List Containers`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListContainersSegment {
    #[serde(rename = "@ServiceEndpoint", default)]
    pub service_endpoint: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub marker: Option<String>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub max_results: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub next_marker: Option<String>,
    #[serde(default, rename = "Containers")]
    containers_xml: ContainersXml,
}

impl ListContainersSegment {
    pub fn containers(&self) -> &[ContainerItem] {
        &self.containers_xml.items
    }

    pub fn into_containers(self) -> Vec<ContainerItem> {
        self.containers_xml.items
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ContainersXml {
    #[serde(rename = "Container", default)]
    items: Vec<ContainerItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerItem {
    pub name: String,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub version: Option<String>,
    pub properties: ContainerItemProperties,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerItemProperties {
    #[serde(rename = "Last-Modified", default, deserialize_with = "de_opt_http_date")]
    pub last_modified: Option<DateTime>,
    pub etag: String,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub lease_status: Option<LeaseStatus>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub lease_state: Option<LeaseState>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub lease_duration: Option<LeaseDuration>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub public_access: Option<PublicAccessType>,
    #[serde(default)]
    pub has_immutability_policy: Option<bool>,
    #[serde(default)]
    pub has_legal_hold: Option<bool>,
}

/// One page of `List Blobs`, flat or by hierarchy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListBlobsSegment {
    #[serde(rename = "@ServiceEndpoint", default)]
    pub service_endpoint: String,
    #[serde(rename = "@ContainerName", default)]
    pub container_name: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub marker: Option<String>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub max_results: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub delimiter: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub next_marker: Option<String>,
    #[serde(default, rename = "Blobs")]
    blobs_xml: BlobsXml,
}

impl ListBlobsSegment {
    pub fn blobs(&self) -> &[BlobItem] {
        &self.blobs_xml.blobs
    }

    /// Virtual directories, only set when listing by hierarchy.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.blobs_xml.prefixes.iter().map(|v| v.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BlobsXml {
    #[serde(rename = "Blob", default)]
    blobs: Vec<BlobItem>,
    #[serde(rename = "BlobPrefix", default)]
    prefixes: Vec<BlobPrefix>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobPrefix {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobItem {
    pub name: String,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub snapshot: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub version_id: Option<String>,
    #[serde(default)]
    pub is_current_version: Option<bool>,
    pub properties: BlobItemProperties,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobItemProperties {
    #[serde(rename = "Creation-Time", default, deserialize_with = "de_opt_http_date")]
    pub creation_time: Option<DateTime>,
    #[serde(rename = "Last-Modified", default, deserialize_with = "de_opt_http_date")]
    pub last_modified: Option<DateTime>,
    pub etag: String,
    #[serde(rename = "Content-Length", default)]
    pub content_length: u64,
    #[serde(rename = "Content-Type", default, deserialize_with = "de_opt_string")]
    pub content_type: Option<String>,
    #[serde(rename = "Content-Encoding", default, deserialize_with = "de_opt_string")]
    pub content_encoding: Option<String>,
    #[serde(rename = "Content-Language", default, deserialize_with = "de_opt_string")]
    pub content_language: Option<String>,
    #[serde(rename = "Content-MD5", default, deserialize_with = "de_opt_string")]
    pub content_md5: Option<String>,
    #[serde(rename = "Cache-Control", default, deserialize_with = "de_opt_string")]
    pub cache_control: Option<String>,
    #[serde(rename = "Content-Disposition", default, deserialize_with = "de_opt_string")]
    pub content_disposition: Option<String>,
    #[serde(rename = "x-ms-blob-sequence-number", default, deserialize_with = "de_opt_parse")]
    pub blob_sequence_number: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub blob_type: Option<BlobType>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub access_tier: Option<AccessTier>,
    #[serde(default)]
    pub access_tier_inferred: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub lease_status: Option<LeaseStatus>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub lease_state: Option<LeaseState>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub lease_duration: Option<LeaseDuration>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub copy_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub copy_status: Option<CopyStatus>,
    #[serde(default)]
    pub server_encrypted: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub tag_count: Option<u32>,
    #[serde(default)]
    pub sealed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::xml::from_xml;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_containers() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/">
  <Prefix>data</Prefix>
  <MaxResults>2</MaxResults>
  <Containers>
    <Container>
      <Name>data-1</Name>
      <Properties>
        <Last-Modified>Tue, 01 Mar 2022 08:12:34 GMT</Last-Modified>
        <Etag>"0x8D9FB5C2F2D0B6A"</Etag>
        <LeaseStatus>unlocked</LeaseStatus>
        <LeaseState>available</LeaseState>
        <PublicAccess>blob</PublicAccess>
        <HasImmutabilityPolicy>false</HasImmutabilityPolicy>
        <HasLegalHold>false</HasLegalHold>
      </Properties>
      <Metadata><owner>ops</owner></Metadata>
    </Container>
    <Container>
      <Name>data-2</Name>
      <Properties>
        <Last-Modified>Tue, 01 Mar 2022 08:12:35 GMT</Last-Modified>
        <Etag>"0x8D9FB5C2F2D0B6B"</Etag>
      </Properties>
    </Container>
  </Containers>
  <NextMarker>/acct/data-3</NextMarker>
</EnumerationResults>"#;

        let page: ListContainersSegment = from_xml(body.as_bytes()).unwrap();
        assert_eq!(page.service_endpoint, "https://acct.blob.core.windows.net/");
        assert_eq!(page.prefix.as_deref(), Some("data"));
        assert_eq!(page.marker, None);
        assert_eq!(page.max_results, Some(2));
        assert_eq!(page.next_marker.as_deref(), Some("/acct/data-3"));

        let items = page.containers();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "data-1");
        assert_eq!(items[0].properties.public_access, Some(PublicAccessType::Blob));
        assert_eq!(items[0].properties.lease_state, Some(LeaseState::Available));
        assert_eq!(items[0].metadata.get("owner").map(String::as_str), Some("ops"));
        assert_eq!(items[1].properties.etag, "\"0x8D9FB5C2F2D0B6B\"");
        assert!(items[1].metadata.is_empty());
    }

    #[test]
    fn test_list_blobs_hierarchy() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="http://127.0.0.1:10000/devstoreaccount1" ContainerName="osa2">
  <Prefix />
  <Delimiter>/</Delimiter>
  <Blobs>
    <BlobPrefix><Name>dir1/</Name></BlobPrefix>
    <Blob>
      <Name>blob0.txt</Name>
      <Properties>
        <Creation-Time>Thu, 01 Jul 2021 10:44:59 GMT</Creation-Time>
        <Last-Modified>Thu, 01 Jul 2021 10:44:59 GMT</Last-Modified>
        <Etag>0x8D93C7D4629C227</Etag>
        <Content-Length>8</Content-Length>
        <Content-Type>text/plain</Content-Type>
        <Content-Encoding />
        <Content-MD5>rvr3UC1SmUw7AZV2NqPN0g==</Content-MD5>
        <BlobType>BlockBlob</BlobType>
        <AccessTier>Hot</AccessTier>
        <AccessTierInferred>true</AccessTierInferred>
        <LeaseStatus>unlocked</LeaseStatus>
        <LeaseState>available</LeaseState>
        <ServerEncrypted>true</ServerEncrypted>
      </Properties>
      <Metadata><userkey>uservalue</userkey></Metadata>
    </Blob>
    <BlobPrefix><Name>dir2/</Name></BlobPrefix>
  </Blobs>
  <NextMarker />
</EnumerationResults>"#;

        let page: ListBlobsSegment = from_xml(body.as_bytes()).unwrap();
        assert_eq!(page.container_name, "osa2");
        assert_eq!(page.prefix, None);
        assert_eq!(page.delimiter.as_deref(), Some("/"));
        assert_eq!(page.next_marker, None);
        assert_eq!(page.prefixes().collect::<Vec<_>>(), vec!["dir1/", "dir2/"]);

        let blob = &page.blobs()[0];
        assert_eq!(blob.name, "blob0.txt");
        assert_eq!(blob.properties.content_length, 8);
        assert_eq!(blob.properties.content_encoding, None);
        assert_eq!(blob.properties.blob_type, Some(BlobType::BlockBlob));
        assert_eq!(blob.properties.access_tier, Some(AccessTier::Hot));
        assert_eq!(blob.metadata.get("userkey").map(String::as_str), Some("uservalue"));
    }
}
