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

use std::net::IpAddr;

use azblob_core::{Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use url::{Host, Url};

use crate::constants::AZURE_QUERY_ENCODE_SET;
use crate::sas::SasQueryParameters;

const SNAPSHOT: &str = "snapshot";
const VERSION_ID: &str = "versionid";

/// The parts of a blob service url.
///
/// ```txt
/// https://account.blob.core.windows.net/container/dir/blob?snapshot=..&sv=..
/// https://account.blob.core.windows.net/container/dir/blob?versionid=..
/// http://127.0.0.1:10000/devstoreaccount1/container/dir/blob
/// ```
///
/// IP-style hosts, as used by the storage emulator, carry the account name
/// in the first path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobUrlParts {
    pub scheme: String,
    /// Host with the port, if any.
    pub host: String,
    /// Account name taken from the path of an IP-style url.
    pub ip_endpoint_style_info: Option<String>,
    pub container_name: String,
    pub blob_name: String,
    pub snapshot: Option<String>,
    pub version_id: Option<String>,
    pub sas: SasQueryParameters,
    /// Query parameters that are neither the snapshot, the version id nor
    /// part of the SAS.
    pub unparsed_params: Vec<(String, String)>,
}

impl BlobUrlParts {
    pub fn parse(url: &str) -> Result<Self> {
        Self::from_url(&Url::parse(url)?)
    }

    pub fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host()
            .ok_or_else(|| Error::url_invalid(format!("url has no host: {url}")))?;
        let ip_style = is_ip_style(&host);

        let mut host = host.to_string();
        if let Some(port) = url.port() {
            host = format!("{host}:{port}");
        }

        let path = url.path().trim_start_matches('/');
        let mut rest = path;
        let mut ip_endpoint_style_info = None;
        if ip_style {
            let (account, tail) = rest.split_once('/').unwrap_or((rest, ""));
            ip_endpoint_style_info = Some(decode(account)?).filter(|v| !v.is_empty());
            rest = tail;
        }
        let (container, blob) = rest.split_once('/').unwrap_or((rest, ""));

        let pairs = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()));
        let (sas, others) = SasQueryParameters::from_pairs(pairs);
        let mut snapshot = None;
        let mut version_id = None;
        let mut unparsed_params = Vec::new();
        for (k, v) in others {
            if k.eq_ignore_ascii_case(SNAPSHOT) {
                snapshot = Some(v).filter(|v| !v.is_empty());
            } else if k.eq_ignore_ascii_case(VERSION_ID) {
                version_id = Some(v).filter(|v| !v.is_empty());
            } else {
                unparsed_params.push((k, v));
            }
        }

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            ip_endpoint_style_info,
            container_name: decode(container)?,
            blob_name: decode(blob)?,
            snapshot,
            version_id,
            sas,
            unparsed_params,
        })
    }

    /// Rebuild the url.
    ///
    /// Query order is the unparsed parameters, then the snapshot and version
    /// id, then the SAS.
    pub fn to_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}://{}/", self.scheme, self.host))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::url_invalid("url can't be a base"))?;
            segments.clear();
            if let Some(account) = &self.ip_endpoint_style_info {
                segments.push(account);
            }
            if !self.container_name.is_empty() {
                segments.push(&self.container_name);
                if !self.blob_name.is_empty() {
                    segments.extend(self.blob_name.split('/'));
                }
            }
        }

        let mut query: Vec<String> = self
            .unparsed_params
            .iter()
            .map(|(k, v)| format!("{k}={}", encode(v)))
            .collect();
        if let Some(snapshot) = &self.snapshot {
            query.push(format!("{SNAPSHOT}={}", encode(snapshot)));
        }
        if let Some(version_id) = &self.version_id {
            query.push(format!("{VERSION_ID}={}", encode(version_id)));
        }
        let sas = self.sas.encode();
        if !sas.is_empty() {
            query.push(sas);
        }
        if !query.is_empty() {
            url.set_query(Some(&query.join("&")));
        }

        Ok(url)
    }
}

/// Emulator endpoints address the service by IP or as `localhost`.
fn is_ip_style(host: &Host<&str>) -> bool {
    match host {
        Host::Ipv4(_) | Host::Ipv6(_) => true,
        Host::Domain(d) => d.eq_ignore_ascii_case("localhost") || d.parse::<IpAddr>().is_ok(),
    }
}

fn decode(v: &str) -> Result<String> {
    percent_decode_str(v)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|e| Error::url_invalid(format!("path is not valid utf-8: {v}")).with_source(e))
}

fn encode(v: &str) -> String {
    utf8_percent_encode(v, &AZURE_QUERY_ENCODE_SET).to_string()
}
