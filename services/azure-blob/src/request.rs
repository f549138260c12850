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

use std::fmt::Display;

use azblob_core::hash::base64_encode;
use azblob_core::time::format_http_date;
use azblob_core::{Error, Result};
use bytes::Bytes;
use http::header::{
    CONTENT_LENGTH, CONTENT_TYPE, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    IF_UNMODIFIED_SINCE,
};
use http::{HeaderName, HeaderValue, Method};
use percent_encoding::utf8_percent_encode;
use url::Url;

use crate::constants::*;
use crate::models::{
    BlobHttpHeaders, CpkInfo, HttpRange, LeaseAccessConditions, Metadata,
    ModifiedAccessConditions,
};

/// An unsigned request against a blob service resource.
///
/// Values are collected as plain strings and only checked in
/// [`BlobRequest::build`], so operations can chain setters without
/// handling errors at every step.
#[derive(Debug, Clone)]
pub(crate) struct BlobRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl BlobRequest {
    pub(crate) fn new(method: Method, url: &Url) -> Self {
        Self {
            method,
            url: url.clone(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn get(url: &Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub(crate) fn put(url: &Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub(crate) fn head(url: &Url) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub(crate) fn delete(url: &Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub(crate) fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn query(mut self, key: &str, value: impl Display) -> Self {
        let pair = format!(
            "{key}={}",
            utf8_percent_encode(&value.to_string(), &AZURE_QUERY_ENCODE_SET)
        );
        let query = match self.url.query() {
            Some(q) if !q.is_empty() => format!("{q}&{pair}"),
            _ => pair,
        };
        self.url.set_query(Some(&query));
        self
    }

    pub(crate) fn query_opt(self, key: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub(crate) fn header(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }

    pub(crate) fn header_opt(self, name: impl Into<String>, value: Option<impl Display>) -> Self {
        match value {
            Some(v) => self.header(name, v),
            None => self,
        }
    }

    pub(crate) fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub(crate) fn lease(self, lease: &LeaseAccessConditions) -> Self {
        self.header_opt(X_MS_LEASE_ID, lease.lease_id.as_deref())
    }

    pub(crate) fn conditions(self, conditions: &ModifiedAccessConditions) -> Self {
        self.header_opt(
            IF_MODIFIED_SINCE.as_str(),
            conditions.if_modified_since.map(format_http_date),
        )
        .header_opt(
            IF_UNMODIFIED_SINCE.as_str(),
            conditions.if_unmodified_since.map(format_http_date),
        )
        .header_opt(IF_MATCH.as_str(), conditions.if_match.as_deref())
        .header_opt(IF_NONE_MATCH.as_str(), conditions.if_none_match.as_deref())
        .header_opt("x-ms-if-tags", conditions.if_tags.as_deref())
    }

    /// The same conditions, applied to the source of a copy.
    pub(crate) fn source_conditions(self, conditions: &ModifiedAccessConditions) -> Self {
        self.header_opt(
            "x-ms-source-if-modified-since",
            conditions.if_modified_since.map(format_http_date),
        )
        .header_opt(
            "x-ms-source-if-unmodified-since",
            conditions.if_unmodified_since.map(format_http_date),
        )
        .header_opt("x-ms-source-if-match", conditions.if_match.as_deref())
        .header_opt("x-ms-source-if-none-match", conditions.if_none_match.as_deref())
        .header_opt("x-ms-source-if-tags", conditions.if_tags.as_deref())
    }

    /// Blob properties stored with the blob, sent as `x-ms-blob-*`.
    pub(crate) fn http_headers(self, headers: &BlobHttpHeaders) -> Self {
        self.header_opt("x-ms-blob-content-type", headers.content_type.as_deref())
            .header_opt(
                "x-ms-blob-content-encoding",
                headers.content_encoding.as_deref(),
            )
            .header_opt(
                "x-ms-blob-content-language",
                headers.content_language.as_deref(),
            )
            .header_opt(
                "x-ms-blob-content-md5",
                headers.content_md5.as_deref().map(base64_encode),
            )
            .header_opt("x-ms-blob-cache-control", headers.cache_control.as_deref())
            .header_opt(
                "x-ms-blob-content-disposition",
                headers.content_disposition.as_deref(),
            )
    }

    pub(crate) fn metadata(mut self, metadata: &Metadata) -> Self {
        // Sorted so the same metadata always produces the same request.
        let mut pairs: Vec<_> = metadata.iter().collect();
        pairs.sort();
        for (k, v) in pairs {
            self = self.header(format!("{X_MS_META_PREFIX}{k}"), v);
        }
        self
    }

    /// Server side encryption of the data this request writes or reads.
    pub(crate) fn encryption(self, cpk: Option<&CpkInfo>, scope: Option<&str>) -> Self {
        self.header_opt(X_MS_ENCRYPTION_KEY, cpk.map(|c| &c.encryption_key))
            .header_opt(
                X_MS_ENCRYPTION_KEY_SHA256,
                cpk.map(|c| &c.encryption_key_sha256),
            )
            .header_opt(X_MS_ENCRYPTION_ALGORITHM, cpk.map(|c| c.algorithm))
            .header_opt(X_MS_ENCRYPTION_SCOPE, scope)
    }

    pub(crate) fn range(self, range: HttpRange) -> Result<Self> {
        Ok(self.header_opt(X_MS_RANGE, range.format()?))
    }

    pub(crate) fn content_md5(self, md5: Option<&[u8]>) -> Self {
        self.header_opt(CONTENT_MD5, md5.map(base64_encode))
    }

    pub(crate) fn content_type(self, content_type: &str) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Build the http request.
    ///
    /// Requests that may carry a body always get an explicit
    /// `Content-Length`, even when it's zero.
    pub(crate) fn build(self) -> Result<http::Request<Bytes>> {
        let mut req = http::Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str());

        for (k, v) in self.headers {
            let name = HeaderName::from_bytes(k.as_bytes())?;
            let value = HeaderValue::from_str(&v)?;
            req = req.header(name, value);
        }

        if self.method != Method::GET && self.method != Method::HEAD {
            req = req.header(CONTENT_LENGTH, self.body.len());
        }

        Ok(req.body(self.body)?)
    }
}

/// Append `/`-separated blob name segments to a container url.
pub(crate) fn join_blob_name(container_url: &Url, blob_name: &str) -> Result<Url> {
    let mut url = container_url.clone();
    url.path_segments_mut()
        .map_err(|_| Error::url_invalid("url can't be a base"))?
        .pop_if_empty()
        .extend(blob_name.split('/'));
    Ok(url)
}

/// Append a single path segment, like a container name.
pub(crate) fn join_segment(base: &Url, segment: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::url_invalid("url can't be a base"))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}
