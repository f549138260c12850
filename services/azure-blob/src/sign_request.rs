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

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use azblob_core::time::{format_http_date, now, DateTime};
use azblob_core::{Context, Error, Result, SignRequest, SigningMethod, SigningRequest};
use http::request::Parts;
use http::{header, HeaderMap, HeaderValue, Method, Uri};
use log::debug;
use percent_encoding::percent_encode;

use crate::constants::*;
use crate::sas::{
    AccountSasPermissions, AccountSasResourceTypes, AccountSasServices, AccountSasSignatureValues,
};
use crate::Credential;

/// RequestSigner that implement Azure Storage Shared Key Authorization.
///
/// - [Authorize with Shared Key](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
#[derive(Debug)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new builder for Azure Storage signer.
    pub fn new() -> Self {
        Self { time: None }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::request_invalid("credential is required"));
        };

        let method = if let Some(expires_in) = expires_in {
            SigningMethod::Query(expires_in)
        } else {
            SigningMethod::Header
        };

        let mut ctx = SigningRequest::build(req)?;
        let now_time = self.time.unwrap_or_else(now);

        match (cred, method) {
            (Credential::SasToken { token }, _) => {
                ctx.query_append(token);
            }
            (Credential::BearerToken { .. }, SigningMethod::Query(_)) => {
                return Err(Error::request_invalid(
                    "BearerToken can't be used in query string",
                ));
            }
            (Credential::BearerToken { expires_in, .. }, SigningMethod::Header)
                if expires_in.is_some_and(|t| t <= now_time) =>
            {
                return Err(Error::credential_expired("bearer token has expired"));
            }
            (Credential::BearerToken { token, .. }, SigningMethod::Header) => {
                ctx.headers
                    .insert(X_MS_DATE, format_http_date(now_time).parse()?);
                ctx.headers.insert(header::AUTHORIZATION, {
                    let mut value: HeaderValue = format!("Bearer {token}").parse()?;
                    value.set_sensitive(true);
                    value
                });
            }
            (Credential::SharedKey(key), SigningMethod::Query(d)) => {
                let expiry = now_time
                    + chrono::TimeDelta::from_std(d).map_err(|e| {
                        Error::request_invalid("expires_in is out of range").with_source(e)
                    })?;
                let sas = AccountSasSignatureValues {
                    protocol: None,
                    start: None,
                    expiry: Some(expiry),
                    permissions: "rwdlacu".parse::<AccountSasPermissions>()?,
                    services: AccountSasServices {
                        blob: true,
                        ..Default::default()
                    },
                    resource_types: AccountSasResourceTypes {
                        service: true,
                        container: true,
                        object: true,
                    },
                    ..Default::default()
                }
                .sign(key)?;

                for (k, v) in sas.to_pairs() {
                    ctx.query_push(k, v);
                }
            }
            (Credential::SharedKey(key), SigningMethod::Header) => {
                ctx.headers
                    .insert(X_MS_DATE, format_http_date(now_time).parse()?);

                let string_to_sign = string_to_sign(&ctx, key.account_name())?;
                let signature = key.compute_hmac_sha256(&string_to_sign);

                ctx.headers.insert(header::AUTHORIZATION, {
                    let mut value: HeaderValue =
                        format!("SharedKey {}:{signature}", key.account_name()).parse()?;
                    value.set_sensitive(true);
                    value
                });
            }
        }

        // Apply percent encoding for query parameters
        for (_, v) in ctx.query.iter_mut() {
            *v = percent_encode(v.as_bytes(), &AZURE_QUERY_ENCODE_SET).to_string();
        }

        ctx.apply(req)
    }
}

/// Build the Shared Key string to sign for a request.
///
/// `url` must be absolute; a url without scheme or host fails with
/// [`azblob_core::ErrorKind::UrlInvalid`]. Nothing is read from the clock, so
/// identical inputs always give identical output.
pub fn canonicalize(
    method: &Method,
    url: &str,
    headers: &HeaderMap,
    account_name: &str,
) -> Result<String> {
    let uri: Uri = url.parse()?;

    let (mut parts, _) = http::Request::new(()).into_parts();
    parts.method = method.clone();
    parts.uri = uri;
    parts.headers = headers.clone();

    let ctx = SigningRequest::build(&mut parts)?;
    string_to_sign(&ctx, account_name)
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders + "\n" +
/// CanonicalizedResource;
/// ```
///
/// ## Reference
///
/// - [Blob, Queue, and File Services (Shared Key authorization)](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
pub fn string_to_sign(ctx: &SigningRequest, account_name: &str) -> Result<String> {
    let content_length = match ctx.header_get_or_default(&header::CONTENT_LENGTH)? {
        "0" => "",
        v => v,
    };

    let canonicalized_headers = canonicalize_header(ctx)?;
    let canonicalized_resource = canonicalize_resource(ctx, account_name);

    let lines = [
        ctx.method.as_str(),
        ctx.header_get_or_default(&header::CONTENT_ENCODING)?,
        ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?,
        content_length,
        ctx.header_get_or_default(&header::HeaderName::from_static(CONTENT_MD5))?,
        ctx.header_get_or_default(&header::CONTENT_TYPE)?,
        ctx.header_get_or_default(&header::DATE)?,
        ctx.header_get_or_default(&header::IF_MODIFIED_SINCE)?,
        ctx.header_get_or_default(&header::IF_MATCH)?,
        ctx.header_get_or_default(&header::IF_NONE_MATCH)?,
        ctx.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?,
        ctx.header_get_or_default(&header::RANGE)?,
        canonicalized_headers.as_str(),
        canonicalized_resource.as_str(),
    ];
    let s = lines.join("\n");

    debug!("string to sign: {}", &s);

    Ok(s)
}

/// ## Reference
///
/// - [Constructing the canonicalized headers string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-headers-string)
fn canonicalize_header(ctx: &SigningRequest) -> Result<String> {
    Ok(SigningRequest::header_to_string(
        ctx.header_to_vec_with_prefix("x-ms-")?,
        ":",
        "\n",
    ))
}

/// ## Reference
///
/// - [Constructing the canonicalized resource string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    let path = if ctx.path.is_empty() { "/" } else { &ctx.path };
    let mut s = format!("/{account_name}{path}");

    let mut params: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (k, v) in &ctx.query {
        params.entry(k.to_lowercase()).or_default().push(v);
    }

    for (k, mut values) in params {
        values.sort_unstable();
        s.push('\n');
        s.push_str(&k);
        s.push(':');
        s.push_str(&values.join(","));
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use azblob_core::ErrorKind;
    use chrono::TimeZone;
    use http::Request;
    use pretty_assertions::assert_eq;

    fn test_time() -> DateTime {
        chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
    }

    fn shared_key() -> Credential {
        Credential::with_shared_key("account", "c2VjcmV0a2V5a2V5").unwrap()
    }

    #[test]
    fn test_canonicalize_minimal_get() {
        let s = canonicalize(
            &Method::GET,
            "https://account.blob.core.windows.net/container",
            &HeaderMap::new(),
            "account",
        )
        .unwrap();

        assert_eq!(s, format!("GET{}/account/container", "\n".repeat(13)));
    }

    #[test]
    fn test_canonicalize_empty_path_keeps_slash() {
        let s = canonicalize(
            &Method::GET,
            "https://account.blob.core.windows.net?comp=list",
            &HeaderMap::new(),
            "account",
        )
        .unwrap();

        assert!(s.ends_with("\n/account/\ncomp:list"), "{s}");
    }

    #[test]
    fn test_canonicalize_headers_and_query() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Length", "0".parse().unwrap());
        headers.insert("Content-Type", "text/plain".parse().unwrap());
        headers.insert("X-MS-Version", "2019-12-12".parse().unwrap());
        headers.append("x-ms-meta-b", "2".parse().unwrap());
        headers.append("x-ms-meta-b", "1".parse().unwrap());
        headers.insert("x-ms-meta-a", "z".parse().unwrap());

        let s = canonicalize(
            &Method::PUT,
            "https://account.blob.core.windows.net/container/a%20b?restype=container&Comp=metadata&include=b&include=a",
            &headers,
            "account",
        )
        .unwrap();

        assert_eq!(
            s,
            [
                "PUT",
                "",
                "",
                "",
                "",
                "text/plain",
                "",
                "",
                "",
                "",
                "",
                "",
                "x-ms-meta-a:z\nx-ms-meta-b:2,1\nx-ms-version:2019-12-12",
                "/account/container/a%20b\ncomp:metadata\ninclude:a,b\nrestype:container",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_canonicalize_is_deterministic() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-date", "Tue, 01 Mar 2022 08:12:34 GMT".parse().unwrap());
        let url = "https://account.blob.core.windows.net/c/b?snapshot=x";

        let first = canonicalize(&Method::HEAD, url, &headers, "account").unwrap();
        let second = canonicalize(&Method::HEAD, url, &headers, "account").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_canonicalize_malformed_url() {
        for url in ["not a url", "/container/blob"] {
            let err = canonicalize(&Method::GET, url, &HeaderMap::new(), "account").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UrlInvalid, "{url}");
        }
    }

    #[tokio::test]
    async fn test_shared_key_header() {
        let ctx = Context::new();
        let signer = RequestSigner::new().with_time(test_time());

        let req = Request::builder()
            .method(Method::GET)
            .uri("https://account.blob.core.windows.net/container?restype=container&comp=list")
            .header("x-ms-version", "2019-12-12")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        signer
            .sign_request(&ctx, &mut parts, Some(&shared_key()), None)
            .await
            .unwrap();

        assert_eq!(
            parts.headers.get("x-ms-date").unwrap(),
            "Tue, 01 Mar 2022 08:12:34 GMT"
        );
        assert_eq!(
            parts.headers.get("authorization").unwrap(),
            "SharedKey account:P4ckDrLOpJTXKhokp2J81ZYa5buSWMSLoT756Yi8QQI="
        );
        assert_eq!(
            parts.uri,
            "https://account.blob.core.windows.net/container?restype=container&comp=list"
        );
    }

    #[tokio::test]
    async fn test_shared_key_header_put() {
        let ctx = Context::new();
        let signer = RequestSigner::new().with_time(test_time());

        let req = Request::builder()
            .method(Method::PUT)
            .uri("https://account.blob.core.windows.net/container/blob.txt")
            .header("content-length", "11")
            .header("content-type", "text/plain")
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", "2019-12-12")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        signer
            .sign_request(&ctx, &mut parts, Some(&shared_key()), None)
            .await
            .unwrap();

        assert_eq!(
            parts.headers.get("authorization").unwrap(),
            "SharedKey account:8e6mRzljRRB701UQFdsErRE64j3Y/JtiTyVFAmH0Srg="
        );
    }

    #[tokio::test]
    async fn test_shared_key_query() {
        let ctx = Context::new();
        let signer = RequestSigner::new().with_time(test_time());

        let req = Request::builder()
            .uri("https://account.blob.core.windows.net/container/blob")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        signer
            .sign_request(
                &ctx,
                &mut parts,
                Some(&shared_key()),
                Some(Duration::from_secs(300)),
            )
            .await
            .unwrap();

        let query = parts.uri.query().unwrap();
        assert!(
            query.starts_with("sv=2019-12-12&ss=b&srt=sco&se=2022-03-01T08%3A17%3A34Z&sp=rwdlacu&sig="),
            "{query}"
        );
        assert!(parts.headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_sas_token() {
        let token = "sv=2019-12-12&ss=b&srt=sco&sp=rl&se=2022-03-01T09%3A12%3A34Z&spr=https&sig=Ymx1ZQ%3D%3D";
        let cred = Credential::with_sas_token(token);

        let req = Request::builder()
            .uri("https://account.blob.core.windows.net/container/blob")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        RequestSigner::new()
            .sign_request(&Context::new(), &mut parts, Some(&cred), None)
            .await
            .unwrap();
        assert_eq!(parts.uri.query(), Some(token));
        assert!(parts.headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let ctx = Context::new();
        let cred = Credential::with_bearer_token(
            "token",
            Some(now() + chrono::TimeDelta::try_hours(1).unwrap()),
        );
        let builder = RequestSigner::new();

        let req = Request::builder()
            .uri("https://test.blob.core.windows.net/testbucket/testblob")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        // Can effectively sign request with header method
        assert!(builder
            .sign_request(&ctx, &mut parts, Some(&cred), None)
            .await
            .is_ok());
        let authorization = parts
            .headers
            .get("Authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!("Bearer token", authorization);

        // Will not sign request with query method
        let req = Request::builder()
            .uri("https://test.blob.core.windows.net/testbucket/testblob")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        assert!(builder
            .sign_request(&ctx, &mut parts, Some(&cred), Some(Duration::from_secs(1)))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_expired_bearer_token() {
        let cred = Credential::with_bearer_token(
            "token",
            Some(test_time() - chrono::TimeDelta::minutes(1)),
        );
        let req = Request::builder()
            .uri("https://account.blob.core.windows.net/container/blob")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        let err = RequestSigner::new()
            .with_time(test_time())
            .sign_request(&Context::new(), &mut parts, Some(&cred), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialExpired);
        assert!(parts.headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let req = Request::builder()
            .uri("https://test.blob.core.windows.net/testbucket/testblob")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        let err = RequestSigner::new()
            .sign_request(&Context::new(), &mut parts, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }
}
