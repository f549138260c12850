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

use std::collections::HashMap;
use std::fmt;

use azblob_core::hash::{base64_encode, sha256};
use azblob_core::time::DateTime;
use azblob_core::utils::Redact;
use azblob_core::{Error, Result};

use super::EncryptionAlgorithm;

/// User defined `name: value` pairs stored with a container or blob.
pub type Metadata = HashMap<String, String>;

/// Condition on the active lease of the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseAccessConditions {
    /// The request only succeeds if the target holds this lease.
    pub lease_id: Option<String>,
}

impl LeaseAccessConditions {
    pub fn new(lease_id: impl Into<String>) -> Self {
        Self {
            lease_id: Some(lease_id.into()),
        }
    }
}

/// HTTP conditional headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedAccessConditions {
    pub if_modified_since: Option<DateTime>,
    pub if_unmodified_since: Option<DateTime>,
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    /// SQL where clause on the blob's tags.
    pub if_tags: Option<String>,
}

impl ModifiedAccessConditions {
    /// Only succeed while the target still has this ETag.
    pub fn if_match(etag: impl Into<String>) -> Self {
        Self {
            if_match: Some(etag.into()),
            ..Default::default()
        }
    }
}

/// Standard HTTP properties of a blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobHttpHeaders {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    /// Raw MD5 digest of the whole blob, sent base64 encoded.
    pub content_md5: Option<Vec<u8>>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
}

/// A key the service encrypts blob data with instead of its own.
///
/// The service keeps only the key's hash, so every later read or write of
/// the blob must present the same key.
#[derive(Clone, PartialEq, Eq)]
pub struct CpkInfo {
    /// Base64 encoded AES-256 key.
    pub encryption_key: String,
    /// Base64 encoded SHA-256 of the raw key.
    pub encryption_key_sha256: String,
    pub algorithm: EncryptionAlgorithm,
}

impl CpkInfo {
    /// Use a raw 32 byte AES-256 key.
    pub fn new(key: &[u8]) -> Self {
        Self {
            encryption_key: base64_encode(key),
            encryption_key_sha256: base64_encode(&sha256(key)),
            algorithm: EncryptionAlgorithm::Aes256,
        }
    }
}

impl fmt::Debug for CpkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpkInfo")
            .field("encryption_key", &Redact::from(&self.encryption_key))
            .field("encryption_key_sha256", &self.encryption_key_sha256)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// A byte range of a blob.
///
/// `count` of `None` reads to the end of the blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpRange {
    pub offset: u64,
    pub count: Option<u64>,
}

impl HttpRange {
    pub fn new(offset: u64, count: Option<u64>) -> Self {
        Self { offset, count }
    }

    /// Render as `bytes=start-end`, or `None` for the whole blob.
    ///
    /// An empty range, or one ending past `u64::MAX`, can't be expressed and
    /// fails with `RequestInvalid`.
    pub fn format(&self) -> Result<Option<String>> {
        let Some(count) = self.count else {
            return Ok((self.offset != 0).then(|| format!("bytes={}-", self.offset)));
        };
        if count == 0 {
            return Err(Error::request_invalid(format!(
                "range at offset {} is empty",
                self.offset
            )));
        }
        let end = self.offset.checked_add(count - 1).ok_or_else(|| {
            Error::request_invalid(format!(
                "range of {count} bytes at offset {} overflows",
                self.offset
            ))
        })?;
        Ok(Some(format!("bytes={}-{end}", self.offset)))
    }
}

/// Check that every key is usable as a C# identifier.
///
/// Keys travel as `x-ms-meta-<key>` headers; the service rejects anything
/// else.
pub fn validate_metadata(metadata: &Metadata) -> Result<()> {
    for key in metadata.keys() {
        let mut chars = key.chars();
        let valid = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !valid {
            return Err(Error::request_invalid(format!(
                "metadata key '{key}' is not a valid C# identifier"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use azblob_core::ErrorKind;
    use test_case::test_case;

    #[test]
    fn test_cpk_info_from_raw_key() {
        let cpk = CpkInfo::new(b"abc");
        assert_eq!(cpk.encryption_key, "YWJj");
        assert_eq!(
            cpk.encryption_key_sha256,
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
        assert_eq!(cpk.algorithm, EncryptionAlgorithm::Aes256);

        let key = CpkInfo::new(&[7u8; 32]).encryption_key;
        assert!(!format!("{:?}", CpkInfo::new(&[7u8; 32])).contains(&key));
    }

    #[test_case(0, None, None; "whole blob")]
    #[test_case(512, None, Some("bytes=512-"); "open ended")]
    #[test_case(0, Some(512), Some("bytes=0-511"); "first page")]
    #[test_case(10, Some(1), Some("bytes=10-10"); "single byte")]
    #[test_case(u64::MAX, Some(1), Some("bytes=18446744073709551615-18446744073709551615"); "last byte")]
    fn test_http_range(offset: u64, count: Option<u64>, expected: Option<&str>) {
        assert_eq!(
            HttpRange::new(offset, count).format().unwrap().as_deref(),
            expected
        );
    }

    #[test_case(10, Some(0); "empty")]
    #[test_case(u64::MAX, Some(2); "past the end")]
    #[test_case(1, Some(u64::MAX); "count overflows")]
    fn test_unrepresentable_range(offset: u64, count: Option<u64>) {
        let err = HttpRange::new(offset, count).format().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[test_case("owner"; "lowercase")]
    #[test_case("_private"; "leading underscore")]
    #[test_case("Key_2"; "digits")]
    fn test_valid_metadata(key: &str) {
        let m = Metadata::from([(key.to_string(), "v".to_string())]);
        assert!(validate_metadata(&m).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case("2fast"; "leading digit")]
    #[test_case("has-dash"; "dash")]
    #[test_case("has space"; "space")]
    fn test_invalid_metadata(key: &str) {
        let m = Metadata::from([(key.to_string(), "v".to_string())]);
        let err = validate_metadata(&m).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }
}
