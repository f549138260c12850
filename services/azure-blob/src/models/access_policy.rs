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
use azblob_core::{Error, Result};
use serde::Deserialize;

use super::xml::{de_opt_parse, de_opt_rfc3339};
use crate::sas::{check_time_range, AccessPolicyPermission};

/// Upper bound of stored access policies on one container.
pub const MAX_SIGNED_IDENTIFIERS: usize = 5;
const MAX_IDENTIFIER_LEN: usize = 64;

/// A named stored access policy of a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedIdentifier {
    /// Unique id of the policy, at most 64 characters.
    pub id: String,
    #[serde(default)]
    pub access_policy: Option<AccessPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessPolicy {
    #[serde(default, deserialize_with = "de_opt_rfc3339")]
    pub start: Option<DateTime>,
    #[serde(default, deserialize_with = "de_opt_rfc3339")]
    pub expiry: Option<DateTime>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub permission: Option<AccessPolicyPermission>,
}

impl SignedIdentifier {
    pub fn new(id: impl Into<String>, access_policy: AccessPolicy) -> Self {
        Self {
            id: id.into(),
            access_policy: Some(access_policy),
        }
    }
}

/// Check a container ACL before it goes on the wire.
pub fn validate_signed_identifiers(items: &[SignedIdentifier]) -> Result<()> {
    if items.len() > MAX_SIGNED_IDENTIFIERS {
        return Err(Error::request_invalid(format!(
            "at most {MAX_SIGNED_IDENTIFIERS} signed identifiers are allowed, got {}",
            items.len()
        )));
    }

    for item in items {
        if item.id.is_empty() || item.id.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(Error::request_invalid(format!(
                "signed identifier id must be 1 to {MAX_IDENTIFIER_LEN} characters: '{}'",
                item.id
            )));
        }
        if let Some(policy) = &item.access_policy {
            check_time_range(policy.start, policy.expiry)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use azblob_core::ErrorKind;
    use chrono::TimeZone;

    fn policy(hours: i64) -> AccessPolicy {
        let t = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        AccessPolicy {
            start: Some(t),
            expiry: Some(t + chrono::TimeDelta::hours(hours)),
            permission: Some("r".parse().unwrap()),
        }
    }

    #[test]
    fn test_five_identifiers_allowed() {
        let items: Vec<_> = (0..5)
            .map(|i| SignedIdentifier::new(format!("id{i}"), policy(1)))
            .collect();
        assert!(validate_signed_identifiers(&items).is_ok());
    }

    #[test]
    fn test_six_identifiers_rejected() {
        let items: Vec<_> = (0..6)
            .map(|i| SignedIdentifier::new(format!("id{i}"), policy(1)))
            .collect();
        let err = validate_signed_identifiers(&items).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_long_id_rejected() {
        let items = vec![SignedIdentifier::new("x".repeat(65), policy(1))];
        let err = validate_signed_identifiers(&items).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_inverted_policy_rejected() {
        let items = vec![SignedIdentifier::new("id", policy(-1))];
        let err = validate_signed_identifiers(&items).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimeRange);
    }
}
