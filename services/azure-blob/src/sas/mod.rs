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

//! Shared Access Signatures.
//!
//! - [Create a service SAS](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas)
//! - [Create an account SAS](https://learn.microsoft.com/en-us/rest/api/storageservices/create-account-sas)

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use azblob_core::time::{format_rfc3339, DateTime};
use azblob_core::{Error, Result};

mod permissions;
pub use permissions::{
    AccessPolicyPermission, AccountSasPermissions, AccountSasResourceTypes, AccountSasServices,
    BlobSasPermissions, ContainerSasPermissions,
};

mod query;
pub use query::SasQueryParameters;

mod service_sas;
pub use service_sas::BlobSasSignatureValues;

mod account_sas;
pub use account_sas::AccountSasSignatureValues;

/// Protocols a SAS may be used over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasProtocol {
    /// HTTPS only.
    Https,
    /// HTTPS and HTTP.
    HttpsAndHttp,
}

impl SasProtocol {
    fn as_str(&self) -> &'static str {
        match self {
            SasProtocol::Https => "https",
            SasProtocol::HttpsAndHttp => "https,http",
        }
    }
}

impl fmt::Display for SasProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SasProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "https" => Ok(SasProtocol::Https),
            "https,http" => Ok(SasProtocol::HttpsAndHttp),
            v => Err(Error::request_invalid(format!("invalid sas protocol: {v}"))),
        }
    }
}

/// Range of client addresses a SAS accepts requests from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    /// First address, or the only one.
    pub start: IpAddr,
    /// Last address of the range.
    pub end: Option<IpAddr>,
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

impl FromStr for IpRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |v: &str| {
            v.parse::<IpAddr>()
                .map_err(|e| Error::request_invalid(format!("invalid ip: {v}")).with_source(e))
        };

        match s.split_once('-') {
            Some((start, end)) => Ok(IpRange {
                start: parse(start)?,
                end: Some(parse(end)?),
            }),
            None => Ok(IpRange {
                start: parse(s)?,
                end: None,
            }),
        }
    }
}

/// Reject `start >= expiry` before anything is signed.
pub(crate) fn check_time_range(start: Option<DateTime>, expiry: Option<DateTime>) -> Result<()> {
    if let (Some(start), Some(expiry)) = (start, expiry) {
        if start >= expiry {
            return Err(Error::invalid_time_range(format!(
                "start {} is not before expiry {}",
                format_rfc3339(start),
                format_rfc3339(expiry)
            )));
        }
    }
    Ok(())
}

fn format_time(t: Option<DateTime>) -> String {
    t.map(format_rfc3339).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use azblob_core::ErrorKind;
    use chrono::TimeZone;

    #[test]
    fn test_ip_range() {
        let single: IpRange = "168.1.5.65".parse().unwrap();
        assert_eq!(single.to_string(), "168.1.5.65");

        let range: IpRange = "168.1.5.60-168.1.5.70".parse().unwrap();
        assert_eq!(range.to_string(), "168.1.5.60-168.1.5.70");

        assert!("168.1.5".parse::<IpRange>().is_err());
    }

    #[test]
    fn test_check_time_range() {
        let t = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();

        assert!(check_time_range(None, Some(t)).is_ok());
        assert!(check_time_range(Some(t), None).is_ok());
        assert!(check_time_range(Some(t), Some(t + chrono::TimeDelta::seconds(1))).is_ok());

        let err = check_time_range(Some(t), Some(t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimeRange);
        let err =
            check_time_range(Some(t + chrono::TimeDelta::hours(1)), Some(t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimeRange);
    }
}
