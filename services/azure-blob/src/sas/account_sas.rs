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

use super::{
    check_time_range, format_time, AccountSasPermissions, AccountSasResourceTypes,
    AccountSasServices, IpRange, SasProtocol, SasQueryParameters,
};
use crate::constants::SERVICE_VERSION;
use crate::SharedKeyCredential;

/// Values of an account SAS.
///
/// [Construct the signature string](https://learn.microsoft.com/en-us/rest/api/storageservices/create-account-sas#construct-the-signature-string)
#[derive(Debug, Clone)]
pub struct AccountSasSignatureValues {
    /// Service version, defaults to the version this crate speaks.
    pub version: String,
    pub protocol: Option<SasProtocol>,
    pub start: Option<DateTime>,
    pub expiry: Option<DateTime>,
    pub permissions: AccountSasPermissions,
    pub ip_range: Option<IpRange>,
    pub services: AccountSasServices,
    pub resource_types: AccountSasResourceTypes,
}

impl Default for AccountSasSignatureValues {
    fn default() -> Self {
        Self {
            version: SERVICE_VERSION.to_string(),
            protocol: None,
            start: None,
            expiry: None,
            permissions: AccountSasPermissions::default(),
            ip_range: None,
            services: AccountSasServices::default(),
            resource_types: AccountSasResourceTypes::default(),
        }
    }
}

impl AccountSasSignatureValues {
    /// Sign these values with the account key.
    pub fn sign(&self, credential: &SharedKeyCredential) -> Result<SasQueryParameters> {
        if self.expiry.is_none()
            || self.permissions.is_empty()
            || self.services.is_empty()
            || self.resource_types.is_empty()
        {
            return Err(Error::request_invalid(
                "account SAS is missing at least one of expiry, permissions, services or resource types",
            ));
        }
        check_time_range(self.start, self.expiry)?;

        let permissions = self.permissions.to_string();
        let services = self.services.to_string();
        let resource_types = self.resource_types.to_string();
        let start = format_time(self.start);
        let expiry = format_time(self.expiry);
        let ip_range = self.ip_range.map(|v| v.to_string()).unwrap_or_default();
        let protocol = self.protocol.map(|v| v.to_string()).unwrap_or_default();

        let fields: [&str; 10] = [
            credential.account_name(),
            &permissions,
            &services,
            &resource_types,
            &start,
            &expiry,
            &ip_range,
            &protocol,
            &self.version,
            "",
        ];
        let string_to_sign = fields.join("\n");

        let signature = credential.compute_hmac_sha256(&string_to_sign);

        Ok(SasQueryParameters {
            version: Some(self.version.clone()),
            services: Some(services),
            resource_types: Some(resource_types),
            protocol: Some(protocol),
            start: Some(start),
            expiry: Some(expiry),
            ip_range: Some(ip_range),
            permissions: Some(permissions),
            signature: Some(signature),
            ..Default::default()
        })
    }
}
