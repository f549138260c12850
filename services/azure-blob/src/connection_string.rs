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

use azblob_core::{Error, Result};

use crate::Config;

// Azurite defaults.
const AZURITE_DEFAULT_STORAGE_ACCOUNT_NAME: &str = "devstoreaccount1";
const AZURITE_DEFAULT_STORAGE_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const AZURITE_DEFAULT_BLOB_URI: &str = "http://127.0.0.1:10000";

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Parses an [Azure connection string][1].
///
/// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
pub(crate) fn parse(conn_str: &str) -> Result<Config> {
    let key_values = parse_into_key_values(conn_str)?;

    // Try to read development storage configuration.
    if let Some(development_config) = collect_development_config(&key_values) {
        return Ok(Config {
            account_name: Some(development_config.account_name),
            account_key: Some(development_config.account_key),
            endpoint: Some(development_config.endpoint),
            ..Default::default()
        });
    }

    let mut config = Config {
        account_name: key_values.get("AccountName").cloned(),
        endpoint: collect_endpoint(&key_values)?,
        ..Default::default()
    };

    if let Some(token) = key_values.get("SharedAccessSignature") {
        config.sas_token = Some(token.trim_start_matches('?').to_string());
    } else if config.account_name.is_some() {
        config.account_key = key_values.get("AccountKey").cloned();
    }

    if config.endpoint.is_none() && config.sas_token.is_none() && config.account_key.is_none() {
        return Err(Error::config_invalid(
            "connection string yields neither an endpoint nor credentials",
        ));
    }

    Ok(config)
}

fn parse_into_key_values(conn_str: &str) -> Result<HashMap<String, String>> {
    let conn_str = conn_str.trim().replace(['\r', '\n'], "");
    if conn_str.is_empty() {
        return Err(Error::config_invalid("connection string is empty"));
    }

    conn_str
        .split(';')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                Error::config_invalid(format!(
                    "invalid connection string, expected '=' in field: {field}"
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::config_invalid(format!(
                    "invalid connection string, empty key in field: {field}"
                )));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Helper struct to hold development storage aka Azurite configuration.
struct DevelopmentStorageConfig {
    account_name: String,
    account_key: String,
    endpoint: String,
}

fn collect_development_config(
    key_values: &HashMap<String, String>,
) -> Option<DevelopmentStorageConfig> {
    if key_values.get("UseDevelopmentStorage").map(String::as_str) != Some("true") {
        return None;
    }

    let account_name = key_values
        .get("AccountName")
        .cloned()
        .unwrap_or(AZURITE_DEFAULT_STORAGE_ACCOUNT_NAME.to_string());
    let account_key = key_values
        .get("AccountKey")
        .cloned()
        .unwrap_or(AZURITE_DEFAULT_STORAGE_ACCOUNT_KEY.to_string());
    let development_proxy_uri = key_values
        .get("DevelopmentStorageProxyUri")
        .cloned()
        .unwrap_or(AZURITE_DEFAULT_BLOB_URI.to_string());

    Some(DevelopmentStorageConfig {
        endpoint: format!(
            "{}/{account_name}",
            development_proxy_uri.trim_end_matches('/')
        ),
        account_name,
        account_key,
    })
}

/// `BlobEndpoint` verbatim, or built from the account name.
fn collect_endpoint(key_values: &HashMap<String, String>) -> Result<Option<String>> {
    let protocol = key_values
        .get("DefaultEndpointsProtocol")
        .map(String::as_str)
        .unwrap_or("https");
    if protocol != "http" && protocol != "https" {
        return Err(Error::config_invalid(format!(
            "invalid DefaultEndpointsProtocol: {protocol}"
        )));
    }

    if let Some(endpoint) = key_values.get("BlobEndpoint") {
        return Ok(Some(endpoint.clone()));
    }

    let Some(account_name) = key_values.get("AccountName") else {
        return Ok(None);
    };
    let endpoint_suffix = key_values
        .get("EndpointSuffix")
        .map(String::as_str)
        .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);

    Ok(Some(format!(
        "{protocol}://{account_name}.blob.{endpoint_suffix}"
    )))
}
