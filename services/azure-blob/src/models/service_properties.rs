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

use azblob_core::{Error, Result};
use serde::{Deserialize, Deserializer};

use super::xml::{de_opt_parse, de_opt_string};

/// Most CORS rules one account can hold.
pub const MAX_CORS_RULES: usize = 5;
const MAX_RETENTION_DAYS: u32 = 365;

/// Account wide settings of the blob service.
///
/// Sections left `None` are not sent by `set_properties`, so the service
/// keeps their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageServiceProperties {
    #[serde(default)]
    pub logging: Option<Logging>,
    #[serde(default)]
    pub hour_metrics: Option<Metrics>,
    #[serde(default)]
    pub minute_metrics: Option<Metrics>,
    /// Cross origin rules; an empty list removes all rules.
    #[serde(default, deserialize_with = "de_cors")]
    pub cors: Option<Vec<CorsRule>>,
    /// Version used for anonymous requests that don't name one.
    #[serde(default, deserialize_with = "de_opt_string")]
    pub default_service_version: Option<String>,
    /// How long deleted blobs can still be restored.
    #[serde(default)]
    pub delete_retention_policy: Option<RetentionPolicy>,
    #[serde(default)]
    pub static_website: Option<StaticWebsite>,
}

/// Storage analytics logging of requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Logging {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub retention_policy: RetentionPolicy,
}

/// Aggregated request statistics, per hour or per minute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metrics {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    /// Break statistics down per API; only meaningful when enabled.
    #[serde(rename = "IncludeAPIs", default, deserialize_with = "de_opt_parse")]
    pub include_apis: Option<bool>,
    #[serde(default)]
    pub retention_policy: RetentionPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetentionPolicy {
    #[serde(default)]
    pub enabled: bool,
    /// 1 to 365, required when enabled.
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub days: Option<u32>,
}

impl RetentionPolicy {
    /// Keep data for `days` days.
    pub fn days(days: u32) -> Self {
        Self {
            enabled: true,
            days: Some(days),
        }
    }
}

/// A cross origin resource sharing rule.
///
/// List valued fields are comma separated, as on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsRule {
    #[serde(default)]
    pub allowed_origins: String,
    #[serde(default)]
    pub allowed_methods: String,
    #[serde(default)]
    pub allowed_headers: String,
    #[serde(default)]
    pub exposed_headers: String,
    #[serde(default)]
    pub max_age_in_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StaticWebsite {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub index_document: Option<String>,
    #[serde(
        rename = "ErrorDocument404Path",
        default,
        deserialize_with = "de_opt_string"
    )]
    pub error_document_404_path: Option<String>,
}

#[derive(Deserialize)]
struct CorsXml {
    #[serde(rename = "CorsRule", default)]
    rules: Vec<CorsRule>,
}

fn de_cors<'de, D>(d: D) -> std::result::Result<Option<Vec<CorsRule>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<CorsXml>::deserialize(d)?.map(|v| v.rules))
}

impl StorageServiceProperties {
    /// Check the properties before they go on the wire.
    pub fn validate(&self) -> Result<()> {
        if let Some(logging) = &self.logging {
            check_retention("logging", &logging.retention_policy)?;
        }
        for (name, metrics) in [
            ("hour metrics", &self.hour_metrics),
            ("minute metrics", &self.minute_metrics),
        ] {
            if let Some(metrics) = metrics {
                check_retention(name, &metrics.retention_policy)?;
            }
        }
        if let Some(policy) = &self.delete_retention_policy {
            check_retention("delete retention", policy)?;
        }
        if let Some(rules) = &self.cors {
            if rules.len() > MAX_CORS_RULES {
                return Err(Error::request_invalid(format!(
                    "at most {MAX_CORS_RULES} cors rules are allowed, got {}",
                    rules.len()
                )));
            }
        }
        Ok(())
    }
}

fn check_retention(name: &str, policy: &RetentionPolicy) -> Result<()> {
    if !policy.enabled {
        return Ok(());
    }
    match policy.days {
        Some(days) if (1..=MAX_RETENTION_DAYS).contains(&days) => Ok(()),
        days => Err(Error::request_invalid(format!(
            "{name} retention must keep 1 to {MAX_RETENTION_DAYS} days, got {days:?}"
        ))),
    }
}
