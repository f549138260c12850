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

//! XML bodies exchanged with the blob service.

use std::fmt::Display;
use std::str::FromStr;

use azblob_core::time::{format_rfc3339, parse_http_date, parse_rfc3339, DateTime};
use azblob_core::Result;
use quick_xml::escape::escape;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::{
    Block, CorsRule, Metrics, PageRange, RetentionPolicy, SignedIdentifier,
    StorageServiceProperties,
};

/// Deserialize a response body, tolerating a leading BOM.
pub(crate) fn from_xml<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    Ok(quick_xml::de::from_reader(body)?)
}

pub(crate) fn de_opt_string<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<String>::deserialize(d)?;
    Ok(v.filter(|v| !v.is_empty()))
}

pub(crate) fn de_opt_http_date<'de, D>(d: D) -> std::result::Result<Option<DateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match de_opt_string(d)? {
        None => Ok(None),
        Some(v) => parse_http_date(&v)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

pub(crate) fn de_opt_rfc3339<'de, D>(d: D) -> std::result::Result<Option<DateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match de_opt_string(d)? {
        None => Ok(None),
        Some(v) => parse_rfc3339(&v).map(Some).map_err(serde::de::Error::custom),
    }
}

pub(crate) fn de_opt_parse<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match de_opt_string(d)? {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// `<Error>` body of a failed request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorBody {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SignedIdentifiersXml {
    #[serde(rename = "SignedIdentifier", default)]
    pub items: Vec<SignedIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BlockListXml {
    #[serde(default)]
    pub committed_blocks: BlocksXml,
    #[serde(default)]
    pub uncommitted_blocks: BlocksXml,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BlocksXml {
    #[serde(rename = "Block", default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageListXml {
    #[serde(rename = "PageRange", default)]
    pub page_ranges: Vec<PageRange>,
    #[serde(rename = "ClearRange", default)]
    pub clear_ranges: Vec<PageRange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TagsXml {
    #[serde(default)]
    pub tag_set: TagSetXml,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TagSetXml {
    #[serde(rename = "Tag", default)]
    pub tags: Vec<TagXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TagXml {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Block ids for `Put Block List`, in commit order.
pub(crate) fn block_list_to_xml(ids: &[BlockLookup]) -> String {
    let mut s = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>");
    for id in ids {
        let (tag, value) = match id {
            BlockLookup::Committed(v) => ("Committed", v),
            BlockLookup::Uncommitted(v) => ("Uncommitted", v),
            BlockLookup::Latest(v) => ("Latest", v),
        };
        s.push_str(&format!("<{tag}>{}</{tag}>", escape(value.as_str())));
    }
    s.push_str("</BlockList>");
    s
}

pub(crate) fn signed_identifiers_to_xml(items: &[SignedIdentifier]) -> String {
    let mut s = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<SignedIdentifiers>");
    for item in items {
        s.push_str("<SignedIdentifier>");
        s.push_str(&format!("<Id>{}</Id>", escape(item.id.as_str())));
        if let Some(policy) = &item.access_policy {
            s.push_str("<AccessPolicy>");
            if let Some(start) = policy.start {
                s.push_str(&format!("<Start>{}</Start>", format_rfc3339(start)));
            }
            if let Some(expiry) = policy.expiry {
                s.push_str(&format!("<Expiry>{}</Expiry>", format_rfc3339(expiry)));
            }
            if let Some(permission) = &policy.permission {
                s.push_str(&format!("<Permission>{permission}</Permission>"));
            }
            s.push_str("</AccessPolicy>");
        }
        s.push_str("</SignedIdentifier>");
    }
    s.push_str("</SignedIdentifiers>");
    s
}

pub(crate) fn tags_to_xml<'a>(tags: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    let mut s = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Tags><TagSet>");
    for (k, v) in tags {
        s.push_str(&format!(
            "<Tag><Key>{}</Key><Value>{}</Value></Tag>",
            escape(k.as_str()),
            escape(v.as_str())
        ));
    }
    s.push_str("</TagSet></Tags>");
    s
}

pub(crate) fn service_properties_to_xml(props: &StorageServiceProperties) -> String {
    let mut s =
        String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<StorageServiceProperties>");
    if let Some(logging) = &props.logging {
        s.push_str("<Logging>");
        push_version(&mut s, logging.version.as_deref());
        s.push_str(&format!(
            "<Delete>{}</Delete><Read>{}</Read><Write>{}</Write>",
            logging.delete, logging.read, logging.write
        ));
        push_retention(&mut s, "RetentionPolicy", &logging.retention_policy);
        s.push_str("</Logging>");
    }
    if let Some(metrics) = &props.hour_metrics {
        push_metrics(&mut s, "HourMetrics", metrics);
    }
    if let Some(metrics) = &props.minute_metrics {
        push_metrics(&mut s, "MinuteMetrics", metrics);
    }
    if let Some(rules) = &props.cors {
        s.push_str("<Cors>");
        for rule in rules {
            push_cors_rule(&mut s, rule);
        }
        s.push_str("</Cors>");
    }
    if let Some(version) = &props.default_service_version {
        s.push_str(&format!(
            "<DefaultServiceVersion>{}</DefaultServiceVersion>",
            escape(version.as_str())
        ));
    }
    if let Some(policy) = &props.delete_retention_policy {
        push_retention(&mut s, "DeleteRetentionPolicy", policy);
    }
    if let Some(site) = &props.static_website {
        s.push_str(&format!("<StaticWebsite><Enabled>{}</Enabled>", site.enabled));
        if let Some(v) = &site.index_document {
            s.push_str(&format!("<IndexDocument>{}</IndexDocument>", escape(v.as_str())));
        }
        if let Some(v) = &site.error_document_404_path {
            s.push_str(&format!(
                "<ErrorDocument404Path>{}</ErrorDocument404Path>",
                escape(v.as_str())
            ));
        }
        s.push_str("</StaticWebsite>");
    }
    s.push_str("</StorageServiceProperties>");
    s
}

fn push_version(s: &mut String, version: Option<&str>) {
    // The service requires a version on analytics sections.
    s.push_str(&format!("<Version>{}</Version>", escape(version.unwrap_or("1.0"))));
}

fn push_retention(s: &mut String, tag: &str, policy: &RetentionPolicy) {
    s.push_str(&format!("<{tag}><Enabled>{}</Enabled>", policy.enabled));
    if let Some(days) = policy.days.filter(|_| policy.enabled) {
        s.push_str(&format!("<Days>{days}</Days>"));
    }
    s.push_str(&format!("</{tag}>"));
}

fn push_metrics(s: &mut String, tag: &str, metrics: &Metrics) {
    s.push_str(&format!("<{tag}>"));
    push_version(s, metrics.version.as_deref());
    s.push_str(&format!("<Enabled>{}</Enabled>", metrics.enabled));
    if let Some(include) = metrics.include_apis.filter(|_| metrics.enabled) {
        s.push_str(&format!("<IncludeAPIs>{include}</IncludeAPIs>"));
    }
    push_retention(s, "RetentionPolicy", &metrics.retention_policy);
    s.push_str(&format!("</{tag}>"));
}

fn push_cors_rule(s: &mut String, rule: &CorsRule) {
    s.push_str(&format!(
        "<CorsRule><AllowedOrigins>{}</AllowedOrigins><AllowedMethods>{}</AllowedMethods>\
         <AllowedHeaders>{}</AllowedHeaders><ExposedHeaders>{}</ExposedHeaders>\
         <MaxAgeInSeconds>{}</MaxAgeInSeconds></CorsRule>",
        escape(rule.allowed_origins.as_str()),
        escape(rule.allowed_methods.as_str()),
        escape(rule.allowed_headers.as_str()),
        escape(rule.exposed_headers.as_str()),
        rule.max_age_in_seconds
    ));
}

/// Where the service looks up a block id while committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockLookup {
    /// Only among committed blocks.
    Committed(String),
    /// Only among uncommitted blocks.
    Uncommitted(String),
    /// Uncommitted blocks first, then committed ones.
    Latest(String),
}

impl BlockLookup {
    pub fn id(&self) -> &str {
        match self {
            BlockLookup::Committed(v) | BlockLookup::Uncommitted(v) | BlockLookup::Latest(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessPolicy;
    use crate::sas::AccessPolicyPermission;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_body_with_bom() {
        let body = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>ContainerNotFound</Code><Message>The specified container does not exist.</Message></Error>";

        let err: ErrorBody = from_xml(body.as_bytes()).unwrap();
        assert_eq!(err.code.as_deref(), Some("ContainerNotFound"));
        assert_eq!(
            err.message.as_deref(),
            Some("The specified container does not exist.")
        );
    }

    #[test]
    fn test_page_list_interleaved() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<PageList>
  <PageRange><Start>0</Start><End>511</End></PageRange>
  <ClearRange><Start>512</Start><End>1023</End></ClearRange>
  <PageRange><Start>1024</Start><End>2047</End></PageRange>
</PageList>"#;

        let v: PageListXml = from_xml(body.as_bytes()).unwrap();
        assert_eq!(
            v.page_ranges,
            vec![
                PageRange { start: 0, end: 511 },
                PageRange { start: 1024, end: 2047 }
            ]
        );
        assert_eq!(v.clear_ranges, vec![PageRange { start: 512, end: 1023 }]);
    }

    #[test]
    fn test_block_list() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<BlockList>
  <CommittedBlocks>
    <Block><Name>YmxvY2sx</Name><Size>4</Size></Block>
  </CommittedBlocks>
  <UncommittedBlocks />
</BlockList>"#;

        let v: BlockListXml = from_xml(body.as_bytes()).unwrap();
        assert_eq!(v.committed_blocks.blocks.len(), 1);
        assert_eq!(v.committed_blocks.blocks[0].name, "YmxvY2sx");
        assert_eq!(v.committed_blocks.blocks[0].size, 4);
        assert!(v.uncommitted_blocks.blocks.is_empty());
    }

    #[test]
    fn test_signed_identifiers() {
        let t = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        let items = vec![SignedIdentifier {
            id: "policy<1>".to_string(),
            access_policy: Some(AccessPolicy {
                start: Some(t),
                expiry: Some(t + chrono::TimeDelta::hours(1)),
                permission: Some("rl".parse::<AccessPolicyPermission>().unwrap()),
            }),
        }];

        let xml = signed_identifiers_to_xml(&items);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<SignedIdentifiers><SignedIdentifier><Id>policy&lt;1&gt;</Id><AccessPolicy><Start>2022-03-01T08:12:34Z</Start><Expiry>2022-03-01T09:12:34Z</Expiry><Permission>rl</Permission></AccessPolicy></SignedIdentifier></SignedIdentifiers>"
        );

        let parsed: SignedIdentifiersXml = from_xml(xml.as_bytes()).unwrap();
        assert_eq!(parsed.items, items);
    }

    #[test]
    fn test_block_list_to_xml() {
        let xml = block_list_to_xml(&[
            BlockLookup::Latest("AAA=".to_string()),
            BlockLookup::Committed("AAE=".to_string()),
        ]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList><Latest>AAA=</Latest><Committed>AAE=</Committed></BlockList>"
        );
    }

    #[test]
    fn test_tags() {
        let body = "<Tags><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag><Tag><Key>team</Key><Value>a&amp;b</Value></Tag></TagSet></Tags>";
        let v: TagsXml = from_xml(body.as_bytes()).unwrap();
        let tags: Vec<_> = v.tag_set.tags.iter().map(|t| (t.key.as_str(), t.value.as_str())).collect();
        assert_eq!(tags, vec![("env", "prod"), ("team", "a&b")]);
    }
    #[test]
    fn test_service_properties() {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?><StorageServiceProperties>\
            <Logging><Version>1.0</Version><Read>false</Read><Write>true</Write><Delete>true</Delete>\
            <RetentionPolicy><Enabled>true</Enabled><Days>7</Days></RetentionPolicy></Logging>\
            <HourMetrics><Version>1.0</Version><Enabled>true</Enabled><IncludeAPIs>false</IncludeAPIs>\
            <RetentionPolicy><Enabled>false</Enabled></RetentionPolicy></HourMetrics>\
            <MinuteMetrics><Version>1.0</Version><Enabled>false</Enabled>\
            <RetentionPolicy><Enabled>false</Enabled></RetentionPolicy></MinuteMetrics>\
            <Cors><CorsRule><AllowedOrigins>https://a.example</AllowedOrigins>\
            <AllowedMethods>GET,PUT</AllowedMethods><MaxAgeInSeconds>500</MaxAgeInSeconds>\
            <ExposedHeaders>x-ms-meta-*</ExposedHeaders><AllowedHeaders>x-ms-meta-abc</AllowedHeaders>\
            </CorsRule></Cors>\
            <DeleteRetentionPolicy><Enabled>true</Enabled><Days>5</Days></DeleteRetentionPolicy>\
            </StorageServiceProperties>";
        let props: StorageServiceProperties = from_xml(body.as_bytes()).unwrap();

        let logging = props.logging.as_ref().unwrap();
        assert!(logging.write && logging.delete && !logging.read);
        assert_eq!(logging.retention_policy, RetentionPolicy::days(7));
        let hour = props.hour_metrics.as_ref().unwrap();
        assert!(hour.enabled);
        assert_eq!(hour.include_apis, Some(false));
        assert!(!props.minute_metrics.as_ref().unwrap().enabled);
        let cors = props.cors.as_ref().unwrap();
        assert_eq!(cors.len(), 1);
        assert_eq!(cors[0].allowed_methods, "GET,PUT");
        assert_eq!(cors[0].max_age_in_seconds, 500);
        assert_eq!(props.delete_retention_policy, Some(RetentionPolicy::days(5)));
        assert_eq!(props.static_website, None);

        let xml = service_properties_to_xml(&props);
        assert!(xml.contains(
            "<Logging><Version>1.0</Version><Delete>true</Delete><Read>false</Read><Write>true</Write>\
             <RetentionPolicy><Enabled>true</Enabled><Days>7</Days></RetentionPolicy></Logging>"
        ));
        assert!(xml.contains("<HourMetrics><Version>1.0</Version><Enabled>true</Enabled><IncludeAPIs>false</IncludeAPIs>"));
        assert!(xml.contains("<DeleteRetentionPolicy><Enabled>true</Enabled><Days>5</Days></DeleteRetentionPolicy>"));
        assert!(!xml.contains("StaticWebsite"));
        assert_eq!(from_xml::<StorageServiceProperties>(xml.as_bytes()).unwrap(), props);
    }

    #[test]
    fn test_unset_sections_are_not_sent() {
        let xml = service_properties_to_xml(&StorageServiceProperties {
            cors: Some(vec![]),
            ..Default::default()
        });
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<StorageServiceProperties><Cors></Cors></StorageServiceProperties>"
        );
    }
}
