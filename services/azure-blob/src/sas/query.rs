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

use azblob_core::time::{parse_rfc3339, DateTime};

/// The query parameters of a signed SAS.
///
/// Values are kept exactly as they were signed, so a parsed token can be
/// re-encoded without touching its signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SasQueryParameters {
    pub(crate) version: Option<String>,
    pub(crate) services: Option<String>,
    pub(crate) resource_types: Option<String>,
    pub(crate) protocol: Option<String>,
    pub(crate) start: Option<String>,
    pub(crate) expiry: Option<String>,
    pub(crate) ip_range: Option<String>,
    pub(crate) identifier: Option<String>,
    pub(crate) resource: Option<String>,
    pub(crate) permissions: Option<String>,
    pub(crate) cache_control: Option<String>,
    pub(crate) content_disposition: Option<String>,
    pub(crate) content_encoding: Option<String>,
    pub(crate) content_language: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) signature: Option<String>,
}

impl SasQueryParameters {
    /// Every parameter in the order it's emitted, `sig` last.
    fn entries(&self) -> [(&'static str, Option<&str>); 16] {
        [
            ("sv", self.version.as_deref()),
            ("ss", self.services.as_deref()),
            ("srt", self.resource_types.as_deref()),
            ("spr", self.protocol.as_deref()),
            ("st", self.start.as_deref()),
            ("se", self.expiry.as_deref()),
            ("sip", self.ip_range.as_deref()),
            ("si", self.identifier.as_deref()),
            ("sr", self.resource.as_deref()),
            ("sp", self.permissions.as_deref()),
            ("rscc", self.cache_control.as_deref()),
            ("rscd", self.content_disposition.as_deref()),
            ("rsce", self.content_encoding.as_deref()),
            ("rscl", self.content_language.as_deref()),
            ("rsct", self.content_type.as_deref()),
            ("sig", self.signature.as_deref()),
        ]
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "sv" => &mut self.version,
            "ss" => &mut self.services,
            "srt" => &mut self.resource_types,
            "spr" => &mut self.protocol,
            "st" => &mut self.start,
            "se" => &mut self.expiry,
            "sip" => &mut self.ip_range,
            "si" => &mut self.identifier,
            "sr" => &mut self.resource,
            "sp" => &mut self.permissions,
            "rscc" => &mut self.cache_control,
            "rscd" => &mut self.content_disposition,
            "rsce" => &mut self.content_encoding,
            "rscl" => &mut self.content_language,
            "rsct" => &mut self.content_type,
            "sig" => &mut self.signature,
            _ => return None,
        };
        Some(slot)
    }

    /// Present parameters as decoded `(key, value)` pairs, in emit order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        self.entries()
            .into_iter()
            .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v.to_string())))
            .collect()
    }

    /// Encode as a query string, without the leading `?`.
    pub fn encode(&self) -> String {
        self.to_pairs()
            .into_iter()
            .map(|(k, v)| {
                let v: String = form_urlencoded::byte_serialize(v.as_bytes()).collect();
                format!("{k}={v}")
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse SAS parameters out of a query string.
    ///
    /// Parameters that don't belong to a SAS are ignored.
    pub fn from_query(query: &str) -> Self {
        let pairs = form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()));
        Self::from_pairs(pairs).0
    }

    /// Split decoded query pairs into the SAS parameters and everything else.
    pub(crate) fn from_pairs(
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> (Self, Vec<(String, String)>) {
        let mut sas = Self::default();
        let mut others = Vec::new();

        for (k, v) in pairs {
            match sas.slot(&k.to_lowercase()) {
                Some(slot) => *slot = Some(v),
                None => others.push((k, v)),
            }
        }

        (sas, others)
    }

    /// Check if this carries no signature at all.
    pub fn is_empty(&self) -> bool {
        self.signature.as_deref().unwrap_or_default().is_empty()
    }

    /// `sv`
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `ss`
    pub fn services(&self) -> Option<&str> {
        self.services.as_deref()
    }

    /// `srt`
    pub fn resource_types(&self) -> Option<&str> {
        self.resource_types.as_deref()
    }

    /// `spr`
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// `st`, parsed.
    pub fn start_time(&self) -> Option<DateTime> {
        self.start.as_deref().and_then(|v| parse_rfc3339(v).ok())
    }

    /// `se`, parsed.
    pub fn expiry_time(&self) -> Option<DateTime> {
        self.expiry.as_deref().and_then(|v| parse_rfc3339(v).ok())
    }

    /// `sip`
    pub fn ip_range(&self) -> Option<&str> {
        self.ip_range.as_deref()
    }

    /// `si`
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// `sr`
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// `sp`
    pub fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    /// `rscc`
    pub fn cache_control(&self) -> Option<&str> {
        self.cache_control.as_deref()
    }

    /// `rscd`
    pub fn content_disposition(&self) -> Option<&str> {
        self.content_disposition.as_deref()
    }

    /// `rsce`
    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    /// `rscl`
    pub fn content_language(&self) -> Option<&str> {
        self.content_language.as_deref()
    }

    /// `rsct`
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// `sig`
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_order_puts_sig_last() {
        let p = SasQueryParameters {
            signature: Some("a/b+c=".to_string()),
            content_type: Some("text/plain".to_string()),
            permissions: Some("r".to_string()),
            resource: Some("b".to_string()),
            expiry: Some("2022-03-01T09:12:34Z".to_string()),
            version: Some("2019-12-12".to_string()),
            ..Default::default()
        };

        assert_eq!(
            p.encode(),
            "sv=2019-12-12&se=2022-03-01T09%3A12%3A34Z&sr=b&sp=r&rsct=text%2Fplain&sig=a%2Fb%2Bc%3D"
        );
    }

    #[test]
    fn test_from_query_keeps_unknown_out() {
        let (sas, others) = SasQueryParameters::from_pairs(vec![
            ("SV".to_string(), "2019-12-12".to_string()),
            ("comp".to_string(), "list".to_string()),
            ("sig".to_string(), "abc".to_string()),
        ]);

        assert_eq!(sas.version(), Some("2019-12-12"));
        assert_eq!(sas.signature(), Some("abc"));
        assert_eq!(others, vec![("comp".to_string(), "list".to_string())]);
    }

    #[test]
    fn test_parse_then_encode_is_stable() {
        let query = "sv=2019-12-12&ss=b&srt=sco&se=2022-03-01T08%3A17%3A34Z&sp=rwdlacu&sig=9jgXWZQ6xhcMgfBH4bbLYHrJdjUdLLTavjzBU5iKh4I%3D";
        let p = SasQueryParameters::from_query(query);

        assert_eq!(p.encode(), query);
        assert!(!p.is_empty());
        assert!(SasQueryParameters::from_query("comp=list").is_empty());
    }
}
