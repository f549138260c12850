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
use url::Url;

use crate::constants::X_MS_LEASE_ID;
use crate::models::{LeaseResponse, ModifiedAccessConditions};
use crate::pipeline::Pipeline;
use crate::request::BlobRequest;

const INFINITE_LEASE: i32 = -1;
const MIN_LEASE_SECS: i32 = 15;
const MAX_LEASE_SECS: i32 = 60;
const MAX_BREAK_PERIOD_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseTarget {
    Container,
    Blob,
}

/// Acquire and manage the lease of a container or a blob.
///
/// The client carries the lease id it proposes and renews; it defaults to a
/// random UUID.
#[derive(Debug, Clone)]
pub struct LeaseClient {
    url: Url,
    pipeline: Pipeline,
    target: LeaseTarget,
    lease_id: String,
}

impl LeaseClient {
    pub(crate) fn for_container(url: Url, pipeline: Pipeline, lease_id: Option<String>) -> Self {
        Self::new(url, pipeline, LeaseTarget::Container, lease_id)
    }

    pub(crate) fn for_blob(url: Url, pipeline: Pipeline, lease_id: Option<String>) -> Self {
        Self::new(url, pipeline, LeaseTarget::Blob, lease_id)
    }

    fn new(url: Url, pipeline: Pipeline, target: LeaseTarget, lease_id: Option<String>) -> Self {
        let lease_id = lease_id
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            url,
            pipeline,
            target,
            lease_id,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }

    fn request(&self, action: &str, conditions: &ModifiedAccessConditions) -> BlobRequest {
        let mut req = BlobRequest::put(&self.url);
        if self.target == LeaseTarget::Container {
            req = req.query("restype", "container");
        }
        req.query("comp", "lease")
            .header("x-ms-lease-action", action)
            .conditions(conditions)
    }

    async fn send(&self, req: BlobRequest) -> Result<LeaseResponse> {
        let resp = self.pipeline.send_bytes(req).await?;
        LeaseResponse::from_headers(resp.headers())
    }

    /// Acquire the lease for `duration` seconds: `-1` for an infinite lease,
    /// otherwise 15 to 60.
    pub async fn acquire(
        &self,
        duration: i32,
        conditions: &ModifiedAccessConditions,
    ) -> Result<LeaseResponse> {
        if duration != INFINITE_LEASE && !(MIN_LEASE_SECS..=MAX_LEASE_SECS).contains(&duration) {
            return Err(Error::request_invalid(format!(
                "lease duration must be {INFINITE_LEASE} or {MIN_LEASE_SECS} to {MAX_LEASE_SECS} seconds, got {duration}"
            )));
        }

        let req = self
            .request("acquire", conditions)
            .header("x-ms-lease-duration", duration)
            .header("x-ms-proposed-lease-id", &self.lease_id);
        self.send(req).await
    }

    pub async fn renew(&self, conditions: &ModifiedAccessConditions) -> Result<LeaseResponse> {
        let req = self
            .request("renew", conditions)
            .header(X_MS_LEASE_ID, &self.lease_id);
        self.send(req).await
    }

    pub async fn release(&self, conditions: &ModifiedAccessConditions) -> Result<LeaseResponse> {
        let req = self
            .request("release", conditions)
            .header(X_MS_LEASE_ID, &self.lease_id);
        self.send(req).await
    }

    /// Swap the active lease id for `proposed_lease_id`.
    ///
    /// On success this client continues with the new id.
    pub async fn change(
        &mut self,
        proposed_lease_id: &str,
        conditions: &ModifiedAccessConditions,
    ) -> Result<LeaseResponse> {
        if proposed_lease_id.is_empty() {
            return Err(Error::request_invalid("proposed lease id must not be empty"));
        }

        let req = self
            .request("change", conditions)
            .header(X_MS_LEASE_ID, &self.lease_id)
            .header("x-ms-proposed-lease-id", proposed_lease_id);
        let resp = self.send(req).await?;
        self.lease_id = resp
            .lease_id
            .clone()
            .unwrap_or_else(|| proposed_lease_id.to_string());
        Ok(resp)
    }

    /// Break the lease, whoever holds it.
    ///
    /// `break_period` is how long the lease lingers, 0 to 60 seconds; the
    /// remaining lease time is used when `None`.
    pub async fn break_lease(
        &self,
        break_period: Option<u32>,
        conditions: &ModifiedAccessConditions,
    ) -> Result<LeaseResponse> {
        if let Some(period) = break_period.filter(|v| *v > MAX_BREAK_PERIOD_SECS) {
            return Err(Error::request_invalid(format!(
                "break period must be 0 to {MAX_BREAK_PERIOD_SECS} seconds, got {period}"
            )));
        }

        let req = self
            .request("break", conditions)
            .header_opt("x-ms-lease-break-period", break_period);
        self.send(req).await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{BlobClient, ContainerClient};
    use crate::models::ModifiedAccessConditions;
    use crate::pipeline::tests::{test_credential, test_options, ScriptedHttpSend};
    use azblob_core::ErrorKind;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const CONTAINER: &str = "https://account.blob.core.windows.net/container";

    fn conditions() -> ModifiedAccessConditions {
        ModifiedAccessConditions::default()
    }

    #[tokio::test]
    async fn test_acquire_on_container() {
        let http = ScriptedHttpSend::default();
        http.push(201, &[("x-ms-lease-id", "0f6f5b2e-0000-0000-0000-000000000000")], "");

        let lease = ContainerClient::new(CONTAINER, Some(test_credential()), test_options(&http))
            .unwrap()
            .lease_client(None);
        assert!(uuid::Uuid::parse_str(lease.lease_id()).is_ok());

        let resp = lease.acquire(-1, &conditions()).await.unwrap();
        assert_eq!(
            resp.lease_id.as_deref(),
            Some("0f6f5b2e-0000-0000-0000-000000000000")
        );

        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("restype=container&comp=lease"));
        assert_eq!(req.headers["x-ms-lease-action"], "acquire");
        assert_eq!(req.headers["x-ms-lease-duration"], "-1");
        assert_eq!(req.headers["x-ms-proposed-lease-id"], lease.lease_id());
    }

    #[test_case(14; "too short")]
    #[test_case(61; "too long")]
    #[test_case(0; "zero")]
    #[tokio::test]
    async fn test_invalid_duration_is_not_sent(duration: i32) {
        let http = ScriptedHttpSend::default();
        let lease = BlobClient::new(
            &format!("{CONTAINER}/blob"),
            Some(test_credential()),
            test_options(&http),
        )
        .unwrap()
        .lease_client(Some("my-lease".to_string()));

        let err = lease.acquire(duration, &conditions()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_change_and_break_on_blob() {
        let http = ScriptedHttpSend::default();
        http.push(200, &[("x-ms-lease-id", "new-id")], "")
            .push(202, &[("x-ms-lease-time", "10")], "");

        let mut lease = BlobClient::new(
            &format!("{CONTAINER}/blob"),
            Some(test_credential()),
            test_options(&http),
        )
        .unwrap()
        .lease_client(Some("old-id".to_string()));

        lease.change("new-id", &conditions()).await.unwrap();
        let req = http.last_request();
        assert_eq!(req.uri.query(), Some("comp=lease"));
        assert_eq!(req.headers["x-ms-lease-id"], "old-id");
        assert_eq!(req.headers["x-ms-proposed-lease-id"], "new-id");
        assert_eq!(lease.lease_id(), "new-id");

        let resp = lease.break_lease(Some(10), &conditions()).await.unwrap();
        assert_eq!(resp.lease_time, Some(10));
        assert_eq!(http.last_request().headers["x-ms-lease-break-period"], "10");

        let err = lease
            .break_lease(Some(61), &conditions())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }
}
