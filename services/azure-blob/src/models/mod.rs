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

//! Options and results exchanged with the blob service.

mod enums;
pub use enums::{
    AccessTier, AccountKind, BlobType, BlockListType, CopyStatus, DeleteSnapshotsOption,
    EncryptionAlgorithm, LeaseDuration, LeaseState, LeaseStatus, ListBlobsInclude,
    ListContainersInclude, PublicAccessType, RehydratePriority, SequenceNumberAction, SkuName,
};
pub(crate) use enums::join_include;

mod conditions;
pub use conditions::{
    validate_metadata, BlobHttpHeaders, CpkInfo, HttpRange, LeaseAccessConditions, Metadata,
    ModifiedAccessConditions,
};

mod access_policy;
pub use access_policy::{
    validate_signed_identifiers, AccessPolicy, SignedIdentifier, MAX_SIGNED_IDENTIFIERS,
};

mod list;
pub use list::{
    BlobItem, BlobItemProperties, ContainerItem, ContainerItemProperties, ListBlobsSegment,
    ListContainersSegment,
};

mod responses;
pub use responses::{
    AccessPolicyResponse, AccountInfo, AppendBlockResponse, BlobProperties, Block, BlockList,
    ContainerProperties, CopyResponse, LeaseResponse, OperationResponse, PageList, PageRange,
    PageResponse, SnapshotResponse, StageBlockResponse, UploadResponse,
};

mod service_properties;
pub use service_properties::{
    CorsRule, Logging, Metrics, RetentionPolicy, StaticWebsite, StorageServiceProperties,
    MAX_CORS_RULES,
};

pub(crate) mod xml;
pub use xml::BlockLookup;
