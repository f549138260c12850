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

use std::fmt;
use std::str::FromStr;

use azblob_core::Error;
use serde::{Deserialize, Deserializer};

/// Define an enum carried on the wire as a fixed string.
///
/// Parsing ignores ASCII case; rendering always uses the wire spelling.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$variant_meta])* $variant,)+
        }

        impl $name {
            /// The value sent on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($value) {
                        return Ok($name::$variant);
                    }
                )+
                Err(Error::unexpected(format!(
                    "unknown {} value: {s}",
                    stringify!($name)
                )))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// Access tier of a blob.
    AccessTier {
        P4 => "P4",
        P6 => "P6",
        P10 => "P10",
        P15 => "P15",
        P20 => "P20",
        P30 => "P30",
        P40 => "P40",
        P50 => "P50",
        P60 => "P60",
        P70 => "P70",
        P80 => "P80",
        Hot => "Hot",
        Cool => "Cool",
        Archive => "Archive",
    }
}

string_enum! {
    /// Cipher of a client provided encryption key.
    EncryptionAlgorithm {
        Aes256 => "AES256",
    }
}

string_enum! {
    BlobType {
        BlockBlob => "BlockBlob",
        PageBlob => "PageBlob",
        AppendBlob => "AppendBlob",
    }
}

string_enum! {
    LeaseState {
        Available => "available",
        Leased => "leased",
        Expired => "expired",
        Breaking => "breaking",
        Broken => "broken",
    }
}

string_enum! {
    LeaseStatus {
        Locked => "locked",
        Unlocked => "unlocked",
    }
}

string_enum! {
    LeaseDuration {
        Infinite => "infinite",
        Fixed => "fixed",
    }
}

string_enum! {
    /// Anonymous read access granted on a container.
    PublicAccessType {
        /// Containers and blobs can be listed and read.
        Container => "container",
        /// Only blobs can be read.
        Blob => "blob",
    }
}

string_enum! {
    CopyStatus {
        Pending => "pending",
        Success => "success",
        Aborted => "aborted",
        Failed => "failed",
    }
}

string_enum! {
    /// What to do with the snapshots of a deleted blob.
    DeleteSnapshotsOption {
        /// Delete the blob and all of its snapshots.
        Include => "include",
        /// Delete only the snapshots.
        Only => "only",
    }
}

string_enum! {
    BlockListType {
        Committed => "committed",
        Uncommitted => "uncommitted",
        All => "all",
    }
}

string_enum! {
    SequenceNumberAction {
        Max => "max",
        Update => "update",
        Increment => "increment",
    }
}

string_enum! {
    AccountKind {
        Storage => "Storage",
        BlobStorage => "BlobStorage",
        StorageV2 => "StorageV2",
        FileStorage => "FileStorage",
        BlockBlobStorage => "BlockBlobStorage",
    }
}

string_enum! {
    SkuName {
        StandardLrs => "Standard_LRS",
        StandardGrs => "Standard_GRS",
        StandardRagrs => "Standard_RAGRS",
        StandardZrs => "Standard_ZRS",
        PremiumLrs => "Premium_LRS",
    }
}

string_enum! {
    RehydratePriority {
        High => "High",
        Standard => "Standard",
    }
}

string_enum! {
    /// Extra datasets returned by a blob listing.
    ListBlobsInclude {
        Copy => "copy",
        Deleted => "deleted",
        Metadata => "metadata",
        Snapshots => "snapshots",
        UncommittedBlobs => "uncommittedblobs",
        Tags => "tags",
        Versions => "versions",
    }
}

string_enum! {
    /// Extra datasets returned by a container listing.
    ListContainersInclude {
        Metadata => "metadata",
        Deleted => "deleted",
    }
}

/// Render a set of include flags as the comma separated `include` value.
pub(crate) fn join_include<T: fmt::Display>(values: &[T]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}
