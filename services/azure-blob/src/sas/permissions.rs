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

/// Define a set of flags rendered as one character each.
///
/// Rendering walks the flags in the order they are listed here, so two values
/// with the same flags always render to the same string.
macro_rules! sas_flags {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$field_meta:meta])* $field:ident => $ch:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            $($(#[$field_meta])* pub $field: bool,)+
        }

        impl $name {
            /// All characters accepted by this set, in render order.
            pub const ORDER: &'static str = concat!($($ch),+);

            /// Check if no flag is set.
            pub fn is_empty(&self) -> bool {
                !($(self.$field)||+)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $(
                    if self.$field {
                        f.write_str($ch)?;
                    }
                )+
                Ok(())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut v = Self::default();
                for c in s.chars() {
                    match c.to_string().as_str() {
                        $($ch => v.$field = true,)+
                        _ => {
                            return Err(Error::request_invalid(format!(
                                "invalid character '{c}' in {}: '{s}'",
                                stringify!($name)
                            )))
                        }
                    }
                }
                Ok(v)
            }
        }
    };
}

sas_flags! {
    /// Permissions granted by a blob SAS.
    BlobSasPermissions {
        read => "r",
        add => "a",
        create => "c",
        write => "w",
        delete => "d",
        /// Delete a blob version.
        delete_previous_version => "x",
        tag => "t",
    }
}

sas_flags! {
    /// Permissions granted by a container SAS.
    ContainerSasPermissions {
        read => "r",
        add => "a",
        create => "c",
        write => "w",
        delete => "d",
        /// Delete a blob version.
        delete_previous_version => "x",
        list => "l",
        tag => "t",
    }
}

sas_flags! {
    /// Permissions of a stored access policy on a container.
    AccessPolicyPermission {
        read => "r",
        add => "a",
        create => "c",
        write => "w",
        delete => "d",
        list => "l",
    }
}

sas_flags! {
    /// Permissions granted by an account SAS.
    AccountSasPermissions {
        read => "r",
        write => "w",
        delete => "d",
        /// Delete a blob version.
        delete_previous_version => "x",
        list => "l",
        add => "a",
        create => "c",
        update => "u",
        process => "p",
        tag => "t",
        filter_by_tags => "f",
    }
}

sas_flags! {
    /// Services an account SAS is valid for.
    AccountSasServices {
        blob => "b",
        file => "f",
        queue => "q",
        table => "t",
    }
}

sas_flags! {
    /// Resource types an account SAS is valid for.
    AccountSasResourceTypes {
        service => "s",
        container => "c",
        object => "o",
    }
}
