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

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock};

use azblob_core::hash::{base64_decode, base64_hmac_sha256};
use azblob_core::time::{now, DateTime};
use azblob_core::utils::Redact;
use azblob_core::{Error, Result, SigningCredential};

/// Account name plus the decoded account key.
///
/// The key is decoded from base64 once, when the credential is built. Clones
/// share the same key, so [`SharedKeyCredential::set_account_key`] on one
/// clone is observed by every request signed through the others.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account_name: String,
    key: Arc<RwLock<Arc<Vec<u8>>>>,
}

impl SharedKeyCredential {
    /// Build a credential from an account name and a base64 encoded key.
    ///
    /// Fails with [`azblob_core::ErrorKind::CredentialInvalid`] if the key is
    /// not valid base64.
    pub fn new(account_name: impl Into<String>, account_key: &str) -> Result<Self> {
        let key = decode_key(account_key)?;

        Ok(Self {
            account_name: account_name.into(),
            key: Arc::new(RwLock::new(Arc::new(key))),
        })
    }

    /// Name of the storage account.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Replace the account key.
    ///
    /// The new key is decoded before anything is swapped; on error the old
    /// key stays in place.
    pub fn set_account_key(&self, account_key: &str) -> Result<()> {
        let key = Arc::new(decode_key(account_key)?);
        *self.key.write().unwrap_or_else(|e| e.into_inner()) = key;
        Ok(())
    }

    /// base64(HMAC-SHA256(key, string_to_sign))
    pub fn compute_hmac_sha256(&self, string_to_sign: &str) -> String {
        let key = self.key.read().unwrap_or_else(|e| e.into_inner()).clone();
        base64_hmac_sha256(&key, string_to_sign.as_bytes())
    }
}

fn decode_key(account_key: &str) -> Result<Vec<u8>> {
    if account_key.is_empty() {
        return Err(Error::credential_invalid("account key is empty"));
    }

    base64_decode(account_key).map_err(|e| {
        Error::credential_invalid("account key is not valid base64").with_source(e)
    })
}

impl Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .field("account_key", &"REDACTED")
            .finish()
    }
}

/// Credential enum for different Azure Blob Storage authentication methods.
#[derive(Clone)]
pub enum Credential {
    /// Shared Key authentication with account name and key
    SharedKey(SharedKeyCredential),
    /// SAS (Shared Access Signature) token authentication
    SasToken {
        /// SAS token, without the leading `?`.
        token: String,
    },
    /// Bearer token for OAuth authentication
    BearerToken {
        /// Bearer token.
        token: String,
        /// Expiration time for this credential.
        expires_in: Option<DateTime>,
    },
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey(key) => f
                .debug_tuple("Credential::SharedKey")
                .field(key)
                .finish(),
            Credential::SasToken { token } => f
                .debug_struct("Credential::SasToken")
                .field("token", &Redact::from(token))
                .finish(),
            Credential::BearerToken { token, expires_in } => f
                .debug_struct("Credential::BearerToken")
                .field("token", &Redact::from(token))
                .field("expires_in", expires_in)
                .finish(),
        }
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey(key) => !key.account_name().is_empty(),
            Credential::SasToken { token } => !token.is_empty(),
            Credential::BearerToken { token, expires_in } => {
                if token.is_empty() {
                    return false;
                }
                // Take 20s as buffer to avoid edge cases.
                match expires_in {
                    Some(expires) => *expires > now() + chrono::TimeDelta::seconds(20),
                    None => true,
                }
            }
        }
    }
}

impl Credential {
    /// Create a new credential with shared key authentication.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Result<Self> {
        Ok(Self::SharedKey(SharedKeyCredential::new(
            account_name,
            account_key,
        )?))
    }

    /// Create a new credential with SAS token authentication.
    pub fn with_sas_token(sas_token: &str) -> Self {
        Self::SasToken {
            token: sas_token.trim_start_matches('?').to_string(),
        }
    }

    /// Create a new credential with bearer token authentication.
    pub fn with_bearer_token(bearer_token: &str, expires_in: Option<DateTime>) -> Self {
        Self::BearerToken {
            token: bearer_token.to_string(),
            expires_in,
        }
    }

    /// The shared key behind this credential, if any.
    pub fn shared_key(&self) -> Option<&SharedKeyCredential> {
        match self {
            Credential::SharedKey(key) => Some(key),
            _ => None,
        }
    }
}

impl From<SharedKeyCredential> for Credential {
    fn from(value: SharedKeyCredential) -> Self {
        Credential::SharedKey(value)
    }
}
