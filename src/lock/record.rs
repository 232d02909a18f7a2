// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::clock::{from_millis, to_millis};
use crate::error::Result;
use crate::store::{Attributes, Record, int_attr, string_attr};
use chrono::{DateTime, Utc};

pub(crate) const RESOURCE: &str = "resource";
pub(crate) const TOKEN: &str = "token";
pub(crate) const EXPIRES_AT: &str = "expires_at";

/// Persisted form of a held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub resource: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Record for LockRecord {
    const HASH_KEY: &'static str = RESOURCE;
    const TTL_ATTRIBUTE: Option<&'static str> = Some(EXPIRES_AT);

    fn key(&self) -> &str {
        &self.resource
    }

    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(RESOURCE.to_string(), self.resource.clone().into());
        attrs.insert(TOKEN.to_string(), self.token.clone().into());
        attrs.insert(EXPIRES_AT.to_string(), to_millis(self.expires_at).into());
        attrs
    }

    fn from_attributes(table: &str, attrs: &Attributes) -> Result<Self> {
        Ok(Self {
            resource: string_attr(table, attrs, RESOURCE)?,
            token: string_attr(table, attrs, TOKEN)?,
            expires_at: from_millis(int_attr(table, attrs, EXPIRES_AT)?),
        })
    }
}
