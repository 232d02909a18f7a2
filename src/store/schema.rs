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

use crate::error::{LeaseError, Result};
use crate::store::{AttributeValue, Attributes};

/// Hand-written description of a table layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub hash_key: &'static str,
    /// Attribute holding the expiry in unix milliseconds, if records expire.
    pub ttl_attribute: Option<&'static str>,
}

impl TableSchema {
    pub fn new(
        name: impl Into<String>,
        hash_key: &'static str,
        ttl_attribute: Option<&'static str>,
    ) -> Self {
        Self {
            name: name.into(),
            hash_key,
            ttl_attribute,
        }
    }

    pub fn for_record<R: Record>(name: impl Into<String>) -> Self {
        Self::new(name, R::HASH_KEY, R::TTL_ATTRIBUTE)
    }

    /// Extracts the hash key from an item.
    pub fn key_of(&self, item: &Attributes) -> Result<String> {
        string_attr(&self.name, item, self.hash_key)
    }
}

/// Explicit mapping between a struct and its stored attributes.
pub trait Record: Sized {
    const HASH_KEY: &'static str;
    const TTL_ATTRIBUTE: Option<&'static str>;

    fn key(&self) -> &str;
    fn to_attributes(&self) -> Attributes;
    fn from_attributes(table: &str, attrs: &Attributes) -> Result<Self>;
}

pub fn string_attr(table: &str, attrs: &Attributes, name: &str) -> Result<String> {
    match attrs.get(name) {
        Some(AttributeValue::Str(value)) => Ok(value.clone()),
        Some(AttributeValue::Int(_)) => Err(invalid(table, format!("{name} is not a string"))),
        None => Err(invalid(table, format!("{name} is missing"))),
    }
}

pub fn int_attr(table: &str, attrs: &Attributes, name: &str) -> Result<i64> {
    match attrs.get(name) {
        Some(AttributeValue::Int(value)) => Ok(*value),
        Some(AttributeValue::Str(_)) => Err(invalid(table, format!("{name} is not a number"))),
        None => Err(invalid(table, format!("{name} is missing"))),
    }
}

fn invalid(table: &str, details: String) -> LeaseError {
    LeaseError::InvalidRecord {
        table: table.to_string(),
        details,
    }
}
