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

//! Predicates evaluated atomically with a conditional write.

use crate::store::{AttributeValue, Attributes};
use std::cmp::Ordering;
use std::fmt;
use std::ops;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    AttributeExists(String),
    AttributeNotExists(String),
    Eq(String, AttributeValue),
    NotEq(String, AttributeValue),
    Lt(String, AttributeValue),
    Gt(String, AttributeValue),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

pub fn attribute_exists(name: &str) -> Condition {
    Condition::AttributeExists(name.to_string())
}

pub fn attribute_not_exists(name: &str) -> Condition {
    Condition::AttributeNotExists(name.to_string())
}

pub fn eq(name: &str, value: impl Into<AttributeValue>) -> Condition {
    Condition::Eq(name.to_string(), value.into())
}

pub fn not_eq(name: &str, value: impl Into<AttributeValue>) -> Condition {
    Condition::NotEq(name.to_string(), value.into())
}

pub fn lt(name: &str, value: impl Into<AttributeValue>) -> Condition {
    Condition::Lt(name.to_string(), value.into())
}

pub fn gt(name: &str, value: impl Into<AttributeValue>) -> Condition {
    Condition::Gt(name.to_string(), value.into())
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        match self {
            Condition::Or(mut parts) => {
                parts.push(other);
                Condition::Or(parts)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    /// Evaluates the condition against the current item, `None` when absent.
    ///
    /// Comparisons involving a missing attribute or values of different
    /// types are false; `NotEq` is false for a missing attribute as well.
    pub fn evaluate(&self, item: Option<&Attributes>) -> bool {
        let lookup = |name: &str| item.and_then(|attrs| attrs.get(name));
        match self {
            Condition::AttributeExists(name) => lookup(name).is_some(),
            Condition::AttributeNotExists(name) => lookup(name).is_none(),
            Condition::Eq(name, value) => compare(lookup(name), value) == Some(Ordering::Equal),
            Condition::NotEq(name, value) => {
                matches!(compare(lookup(name), value), Some(ord) if ord != Ordering::Equal)
            }
            Condition::Lt(name, value) => compare(lookup(name), value) == Some(Ordering::Less),
            Condition::Gt(name, value) => compare(lookup(name), value) == Some(Ordering::Greater),
            Condition::And(parts) => parts.iter().all(|part| part.evaluate(item)),
            Condition::Or(parts) => parts.iter().any(|part| part.evaluate(item)),
            Condition::Not(inner) => !inner.evaluate(item),
        }
    }
}

fn compare(actual: Option<&AttributeValue>, expected: &AttributeValue) -> Option<Ordering> {
    match (actual?, expected) {
        (AttributeValue::Int(a), AttributeValue::Int(b)) => Some(a.cmp(b)),
        (AttributeValue::Str(a), AttributeValue::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

impl ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::AttributeExists(name) => write!(f, "attribute_exists({name})"),
            Condition::AttributeNotExists(name) => write!(f, "attribute_not_exists({name})"),
            Condition::Eq(name, value) => write!(f, "{name} = {value}"),
            Condition::NotEq(name, value) => write!(f, "{name} <> {value}"),
            Condition::Lt(name, value) => write!(f, "{name} < {value}"),
            Condition::Gt(name, value) => write!(f, "{name} > {value}"),
            Condition::And(parts) => write_joined(f, parts, " AND "),
            Condition::Or(parts) => write_joined(f, parts, " OR "),
            Condition::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Condition], separator: &str) -> fmt::Result {
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        match part {
            Condition::And(_) | Condition::Or(_) => write!(f, "({part})")?,
            _ => write!(f, "{part}")?,
        }
    }
    Ok(())
}
