// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Argument values and their wire-string encoding.
//!
//! Generated client glue turns every argument into an [`Arg`] through
//! [`IntoArg`]. Resolvers that place a value into a path, query, header or
//! cookie slot encode it with [`encode`], which tries [`CONVERTERS`] in order
//! and uses the first one whose `support` predicate matches.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::body::{Body, Part, ReusableBody};
use crate::error::{Error, Result};
use crate::extract::Json;

/// A method argument as seen by the contract.
#[derive(Debug)]
pub enum Arg {
    Null,
    Str(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    /// Wire name of an enum variant.
    Enum(&'static str),
    Optional(Option<Box<Arg>>),
    List(Vec<Arg>),
    Json(serde_json::Value),
    Body(Box<dyn Body>),
    Part(Part),
    /// A value that could not be turned into an argument; the message says why.
    Invalid(String),
}

impl Arg {
    /// `Null` or an empty `Optional`.
    pub fn is_null(&self) -> bool {
        match self {
            Arg::Null | Arg::Optional(None) => true,
            Arg::Optional(Some(inner)) => inner.is_null(),
            _ => false,
        }
    }

    /// Unwrap `Optional` layers.
    pub fn flatten(self) -> Arg {
        match self {
            Arg::Optional(Some(inner)) => inner.flatten(),
            Arg::Optional(None) => Arg::Null,
            other => other,
        }
    }

    /// JSON view of scalar and JSON arguments, used for request attributes.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;
        Some(match self {
            Arg::Null => Value::Null,
            Arg::Str(s) => Value::String(s.clone()),
            Arg::Bool(b) => Value::Bool(*b),
            Arg::Int(i) => Value::from(*i),
            Arg::UInt(u) => Value::from(*u),
            Arg::Float(f) => Value::from(*f),
            Arg::Timestamp(t) => Value::String(format_timestamp(t)),
            Arg::Enum(name) => Value::String((*name).to_string()),
            Arg::Optional(None) => Value::Null,
            Arg::Optional(Some(inner)) => inner.to_json()?,
            Arg::List(items) => Value::Array(
                items
                    .iter()
                    .map(|a| a.to_json())
                    .collect::<Option<Vec<_>>>()?,
            ),
            Arg::Json(v) => v.clone(),
            Arg::Body(_) | Arg::Part(_) | Arg::Invalid(_) => return None,
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Arg::Null => "null",
            Arg::Str(_) => "string",
            Arg::Bool(_) => "boolean",
            Arg::Int(_) | Arg::UInt(_) | Arg::Float(_) => "number",
            Arg::Timestamp(_) => "timestamp",
            Arg::Enum(_) => "enum",
            Arg::Optional(_) => "optional",
            Arg::List(_) => "list",
            Arg::Json(_) => "json",
            Arg::Body(_) => "body",
            Arg::Part(_) => "part",
            Arg::Invalid(_) => "invalid",
        }
    }
}

pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for String {
    fn into_arg(self) -> Arg {
        Arg::Str(self)
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Arg {
        Arg::Str(self.to_string())
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> Arg {
        Arg::Str(self.clone())
    }
}

impl IntoArg for bool {
    fn into_arg(self) -> Arg {
        Arg::Bool(self)
    }
}

macro_rules! int_args {
    ($variant:ident: $($t:ty),*) => {
        $(
            impl IntoArg for $t {
                fn into_arg(self) -> Arg {
                    Arg::$variant(self as _)
                }
            }
        )*
    };
}

int_args!(Int: i8, i16, i32, i64, isize);
int_args!(UInt: u8, u16, u32, u64, usize);
int_args!(Float: f32, f64);

impl IntoArg for DateTime<Utc> {
    fn into_arg(self) -> Arg {
        Arg::Timestamp(self)
    }
}

impl<T: IntoArg> IntoArg for Option<T> {
    fn into_arg(self) -> Arg {
        Arg::Optional(self.map(|v| Box::new(v.into_arg())))
    }
}

impl<T: IntoArg> IntoArg for Vec<T> {
    fn into_arg(self) -> Arg {
        Arg::List(self.into_iter().map(IntoArg::into_arg).collect())
    }
}

impl<T: Serialize> IntoArg for Json<T> {
    fn into_arg(self) -> Arg {
        match serde_json::to_value(&self.0) {
            Ok(v) => Arg::Json(v),
            Err(e) => Arg::Invalid(e.to_string()),
        }
    }
}

impl IntoArg for serde_json::Value {
    fn into_arg(self) -> Arg {
        Arg::Json(self)
    }
}

impl IntoArg for Box<dyn Body> {
    fn into_arg(self) -> Arg {
        Arg::Body(self)
    }
}

impl IntoArg for ReusableBody {
    fn into_arg(self) -> Arg {
        Arg::Body(Box::new(self))
    }
}

impl IntoArg for Part {
    fn into_arg(self) -> Arg {
        Arg::Part(self)
    }
}

pub trait Converter: Send + Sync {
    fn support(&self, value: &Arg) -> bool;
    fn convert(&self, value: &Arg) -> Result<String>;
}

pub struct NullConverter;

impl Converter for NullConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Null)
    }

    fn convert(&self, _value: &Arg) -> Result<String> {
        Ok(String::new())
    }
}

pub struct StringConverter;

impl Converter for StringConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Str(_))
    }

    fn convert(&self, value: &Arg) -> Result<String> {
        match value {
            Arg::Str(s) => Ok(s.clone()),
            other => Err(mismatch(self_name::<Self>(), other)),
        }
    }
}

pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Bool(_))
    }

    fn convert(&self, value: &Arg) -> Result<String> {
        match value {
            Arg::Bool(b) => Ok(b.to_string()),
            other => Err(mismatch(self_name::<Self>(), other)),
        }
    }
}

pub struct NumberConverter;

impl Converter for NumberConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Int(_) | Arg::UInt(_) | Arg::Float(_))
    }

    fn convert(&self, value: &Arg) -> Result<String> {
        match value {
            Arg::Int(i) => Ok(i.to_string()),
            Arg::UInt(u) => Ok(u.to_string()),
            Arg::Float(f) if f.is_finite() => Ok(f.to_string()),
            Arg::Float(f) => Err(Error::encode("number", format!("{} is not finite", f))),
            other => Err(mismatch(self_name::<Self>(), other)),
        }
    }
}

pub struct TimestampConverter;

impl Converter for TimestampConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Timestamp(_))
    }

    fn convert(&self, value: &Arg) -> Result<String> {
        match value {
            Arg::Timestamp(t) => Ok(format_timestamp(t)),
            other => Err(mismatch(self_name::<Self>(), other)),
        }
    }
}

pub struct OptionalConverter;

impl Converter for OptionalConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Optional(_))
    }

    fn convert(&self, value: &Arg) -> Result<String> {
        match value {
            Arg::Optional(Some(inner)) => encode(inner),
            Arg::Optional(None) => encode(&Arg::Null),
            other => Err(mismatch(self_name::<Self>(), other)),
        }
    }
}

pub struct EnumConverter;

impl Converter for EnumConverter {
    fn support(&self, value: &Arg) -> bool {
        matches!(value, Arg::Enum(_))
    }

    fn convert(&self, value: &Arg) -> Result<String> {
        match value {
            Arg::Enum(name) => Ok((*name).to_string()),
            other => Err(mismatch(self_name::<Self>(), other)),
        }
    }
}

pub const CONVERTERS: &[&dyn Converter] = &[
    &NullConverter,
    &StringConverter,
    &BooleanConverter,
    &NumberConverter,
    &TimestampConverter,
    &OptionalConverter,
    &EnumConverter,
];

/// Encode a value with the first converter that supports it.
pub fn encode(value: &Arg) -> Result<String> {
    match CONVERTERS.iter().find(|c| c.support(value)) {
        Some(converter) => converter.convert(value),
        None => Err(Error::encode(
            value.kind(),
            format!("no converter supports {} values", value.kind()),
        )),
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn self_name<T>() -> &'static str {
    std::any::type_name::<T>()
        .rsplit("::")
        .next()
        .unwrap_or("converter")
}

fn mismatch(converter: &str, value: &Arg) -> Error {
    Error::encode(
        value.kind(),
        format!("{} cannot encode {} values", converter, value.kind()),
    )
}
