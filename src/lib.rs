// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Declarative HTTP clients.
//!
//! A client is a plain trait whose methods are described by static
//! [`contract::MethodSpec`] metadata. The [`http_client!`] macro generates the
//! glue that turns each trait call into a [`message::Request`], runs it
//! through one of the interchangeable [`executor`] backends and decodes the
//! [`message::Response`] into the declared return type.

pub mod body;
pub mod capture;
pub mod config;
pub mod contract;
pub mod convert;
pub mod error;
pub mod executor;
pub mod extract;
pub mod helpers;
pub mod http_date;
pub mod interceptor;
pub mod invoker;
pub mod message;
pub mod serde_helpers;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{Error, Result};
