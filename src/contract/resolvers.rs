// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Built-in parameter resolvers, consulted in the order of [`RESOLVERS`].

use hyper::header::HeaderValue;

use super::{header_name, ParamSpec, RequestTemplate, Role};
use crate::body::{Part, ReusableBody};
use crate::convert::{self, Arg};
use crate::error::{Error, Result};
use crate::helpers::uri::encode_path_segment;

pub trait ParameterResolver: Send + Sync {
    /// Whether this resolver claims the parameter. Checked once per method.
    fn supports(&self, param: &ParamSpec) -> bool;

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()>;
}

pub struct PlainParamResolver;
pub struct BodyResolver;
pub struct PartResolver;
pub struct PathVariableResolver;
pub struct HeaderResolver;
pub struct CookieResolver;
pub struct AttributeResolver;

pub const RESOLVERS: &[&dyn ParameterResolver] = &[
    &PlainParamResolver,
    &BodyResolver,
    &PartResolver,
    &PathVariableResolver,
    &HeaderResolver,
    &CookieResolver,
    &AttributeResolver,
];

fn find_role<T>(param: &ParamSpec, pick: impl Fn(&Role) -> Option<T>) -> Option<T> {
    param.roles.iter().find_map(pick)
}

/// Encode a scalar argument, reporting failures under the parameter name.
fn scalar(param: &ParamSpec, arg: &Arg) -> Result<String> {
    if let Arg::Invalid(message) = arg {
        return Err(Error::encode(param.name, message.clone()));
    }
    convert::encode(arg).map_err(|e| match e {
        Error::Encode { message, .. } => Error::encode(param.name, message),
        other => other,
    })
}

fn json_bytes(param: &ParamSpec, value: &serde_json::Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::encode(param.name, e.to_string()))
}

impl ParameterResolver for PlainParamResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param.roles.iter().any(|r| matches!(r, Role::Param { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let Some((name, required, default)) = find_role(param, |r| match r {
            Role::Param {
                name,
                required,
                default,
            } => Some((*name, *required, *default)),
            _ => None,
        }) else {
            return Ok(());
        };
        let name = param.effective_name(name).to_string();

        match arg.flatten() {
            Arg::List(items) => {
                for item in items.into_iter().map(Arg::flatten) {
                    if !item.is_null() {
                        let value = scalar(param, &item)?;
                        template.query.push((name.clone(), value));
                    }
                }
            }
            Arg::Null => match default {
                Some(value) => template.query.push((name, value.to_string())),
                None if required => {
                    return Err(Error::InvalidRequest(format!(
                        "required query parameter '{}' is missing",
                        name
                    )))
                }
                None => {}
            },
            value => {
                let value = scalar(param, &value)?;
                template.query.push((name, value));
            }
        }
        Ok(())
    }
}

impl ParameterResolver for BodyResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param.roles.iter().any(|r| matches!(r, Role::Body { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let required = find_role(param, |r| match r {
            Role::Body { required } => Some(*required),
            _ => None,
        })
        .unwrap_or(true);

        let declared = template.content_type().map(str::to_string);
        let body: Box<dyn crate::body::Body> = match arg.flatten() {
            Arg::Null if required => {
                return Err(Error::InvalidRequest(format!(
                    "required body '{}' is missing",
                    param.name
                )))
            }
            Arg::Null => return Ok(()),
            Arg::Body(body) => body,
            Arg::Part(part) => part.body,
            Arg::Str(text) => Box::new(ReusableBody::from_bytes(
                declared.or_else(|| Some("text/plain; charset=utf-8".to_string())),
                text,
            )),
            Arg::Invalid(message) => return Err(Error::encode(param.name, message)),
            other => {
                let value = other.to_json().ok_or_else(|| {
                    Error::encode(param.name, "value cannot be serialized as a body")
                })?;
                Box::new(ReusableBody::from_bytes(
                    declared.or_else(|| Some("application/json".to_string())),
                    json_bytes(param, &value)?,
                ))
            }
        };

        if let Some(previous) = template.body.replace(body) {
            if let Err(e) = previous.close() {
                tracing::warn!(param = param.name, error = %e, "failed to release replaced body");
            }
        }
        Ok(())
    }
}

impl ParameterResolver for PartResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param.roles.iter().any(|r| matches!(r, Role::Part { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let Some(name) = find_role(param, |r| match r {
            Role::Part { name } => Some(*name),
            _ => None,
        }) else {
            return Ok(());
        };
        let name = param.effective_name(name);

        let items = match arg.flatten() {
            Arg::List(items) => items,
            single => vec![single],
        };
        for item in items.into_iter().map(Arg::flatten) {
            let part = match item {
                Arg::Null => continue,
                Arg::Part(mut part) => {
                    if part.name.is_empty() {
                        part.name = name.to_string();
                    }
                    part
                }
                Arg::Body(body) => Part {
                    name: name.to_string(),
                    filename: None,
                    body,
                },
                Arg::Json(value) => Part::new(
                    name,
                    ReusableBody::from_bytes(
                        Some("application/json".to_string()),
                        json_bytes(param, &value)?,
                    ),
                ),
                value => Part::text(name, scalar(param, &value)?),
            };
            template.parts.push(part);
        }
        Ok(())
    }
}

impl ParameterResolver for PathVariableResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param.roles.iter().any(|r| matches!(r, Role::Path { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let Some(name) = find_role(param, |r| match r {
            Role::Path { name } => Some(*name),
            _ => None,
        }) else {
            return Ok(());
        };
        let name = param.effective_name(name);
        let arg = arg.flatten();
        if arg.is_null() {
            return Err(Error::InvalidRequest(format!(
                "path variable '{}' is missing",
                name
            )));
        }
        let value = scalar(param, &arg)?;
        template
            .path_vars
            .insert(name.to_string(), encode_path_segment(&value));
        Ok(())
    }
}

impl ParameterResolver for HeaderResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param.roles.iter().any(|r| matches!(r, Role::Header { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let Some(name) = find_role(param, |r| match r {
            Role::Header { name } => Some(*name),
            _ => None,
        }) else {
            return Ok(());
        };
        let header = header_name(param.effective_name(name))?;

        let items = match arg.flatten() {
            Arg::List(items) => items,
            single => vec![single],
        };
        for item in items.into_iter().map(Arg::flatten) {
            if item.is_null() {
                continue;
            }
            let value = scalar(param, &item)?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| Error::encode(param.name, e.to_string()))?;
            template.headers.append(header.clone(), value);
        }
        Ok(())
    }
}

impl ParameterResolver for CookieResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param.roles.iter().any(|r| matches!(r, Role::Cookie { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let Some(name) = find_role(param, |r| match r {
            Role::Cookie { name } => Some(*name),
            _ => None,
        }) else {
            return Ok(());
        };
        let arg = arg.flatten();
        if arg.is_null() {
            return Ok(());
        }
        let value = scalar(param, &arg)?;
        template
            .cookies
            .insert(param.effective_name(name).to_string(), value);
        Ok(())
    }
}

impl ParameterResolver for AttributeResolver {
    fn supports(&self, param: &ParamSpec) -> bool {
        param
            .roles
            .iter()
            .any(|r| matches!(r, Role::Attribute { .. }))
    }

    fn resolve(&self, param: &ParamSpec, arg: Arg, template: &mut RequestTemplate) -> Result<()> {
        let Some(name) = find_role(param, |r| match r {
            Role::Attribute { name } => Some(*name),
            _ => None,
        }) else {
            return Ok(());
        };
        if let Arg::Invalid(message) = arg {
            return Err(Error::encode(param.name, message));
        }
        let value = arg
            .to_json()
            .ok_or_else(|| Error::encode(param.name, "attribute values must be plain data"))?;
        template
            .attributes
            .insert(param.effective_name(name).to_string(), value);
        Ok(())
    }
}
