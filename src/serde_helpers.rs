// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Serde helpers for HeaderMap (de)serialization.
//!
//! Headers are written as `name -> [values]` so repeated headers survive a
//! round trip. Values that are not visible ASCII are dropped.

use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

pub fn headers_to_map(hm: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in hm.iter() {
        if let Ok(s) = v.to_str() {
            map.entry(k.as_str().to_string())
                .or_default()
                .push(s.to_string());
        }
    }
    map
}

pub fn serialize_headers<S>(hm: &HeaderMap, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    headers_to_map(hm).serialize(serializer)
}

pub fn deserialize_headers<'de, D>(deserializer: D) -> Result<HeaderMap, D::Error>
where
    D: Deserializer<'de>,
{
    let map = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
    let mut hm = HeaderMap::new();
    for (k, values) in map {
        let name = k
            .parse::<HeaderName>()
            .map_err(serde::de::Error::custom)?;
        for v in values {
            let val = v.parse::<HeaderValue>().map_err(serde::de::Error::custom)?;
            hm.append(name.clone(), val);
        }
    }
    Ok(hm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_non_utf8_values() -> anyhow::Result<()> {
        let mut hm = HeaderMap::new();
        hm.insert("x-good", "ok".parse()?);
        hm.insert("x-bad", HeaderValue::from_bytes(&[0xff])?);

        let map = headers_to_map(&hm);
        assert_eq!(map.get("x-good"), Some(&vec!["ok".to_string()]));
        assert!(!map.contains_key("x-bad"));
        Ok(())
    }

    #[test]
    fn invalid_header_name_fails_deserialization() {
        let res: Result<crate::message::RequestHead, _> = serde_json::from_str(
            r#"{"method":"GET","url":"http://x/","headers":{"bad name":["v"]}}"#,
        );
        assert!(res.is_err());
    }
}
