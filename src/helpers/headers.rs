// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use hyper::HeaderMap;

/// Retrieve a header value as a string, if it exists and contains only visible ASCII.
pub fn get_header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Declared `Content-Length`, if present and numeric.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    get_header_str(headers, hyper::header::CONTENT_LENGTH.as_str())
        .and_then(|v| v.trim().parse().ok())
}

/// Split a parameter list on `;`, ignoring separators inside quoted-strings.
pub fn split_semicolons_respecting_quotes(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut in_quote = false;
    let mut prev_backslash = false;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'\\' if in_quote && !prev_backslash => {
                prev_backslash = true;
                continue;
            }
            b'"' if !prev_backslash => in_quote = !in_quote,
            b';' if !in_quote => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev_backslash = false;
    }
    parts.push(&s[start..]);
    parts
}

/// Strip surrounding quotes and backslash escapes from a parameter value.
pub fn unquote(val: &str) -> String {
    let v = val.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        let mut out = String::with_capacity(v.len());
        let mut escaped = false;
        for c in v[1..v.len() - 1].chars() {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else {
                out.push(c);
            }
        }
        out
    } else {
        v.to_string()
    }
}

/// Find a parameter (case-insensitive) in a `type; a=b; c="d"` header value.
pub fn header_param(val: &str, param: &str) -> Option<String> {
    split_semicolons_respecting_quotes(val)
        .into_iter()
        .skip(1)
        .filter_map(|p| {
            let (name, value) = p.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case(param)
                .then(|| unquote(value))
        })
        .next()
}

/// The `charset` parameter of a `Content-Type` value, lowercased.
pub fn content_type_charset(content_type: &str) -> Option<String> {
    header_param(content_type, "charset").map(|c| c.to_ascii_lowercase())
}

/// The file name carried by a `Content-Disposition` value.
///
/// `filename*` (RFC 5987, UTF-8 or ISO-8859-1) wins over `filename`.
pub fn content_disposition_filename(val: &str) -> Option<String> {
    if let Some(ext) = header_param(val, "filename*") {
        if let Some(decoded) = decode_ext_value(&ext) {
            return Some(decoded);
        }
    }
    header_param(val, "filename").filter(|f| !f.is_empty())
}

fn decode_ext_value(ext: &str) -> Option<String> {
    let mut it = ext.splitn(3, '\'');
    let charset = it.next()?.trim().to_ascii_lowercase();
    let _language = it.next()?;
    let encoded = it.next()?;
    let bytes = percent_decode(encoded)?;
    match charset.as_str() {
        "utf-8" => String::from_utf8(bytes).ok(),
        "iso-8859-1" => Some(bytes.iter().map(|&b| b as char).collect()),
        _ => None,
    }
}

fn percent_decode(s: &str) -> Option<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}
