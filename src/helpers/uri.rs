// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Small reusable helpers for building request URLs.

/// Join two path fragments with exactly one separating slash.
///
/// Leading or trailing slashes on either side are collapsed at the seam;
/// the outer ends of the fragments are kept as written, so a trailing slash
/// on `right` survives.
pub fn join_path(left: &str, right: &str) -> String {
    let l = left.trim_end_matches('/');
    let r = right.trim_start_matches('/');
    if r.is_empty() && right.is_empty() {
        return ensure_leading_slash(left);
    }
    if l.is_empty() {
        return ensure_leading_slash(right);
    }
    format!("{}/{}", ensure_leading_slash(l), r)
}

fn ensure_leading_slash(s: &str) -> String {
    if s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{}", s)
    }
}

/// Percent-encode a value for use as a single path segment.
///
/// Only RFC 3986 unreserved characters are left as is.
pub fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Replace `{name}` placeholders using `lookup`. Unknown placeholders and
/// unbalanced braces are kept literally.
pub fn expand_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match lookup(name) {
                    Some(v) => out.push_str(&v),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Concatenate a base URL and a path, then append form-encoded query pairs.
pub fn build_url(base: &str, path: &str, query: &[(String, String)]) -> String {
    let base = base.trim_end_matches('/');
    let mut url = if path.is_empty() {
        base.to_string()
    } else {
        format!("{}{}", base, ensure_leading_slash(path))
    };
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }
    url
}
