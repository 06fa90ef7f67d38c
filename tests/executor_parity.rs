// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! The three executors must be observably identical for the same request.

mod common;

use std::io::Read;
use std::time::Duration;

use common::{all_executors, executor, short_timeouts, Harness, KINDS};
use http_interface::body::{Body, CompressedBody, Encoding, InputStreamBody, ReusableBody};
use http_interface::message::Request;
use hyper::{Method, StatusCode};
use rstest::rstest;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

type Observed = (
    StatusCode,
    Option<String>,
    Option<String>,
    Option<String>,
    Vec<u8>,
);

fn observe(resp: &http_interface::message::Response) -> anyhow::Result<Observed> {
    Ok((
        resp.status,
        resp.header("content-type").map(str::to_string),
        resp.header("content-length").map(str::to_string),
        resp.header("x-custom").map(str::to_string),
        resp.bytes()?.to_vec(),
    ))
}

#[test]
fn same_request_same_response() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/parity"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-custom", "yes")
                    .set_body_raw("hello parity", "text/plain"),
            ),
    );

    let mut seen = Vec::new();
    for ex in all_executors()? {
        let resp = ex.execute(Request::new(Method::GET, h.url("/parity")))?;
        seen.push((ex.name(), observe(&resp)?));
    }

    let (_, first) = &seen[0];
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(first.4, b"hello parity");
    for (name, other) in &seen[1..] {
        assert_eq!(other, first, "{} differs", name);
    }
    Ok(())
}

#[test]
fn default_accept_and_cookie_header() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(Mock::given(method("GET")).respond_with(ResponseTemplate::new(204)));

    for ex in all_executors()? {
        let mut req = Request::new(Method::GET, h.url("/cookies"));
        req.cookies.insert("b".into(), "2".into());
        req.cookies.insert("a".into(), "1".into());
        let resp = ex.execute(req)?;
        assert_eq!(resp.status, StatusCode::NO_CONTENT);
    }

    let received = h.received();
    assert_eq!(received.len(), KINDS.len());
    for r in received {
        let cookies: Vec<_> = r.headers.get_all("cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1; b=2"]);
        assert_eq!(
            r.headers.get("accept").and_then(|v| v.to_str().ok()),
            Some("*/*")
        );
    }
    Ok(())
}

#[test]
fn known_length_bodies_are_framed_with_content_length() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(Mock::given(method("PUT")).respond_with(ResponseTemplate::new(200)));

    for ex in all_executors()? {
        let body = ReusableBody::from_bytes(Some("text/plain".into()), "exact");
        ex.execute(Request::new(Method::PUT, h.url("/sized")).with_body(body))?;
    }

    for r in h.received() {
        assert_eq!(
            r.headers.get("content-length").and_then(|v| v.to_str().ok()),
            Some("5")
        );
        assert_eq!(
            r.headers.get("content-type").and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        assert_eq!(r.body, b"exact");
    }
    Ok(())
}

#[test]
fn unknown_length_bodies_stream_without_content_length() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(201)),
    );

    let payload = "streamed line\n".repeat(20_000);
    for ex in all_executors()? {
        let source = InputStreamBody::new(
            Some("text/plain".into()),
            None,
            std::io::Cursor::new(payload.clone().into_bytes()),
        );
        let body = CompressedBody::new(Box::new(source), Encoding::Gzip);
        let mut req = Request::new(Method::POST, h.url("/upload")).with_body(body);
        req.headers.insert("content-encoding", "gzip".parse()?);
        req.headers.insert("content-length", "1".parse()?);
        let resp = ex.execute(req)?;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", ex.name());
    }

    let received = h.received();
    assert_eq!(received.len(), KINDS.len());
    for r in received {
        assert!(!r.headers.contains_key("content-length"));
        let mut plain = String::new();
        flate2::read::GzDecoder::new(&r.body[..]).read_to_string(&mut plain)?;
        assert_eq!(plain, payload);
    }
    Ok(())
}

#[test]
fn large_responses_are_spooled_and_rereadable() -> anyhow::Result<()> {
    let h = Harness::start()?;
    let big = vec![b'x'; http_interface::body::MEMORY_THRESHOLD as usize + 1024];
    h.mount(
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(big.clone(), "application/octet-stream"),
            ),
    );

    for ex in all_executors()? {
        let resp = ex.execute(Request::new(Method::GET, h.url("/big")))?;
        assert!(resp.body.is_spooled(), "{}", ex.name());
        let spool = resp.body.spool_path().map(|p| p.to_path_buf());
        assert_eq!(resp.bytes()?.len(), big.len());
        assert_eq!(resp.bytes()?.len(), big.len());
        drop(resp);
        assert!(!spool.expect("spooled").exists());
    }
    Ok(())
}

#[rstest]
#[case(500)]
#[case(404)]
#[case(302)]
fn statuses_are_returned_not_raised(#[case] status: u16) -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET")).respond_with(
            ResponseTemplate::new(status)
                .insert_header("location", "/elsewhere")
                .set_body_string("status body"),
        ),
    );

    for ex in all_executors()? {
        let resp = ex.execute(Request::new(Method::GET, h.url("/status")))?;
        assert_eq!(resp.status.as_u16(), status, "{}", ex.name());
        assert_eq!(resp.text()?, "status body");
    }
    assert_eq!(h.received().len(), KINDS.len());
    Ok(())
}

#[test]
fn slow_responses_time_out() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3))),
    );

    for kind in KINDS {
        let ex = executor(kind, short_timeouts())?;
        let err = ex
            .execute(Request::new(Method::GET, h.url("/slow")))
            .expect_err("request should time out");
        assert!(err.is_timeout(), "{:?}: {}", kind, err);
        assert_eq!(err.request().map(|r| r.url.clone()), Some(h.url("/slow")));
        assert!(err.response().is_none());
    }
    Ok(())
}

#[test]
fn refused_connections_are_timeouts() -> anyhow::Result<()> {
    common::init_tracing();
    for kind in KINDS {
        let ex = executor(kind, short_timeouts())?;
        let body = ReusableBody::from_bytes(None, "never sent");
        let err = ex
            .execute(Request::new(Method::POST, "http://127.0.0.1:9/").with_body(body))
            .expect_err("nothing listens on the discard port");
        assert!(err.is_timeout(), "{:?}: {}", kind, err);
    }
    Ok(())
}

#[test]
fn request_bodies_are_released_after_sending() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)));

    for ex in all_executors()? {
        let body = ReusableBody::from_reader(None, None, &b"spooled upload"[..])?;
        let spool = body.spool_path().map(|p| p.to_path_buf()).expect("unknown length spools");
        assert_eq!(body.content_length(), Some(14));
        ex.execute(Request::new(Method::POST, h.url("/release")).with_body(body))?;
        assert!(!spool.exists(), "{}", ex.name());
    }
    Ok(())
}
