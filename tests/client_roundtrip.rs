// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Generated clients against a mock server, through every executor.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{executor, Harness};
use http_interface::body::Part;
use http_interface::contract::{Mapping, Role};
use http_interface::convert::{Arg, IntoArg};
use http_interface::executor::{ExecutorKind, ExecutorOptions};
use http_interface::extract::Json;
use http_interface::interceptor::StatusInterceptor;
use http_interface::invoker::{Invoker, InvokerBuilder};
use http_interface::message::Response;
use http_interface::{http_client, Error, Result};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, Respond, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pet {
    id: u64,
    name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
enum Availability {
    Available,
    Sold,
}

impl IntoArg for Availability {
    fn into_arg(self) -> Arg {
        Arg::Enum(match self {
            Availability::Available => "available",
            Availability::Sold => "sold",
        })
    }
}

trait PetStore {
    fn get_pet(&self, id: u64) -> Result<Json<Pet>>;
    fn find(
        &self,
        status: Availability,
        tags: Vec<String>,
        limit: Option<u32>,
    ) -> Result<Json<Vec<Pet>>>;
    fn create(&self, pet: Json<Pet>, trace: &str, session: &str) -> Result<Response>;
    fn echo(&self, n: i64) -> Result<String>;
    fn echo_number(&self, n: i64) -> Result<Json<i64>>;
    fn download(&self, name: &str) -> Result<PathBuf>;
    fn upload(&self, title: &str, file: Part) -> Result<String>;
}

http_client! {
    struct PetStoreClient: PetStore {
        mapping: Mapping::at("/api/").produces(&["application/json"]);
        fn get_pet(&self, id: u64 => [Role::path("")]) -> Result<Json<Pet>> =
            Mapping::get("/pets/{id}");
        fn find(
            &self,
            status: Availability => [Role::param("")],
            tags: Vec<String> => [Role::param("tag")],
            limit: Option<u32> => [Role::param("").optional()]
        ) -> Result<Json<Vec<Pet>>> = Mapping::get("pets");
        fn create(
            &self,
            pet: Json<Pet> => [Role::body()],
            trace: &str => [Role::header("X-Trace")],
            session: &str => [Role::cookie("")]
        ) -> Result<Response> = Mapping::post("/pets").consumes(&["application/json"]);
        fn echo(&self, n: i64 => [Role::param("")]) -> Result<String> =
            Mapping::get("/echo").produces(&["text/plain"]);
        fn echo_number(&self, n: i64 => [Role::param("")]) -> Result<Json<i64>> =
            Mapping::get("/echo");
        fn download(&self, name: &str => [Role::path("")]) -> Result<PathBuf> =
            Mapping::get("/files/{name}");
        fn upload(
            &self,
            title: &str => [Role::part("")],
            file: Part => [Role::part("")]
        ) -> Result<String> = Mapping::post("/uploads");
    }
}

fn client_for(builder: InvokerBuilder, kind: ExecutorKind) -> anyhow::Result<PetStoreClient> {
    let invoker = builder
        .executor(executor(kind, ExecutorOptions::default())?)
        .build()?;
    Ok(PetStoreClient::new(Arc::new(invoker)))
}

fn client(h: &Harness, kind: ExecutorKind) -> anyhow::Result<PetStoreClient> {
    client_for(Invoker::builder(h.uri()), kind)
}

/// Replies with the `n` query parameter as plain text.
struct EchoQuery;

impl Respond for EchoQuery {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let n = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "n")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_raw(n, "text/plain; charset=utf-8")
    }
}

#[rstest]
#[case(ExecutorKind::Hyper)]
#[case(ExecutorKind::Conn)]
#[case(ExecutorKind::Reqwest)]
fn path_and_json_response(#[case] kind: ExecutorKind) -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/pets/7"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Pet {
                id: 7,
                name: "Rex".into(),
            })),
    );

    let pet = client(&h, kind)?.get_pet(7)?.into_inner();
    assert_eq!(
        pet,
        Pet {
            id: 7,
            name: "Rex".into()
        }
    );
    Ok(())
}

#[rstest]
#[case(ExecutorKind::Hyper)]
#[case(ExecutorKind::Conn)]
#[case(ExecutorKind::Reqwest)]
fn query_parameters(#[case] kind: ExecutorKind) -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/pets"))
            .and(query_param("status", "sold"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Pet>::new())),
    );

    let found = client(&h, kind)?.find(
        Availability::Sold,
        vec!["small dog".into(), "brown".into()],
        None,
    )?;
    assert!(found.0.is_empty());

    let received = h.received();
    assert_eq!(
        received[0].url.query(),
        Some("status=sold&tag=small+dog&tag=brown")
    );
    Ok(())
}

#[rstest]
#[case(ExecutorKind::Hyper)]
#[case(ExecutorKind::Conn)]
#[case(ExecutorKind::Reqwest)]
fn body_header_and_cookie(#[case] kind: ExecutorKind) -> anyhow::Result<()> {
    let h = Harness::start()?;
    let pet = Pet {
        id: 1,
        name: "Tom".into(),
    };
    h.mount(
        Mock::given(method("POST"))
            .and(path("/api/pets"))
            .and(header("x-trace", "t-1"))
            .and(header("cookie", "session=s-1"))
            .and(header("content-type", "application/json"))
            .and(body_json(&pet))
            .respond_with(ResponseTemplate::new(201).insert_header("location", "/api/pets/1")),
    );

    let resp = client(&h, kind)?.create(Json(pet), "t-1", "s-1")?;
    assert_eq!(resp.status.as_u16(), 201);
    assert_eq!(resp.header("location"), Some("/api/pets/1"));
    Ok(())
}

#[rstest]
#[case(ExecutorKind::Hyper)]
#[case(ExecutorKind::Conn)]
#[case(ExecutorKind::Reqwest)]
fn converted_values_reach_the_server(#[case] kind: ExecutorKind) -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/echo"))
            .respond_with(EchoQuery),
    );

    let c = client(&h, kind)?;
    assert_eq!(c.echo(42)?, "42");
    assert_eq!(c.echo(-3)?, "-3");
    assert_eq!(c.echo_number(42)?.into_inner(), 42);
    Ok(())
}

#[rstest]
#[case(ExecutorKind::Hyper)]
#[case(ExecutorKind::Reqwest)]
fn too_many_requests_carries_retry_after(#[case] kind: ExecutorKind) -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/pets/9"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "30")
                    .set_body_string("slow down"),
            ),
    );

    let c = client_for(Invoker::builder(h.uri()).interceptor(StatusInterceptor), kind)?;
    match c.get_pet(9) {
        Err(Error::TooManyRequests {
            retry_after,
            response,
            request,
        }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
            assert_eq!(response.text()?, "slow down");
            assert_eq!(request.url, h.url("/api/pets/9"));
        }
        other => panic!("unexpected outcome: {:?}", other.map(|j| j.0)),
    }
    Ok(())
}

#[test]
fn client_and_server_errors_are_typed() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/pets/404"))
            .respond_with(ResponseTemplate::new(404)),
    );
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/pets/503"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance")),
    );

    let c = client_for(
        Invoker::builder(h.uri()).interceptor(StatusInterceptor),
        ExecutorKind::Hyper,
    )?;

    let not_found = c.get_pet(404).expect_err("404 is an error");
    assert!(not_found.is_client_error());
    assert_eq!(not_found.status().map(|s| s.as_u16()), Some(404));

    let unavailable = c.get_pet(503).expect_err("503 is an error");
    assert!(matches!(unavailable, Error::Http { .. }));
    assert!(!unavailable.is_client_error());
    assert_eq!(
        unavailable.response().map(|r| r.text().ok()),
        Some(Some("maintenance".to_string()))
    );
    Ok(())
}

#[test]
fn downloads_use_the_server_file_name() -> anyhow::Result<()> {
    let h = Harness::start()?;
    let name = format!("report-{}.txt", uuid::Uuid::new_v4());
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/files/latest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "content-disposition",
                        format!("attachment; filename=\"{}\"", name).as_str(),
                    )
                    .set_body_raw("file body", "text/plain"),
            ),
    );

    let saved = client(&h, ExecutorKind::Reqwest)?.download("latest")?;
    assert_eq!(saved.file_name().and_then(|n| n.to_str()), Some(name.as_str()));
    assert_eq!(std::fs::read_to_string(&saved)?, "file body");
    std::fs::remove_file(&saved)?;
    Ok(())
}

#[rstest]
#[case(ExecutorKind::Hyper)]
#[case(ExecutorKind::Conn)]
#[case(ExecutorKind::Reqwest)]
fn multipart_upload(#[case] kind: ExecutorKind) -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("POST"))
            .and(path("/api/uploads"))
            .respond_with(ResponseTemplate::new(200).set_body_string("stored")),
    );

    let file = Part::new(
        "",
        http_interface::body::ReusableBody::from_bytes(
            Some("application/octet-stream".into()),
            "BINARY",
        ),
    )
    .with_filename("a.bin");
    assert_eq!(client(&h, kind)?.upload("holiday", file)?, "stored");

    let received = h.received();
    let ct = received[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let boundary = ct
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");
    let body = String::from_utf8(received[0].body.clone())?;
    assert!(body.starts_with(&format!("--{}\r\n", boundary)));
    assert!(body.contains("name=\"title\""));
    assert!(body.contains("holiday"));
    assert!(body.contains("name=\"file\"; filename=\"a.bin\""));
    assert!(body.contains("BINARY"));
    assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    Ok(())
}

#[test]
fn config_driven_invoker() -> anyhow::Result<()> {
    let h = Harness::start()?;
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/pets/5"))
            .respond_with(ResponseTemplate::new(500)),
    );
    let capture = std::env::temp_dir()
        .join(format!("http-interface_it_{}.jsonl", uuid::Uuid::new_v4()));
    let toml = format!(
        "[client]\nbase_url = \"{}\"\nexecutor = \"conn\"\ntranslate_status = true\n\n[capture]\npath = \"{}\"\n",
        h.uri(),
        capture.display()
    );
    let config = http_interface::config::Config::from_toml(&toml)?;
    let invoker = InvokerBuilder::from_config(&config)?.build()?;
    let c = PetStoreClient::new(Arc::new(invoker));

    let err = c.get_pet(5).expect_err("500 is translated");
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));

    let records = http_interface::capture::load_captures(&capture)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].executor, "conn");
    assert_eq!(records[0].status, Some(500));
    std::fs::remove_file(&capture)?;
    Ok(())
}
