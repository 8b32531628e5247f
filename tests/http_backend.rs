// HttpBackend against an in-process hyper server on an ephemeral port.

use std::convert::Infallible;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::Value;

use halftype::backend::{Backend, BackendError, HttpBackend};
use halftype::identity::{Identity, RegisteredUser};
use halftype::metrics::MetricsLog;
use halftype::record::{HalfStats, MetricsSubmission, TestRecord};
use halftype::settings::Settings;

type Seen = Arc<Mutex<Vec<(Method, String, Value)>>>;

async fn route(req: Request<Body>, seen: Seen) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    seen.lock().unwrap().push((method.clone(), path.clone(), body));

    let (status, payload) = match (method, path.as_str()) {
        (Method::GET, "/api/settings") => (StatusCode::OK, r#"{"halfTime":90,"breakTime":0}"#),
        (Method::POST, "/api/settings") => (StatusCode::OK, "{}"),
        (Method::GET, "/api/texts/random") => (StatusCode::OK, r#"{"content":"hello world"}"#),
        (Method::POST, "/api/users") => (StatusCode::CREATED, r#"{"_id":"u-77"}"#),
        (Method::POST, "/api/metrics") => (StatusCode::CREATED, ""),
        (Method::POST, "/api/tests") => (StatusCode::CREATED, r#"{"_id":"t-1"}"#),
        (_, p) if p.starts_with("/slow/") => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, "{}")
        }
        _ => (StatusCode::NOT_FOUND, ""),
    };
    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = status;
    Ok(response)
}

/// Start a server in a background thread and return its base url
fn serve() -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    let seen: Seen = Arc::default();

    let shared = seen.clone();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let make = make_service_fn(move |_| {
                let seen = shared.clone();
                async move { Ok::<_, Infallible>(service_fn(move |req| route(req, seen.clone()))) }
            });
            Server::from_tcp(listener).unwrap().serve(make).await.unwrap();
        });
    });
    (base, seen)
}

fn record(user: &RegisteredUser) -> TestRecord {
    TestRecord::new(
        &Identity::new("Ada", "Architecture", "1804001"),
        user,
        Settings::new(90, 30).unwrap(),
        HalfStats {
            characters_typed: 40,
            mistakes: 2,
            time_spent: 90,
        },
        None,
        true,
    )
}

#[test]
fn full_round_trip_hits_every_endpoint() {
    let (base, seen) = serve();
    let backend = HttpBackend::new(&base).unwrap();

    // zero break time falls back to the default
    assert_eq!(backend.fetch_settings().unwrap(), Settings::new(90, 30).unwrap());
    assert_eq!(backend.fetch_random_text().unwrap(), "hello world");

    let user = backend
        .register_user(&Identity::new("Ada", "Architecture", "1804001"))
        .unwrap();
    assert_eq!(user.id, "u-77");

    backend
        .submit_metrics(&MetricsSubmission {
            user_id: user.id.clone(),
            first_half: MetricsLog::default(),
            second_half: None,
            half_time: 90,
            break_time: 30,
        })
        .unwrap();
    let persisted = backend.submit_test(&record(&user)).unwrap();
    assert_eq!(persisted.id.as_deref(), Some("t-1"));
    backend.save_settings(&Settings::new(60, 10).unwrap()).unwrap();

    let seen = seen.lock().unwrap();
    let paths: Vec<_> = seen
        .iter()
        .map(|(m, p, _)| format!("{m} {p}"))
        .collect();
    assert_eq!(
        paths,
        vec![
            "GET /api/settings",
            "GET /api/texts/random",
            "POST /api/users",
            "POST /api/metrics",
            "POST /api/tests",
            "POST /api/settings",
        ]
    );

    assert_eq!(seen[2].2["registrationNumber"], "1804001");
    assert!(seen[3].2.get("secondHalf").is_none());
    assert_eq!(seen[4].2["userId"], "u-77");
    assert_eq!(seen[4].2["firstHalf"]["charactersTyped"], 40);
    assert_eq!(seen[4].2["endedEarly"], true);
    assert_eq!(seen[5].2, serde_json::json!({"halfTime": 60, "breakTime": 10}));
}

#[test]
fn non_success_status_is_reported() {
    let (base, _) = serve();
    let backend = HttpBackend::new(&format!("{base}/missing")).unwrap();
    match backend.fetch_settings() {
        Err(BackendError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn slow_backend_times_out() {
    let (base, _) = serve();
    let root = base.trim_end_matches("/api");
    let backend =
        HttpBackend::with_timeout(&format!("{root}/slow"), Duration::from_millis(100)).unwrap();
    match backend.fetch_settings() {
        Err(BackendError::Timeout { path, .. }) => assert_eq!(path, "/settings"),
        other => panic!("expected timeout, got {other:?}"),
    }
}
