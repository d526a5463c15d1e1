use arena_sim_server::app::AppState;
use arena_sim_server::config::Config;
use arena_sim_server::http::build_router;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

fn app_with(config: Config) -> Router {
    build_router(AppState::new(config))
}

fn app() -> Router {
    app_with(Config::default())
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = assert_ok!(app.clone().oneshot(request).await);
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn join(app: &Router, arena_id: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/arenas/join",
            json!({ "display_name": name, "arena_id": arena_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "join failed: {body}");
    body
}

async fn move_to(app: &Router, participant_id: &str, x: f32) {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/intents/move",
            json!({
                "participant_id": participant_id,
                "position": { "x": x, "y": 0.0, "z": 0.0 },
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
}

async fn fire(app: &Router, participant_id: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/intents/fire",
            json!({
                "participant_id": participant_id,
                "direction": { "x": 1.0, "y": 0.0, "z": 0.0 },
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn health_and_weapon_catalog() {
    let app = app();

    let (status, health) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_arenas"], 0);

    let (status, weapons) = send(&app, get("/weapons")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = weapons
        .as_array()
        .expect("catalog array")
        .iter()
        .filter_map(|w| w["id"].as_str())
        .collect();
    assert!(ids.contains(&"pistol"));
    assert!(ids.contains(&"sniper"));
}

#[tokio::test]
async fn second_join_activates_the_round() {
    let app = app();
    let first = join(&app, "lobby", "alpha").await;
    assert_eq!(first["faction"], "attackers");
    assert_eq!(first["arena_id"], "lobby");

    let (_, waiting) = send(&app, get("/arenas/lobby/snapshot")).await;
    assert_eq!(waiting["phase"], "waiting_for_players");

    let second = join(&app, "lobby", "bravo").await;
    assert_eq!(second["faction"], "defenders");

    let (status, snapshot) = send(&app, get("/arenas/lobby/snapshot")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["phase"], "round_active");
    assert_eq!(snapshot["match_phase"], "active");
    assert_eq!(snapshot["round"], 1);
    assert_eq!(snapshot["participants"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn pistol_duel_over_http() {
    let app = app();
    let a = join(&app, "duel", "alpha").await;
    let b = join(&app, "duel", "bravo").await;
    let a_id = a["participant_id"].as_str().expect("id").to_string();
    let b_id = b["participant_id"].as_str().expect("id").to_string();

    move_to(&app, &a_id, 0.0).await;
    move_to(&app, &b_id, 1.5).await;

    let first = fire(&app, &a_id).await;
    assert_eq!(first["accepted"], true);
    assert_eq!(first["fire"]["hit"], true);
    assert_eq!(first["fire"]["target_id"], b_id.as_str());
    assert_eq!(first["fire"]["ammo_remaining"], 11);

    let second = fire(&app, &a_id).await;
    assert_eq!(second["accepted"], false);
    assert_eq!(second["reason"], "rate_limited");

    let (_, snapshot) = send(&app, get("/arenas/duel/snapshot")).await;
    let target = snapshot["participants"]
        .as_array()
        .expect("participants")
        .iter()
        .find(|p| p["id"] == b_id.as_str())
        .expect("target present")
        .clone();
    let health = target["health"].as_f64().expect("health");
    assert!((60.0..=70.0).contains(&health), "health {health}");

    let kinds: Vec<&str> = snapshot["events"]
        .as_array()
        .expect("events")
        .iter()
        .filter_map(|e| e["event_type"].as_str())
        .collect();
    assert!(kinds.contains(&"hit"));
}

#[tokio::test]
async fn purchase_outcomes_report_loadout() {
    let app = app();
    let a = join(&app, "shop", "alpha").await;
    let a_id = a["participant_id"].as_str().expect("id");

    let (status, denied) = send(
        &app,
        json_request(
            Method::POST,
            "/intents/purchase",
            json!({ "participant_id": a_id, "weapon_id": "rifle" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(denied["reason"], "insufficient_funds");
    assert_eq!(denied["purchase"]["balance"], 800);
    assert_eq!(denied["purchase"]["weapon_id"], "pistol");

    let (_, unknown) = send(
        &app,
        json_request(
            Method::POST,
            "/intents/purchase",
            json!({ "participant_id": a_id, "weapon_id": "railgun" }),
        ),
    )
    .await;
    assert_eq!(unknown["reason"], "unknown_weapon");

    let (_, held) = send(
        &app,
        json_request(
            Method::POST,
            "/intents/purchase",
            json!({ "participant_id": a_id, "weapon_id": "pistol" }),
        ),
    )
    .await;
    assert_eq!(held["accepted"], false);
    assert_eq!(held["reason"], "already_equipped");
    assert_eq!(held["purchase"]["balance"], 800);
    assert_eq!(held["purchase"]["ammo"], 12);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = app();

    let (status, body) = send(&app, get("/arenas/missing/snapshot")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/intents/plant",
            json!({ "participant_id": uuid::Uuid::new_v4() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/arenas/missing")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn teardown_and_leave() {
    let app = app();
    let a = join(&app, "temp", "alpha").await;
    let a_id = a["participant_id"].as_str().expect("id").to_string();

    let (status, left) = send(
        &app,
        json_request(Method::POST, "/arenas/leave", json!({ "participant_id": a_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["left"], true);

    let (_, again) = send(
        &app,
        json_request(Method::POST, "/arenas/leave", json!({ "participant_id": a_id })),
    )
    .await;
    assert_eq!(again["left"], false);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/arenas/temp")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get("/arenas/temp/snapshot")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ended_arena_rejects_joins() {
    let app = app();
    let a = join(&app, "brief", "alpha").await;
    let b = join(&app, "brief", "bravo").await;
    for p in [&a, &b] {
        send(
            &app,
            json_request(
                Method::POST,
                "/arenas/leave",
                json!({ "participant_id": p["participant_id"] }),
            ),
        )
        .await;
    }

    let (_, snapshot) = send(&app, get("/arenas/brief/snapshot")).await;
    assert_eq!(snapshot["phase"], "match_ended");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/arenas/join",
            json!({ "display_name": "late", "arena_id": "brief" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn strict_mode_refuses_unknown_arena() {
    let app = app_with(Config {
        strict_arenas: true,
        ..Config::default()
    });

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/arenas/join",
            json!({ "display_name": "alpha", "arena_id": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, joined) = send(
        &app,
        json_request(Method::POST, "/arenas/join", json!({ "display_name": "alpha" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["arena_id"], "default");
}

#[tokio::test]
async fn intent_flood_is_throttled() {
    let app = app_with(Config {
        intent_rate_limit: 2,
        ..Config::default()
    });
    let a = join(&app, "flood", "alpha").await;
    let a_id = a["participant_id"].as_str().expect("id").to_string();

    move_to(&app, &a_id, 1.0).await;
    move_to(&app, &a_id, 2.0).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/intents/move",
            json!({
                "participant_id": a_id,
                "position": { "x": 3.0, "y": 0.0, "z": 0.0 },
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests");
}

#[tokio::test]
async fn arena_listing_summarizes() {
    let app = app();
    join(&app, "one", "alpha").await;
    join(&app, "two", "bravo").await;

    let (status, list) = send(&app, get("/arenas")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .expect("list")
        .iter()
        .filter_map(|s| s["arena_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["one", "two"]);
}

#[tokio::test]
async fn unknown_participants_leave_no_limiter_state() {
    let state = AppState::new(Config::default());
    let app = build_router(state.clone());

    for _ in 0..200 {
        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/intents/plant",
                json!({ "participant_id": uuid::Uuid::new_v4() }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    assert_eq!(state.intent_limiter.tracked(), 0);

    let a = join(&app, "limits", "alpha").await;
    move_to(&app, a["participant_id"].as_str().expect("id"), 1.0).await;
    assert_eq!(state.intent_limiter.tracked(), 1);
}
