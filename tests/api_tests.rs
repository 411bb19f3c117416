// tests/api_tests.rs

mod common;

use std::sync::Arc;

use common::*;
use quiz_session_engine::{
    SessionPolicy, SessionService,
    config::Config,
    repository::MemoryStore,
    routes,
    state::AppState,
    utils::{clock::Clock, jwt::sign_jwt},
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    clock: Clock,
}

/// Helper function to spawn the app on a random port for testing.
/// The engine runs on the in-memory store, so no database is needed.
async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        passing_score: 60.0,
        sweep_interval_secs: 60,
        leaderboard_default_limit: 10,
        leaderboard_max_limit: 100,
    };

    let clock = Clock::manual(t0());
    let sessions = SessionService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(catalog()),
        clock.clone(),
        SessionPolicy::from(&config),
    );
    let app = routes::create_router(AppState { sessions, config });

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        clock,
    }
}

fn token(user_id: i64, role: &str) -> String {
    sign_jwt(user_id, role, SECRET, 600).expect("Failed to sign token")
}

async fn start(app: &TestApp, client: &reqwest::Client, user_id: i64) -> i64 {
    let response = client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, QUIZ))
        .bearer_auth(token(user_id, "user"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn session_routes_require_a_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, QUIZ))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!("{}/api/sessions", app.address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn full_attempt_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = token(ALICE, "user");

    let id = start(&app, &client, ALICE).await;

    // Current question hides the answer key.
    let current: Value = client
        .get(format!("{}/api/sessions/{}/questions/current", app.address, id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["question"]["id"], Q_SINGLE);
    assert_eq!(current["question"]["type"], "single_choice");
    assert!(current["question"]["options"][0].get("is_correct").is_none());

    let feedback: Value = client
        .post(format!("{}/api/sessions/{}/answers", app.address, id))
        .bearer_auth(&alice)
        .json(&json!({ "question_id": Q_SINGLE, "selected_answer_id": 11, "time_spent_seconds": 20 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["is_correct"], true);
    assert_eq!(feedback["feedback"], "Correct!");
    assert_eq!(feedback["remaining_seconds"], 600);

    let next = client
        .post(format!("{}/api/sessions/{}/questions/next", app.address, id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(next.status().as_u16(), 200);

    app.clock.advance(chrono::Duration::seconds(45));
    let submitted: Value = client
        .post(format!("{}/api/sessions/{}/submit", app.address, id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submitted["status"], "SUBMITTED");
    assert_eq!(submitted["score"], 25.0);
    assert_eq!(submitted["is_passed"], false);
    assert_eq!(submitted["time_spent_seconds"], 45);

    let result: Value = client
        .get(format!("{}/api/sessions/{}/result", app.address, id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["questions"].as_array().unwrap().len(), 4);
    assert_eq!(result["statistics"]["rank"], 1);

    // The leaderboard is public.
    let board: Value = client
        .get(format!("{}/api/quizzes/{}/leaderboard?limit=5", app.address, QUIZ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board["entries"][0]["username"], "alice");
    assert_eq!(board["entries"][0]["rank"], 1);
}

#[tokio::test]
async fn engine_errors_map_to_status_codes() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let id = start(&app, &client, ALICE).await;

    // Duplicate active session.
    let response = client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, QUIZ))
        .bearer_auth(token(ALICE, "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "conflict");

    // Someone else's session.
    let response = client
        .get(format!("{}/api/sessions/{}", app.address, id))
        .bearer_auth(token(BOB, "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Unknown quiz.
    let response = client
        .post(format!("{}/api/quizzes/999/sessions", app.address))
        .bearer_auth(token(BOB, "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Out-of-range question index.
    let response = client
        .get(format!("{}/api/sessions/{}/questions/9", app.address, id))
        .bearer_auth(token(ALICE, "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_input");

    // Past the deadline.
    app.clock.advance(chrono::Duration::minutes(11));
    let response = client
        .post(format!("{}/api/sessions/{}/answers", app.address, id))
        .bearer_auth(token(ALICE, "user"))
        .json(&json!({ "question_id": Q_SINGLE, "selected_answer_id": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "expired");
}

#[tokio::test]
async fn admin_routes_are_guarded() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/admin/sessions/sweep", app.address))
        .bearer_auth(token(ALICE, "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let id = start(&app, &client, ALICE).await;
    app.clock.advance(chrono::Duration::minutes(20));

    let report: Value = client
        .post(format!("{}/api/admin/sessions/sweep", app.address))
        .bearer_auth(token(99, "admin"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["timed_out"], 1);
    assert_eq!(report["failed"], 0);

    let session: Value = client
        .get(format!("{}/api/sessions/{}", app.address, id))
        .bearer_auth(token(ALICE, "user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["status"], "TIMED_OUT");
    assert_eq!(session["remaining_seconds"], 0);
}

#[tokio::test]
async fn review_over_http_grades_free_text() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = token(ALICE, "user");
    let id = start(&app, &client, ALICE).await;

    client
        .post(format!("{}/api/sessions/{}/answers", app.address, id))
        .bearer_auth(&alice)
        .json(&json!({ "question_id": Q_TEXT, "text_response": "Photosynthesis" }))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/sessions/{}/submit", app.address, id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();

    let graded: Value = client
        .post(format!(
            "{}/api/admin/sessions/{}/answers/{}/review",
            app.address, id, Q_TEXT
        ))
        .bearer_auth(token(99, "admin"))
        .json(&json!({ "is_correct": true, "feedback": "Well put" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graded["status"], "GRADED");
    assert_eq!(graded["correct_answers"], 1);
    assert_eq!(graded["score"], 25.0);
}
