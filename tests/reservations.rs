mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{send, TestApp};

/// Staff token and a performance in a hall of the given size.
async fn performance(app: &TestApp, rows: i32, seats_in_row: i32) -> (String, i64) {
    let staff = app.user("staff@theatre.test", true).await;
    let hall = app
        .create(
            "/api/theatre-halls",
            &staff,
            json!({ "name": "Main", "rows": rows, "seats_in_row": seats_in_row }),
        )
        .await;
    let play = app.create("/api/plays", &staff, json!({ "title": "Hamlet" })).await;
    let performance = app
        .create(
            "/api/performances",
            &staff,
            json!({ "play": play, "theatre_hall": hall, "show_time": "2024-10-15 18:00" }),
        )
        .await;
    (staff, performance)
}

fn booking(tickets: &[(i64, i32, i32)]) -> Value {
    json!({
        "tickets": tickets
            .iter()
            .map(|(performance, row, seat)| json!({ "performance": performance, "row": row, "seat": seat }))
            .collect::<Vec<_>>()
    })
}

async fn reservation_count(app: &TestApp, token: &str) -> i64 {
    let (_, value) = app.get("/api/reservations", token).await;
    value["count"].as_i64().unwrap()
}

async fn tickets_available(app: &TestApp, token: &str, performance: i64) -> i64 {
    let (_, value) = app.get(&format!("/api/performances/{performance}"), token).await;
    let hall = &value["theatre_hall"];
    hall["capacity"].as_i64().unwrap() - value["taken_places"].as_array().unwrap().len() as i64
}

#[tokio::test]
async fn seat_can_only_be_booked_once() {
    let app = TestApp::new();
    let (_, performance) = performance(&app, 10, 10).await;
    let alice = app.user("alice@theatre.test", false).await;
    let bob = app.user("bob@theatre.test", false).await;

    let (status, value) = app
        .post("/api/reservations", &alice, booking(&[(performance, 3, 4)]))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{value}");
    assert_eq!(value["tickets"][0]["performance"], performance);
    assert_eq!(value["tickets"][0]["row"], 3);

    let (status, value) = app
        .post("/api/reservations", &bob, booking(&[(performance, 3, 4)]))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(value["code"], "SEAT_TAKEN");
    assert_eq!(reservation_count(&app, &bob).await, 0);
}

#[tokio::test]
async fn out_of_bounds_seat_persists_nothing() {
    let app = TestApp::new();
    let (staff, performance) = performance(&app, 5, 5).await;
    let alice = app.user("alice@theatre.test", false).await;

    for (row, seat) in [(0, 1), (1, 0), (6, 1), (1, 6), (-1, -1)] {
        let (status, value) = app
            .post("/api/reservations", &alice, booking(&[(performance, row, seat)]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "row {row} seat {seat}");
        assert_eq!(value["code"], "OUT_OF_BOUNDS");
    }

    assert_eq!(reservation_count(&app, &alice).await, 0);
    assert_eq!(tickets_available(&app, &staff, performance).await, 25);
}

#[tokio::test]
async fn one_invalid_ticket_rejects_the_whole_reservation() {
    let app = TestApp::new();
    let (staff, performance) = performance(&app, 5, 5).await;
    let alice = app.user("alice@theatre.test", false).await;

    let (status, value) = app
        .post(
            "/api/reservations",
            &alice,
            booking(&[(performance, 1, 1), (performance, 1, 2), (performance, 9, 9)]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "OUT_OF_BOUNDS");

    let (status, value) = app
        .post(
            "/api/reservations",
            &alice,
            booking(&[(performance, 2, 1), (4242, 1, 1)]),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["code"], "NOT_FOUND");

    assert_eq!(reservation_count(&app, &alice).await, 0);
    assert_eq!(tickets_available(&app, &staff, performance).await, 25);
}

#[tokio::test]
async fn empty_ticket_list_is_a_validation_error() {
    let app = TestApp::new();
    let alice = app.user("alice@theatre.test", false).await;

    let (status, value) = app
        .post("/api/reservations", &alice, json!({ "tickets": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn reservations_are_private_to_their_owner() {
    let app = TestApp::new();
    let (_, performance) = performance(&app, 5, 5).await;
    let alice = app.user("alice@theatre.test", false).await;
    let bob = app.user("bob@theatre.test", false).await;

    let (_, value) = app
        .post("/api/reservations", &alice, booking(&[(performance, 1, 1)]))
        .await;
    let id = value["id"].as_i64().unwrap();

    assert_eq!(reservation_count(&app, &alice).await, 1);
    assert_eq!(reservation_count(&app, &bob).await, 0);

    let (status, _) = app.get(&format!("/api/reservations/{id}"), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/reservations/{id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, value) = app.get(&format!("/api/reservations/{id}"), &alice).await;
    assert_eq!(status, StatusCode::OK);
    let performance_view = &value["tickets"][0]["performance"];
    assert_eq!(performance_view["play"]["title"], "Hamlet");
    assert_eq!(performance_view["theatre_hall"]["name"], "Main");

    let (_, value) = app.get("/api/reservations", &alice).await;
    assert_eq!(value["results"][0]["tickets"][0]["performance"]["play_title"], "Hamlet");
}

#[tokio::test]
async fn cancelling_a_reservation_frees_its_seats() {
    let app = TestApp::new();
    let (_, performance) = performance(&app, 5, 5).await;
    let alice = app.user("alice@theatre.test", false).await;
    let bob = app.user("bob@theatre.test", false).await;

    let (_, value) = app
        .post("/api/reservations", &alice, booking(&[(performance, 1, 1)]))
        .await;
    let id = value["id"].as_i64().unwrap();

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/reservations/{id}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post("/api/reservations", &bob, booking(&[(performance, 1, 1)]))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_on_one_seat_admit_exactly_one() {
    let app = TestApp::new();
    let (staff, performance) = performance(&app, 20, 20).await;
    let alice = app.user("alice@theatre.test", false).await;
    let bob = app.user("bob@theatre.test", false).await;

    let handles: Vec<_> = [alice, bob]
        .into_iter()
        .map(|token| {
            let router = app.router.clone();
            tokio::spawn(async move {
                send(
                    &router,
                    Method::POST,
                    "/api/reservations",
                    Some(&token),
                    Some(booking(&[(performance, 1, 1)])),
                )
                .await
            })
        })
        .collect();

    let mut statuses: Vec<StatusCode> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().0)
        .collect();
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let (_, value) = app.get(&format!("/api/performances/{performance}"), &staff).await;
    assert_eq!(value["taken_places"], json!([{ "row": 1, "seat": 1 }]));
}
