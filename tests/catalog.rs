mod common;

use axum::http::{Method, StatusCode};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn genre_writes_require_authentication_and_staff() {
    let app = TestApp::new();
    let viewer = app.user("viewer@theatre.test", false).await;
    let staff = app.user("staff@theatre.test", true).await;
    let body = json!({ "name": "Comedy" });

    let (status, value) = app
        .send(Method::POST, "/api/genres", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["code"], "AUTHENTICATION_REQUIRED");

    let (status, value) = app.post("/api/genres", &viewer, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["code"], "PERMISSION_DENIED");

    let (status, value) = app.post("/api/genres", &staff, body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["name"], "Comedy");

    let (status, value) = app.get("/api/genres", &viewer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["count"], 1);
}

#[tokio::test]
async fn duplicate_genre_name_is_a_validation_error() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;
    app.create("/api/genres", &staff, json!({ "name": "Drama" })).await;

    let (status, value) = app.post("/api/genres", &staff, json!({ "name": "Drama" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn genre_update_patch_and_delete() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;
    let id = app.create("/api/genres", &staff, json!({ "name": "Farce" })).await;

    let (status, value) = app
        .send(
            Method::PATCH,
            &format!("/api/genres/{id}"),
            Some(&staff),
            Some(json!({ "name": "Satire" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["name"], "Satire");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/genres/{id}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, value) = app.get(&format!("/api/genres/{id}"), &staff).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["code"], "NOT_FOUND");
}

#[tokio::test]
async fn hall_dimensions_must_be_positive() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;

    let (status, _) = app
        .post(
            "/api/theatre-halls",
            &staff,
            json!({ "name": "Broken", "rows": 0, "seats_in_row": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, value) = app
        .post(
            "/api/theatre-halls",
            &staff,
            json!({ "name": "Main", "rows": 12, "seats_in_row": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["capacity"], 240);
}

#[tokio::test]
async fn play_filters_combine_with_and() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;

    let drama = app.create("/api/genres", &staff, json!({ "name": "Drama" })).await;
    let comedy = app.create("/api/genres", &staff, json!({ "name": "Comedy" })).await;
    let mut actors = Vec::new();
    for _ in 0..2 {
        let first: String = FirstName().fake();
        let last: String = LastName().fake();
        actors.push(
            app.create(
                "/api/actors",
                &staff,
                json!({ "first_name": first, "last_name": last }),
            )
            .await,
        );
    }

    let description: String = Sentence(3..8).fake();
    let both = app
        .create(
            "/api/plays",
            &staff,
            json!({
                "title": "Both",
                "description": description,
                "genres": [drama, comedy],
                "actors": [actors[0]],
            }),
        )
        .await;
    app.create(
        "/api/plays",
        &staff,
        json!({ "title": "Drama only", "genres": [drama], "actors": [actors[1]] }),
    )
    .await;
    app.create(
        "/api/plays",
        &staff,
        json!({ "title": "Comedy only", "genres": [comedy], "actors": [actors[0]] }),
    )
    .await;

    let (status, value) = app
        .get(
            &format!("/api/plays?genres={drama}&actors={}", actors[0]),
            &staff,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["count"], 1);
    assert_eq!(value["results"][0]["id"], both);
    assert_eq!(value["results"][0]["genres"], json!(["Drama", "Comedy"]));

    let (_, value) = app
        .get(&format!("/api/plays?genres={drama},{comedy}"), &staff)
        .await;
    assert_eq!(value["count"], 3);

    let (status, value) = app.get("/api/plays?actors=abc", &staff).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn play_with_unknown_genre_is_rejected() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;

    let (status, value) = app
        .post("/api/plays", &staff, json!({ "title": "Ghost", "genres": [999] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn performances_filter_by_title_and_date() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;
    let hall = app
        .create(
            "/api/theatre-halls",
            &staff,
            json!({ "name": "Main", "rows": 2, "seats_in_row": 3 }),
        )
        .await;
    let hamlet = app.create("/api/plays", &staff, json!({ "title": "Hamlet" })).await;
    let lear = app.create("/api/plays", &staff, json!({ "title": "King Lear" })).await;

    let first = app
        .create(
            "/api/performances",
            &staff,
            json!({ "play": hamlet, "theatre_hall": hall, "show_time": "2024-10-15 18:00" }),
        )
        .await;
    app.create(
        "/api/performances",
        &staff,
        json!({ "play": hamlet, "theatre_hall": hall, "show_time": "2024-10-16T18:00:00" }),
    )
    .await;
    app.create(
        "/api/performances",
        &staff,
        json!({ "play": lear, "theatre_hall": hall, "show_time": "2024-10-15 20:00" }),
    )
    .await;

    let (_, value) = app.get("/api/performances?play=HAM", &staff).await;
    assert_eq!(value["count"], 2);

    let (_, value) = app
        .get("/api/performances?play=ham&date=2024-10-15", &staff)
        .await;
    assert_eq!(value["count"], 1);
    let row = &value["results"][0];
    assert_eq!(row["id"], first);
    assert_eq!(row["play_title"], "Hamlet");
    assert_eq!(row["theatre_hall_name"], "Main");
    assert_eq!(row["tickets_available"], 6);

    let (status, _) = app.get("/api/performances?date=15-10-2024", &staff).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn performance_detail_lists_taken_places() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;
    let hall = app
        .create(
            "/api/theatre-halls",
            &staff,
            json!({ "name": "Studio", "rows": 3, "seats_in_row": 3 }),
        )
        .await;
    let play = app.create("/api/plays", &staff, json!({ "title": "Medea" })).await;
    let performance = app
        .create(
            "/api/performances",
            &staff,
            json!({ "play": play, "theatre_hall": hall, "show_time": "2024-11-01 19:30" }),
        )
        .await;
    app.create(
        "/api/reservations",
        &staff,
        json!({ "tickets": [
            { "performance": performance, "row": 2, "seat": 1 },
            { "performance": performance, "row": 1, "seat": 3 },
        ] }),
    )
    .await;

    let (status, value) = app
        .get(&format!("/api/performances/{performance}"), &staff)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["play"]["title"], "Medea");
    assert_eq!(value["theatre_hall"]["capacity"], 9);
    assert_eq!(
        value["taken_places"],
        json!([{ "row": 1, "seat": 3 }, { "row": 2, "seat": 1 }])
    );

    let (_, value) = app.get("/api/performances", &staff).await;
    assert_eq!(value["results"][0]["tickets_available"], 7);
}

#[tokio::test]
async fn deleting_a_hall_cascades_to_performances() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;
    let hall = app
        .create(
            "/api/theatre-halls",
            &staff,
            json!({ "name": "Annex", "rows": 1, "seats_in_row": 1 }),
        )
        .await;
    let play = app.create("/api/plays", &staff, json!({ "title": "Faust" })).await;
    let performance = app
        .create(
            "/api/performances",
            &staff,
            json!({ "play": play, "theatre_hall": hall, "show_time": "2024-12-01 19:00" }),
        )
        .await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/theatre-halls/{hall}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .get(&format!("/api/performances/{performance}"), &staff)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn page_size_is_clamped_and_links_pages() {
    let app = TestApp::new();
    let staff = app.user("staff@theatre.test", true).await;
    for i in 0..3 {
        app.create("/api/genres", &staff, json!({ "name": format!("Genre {i}") }))
            .await;
    }

    let (_, value) = app.get("/api/genres?page=1&pageSize=2", &staff).await;
    assert_eq!(value["count"], 3);
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
    assert_eq!(value["next"], 2);
    assert_eq!(value["previous"], json!(null));

    let (_, value) = app.get("/api/genres?page=2&page_size=2", &staff).await;
    assert_eq!(value["results"].as_array().unwrap().len(), 1);
    assert_eq!(value["next"], json!(null));
    assert_eq!(value["previous"], 1);
}
