mod common;

use axum::http::StatusCode;
use cavite_venture::{models::Role, repository::Repository};
use chrono::{Datelike, Utc};
use common::{TestApp, body_json, delete, get};
use serde_json::{Value, json};

async fn send_json(app: &TestApp, method: &str, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let response = app.send(common::json(method, uri, Some(token), body)).await;
    let status = response.status();
    (status, body_json(response).await)
}

fn event_body(title: &str, date: &str, popular: bool) -> Value {
    json!({
        "title": title,
        "location": "Kawit",
        "date": date,
        "imageUrl": "/uploads/images/banner.png",
        "description": "Flag raising at the Aguinaldo Shrine",
        "isPopular": popular
    })
}

#[tokio::test]
async fn admins_list_every_account() {
    let app = TestApp::new();
    let (_, admin_token) = app.account(Role::Admin).await;
    app.account(Role::User).await;
    app.account(Role::User).await;

    let response = app.send(get("/api/admin/users", Some(&admin_token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let users = body_json(response).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn role_changes_respect_the_superadmin_boundary() {
    let app = TestApp::new();
    let (user, _) = app.account(Role::User).await;
    let (boss, _) = app.account(Role::Superadmin).await;
    let (_, admin_token) = app.account(Role::Admin).await;
    let (_, super_token) = app.account(Role::Superadmin).await;

    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/admin/users/role",
        &admin_token,
        json!({ "userId": user.id, "role": "admin" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/users/role",
        &admin_token,
        json!({ "userId": user.id, "role": "superadmin" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/users/role",
        &admin_token,
        json!({ "userId": boss.id, "role": "user" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let boss_now = app.repo.get_account(boss.id).await.unwrap().unwrap();
    assert_eq!(boss_now.role, Role::Superadmin);

    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/admin/users/role",
        &super_token,
        json!({ "userId": user.id, "role": "superadmin" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "superadmin");

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/users/role",
        &super_token,
        json!({ "userId": uuid::Uuid::new_v4(), "role": "user" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/users/role",
        &super_token,
        json!({ "userId": user.id, "role": "emperor" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_deletion_rules() {
    let app = TestApp::new();
    let (admin, admin_token) = app.account(Role::Admin).await;
    let (user, _) = app.account(Role::User).await;
    let (boss, _) = app.account(Role::Superadmin).await;

    let response = app
        .send(delete(&format!("/api/admin/users/{}", admin.id), Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "You cannot delete your own account"
    );

    let response = app
        .send(delete(&format!("/api/admin/users/{}", boss.id), Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(delete(&format!("/api/admin/users/{}", user.id), Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "User deleted successfully");
    assert!(app.repo.get_account(user.id).await.unwrap().is_none());

    let response = app
        .send(delete(&format!("/api/admin/users/{}", user.id), Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(delete("/api/admin/users/abc", Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admins_can_create_admins() {
    let app = TestApp::new();
    let (_, admin_token) = app.account(Role::Admin).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/admin/admins",
        &admin_token,
        json!({ "email": "Curator@Museum.ph", "password": "baybayin-2024" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Admin created successfully");

    let created = app
        .repo
        .find_account_by_email("curator@museum.ph")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["userId"], created.id.to_string());
    assert_eq!(created.role, Role::Admin);
    assert!(created.is_verified);

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/admin/admins",
        &admin_token,
        json!({ "email": "curator@museum.ph", "password": "baybayin-2024" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Admin with this email already exists");

    let response = app
        .send(common::json(
            "POST",
            "/api/auth/signin",
            None,
            json!({ "email": "curator@museum.ph", "password": "baybayin-2024" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stats_bucket_accounts_by_age_and_gender() {
    let app = TestApp::new();
    let (admin, admin_token) = app.account(Role::Admin).await;

    // Test accounts are born in 1994 and registered as female.
    let this_year = Utc::now().year();
    let expected_bucket = match this_year - admin.birthday.year() {
        18..=25 => "18-25",
        26..=35 => "26-35",
        36..=45 => "36-45",
        46..=60 => "46-60",
        _ => "60+",
    };
    app.account(Role::User).await;

    let response = app.send(get("/api/admin/stats/age", Some(&admin_token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ageGroups"][expected_bucket], 2);

    let response = app
        .send(get("/api/admin/stats/gender", Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["female"], 2);
    assert_eq!(body["male"], 0);
}

#[tokio::test]
async fn events_lifecycle() {
    let app = TestApp::new();
    let (_, admin_token) = app.account(Role::Admin).await;

    let response = app.send(get("/api/events", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "No events found");

    let (status, older) = send_json(
        &app,
        "POST",
        "/api/admin/events",
        &admin_token,
        event_body("Independence Day", "2025-06-12", true),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, newer) = send_json(
        &app,
        "POST",
        "/api/admin/events",
        &admin_token,
        event_body("Regatta", "2025-09-01T08:00:00Z", false),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let response = app.send(get("/api/events", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let events = body_json(response).await;
    assert_eq!(events.as_array().unwrap().len(), 2);
    assert_eq!(events[0]["id"], newer["id"]);

    let response = app.send(get("/api/events?popular=true", None)).await;
    let popular = body_json(response).await;
    assert_eq!(popular.as_array().unwrap().len(), 1);
    assert_eq!(popular[0]["id"], older["id"]);

    let id = newer["id"].as_str().unwrap();
    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/api/admin/events/{id}"),
        &admin_token,
        json!({ "isPopular": true, "title": "Fluvial Parade" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Fluvial Parade");
    assert_eq!(updated["location"], "Kawit");
    assert_eq!(updated["isPopular"], true);

    let response = app
        .send(delete(&format!("/api/admin/events/{id}"), Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Event deleted successfully");

    let response = app
        .send(delete(&format!("/api/admin/events/{id}"), Some(&admin_token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Event not found");
}

#[tokio::test]
async fn event_input_is_validated_and_gated() {
    let app = TestApp::new();
    let (_, admin_token) = app.account(Role::Admin).await;
    let (_, user_token) = app.account(Role::User).await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/admin/events",
        &user_token,
        event_body("Sneaky", "2025-06-12", false),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.repo.list_events(false).await.unwrap().is_empty());

    let mut missing = event_body("No place", "2025-06-12", false);
    missing.as_object_mut().unwrap().remove("location");
    let (status, body) = send_json(&app, "POST", "/api/admin/events", &admin_token, missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "location is required");

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/admin/events",
        &admin_token,
        event_body("Bad date", "sometime soon", false),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/admin/events/{}", uuid::Uuid::new_v4()),
        &admin_token,
        json!({ "title": "Ghost" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_are_replaced_wholesale() {
    let app = TestApp::new();
    let (_, admin_token) = app.account(Role::Admin).await;

    let response = app.send(get("/api/about/categories", None)).await;
    assert_eq!(body_json(response).await["categories"], json!([]));

    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/admin/about/categories",
        &admin_token,
        json!({ "categories": [
            { "question": "Opening hours?", "answer": "8am to 5pm" },
            { "question": "Entrance fee?", "answer": "Free" }
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Categories saved successfully");
    assert_eq!(body["categories"].as_array().unwrap().len(), 2);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/about/categories",
        &admin_token,
        json!({ "categories": [
            { "question": "Parking?", "answer": "Yes" },
            { "question": "  ", "answer": "Blank question" }
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = app.send(get("/api/about/categories", None)).await;
    let body = body_json(response).await;
    assert!(body.get("message").is_none());
    let questions: Vec<_> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["question"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(questions, ["Opening hours?", "Entrance fee?"]);

    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/admin/about/categories",
        &admin_token,
        json!({ "categories": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!([]));
}

#[tokio::test]
async fn about_content_is_created_then_replaced() {
    let app = TestApp::new();
    let (_, admin_token) = app.account(Role::Admin).await;

    let response = app.send(get("/api/about", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "No about data found");

    let about = json!({
        "title": "Cavite Venture",
        "description": "Historic sites of the province",
        "images": [{ "url": "/uploads/images/shrine.png", "alt": "Aguinaldo Shrine" }]
    });
    let (status, body) = send_json(&app, "PUT", "/api/admin/about", &admin_token, about.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "About data updated successfully");

    let response = app.send(get("/api/about", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, about);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/about",
        &admin_token,
        json!({ "title": "", "description": "No title" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/admin/about",
        &admin_token,
        json!({ "title": "Cavite", "description": "Updated", "images": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response = app.send(get("/api/about", None)).await;
    let body = body_json(response).await;
    assert_eq!(body["description"], "Updated");
    assert_eq!(body["images"], json!([]));
}
