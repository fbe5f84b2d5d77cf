mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

fn create_body() -> Value {
    json!({
        "about": "Learning Rust",
        "email": "dev@example.com",
        "password": "hunter22",
        "fav_language": { "id": 3, "name": "Rust" },
        "first_learn_date": "2019-06-15",
        "location": "Lisbon",
        "learn_new_interest": true,
        "interest_in_topics": [{ "id": 3 }, { "id": 1, "name": "Web Apps" }]
    })
}

#[tokio::test]
async fn create_then_fetch_round_trips() {
    let app = common::app();
    let res = common::json(&app, "POST", "/api/member", &create_body()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.location.as_deref(), Some("/api/member/1"));
    let created = res.json()["member"].clone();

    let fetched = common::get(&app, "/api/member/1").await.json()["member"].clone();
    assert_eq!(created, fetched);
    assert_eq!(
        fetched,
        json!({
            "id": 1,
            "email": "dev@example.com",
            "location": "Lisbon",
            "first_learn_date": "2019-06-15",
            "fav_language": { "id": 3, "name": "Rust" },
            "about": "Learning Rust",
            "learn_new_interest": true,
            "interest_in_topics": [
                { "id": 3, "name": "APIs" },
                { "id": 1, "name": "Web Apps" }
            ]
        })
    );
}

#[tokio::test]
async fn serialized_member_has_no_password_material() {
    let app = common::app();
    let res = common::json(&app, "POST", "/api/member", &create_body()).await;
    assert!(!res.body.contains("hunter22"));
    assert!(!res.body.contains("password"));
    assert!(!res.body.contains("argon2"));
}

#[tokio::test]
async fn list_wraps_members() {
    let app = common::app();
    common::json(&app, "POST", "/api/member", &create_body()).await;
    common::json(&app, "POST", "/api/member", &create_body()).await;

    let list = common::get(&app, "/api/member").await.json();
    let members = list["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["id"], 2);
}

#[tokio::test]
async fn missing_member_is_a_json_404() {
    let app = common::app();
    let res = common::get(&app, "/api/member/9").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["error"], "member 9 not found");
}

#[tokio::test]
async fn put_and_patch_edit_in_place() {
    let app = common::app();
    common::json(&app, "POST", "/api/member", &create_body()).await;

    let mut edit = create_body();
    edit.as_object_mut().unwrap().remove("password");
    edit["location"] = json!("Porto");
    edit["interest_in_topics"] = json!([{ "id": 5 }]);

    for method in ["PUT", "PATCH"] {
        let res = common::json(&app, method, "/api/member/1", &edit).await;
        assert_eq!(res.status, StatusCode::OK, "{method}");
        let m = res.json()["member"].clone();
        assert_eq!(m["id"], 1);
        assert_eq!(m["location"], "Porto");
        assert_eq!(m["interest_in_topics"], json!([{ "id": 5, "name": "DevOps" }]));
    }
}

#[tokio::test]
async fn edit_skips_emptiness_checks_but_requires_fields() {
    let app = common::app();
    common::json(&app, "POST", "/api/member", &create_body()).await;

    let mut blank = create_body();
    blank["about"] = json!("");
    let res = common::json(&app, "PUT", "/api/member/1", &blank).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["member"]["about"], "");

    let mut missing = create_body();
    missing.as_object_mut().unwrap().remove("email");
    let res = common::json(&app, "PUT", "/api/member/1", &missing).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"], "missing field: email");
}

#[tokio::test]
async fn malformed_date_and_unknown_language_are_rejected() {
    let app = common::app();
    let mut bad_date = create_body();
    bad_date["first_learn_date"] = json!("June 2019");
    let res = common::json(&app, "POST", "/api/member", &bad_date).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let mut bad_lang = create_body();
    bad_lang["fav_language"] = json!({ "id": 404 });
    let res = common::json(&app, "POST", "/api/member", &bad_lang).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let list = common::get(&app, "/api/member").await.json();
    assert!(list["members"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn topic_reverse_traversal_and_delete() {
    let app = common::app();
    common::json(&app, "POST", "/api/member", &create_body()).await;

    let by_topic = common::get(&app, "/api/topic/3/members").await.json();
    assert_eq!(by_topic["members"][0]["email"], "dev@example.com");

    assert_eq!(common::delete(&app, "/api/member/1").await.status, StatusCode::NO_CONTENT);
    assert_eq!(common::delete(&app, "/api/member/1").await.status, StatusCode::NOT_FOUND);

    let by_topic = common::get(&app, "/api/topic/3/members").await.json();
    assert!(by_topic["members"].as_array().unwrap().is_empty());
    assert_eq!(common::get(&app, "/api/topic/99/members").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reference_data_endpoints() {
    let app = common::app();
    let langs = common::get(&app, "/api/language").await.json();
    assert_eq!(langs["languages"][0], json!({ "id": 1, "name": "Python" }));
    let topics = common::get(&app, "/api/topic").await.json();
    assert_eq!(topics["topics"].as_array().unwrap().len(), 6);
    assert_eq!(common::get(&app, "/health").await.body, "ok");
}
