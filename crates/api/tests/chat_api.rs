mod common;

use axum::http::{Method, StatusCode};
use common::{call, register};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn messages_mark_the_room_unread_for_the_other_participant(pool: PgPool) {
    let state = common::test_state(pool);
    let (alice_id, alice) = register(common::app(state.clone()), "alice@altme.test").await;
    let (bob_id, bob) = register(common::app(state.clone()), "bob@altme.test").await;
    let mut events = state.event_bus.subscribe();

    let (status, json) = call(
        &state,
        Method::POST,
        "/api/v1/chat/rooms",
        &alice,
        Some(json!({ "other_user_id": bob_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["other_user_id"], bob_id);
    let room_id = json["data"]["id"].as_i64().unwrap();

    // Opening from the other side returns the same room.
    let (_, json) = call(
        &state,
        Method::POST,
        "/api/v1/chat/rooms",
        &bob,
        Some(json!({ "other_user_id": alice_id })),
    )
    .await;
    assert_eq!(json["data"]["id"], room_id);

    let messages = format!("/api/v1/chat/rooms/{room_id}/messages");
    let (status, json) = call(
        &state,
        Method::POST,
        &messages,
        &alice,
        Some(json!({ "body": "  Are you free on the 12th?  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["body"], "Are you free on the 12th?");
    assert_eq!(json["data"]["sender_id"], alice_id);

    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, "chat.message");
    assert_eq!(event.recipient_ids(), vec![bob_id]);
    assert_eq!(event.payload["preview"], "Are you free on the 12th?");

    let (_, json) = call(&state, Method::GET, "/api/v1/chat/rooms", &bob, None).await;
    let room = &json["data"][0];
    assert_eq!(room["id"], room_id);
    assert_eq!(room["unread"], true);
    assert_eq!(room["last_message"], "Are you free on the 12th?");
    assert_eq!(room["last_sender_id"], alice_id);

    // The sender's own view is not unread.
    let (_, json) = call(&state, Method::GET, "/api/v1/chat/rooms", &alice, None).await;
    assert_eq!(json["data"][0]["unread"], false);

    let read = format!("/api/v1/chat/rooms/{room_id}/read");
    let (status, _) = call(&state, Method::POST, &read, &bob, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = call(&state, Method::GET, "/api/v1/chat/rooms", &bob, None).await;
    assert_eq!(json["data"][0]["unread"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn messages_page_backwards(pool: PgPool) {
    let state = common::test_state(pool);
    let (_, alice) = register(common::app(state.clone()), "alice@altme.test").await;
    let (bob_id, _) = register(common::app(state.clone()), "bob@altme.test").await;

    let (_, json) = call(
        &state,
        Method::POST,
        "/api/v1/chat/rooms",
        &alice,
        Some(json!({ "other_user_id": bob_id })),
    )
    .await;
    let messages = format!("/api/v1/chat/rooms/{}/messages", json["data"]["id"]);
    for n in 1..=3 {
        let body = Some(json!({ "body": format!("message {n}") }));
        let (status, _) = call(&state, Method::POST, &messages, &alice, body).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, json) = call(&state, Method::GET, &format!("{messages}?limit=2"), &alice, None).await;
    let page = json["data"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["body"], "message 3");
    assert_eq!(page[1]["body"], "message 2");

    let before = page[1]["id"].as_i64().unwrap();
    let uri = format!("{messages}?before={before}");
    let (_, json) = call(&state, Method::GET, &uri, &alice, None).await;
    let page = json["data"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["body"], "message 1");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn outsiders_and_empty_messages_are_refused(pool: PgPool) {
    let state = common::test_state(pool);
    let (alice_id, alice) = register(common::app(state.clone()), "alice@altme.test").await;
    let (bob_id, _) = register(common::app(state.clone()), "bob@altme.test").await;
    let (_, mallory) = register(common::app(state.clone()), "mallory@altme.test").await;

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/v1/chat/rooms",
        &alice,
        Some(json!({ "other_user_id": alice_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/v1/chat/rooms",
        &alice,
        Some(json!({ "other_user_id": 999_999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = call(
        &state,
        Method::POST,
        "/api/v1/chat/rooms",
        &alice,
        Some(json!({ "other_user_id": bob_id })),
    )
    .await;
    let room_id = json["data"]["id"].as_i64().unwrap();
    let messages = format!("/api/v1/chat/rooms/{room_id}/messages");

    let blank = Some(json!({ "body": "   " }));
    let (status, _) = call(&state, Method::POST, &messages, &alice, blank).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let hello = Some(json!({ "body": "hello" }));
    let (status, _) = call(&state, Method::POST, &messages, &mallory, hello).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&state, Method::GET, &messages, &mallory, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let read = format!("/api/v1/chat/rooms/{room_id}/read");
    let (status, _) = call(&state, Method::POST, &read, &mallory, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
