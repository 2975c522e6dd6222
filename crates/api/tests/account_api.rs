mod common;

use axum::http::{Method, StatusCode};
use common::{call, register};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn favorites_are_idempotent_and_filterable(pool: PgPool) {
    let state = common::test_state(pool);
    let (_, client) = register(common::app(state.clone()), "client@altme.test").await;
    let (photographer_id, _) = register(common::app(state.clone()), "photo@altme.test").await;

    let favorites = "/api/v1/me/favorites";
    let target = Some(json!({ "target_kind": "photographer", "target_id": photographer_id }));
    let (status, first) = call(&state, Method::POST, favorites, &client, target.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, second) = call(&state, Method::POST, favorites, &client, target).await;
    assert_eq!(first["data"]["id"], second["data"]["id"]);

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/v1/me/favorites",
        &client,
        Some(json!({ "target_kind": "project_request", "target_id": 424_242 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/v1/me/favorites",
        &client,
        Some(json!({ "target_kind": "venue", "target_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = "/api/v1/me/favorites?kind=photographer";
    let (_, json) = call(&state, Method::GET, uri, &client, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["target_id"], photographer_id);

    let uri = format!("/api/v1/me/favorites/photographer/{photographer_id}");
    let (status, _) = call(&state, Method::DELETE, &uri, &client, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&state, Method::DELETE, &uri, &client, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn hard_delete_waits_for_the_balance_to_clear(pool: PgPool) {
    let state = common::test_state(pool);
    let (_, admin) = common::admin(&state).await;
    let (user_id, _) = register(common::app(state.clone()), "photo@altme.test").await;
    let (_, fan) = register(common::app(state.clone()), "fan@altme.test").await;

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/v1/me/favorites",
        &fan,
        Some(json!({ "target_kind": "photographer", "target_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let adjustments = format!("/api/v1/admin/users/{user_id}/adjustments");
    let credit = Some(json!({ "amount": 700, "idempotency_key": "promo-1" }));
    let (status, json) = call(&state, Method::POST, &adjustments, &admin, credit.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["balance"], 700);

    // Replaying the same key is refused.
    let (status, _) = call(&state, Method::POST, &adjustments, &admin, credit).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let user_uri = format!("/api/v1/admin/users/{user_id}");
    let (status, _) = call(&state, Method::DELETE, &user_uri, &admin, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let debit = Some(json!({ "amount": -700, "memo": "Clawback" }));
    let (status, json) = call(&state, Method::POST, &adjustments, &admin, debit).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["balance"], 0);

    let (status, _) = call(&state, Method::DELETE, &user_uri, &admin, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&state, Method::DELETE, &user_uri, &admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Favorites pointing at the deleted user are gone too.
    let (_, json) = call(&state, Method::GET, "/api/v1/me/favorites", &fan, None).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn overdrawing_adjustment_is_refused(pool: PgPool) {
    let state = common::test_state(pool);
    let (_, admin) = common::admin(&state).await;
    let (user_id, _) = register(common::app(state.clone()), "photo@altme.test").await;

    let (status, _) = call(
        &state,
        Method::POST,
        &format!("/api/v1/admin/users/{user_id}/adjustments"),
        &admin,
        Some(json!({ "amount": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = call(
        &state,
        Method::GET,
        "/api/v1/admin/users?role=user&status=active",
        &admin,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![user_id]);
}
