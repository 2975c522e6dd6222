mod common;

use std::sync::{Arc, Mutex};

use altme_api::payments::{PaymentError, PayoutGateway};
use altme_api::state::AppState;
use altme_core::types::Cents;
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use common::{balance, call, register};
use serde_json::json;
use sqlx::PgPool;

/// Records every transfer and answers with a canned result.
#[derive(Default)]
struct FakeGateway {
    fail: bool,
    calls: Mutex<Vec<(String, Cents, String)>>,
}

#[async_trait]
impl PayoutGateway for FakeGateway {
    async fn transfer(
        &self,
        account: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<String, PaymentError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((account.to_string(), amount, idempotency_key.to_string()));
        if self.fail {
            return Err(PaymentError::Rejected {
                status: 400,
                message: "Insufficient platform funds".into(),
            });
        }
        Ok(format!("tr_fake_{}", calls.len()))
    }
}

/// Credit `amount` to a user through an admin adjustment.
async fn fund(state: &AppState, admin: &str, user_id: i64, amount: i64) {
    let (status, json) = call(
        state,
        Method::POST,
        &format!("/api/v1/admin/users/{user_id}/adjustments"),
        admin,
        Some(json!({ "amount": amount, "memo": "Opening balance" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["entry"]["kind"], "adjustment");
}

async fn request_payout(
    state: &AppState,
    token: &str,
    amount: i64,
) -> (StatusCode, serde_json::Value) {
    call(
        state,
        Method::POST,
        "/api/v1/payouts",
        token,
        Some(json!({ "amount": amount })),
    )
    .await
}

async fn complete(
    state: &AppState,
    admin: &str,
    payout_id: i64,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    call(
        state,
        Method::POST,
        &format!("/api/v1/admin/payouts/{payout_id}/complete"),
        admin,
        body,
    )
    .await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn manual_payout_debits_the_balance_once(pool: PgPool) {
    let state = common::test_state(pool);
    let (_, admin) = common::admin(&state).await;
    let (user_id, user) = register(common::app(state.clone()), "photo@altme.test").await;
    fund(&state, &admin, user_id, 30_000).await;

    let (status, _) = request_payout(&state, &user, 30_001).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = request_payout(&state, &user, 20_000).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "pending");
    let payout_id = json["data"]["id"].as_i64().unwrap();

    // One pending request per user.
    let (status, _) = request_payout(&state, &user, 1_000).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Requesting does not move money yet.
    assert_eq!(balance(&state, &user).await, 30_000);

    // Without a gateway the admin must say how the money was sent.
    let (status, _) = complete(&state, &admin, payout_id, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let reference = Some(json!({ "transfer_reference": "wire-2041" }));
    let (status, json) = complete(&state, &admin, payout_id, reference.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["transfer_reference"], "wire-2041");
    assert_eq!(balance(&state, &user).await, 10_000);

    let (status, _) = complete(&state, &admin, payout_id, reference).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(balance(&state, &user).await, 10_000);

    let (_, json) = call(
        &state,
        Method::GET,
        &format!("/api/v1/admin/users/{user_id}/ledger"),
        &admin,
        None,
    )
    .await;
    assert_eq!(json["data"]["entries"][0]["kind"], "payout");
    assert_eq!(json["data"]["entries"][0]["amount"], -20_000);
    assert_eq!(json["data"]["reconciliation"]["ledger_balance"], 10_000);
    assert_eq!(json["data"]["reconciliation"]["drift"], 0);

    let (_, json) = call(&state, Method::GET, "/api/v1/payouts", &user, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rejected_payout_leaves_the_balance_alone(pool: PgPool) {
    let state = common::test_state(pool);
    let (_, admin) = common::admin(&state).await;
    let (user_id, user) = register(common::app(state.clone()), "photo@altme.test").await;
    fund(&state, &admin, user_id, 5_000).await;

    let (_, json) = request_payout(&state, &user, 5_000).await;
    let payout_id = json["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/admin/payouts/{payout_id}/reject");
    let (status, json) = call(&state, Method::POST, &uri, &admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "rejected");
    assert_eq!(balance(&state, &user).await, 5_000);

    // A new request is allowed once the previous one is settled.
    let (status, _) = request_payout(&state, &user, 5_000).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = call(
        &state,
        Method::GET,
        "/api/v1/admin/payouts?status=pending",
        &admin,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gateway_transfer_uses_the_payout_key(pool: PgPool) {
    let gateway = Arc::new(FakeGateway::default());
    let state = common::with_gateway(common::test_state(pool), gateway.clone());
    let (_, admin) = common::admin(&state).await;
    let (user_id, user) = register(common::app(state.clone()), "photo@altme.test").await;
    fund(&state, &admin, user_id, 12_000).await;

    let (_, json) = request_payout(&state, &user, 12_000).await;
    let payout_id = json["data"]["id"].as_i64().unwrap();

    // No linked account yet.
    let (status, _) = complete(&state, &admin, payout_id, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(gateway.calls.lock().unwrap().is_empty());

    let (status, json) = call(
        &state,
        Method::PUT,
        "/api/v1/me/payout-account",
        &user,
        Some(json!({ "stripe_account_id": "acct_123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["stripe_account_id"], "acct_123");

    let (status, json) = complete(&state, &admin, payout_id, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["transfer_reference"], "tr_fake_1");
    assert_eq!(balance(&state, &user).await, 0);

    let calls = gateway.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![(
            "acct_123".to_string(),
            12_000,
            format!("payout:{payout_id}")
        )]
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_transfer_keeps_the_payout_pending(pool: PgPool) {
    let gateway = Arc::new(FakeGateway {
        fail: true,
        ..Default::default()
    });
    let state = common::with_gateway(common::test_state(pool), gateway.clone());
    let (_, admin) = common::admin(&state).await;
    let (user_id, user) = register(common::app(state.clone()), "photo@altme.test").await;
    fund(&state, &admin, user_id, 8_000).await;
    call(
        &state,
        Method::PUT,
        "/api/v1/me/payout-account",
        &user,
        Some(json!({ "stripe_account_id": "acct_9" })),
    )
    .await;

    let (_, json) = request_payout(&state, &user, 8_000).await;
    let payout_id = json["data"]["id"].as_i64().unwrap();

    let (status, _) = complete(&state, &admin, payout_id, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    assert_eq!(balance(&state, &user).await, 8_000);

    let (_, json) = call(&state, Method::GET, "/api/v1/payouts", &user, None).await;
    assert_eq!(json["data"][0]["status"], "pending");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn pending_payout_reserves_its_amount(pool: PgPool) {
    let gateway = Arc::new(FakeGateway::default());
    let state = common::with_gateway(common::test_state(pool), gateway.clone());
    let (_, admin) = common::admin(&state).await;
    let (user_id, user) = register(common::app(state.clone()), "photo@altme.test").await;
    fund(&state, &admin, user_id, 10_000).await;

    let (_, json) = request_payout(&state, &user, 6_000).await;
    let payout_id = json["data"]["id"].as_i64().unwrap();

    let adjustments = format!("/api/v1/admin/users/{user_id}/adjustments");
    let (status, _) = call(
        &state,
        Method::POST,
        &adjustments,
        &admin,
        Some(json!({ "amount": -4_000, "memo": "Chargeback" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The remaining 6,000 belongs to the pending payout.
    let (status, json) = call(
        &state,
        Method::POST,
        &adjustments,
        &admin,
        Some(json!({ "amount": -1, "memo": "Fee" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(balance(&state, &user).await, 6_000);

    call(
        &state,
        Method::PUT,
        "/api/v1/me/payout-account",
        &user,
        Some(json!({ "stripe_account_id": "acct_1" })),
    )
    .await;
    let (status, json) = complete(&state, &admin, payout_id, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(balance(&state, &user).await, 0);
    assert_eq!(gateway.calls.lock().unwrap().len(), 1);

    // Once settled the reserve is gone and credits and debits flow again.
    fund(&state, &admin, user_id, 500).await;
    let (status, _) = call(
        &state,
        Method::POST,
        &adjustments,
        &admin,
        Some(json!({ "amount": -500, "memo": "Fee" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}
