//! Integration tests for balances, payouts, chat, notifications and
//! account deletion.

use altme_core::error::CoreError;
use altme_core::payout::{PAYOUT_COMPLETED, PAYOUT_REJECTED};
use altme_core::project_status::ProjectAction;
use altme_db::models::favorite::CreateFavorite;
use altme_db::models::notification::CreateNotification;
use altme_db::models::project_request::{Booking, CreateProjectRequest};
use altme_db::models::user::{CreateUser, UserFilter};
use altme_db::repositories::{
    ChatRepo, FavoriteRepo, LedgerRepo, NotificationRepo, PayoutRepo, ProjectRequestRepo,
    TransitionRequest, UserRepo,
};
use altme_db::RepoError;
use assert_matches::assert_matches;
use sqlx::PgPool;

async fn user(pool: &PgPool, name: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: format!("{name}@example.com"),
            display_name: name.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: "user".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn fund(pool: &PgPool, user_id: i64, amount: i64) {
    LedgerRepo::post_adjustment(pool, user_id, amount, &format!("seed:{user_id}"), None)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn adjustment_is_idempotent(pool: PgPool) {
    let id = user(&pool, "ana").await;

    LedgerRepo::post_adjustment(&pool, id, 1_000, "adj:1", Some("goodwill"))
        .await
        .unwrap();
    let replay = LedgerRepo::post_adjustment(&pool, id, 1_000, "adj:1", Some("goodwill")).await;

    assert_matches!(replay, Err(RepoError::Domain(CoreError::Conflict(_))));
    let entries = LedgerRepo::list_for_user(&pool, id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    let reconciliation = LedgerRepo::reconcile(&pool, id).await.unwrap().unwrap();
    assert_eq!(reconciliation.cached_balance, 1_000);
    assert!(reconciliation.is_consistent());
}

#[sqlx::test(migrations = "./migrations")]
async fn negative_adjustment_cannot_overdraw(pool: PgPool) {
    let id = user(&pool, "ana").await;
    fund(&pool, id, 500).await;

    let result = LedgerRepo::post_adjustment(&pool, id, -501, "adj:over", None).await;

    assert_matches!(result, Err(RepoError::Domain(CoreError::Conflict(_))));
    let reconciliation = LedgerRepo::reconcile(&pool, id).await.unwrap().unwrap();
    assert_eq!(reconciliation.cached_balance, 500);
}

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn payout_debits_on_completion_only(pool: PgPool) {
    let id = user(&pool, "ana").await;
    fund(&pool, id, 10_000).await;

    let payout = PayoutRepo::create(&pool, id, 6_000).await.unwrap();
    let before = UserRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(before.balance, 10_000);

    let completed = PayoutRepo::complete(&pool, payout.id, "tr_1").await.unwrap();
    assert_eq!(completed.status, PAYOUT_COMPLETED);
    assert_eq!(completed.transfer_reference.as_deref(), Some("tr_1"));

    let reconciliation = LedgerRepo::reconcile(&pool, id).await.unwrap().unwrap();
    assert_eq!(reconciliation.cached_balance, 4_000);
    assert!(reconciliation.is_consistent());

    let again = PayoutRepo::complete(&pool, payout.id, "tr_2").await;
    assert_matches!(again, Err(RepoError::Domain(CoreError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn debit_cannot_eat_into_a_pending_payout(pool: PgPool) {
    let id = user(&pool, "ana").await;
    fund(&pool, id, 10_000).await;
    let payout = PayoutRepo::create(&pool, id, 10_000).await.unwrap();

    let debit = LedgerRepo::post_adjustment(&pool, id, -5_000, "adj:chargeback", None).await;
    assert_matches!(debit, Err(RepoError::Domain(CoreError::Conflict(_))));

    // Credits are unaffected by the reserve.
    LedgerRepo::post_adjustment(&pool, id, 250, "adj:bonus", None)
        .await
        .unwrap();
    LedgerRepo::post_adjustment(&pool, id, -250, "adj:bonus-reversal", None)
        .await
        .unwrap();

    let completed = PayoutRepo::complete(&pool, payout.id, "tr_1").await.unwrap();
    assert_eq!(completed.status, PAYOUT_COMPLETED);
    let reconciliation = LedgerRepo::reconcile(&pool, id).await.unwrap().unwrap();
    assert_eq!(reconciliation.cached_balance, 0);
    assert!(reconciliation.is_consistent());
}

#[sqlx::test(migrations = "./migrations")]
async fn payout_over_balance_is_rejected(pool: PgPool) {
    let id = user(&pool, "ana").await;
    fund(&pool, id, 100).await;

    let result = PayoutRepo::create(&pool, id, 101).await;

    assert_matches!(result, Err(RepoError::Domain(CoreError::Validation(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn only_one_pending_payout(pool: PgPool) {
    let id = user(&pool, "ana").await;
    fund(&pool, id, 1_000).await;

    let first = PayoutRepo::create(&pool, id, 100).await.unwrap();
    let second = PayoutRepo::create(&pool, id, 100).await;
    assert_matches!(second, Err(RepoError::Domain(CoreError::Conflict(_))));

    let rejected = PayoutRepo::reject(&pool, first.id).await.unwrap();
    assert_eq!(rejected.status, PAYOUT_REJECTED);
    PayoutRepo::create(&pool, id, 100).await.unwrap();

    let user = UserRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(user.balance, 1_000);
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn two_users_share_one_room(pool: PgPool) {
    let a = user(&pool, "ana").await;
    let b = user(&pool, "bruno").await;

    let first = ChatRepo::get_or_create_room(&pool, a, b, None).await.unwrap();
    let second = ChatRepo::get_or_create_room(&pool, b, a, None).await.unwrap();
    assert_eq!(first.id, second.id);

    let with_self = ChatRepo::get_or_create_room(&pool, a, a, None).await;
    assert_matches!(with_self, Err(RepoError::Domain(CoreError::Validation(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn sending_marks_recipient_unread(pool: PgPool) {
    let a = user(&pool, "ana").await;
    let b = user(&pool, "bruno").await;
    let outsider = user(&pool, "carla").await;
    let room = ChatRepo::get_or_create_room(&pool, a, b, None).await.unwrap();

    let (message, recipient) = ChatRepo::send_message(&pool, room.id, a, "  Hello there  ")
        .await
        .unwrap();
    assert_eq!(recipient, b);
    assert_eq!(message.body, "Hello there");

    let room = ChatRepo::find_by_id(&pool, room.id).await.unwrap().unwrap();
    assert!(room.is_unread_for(b));
    assert!(!room.is_unread_for(a));
    assert_eq!(room.last_message.as_deref(), Some("Hello there"));

    assert!(ChatRepo::mark_read(&pool, room.id, b).await.unwrap());
    let room = ChatRepo::find_by_id(&pool, room.id).await.unwrap().unwrap();
    assert!(!room.is_unread_for(b));

    let intrusion = ChatRepo::send_message(&pool, room.id, outsider, "hi").await;
    assert_matches!(intrusion, Err(RepoError::Domain(CoreError::Forbidden(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn messages_page_backwards_by_id(pool: PgPool) {
    let a = user(&pool, "ana").await;
    let b = user(&pool, "bruno").await;
    let room = ChatRepo::get_or_create_room(&pool, a, b, None).await.unwrap();
    for i in 0..5 {
        ChatRepo::send_message(&pool, room.id, a, &format!("message {i}"))
            .await
            .unwrap();
    }

    let newest = ChatRepo::list_messages(&pool, room.id, None, 2).await.unwrap();
    assert_eq!(newest[0].body, "message 4");
    assert_eq!(newest[1].body, "message 3");

    let older = ChatRepo::list_messages(&pool, room.id, Some(newest[1].id), 10)
        .await
        .unwrap();
    assert_eq!(older.len(), 3);
    assert_eq!(older[0].body, "message 2");
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_dispatch_creates_one_notification(pool: PgPool) {
    let id = user(&pool, "ana").await;
    let input = CreateNotification {
        user_id: id,
        kind: "project.booked".to_string(),
        title: "Project booked".to_string(),
        body: "Your project was booked".to_string(),
        entity_type: Some("project_request".to_string()),
        entity_id: Some(7),
        dedup_key: Some("project.booked:project_request:7:1".to_string()),
    };

    assert!(NotificationRepo::create(&pool, &input).await.unwrap().is_some());
    assert!(NotificationRepo::create(&pool, &input).await.unwrap().is_none());
    assert_eq!(NotificationRepo::unread_count(&pool, id).await.unwrap(), 1);

    assert_eq!(NotificationRepo::mark_all_read(&pool, id).await.unwrap(), 1);
    assert_eq!(NotificationRepo::unread_count(&pool, id).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn hard_delete_removes_user_everywhere(pool: PgPool) {
    let a = user(&pool, "ana").await;
    let b = user(&pool, "bruno").await;
    ChatRepo::get_or_create_room(&pool, a, b, None).await.unwrap();
    FavoriteRepo::add(
        &pool,
        b,
        &CreateFavorite {
            target_kind: "photographer".to_string(),
            target_id: a,
        },
    )
    .await
    .unwrap();

    assert!(UserRepo::hard_delete(&pool, a).await.unwrap());
    assert!(!UserRepo::hard_delete(&pool, a).await.unwrap());

    let users = UserRepo::list(&pool, &UserFilter::default(), 100, 0).await.unwrap();
    assert!(users.iter().all(|u| u.id != a));
    assert!(ChatRepo::list_rooms_for_user(&pool, b, 10, 0).await.unwrap().is_empty());
    assert!(FavoriteRepo::list_for_user(&pool, b, None).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn hard_delete_blocked_while_escrow_held(pool: PgPool) {
    let client = user(&pool, "client").await;
    let photographer = user(&pool, "photographer").await;
    let request = ProjectRequestRepo::create(
        &pool,
        client,
        &CreateProjectRequest {
            title: "Portraits".to_string(),
            description: None,
            location: None,
            event_date: None,
            budget: 20_000,
        },
    )
    .await
    .unwrap();
    ProjectRequestRepo::transition(
        &pool,
        &TransitionRequest {
            request_id: request.id,
            action: ProjectAction::Book,
            actor_id: client,
            actor_is_admin: false,
            booking: Some(Booking {
                bid_id: None,
                photographer_id: Some(photographer),
                payment_reference: "pi_hold".to_string(),
            }),
        },
    )
    .await
    .unwrap();

    let result = UserRepo::hard_delete(&pool, photographer).await;
    assert_matches!(result, Err(RepoError::Domain(CoreError::Conflict(_))));
    assert!(UserRepo::find_by_id(&pool, photographer).await.unwrap().is_some());
}
