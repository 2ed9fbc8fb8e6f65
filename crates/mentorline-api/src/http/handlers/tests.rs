//! Handler tests over a throwaway database.
//!
//! Handlers are plain async functions, so these call them directly with
//! constructed extractors instead of going through the router.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{Request, StatusCode};
use secrecy::SecretString;
use tempfile::TempDir;
use uuid::Uuid;

use mentorline_core::payment::sign_payment;
use mentorline_core::repository::MentorDirectory;
use mentorline_infra::sqlite::pool::DatabasePool;
use mentorline_types::config::EngineConfig;
use mentorline_types::event::RealtimeEvent;
use mentorline_types::identity::{MentorStatus, Principal, Role};
use mentorline_types::message::MessagePayload;
use mentorline_types::session::SessionState;

use crate::auth::{JwtConfig, issue_token};
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::{HistoryQuery, PageQuery};
use crate::http::handlers::{message, payment, session, wallet, ws};
use crate::state::AppState;

const PAYMENT_SECRET: &str = "gateway-secret";

async fn test_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("api.db").display());
    let pool = DatabasePool::new(&url).await.unwrap();
    let state = AppState::from_parts(
        pool,
        EngineConfig::default(),
        dir.path().to_path_buf(),
        Some(JwtConfig::new(SecretString::from("jwt-secret".to_string()))),
        Some(Arc::new(SecretString::from(PAYMENT_SECRET.to_string()))),
    );
    (dir, state)
}

const MENTOR_RATE: i64 = 10;

/// Approved mentor charging `MENTOR_RATE` and a student holding `balance`.
async fn seed(state: &AppState, balance: i64) -> (Principal, Principal) {
    let mentor = Principal::new(Uuid::now_v7(), Role::Mentor);
    let student = Principal::new(Uuid::now_v7(), Role::Student);
    let directory = state.sessions.directory();
    directory
        .set_mentor_status(&mentor.user_id, MentorStatus::Approved)
        .await
        .unwrap();
    directory
        .set_mentor_rate(&mentor.user_id, MENTOR_RATE)
        .await
        .unwrap();
    if balance > 0 {
        state
            .ledger
            .credit(&student.user_id, balance, "seed", None, None)
            .await
            .unwrap();
    }
    (mentor, student)
}

async fn book(state: &AppState, mentor: &Principal, student: &Principal) -> Uuid {
    let (status, Json(resp)) = session::create_session(
        State(state.clone()),
        Authenticated(*student),
        Json(session::CreateSessionRequest {
            mentor_id: mentor.user_id,
            student_id: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    resp.data.unwrap().id
}

fn text(content: &str) -> MessagePayload {
    MessagePayload::Text {
        content: content.to_string(),
    }
}

#[tokio::test]
async fn message_flow_and_payment_required() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 15).await;
    let session_id = book(&state, &mentor, &student).await;

    let Json(started) = session::start_session(
        State(state.clone()),
        Authenticated(mentor),
        Path(session_id),
    )
    .await
    .unwrap();
    assert_eq!(started.data.unwrap().state, SessionState::Ongoing);

    let (_, Json(sent)) = message::send_message(
        State(state.clone()),
        Authenticated(student),
        Path(session_id),
        Json(text("hello")),
    )
    .await
    .unwrap();
    assert_eq!(sent.data.unwrap().cost, 10);

    let err = message::send_message(
        State(state.clone()),
        Authenticated(student),
        Path(session_id),
        Json(text("again")),
    )
    .await
    .unwrap_err();
    let (status, code, _) = err.parts();
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(code, "INSUFFICIENT_BALANCE");

    let Json(balance) = wallet::get_balance(State(state.clone()), Authenticated(student))
        .await
        .unwrap();
    assert_eq!(balance.data.unwrap().balance, 5);

    let Json(listing) = message::list_messages(
        State(state.clone()),
        Authenticated(mentor),
        Path(session_id),
        Query(PageQuery::default()),
    )
    .await
    .unwrap();
    assert_eq!(listing.data.unwrap().len(), 1);
}

#[tokio::test]
async fn only_mentor_starts_session() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 0).await;
    let session_id = book(&state, &mentor, &student).await;

    let err = session::start_session(
        State(state.clone()),
        Authenticated(student),
        Path(session_id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.parts().0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_cannot_book_for_someone_else() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 0).await;

    let err = session::create_session(
        State(state.clone()),
        Authenticated(student),
        Json(session::CreateSessionRequest {
            mentor_id: mentor.user_id,
            student_id: Some(Uuid::now_v7()),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.parts().1, "FORBIDDEN");
}

#[tokio::test]
async fn booking_ignores_a_client_supplied_rate() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 0).await;

    let body: session::CreateSessionRequest = serde_json::from_value(serde_json::json!({
        "mentor_id": mentor.user_id,
        "rate_per_unit": 0,
    }))
    .unwrap();
    let (_, Json(resp)) =
        session::create_session(State(state.clone()), Authenticated(student), Json(body))
            .await
            .unwrap();
    assert_eq!(resp.data.unwrap().rate_per_unit, MENTOR_RATE);
}

#[tokio::test]
async fn student_leaves_feedback_after_completion() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 0).await;
    let session_id = book(&state, &mentor, &student).await;

    let feedback = |rating| session::FeedbackRequest {
        rating,
        feedback: Some("Helpful walkthrough".to_string()),
    };

    let err = session::submit_feedback(
        State(state.clone()),
        Authenticated(student),
        Path(session_id),
        Json(feedback(5)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.parts().1, "INVALID_STATE");

    session::start_session(State(state.clone()), Authenticated(mentor), Path(session_id))
        .await
        .unwrap();
    session::end_session(State(state.clone()), Authenticated(mentor), Path(session_id))
        .await
        .unwrap();

    let err = session::submit_feedback(
        State(state.clone()),
        Authenticated(mentor),
        Path(session_id),
        Json(feedback(5)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.parts().0, StatusCode::FORBIDDEN);

    let Json(resp) = session::submit_feedback(
        State(state.clone()),
        Authenticated(student),
        Path(session_id),
        Json(feedback(5)),
    )
    .await
    .unwrap();
    let rated = resp.data.unwrap();
    assert_eq!(rated.rating, Some(5));
    assert_eq!(rated.feedback.as_deref(), Some("Helpful walkthrough"));
}

#[tokio::test]
async fn payment_verify_is_idempotent() {
    let (_dir, state) = test_state().await;
    let student = Principal::new(Uuid::now_v7(), Role::Student);

    payment::create_credit_intent(
        State(state.clone()),
        Authenticated(student),
        Json(payment::CreditIntentRequest {
            amount: 100,
            order_id: "order_1".to_string(),
        }),
    )
    .await
    .unwrap();

    let signature = sign_payment("order_1", "pay_1", PAYMENT_SECRET.as_bytes()).unwrap();
    for replayed in [false, true] {
        let Json(resp) = payment::verify_payment(
            State(state.clone()),
            Authenticated(student),
            Json(payment::VerifyPaymentRequest {
                order_id: "order_1".to_string(),
                payment_id: "pay_1".to_string(),
                signature: signature.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.data.unwrap().replayed, replayed);
    }

    assert_eq!(state.ledger.balance(&student.user_id).await.unwrap(), 100);

    let Json(history) = wallet::list_transactions(
        State(state.clone()),
        Authenticated(student),
        Query(HistoryQuery { page: 1, limit: 20 }),
    )
    .await
    .unwrap();
    assert_eq!(history.data.unwrap().transactions.len(), 1);
}

#[tokio::test]
async fn stale_report_requires_admin() {
    let (_dir, state) = test_state().await;
    let student = Principal::new(Uuid::now_v7(), Role::Student);

    let err = payment::list_stale_payments(State(state.clone()), Authenticated(student))
        .await
        .unwrap_err();
    assert_eq!(err.parts().0, StatusCode::FORBIDDEN);

    let admin = Principal::new(Uuid::now_v7(), Role::Admin);
    let Json(resp) = payment::list_stale_payments(State(state.clone()), Authenticated(admin))
        .await
        .unwrap();
    assert!(resp.data.unwrap().is_empty());
}

#[tokio::test]
async fn deduct_rejects_overdraft() {
    let (_dir, state) = test_state().await;
    let (_, student) = seed(&state, 3).await;

    let err = wallet::deduct(
        State(state.clone()),
        Authenticated(student),
        Json(wallet::DeductRequest {
            amount: 4,
            description: "course material".to_string(),
            user_id: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Engine(mentorline_types::error::EngineError::InsufficientBalance {
            required: 4,
            available: 3
        })
    ));
}

#[tokio::test]
async fn extractor_accepts_issued_token_and_rejects_missing() {
    let (_dir, state) = test_state().await;
    let user = Uuid::now_v7();
    let token = issue_token(user, Role::Mentor, state.jwt().unwrap()).unwrap();

    let (mut parts, _) = Request::builder()
        .uri(format!("/ws?token={token}"))
        .body(())
        .unwrap()
        .into_parts();
    let Authenticated(principal) = Authenticated::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(principal, Principal::new(user, Role::Mentor));

    let (mut parts, _) = Request::builder().uri("/ws").body(()).unwrap().into_parts();
    let err = Authenticated::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err.parts().0, StatusCode::UNAUTHORIZED);

    let (mut parts, _) = Request::builder()
        .uri("/ws")
        .header("authorization", "Bearer not-a-jwt")
        .body(())
        .unwrap()
        .into_parts();
    assert!(Authenticated::from_request_parts(&mut parts, &state).await.is_err());
}

#[tokio::test]
async fn socket_subscribe_requires_participant() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 0).await;
    let session_id = book(&state, &mentor, &student).await;

    let outsider = Principal::new(Uuid::now_v7(), Role::Student);
    let (conn, _rx) = state.fanout.connect(outsider.user_id);
    let reply = ws::process_command(
        &state,
        &outsider,
        conn,
        ws::ClientCommand::Subscribe { session_id },
    )
    .await;
    assert!(matches!(reply, Some(RealtimeEvent::Error { .. })));
    assert!(!state.fanout.is_subscribed(&conn, &session_id));

    let (conn, _rx) = state.fanout.connect(student.user_id);
    let reply = ws::process_command(
        &state,
        &student,
        conn,
        ws::ClientCommand::Subscribe { session_id },
    )
    .await;
    assert!(matches!(reply, Some(RealtimeEvent::Subscribed { session_id: id }) if id == session_id));
}

#[tokio::test]
async fn typing_reaches_the_other_participant_only() {
    let (_dir, state) = test_state().await;
    let (mentor, student) = seed(&state, 0).await;
    let session_id = book(&state, &mentor, &student).await;

    let (student_conn, mut student_rx) = state.fanout.connect(student.user_id);
    let (mentor_conn, mut mentor_rx) = state.fanout.connect(mentor.user_id);
    for (principal, conn) in [(&student, student_conn), (&mentor, mentor_conn)] {
        ws::process_command(&state, principal, conn, ws::ClientCommand::Subscribe { session_id })
            .await;
    }

    let reply = ws::process_command(
        &state,
        &student,
        student_conn,
        ws::ClientCommand::Typing {
            session_id,
            is_typing: true,
        },
    )
    .await;
    assert!(reply.is_none());

    match mentor_rx.try_recv() {
        Ok(RealtimeEvent::Typing { user_id, is_typing, .. }) => {
            assert_eq!(user_id, student.user_id);
            assert!(is_typing);
        }
        other => panic!("expected TYPING, got {other:?}"),
    }
    assert!(student_rx.try_recv().is_err());
}

#[tokio::test]
async fn only_mentors_report_presence_over_socket() {
    let (_dir, state) = test_state().await;
    let student = Principal::new(Uuid::now_v7(), Role::Student);
    let (conn, _rx) = state.fanout.connect(student.user_id);

    let reply = ws::process_command(
        &state,
        &student,
        conn,
        ws::ClientCommand::Presence { is_online: true },
    )
    .await;
    assert!(matches!(reply, Some(RealtimeEvent::Error { .. })));

    let mentor = Principal::new(Uuid::now_v7(), Role::Mentor);
    let (conn, mut rx) = state.fanout.connect(mentor.user_id);
    let reply = ws::process_command(
        &state,
        &mentor,
        conn,
        ws::ClientCommand::Presence { is_online: true },
    )
    .await;
    assert!(reply.is_none());
    assert!(matches!(
        rx.try_recv(),
        Ok(RealtimeEvent::Presence { is_online: true, .. })
    ));
    assert!(state.presence.is_online(&mentor.user_id).await.unwrap());
}
