//! Integration tests for optimistic form submissions.


use std::time::Duration;

use fixtures::{can_bind_localhost, client_for, signed_in};
use pullpay_core::api::{ApiClient, ClientOptions, FetchError};
use pullpay_core::models::{Church, ProfileUpdate, Transaction, UserProfile};
use pullpay_core::mutation::{
    CreateTransaction, MutationError, MutationStrategy, MutationSubmitter, UpdateProfile, shared,
};
use pullpay_core::validation::parse_new_transaction;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn existing() -> Vec<Transaction> {
    serde_json::from_value(fixtures::transactions_json(2)).unwrap()
}

fn churches() -> Vec<Church> {
    serde_json::from_value(fixtures::churches_json()).unwrap()
}

#[tokio::test]
async fn test_create_commits_confirmed_entry_first() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .and(body_json(json!({"amount": 25.5, "church_id": 3, "church": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 99,
            "amount": "25.50",
            "date": "2024-10-02T09:00:00Z",
            "church": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = shared(existing());
    let submitter = MutationSubmitter::new(
        client_for(&server, signed_in()),
        CreateTransaction::new(churches()),
        list.clone(),
    );

    let payload = parse_new_transaction("25.50", Some(3)).unwrap();
    let created = submitter.submit(payload).await.unwrap();
    assert_eq!(created.id, "99");

    let list = list.lock().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].id, "99");
    assert!(!list[0].pending);
    assert_eq!(list[0].church_label(), "Grace Chapel");
    assert!(!submitter.is_pending());
}

#[tokio::test]
async fn test_failed_create_restores_collection() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Church is not accepting donations"})),
        )
        .mount(&server)
        .await;

    let before = existing();
    let list = shared(before.clone());
    let submitter = MutationSubmitter::new(
        client_for(&server, signed_in()),
        CreateTransaction::new(churches()),
        list.clone(),
    );

    let err = submitter
        .submit(parse_new_transaction("10", Some(4)).unwrap())
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message_or(submitter.strategy().fallback_message()),
        "Church is not accepting donations"
    );
    assert_eq!(*list.lock().unwrap(), before);
}

#[tokio::test]
async fn test_optimistic_entry_visible_and_resubmit_rejected_while_in_flight() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let list = shared(existing());
    let submitter = MutationSubmitter::new(
        client_for(&server, signed_in()),
        CreateTransaction::new(churches()),
        list.clone(),
    );
    let payload = parse_new_transaction("5", Some(3)).unwrap();

    let (first, second, observed) = tokio::join!(
        submitter.submit(payload),
        submitter.submit(payload),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let snapshot = list.lock().unwrap().clone();
            (snapshot, submitter.pending())
        }
    );

    assert!(matches!(
        first,
        Err(MutationError::Fetch(FetchError::ServerError { status: 500, .. }))
    ));
    assert_eq!(second, Err(MutationError::InFlight));

    let (snapshot, pending) = observed;
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot[0].pending);
    let pending = pending.unwrap();
    assert_eq!(pending.optimistic_entry.as_deref(), Some(snapshot[0].id.as_str()));

    assert_eq!(list.lock().unwrap().len(), 2);
    assert!(!submitter.is_pending());
}

#[tokio::test]
async fn test_abandoned_create_removes_pending_entry() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let before = existing();
    let list = shared(before.clone());
    let submitter = MutationSubmitter::new(
        client_for(&server, signed_in()),
        CreateTransaction::new(churches()),
        list.clone(),
    );
    let payload = parse_new_transaction("12", Some(3)).unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), submitter.submit(payload)).await;
    assert!(abandoned.is_err());

    assert_eq!(*list.lock().unwrap(), before);
    assert!(!submitter.is_pending());
}

#[tokio::test]
async fn test_offline_create_rolls_back_and_stays_submittable() {
    let api = ApiClient::new(ClientOptions::new("http://127.0.0.1:1"), signed_in()).unwrap();
    let before = existing();
    let list = shared(before.clone());
    let submitter =
        MutationSubmitter::new(api, CreateTransaction::new(churches()), list.clone());

    let payload = parse_new_transaction("25.50", Some(3)).unwrap();
    let err = submitter.submit(payload).await.unwrap_err();
    assert!(matches!(err, MutationError::Fetch(FetchError::NetworkError(_))), "{err:?}");
    assert_eq!(*list.lock().unwrap(), before);
    assert!(!submitter.is_pending());

    // Resubmitting goes through to the network again rather than being rejected.
    let err = submitter.submit(payload).await.unwrap_err();
    assert!(matches!(err, MutationError::Fetch(FetchError::NetworkError(_))));
}

#[tokio::test]
async fn test_unauthorized_create_rolls_back_and_clears_session() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let tokens = signed_in();
    let list = shared(existing());
    let submitter = MutationSubmitter::new(
        client_for(&server, tokens.clone()),
        CreateTransaction::default(),
        list.clone(),
    );

    let err = submitter
        .submit(parse_new_transaction("1", Some(3)).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(!tokens.is_authenticated());
    assert_eq!(list.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_profile_update_replaces_record() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    let mut updated = fixtures::user_json();
    updated["first_name"] = json!("Augusta");
    Mock::given(method("PUT"))
        .and(path("/user/"))
        .and(body_json(json!({"first_name": "Augusta"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let current: UserProfile = serde_json::from_value(fixtures::user_json()).unwrap();
    let profile = shared(Some(current));
    let submitter = MutationSubmitter::new(
        client_for(&server, signed_in()),
        UpdateProfile,
        profile.clone(),
    );

    let update = ProfileUpdate {
        first_name: Some("Augusta".to_string()),
        ..ProfileUpdate::default()
    };
    submitter.submit(update).await.unwrap();

    let profile = profile.lock().unwrap();
    let profile = profile.as_ref().unwrap();
    assert_eq!(profile.first_name, "Augusta");
    assert_eq!(profile.last_name, "Lovelace");
}

#[tokio::test]
async fn test_failed_profile_update_keeps_record() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/user/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let current: UserProfile = serde_json::from_value(fixtures::user_json()).unwrap();
    let profile = shared(Some(current.clone()));
    let submitter = MutationSubmitter::new(
        client_for(&server, signed_in()),
        UpdateProfile,
        profile.clone(),
    );

    let err = submitter
        .submit(ProfileUpdate {
            email: Some("new@example.com".to_string()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message_or(submitter.strategy().fallback_message()),
        "Failed to update profile"
    );
    assert_eq!(*profile.lock().unwrap(), Some(current));
}
