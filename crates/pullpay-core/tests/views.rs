//! Integration tests for view loading, guarding and pagination.


use std::time::Duration;

use fixtures::{can_bind_localhost, client_for, signed_in};
use pullpay_core::api::FetchError;
use pullpay_core::models::{Church, Credentials};
use pullpay_core::session::{GuardDecision, SessionGuard, TokenStore};
use pullpay_core::mutation::MutationStrategy;
use pullpay_core::validation::parse_new_transaction;
use pullpay_core::views::{
    Dashboard, FetchSpec, ResourceStatus, Route, ViewDataLoader, ViewOutcome,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_first_listed_failure_wins_regardless_of_timing() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    // The first fetch fails slowly, the second fails immediately.
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"detail": "transactions unavailable"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/churches/"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({"detail": "churches unavailable"})),
        )
        .mount(&server)
        .await;

    let loader = ViewDataLoader::new(client_for(&server, signed_in()));
    let loaded = loader
        .load(&[
            FetchSpec::new("transactions", "/api/transactions/"),
            FetchSpec::new("churches", "/churches/"),
        ])
        .await;

    assert_eq!(loaded.status(), ResourceStatus::Failed);
    assert_eq!(
        loaded.error(),
        Some(&FetchError::ServerError {
            status: 500,
            message: Some("transactions unavailable".to_string())
        })
    );
    assert_eq!(
        loaded.resource("churches").unwrap().error(),
        Some("churches unavailable")
    );
}

#[tokio::test]
async fn test_partial_failure_fails_the_view() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::transactions_json(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/churches/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(client_for(&server, signed_in()));
    let outcome = dashboard.load_transactions(1).await;
    let ViewOutcome::Failed(message) = &outcome else {
        panic!("expected a failed view, got {outcome:?}");
    };
    assert_eq!(message.as_str(), "Something went wrong. Please try again.");
}

#[tokio::test]
async fn test_transactions_view_paginates_nine_per_page() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::transactions_json(20)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/churches/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::churches_json()))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(client_for(&server, signed_in()));

    let first = dashboard.load_transactions(1).await.ready().unwrap();
    assert_eq!(first.page().items.len(), 9);
    assert_eq!(first.page().total_pages, 3);
    assert_eq!(first.count(), 20);
    assert_eq!(first.total_amount().to_string(), "200.00");
    assert_eq!(first.churches.len(), 2);

    let clamped = dashboard.load_transactions(4).await.ready().unwrap().page();
    assert_eq!(clamped.page_number, 3);
    let ids: Vec<&str> = clamped.items.iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, vec!["19", "20"]);
}

async fn mount_transactions_view(server: &MockServer, count: u64) {
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::transactions_json(count)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/churches/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::churches_json()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_created_transaction_updates_view_totals_and_pages() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    mount_transactions_view(&server, 9).await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 50,
            "amount": "25.50",
            "date": "2024-10-02T09:00:00Z",
            "church": 3
        })))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(client_for(&server, signed_in()));
    let view = dashboard.load_transactions(1).await.ready().unwrap();
    assert_eq!(view.count(), 9);
    assert_eq!(view.page().total_pages, 1);

    let submitter = dashboard.transaction_submitter(&view);
    submitter
        .submit(parse_new_transaction("25.50", Some(3)).unwrap())
        .await
        .unwrap();

    assert_eq!(view.count(), 10);
    assert_eq!(view.total_amount().to_string(), "115.50");
    let page = view.page();
    assert_eq!(page.items.len(), 9);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items[0].id, "50");
    assert_eq!(page.items[0].church_label(), "Grace Chapel");
    assert_eq!(view.page_at(2).items[0].id, "9");
}

#[tokio::test]
async fn test_failed_create_leaves_view_totals_unchanged() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    mount_transactions_view(&server, 3).await;
    Mock::given(method("POST"))
        .and(path("/transactions/create/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(client_for(&server, signed_in()));
    let view = dashboard.load_transactions(1).await.ready().unwrap();
    let before = (view.count(), view.total_amount(), view.snapshot());

    let submitter = dashboard.transaction_submitter(&view);
    let err = submitter
        .submit(parse_new_transaction("40", Some(4)).unwrap())
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message_or(submitter.strategy().fallback_message()),
        "Failed to create transaction"
    );
    assert_eq!((view.count(), view.total_amount(), view.snapshot()), before);
}

#[tokio::test]
async fn test_expired_session_redirects_without_data() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/churches/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::churches_json()))
        .mount(&server)
        .await;

    let tokens = signed_in();
    let dashboard = Dashboard::new(client_for(&server, tokens.clone()));

    let outcome = dashboard.load_transactions(1).await;
    assert_eq!(outcome.redirect(), Some(Route::Login));
    assert!(!tokens.is_authenticated());

    // The next view redirects before fetching anything.
    assert_eq!(
        SessionGuard::new(tokens).enter(),
        GuardDecision::Redirect(Route::Login)
    );
    assert_eq!(
        dashboard.load_churches().await,
        ViewOutcome::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn test_login_view_logout_scenario() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login/"))
        .and(body_json(json!({"email": "a@b.com", "password": "validpass"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A", "refresh": "R"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/"))
        .and(wiremock::matchers::header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "a@b.com",
            "churches": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::in_memory();
    let dashboard = Dashboard::new(client_for(&server, tokens.clone()));
    let auth = dashboard.auth();

    let route = auth
        .login(&Credentials::email("a@b.com", "validpass"))
        .await
        .unwrap();
    assert_eq!(route, Route::Dashboard);
    assert_eq!(tokens.get().access_token(), Some("A"));
    assert_eq!(tokens.get().refresh_token.as_deref(), Some("R"));

    let user = dashboard.load_overview().await.ready().unwrap();
    assert_eq!(user.email, "a@b.com");
    assert!(user.churches.is_empty());

    assert_eq!(auth.logout().unwrap(), Route::Login);
    assert_eq!(tokens.get().access_token(), None);
    assert_eq!(tokens.get().refresh_token, None);

    // No further request reaches the server.
    assert_eq!(
        dashboard.load_profile().await,
        ViewOutcome::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn test_legacy_token_login_and_register() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register/"))
        .and(body_json(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "password": "analytical"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "opaque"})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::in_memory();
    let dashboard = Dashboard::new(client_for(&server, tokens.clone()));
    let registration = pullpay_core::models::Registration {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: "analytical".to_string(),
    };

    let route = dashboard.auth().register_and_login(&registration).await.unwrap();
    assert_eq!(route, Route::Dashboard);
    assert_eq!(tokens.access_token().as_deref(), Some("opaque"));
    assert_eq!(tokens.get().refresh_token, None);
}

#[tokio::test]
async fn test_churches_view() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/churches/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::churches_json()))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(client_for(&server, signed_in()));
    let churches = dashboard.load_churches().await.ready().unwrap();
    assert_eq!(
        churches[0],
        Church {
            id: 3,
            name: "Grace Chapel".to_string()
        }
    );
}
