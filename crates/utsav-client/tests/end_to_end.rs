use std::sync::Arc;

use chrono::NaiveDate;
use tokio::net::TcpListener;

use utsav_api::AppStateInner;
use utsav_client::{ApiClient, AuthContext, ClientError};
use utsav_db::Database;
use utsav_types::api::EventRequest;

const ADMIN_EMAIL: &str = "gate@utsav.test";

/// Serves a fresh in-memory API with one event and returns its base URL.
async fn serve() -> (String, i64) {
    let db = Database::open_in_memory().unwrap();
    let event_id = db
        .insert_event(&EventRequest {
            title_en: "Kavi Sammelan".into(),
            title_hi: Some("कवि सम्मेलन".into()),
            description_en: None,
            description_hi: None,
            rules_en: None,
            rules_hi: None,
            venue_en: Some("Main Lawn".into()),
            venue_hi: None,
            event_date: NaiveDate::from_ymd_opt(2099, 3, 1).unwrap(),
            start_time: Some("18:00".into()),
            end_time: None,
            category: None,
            image_url: None,
        })
        .unwrap();

    let mut state = AppStateInner::new(db, "end-to-end-secret");
    state.admin_emails = vec![ADMIN_EMAIL.into()];
    let app = utsav_api::router(Arc::new(state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (format!("http://{addr}"), event_id)
}

#[tokio::test]
async fn attendee_ticket_scanned_at_the_gate() {
    let (url, event_id) = serve().await;

    let attendee = ApiClient::new(url.clone(), AuthContext::new());
    let profile = attendee.signup("asha@example.com", "correct-horse", "Asha Verma").await.unwrap();
    assert!(!profile.role.is_admin());
    assert!(!attendee.auth().is_loading());

    let registration = attendee.register(event_id).await.unwrap();
    let view = attendee.ticket(registration.id).await.unwrap();
    assert_eq!(view.ticket.event.title_en, "Kavi Sammelan");
    assert!(view.qr_data_url.starts_with("data:image/svg+xml;base64,"));
    assert_eq!(view.qr_data_url, utsav_ticket::data_url(registration.id).unwrap());

    // Attendees cannot check themselves in.
    let refused = attendee.check_in(&registration.id.to_string()).await.unwrap();
    assert!(!refused.success);
    assert_eq!(refused.message, "Unauthorized.");

    let gate = ApiClient::new(url, AuthContext::new());
    gate.signup(ADMIN_EMAIL, "gate-password", "Gate Admin").await.unwrap();
    gate.sign_out();
    gate.login(ADMIN_EMAIL, "gate-password").await.unwrap();
    assert!(gate.auth().is_admin());

    let payload = format!("{}\n", registration.id);
    let first = gate.check_in(&payload).await.unwrap();
    assert!(first.success);
    assert_eq!(first.message, "Check-in Successful!");
    let participant = first.participant.unwrap();
    assert_eq!(participant.profiles.full_name.as_deref(), Some("Asha Verma"));

    let second = gate.check_in(&payload).await.unwrap();
    assert!(!second.success);
    assert!(second.message.starts_with("Already Checked In at "));
    assert_eq!(second.checked_in_at, first.checked_in_at);

    let view = attendee.ticket(registration.id).await.unwrap();
    assert_eq!(view.ticket.checked_in_at, first.checked_in_at);
}

#[tokio::test]
async fn signed_out_client_cannot_call_protected_routes() {
    let (url, event_id) = serve().await;
    let client = ApiClient::new(url, AuthContext::new());

    assert!(matches!(client.register(event_id).await, Err(ClientError::NotSignedIn)));
    assert!(matches!(client.check_in("1").await, Err(ClientError::NotSignedIn)));

    let err = client.login("nobody@example.com", "whatever-pass").await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password.");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(client.auth().user().is_none());
    assert!(!client.auth().is_loading());
}

#[tokio::test]
async fn duplicate_registration_is_reported() {
    let (url, event_id) = serve().await;
    let client = ApiClient::new(url, AuthContext::new());
    client.signup("ravi@example.com", "correct-horse", "Ravi Kumar").await.unwrap();

    client.register(event_id).await.unwrap();
    match client.register(event_id).await {
        Err(ClientError::Status { status: 409, .. }) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(client.my_registrations().await.unwrap().len(), 1);
    assert_eq!(client.events().await.unwrap().len(), 1);
}

#[tokio::test]
async fn attendee_revokes_an_upcoming_registration() {
    let (url, event_id) = serve().await;
    let client = ApiClient::new(url, AuthContext::new());
    client.signup("meera@example.com", "correct-horse", "Meera Iyer").await.unwrap();

    let registration = client.register(event_id).await.unwrap();
    let reply = client.revoke(registration.id).await.unwrap();
    assert!(reply.success);
    assert_eq!(reply.message, "Registration cancelled successfully!");
    assert!(client.my_registrations().await.unwrap().is_empty());

    match client.revoke(registration.id).await {
        Err(ClientError::Status { status: 404, .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }

    // Revoking frees the seat for a fresh registration.
    client.register(event_id).await.unwrap();
    assert_eq!(client.my_registrations().await.unwrap().len(), 1);
}
