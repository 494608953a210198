//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through the default `UreqTransport`. Validates
//! that request building, auth, status mapping and decoding agree with the
//! server's wire format.

use std::net::SocketAddr;
use std::time::Duration;

use swu_core::{
    ApiError, Attachment, DripCampaign, Email, LogQuery, Recipient, Sender, SwuClient, Version,
};

/// Starts the mock server in a background thread and returns its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr) -> SwuClient {
    SwuClient::builder("test_key")
        .base_url(format!("http://{addr}/api/v1"))
        .timeout(Duration::from_secs(5))
        .build()
}

#[test]
fn email_lifecycle() {
    let addr = start_server();
    let client = client(addr);

    // Step 1: no templates yet.
    let templates = client.list_templates().unwrap();
    assert!(templates.is_empty(), "expected empty list");

    // Step 2: create a template.
    let first = Version {
        name: "Welcome".to_string(),
        subject: "Hello {{ name }}".to_string(),
        html: "<p>Hello</p>".to_string(),
        ..Default::default()
    };
    let template = client.create_template(&first).unwrap();
    assert_eq!(template.name, "Welcome");
    assert_eq!(template.versions.len(), 1);
    let first_id = template.versions[0].id.clone();

    // Step 3: add a version; server order is kept.
    let second = Version {
        name: "Welcome v2".to_string(),
        subject: "Hi {{ name }}".to_string(),
        ..Default::default()
    };
    let template = client.create_template_version(&template.id, &second).unwrap();
    let names: Vec<&str> = template.versions.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["Welcome", "Welcome v2"]);

    // Step 4: update and read back the first version.
    let patch = Version {
        text: "Hello".to_string(),
        published: true,
        ..Default::default()
    };
    let updated = client
        .update_template_version(&template.id, &first_id, &patch)
        .unwrap();
    assert_eq!(updated.text, "Hello");
    assert_eq!(updated.subject, "Hello {{ name }}");
    assert!(updated.published);

    let fetched = client.get_template_version(&template.id, &first_id).unwrap();
    assert_eq!(fetched, updated);

    let fetched_template = client.get_template(&template.id).unwrap();
    assert_eq!(fetched_template.id, template.id);
    assert_eq!(client.list_emails().unwrap().len(), 1);

    // Step 5: send an email.
    let mut email = Email {
        id: template.id.clone(),
        recipient: Some(Recipient::new("ada@example.com").with_name("Ada")),
        sender: Some(Sender::new("ops@example.com").with_reply_to("noreply@example.com")),
        version_name: "Welcome v2".to_string(),
        files: vec![Attachment::from_bytes("notes.txt", b"remember")],
        ..Default::default()
    };
    email
        .email_data
        .insert("name".to_string(), serde_json::json!("Ada"));
    client.send(&email).unwrap();

    // Step 6: the send shows up in the logs.
    let logs = client
        .get_logs(&LogQuery {
            count: 10,
            created_gt: 1,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.recipient_address, "ada@example.com");
    assert_eq!(log.recipient_name, "Ada");
    assert_eq!(log.email_version, "Welcome v2");
    assert_eq!(log.event.object, "log");

    let single = client.get_log(&log.id).unwrap();
    assert_eq!(&single, log);

    let event = client.get_log_events(&log.id).unwrap();
    assert_eq!(event.kind, "sent");

    // Step 7: resend it.
    let resend = client.resend_log(&log.id).unwrap();
    assert!(resend.success);
    assert_eq!(resend.id, log.id);
    assert_eq!(resend.email.unwrap().version_name, "Welcome v2");

    // Step 8: drip campaign activation.
    let campaign = DripCampaign {
        recipient: Some(Recipient::new("ada@example.com")),
        locale: "en-US".to_string(),
        ..Default::default()
    };
    client.activate_drip_campaign("dc_onboarding", &campaign).unwrap();
}

#[test]
fn not_found_surfaces_status_and_body() {
    let addr = start_server();
    let client = client(addr);

    let err = client.get_template("tem_missing").unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 404, .. }));
    assert_eq!(err.message(), "template tem_missing not found");

    let err = client.resend_log("log_missing").unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn rejected_send_surfaces_400() {
    let addr = start_server();
    let client = client(addr);

    let err = client.send(&Email::default()).unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.message(), "recipient address is required");
}

#[test]
fn missing_api_key_is_unauthorized() {
    let addr = start_server();
    let client = SwuClient::builder("")
        .base_url(format!("http://{addr}/api/v1"))
        .build();

    let err = client.list_templates().unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(err.message(), "missing or invalid api key");
}

#[test]
fn redirects_are_not_followed() {
    let addr = start_server();
    let client = SwuClient::builder("test_key")
        .base_url(format!("http://{addr}"))
        .build();

    let err = client.list_templates().unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 308, .. }));
}

#[test]
fn unreachable_server_is_status_zero() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = client(addr);

    for _ in 0..3 {
        let err = client.list_templates().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status(), 0);
    }
}
