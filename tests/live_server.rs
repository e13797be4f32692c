//! Runs the engine against a real IMAP/SMTP test server such as greenmail, which accepts any
//! user with the user name as password.
//!
//! ```text
//! docker run -p 3465:3465 -p 3993:3993 greenmail/standalone
//! cargo test --features live-server --test live_server
//! ```

use lettre::message::header::ContentType;
use lettre::Transport;

use mailtoken::{Account, MailboxEngine};

fn test_host() -> String {
    std::env::var("TEST_HOST").unwrap_or("127.0.0.1".to_string())
}

fn test_imaps_port() -> u16 {
    std::env::var("TEST_IMAPS_PORT")
        .unwrap_or("3993".to_string())
        .parse()
        .unwrap_or(3993)
}

fn test_smtps_port() -> u16 {
    std::env::var("TEST_SMTPS_PORT")
        .unwrap_or("3465".to_string())
        .parse()
        .unwrap_or(3465)
}

fn account(user: &str) -> Account {
    Account::new(test_host(), user, user)
        .port(test_imaps_port())
        .accept_invalid_certs(true)
}

fn smtp(user: &str) -> lettre::SmtpTransport {
    use lettre::{
        transport::smtp::{
            authentication::Credentials,
            client::{Tls, TlsParameters},
        },
        SmtpTransport,
    };

    let creds = Credentials::new(user.to_string(), user.to_string());
    let hostname = test_host();
    let tls = TlsParameters::builder(hostname.clone())
        .dangerous_accept_invalid_certs(true)
        .dangerous_accept_invalid_hostnames(true)
        .build()
        .unwrap();
    SmtpTransport::builder_dangerous(hostname)
        .port(test_smtps_port())
        .tls(Tls::Wrapper(tls))
        .credentials(creds)
        .build()
}

fn send_html(to: &str, subject: &str, html: &str) {
    let e = lettre::message::Message::builder()
        .from("noreply@localhost".parse().unwrap())
        .to(to.parse().unwrap())
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .unwrap();
    smtp(to).send(&e).unwrap();
}

fn wait_for_delivery() {
    std::thread::sleep(std::time::Duration::from_millis(500));
}

#[test]
fn connect_and_find_nothing() {
    let engine = MailboxEngine::new(account("readonly-test@localhost"));
    let link = engine
        .retrieve_reset_link("No such subject anywhere", "https://app.localhost")
        .unwrap();
    assert_eq!(link, None);
}

#[test]
fn wrong_password_is_rejected() {
    let engine = MailboxEngine::new(
        Account::new(test_host(), "auth-test@localhost", "not-the-password")
            .port(test_imaps_port())
            .accept_invalid_certs(true),
    );
    // greenmail creates unknown users on first login with their name as password, so log in
    // properly once first
    MailboxEngine::new(account("auth-test@localhost"))
        .purge_matching("anything")
        .unwrap();

    match engine.purge_matching("anything") {
        Err(mailtoken::Error::Auth(_)) => {}
        other => panic!("expected an auth error, got {:?}", other),
    }
}

#[test]
fn reset_link_round_trip() {
    let to = "reset@localhost";
    let engine = MailboxEngine::new(account(to));
    engine.purge_matching("Reset your password").unwrap();

    send_html(
        to,
        "Reset your password",
        r#"<p>Hi,</p><a href="https://x/y?token=LIVE42">Reset</a>"#,
    );
    send_html(to, "Welcome aboard", "<p>Nothing to see here</p>");
    wait_for_delivery();

    let link = engine
        .retrieve_reset_link("Reset your password", "https://app.localhost")
        .unwrap();
    assert_eq!(
        link.as_deref(),
        Some("https://app.localhost/password/reset?token=LIVE42")
    );

    // the reset mail is gone, the other one is not
    assert_eq!(engine.purge_matching("Reset your password").unwrap(), 0);
    assert_eq!(engine.purge_matching("Welcome aboard").unwrap(), 1);
}

#[test]
fn purge_removes_every_match() {
    let to = "purge@localhost";
    let engine = MailboxEngine::new(account(to));
    engine.purge_matching("Newsletter").unwrap();

    for i in 0..3 {
        send_html(to, &format!("Newsletter #{}", i), "<p>news</p>");
    }
    wait_for_delivery();

    assert_eq!(engine.purge_matching("Newsletter").unwrap(), 3);
    assert!(engine.clean_mailbox("Newsletter"));
    assert_eq!(engine.purge_matching("Newsletter").unwrap(), 0);
}
