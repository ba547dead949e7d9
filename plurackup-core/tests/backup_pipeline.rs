mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use common::{at, directory, post, reply};
use plurackup_core::backup::{backup, build_renderers, Credentials};
use plurackup_core::config::{BackupConfig, OutputConfig, OutputFormat};
use plurackup_core::contract::{
    LoginOutcome, MockPlurkApi, PlurkApi, PostsPage, RepliesOutcome, RepliesPage,
};
use plurackup_core::error::{BackupError, ClientError};
use plurackup_core::model::Identity;
use tempfile::tempdir;

fn credentials() -> Credentials {
    Credentials {
        username: "alice".to_string(),
        password: "s3cret".to_string(),
    }
}

fn config_in(dir: &std::path::Path, formats: Vec<OutputFormat>) -> BackupConfig {
    let mut config = BackupConfig::default();
    config.output.formats = formats;
    config.output.basename = Some(dir.join("alice"));
    config.output.stylesheet = dir.join("style.css");
    config
}

#[tokio::test]
async fn full_run_writes_every_selected_format() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), vec![OutputFormat::Xml, OutputFormat::Html]);

    let pages = Arc::new(Mutex::new(VecDeque::from(vec![PostsPage {
        posts: vec![post(2, at(2, 0)), post(1, at(1, 0))],
        identities: directory(&[(100, "alice")]),
    }])));

    let mut api = MockPlurkApi::new();
    api.expect_login()
        .times(1)
        .returning(|username, password| {
            assert_eq!(username, "alice");
            assert_eq!(password, "s3cret");
            Ok(LoginOutcome::Authenticated(Identity::new(
                "alice",
                Some("Alice".to_string()),
            )))
        });
    api.expect_fetch_own_posts()
        .times(2)
        .returning(move |_, _| Ok(pages.lock().unwrap().pop_front().unwrap_or_default()));
    api.expect_fetch_replies().times(2).returning(|plurk_id, _| {
        Ok(RepliesOutcome::Replies(RepliesPage {
            replies: vec![reply(plurk_id * 100, 5, at(3, 0))],
            identities: directory(&[(5, "five")]),
        }))
    });
    api.expect_logout().times(1).returning(|| Ok(()));

    let api: Arc<dyn PlurkApi> = Arc::new(api);
    let report = backup(&config, api, &credentials()).await.unwrap();

    assert_eq!(report.owner.display_name, "Alice");
    assert_eq!(report.pages, 1);
    assert_eq!(report.plurks, 2);
    assert_eq!(report.responses, 2);
    assert_eq!(report.identities, 2);
    assert_eq!(
        report.files,
        vec![dir.path().join("alice.xml"), dir.path().join("alice.html")]
    );

    let xml = std::fs::read_to_string(dir.path().join("alice.xml")).unwrap();
    let first = xml.find("<plurk id=\"1\"").unwrap();
    let second = xml.find("<plurk id=\"2\"").unwrap();
    assert!(first < second, "oldest plurk must come first");
    assert!(xml.contains("<response id=\"200\""));

    let html = std::fs::read_to_string(dir.path().join("alice.html")).unwrap();
    assert!(html.contains("<title>Alice's plurk Backup</title>"));
    assert!(html.contains("class=\"plurk_name\">five</a>"));
}

#[tokio::test]
async fn rejected_login_writes_nothing() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), vec![OutputFormat::Xml, OutputFormat::Html]);

    let mut api = MockPlurkApi::new();
    api.expect_login()
        .times(1)
        .returning(|_, _| Ok(LoginOutcome::Rejected("Invalid login".to_string())));
    api.expect_fetch_own_posts().never();
    api.expect_fetch_replies().never();
    api.expect_logout().never();

    let api: Arc<dyn PlurkApi> = Arc::new(api);
    let err = backup(&config, api, &credentials()).await.unwrap_err();

    assert!(matches!(err, BackupError::Authentication(ref reason) if reason == "Invalid login"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_format_selection_is_rejected_before_login() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), Vec::new());

    let mut api = MockPlurkApi::new();
    api.expect_login().never();

    let api: Arc<dyn PlurkApi> = Arc::new(api);
    let err = backup(&config, api, &credentials()).await.unwrap_err();
    assert!(matches!(err, BackupError::NoOutputFormat));
}

#[tokio::test]
async fn empty_timeline_still_produces_empty_documents() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), vec![OutputFormat::Xml]);

    let mut api = MockPlurkApi::new();
    api.expect_login()
        .returning(|_, _| Ok(LoginOutcome::Authenticated(Identity::new("alice", None))));
    api.expect_fetch_own_posts()
        .times(1)
        .returning(|_, _| Ok(PostsPage::default()));
    api.expect_fetch_replies().never();
    api.expect_logout().times(1).returning(|| Ok(()));

    let api: Arc<dyn PlurkApi> = Arc::new(api);
    let report = backup(&config, api, &credentials()).await.unwrap();

    assert_eq!(report.plurks, 0);
    let xml = std::fs::read_to_string(dir.path().join("alice.xml")).unwrap();
    assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<plurks>\n</plurks>");
}

fn bad_gateway(path: &str) -> ClientError {
    ClientError::Status {
        status: reqwest::StatusCode::BAD_GATEWAY,
        url: format!("http://www.plurk.com{path}"),
    }
}

fn logged_in_api() -> MockPlurkApi {
    let mut api = MockPlurkApi::new();
    api.expect_login()
        .times(1)
        .returning(|_, _| Ok(LoginOutcome::Authenticated(Identity::new("alice", None))));
    api.expect_logout().never();
    api
}

#[tokio::test]
async fn transport_failure_while_fetching_responses_aborts_without_output() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), vec![OutputFormat::Xml, OutputFormat::Html]);

    let pages = Arc::new(Mutex::new(VecDeque::from(vec![PostsPage {
        posts: vec![post(1, at(1, 0))],
        identities: Default::default(),
    }])));
    let mut api = logged_in_api();
    api.expect_fetch_own_posts()
        .returning(move |_, _| Ok(pages.lock().unwrap().pop_front().unwrap_or_default()));
    api.expect_fetch_replies()
        .returning(|_, _| Err(bad_gateway("/API/Responses/get")));

    let api: Arc<dyn PlurkApi> = Arc::new(api);
    let err = backup(&config, api, &credentials()).await.unwrap_err();

    assert!(matches!(err, BackupError::Client(ClientError::Status { .. })), "got {err:?}");
    assert!(!dir.path().join("alice.xml").exists());
    assert!(!dir.path().join("alice.html").exists());
}

#[tokio::test]
async fn transport_failure_on_a_later_page_aborts_without_output_or_logout() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path(), vec![OutputFormat::Xml, OutputFormat::Html]);

    let page_calls = Arc::new(Mutex::new(0u32));
    let mut api = logged_in_api();
    api.expect_fetch_own_posts().returning(move |_, _| {
        let mut calls = page_calls.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            Ok(PostsPage {
                posts: vec![post(2, at(2, 0)), post(1, at(1, 0))],
                identities: Default::default(),
            })
        } else {
            Err(bad_gateway("/API/Timeline/getPlurks"))
        }
    });
    api.expect_fetch_replies().returning(|_, _| {
        Ok(RepliesOutcome::Replies(RepliesPage::default()))
    });

    let api: Arc<dyn PlurkApi> = Arc::new(api);
    let err = backup(&config, api, &credentials()).await.unwrap_err();

    assert!(matches!(err, BackupError::Client(ClientError::Status { .. })), "got {err:?}");
    assert!(!dir.path().join("alice.xml").exists());
    assert!(!dir.path().join("alice.html").exists());
}

#[test]
fn duplicate_formats_build_one_renderer_each() {
    let dir = tempdir().unwrap();
    let output = OutputConfig {
        formats: vec![OutputFormat::Html, OutputFormat::Xml, OutputFormat::Html],
        basename: Some(dir.path().join("me")),
        ..OutputConfig::default()
    };
    let (renderers, files) = build_renderers(&output, &Identity::new("alice", None)).unwrap();
    assert_eq!(renderers.len(), 2);
    assert_eq!(files, vec![dir.path().join("me.html"), dir.path().join("me.xml")]);
}
