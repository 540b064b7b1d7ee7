//! Integration tests for per-user processing and skip semantics.

mod common;

use chrono::NaiveDate;
use common::{directory_role_member, group_member, mount_member_of, mount_user_profile, odata};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use entra_roles_export::{process_user, GraphClient, RoleCatalog, SkipReason, UserOutcome};

fn catalog(entries: &[(&str, &str)]) -> RoleCatalog {
    entries
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect()
}

fn snapshot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

#[tokio::test]
async fn a_fully_resolved_user_materializes_a_row() {
    let server = MockServer::start().await;
    mount_user_profile(&server, "u1", "Alice Example").await;
    mount_member_of(
        &server,
        "u1",
        odata(vec![
            directory_role_member("r1"),
            directory_role_member("r2"),
        ]),
    )
    .await;

    let graph = GraphClient::new(&server.uri()).unwrap();
    let outcome = process_user(
        &graph,
        "tenant-a",
        "u1",
        "token",
        &catalog(&[("r1", "Global Admin"), ("r2", "Reports Reader")]),
        snapshot_date(),
    )
    .await;

    match outcome {
        UserOutcome::Row(row) => {
            assert_eq!(row.tenant_id, "tenant-a");
            assert_eq!(row.user_id, "u1");
            assert_eq!(row.display_name, "Alice Example");
            assert_eq!(row.roles, "Global Admin, Reports Reader");
            assert_eq!(row.snapshot_date, snapshot_date());
        }
        other => panic!("expected a row, got {other:?}"),
    }
}

#[tokio::test]
async fn a_missing_profile_skips_the_user_without_fetching_roles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users/u2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // The roles lookup must never run for a user with no profile.
    Mock::given(method("GET"))
        .and(path("/v1.0/users/u2/memberOf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(odata(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let graph = GraphClient::new(&server.uri()).unwrap();
    let outcome = process_user(&graph, "tenant-a", "u2", "token", &catalog(&[]), snapshot_date())
        .await;

    assert!(matches!(
        outcome,
        UserOutcome::Skipped(SkipReason::ProfileNotFound)
    ));
}

#[tokio::test]
async fn unavailable_roles_skip_the_user_even_after_a_resolved_profile() {
    let server = MockServer::start().await;
    mount_user_profile(&server, "u3", "Bob Example").await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users/u3/memberOf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let graph = GraphClient::new(&server.uri()).unwrap();
    let outcome = process_user(&graph, "tenant-a", "u3", "token", &catalog(&[]), snapshot_date())
        .await;

    assert!(matches!(
        outcome,
        UserOutcome::Skipped(SkipReason::RolesUnavailable)
    ));
}

#[tokio::test]
async fn group_memberships_are_not_directory_roles() {
    let server = MockServer::start().await;
    mount_user_profile(&server, "u4", "Carol Example").await;
    mount_member_of(
        &server,
        "u4",
        odata(vec![group_member("g1"), directory_role_member("r1")]),
    )
    .await;

    let graph = GraphClient::new(&server.uri()).unwrap();
    let outcome = process_user(
        &graph,
        "tenant-a",
        "u4",
        "token",
        &catalog(&[("r1", "Global Admin")]),
        snapshot_date(),
    )
    .await;

    match outcome {
        UserOutcome::Row(row) => assert_eq!(row.roles, "Global Admin"),
        other => panic!("expected a row, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_directory_roles_render_as_an_empty_string() {
    let server = MockServer::start().await;
    mount_user_profile(&server, "u5", "Dave Example").await;
    mount_member_of(&server, "u5", odata(vec![group_member("g1")])).await;

    let graph = GraphClient::new(&server.uri()).unwrap();
    let outcome = process_user(&graph, "tenant-a", "u5", "token", &catalog(&[]), snapshot_date())
        .await;

    match outcome {
        UserOutcome::Row(row) => assert_eq!(row.roles, ""),
        other => panic!("expected a row, got {other:?}"),
    }
}

#[tokio::test]
async fn a_profile_without_a_display_name_falls_back_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users/u6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u6" })))
        .mount(&server)
        .await;
    mount_member_of(&server, "u6", odata(vec![])).await;

    let graph = GraphClient::new(&server.uri()).unwrap();
    let outcome = process_user(&graph, "tenant-a", "u6", "token", &catalog(&[]), snapshot_date())
        .await;

    match outcome {
        UserOutcome::Row(row) => assert_eq!(row.display_name, "Unknown"),
        other => panic!("expected a row, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unreachable_directory_is_a_request_failure_skip() {
    // Nothing listens on the discard port; the connection is refused.
    let graph = GraphClient::new("http://127.0.0.1:9").unwrap();
    let outcome = process_user(&graph, "tenant-a", "u7", "token", &catalog(&[]), snapshot_date())
        .await;

    assert!(matches!(
        outcome,
        UserOutcome::Skipped(SkipReason::RequestFailed)
    ));
}
