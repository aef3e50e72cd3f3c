//! Dashboard routes driven through the full router.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use foodcoop_core::{GroupKind, TransactionSort};
use foodcoop_integration_tests::{OTHER_SCOPE, SCOPE, TestApp, transaction_ids};
use foodcoop_web::db::{GroupStore, UserStore};

const PROTECTED: [&str; 6] = [
    "/f/home",
    "/f/home/profile",
    "/f/home/update_profile",
    "/f/home/reference_calculator",
    "/f/home/ordergroup",
    "/f/home/cancel_membership?group_id=1",
];

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_unauthenticated_requests_redirect_to_login() {
    let mut app = TestApp::new();

    for path in PROTECTED {
        let response = app.get(path).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.location(), Some("/f/login"), "{path}");
    }

    let login = app.get("/f/login").await;
    assert!(login.body.contains("Please log in to continue."));

    let response = app
        .post_form("/f/home/update_profile", &[("first_name", "Mallory")])
        .await;
    response.assert_redirect_to("/f/login");
}

#[tokio::test]
async fn test_login_with_wrong_password_rerenders_form() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;

    let response = app
        .post_form(
            "/f/login",
            &[("email", "ada@coop.example"), ("password", "wrong password")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid email or password."));
    assert!(response.body.contains("value=\"ada@coop.example\""));

    app.get("/f/home").await.assert_redirect_to("/f/login");
}

#[tokio::test]
async fn test_login_then_logout() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app.get("/f/home").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Hello Ada!"));

    app.post_form("/f/logout", &[])
        .await
        .assert_redirect_to("/f/login");
    app.get("/f/home").await.assert_redirect_to("/f/login");
}

#[tokio::test]
async fn test_session_is_bound_to_its_scope() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    app.get(&format!("/{OTHER_SCOPE}/home"))
        .await
        .assert_redirect_to(&format!("/{OTHER_SCOPE}/login"));
}

#[tokio::test]
async fn test_unknown_scope_is_not_found() {
    let mut app = TestApp::new();
    assert_eq!(app.get("/nowhere/home").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/nowhere/login").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scope_root_redirects_to_dashboard() {
    let mut app = TestApp::new();
    app.get("/f").await.assert_redirect_to("/f/home");
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");

    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_lists_tasks() {
    use foodcoop_web::db::TaskStore;
    use foodcoop_web::models::task::NewTask;

    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let today = Utc::now().date_naive();

    let new_task = |name: &str, days: i64| NewTask {
        name: name.to_string(),
        description: None,
        due_date: Some(today + Duration::days(days)),
        required_users: 1,
        workgroup_id: None,
    };

    let sorting = app.store.create_task(&new_task("Sort apples", 2)).await.unwrap();
    app.store.assign(sorting.id, ada.id, false).await.unwrap();
    let cleaning = app.store.create_task(&new_task("Clean shelves", 1)).await.unwrap();
    app.store.assign(cleaning.id, ada.id, true).await.unwrap();
    app.store.create_task(&new_task("Pick up crates", 3)).await.unwrap();
    app.store.create_task(&new_task("Annual meeting", 60)).await.unwrap();

    app.login(SCOPE, "ada@coop.example").await;
    let response = app.get("/f/home").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = &response.body;
    let section = |id: &str| {
        let start = body.find(&format!("id=\"{id}\"")).unwrap();
        let end = body[start..].find("</section>").unwrap() + start;
        body[start..end].to_string()
    };
    assert!(section("unaccepted-tasks").contains("Sort apples"));
    assert!(section("next-tasks").contains("Clean shelves"));
    assert!(section("unassigned-tasks").contains("Pick up crates"));
    assert!(!body.contains("Annual meeting"));
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_show_profile() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let team = app.create_group("Cheese team", GroupKind::Workgroup).await;
    app.join(&ada, &team).await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app.get("/f/home/profile").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("value=\"ada@coop.example\""));
    assert!(response.body.contains("Cheese team"));
    assert!(
        response
            .body
            .contains(&format!("cancel_membership?group_id={}", team.id))
    );
}

#[tokio::test]
async fn test_update_profile_with_unchanged_attributes() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app
        .post_form(
            "/f/home/update_profile",
            &[("first_name", "Ada"), ("email", "ada@coop.example")],
        )
        .await;
    response.assert_redirect_to("/f/home/profile");
    assert_eq!(app.reload(&ada).await, ada);
}

#[tokio::test]
async fn test_update_profile_with_changed_attributes() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app
        .post_form(
            "/f/home/update_profile",
            &[
                ("first_name", "Augusta"),
                ("email", "augusta@coop.example"),
                ("phone", "+44 20 7946 0000"),
            ],
        )
        .await;
    response.assert_redirect_to("/f/home/profile");

    let stored = app.reload(&ada).await;
    assert_eq!(stored.first_name, "Augusta");
    assert_eq!(stored.email.as_str(), "augusta@coop.example");
    assert_eq!(stored.phone.as_deref(), Some("+44 20 7946 0000"));

    let page = app.get("/f/home/profile").await;
    assert!(page.body.contains("Your changes have been saved."));

    // Shown once
    let page = app.get("/f/home/profile").await;
    assert!(!page.body.contains("Your changes have been saved."));
}

#[tokio::test]
async fn test_update_profile_with_invalid_email() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app
        .post_form(
            "/f/home/update_profile",
            &[("first_name", "Augusta"), ("email", "e.mail.com")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("id=\"profile-errors\""));
    assert!(response.body.contains("data-field=\"email\""));
    assert!(response.body.contains("value=\"e.mail.com\""));

    assert_eq!(app.reload(&ada).await, ada);
}

#[tokio::test]
async fn test_update_profile_with_taken_email() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    app.create_member("Grace", "grace@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app
        .post_form("/f/home/update_profile", &[("email", "grace@coop.example")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("has already been taken"));
    assert_eq!(app.reload(&ada).await, ada);
}

#[tokio::test]
async fn test_update_profile_via_get_and_patch() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    app.get("/f/home/update_profile?last_name=Byron")
        .await
        .assert_redirect_to("/f/home/profile");
    assert_eq!(app.reload(&ada).await.last_name, "Byron");

    app.patch_form("/f/home/profile", &[("last_name", "King")])
        .await
        .assert_redirect_to("/f/home/profile");
    assert_eq!(app.reload(&ada).await.last_name, "King");
}

#[tokio::test]
async fn test_update_profile_via_get_ignores_password() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;
    let (_, hash_before) = app
        .store
        .get_password_hash("ada@coop.example")
        .await
        .unwrap()
        .unwrap();

    app.get(
        "/f/home/update_profile?password=hunter2hunter2&password_confirmation=hunter2hunter2",
    )
    .await
    .assert_redirect_to("/f/home/profile");

    let (_, hash_after) = app
        .store
        .get_password_hash("ada@coop.example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hash_before, hash_after);

    app.post_form("/f/logout", &[]).await;
    let response = app
        .post_form(
            "/f/login",
            &[("email", "ada@coop.example"), ("password", "hunter2hunter2")],
        )
        .await;
    assert!(response.body.contains("Invalid email or password."));
    app.login(SCOPE, "ada@coop.example").await;
}

#[tokio::test]
async fn test_update_profile_changes_password_from_form_body() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    app.patch_form(
        "/f/home/update_profile",
        &[
            ("password", "hunter2hunter2"),
            ("password_confirmation", "hunter2hunter2"),
        ],
    )
    .await
    .assert_redirect_to("/f/home/profile");

    app.post_form("/f/logout", &[]).await;
    app.post_form(
        "/f/login",
        &[("email", "ada@coop.example"), ("password", "hunter2hunter2")],
    )
    .await
    .assert_redirect_to("/f/home");
}

#[tokio::test]
async fn test_update_profile_changes_ordergroup_contact_address() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let household = app.create_group("Lovelace", GroupKind::Ordergroup).await;
    app.join(&ada, &household).await;
    app.login(SCOPE, "ada@coop.example").await;

    app.post_form("/f/home/update_profile", &[("contact_address", "St James's Square 12")])
        .await
        .assert_redirect_to("/f/home/profile");

    let stored = app.store.get_group(household.id).await.unwrap().unwrap();
    assert_eq!(stored.contact_address.as_deref(), Some("St James's Square 12"));
}

// =============================================================================
// Reference calculator
// =============================================================================

#[tokio::test]
async fn test_reference_calculator_for_ordergroup_member() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let household = app.create_group("Lovelace", GroupKind::Ordergroup).await;
    app.join(&ada, &household).await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app.get("/f/home/reference_calculator").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .body
            .contains(&format!("FS{}.{}", household.id, ada.id))
    );
    assert!(response.body.contains("DE02120300000000202051"));
}

#[tokio::test]
async fn test_reference_calculator_without_ordergroup_redirects_home() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    app.get("/f/home/reference_calculator")
        .await
        .assert_redirect_to("/f/home");
}

// =============================================================================
// Ordergroup
// =============================================================================

#[tokio::test]
async fn test_ordergroup_without_membership_redirects_home() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    app.login(SCOPE, "ada@coop.example").await;

    app.get("/f/home/ordergroup")
        .await
        .assert_redirect_to("/f/home");
}

#[tokio::test]
async fn test_ordergroup_transactions_in_every_sort_order() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let household = app.create_group("Lovelace", GroupKind::Ordergroup).await;
    app.join(&ada, &household).await;

    let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let a = app
        .book(&household, &ada, "A", Decimal::new(100, 2), earlier)
        .await;
    let b = app
        .book(&household, &ada, "B", Decimal::new(2000, 2), earlier + Duration::days(1))
        .await;
    let forward = vec![a.id.as_i32(), b.id.as_i32()];
    let backward = vec![b.id.as_i32(), a.id.as_i32()];

    app.login(SCOPE, "ada@coop.example").await;

    for sort in TransactionSort::ALL {
        let response = app
            .get(&format!("/f/home/ordergroup?sort={}", sort.as_str()))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{sort:?}");

        let expected = if sort.is_reverse() { &backward } else { &forward };
        assert_eq!(&transaction_ids(&response.body), expected, "{sort:?}");
    }
}

#[tokio::test]
async fn test_ordergroup_defaults_to_newest_first() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let household = app.create_group("Lovelace", GroupKind::Ordergroup).await;
    app.join(&ada, &household).await;

    let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let a = app
        .book(&household, &ada, "A", Decimal::new(100, 2), earlier)
        .await;
    let b = app
        .book(&household, &ada, "B", Decimal::new(-250, 2), earlier + Duration::hours(2))
        .await;

    app.login(SCOPE, "ada@coop.example").await;

    for path in ["/f/home/ordergroup", "/f/home/ordergroup?sort=sideways"] {
        let response = app.get(path).await;
        assert_eq!(
            transaction_ids(&response.body),
            vec![b.id.as_i32(), a.id.as_i32()],
            "{path}"
        );
        assert!(response.body.contains("id=\"balance\">-1.50<"));
    }
}

// =============================================================================
// Cancel membership
// =============================================================================

#[tokio::test]
async fn test_cancel_membership_without_membership() {
    let mut app = TestApp::new();
    app.create_member("Ada", "ada@coop.example").await;
    let team = app.create_group("Cheese team", GroupKind::Workgroup).await;
    app.login(SCOPE, "ada@coop.example").await;

    let response = app
        .post_form(&format!("/f/home/cancel_membership?group_id={}", team.id), &[])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/f/home/cancel_membership").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_membership_removes_it() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let team = app.create_group("Cheese team", GroupKind::Workgroup).await;
    app.join(&ada, &team).await;
    app.login(SCOPE, "ada@coop.example").await;

    app.post_form(&format!("/f/home/cancel_membership?group_id={}", team.id), &[])
        .await
        .assert_redirect_to("/f/home/profile");

    assert!(
        app.store
            .find_membership_by_group(ada.id, team.id)
            .await
            .unwrap()
            .is_none()
    );

    let page = app.get("/f/home/profile").await;
    assert!(page.body.contains("You are no longer a member of Cheese team."));
}

#[tokio::test]
async fn test_cancel_membership_by_membership_id() {
    let mut app = TestApp::new();
    let ada = app.create_member("Ada", "ada@coop.example").await;
    let grace = app.create_member("Grace", "grace@coop.example").await;
    let team = app.create_group("Cheese team", GroupKind::Workgroup).await;
    app.join(&ada, &team).await;
    app.join(&grace, &team).await;

    let graces = app
        .store
        .find_membership_by_group(grace.id, team.id)
        .await
        .unwrap()
        .unwrap();
    let adas = app
        .store
        .find_membership_by_group(ada.id, team.id)
        .await
        .unwrap()
        .unwrap();

    app.login(SCOPE, "ada@coop.example").await;

    // Someone else's membership
    let response = app
        .get(&format!(
            "/f/home/cancel_membership?membership_id={}",
            graces.membership.id
        ))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    app.get(&format!(
        "/f/home/cancel_membership?membership_id={}",
        adas.membership.id
    ))
    .await
    .assert_redirect_to("/f/home/profile");

    assert_eq!(app.store.group_members(team.id).await.unwrap(), vec![grace]);
}
