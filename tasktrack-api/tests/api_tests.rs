/// End-to-end tests for the TaskTrack API
///
/// These drive the full router (access gate, extractors, handlers, error
/// mapping) in-process against the in-memory store:
/// - Authentication and role checks
/// - Project/task/subtask/comment lifecycle
/// - Search
/// - Notifications
/// - Error response shape

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{create_project, create_task, test_config, TestContext, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
    assert_eq!(body["deletion_policy"], "cascade");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.send("GET", "/tasks", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Missing authorization header");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.send("GET", "/projects", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/projects")
        .header("authorization", format!("Basic {}", ctx.user_token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = ctx.send_request(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Expected Bearer token");
}

#[tokio::test]
async fn test_admin_only_routes_forbid_users() {
    let ctx = TestContext::new().await.unwrap();
    let user_path = format!("/users/{}", ctx.user.id);

    for (method, uri) in [
        ("GET", "/users"),
        ("GET", "/users/roles"),
        ("DELETE", user_path.as_str()),
    ] {
        let (status, body) = ctx.as_user(method, uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body["error"], "forbidden");
    }

    let (status, _) = ctx
        .as_user(
            "POST",
            "/users",
            Some(json!({"name": "X", "email": "x@example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_manages_users() {
    let ctx = TestContext::new().await.unwrap();

    let (status, users) = ctx.as_admin("GET", "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert!(users[0].get("password_hash").is_none());

    let (status, roles) = ctx.as_admin("GET", "/users/roles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roles[0]["name"], "admin");
    assert_eq!(roles[1]["name"], "user");

    let (status, created) = ctx
        .as_admin(
            "POST",
            "/users",
            Some(json!({
                "name": "Second Admin",
                "email": "second@example.com",
                "password": PASSWORD,
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "admin");

    let uri = format!("/users/{}", created["id"].as_str().unwrap());
    let (status, updated) = ctx
        .as_admin("PUT", &uri, Some(json!({"name": "Renamed", "role": "user"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["role"], "user");

    let (status, body) = ctx.as_admin("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");

    let (status, _) = ctx.as_admin("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_role_is_validation_error() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .as_admin(
            "POST",
            "/users",
            Some(json!({
                "name": "Owner",
                "email": "owner@example.com",
                "password": PASSWORD,
                "role": "owner"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "role");
}

#[tokio::test]
async fn test_register_and_login() {
    let ctx = TestContext::new().await.unwrap();

    // A role in the body is ignored
    let (status, body) = ctx
        .send(
            "POST",
            "/users/register",
            None,
            Some(json!({
                "name": "Jane Doe",
                "email": "jane@example.com",
                "password": "SecureP@ss123",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["token"].is_string());

    let (status, body) = ctx
        .send(
            "POST",
            "/users/login",
            None,
            Some(json!({"email": "JANE@example.com", "password": "SecureP@ss123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = ctx.send("GET", "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "jane@example.com");

    let (status, body) = ctx
        .send(
            "POST",
            "/users/login",
            None,
            Some(json!({"email": "jane@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_register_validation_and_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            "/users/register",
            None,
            Some(json!({"name": "Bad", "email": "not-an-email", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, body) = ctx
        .send(
            "POST",
            "/users/register",
            None,
            Some(json!({"name": "Dup", "email": "user@example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_registered_token_opens_protected_routes() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            "/users/register",
            None,
            Some(json!({
                "name": "Sam",
                "email": "  sam@example.com ",
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["email"], "sam@example.com");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = ctx.send("GET", "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], body["user"]["id"]);

    let (status, _) = ctx.send("GET", "/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.send("GET", "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_head_follows_get_access_rules() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.as_user("HEAD", "/tasks", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.as_user("HEAD", "/users", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.send("HEAD", "/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_user_token_stops_working() {
    let ctx = TestContext::new().await.unwrap();

    let uri = format!("/users/{}", ctx.user.id);
    let (status, _) = ctx.as_admin("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.as_user("GET", "/projects", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unknown user");
}

#[tokio::test]
async fn test_project_dates_are_validated() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .as_user(
            "POST",
            "/projects",
            Some(json!({
                "name": "Backwards",
                "start_date": "2024-06-01",
                "end_date": "2024-05-01"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "end_date");

    let project = create_project(&ctx, "Forwards", "").await;
    let uri = format!("/projects/{}", project["id"].as_str().unwrap());

    let (status, _) = ctx
        .as_user("PATCH", &uri, Some(json!({"end_date": "2023-01-01"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = ctx
        .as_user("PATCH", &uri, Some(json!({"name": "Renamed"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
}

#[tokio::test]
async fn test_task_lifecycle() {
    let ctx = TestContext::new().await.unwrap();
    let project = create_project(&ctx, "Alpha Launch", "First public release").await;
    let project_id = project["id"].as_str().unwrap();

    let task = create_task(&ctx, project_id, "Fix login bug").await;
    assert_eq!(task["status"], "Open");
    assert_eq!(task["priority"], "Medium");
    assert_eq!(task["created_by"], ctx.user.id.to_string());

    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = ctx
        .as_user(
            "PATCH",
            &uri,
            Some(json!({
                "status": "done",
                "priority": "high",
                "assignee_id": ctx.admin.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Done");
    assert_eq!(updated["assignee_id"], ctx.admin.id.to_string());

    // Unconstrained by default
    let (status, reopened) = ctx
        .as_user("PATCH", &uri, Some(json!({"status": "open", "assignee_id": null})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "Open");
    assert!(reopened["assignee_id"].is_null());

    let (status, tasks) = ctx
        .as_user("GET", &format!("/projects/{}/tasks", project_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 1);

    let (status, body) = ctx.as_user("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted");

    let (status, body) = ctx.as_user("GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_task_validation() {
    let ctx = TestContext::new().await.unwrap();
    let project = create_project(&ctx, "Project", "").await;

    let (status, body) = ctx
        .as_user(
            "POST",
            "/tasks",
            Some(json!({
                "title": "",
                "priority": "urgent",
                "project_id": uuid::Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"priority"));
    assert!(fields.contains(&"project_id"));

    let (status, body) = ctx
        .as_user(
            "POST",
            "/tasks",
            Some(json!({
                "title": "Assigned to nobody",
                "project_id": project["id"],
                "assignee_id": uuid::Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "assignee_id");
}

#[tokio::test]
async fn test_missing_task_is_not_found() {
    let ctx = TestContext::new().await.unwrap();

    let uri = format!("/tasks/{}", uuid::Uuid::new_v4());
    let (status, _) = ctx.as_user("GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .as_user("PATCH", &uri, Some(json!({"title": "Ghost"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let ctx = TestContext::new().await.unwrap();

    for method in ["GET", "DELETE"] {
        let (status, body) = ctx.as_user(method, "/tasks/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", method);
        assert_eq!(body["error"], "not_found");
    }

    let (status, _) = ctx
        .as_user("PATCH", "/projects/42", Some(json!({"name": "X"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.as_user("GET", "/tasks/not-a-uuid/subtasks", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/projects")
        .header("authorization", format!("Bearer {}", ctx.user_token))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = ctx.send_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = ctx.as_user("GET", "/tasks?page=first", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subtasks_and_comments() {
    let ctx = TestContext::new().await.unwrap();
    let project = create_project(&ctx, "Project", "").await;
    let task = create_task(&ctx, project["id"].as_str().unwrap(), "Parent").await;
    let task_uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, subtask) = ctx
        .as_user(
            "POST",
            &format!("{}/subtasks", task_uri),
            Some(json!({"title": "Write tests"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subtask["is_complete"], false);

    let subtask_uri = format!("{}/subtasks/{}", task_uri, subtask["id"].as_str().unwrap());
    let (status, done) = ctx
        .as_user("PATCH", &subtask_uri, Some(json!({"is_complete": true})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["is_complete"], true);

    let (status, fetched) = ctx.as_user("GET", &subtask_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Write tests");

    let (status, _) = ctx.as_user("DELETE", &subtask_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.as_user("GET", &subtask_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let comments_uri = format!("{}/comments", task_uri);
    let (status, _) = ctx
        .as_user("POST", &comments_uri, Some(json!({"content": "   "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comment) = ctx
        .as_user("POST", &comments_uri, Some(json!({"content": " Looks good "})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["content"], "Looks good");
    assert_eq!(comment["user_id"], ctx.user.id.to_string());

    let (status, comments) = ctx.as_user("GET", &comments_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().unwrap().len(), 1);

    let missing = format!("/tasks/{}/comments", uuid::Uuid::new_v4());
    let (status, _) = ctx.as_user("GET", &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_membership() {
    let ctx = TestContext::new().await.unwrap();
    let project = create_project(&ctx, "Team", "").await;
    let members_uri = format!("/projects/{}/members", project["id"].as_str().unwrap());
    let member_uri = format!("{}/{}", members_uri, ctx.admin.id);

    let (status, _) = ctx.as_user("POST", &member_uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = ctx.as_user("POST", &member_uri, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, members) = ctx.as_user("GET", &members_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 1);
    assert_eq!(members[0]["id"], ctx.admin.id.to_string());

    let (status, _) = ctx.as_user("DELETE", &member_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.as_user("DELETE", &member_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search() {
    let ctx = TestContext::new().await.unwrap();
    let project = create_project(&ctx, "Alpha Launch", "First public release").await;
    let task = create_task(&ctx, project["id"].as_str().unwrap(), "Fix login bug").await;

    let (status, results) = ctx.as_user("GET", "/search?query=alpha", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results.as_array().unwrap().len(), 1);
    assert_eq!(results[0]["type"], "project");
    assert_eq!(results[0]["id"], project["id"]);
    assert_eq!(results[0]["title"], "Alpha Launch");

    let (status, results) = ctx.as_user("GET", "/search?query=LOGIN", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results[0]["type"], "task");
    assert_eq!(results[0]["id"], task["id"]);

    for uri in ["/search", "/search?query=", "/search?query=%20%20"] {
        let (status, results) = ctx.as_user("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(results, json!([]));
    }

    let (status, _) = ctx.send("GET", "/search?query=alpha", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_notifications() {
    let ctx = TestContext::new().await.unwrap();

    let (status, notification) = ctx
        .as_admin(
            "POST",
            "/notifications",
            Some(json!({
                "user_id": ctx.user.id,
                "type": "task_assigned",
                "content": "You have a new task"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(notification["type"], "task_assigned");
    assert_eq!(notification["is_read"], false);

    let (status, mine) = ctx.as_user("GET", "/notifications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, theirs) = ctx.as_admin("GET", "/notifications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(theirs, json!([]));

    let read_uri = format!("/notifications/{}/read", notification["id"].as_str().unwrap());
    let (status, _) = ctx.as_admin("PATCH", &read_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, read) = ctx.as_user("PATCH", &read_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["is_read"], true);
}

#[tokio::test]
async fn test_strict_transitions() {
    let ctx = TestContext::with_config(test_config(&[("TASK_TRANSITIONS", "strict")]))
        .await
        .unwrap();
    let project = create_project(&ctx, "Project", "").await;
    let task = create_task(&ctx, project["id"].as_str().unwrap(), "One way").await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, _) = ctx
        .as_user("PATCH", &uri, Some(json!({"status": "done"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .as_user("PATCH", &uri, Some(json!({"status": "open"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "status");
}

#[tokio::test]
async fn test_restrict_deletion_refuses_project_with_tasks() {
    let ctx = TestContext::with_config(test_config(&[("DELETION_POLICY", "restrict")]))
        .await
        .unwrap();
    let project = create_project(&ctx, "Busy", "").await;
    let project_id = project["id"].as_str().unwrap();
    let task = create_task(&ctx, project_id, "Blocking task").await;

    let project_uri = format!("/projects/{}", project_id);
    let (status, body) = ctx.as_user("DELETE", &project_uri, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "conflict");

    let (status, _) = ctx
        .as_user("DELETE", &format!("/tasks/{}", task["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.as_user("DELETE", &project_uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cascade_deletion_removes_tasks() {
    let ctx = TestContext::new().await.unwrap();
    let project = create_project(&ctx, "Doomed", "").await;
    let project_id = project["id"].as_str().unwrap();
    let task = create_task(&ctx, project_id, "Goes too").await;

    let (status, _) = ctx
        .as_user("DELETE", &format!("/projects/{}", project_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .as_user("GET", &format!("/tasks/{}", task["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_paging() {
    let ctx = TestContext::new().await.unwrap();
    for name in ["One", "Two", "Three"] {
        create_project(&ctx, name, "").await;
    }

    let (_, all) = ctx.as_user("GET", "/projects", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (status, page) = ctx
        .as_user("GET", "/projects?page=2&page_size=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["id"], all[2]["id"]);
}

#[tokio::test]
async fn test_security_headers_on_responses() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
}
