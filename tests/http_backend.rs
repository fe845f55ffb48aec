use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;

use classroom_client::backend::Backend;
use classroom_client::http::HttpBackend;
use classroom_client::models::{
    AssignmentDraft, AssignmentId, Credentials, GradeTarget, GradingData, StudentId, SubmissionId,
    SubmissionStatus,
};
use classroom_client::role::AssignmentScope;
use classroom_client::session::AuthSession;
use classroom_client::storage::{MemoryStore, SecureStore, AUTH_TOKEN_KEY};
use classroom_client::{AccessService, ClientError, Grade, Role};

const TOKEN: &str = "t-1";

fn teacher() -> Value {
    json!({
        "_id": "1",
        "name": "Demo Teacher",
        "email": "teacher@demo.com",
        "role": "teacher"
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer t-1")
}

fn rejected(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == "teacher@demo.com" && body["password"] == "123456" {
        Json(json!({ "token": TOKEN, "user": teacher() })).into_response()
    } else {
        rejected(StatusCode::UNAUTHORIZED, "Invalid credentials")
    }
}

async fn teacher_assignments(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected(StatusCode::UNAUTHORIZED, "Token expired");
    }
    Json(json!({
        "assignments": [{
            "_id": "a1",
            "title": "Algebra",
            "subject": "Math",
            "dueDate": "2024-12-30",
            "submissions": [
                { "_id": "s-old", "studentId": "ana@demo.com", "studentName": "Ana", "grade": "", "status": "submitted" },
                { "_id": "s-new", "studentId": "ana@demo.com", "studentName": "Ana", "comments": "proofs attached", "grade": "7/10", "status": "graded" }
            ]
        }]
    }))
    .into_response()
}

async fn create_assignment(Json(body): Json<Value>) -> Response {
    if body["title"] == "Duplicate" {
        return rejected(StatusCode::CONFLICT, "An assignment with that title exists");
    }
    rejected(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn grade(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    Json(json!({
        "submission": {
            "_id": id,
            "studentId": "ana@demo.com",
            "grade": body["grade"],
            "feedback": body["feedback"],
            "status": "graded"
        }
    }))
    .into_response()
}

async fn users(Query(params): Query<HashMap<String, String>>) -> Response {
    let role = params.get("role").cloned().unwrap_or_default();
    Json(json!({
        "users": [{ "_id": "9", "name": "Someone", "email": "someone@demo.com", "role": role }]
    }))
    .into_response()
}

async fn slow_profile() -> Response {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "user": teacher() })).into_response()
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(slow_profile))
        .route("/api/assignments/teacher", get(teacher_assignments))
        .route("/api/assignments", post(create_assignment))
        .route("/api/submissions/:id/grade", put(grade))
        .route("/api/users", get(users));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/api")
}

async fn backend() -> HttpBackend {
    HttpBackend::new(spawn_server().await, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn login_reads_token_envelope() {
    let backend = backend().await;
    let session = backend
        .login(&Credentials::new("teacher@demo.com", "123456"))
        .await
        .unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.user.role, Role::Teacher);
    assert_eq!(session.user.id.as_str(), "1");
}

#[tokio::test]
async fn rejected_login_is_invalid_credentials() {
    let backend = backend().await;
    let err = backend
        .login(&Credentials::new("teacher@demo.com", "000000"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::InvalidCredentials);
}

#[tokio::test]
async fn assignments_envelope_with_duplicate_submissions() {
    let backend = backend().await;
    let list = backend
        .list_assignments(TOKEN, AssignmentScope::Authored)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    let assignment = &list[0];
    assert_eq!(assignment.id.as_str(), "a1");
    assert_eq!(assignment.submissions.len(), 1);
    let ana = assignment.submission(&StudentId::from("ana@demo.com")).unwrap();
    assert_eq!(ana.id, Some(SubmissionId::from("s-new")));
    assert_eq!(ana.grade, Some(Grade::fraction(7.0, 10.0)));
}

#[tokio::test]
async fn server_messages_are_mapped() {
    let backend = backend().await;
    let err = backend
        .create_assignment(TOKEN, &AssignmentDraft::new("Duplicate", "Math"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Validation("An assignment with that title exists".into())
    );

    let err = backend
        .create_assignment(TOKEN, &AssignmentDraft::new("Other", "Math"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Server {
            status: 500,
            message: "database unavailable".into()
        }
    );
    assert!(err.is_retryable());

    // the fake server has no /assignments/{id} route
    let err = backend
        .delete_assignment(TOKEN, &AssignmentId::from("a1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn grade_travels_as_text() {
    let backend = backend().await;
    let target = GradeTarget {
        assignment_id: AssignmentId::from("a1"),
        student_id: StudentId::from("ana@demo.com"),
        submission_id: Some(SubmissionId::from("s-new")),
    };
    let graded = backend
        .grade_submission(TOKEN, &target, &GradingData::parse("9/10", "Great").unwrap())
        .await
        .unwrap();
    assert_eq!(graded.grade.unwrap().to_string(), "9/10");
    assert_eq!(graded.feedback, "Great");

    let local_only = GradeTarget {
        submission_id: None,
        ..target
    };
    assert!(matches!(
        backend
            .grade_submission(TOKEN, &local_only, &GradingData::parse("9/10", "").unwrap())
            .await,
        Err(ClientError::NotFound { .. })
    ));
}

#[tokio::test]
async fn regrading_keeps_the_students_hand_in() {
    let mut svc = AccessService::new(backend().await, MemoryStore::new());
    svc.login(&Credentials::new("teacher@demo.com", "123456"))
        .await
        .unwrap();
    svc.list_assignments().await.unwrap();

    let id = AssignmentId::from("a1");
    let ana = StudentId::from("ana@demo.com");
    // the grade reply carries neither studentName nor comments
    svc.grade_submission(&id, &ana, GradingData::parse("9/10", "Great").unwrap())
        .await
        .unwrap();

    let graded = svc.store().submission(&id, &ana).unwrap();
    assert_eq!(graded.student_name, "Ana");
    assert_eq!(graded.comments, "proofs attached");
    assert_eq!(graded.grade, Some(Grade::fraction(9.0, 10.0)));
    assert_eq!(graded.feedback, "Great");
    assert_eq!(graded.status, SubmissionStatus::Graded);
    assert_eq!(graded.id, Some(SubmissionId::from("s-new")));
    assert_eq!(svc.stats().average_grade, 9.0);
}

#[tokio::test]
async fn users_are_filtered_by_query() {
    let backend = backend().await;
    let users = backend.users_by_role(TOKEN, Role::Student).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].role, Role::Student);
}

#[tokio::test]
async fn slow_server_is_a_connectivity_error() {
    let backend = HttpBackend::new(spawn_server().await, Duration::from_millis(200)).unwrap();
    let err = backend.profile(TOKEN).await.unwrap_err();
    assert!(matches!(err, ClientError::Connectivity(_)), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let backend = HttpBackend::new(format!("http://{addr}/api"), Duration::from_secs(1)).unwrap();
    let err = backend
        .login(&Credentials::new("teacher@demo.com", "123456"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Connectivity(_)), "{err:?}");
}

#[tokio::test]
async fn expired_token_signs_the_user_out() {
    let storage = MemoryStore::new();
    storage.set(AUTH_TOKEN_KEY, "stale").await.unwrap();
    let mut svc = AccessService::new(backend().await, storage);
    svc.session_mut().restore(AuthSession {
        token: "stale".into(),
        user: serde_json::from_value(teacher()).unwrap(),
    });

    let err = svc.list_assignments().await.unwrap_err();
    assert_eq!(err, ClientError::Unauthorized);
    assert!(!svc.session().is_authenticated());
    assert_eq!(svc.storage().get(AUTH_TOKEN_KEY).await.unwrap(), None);

    svc.login(&Credentials::new("teacher@demo.com", "123456"))
        .await
        .unwrap();
    let assignments = svc.list_assignments().await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(svc.stats().average_grade, 7.0);
}
