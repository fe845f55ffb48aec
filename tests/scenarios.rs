use chrono::{Duration, Utc};

use classroom_client::dashboard::Dashboard;
use classroom_client::demo::{DemoBackend, DEMO_PASSWORD};
use classroom_client::models::{
    AssignmentDraft, AssignmentId, Credentials, GradingData, Registration, StudentId,
    SubmissionStatus,
};
use classroom_client::session::{AuthState, Modal};
use classroom_client::status::status_of;
use classroom_client::storage::{MemoryStore, SecureStore, AUTH_TOKEN_KEY, USER_DATA_KEY};
use classroom_client::{AccessService, ClientError, Role};

type Service = AccessService<DemoBackend, MemoryStore>;

fn empty_service() -> Service {
    AccessService::new(DemoBackend::empty(), MemoryStore::new())
}

async fn sign_in(svc: &mut Service, email: &str) {
    svc.logout().await.expect("logout");
    svc.login(&Credentials::new(email, DEMO_PASSWORD))
        .await
        .expect("login");
    svc.list_assignments().await.expect("list assignments");
}

#[tokio::test]
async fn create_submit_grade() {
    let mut svc = empty_service();

    sign_in(&mut svc, "teacher@demo.com").await;
    let draft = AssignmentDraft::new("Algebra", "Math").due(Utc::now() + Duration::days(7));
    let id = svc.create_assignment(&draft).await.expect("create");
    assert_eq!(svc.stats().total_assignments, 1);
    assert_eq!(svc.stats().total_submissions, 0);

    sign_in(&mut svc, "student@demo.com").await;
    let assignment = svc.store().assignment(&id).expect("listed").clone();
    assert_eq!(status_of(&assignment, None), SubmissionStatus::Pending);

    svc.submit_assignment(&id, "my work").await.expect("submit");
    let student = StudentId::from("student@demo.com");
    let submission = svc.store().submission(&id, &student).expect("recorded");
    assert_eq!(submission.status, SubmissionStatus::Submitted);
    let assignment = svc.store().assignment(&id).expect("listed");
    assert_eq!(
        status_of(assignment, assignment.submission(&student)),
        SubmissionStatus::Submitted
    );
    assert_eq!(submission.comments, "my work");
    match svc.dashboard(Utc::now()) {
        Some(Dashboard::Student(d)) => assert_eq!((d.submitted, d.pending), (1, 0)),
        other => panic!("unexpected dashboard {other:?}"),
    }

    sign_in(&mut svc, "teacher@demo.com").await;
    let grading = GradingData::parse("8/10", "Nice").expect("grade parses");
    svc.grade_submission(&id, &student, grading)
        .await
        .expect("grade");

    let graded = svc.store().submission(&id, &student).expect("still there");
    assert_eq!(graded.status, SubmissionStatus::Graded);
    assert_eq!(graded.feedback, "Nice");

    let stats = svc.stats();
    assert_eq!(stats.total_submissions, 1);
    assert_eq!(stats.average_grade, 8.0);
    assert_eq!(stats.graded_percent, 100);
    assert_eq!(stats.submission_rate, 33);
}

#[tokio::test]
async fn resubmission_replaces_previous() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "student@demo.com").await;
    let id = AssignmentId::from("2");
    svc.submit_assignment(&id, "first").await.unwrap();
    svc.submit_assignment(&id, "second").await.unwrap();

    let assignment = svc.store().assignment(&id).unwrap();
    // the seeded submission from the other student plus ours
    assert_eq!(assignment.submissions.len(), 2);
    let ours = assignment
        .submission(&StudentId::from("student@demo.com"))
        .unwrap();
    assert_eq!(ours.comments, "second");
}

#[tokio::test]
async fn unknown_assignment_leaves_store_untouched() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "student@demo.com").await;
    let before = svc.store().assignments();

    let err = svc
        .submit_assignment(&AssignmentId::from("missing"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { entity: "assignment", .. }));
    assert_eq!(*svc.store().assignments(), *before);
}

#[tokio::test]
async fn grading_missing_submission_is_not_found() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "teacher@demo.com").await;
    let grading = GradingData::parse("9/10", "").unwrap();
    let err = svc
        .grade_submission(&AssignmentId::from("1"), &StudentId::from("nobody@demo.com"), grading)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { entity: "submission", .. }));
}

#[test]
fn bad_grades_are_rejected() {
    assert!(matches!(
        GradingData::parse("11/10", ""),
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(GradingData::parse("", ""), Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn wrong_password() {
    let mut svc = empty_service();
    let err = svc
        .login(&Credentials::new("teacher@demo.com", "nope"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::InvalidCredentials);
    assert_eq!(svc.session().state(), &AuthState::Anonymous);
    assert_eq!(svc.session().error(), Some(&ClientError::InvalidCredentials));
    assert_eq!(svc.storage().get(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn failed_relogin_discards_previous_session() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "teacher@demo.com").await;
    assert_eq!(svc.store().assignments().len(), 2);

    let err = svc
        .login(&Credentials::new("student@demo.com", "wrong-password"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::InvalidCredentials);
    assert!(!svc.session().is_authenticated());
    assert!(svc.store().assignments().is_empty());
    assert_eq!(svc.storage().get(AUTH_TOKEN_KEY).await.unwrap(), None);
    assert_eq!(svc.storage().get(USER_DATA_KEY).await.unwrap(), None);
    assert!(!svc.restore_session().await.unwrap());

    // a blank password is rejected locally but still signs the teacher out
    sign_in(&mut svc, "teacher@demo.com").await;
    let err = svc
        .login(&Credentials::new("teacher@demo.com", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(svc.store().assignments().is_empty());
    assert_eq!(svc.storage().get(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn roles_gate_operations() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "student@demo.com").await;
    let before = svc.store().assignments();

    let err = svc
        .create_assignment(&AssignmentDraft::new("Hack", "Nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
    assert_eq!(*svc.store().assignments(), *before);
    assert!(matches!(
        svc.users_by_role(Role::Teacher).await,
        Err(ClientError::Forbidden(_))
    ));

    sign_in(&mut svc, "director@demo.com").await;
    let teachers = svc.users_by_role(Role::Teacher).await.unwrap();
    assert_eq!(teachers.len(), 1);
    let students = svc.users_by_role(Role::Student).await.unwrap();
    assert_eq!(students.len(), 2);
    match svc.dashboard(Utc::now()) {
        Some(Dashboard::Director(d)) => {
            assert_eq!(d.total_teachers, 1);
            assert_eq!(d.total_students, 2);
            assert_eq!(d.total_submissions, 2);
        }
        other => panic!("unexpected dashboard {other:?}"),
    }
}

#[tokio::test]
async fn teacher_edits_and_deletes() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "teacher@demo.com").await;
    let id = AssignmentId::from("1");

    let mut draft = AssignmentDraft::new("Linear Algebra II", "Mathematics");
    draft.description = "Now with eigenvalues".into();
    svc.update_assignment(&id, &draft).await.unwrap();
    let updated = svc.store().assignment(&id).unwrap();
    assert_eq!(updated.title, "Linear Algebra II");
    // editing keeps the existing hand-ins
    assert_eq!(updated.submissions.len(), 1);

    svc.delete_assignment(&id).await.unwrap();
    assert!(svc.store().assignment(&id).is_none());
    assert_eq!(svc.stats().total_assignments, 1);
    assert!(matches!(
        svc.delete_assignment(&id).await,
        Err(ClientError::NotFound { .. })
    ));
    assert!(svc.store().error().is_some());
}

#[tokio::test]
async fn logout_clears_everything() {
    let mut svc = AccessService::new(DemoBackend::new(), MemoryStore::new());
    sign_in(&mut svc, "teacher@demo.com").await;
    svc.session_mut().open_modal(Modal::Assignment);
    assert_eq!(svc.store().assignments().len(), 2);

    svc.logout().await.unwrap();
    assert!(!svc.session().is_authenticated());
    assert!(!svc.session().modals().any_open());
    assert!(svc.store().assignments().is_empty());
    assert_eq!(svc.storage().get(AUTH_TOKEN_KEY).await.unwrap(), None);
    assert_eq!(svc.storage().get(USER_DATA_KEY).await.unwrap(), None);
    assert!(svc.dashboard(Utc::now()).is_none());
}

#[tokio::test]
async fn registration() {
    let mut svc = empty_service();
    let mut registration = Registration {
        name: "Ana".into(),
        email: "ana@school".into(),
        password: "secret1".into(),
        role: Role::Student,
    };
    assert!(matches!(
        svc.register(&registration).await,
        Err(ClientError::Validation(_))
    ));
    assert!(!svc.session().is_authenticated());

    registration.email = "ana@school.edu".into();
    let user = svc.register(&registration).await.unwrap();
    assert_eq!(user.role, Role::Student);
    assert_eq!(svc.session().user(), Some(&user));

    svc.logout().await.unwrap();
    svc.login(&Credentials::new("ana@school.edu", "secret1"))
        .await
        .unwrap();
    assert_eq!(svc.session().role(), Some(Role::Student));
}
