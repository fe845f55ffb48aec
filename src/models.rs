use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::grade::Grade;
use crate::role::Role;
use crate::validate;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id_type!(UserId);
id_type!(AssignmentId);
id_type!(StudentId);
id_type!(SubmissionId);

impl AssignmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Email,
    Google,
    Discord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub auth_provider: AuthProvider,
}

impl User {
    /// Submissions are keyed by the student's email.
    pub fn student_id(&self) -> StudentId {
        StudentId(self.email.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    #[default]
    Submitted,
    Graded,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Server-assigned id; absent for submissions recorded locally.
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<SubmissionId>,
    pub student_id: StudentId,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default, with = "timestamp::optional")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::grade::optional")]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub status: SubmissionStatus,
}

impl Submission {
    pub fn new(student: &User, comments: impl Into<String>, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            student_id: student.student_id(),
            student_name: student.name.clone(),
            comments: comments.into(),
            submitted_at: Some(submitted_at),
            grade: None,
            feedback: String::new(),
            status: SubmissionStatus::Submitted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(alias = "_id")]
    pub id: AssignmentId,
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "timestamp::optional")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_points: Option<u32>,
    /// One entry per student; the wire carries a list.
    #[serde(default, with = "keyed_submissions")]
    pub submissions: BTreeMap<StudentId, Submission>,
}

impl Assignment {
    pub fn from_draft(id: AssignmentId, draft: &AssignmentDraft) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            subject: draft.subject.trim().to_string(),
            description: draft.description.clone(),
            due_date: draft.due_date,
            max_points: draft.max_points,
            submissions: BTreeMap::new(),
        }
    }

    /// Overwrites the editable fields, keeping id and submissions.
    pub fn apply(&mut self, draft: &AssignmentDraft) {
        self.title = draft.title.trim().to_string();
        self.subject = draft.subject.trim().to_string();
        self.description = draft.description.clone();
        self.due_date = draft.due_date;
        self.max_points = draft.max_points;
    }

    pub fn submission(&self, student: &StudentId) -> Option<&Submission> {
        self.submissions.get(student)
    }
}

/// Fields a teacher fills in to create or edit an assignment.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDraft {
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "timestamp::optional")]
    pub due_date: Option<DateTime<Utc>>,
    pub max_points: Option<u32>,
}

impl AssignmentDraft {
    pub fn new(title: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate::required("title", &self.title)?;
        validate::required("subject", &self.subject)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDraft {
    pub assignment_id: AssignmentId,
    #[serde(default)]
    pub comments: String,
}

impl SubmissionDraft {
    pub fn new(assignment_id: impl Into<AssignmentId>, comments: impl Into<String>) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            comments: comments.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate::required("assignment", self.assignment_id.as_str())
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingData {
    #[serde_as(as = "DisplayFromStr")]
    pub grade: Grade,
    #[serde(default)]
    pub feedback: String,
}

impl GradingData {
    /// Parses and checks a grade typed by a teacher.
    pub fn parse(grade: &str, feedback: impl Into<String>) -> Result<Self> {
        let grade: Grade = grade.parse()?;
        grade.validate()?;
        Ok(Self {
            grade,
            feedback: feedback.into(),
        })
    }
}

/// Locates a submission for grading.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeTarget {
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub submission_id: Option<SubmissionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate::required("email", &self.email)?;
        validate::required("password", &self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        validate::required("name", &self.name)?;
        validate::required("email", &self.email)?;
        validate::required("password", &self.password)?;
        if !validate::is_valid_email(&self.email) {
            return Err(ClientError::validation("email address is malformed"));
        }
        if !validate::is_valid_password(&self.password) {
            return Err(ClientError::validation(format!(
                "password must be at least {} characters",
                validate::MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

/// Name/email edits to the signed-in user. Role is not editable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

pub(crate) mod timestamp {
    pub mod optional {
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => crate::models::parse_timestamp(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid date `{s}`"))),
            }
        }
    }
}

mod keyed_submissions {
    use super::{StudentId, Submission};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<StudentId, Submission>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.values())
    }

    // later entries for the same student replace earlier ones
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<StudentId, Submission>, D::Error> {
        let list = Option::<Vec<Submission>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(list
            .into_iter()
            .map(|s| (s.student_id.clone(), s))
            .collect())
    }
}
