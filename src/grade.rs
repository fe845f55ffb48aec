use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Upper bound of the normalized grading scale.
pub const GRADE_SCALE_MAX: f64 = 10.0;

/// A grade as entered by a teacher.
///
/// Strings only appear at the wire boundary; everywhere else the grade is
/// one of these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Grade {
    /// `obtained/total`, e.g. `8/10`.
    Fraction { obtained: f64, total: f64 },
    /// A bare mark on the 0-10 scale.
    Scalar(f64),
    /// Free text such as `A+`.
    Remark(String),
}

impl Grade {
    pub fn fraction(obtained: f64, total: f64) -> Self {
        Grade::Fraction { obtained, total }
    }

    /// Score on the 0-10 scale. Only fractions with a positive total have one.
    pub fn normalized(&self) -> Option<f64> {
        match self {
            Grade::Fraction { obtained, total } if *total > 0.0 => {
                Some(*obtained / *total * GRADE_SCALE_MAX)
            }
            _ => None,
        }
    }

    /// Checks a grade a teacher is about to record.
    pub fn validate(&self) -> Result<(), ClientError> {
        match self {
            Grade::Fraction { obtained, total } => {
                if *total <= 0.0 {
                    Err(ClientError::validation("grade total must be positive"))
                } else if *obtained < 0.0 || *obtained > *total {
                    Err(ClientError::validation(format!(
                        "obtained points must be between 0 and {total}"
                    )))
                } else {
                    Ok(())
                }
            }
            Grade::Scalar(value) => {
                if (0.0..=GRADE_SCALE_MAX).contains(value) {
                    Ok(())
                } else {
                    Err(ClientError::validation(format!(
                        "grade must be between 0 and {GRADE_SCALE_MAX}"
                    )))
                }
            }
            Grade::Remark(text) => {
                if text.trim().is_empty() {
                    Err(ClientError::validation("grade is required"))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl FromStr for Grade {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ClientError::validation("grade is required"));
        }
        if s.contains('/') {
            // only the first two segments count, so "9/10/2" reads as 9/10
            let mut parts = s.split('/');
            let obtained = parts.next().and_then(parse_finite);
            let total = parts.next().and_then(parse_finite);
            return Ok(match (obtained, total) {
                (Some(obtained), Some(total)) => Grade::Fraction { obtained, total },
                _ => Grade::Remark(s.to_string()),
            });
        }
        Ok(match parse_finite(s) {
            Some(value) => Grade::Scalar(value),
            None => Grade::Remark(s.to_string()),
        })
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Fraction { obtained, total } => write!(f, "{obtained}/{total}"),
            Grade::Scalar(value) => write!(f, "{value}"),
            Grade::Remark(text) => f.write_str(text),
        }
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grade::Scalar(value) => serializer.serialize_f64(*value),
            other => serializer.collect_str(other),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireGrade {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match WireGrade::deserialize(deserializer)? {
            WireGrade::Number(value) => Ok(Grade::Scalar(value)),
            WireGrade::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Field adapter for `Option<Grade>`: an empty string or `null` means ungraded.
pub(crate) mod optional {
    use super::{Grade, WireGrade};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(grade: &Option<Grade>, serializer: S) -> Result<S::Ok, S::Error> {
        match grade {
            Some(grade) => grade.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Grade>, D::Error> {
        match Option::<WireGrade>::deserialize(deserializer)? {
            None => Ok(None),
            Some(WireGrade::Number(value)) => Ok(Some(Grade::Scalar(value))),
            Some(WireGrade::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(WireGrade::Text(text)) => text.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}
