use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

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
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a single reviewer-to-subject assignment.
    AssignmentId
);
string_id!(QuestionId);
string_id!(CompetencyId);
string_id!(SectionId);
string_id!(AssessmentId);
string_id!(OrganizationId);
string_id!(
    /// Person being reviewed.
    SubjectId
);
string_id!(
    /// Person who answered. Never surfaced in disclosed output.
    RespondentId
);

/// Reviewer's relation to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[serde(rename = "self")]
    SelfReview,
    Peer,
    Supervisor,
    Subordinate,
    Client,
}

impl RelationshipType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::SelfReview,
            Self::Peer,
            Self::Supervisor,
            Self::Subordinate,
            Self::Client,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SelfReview => "Self",
            Self::Peer => "Peer",
            Self::Supervisor => "Supervisor",
            Self::Subordinate => "Direct Report",
            Self::Client => "Client",
        }
    }

    pub const fn as_key(self) -> &'static str {
        match self {
            Self::SelfReview => "self",
            Self::Peer => "peer",
            Self::Supervisor => "supervisor",
            Self::Subordinate => "subordinate",
            Self::Client => "client",
        }
    }

    pub const fn is_self(self) -> bool {
        matches!(self, Self::SelfReview)
    }

    /// Parses the loose labels upstream exports use for relationship columns.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' '], "_");

        match normalized.as_str() {
            "self" | "self_review" | "self_assessment" => Some(Self::SelfReview),
            "peer" | "colleague" => Some(Self::Peer),
            "supervisor" | "manager" => Some(Self::Supervisor),
            "subordinate" | "direct_report" | "report" => Some(Self::Subordinate),
            "client" | "customer" | "external" => Some(Self::Client),
            _ => None,
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Validated rating. Only the normalizer produces these; downstream code
/// treats them as read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    pub assignment_id: AssignmentId,
    pub question_id: QuestionId,
    /// Set when the row pins the rating to one of the question's competencies.
    pub competency_id: Option<CompetencyId>,
    pub relationship_type: RelationshipType,
    pub rating: u8,
    pub respondent_id: RespondentId,
    pub comment: Option<String>,
}

impl RatingRecord {
    pub fn is_reviewer(&self) -> bool {
        !self.relationship_type.is_self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Completed,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" | "not_started" => Some(Self::Pending),
            "in_progress" | "started" => Some(Self::InProgress),
            "completed" | "complete" | "submitted" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// One reviewer asked to rate one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub subject_id: SubjectId,
    pub respondent_id: RespondentId,
    pub relationship_type: RelationshipType,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn is_completed(&self) -> bool {
        self.status == AssignmentStatus::Completed
    }
}
