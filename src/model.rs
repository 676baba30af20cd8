use chrono::NaiveDateTime;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Challenge categories. Stored as their upper-case name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Cryptography,
    Web,
    Forensics,
    Reverse,
    Pwn,
    Misc,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cryptography,
        Category::Web,
        Category::Forensics,
        Category::Reverse,
        Category::Pwn,
        Category::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cryptography => "CRYPTOGRAPHY",
            Category::Web => "WEB",
            Category::Forensics => "FORENSICS",
            Category::Reverse => "REVERSE",
            Category::Pwn => "PWN",
            Category::Misc => "MISC",
        }
    }

    /// Human-facing name, used in selects.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Reverse => "REVERSE ENGINEERING",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

#[cfg(feature = "ssr")]
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(Sqlite))]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub team_name: String,
    pub is_admin: bool,
    pub score: i64,
    pub created_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub team_name: &'a str,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
    // score uses its default
}

/// The only shape of a user that is sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub team_name: String,
    pub is_admin: bool,
}

#[cfg(feature = "ssr")]
impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        SessionUser {
            id: user.id.clone(),
            email: user.email.clone(),
            team_name: user.team_name.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession<'a> {
    pub user_id: &'a str,
    pub token: &'a str,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

/// A full challenge row. Carries the flag, so it never leaves the server; the browser gets a
/// `ChallengeSummary` instead.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ssr", derive(Queryable, Selectable, Insertable))]
#[cfg_attr(feature = "ssr", diesel(table_name = crate::schema::challenges))]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub category: String,
    pub points: i32,
    pub description: String,
    pub resource_link: Option<String>,
    pub flag: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub points: i32,
    pub description: String,
    pub resource_link: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<Challenge> for ChallengeSummary {
    fn from(challenge: Challenge) -> Self {
        ChallengeSummary {
            id: challenge.id,
            title: challenge.title,
            category: challenge.category,
            points: challenge.points,
            description: challenge.description,
            resource_link: challenge.resource_link,
            created_at: challenge.created_at,
        }
    }
}

/// A validated challenge, ready to be inserted. The id and creation time are assigned by the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub category: Category,
    pub points: i32,
    pub description: String,
    pub resource_link: Option<String>,
    pub flag: String,
}

/// A `user_challenges` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ssr", derive(Queryable, Selectable, Insertable))]
#[cfg_attr(feature = "ssr", diesel(table_name = crate::schema::user_challenges))]
pub struct SolveRecord {
    pub user_id: String,
    pub challenge_id: String,
    pub solved: bool,
    pub points: i32,
    pub solved_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::submissions)]
pub struct NewSubmission<'a> {
    pub user_id: &'a str,
    pub challenge_id: &'a str,
    pub is_correct: bool,
    pub submitted_at: NaiveDateTime,
}

/// One row of the admin activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ssr", derive(Queryable))]
pub struct SubmissionLog {
    pub id: i32,
    pub team_name: String,
    pub challenge_title: String,
    pub challenge_category: String,
    pub is_correct: bool,
    pub submitted_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub team_name: String,
    pub score: i64,
    pub solved_count: i64,
    pub total_challenges: i64,
}

/// Score and solve count for the dashboard. `score` is the user row's value and
/// `solved_count` is counted separately; neither is derived from the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub score: i64,
    pub solved_count: i64,
    pub total_challenges: i64,
    pub solved_ids: Vec<String>,
}
