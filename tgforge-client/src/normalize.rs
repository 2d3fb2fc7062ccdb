//! Raw user → flat, display-ready record.
//!
//! Pure and deterministic: every optional field has a fixed fallback so two
//! runs over the same entity always produce the same row.

use std::fmt;

use serde::Serialize;

use crate::remote::{RawUser, RawUserStatus};

pub const NO_USERNAME:   &str = "No Username";
pub const NO_ALTERNATES: &str = "None";
pub const NOT_AVAILABLE: &str = "Not Available";

// ─── Flag ─────────────────────────────────────────────────────────────────────

/// A boolean rendered as `"Yes"` / `"No"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Flag {
    Yes,
    #[default]
    No,
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self { if b { Self::Yes } else { Self::No } }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Yes => "Yes", Self::No => "No" })
    }
}

// ─── UserStatus ───────────────────────────────────────────────────────────────

/// Coarse presence bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum UserStatus {
    Online,
    Offline,
    Recently,
    #[serde(rename = "Last Week")]
    LastWeek,
    #[serde(rename = "Last Month")]
    LastMonth,
    #[default]
    Unknown,
}

/// Checked in order; the first needle found in the constructor name wins.
const STATUS_PRECEDENCE: [(&str, UserStatus); 5] = [
    ("Online",    UserStatus::Online),
    ("Offline",   UserStatus::Offline),
    ("Recently",  UserStatus::Recently),
    ("LastWeek",  UserStatus::LastWeek),
    ("LastMonth", UserStatus::LastMonth),
];

impl UserStatus {
    /// Classify a status constructor name such as `UserStatusLastWeek`.
    pub fn classify(discriminator: &str) -> Self {
        STATUS_PRECEDENCE
            .iter()
            .find(|(needle, _)| discriminator.contains(needle))
            .map(|&(_, status)| status)
            .unwrap_or(Self::Unknown)
    }

    pub fn from_raw(raw: Option<&RawUserStatus>) -> Self {
        raw.map(|s| Self::classify(&s.kind)).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online    => "Online",
            Self::Offline   => "Offline",
            Self::Recently  => "Recently",
            Self::LastWeek  => "Last Week",
            Self::LastMonth => "Last Month",
            Self::Unknown   => "Unknown",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── UserRecord ───────────────────────────────────────────────────────────────

/// Profile photo location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PhotoRef {
    pub id:    i64,
    pub dc_id: i32,
}

/// One exported user row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserRecord {
    pub user_id:             i64,
    pub first_name:          Option<String>,
    pub last_name:           Option<String>,
    /// `@name` or [`NO_USERNAME`].
    pub username:            String,
    /// Comma-joined, or [`NO_ALTERNATES`].
    pub alternate_usernames: String,
    /// Phone or [`NOT_AVAILABLE`].
    pub phone:               String,
    pub is_bot:              Flag,
    pub verified:            Flag,
    pub premium:             Flag,
    pub scam:                Flag,
    pub fake:                Flag,
    pub restricted:          Flag,
    pub deleted:             Flag,
    pub status:              UserStatus,
    pub access_hash:         Option<i64>,
    pub photo:               Option<PhotoRef>,
    pub support:             Flag,
    pub is_contact:          Flag,
    pub mutual_contact:      Flag,
    pub close_friend:        Flag,
    pub stories_hidden:      Flag,
    /// Language code or [`NOT_AVAILABLE`].
    pub lang_code:           String,
}

/// Build the record for `user`.
pub fn normalize_user(user: &RawUser) -> UserRecord {
    let username = match non_empty(user.username.as_deref()) {
        Some(name) => format!("@{name}"),
        None       => NO_USERNAME.to_string(),
    };

    let alternates: Vec<&str> = user.usernames
        .iter()
        .map(|u| u.username.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    let alternate_usernames = if alternates.is_empty() {
        NO_ALTERNATES.to_string()
    } else {
        alternates.join(", ")
    };

    UserRecord {
        user_id:        user.id,
        first_name:     user.first_name.clone(),
        last_name:      user.last_name.clone(),
        username,
        alternate_usernames,
        phone:          or_not_available(user.phone.as_deref()),
        is_bot:         user.bot.into(),
        verified:       user.verified.into(),
        premium:        user.premium.into(),
        scam:           user.scam.into(),
        fake:           user.fake.into(),
        restricted:     user.restricted.into(),
        deleted:        user.deleted.into(),
        status:         UserStatus::from_raw(user.status.as_ref()),
        access_hash:    user.access_hash,
        photo:          user.photo.as_ref().map(|p| PhotoRef { id: p.photo_id, dc_id: p.dc_id }),
        support:        user.support.into(),
        is_contact:     user.contact.into(),
        mutual_contact: user.mutual_contact.into(),
        close_friend:   user.close_friend.into(),
        stories_hidden: user.stories_hidden.into(),
        lang_code:      or_not_available(user.lang_code.as_deref()),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

fn or_not_available(s: Option<&str>) -> String {
    non_empty(s).unwrap_or(NOT_AVAILABLE).to_string()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
