use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use memotrack_core::error::{MemoTrackError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoStatus {
    /// Open and awaiting acceptance. Counted by the active-memo gauge.
    Active,
    Accepted,
    Archived,
}

impl MemoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoStatus::Active => "active",
            MemoStatus::Accepted => "accepted",
            MemoStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(MemoStatus::Active),
            "accepted" => Ok(MemoStatus::Accepted),
            "archived" => Ok(MemoStatus::Archived),
            other => Err(MemoTrackError::DataAccess(format!("unknown memo status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Memo {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub assignee: Option<String>,
    pub status: MemoStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMemo {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl NewMemo {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(MemoTrackError::BadRequest("memo title must not be empty".into()));
        }
        if self.author.trim().is_empty() {
            return Err(MemoTrackError::BadRequest("memo author must not be empty".into()));
        }
        if matches!(&self.assignee, Some(a) if a.trim().is_empty()) {
            return Err(MemoTrackError::BadRequest("assignee must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoStats {
    pub total: i64,
    pub active: i64,
    pub accepted: i64,
    pub archived: i64,
}

/// Transition checks shared by every store so they agree on the rules.
pub(crate) fn check_assign(memo: &Memo, assignee: &str) -> Result<()> {
    if assignee.trim().is_empty() {
        return Err(MemoTrackError::BadRequest("assignee must not be empty".into()));
    }
    if memo.status != MemoStatus::Active {
        return Err(MemoTrackError::BadRequest(format!(
            "memo {} is {} and cannot be reassigned",
            memo.id,
            memo.status.as_str()
        )));
    }
    Ok(())
}

pub(crate) fn check_accept(memo: &Memo, user: &str) -> Result<()> {
    match memo.status {
        MemoStatus::Active => {}
        MemoStatus::Accepted => {
            return Err(MemoTrackError::BadRequest(format!("memo {} already accepted", memo.id)))
        }
        MemoStatus::Archived => {
            return Err(MemoTrackError::BadRequest(format!("memo {} is archived", memo.id)))
        }
    }
    match memo.assignee.as_deref() {
        Some(a) if a == user => Ok(()),
        Some(_) => Err(MemoTrackError::BadRequest(format!(
            "memo {} is not assigned to {user}",
            memo.id
        ))),
        None => Err(MemoTrackError::BadRequest(format!("memo {} has no assignee", memo.id))),
    }
}

pub(crate) fn check_archive(memo: &Memo) -> Result<()> {
    if memo.status == MemoStatus::Archived {
        return Err(MemoTrackError::BadRequest(format!("memo {} already archived", memo.id)));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn memo(status: MemoStatus, assignee: Option<&str>) -> Memo {
        Memo {
            id: 7,
            title: "t".into(),
            body: String::new(),
            author: "alice".into(),
            assignee: assignee.map(str::to_string),
            status,
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn accept_rules() {
        assert!(check_accept(&memo(MemoStatus::Active, Some("bob")), "bob").is_ok());
        assert!(check_accept(&memo(MemoStatus::Active, Some("bob")), "carol").is_err());
        assert!(check_accept(&memo(MemoStatus::Active, None), "bob").is_err());
        assert!(check_accept(&memo(MemoStatus::Accepted, Some("bob")), "bob").is_err());
        assert!(check_accept(&memo(MemoStatus::Archived, Some("bob")), "bob").is_err());
    }

    #[test]
    fn assign_rules() {
        assert!(check_assign(&memo(MemoStatus::Active, None), "bob").is_ok());
        assert!(check_assign(&memo(MemoStatus::Active, None), " ").is_err());
        assert!(check_assign(&memo(MemoStatus::Accepted, Some("bob")), "carol").is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [MemoStatus::Active, MemoStatus::Accepted, MemoStatus::Archived] {
            assert_eq!(MemoStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(MemoStatus::parse("draft").is_err());
    }

    #[test]
    fn new_memo_validation() {
        let ok = NewMemo { title: "x".into(), body: String::new(), author: "a".into(), assignee: None };
        assert!(ok.validate().is_ok());
        let no_title = NewMemo { title: " ".into(), ..ok.clone() };
        assert!(no_title.validate().is_err());
        let no_author = NewMemo { author: String::new(), ..ok };
        assert!(no_author.validate().is_err());
    }
}
