//! Per (user, group) membership rules.
//!
//! `none -> pending -> approved | rejected`, and `approved -> none` on leave.
//! The checks here are pure; the repository turns concurrent duplicates into
//! the same errors through the unique indexes on `group_members` and
//! `group_join_requests`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown join request status: {0}")]
pub struct UnknownStatus(String);

impl TryFrom<String> for RequestStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(UnknownStatus(s)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("You are already a member.")]
    AlreadyMember,
    #[error("Join request already sent.")]
    AlreadyPending,
    #[error("You are not authorized.")]
    NotOwner,
    #[error("This request has already been decided.")]
    NotPending,
    #[error("You are not a member of this group.")]
    NotMember,
}

impl From<MembershipError> for AppError {
    fn from(e: MembershipError) -> Self {
        match e {
            MembershipError::AlreadyMember
            | MembershipError::AlreadyPending
            | MembershipError::NotPending => AppError::conflict(e.to_string()),
            MembershipError::NotOwner | MembershipError::NotMember => {
                AppError::forbidden(e.to_string())
            }
        }
    }
}

/// A join request may only be opened from the `none` state.
pub fn check_can_request(is_member: bool, has_pending: bool) -> Result<(), MembershipError> {
    if is_member {
        return Err(MembershipError::AlreadyMember);
    }
    if has_pending {
        return Err(MembershipError::AlreadyPending);
    }
    Ok(())
}

pub fn check_owner(owner_id: Uuid, actor: Uuid) -> Result<(), MembershipError> {
    if owner_id != actor {
        return Err(MembershipError::NotOwner);
    }
    Ok(())
}

/// Approve and reject: owner only, and only while the request is pending.
pub fn check_can_decide(
    owner_id: Uuid,
    actor: Uuid,
    status: RequestStatus,
) -> Result<(), MembershipError> {
    check_owner(owner_id, actor)?;
    if status != RequestStatus::Pending {
        return Err(MembershipError::NotPending);
    }
    Ok(())
}

/// Posting and reading discussion requires an approved membership.
pub fn check_member(is_approved_member: bool) -> Result<(), MembershipError> {
    if !is_approved_member {
        return Err(MembershipError::NotMember);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// In-memory stand-in for the three tables, driven only through the checks.
    #[derive(Default)]
    struct Ledger {
        owner: Uuid,
        members: HashSet<Uuid>,
        requests: Vec<(Uuid, RequestStatus)>,
    }

    impl Ledger {
        fn new(owner: Uuid) -> Self {
            let mut l = Ledger { owner, ..Default::default() };
            l.members.insert(owner);
            l
        }

        fn has_pending(&self, user: Uuid) -> bool {
            self.requests
                .iter()
                .any(|(u, s)| *u == user && *s == RequestStatus::Pending)
        }

        fn request(&mut self, user: Uuid) -> Result<usize, MembershipError> {
            check_can_request(self.members.contains(&user), self.has_pending(user))?;
            self.requests.push((user, RequestStatus::Pending));
            Ok(self.requests.len() - 1)
        }

        fn decide(&mut self, idx: usize, actor: Uuid, approve: bool) -> Result<(), MembershipError> {
            let (user, status) = self.requests[idx];
            check_can_decide(self.owner, actor, status)?;
            if approve {
                self.members.insert(user);
                self.requests[idx].1 = RequestStatus::Approved;
            } else {
                self.requests[idx].1 = RequestStatus::Rejected;
            }
            Ok(())
        }

        fn leave(&mut self, user: Uuid) -> Result<(), MembershipError> {
            if !self.members.remove(&user) {
                return Err(MembershipError::NotMember);
            }
            Ok(())
        }
    }

    #[test]
    fn request_approve_leave_and_rejoin() {
        let owner = Uuid::new_v4();
        let student = Uuid::new_v4();
        let mut g = Ledger::new(owner);

        let first = g.request(student).unwrap();
        assert_eq!(g.request(student), Err(MembershipError::AlreadyPending));
        g.decide(first, owner, true).unwrap();
        assert!(g.members.contains(&student));
        assert_eq!(g.request(student), Err(MembershipError::AlreadyMember));

        g.leave(student).unwrap();
        // the approved request stays as history and does not block a new one
        let second = g.request(student).unwrap();
        assert_ne!(first, second);
        assert_eq!(g.requests[first].1, RequestStatus::Approved);
    }

    #[test]
    fn only_owner_decides_and_only_once() {
        let owner = Uuid::new_v4();
        let student = Uuid::new_v4();
        let mut g = Ledger::new(owner);
        let idx = g.request(student).unwrap();

        assert_eq!(g.decide(idx, student, true), Err(MembershipError::NotOwner));
        g.decide(idx, owner, false).unwrap();
        assert!(!g.members.contains(&student));
        assert_eq!(g.decide(idx, owner, true), Err(MembershipError::NotPending));

        // rejected requests do not block asking again
        assert!(g.request(student).is_ok());
    }

    #[test]
    fn leaving_without_membership_fails() {
        let mut g = Ledger::new(Uuid::new_v4());
        assert_eq!(g.leave(Uuid::new_v4()), Err(MembershipError::NotMember));
    }

    #[test]
    fn at_most_one_pending_per_pair() {
        let owner = Uuid::new_v4();
        let mut g = Ledger::new(owner);
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for u in &users {
            g.request(*u).unwrap();
            let _ = g.request(*u);
        }
        for u in &users {
            let pending = g
                .requests
                .iter()
                .filter(|(x, s)| x == u && *s == RequestStatus::Pending)
                .count();
            assert_eq!(pending, 1);
        }
    }

    #[test]
    fn errors_map_to_http_kinds() {
        assert!(matches!(AppError::from(MembershipError::AlreadyPending), AppError::Conflict(_)));
        assert!(matches!(AppError::from(MembershipError::NotOwner), AppError::Forbidden(_)));
        assert!(matches!(AppError::from(MembershipError::NotMember), AppError::Forbidden(_)));
    }

    #[test]
    fn status_parses_from_column_text() {
        assert_eq!(RequestStatus::try_from("approved".to_string()).unwrap(), RequestStatus::Approved);
        assert!(RequestStatus::try_from("maybe".to_string()).is_err());
        assert_eq!(RequestStatus::Rejected.as_str(), "rejected");
    }
}
