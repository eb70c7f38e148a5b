//! Cluster member availability.
//!
//! Members are tried in configuration order: the first one still up is
//! selected. A member marked down stays out of rotation until something
//! (the client's ping probe) marks it up again.

use std::fmt;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::errors::ClusterError;
use crate::metrics::{MEMBERS_UP, MEMBER_DOWN_TOTAL};

/// Base URL of one cluster member, without a trailing slash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Member(String);

impl Member {
    /// Wrap a base URL, trimming any trailing slash.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(url.trim_end_matches('/').to_string())
    }

    /// Base URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL for `path` on this member.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.0)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered member list with up/down state.
///
/// Thread-safe (interior `Mutex`); share via `Arc<Members>`.
pub struct Members {
    members: Vec<Member>,
    up: Mutex<Vec<bool>>,
}

impl Members {
    /// All members start up.
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let members: Vec<Member> = urls.into_iter().map(Member::new).collect();
        let up = vec![true; members.len()];
        Self {
            members,
            up: Mutex::new(up),
        }
    }

    /// Number of configured members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no members are configured.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// First member still up.
    pub fn next(&self) -> Result<Member, ClusterError> {
        let up = self.up.lock();
        self.members
            .iter()
            .zip(up.iter())
            .find_map(|(member, &is_up)| is_up.then(|| member.clone()))
            .ok_or(ClusterError::NoAvailableMember)
    }

    /// Take `member` out of rotation. Returns `true` if it was up.
    pub fn mark_down(&self, member: &Member) -> bool {
        let changed = self.set(member, false);
        if changed {
            counter!(MEMBER_DOWN_TOTAL).increment(1);
            warn!(%member, up = self.up_count(), "cluster member marked down");
        }
        changed
    }

    /// Put `member` back into rotation. Returns `true` if it was down.
    pub fn mark_up(&self, member: &Member) -> bool {
        let changed = self.set(member, true);
        if changed {
            info!(%member, up = self.up_count(), "cluster member back up");
        }
        changed
    }

    /// Number of members currently up.
    pub fn up_count(&self) -> usize {
        self.up.lock().iter().filter(|&&is_up| is_up).count()
    }

    fn set(&self, member: &Member, state: bool) -> bool {
        let mut up = self.up.lock();
        let Some(index) = self.members.iter().position(|m| m == member) else {
            return false;
        };
        let changed = up[index] != state;
        up[index] = state;
        gauge!(MEMBERS_UP).set(up.iter().filter(|&&is_up| is_up).count() as f64);
        changed
    }
}
