//! Cache keys for every cached read.
//!
//! Keys are ordered path segments. Invalidation matches by prefix, so
//! invalidating `["teams"]` also covers `["teams", id]` and
//! `["teams", id, "members"]`.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// True when `prefix` is this key or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[must_use]
pub fn profile() -> QueryKey {
    QueryKey::new(["auth", "profile"])
}

#[must_use]
pub fn users() -> QueryKey {
    QueryKey::new(["users"])
}

#[must_use]
pub fn user(id: &str) -> QueryKey {
    QueryKey::new(["users", id])
}

#[must_use]
pub fn teams() -> QueryKey {
    QueryKey::new(["teams"])
}

#[must_use]
pub fn team(id: &str) -> QueryKey {
    QueryKey::new(["teams", id])
}

#[must_use]
pub fn team_members(id: &str) -> QueryKey {
    QueryKey::new(["teams", id, "members"])
}
