//! In-memory store for engine unit tests

use amity_domain::{EdgeId, EdgeStatus, EdgeStore, Relationship, UserDirectory, UserId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
struct MockState {
    users: Vec<String>,
    edges: Vec<Relationship>,
    next_edge: i64,
}

/// Mock store with snapshot rollback and insert-failure injection
#[derive(Debug, Default)]
pub(crate) struct MockStore {
    state: MockState,
    failing_status: Option<EdgeStatus>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make every insert of `status` fail from now on
    pub(crate) fn fail_inserts_of(&mut self, status: EdgeStatus) {
        self.failing_status = Some(status);
    }

    /// Edges in insertion order
    pub(crate) fn edges(&self) -> &[Relationship] {
        &self.state.edges
    }

    /// Insert an edge directly, bypassing the engine's rules
    pub(crate) fn seed(&mut self, requester: UserId, target: UserId, status: EdgeStatus) {
        self.insert(requester, target, status).unwrap();
    }

    fn matching(&self, pred: impl Fn(&Relationship) -> bool) -> Vec<EdgeId> {
        self.state
            .edges
            .iter()
            .filter(|e| pred(e))
            .map(|e| e.id)
            .collect()
    }
}

impl UserDirectory for MockStore {
    type Error = String;

    fn create_user(&mut self, email: &str) -> Result<UserId, Self::Error> {
        self.state.users.push(email.to_string());
        Ok(UserId::from_value(self.state.users.len() as i64))
    }

    fn resolve_id(&self, email: &str) -> Result<Option<UserId>, Self::Error> {
        Ok(self
            .state
            .users
            .iter()
            .position(|u| u == email)
            .map(|idx| UserId::from_value(idx as i64 + 1)))
    }

    fn resolve_ids(&self, emails: &[String]) -> Result<BTreeSet<UserId>, Self::Error> {
        let mut ids = BTreeSet::new();
        for email in emails {
            if let Some(id) = self.resolve_id(email)? {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    fn exists(&self, id: UserId) -> Result<bool, Self::Error> {
        Ok(id.value() >= 1 && id.value() <= self.state.users.len() as i64)
    }

    fn emails_of(&self, ids: &BTreeSet<UserId>) -> Result<Vec<String>, Self::Error> {
        Ok(ids
            .iter()
            .filter_map(|id| usize::try_from(id.value() - 1).ok())
            .filter_map(|idx| self.state.users.get(idx).cloned())
            .collect())
    }

    fn all_emails(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.state.users.clone())
    }
}

impl EdgeStore for MockStore {
    fn find_symmetric(
        &self,
        a: UserId,
        b: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error> {
        Ok(self.matching(|e| e.status == status && e.joins(a, b)))
    }

    fn find_directional(
        &self,
        from: UserId,
        to: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error> {
        Ok(self.matching(|e| e.status == status && e.requester == from && e.target == to))
    }

    fn insert(
        &mut self,
        requester: UserId,
        target: UserId,
        status: EdgeStatus,
    ) -> Result<EdgeId, Self::Error> {
        if self.failing_status == Some(status) {
            return Err(format!("injected failure inserting {} edge", status));
        }

        self.state.next_edge += 1;
        let id = EdgeId::from_value(self.state.next_edge);
        self.state.edges.push(Relationship {
            id,
            requester,
            target,
            status,
        });
        Ok(id)
    }

    fn delete_many(&mut self, ids: &[EdgeId]) -> Result<(), Self::Error> {
        self.state.edges.retain(|e| !ids.contains(&e.id));
        Ok(())
    }

    fn friends_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error> {
        Ok(self
            .state
            .edges
            .iter()
            .filter(|e| e.status == EdgeStatus::Connected)
            .filter_map(|e| e.other(user))
            .collect())
    }

    fn subscribers_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error> {
        Ok(self
            .state
            .edges
            .iter()
            .filter(|e| e.status == EdgeStatus::Subscribed && e.target == user)
            .map(|e| e.requester)
            .collect())
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(&mut dyn EdgeStore<Error = Self::Error>) -> Result<T, E>,
    {
        let snapshot = self.state.clone();
        let outcome = f(&mut *self);
        if outcome.is_err() {
            self.state = snapshot;
        }
        Ok(outcome)
    }
}
