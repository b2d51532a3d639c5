//! Derived queries over the relationship graph

use crate::{RelationshipEngine, RelationshipError, Result};
use amity_domain::{EdgeStatus, EdgeStore, UserId};
use std::collections::BTreeSet;
use std::fmt::Display;
use tracing::debug;

impl<S> RelationshipEngine<S>
where
    S: EdgeStore,
    S::Error: Display,
{
    /// Emails of everyone connected to `user`
    pub fn friend_list(&self, user: UserId) -> Result<Vec<String>> {
        self.require_user(user)?;

        let friends = self
            .store
            .friends_of(user)
            .map_err(RelationshipError::persistence)?;
        self.emails(&friends)
    }

    /// Emails of users connected to both `a` and `b`
    pub fn common_friends(&self, a: UserId, b: UserId) -> Result<Vec<String>> {
        if a == b {
            return Err(RelationshipError::SelfReference);
        }
        self.require_user(a)?;
        self.require_user(b)?;

        let friends_of_a = self
            .store
            .friends_of(a)
            .map_err(RelationshipError::persistence)?;
        let friends_of_b = self
            .store
            .friends_of(b)
            .map_err(RelationshipError::persistence)?;

        let common: BTreeSet<UserId> = friends_of_a
            .intersection(&friends_of_b)
            .copied()
            .filter(|id| *id != a && *id != b)
            .collect();

        debug!("{} and {} share {} friends", a, b, common.len());
        self.emails(&common)
    }

    /// Emails of everyone who should receive an update posted by `sender`
    ///
    /// Candidates are the sender's friends, the sender's subscribers, and
    /// the users mentioned in the update. Any candidate who has blocked the
    /// sender is dropped. Whether the sender blocks a candidate does not
    /// matter here.
    pub fn broadcast_recipients(
        &self,
        sender: UserId,
        mentioned: &BTreeSet<UserId>,
    ) -> Result<Vec<String>> {
        self.require_user(sender)?;

        // 1. Friends, subscribers and mentions
        let mut candidates = self
            .store
            .friends_of(sender)
            .map_err(RelationshipError::persistence)?;
        candidates.extend(
            self.store
                .subscribers_of(sender)
                .map_err(RelationshipError::persistence)?,
        );
        candidates.extend(mentioned.iter().copied());
        candidates.remove(&sender);

        // 2. Drop candidates who blocked the sender
        let mut recipients = BTreeSet::new();
        for candidate in candidates {
            let blocked_sender = self
                .store
                .find_directional(candidate, sender, EdgeStatus::Blocked)
                .map_err(RelationshipError::persistence)?;
            if blocked_sender.is_empty() {
                recipients.insert(candidate);
            }
        }

        debug!("Update from {} reaches {} users", sender, recipients.len());
        self.emails(&recipients)
    }

    fn emails(&self, ids: &BTreeSet<UserId>) -> Result<Vec<String>> {
        self.store
            .emails_of(ids)
            .map_err(RelationshipError::persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStore;

    struct Fixture {
        engine: RelationshipEngine<MockStore>,
        andy: UserId,
        john: UserId,
        kate: UserId,
        lisa: UserId,
    }

    fn fixture() -> Fixture {
        let mut engine = RelationshipEngine::new(MockStore::new());
        let andy = engine.register_user("andy@example.com").unwrap();
        let john = engine.register_user("john@example.com").unwrap();
        let kate = engine.register_user("kate@example.com").unwrap();
        let lisa = engine.register_user("lisa@example.com").unwrap();
        Fixture {
            engine,
            andy,
            john,
            kate,
            lisa,
        }
    }

    #[test]
    fn test_friend_list_both_directions() {
        let mut f = fixture();
        f.engine.create_connection(f.andy, f.john).unwrap();
        f.engine.create_connection(f.kate, f.andy).unwrap();

        assert_eq!(
            f.engine.friend_list(f.andy).unwrap(),
            vec!["john@example.com", "kate@example.com"]
        );
        assert_eq!(f.engine.friend_list(f.john).unwrap(), vec!["andy@example.com"]);
        assert!(f.engine.friend_list(f.lisa).unwrap().is_empty());
    }

    #[test]
    fn test_friend_list_unknown_user() {
        let f = fixture();
        let ghost = UserId::from_value(99);
        assert_eq!(f.engine.friend_list(ghost), Err(RelationshipError::UnknownUser(ghost)));
    }

    #[test]
    fn test_common_friends() {
        let mut f = fixture();
        f.engine.create_connection(f.andy, f.kate).unwrap();
        f.engine.create_connection(f.john, f.kate).unwrap();
        f.engine.create_connection(f.andy, f.lisa).unwrap();

        assert_eq!(
            f.engine.common_friends(f.andy, f.john).unwrap(),
            vec!["kate@example.com"]
        );
        assert_eq!(
            f.engine.common_friends(f.john, f.andy).unwrap(),
            vec!["kate@example.com"]
        );
    }

    #[test]
    fn test_common_friends_excludes_the_pair_itself() {
        let mut f = fixture();
        f.engine.create_connection(f.andy, f.john).unwrap();
        f.engine.create_connection(f.andy, f.kate).unwrap();
        f.engine.create_connection(f.john, f.kate).unwrap();
        // Malformed self-edge the engine would never create
        f.engine.store.seed(f.andy, f.andy, EdgeStatus::Connected);

        assert_eq!(
            f.engine.common_friends(f.andy, f.john).unwrap(),
            vec!["kate@example.com"]
        );
    }

    #[test]
    fn test_common_friends_same_user() {
        let f = fixture();
        assert_eq!(
            f.engine.common_friends(f.andy, f.andy),
            Err(RelationshipError::SelfReference)
        );
    }

    #[test]
    fn test_broadcast_friends_subscribers_and_mentions() {
        let mut f = fixture();
        f.engine.create_connection(f.andy, f.john).unwrap();
        f.engine.create_subscription(f.kate, f.andy).unwrap();

        let mentioned = BTreeSet::from([f.lisa]);
        assert_eq!(
            f.engine.broadcast_recipients(f.andy, &mentioned).unwrap(),
            vec!["john@example.com", "kate@example.com", "lisa@example.com"]
        );
    }

    #[test]
    fn test_broadcast_ignores_outgoing_subscriptions() {
        let mut f = fixture();
        f.engine.create_subscription(f.andy, f.kate).unwrap();

        assert!(f
            .engine
            .broadcast_recipients(f.andy, &BTreeSet::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_broadcast_excludes_candidates_who_blocked_sender() {
        let mut f = fixture();
        f.engine.create_connection(f.andy, f.john).unwrap();
        // Malformed combination: john still connected but blocks andy
        f.engine.store.seed(f.john, f.andy, EdgeStatus::Blocked);
        f.engine.create_block(f.lisa, f.andy).unwrap();

        let mentioned = BTreeSet::from([f.lisa]);
        assert!(f
            .engine
            .broadcast_recipients(f.andy, &mentioned)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_broadcast_keeps_subscribers_the_sender_blocked() {
        let mut f = fixture();
        f.engine.create_subscription(f.kate, f.andy).unwrap();
        f.engine.create_block(f.andy, f.kate).unwrap();

        assert_eq!(
            f.engine.broadcast_recipients(f.andy, &BTreeSet::new()).unwrap(),
            vec!["kate@example.com"]
        );
    }

    #[test]
    fn test_broadcast_drops_sender_from_mentions() {
        let f = fixture();
        let mentioned = BTreeSet::from([f.andy, f.kate]);

        assert_eq!(
            f.engine.broadcast_recipients(f.andy, &mentioned).unwrap(),
            vec!["kate@example.com"]
        );
    }
}
