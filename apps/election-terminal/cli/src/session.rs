//! The signed-in voter, remembered between runs.

use election_types::voting::User;

use crate::store::{Result, SharedStore, StoreExt};

pub(crate) const ELECTION_USER_KEY: &str = "election_user";

#[derive(Clone)]
pub(crate) struct Session {
    store: SharedStore,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub(crate) fn current_user(&self) -> Result<Option<User>> {
        self.store.get_json(ELECTION_USER_KEY)
    }

    pub(crate) fn sign_in(&self, user: &User) -> Result<()> {
        tracing::debug!("signed in as user {}", user.id);
        self.store.set_json(ELECTION_USER_KEY, user)
    }

    pub(crate) fn sign_out(&self) -> Result<()> {
        self.store.remove(ELECTION_USER_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use election_types::voting::UserId;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_sign_in_and_out() {
        let session = Session::new(Arc::new(MemoryStore::new()));
        assert_eq!(session.current_user().unwrap(), None);

        let user = User {
            id: UserId::new(7),
            email: "voter@example.com".to_owned(),
            name: Some("Wanjiru".to_owned()),
        };
        session.sign_in(&user).unwrap();
        assert_eq!(session.current_user().unwrap(), Some(user));

        session.sign_out().unwrap();
        assert_eq!(session.current_user().unwrap(), None);
    }
}
