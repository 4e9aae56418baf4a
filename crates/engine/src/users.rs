use domain::{UserId, UserRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use storage::CommentStore;

/// Users loaded during one search. Lookups are batched and every id is
/// fetched at most once, found or not.
pub struct UserCache {
    store: Arc<dyn CommentStore>,
    users: HashMap<UserId, UserRecord>,
    missing: HashSet<UserId>,
}

impl UserCache {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        Self {
            store,
            users: HashMap::new(),
            missing: HashSet::new(),
        }
    }

    pub fn is_known(&self, id: UserId) -> bool {
        self.users.contains_key(&id) || self.missing.contains(&id)
    }

    /// Loads `id` together with every not yet known id in `batch`.
    pub async fn get(
        &mut self,
        id: UserId,
        batch: impl IntoIterator<Item = UserId>,
    ) -> anyhow::Result<Option<&UserRecord>> {
        if !self.is_known(id) {
            let mut wanted: Vec<UserId> = batch
                .into_iter()
                .chain(std::iter::once(id))
                .filter(|u| !self.is_known(*u))
                .collect();
            wanted.sort_unstable();
            wanted.dedup();

            let found = self.store.get_users(&wanted).await?;
            for user in found {
                self.users.insert(user.id, user);
            }
            for u in wanted {
                if !self.users.contains_key(&u) {
                    self.missing.insert(u);
                }
            }
        }
        Ok(self.users.get(&id))
    }
}
