use crate::domain::account::{Amount, Balance, UserAccount, UserId};
use crate::domain::ports::{KeyedStore, Ledger};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// A thread-safe in-memory balance ledger.
///
/// Backed by a sharded `DashMap`, so every read-modify-write on one user runs
/// under that user's shard lock and unrelated users do not contend on a single
/// global lock. Accounts are created lazily on first write.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    accounts: Arc<DashMap<UserId, UserAccount>>,
}

impl InMemoryLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn read(&self, user: UserId) -> Result<Balance> {
        Ok(self
            .accounts
            .get(&user)
            .map(|account| account.balance)
            .unwrap_or(Balance::ZERO))
    }

    async fn credit(&self, user: UserId, amount: Amount) -> Result<Balance> {
        let mut account = self
            .accounts
            .entry(user)
            .or_insert_with(|| UserAccount::new(user));
        account.credit(amount);
        Ok(account.balance)
    }

    async fn withdraw(&self, user: UserId, amount: Amount) -> Result<Balance> {
        let mut account = self
            .accounts
            .entry(user)
            .or_insert_with(|| UserAccount::new(user));
        account.withdraw(amount)?;
        Ok(account.balance)
    }

    async fn debit_to_zero(&self, user: UserId) -> Result<Balance> {
        let mut account = self
            .accounts
            .entry(user)
            .or_insert_with(|| UserAccount::new(user));
        let previous = account.balance;
        account.debit_to_zero();
        Ok(previous)
    }

    async fn restore(&self, user: UserId, value: Balance) -> Result<()> {
        self.accounts
            .entry(user)
            .or_insert_with(|| UserAccount::new(user))
            .restore(value);
        Ok(())
    }

    async fn set_working(&self, user: UserId, working: bool) -> Result<()> {
        self.accounts
            .entry(user)
            .or_insert_with(|| UserAccount::new(user))
            .working = working;
        Ok(())
    }

    async fn is_working(&self, user: UserId) -> Result<bool> {
        Ok(self
            .accounts
            .get(&user)
            .map(|account| account.working)
            .unwrap_or(false))
    }

    async fn accounts(&self) -> Result<Vec<UserAccount>> {
        let mut accounts: Vec<UserAccount> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.user);
        Ok(accounts)
    }
}

/// A thread-safe in-memory map keyed by user id.
///
/// Used for live challenges, withdrawal drafts and pending withdrawals. Removal
/// with a predicate is a single `DashMap::remove_if`, so "still there and still
/// the same, then consume" cannot interleave with another writer on that key.
pub struct InMemoryStore<V> {
    entries: Arc<DashMap<UserId, V>>,
}

impl<V> InMemoryStore<V> {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for InMemoryStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[async_trait]
impl<V> KeyedStore<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn put(&self, user: UserId, value: V) -> Result<Option<V>> {
        Ok(self.entries.insert(user, value))
    }

    async fn get(&self, user: UserId) -> Result<Option<V>> {
        Ok(self.entries.get(&user).map(|entry| entry.value().clone()))
    }

    async fn take(&self, user: UserId) -> Result<Option<V>> {
        Ok(self.entries.remove(&user).map(|(_, value)| value))
    }

    async fn take_if(
        &self,
        user: UserId,
        predicate: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> Result<Option<V>> {
        Ok(self
            .entries
            .remove_if(&user, |_, value| predicate(value))
            .map(|(_, value)| value))
    }

    async fn swap_if(
        &self,
        user: UserId,
        predicate: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
        value: V,
    ) -> Result<Option<V>> {
        Ok(self.entries.get_mut(&user).and_then(|mut entry| {
            predicate(entry.value()).then(|| std::mem::replace(entry.value_mut(), value))
        }))
    }

    async fn drain_where(
        &self,
        predicate: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> Result<Vec<(UserId, V)>> {
        let candidates: Vec<UserId> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        // Re-check under the key lock; an entry may have been replaced meanwhile.
        Ok(candidates
            .into_iter()
            .filter_map(|user| self.entries.remove_if(&user, |_, value| predicate(value)))
            .collect())
    }
}
