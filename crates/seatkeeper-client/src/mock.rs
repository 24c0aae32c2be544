//! In-memory collaborators for development mode and tests.
//!
//! Each mock records what it was asked to do and can be told to fail, so
//! workflows can be driven through their compensation paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use seatkeeper_entity::account::{Account, NewAccount};

use crate::billing::BillingService;
use crate::error::ClientError;
use crate::identity::IdentityService;
use crate::notification::{Notification, Notifier};

#[derive(Debug, Default)]
struct IdentityState {
    accounts: HashMap<Uuid, Account>,
    unavailable: bool,
    failing_deletes: HashSet<String>,
    deleted: Vec<Uuid>,
}

/// Identity service holding accounts in a map.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityService {
    state: Arc<Mutex<IdentityState>>,
}

impl MockIdentityService {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an account and return it.
    pub fn add_account(&self, email: &str, name: &str) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.lock().accounts.insert(account.id, account.clone());
        account
    }

    /// Make every call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make deleting the account registered under `email` fail, including
    /// one created later.
    pub fn fail_delete_of(&self, email: &str) {
        self.lock().failing_deletes.insert(email.to_ascii_lowercase());
    }

    /// Whether the account exists.
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.lock().accounts.contains_key(&user_id)
    }

    /// Account with the given email, if registered.
    pub fn account_by_email(&self, email: &str) -> Option<Account> {
        self.lock()
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// Accounts deleted so far, in order.
    pub fn deleted(&self) -> Vec<Uuid> {
        self.lock().deleted.clone()
    }

    fn check(state: &IdentityState) -> Result<(), ClientError> {
        if state.unavailable {
            Err(ClientError::unavailable("identity", "mock identity service is down"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Account>, ClientError> {
        let state = self.lock();
        Self::check(&state)?;
        Ok(state.accounts.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ClientError> {
        let state = self.lock();
        Self::check(&state)?;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_accounts(&self, user_ids: &[Uuid]) -> Result<Vec<Account>, ClientError> {
        let state = self.lock();
        Self::check(&state)?;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.accounts.get(id).cloned())
            .collect())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, ClientError> {
        let mut state = self.lock();
        Self::check(&state)?;
        if state
            .accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(ClientError::Rejected {
                service: "identity",
                status: 409,
                message: format!("{} is already registered", account.email),
            });
        }
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            name: account.name.clone(),
            created_at: Utc::now(),
        };
        state.accounts.insert(created.id, created.clone());
        tracing::debug!(user_id = %created.id, "Mock identity: account created");
        Ok(created)
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<(), ClientError> {
        let mut state = self.lock();
        Self::check(&state)?;
        let failing = state
            .accounts
            .get(&user_id)
            .is_some_and(|a| state.failing_deletes.contains(&a.email.to_ascii_lowercase()));
        if failing {
            return Err(ClientError::unavailable(
                "identity",
                format!("mock delete of {user_id} failed"),
            ));
        }
        state.accounts.remove(&user_id);
        state.deleted.push(user_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BillingState {
    cancelled: Vec<String>,
    unavailable: bool,
}

/// Billing service recording cancellations.
#[derive(Debug, Clone, Default)]
pub struct MockBillingService {
    state: Arc<Mutex<BillingState>>,
}

impl MockBillingService {
    /// Create a mock that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BillingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Customers whose subscription was cancelled.
    pub fn cancelled(&self) -> Vec<String> {
        self.lock().cancelled.clone()
    }
}

#[async_trait]
impl BillingService for MockBillingService {
    async fn cancel_subscription(&self, customer_id: &str) -> Result<(), ClientError> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(ClientError::unavailable("billing", "mock billing service is down"));
        }
        state.cancelled.push(customer_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    sent: Vec<Notification>,
    unavailable: bool,
}

/// Notifier recording every delivered message.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl MockNotifier {
    /// Create a mock that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every send fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.lock().sent.clone()
    }

    /// Templates of the messages delivered so far.
    pub fn templates(&self) -> Vec<&'static str> {
        self.lock().sent.iter().map(Notification::template).collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), ClientError> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(ClientError::unavailable(
                "notification",
                "mock notification service is down",
            ));
        }
        tracing::debug!(template = notification.template(), "Mock notifier: recording");
        state.sent.push(notification.clone());
        Ok(())
    }
}
