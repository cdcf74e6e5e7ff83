#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use billhub_billing::services::{BillProvider, ProviderError};
use billhub_database::BillingStore;
use billhub_models::{AccountStatus, Bill, BillStatus, LinkedAccount, Provider, User};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn bill(amount: i64, status: BillStatus) -> Bill {
    let now = Utc::now();
    Bill {
        id: String::new(),
        linked_account_id: String::new(),
        provider_id: String::new(),
        amount: Decimal::new(amount, 0),
        due_date: now,
        bill_date: now,
        status,
        created_at: now,
        updated_at: now,
    }
}

pub fn bill_with_id(id: &str, amount: i64, status: BillStatus) -> Bill {
    Bill {
        id: id.to_string(),
        ..bill(amount, status)
    }
}

#[derive(Default)]
pub struct StoreState {
    pub users: Vec<User>,
    pub providers: Vec<Provider>,
    pub accounts: Vec<LinkedAccount>,
    pub bills: HashMap<String, Bill>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub status_updates: Vec<(String, AccountStatus)>,
    /// Linked account ids whose bill writes fail.
    pub failing_bill_writes: HashSet<String>,
    pub fail_account_reads: bool,
    pub fail_user_listing: bool,
}

/// In-memory stand-in for the Postgres repositories.
#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn add_account(&self, user_id: &str, provider_id: &str) -> LinkedAccount {
        let account = LinkedAccount::new(user_id, provider_id, format!("{}-ACC", provider_id), "token");
        self.state.lock().unwrap().accounts.push(account.clone());
        account
    }

    pub fn set_account_status(&self, account_id: &str, status: AccountStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.status = status;
        }
    }

    pub fn account_status(&self, account_id: &str) -> Option<AccountStatus> {
        let state = self.state.lock().unwrap();
        state.accounts.iter().find(|a| a.id == account_id).map(|a| a.status)
    }

    pub fn insert_bill(&self, bill: Bill) {
        self.state.lock().unwrap().bills.insert(bill.id.clone(), bill);
    }

    pub fn fail_bill_writes_for(&self, account_id: &str) {
        self.state.lock().unwrap().failing_bill_writes.insert(account_id.to_string());
    }

    pub fn bills(&self) -> Vec<Bill> {
        self.state.lock().unwrap().bills.values().cloned().collect()
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<String> {
        self.state.lock().unwrap().updated.clone()
    }

    pub fn status_updates(&self) -> Vec<(String, AccountStatus)> {
        self.state.lock().unwrap().status_updates.clone()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(anyhow!("duplicate key value violates unique constraint \"users_email_key\""));
        }
        state.users.push(user.clone());
        Ok(user.clone())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.lock().unwrap();
        if state.fail_user_listing {
            return Err(anyhow!("users table unavailable"));
        }
        Ok(state.users.clone())
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.users.len();
        state.users.retain(|u| u.id != user_id);
        if state.users.len() == before {
            return Ok(false);
        }

        let removed: HashSet<String> = state
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.id.clone())
            .collect();
        state.accounts.retain(|a| a.user_id != user_id);
        state.bills.retain(|_, b| !removed.contains(&b.linked_account_id));
        Ok(true)
    }

    async fn list_providers(&self) -> Result<Vec<Provider>> {
        Ok(self.state.lock().unwrap().providers.clone())
    }

    async fn find_provider(&self, provider_id: &str) -> Result<Option<Provider>> {
        let state = self.state.lock().unwrap();
        Ok(state.providers.iter().find(|p| p.id == provider_id).cloned())
    }

    async fn create_provider(&self, provider: &Provider) -> Result<Provider> {
        self.state.lock().unwrap().providers.push(provider.clone());
        Ok(provider.clone())
    }

    async fn linked_accounts_for_user(&self, user_id: &str) -> Result<Vec<LinkedAccount>> {
        let state = self.state.lock().unwrap();
        if state.fail_account_reads {
            return Err(anyhow!("linked_accounts table unavailable"));
        }
        Ok(state.accounts.iter().filter(|a| a.user_id == user_id).cloned().collect())
    }

    async fn create_linked_account(&self, account: &LinkedAccount) -> Result<LinkedAccount> {
        self.state.lock().unwrap().accounts.push(account.clone());
        Ok(account.clone())
    }

    async fn delete_linked_account(&self, user_id: &str, account_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.accounts.len();
        state.accounts.retain(|a| !(a.id == account_id && a.user_id == user_id));
        Ok(state.accounts.len() < before)
    }

    async fn update_linked_account_status(&self, account_id: &str, status: AccountStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.status_updates.push((account_id.to_string(), status));
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.status = status;
        }
        Ok(())
    }

    async fn create_bill(&self, bill: &Bill) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_bill_writes.contains(&bill.linked_account_id) {
            return Err(anyhow!("bills insert failed"));
        }
        if state.bills.contains_key(&bill.id) {
            return Err(anyhow!("duplicate key value violates unique constraint \"bills_pkey\""));
        }
        state.created.push(bill.id.clone());
        state.bills.insert(bill.id.clone(), bill.clone());
        Ok(())
    }

    async fn update_bill(&self, bill: &Bill) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.failing_bill_writes.contains(&bill.linked_account_id) {
            return Err(anyhow!("bills update failed"));
        }
        let owned = state.bills.get(&bill.id).map_or(false, |existing| {
            existing.linked_account_id == bill.linked_account_id && existing.provider_id == bill.provider_id
        });
        if !owned {
            return Ok(false);
        }
        state.updated.push(bill.id.clone());
        state.bills.insert(bill.id.clone(), bill.clone());
        Ok(true)
    }

    async fn bills_for_user(&self, user_id: &str) -> Result<Vec<Bill>> {
        let state = self.state.lock().unwrap();
        let owned: HashSet<&str> = state
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.id.as_str())
            .collect();
        Ok(state
            .bills
            .values()
            .filter(|b| owned.contains(b.linked_account_id.as_str()))
            .cloned()
            .collect())
    }
}

/// How the scripted provider answers for one provider id.
#[derive(Debug, Clone)]
pub enum Script {
    Bills(Vec<Bill>),
    /// Fail the first `n` calls, then return the bills.
    FailTimes(u32, Vec<Bill>),
    AlwaysFail,
    Delayed(Duration, Vec<Bill>),
}

/// Provider fake that answers per provider id and counts calls per account.
pub struct ScriptedProvider {
    id: String,
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::with_id("scripted")
    }

    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, provider_id: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(provider_id.to_string(), script);
        self
    }

    pub fn calls_for(&self, account_id: &str) -> u32 {
        self.calls.lock().unwrap().get(account_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl BillProvider for ScriptedProvider {
    async fn fetch_bills(&self, account: &LinkedAccount) -> Result<Vec<Bill>, ProviderError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(account.id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let script = self.scripts.lock().unwrap().get(&account.provider_id).cloned();

        match script {
            Some(Script::Bills(bills)) => Ok(bills),
            Some(Script::FailTimes(n, bills)) => {
                if call <= n {
                    Err(ProviderError::Upstream { status: 503 })
                } else {
                    Ok(bills)
                }
            }
            Some(Script::AlwaysFail) => Err(ProviderError::Timeout),
            Some(Script::Delayed(delay, bills)) => {
                tokio::time::sleep(delay).await;
                Ok(bills)
            }
            None => Err(ProviderError::UnknownProvider(account.provider_id.clone())),
        }
    }

    async fn validate_credentials(&self, credentials: &str) -> Result<bool, ProviderError> {
        Ok(!credentials.is_empty() && credentials != "bad")
    }

    fn provider_info(&self) -> Provider {
        let now = Utc::now();
        Provider {
            id: self.id.clone(),
            name: format!("{} provider", self.id),
            api_endpoint: format!("http://{}.test", self.id),
            auth_type: "bearer".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
