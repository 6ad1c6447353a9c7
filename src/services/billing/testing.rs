//! In-memory stand-ins for the billing seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::entitlement_store::{ApplyResult, EntitlementMutation, EntitlementStore, LedgerKey};
use super::gateway::PaymentGateway;
use crate::clients::{CheckoutItem, ProviderError};
use crate::error::AppError;
use crate::models::{PaymentProvider, PlanConfiguration, ProviderResource, ResourceKind, Role, UserProfile};

#[derive(Default)]
struct StoreState {
    profiles: HashMap<String, UserProfile>,
    plans: HashMap<Role, PlanConfiguration>,
    ledger: HashSet<LedgerKey>,
    balances: HashMap<String, i64>,
    refills: Vec<(String, i64)>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
    apply_calls: AtomicUsize,
    plan_calls: AtomicUsize,
}

impl FakeStore {
    pub fn with_profile(user_id: &str, role: Role) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().profiles.insert(
            user_id.to_string(),
            UserProfile {
                id: user_id.to_string(),
                role,
                permissions: role.default_permissions(),
                updated_at: None,
            },
        );
        store
    }

    pub fn set_plan(&self, role: Role, price: &str, permissions: Vec<String>) {
        self.state.lock().unwrap().plans.insert(
            role,
            PlanConfiguration {
                role,
                name: role.as_str().to_string(),
                price: price.to_string(),
                permissions,
            },
        );
    }

    pub fn set_plan_permissions(&self, role: Role, permissions: Vec<String>) {
        self.set_plan(role, "R$ 0", permissions);
    }

    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.state.lock().unwrap().profiles.get(user_id).cloned()
    }

    pub fn balance(&self, user_id: &str) -> i64 {
        self.state.lock().unwrap().balances.get(user_id).copied().unwrap_or(0)
    }

    pub fn refill_count(&self, user_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .refills
            .iter()
            .filter(|(user, _)| user == user_id)
            .count()
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.apply_calls() + self.plan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementStore for FakeStore {
    async fn plan_configuration(&self, role: Role) -> Result<Option<PlanConfiguration>, AppError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().plans.get(&role).cloned())
    }

    async fn apply(
        &self,
        key: &LedgerKey,
        user_id: &str,
        mutation: &EntitlementMutation,
    ) -> Result<ApplyResult, AppError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let recorded = !state.ledger.contains(key);

        match mutation {
            EntitlementMutation::GrantCredits { amount, .. } => {
                if !recorded {
                    return Ok(ApplyResult::AlreadyProcessed);
                }
                state.ledger.insert(key.clone());
                let balance = state.balances.entry(user_id.to_string()).or_insert(0);
                *balance += amount;
                let balance = *balance;
                state.refills.push((user_id.to_string(), *amount));
                Ok(ApplyResult::Applied { balance: Some(balance) })
            }
            EntitlementMutation::SetRole { role, permissions } => {
                let Some(profile) = state.profiles.get_mut(user_id) else {
                    return Err(AppError::NotFound(format!("Profile {} not found", user_id)));
                };
                let result = if profile.role == *role && profile.permissions == *permissions {
                    if recorded { ApplyResult::Unchanged } else { ApplyResult::AlreadyProcessed }
                } else {
                    profile.role = *role;
                    profile.permissions = permissions.clone();
                    ApplyResult::Applied { balance: None }
                };
                state.ledger.insert(key.clone());
                Ok(result)
            }
        }
    }
}

#[derive(Default)]
pub struct FakeGateway {
    resource: Mutex<Option<ProviderResource>>,
    fail_status: Option<u16>,
    fetch_calls: AtomicUsize,
    last_provider: Mutex<Option<PaymentProvider>>,
    checkouts: Mutex<Vec<CheckoutItem>>,
}

impl FakeGateway {
    pub fn with_resource(resource: ProviderResource) -> Self {
        Self {
            resource: Mutex::new(Some(resource)),
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::default()
        }
    }

    pub fn set_status(&self, status: &str) {
        if let Some(resource) = self.resource.lock().unwrap().as_mut() {
            resource.status = status.to_string();
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn last_provider(&self) -> Option<PaymentProvider> {
        *self.last_provider.lock().unwrap()
    }

    pub fn checkouts(&self) -> Vec<CheckoutItem> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn fetch_resource(
        &self,
        provider: PaymentProvider,
        _kind: ResourceKind,
        id: &str,
    ) -> Result<ProviderResource, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_provider.lock().unwrap() = Some(provider);

        if let Some(status) = self.fail_status {
            return Err(ProviderError::Upstream {
                provider: "fake",
                status: Some(status),
                message: "unavailable".to_string(),
            });
        }

        self.resource
            .lock()
            .unwrap()
            .clone()
            .filter(|resource| resource.id == id)
            .ok_or(ProviderError::Upstream {
                provider: "fake",
                status: Some(404),
                message: format!("resource {} not found", id),
            })
    }

    async fn create_checkout(&self, item: &CheckoutItem) -> Result<String, ProviderError> {
        if let Some(status) = self.fail_status {
            return Err(ProviderError::Upstream {
                provider: "fake",
                status: Some(status),
                message: "unavailable".to_string(),
            });
        }
        self.checkouts.lock().unwrap().push(item.clone());
        Ok(format!("https://checkout.example/{}", item.external_reference))
    }
}
