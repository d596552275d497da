//! Resolves callers to roles and enforces authorization

use crate::error::{LibraryError, Result};
use crate::types::{Principal, Role, SystemRole, UserAccount, UserProfile};
use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Registered principals and the set of principals that register as admin
#[derive(Debug, Default)]
pub struct RoleAuthority {
    accounts: RwLock<BTreeMap<Principal, UserAccount>>,
    bootstrap_admins: HashSet<Principal>,
}

impl RoleAuthority {
    pub fn new(bootstrap_admins: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            bootstrap_admins: bootstrap_admins.into_iter().collect(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Principal, UserAccount>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Principal, UserAccount>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unregistered and anonymous callers are guests
    pub fn role_of(&self, principal: &Principal) -> Role {
        if principal.is_anonymous() {
            return Role::GUEST;
        }
        self.read()
            .get(principal)
            .map(|account| account.role)
            .unwrap_or(Role::GUEST)
    }

    /// Precondition check: fail before any state is touched
    pub fn require(&self, caller: &Principal, required: SystemRole) -> Result<Role> {
        let role = self.role_of(caller);
        if role.at_least(required) {
            Ok(role)
        } else {
            warn!(caller = %caller, ?required, actual = ?role.system_role, "Authorization denied");
            Err(LibraryError::Unauthorized(format!(
                "requires {:?} role",
                required
            )))
        }
    }

    pub fn require_admin(&self, caller: &Principal) -> Result<Role> {
        self.require(caller, SystemRole::Admin)
    }

    /// Self-registration. Re-registering only renames.
    pub fn register(&self, caller: &Principal, profile: UserProfile) -> Result<UserAccount> {
        if caller.is_anonymous() {
            return Err(LibraryError::Unauthorized(
                "anonymous callers cannot register".to_string(),
            ));
        }
        let name = normalize_name(&profile.name)?;

        let mut accounts = self.write();
        if let Some(account) = accounts.get_mut(caller) {
            account.name = name;
            return Ok(account.clone());
        }

        let system_role = if self.bootstrap_admins.contains(caller) {
            SystemRole::Admin
        } else {
            SystemRole::User
        };
        let account = UserAccount {
            principal: caller.clone(),
            name,
            role: Role {
                system_role,
                is_author: false,
            },
        };
        accounts.insert(caller.clone(), account.clone());
        info!(principal = %caller, ?system_role, "Registered account");
        Ok(account)
    }

    pub fn profile(&self, caller: &Principal) -> Option<UserProfile> {
        self.read().get(caller).map(UserAccount::profile)
    }

    /// Update the caller's own profile. `is_author` cannot be self-granted.
    pub fn save_profile(&self, caller: &Principal, profile: UserProfile) -> Result<UserProfile> {
        self.require(caller, SystemRole::User)?;
        let name = normalize_name(&profile.name)?;

        let mut accounts = self.write();
        let account = accounts
            .get_mut(caller)
            .ok_or_else(|| LibraryError::NotFound(format!("account {}", caller)))?;
        account.name = name;
        Ok(account.profile())
    }

    /// Admin-only role change. Assigning `Guest` removes the account.
    pub fn assign_role(
        &self,
        caller: &Principal,
        target: &Principal,
        system_role: SystemRole,
    ) -> Result<Role> {
        self.require_admin(caller)?;

        let mut accounts = self.write();
        if system_role == SystemRole::Guest {
            accounts.remove(target);
            info!(admin = %caller, target = %target, "Revoked account");
            return Ok(Role::GUEST);
        }

        let account = accounts
            .get_mut(target)
            .ok_or_else(|| LibraryError::NotFound(format!("account {}", target)))?;
        account.role.system_role = system_role;
        info!(admin = %caller, target = %target, ?system_role, "Assigned role");
        Ok(account.role)
    }

    /// Admin-only; sets the authorship axis without touching the system role
    pub fn promote_to_author(&self, caller: &Principal, target: &Principal) -> Result<Role> {
        self.require_admin(caller)?;

        let mut accounts = self.write();
        let account = accounts
            .get_mut(target)
            .ok_or_else(|| LibraryError::NotFound(format!("account {}", target)))?;
        account.role.is_author = true;
        info!(admin = %caller, target = %target, "Promoted to author");
        Ok(account.role)
    }

    pub(crate) fn remove(&self, principal: &Principal) -> Option<UserAccount> {
        self.write().remove(principal)
    }

    pub(crate) fn insert(&self, account: UserAccount) {
        self.write().insert(account.principal.clone(), account);
    }

    pub fn accounts(&self) -> Vec<UserAccount> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        Err(LibraryError::InvalidInput("name must not be empty".to_string()))
    } else {
        Ok(name.to_string())
    }
}
