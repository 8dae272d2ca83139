//! Per-user privilege grants.
//!
//! A user's privileges are stored as one [`PrivilegeGrant`] row per name.
//! [`PrivilegeManager::set_privileges`] moves the stored set to a requested
//! one with the fewest possible writes: every removal first, then every
//! addition. No lock is taken; concurrent duplicate additions are rejected
//! by the backend's uniqueness constraint.

mod errors;

use std::{collections::BTreeSet, fmt, sync::Arc};

use tracing::{debug, info};

pub use errors::PrivilegeError;

use crate::{
    Result, UserAccount, UserId, backend::BackendImpl, constants::PRIVILEGE_MANAGE_USER,
};

/// The minimal set of changes between two privilege sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Stored privileges that are not requested
    pub removed: BTreeSet<String>,
    /// Requested privileges that are not stored
    pub added: BTreeSet<String>,
}

impl Reconciliation {
    /// Compute the diff from `current` to `requested`.
    pub fn plan(current: &BTreeSet<String>, requested: &BTreeSet<String>) -> Self {
        Self {
            removed: current.difference(requested).cloned().collect(),
            added: requested.difference(current).cloned().collect(),
        }
    }

    /// Number of grant writes this diff performs.
    pub fn write_count(&self) -> usize {
        self.removed.len() + self.added.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Reads and reconciles privilege grants.
#[derive(Clone)]
pub struct PrivilegeManager {
    backend: Arc<dyn BackendImpl>,
}

impl fmt::Debug for PrivilegeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegeManager").finish_non_exhaustive()
    }
}

impl PrivilegeManager {
    pub fn new(backend: Arc<dyn BackendImpl>) -> Self {
        Self { backend }
    }

    /// The privilege names currently granted to a user.
    pub async fn get_privileges(&self, user_id: UserId) -> Result<BTreeSet<String>> {
        Ok(self
            .backend
            .list_grants(user_id)
            .await?
            .into_iter()
            .map(|g| g.privilege)
            .collect())
    }

    /// Replace a user's privileges with `requested`.
    ///
    /// Duplicates in `requested` are ignored. If a grant scheduled for
    /// removal is gone by the time it is removed, this fails with
    /// [`PrivilegeError::GrantNotFound`] and the remaining changes are not
    /// applied.
    pub async fn set_privileges<I, S>(&self, user_id: UserId, requested: I) -> Result<Reconciliation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: BTreeSet<String> = requested.into_iter().map(Into::into).collect();
        let current = self.get_privileges(user_id).await?;
        let plan = Reconciliation::plan(&current, &requested);

        if plan.is_empty() {
            debug!(user_id, "Privileges already up to date");
            return Ok(plan);
        }

        for privilege in &plan.removed {
            let grant = self
                .backend
                .find_grant(user_id, privilege)
                .await?
                .ok_or_else(|| PrivilegeError::GrantNotFound {
                    user_id,
                    privilege: privilege.clone(),
                })?;
            self.backend.remove_grant(&grant).await?;
        }

        for privilege in &plan.added {
            self.backend.create_grant(user_id, privilege).await?;
        }

        info!(
            user_id,
            removed = ?plan.removed,
            added = ?plan.added,
            "Reconciled privileges"
        );
        Ok(plan)
    }

    /// Whether a user holds `privilege`. Admins hold every privilege.
    pub async fn has_privilege(&self, user_id: UserId, privilege: &str) -> Result<bool> {
        let account = self.backend.get_account(user_id).await?;
        self.account_has_privilege(&account, privilege).await
    }

    /// Like [`has_privilege`](Self::has_privilege) for an already loaded account.
    pub async fn account_has_privilege(
        &self,
        account: &UserAccount,
        privilege: &str,
    ) -> Result<bool> {
        if account.is_admin {
            return Ok(true);
        }
        Ok(self
            .backend
            .find_grant(account.id, privilege)
            .await?
            .is_some())
    }

    /// Whether `editor` may edit the account `target_id`.
    ///
    /// Anonymous editors never may. Holders of `manage_user` always may;
    /// everybody else only edits themselves.
    pub async fn is_allowed_edit_by(
        &self,
        target_id: UserId,
        editor: Option<&UserAccount>,
    ) -> Result<bool> {
        let Some(editor) = editor else {
            return Ok(false);
        };
        if self
            .account_has_privilege(editor, PRIVILEGE_MANAGE_USER)
            .await?
        {
            return Ok(true);
        }
        Ok(editor.is_admin || editor.id == target_id)
    }
}
