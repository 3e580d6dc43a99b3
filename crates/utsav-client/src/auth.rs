use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;
use uuid::Uuid;

use utsav_types::models::Profile;

/// The signed-in account and the token that authenticates it.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

/// Auth state for one client session.
///
/// Built once and handed to everything that needs to know who is signed in.
/// Clones share the same state. `sign_out` is the only way to invalidate it.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    inner: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AuthState {
        self.read().clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Role as last fetched from the server. Only used to shape the UI; the
    /// server re-checks the role on every admin request.
    pub fn is_admin(&self) -> bool {
        self.read().profile.as_ref().is_some_and(|p| p.role.is_admin())
    }

    pub fn sign_out(&self) {
        let mut state = self.write();
        if let Some(user) = state.user.take() {
            info!(user_id = %user.id, "Signed out");
        }
        *state = AuthState::default();
    }

    pub(crate) fn begin_loading(&self) {
        self.write().loading = true;
    }

    pub(crate) fn finish_loading(&self) {
        self.write().loading = false;
    }

    pub(crate) fn set_user(&self, user: SessionUser) {
        let mut state = self.write();
        state.user = Some(user);
        state.profile = None;
    }

    pub(crate) fn set_profile(&self, profile: Profile) {
        self.write().profile = Some(profile);
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utsav_types::models::Role;

    fn user() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: "gate@utsav.test".into(),
            token: "token".into(),
        }
    }

    #[test]
    fn clones_share_state() {
        let auth = AuthContext::new();
        let view = auth.clone();
        auth.set_user(user());
        assert!(view.user().is_some());
    }

    #[test]
    fn sign_out_clears_everything() {
        let auth = AuthContext::new();
        let user = user();
        auth.set_user(user.clone());
        auth.set_profile(Profile {
            id: user.id,
            full_name: Some("Gate Admin".into()),
            email: Some(user.email.clone()),
            phone_number: None,
            role: Role::Admin,
        });
        auth.begin_loading();
        assert!(auth.is_admin());

        auth.sign_out();
        let state = auth.snapshot();
        assert!(state.user.is_none());
        assert!(state.profile.is_none());
        assert!(!state.loading);
        assert!(!auth.is_admin());
    }

    #[test]
    fn switching_user_drops_stale_profile() {
        let auth = AuthContext::new();
        let first = user();
        auth.set_user(first.clone());
        auth.set_profile(Profile {
            id: first.id,
            full_name: None,
            email: None,
            phone_number: None,
            role: Role::Admin,
        });
        auth.set_user(user());
        assert!(auth.profile().is_none());
    }
}
