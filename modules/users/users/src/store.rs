//! In-memory user collection kept in sync with the backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use sitecrew_bootstrap::UsersConfig;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, instrument};
use users_sdk::validation::validate_photo_url;
use users_sdk::{NewUser, PartialUser, User, UserPatch, UsersError};

use crate::api::UsersApi;

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Unforced fetches within this window after a successful fetch are skipped
    pub freshness_window: Duration,
    /// Fail fast on a second mutation of a user whose first has not finished
    pub reject_concurrent_mutations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            reject_concurrent_mutations: true,
        }
    }
}

impl From<&UsersConfig> for StoreConfig {
    fn from(config: &UsersConfig) -> Self {
        Self {
            freshness_window: config.freshness_window,
            reject_concurrent_mutations: config.reject_concurrent_mutations,
        }
    }
}

/// Point-in-time copy of the store state. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub users: Arc<Vec<User>>,
    /// At least one network operation is in flight
    pub loading: bool,
    /// Banner text for the last failure, until cleared or superseded
    pub error: Option<String>,
    pub last_fetch_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Collection is fresh; no request was sent
    Skipped,
    Fetched,
    /// Request failed; see `StoreSnapshot::error`
    Failed,
}

#[derive(Default)]
struct State {
    users: Arc<Vec<User>>,
    pending: usize,
    error: Option<String>,
    last_fetch_at: Option<Instant>,
}

/// List state store for the users screen.
///
/// Build once and share through `Arc`. State lives behind a lock that is
/// never held across an await; every change bumps the revision published
/// by [`UserListStore::subscribe`].
pub struct UserListStore {
    api: Arc<dyn UsersApi>,
    config: StoreConfig,
    state: RwLock<State>,
    in_flight: Mutex<HashSet<String>>,
    revision: watch::Sender<u64>,
}

impl std::fmt::Debug for UserListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("UserListStore")
            .field("config", &self.config)
            .field("users", &state.users.len())
            .field("pending", &state.pending)
            .finish_non_exhaustive()
    }
}

struct LoadingGuard<'a> {
    store: &'a UserListStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store
            .update_state(|state| state.pending = state.pending.saturating_sub(1));
    }
}

struct MutationGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    uid: String,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.uid);
    }
}

impl UserListStore {
    #[must_use]
    pub fn new(api: Arc<dyn UsersApi>, config: StoreConfig) -> Self {
        Self {
            api,
            config,
            state: RwLock::new(State::default()),
            in_flight: Mutex::new(HashSet::new()),
            revision: watch::Sender::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read();
        StoreSnapshot {
            users: Arc::clone(&state.users),
            loading: state.pending > 0,
            error: state.error.clone(),
            last_fetch_at: state.last_fetch_at,
        }
    }

    #[must_use]
    pub fn users(&self) -> Arc<Vec<User>> {
        Arc::clone(&self.state.read().users)
    }

    /// Revision counter, bumped on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Look up a cached user by backend record id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.state.read().users.iter().find(|u| u.id == id).cloned()
    }

    #[must_use]
    pub fn find_by_uid(&self, uid: &str) -> Option<User> {
        self.state.read().users.iter().find(|u| u.uid == uid).cloned()
    }

    pub fn clear_error(&self) {
        if self.state.read().error.is_none() {
            return;
        }
        self.update_state(|state| state.error = None);
    }

    /// Load the collection unless it is non-empty and still fresh.
    ///
    /// Failures are recorded in the snapshot's `error`; the collection is
    /// left as it was.
    #[instrument(skip(self))]
    pub async fn fetch(&self, force_refresh: bool) -> FetchOutcome {
        if !force_refresh && self.is_fresh() {
            debug!("user list is fresh, skipping fetch");
            return FetchOutcome::Skipped;
        }

        let _loading = self.begin_loading();
        match self.api.get_all().await {
            Ok(users) => {
                debug!(count = users.len(), "user list fetched");
                self.update_state(|state| {
                    state.users = Arc::new(users);
                    state.last_fetch_at = Some(Instant::now());
                    state.error = None;
                });
                FetchOutcome::Fetched
            }
            Err(err) => {
                self.record_failure(err);
                FetchOutcome::Failed
            }
        }
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.fetch(true).await
    }

    /// Fetch one user for a detail view. The collection is not touched.
    ///
    /// # Errors
    /// Returns the classified API failure.
    pub async fn fetch_by_id(&self, id: &str) -> Result<User, UsersError> {
        let _loading = self.begin_loading();
        self.api.get_by_id(id).await
    }

    /// Validate, create, and append the created user.
    ///
    /// # Errors
    /// Returns `Validation` before any request is sent, or the classified API
    /// failure (also recorded as the store error).
    #[instrument(skip_all)]
    pub async fn create(&self, new_user: &NewUser) -> Result<User, UsersError> {
        new_user.validate()?;

        let _loading = self.begin_loading();
        match self.api.create(new_user).await {
            Ok(user) => {
                debug!(uid = %user.uid, "user created");
                let appended = user.clone();
                self.update_state(move |state| {
                    Arc::make_mut(&mut state.users).push(appended);
                    state.error = None;
                });
                Ok(user)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    /// Update the user keyed by `uid` and merge the server's reply.
    ///
    /// # Errors
    /// Returns `Validation` or `MutationInFlight` without a request, or the
    /// classified API failure (also recorded as the store error).
    #[instrument(skip(self, patch))]
    pub async fn update(&self, uid: &str, patch: &UserPatch) -> Result<PartialUser, UsersError> {
        patch.validate()?;
        let _claim = self.claim(uid)?;

        let _loading = self.begin_loading();
        let result = self.api.update(uid, patch).await;
        self.apply_partial(uid, result)
    }

    /// Replace the photo of the user keyed by `uid`.
    ///
    /// # Errors
    /// Same as [`UserListStore::update`].
    #[instrument(skip(self, photo_url))]
    pub async fn update_photo(&self, uid: &str, photo_url: &str) -> Result<PartialUser, UsersError> {
        validate_photo_url(photo_url)?;
        let _claim = self.claim(uid)?;

        let _loading = self.begin_loading();
        let result = self.api.update_photo(uid, photo_url).await;
        self.apply_partial(uid, result)
    }

    /// Delete the user keyed by `uid` and drop matching entries.
    ///
    /// # Errors
    /// Returns `MutationInFlight` without a request, or the classified API
    /// failure (also recorded as the store error).
    #[instrument(skip(self))]
    pub async fn delete(&self, uid: &str) -> Result<(), UsersError> {
        let _claim = self.claim(uid)?;

        let _loading = self.begin_loading();
        match self.api.delete(uid).await {
            Ok(()) => {
                self.update_state(|state| {
                    Arc::make_mut(&mut state.users).retain(|u| u.uid != uid);
                    state.error = None;
                });
                Ok(())
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    fn apply_partial(
        &self,
        uid: &str,
        result: Result<PartialUser, UsersError>,
    ) -> Result<PartialUser, UsersError> {
        match result {
            Ok(partial) => {
                let merged = partial.clone();
                self.update_state(move |state| {
                    for user in Arc::make_mut(&mut state.users)
                        .iter_mut()
                        .filter(|u| u.uid == uid)
                    {
                        user.merge(merged.clone());
                    }
                    state.error = None;
                });
                Ok(partial)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    fn is_fresh(&self) -> bool {
        let state = self.state.read();
        !state.users.is_empty()
            && state
                .last_fetch_at
                .is_some_and(|at| at.elapsed() < self.config.freshness_window)
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.update_state(|state| state.pending += 1);
        LoadingGuard { store: self }
    }

    fn claim(&self, uid: &str) -> Result<Option<MutationGuard<'_>>, UsersError> {
        if !self.config.reject_concurrent_mutations {
            return Ok(None);
        }
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(uid.to_owned()) {
            debug!(uid, "mutation already in flight");
            return Err(UsersError::MutationInFlight { id: uid.to_owned() });
        }
        Ok(Some(MutationGuard {
            in_flight: &self.in_flight,
            uid: uid.to_owned(),
        }))
    }

    /// Set the banner text and hand the error back.
    fn record_failure(&self, err: UsersError) -> UsersError {
        let message = err.user_message();
        self.update_state(|state| state.error = Some(message));
        err
    }

    fn update_state(&self, apply: impl FnOnce(&mut State)) {
        apply(&mut self.state.write());
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}
