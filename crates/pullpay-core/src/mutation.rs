//! Form submissions with optimistic local updates.
//!
//! A [`MutationSubmitter`] owns one shared target (a collection or a
//! record) and runs at most one request at a time against it. The
//! optimistic change is visible through the shared handle while the request
//! is in flight, and is either replaced by the confirmed entity or removed.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{ApiClient, FetchError, Method, decode_value, encode_body, paths};
use crate::models::{Church, ChurchRef, NewTransaction, ProfileUpdate, Transaction, UserProfile};

/// Shared handle to the state a view renders.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How one kind of form submission talks to the backend and patches local
/// state.
pub trait MutationStrategy {
    type Target;
    type Payload: Serialize + Clone;
    type Entity: DeserializeOwned + Clone;

    fn method(&self) -> Method;

    fn path(&self) -> &str;

    /// Shown when the server fails without a message of its own.
    fn fallback_message(&self) -> &str;

    /// Applies the optimistic change, returning a key that identifies it.
    /// `None` means nothing was applied.
    fn apply_optimistic(&self, target: &mut Self::Target, payload: &Self::Payload)
    -> Option<String>;

    /// Replaces the optimistic change (if any) with the confirmed entity.
    fn commit(&self, target: &mut Self::Target, optimistic: Option<&str>, entity: &Self::Entity);

    /// Removes the optimistic change.
    fn rollback(&self, target: &mut Self::Target, optimistic: Option<&str>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// A previous submission has not finished yet. Nothing was sent.
    InFlight,
    Fetch(FetchError),
}

impl MutationError {
    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            MutationError::InFlight => {
                "Please wait for the current submission to finish.".to_string()
            }
            MutationError::Fetch(err) => err.user_message_or(fallback),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, MutationError::Fetch(err) if err.is_unauthenticated())
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::InFlight => write!(f, "Submission already in progress"),
            MutationError::Fetch(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MutationError::InFlight => None,
            MutationError::Fetch(err) => Some(err),
        }
    }
}

impl From<FetchError> for MutationError {
    fn from(err: FetchError) -> Self {
        MutationError::Fetch(err)
    }
}

/// A submission between send and response.
#[derive(Debug, Clone)]
pub struct PendingMutation<P> {
    pub payload: P,
    pub optimistic_entry: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Runs submissions of one strategy against one shared target.
pub struct MutationSubmitter<S: MutationStrategy> {
    client: ApiClient,
    strategy: S,
    target: Shared<S::Target>,
    pending: Mutex<Option<PendingMutation<S::Payload>>>,
}

/// Clears the pending slot however `submit` exits. A submission dropped
/// before it settles has its optimistic change rolled back.
struct Settle<'a, S: MutationStrategy> {
    submitter: &'a MutationSubmitter<S>,
    optimistic: Option<String>,
    settled: bool,
}

impl<S: MutationStrategy> Drop for Settle<'_, S> {
    fn drop(&mut self) {
        let submitter = self.submitter;
        if !self.settled {
            submitter
                .strategy
                .rollback(&mut lock(&submitter.target), self.optimistic.as_deref());
            debug!(path = submitter.strategy.path(), "abandoned mutation rolled back");
        }
        *lock(&submitter.pending) = None;
    }
}

impl<S: MutationStrategy> MutationSubmitter<S> {
    pub fn new(client: ApiClient, strategy: S, target: Shared<S::Target>) -> Self {
        Self {
            client,
            strategy,
            target,
            pending: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &Shared<S::Target> {
        &self.target
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    pub fn pending(&self) -> Option<PendingMutation<S::Payload>> {
        lock(&self.pending).clone()
    }

    /// Submits `payload`.
    ///
    /// # Errors
    /// `InFlight` if another submission is pending (nothing is sent), or the
    /// fetch error after the optimistic change has been rolled back.
    pub async fn submit(&self, payload: S::Payload) -> Result<S::Entity, MutationError> {
        {
            let mut pending = lock(&self.pending);
            if pending.is_some() {
                return Err(MutationError::InFlight);
            }
            *pending = Some(PendingMutation {
                payload: payload.clone(),
                optimistic_entry: None,
                submitted_at: Utc::now(),
            });
        }
        let mut settle = Settle {
            submitter: self,
            optimistic: None,
            settled: false,
        };

        settle.optimistic = self
            .strategy
            .apply_optimistic(&mut lock(&self.target), &payload);
        if let Some(entry) = lock(&self.pending).as_mut() {
            entry.optimistic_entry.clone_from(&settle.optimistic);
        }

        let result = self.send(&payload).await;

        let optimistic = settle.optimistic.as_deref();
        let mut target = lock(&self.target);
        let outcome = match result {
            Ok(entity) => {
                self.strategy.commit(&mut target, optimistic, &entity);
                debug!(path = self.strategy.path(), "mutation committed");
                Ok(entity)
            }
            Err(err) => {
                self.strategy.rollback(&mut target, optimistic);
                debug!(path = self.strategy.path(), "mutation rolled back: {err}");
                Err(err.into())
            }
        };
        drop(target);
        settle.settled = true;
        outcome
    }

    async fn send(&self, payload: &S::Payload) -> Result<S::Entity, FetchError> {
        let body = encode_body(payload)?;
        let value = self
            .client
            .request(self.strategy.method(), self.strategy.path(), Some(&body))
            .await?;
        decode_value(value)
    }
}

impl<S: MutationStrategy> fmt::Debug for MutationSubmitter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSubmitter")
            .field("path", &self.strategy.path())
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

/// `POST /transactions/create/`: prepends a pending entry, then swaps in
/// the created transaction.
#[derive(Debug, Clone, Default)]
pub struct CreateTransaction {
    churches: Vec<Church>,
}

impl CreateTransaction {
    /// `churches` is used to label entries whose church arrives as a bare id.
    pub fn new(churches: Vec<Church>) -> Self {
        Self { churches }
    }

    fn church_name(&self, id: u64) -> Option<String> {
        self.churches
            .iter()
            .find(|church| church.id == id)
            .map(|church| church.name.clone())
    }
}

impl MutationStrategy for CreateTransaction {
    type Target = Vec<Transaction>;
    type Payload = NewTransaction;
    type Entity = Transaction;

    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> &str {
        paths::CREATE_TRANSACTION
    }

    fn fallback_message(&self) -> &str {
        "Failed to create transaction"
    }

    fn apply_optimistic(
        &self,
        target: &mut Vec<Transaction>,
        payload: &NewTransaction,
    ) -> Option<String> {
        let id = format!("pending-{}", uuid::Uuid::new_v4());
        target.insert(
            0,
            Transaction {
                id: id.clone(),
                amount: payload.amount,
                date: Utc::now(),
                user_first_name: String::new(),
                user_last_name: String::new(),
                church: Some(ChurchRef::Id(payload.church_id)),
                church_name: self.church_name(payload.church_id),
                pending: true,
            },
        );
        Some(id)
    }

    fn commit(
        &self,
        target: &mut Vec<Transaction>,
        optimistic: Option<&str>,
        entity: &Transaction,
    ) {
        let mut confirmed = entity.clone();
        confirmed.pending = false;
        if confirmed.church_name.is_none() {
            confirmed.church_name = confirmed
                .church
                .as_ref()
                .and_then(ChurchRef::id)
                .and_then(|id| self.church_name(id));
        }

        let slot = optimistic.and_then(|id| target.iter().position(|tx| tx.id == id));
        match slot {
            Some(index) => target[index] = confirmed,
            None => target.insert(0, confirmed),
        }
    }

    fn rollback(&self, target: &mut Vec<Transaction>, optimistic: Option<&str>) {
        if let Some(id) = optimistic {
            target.retain(|tx| tx.id != id);
        }
    }
}

/// `PUT /user/`: no optimistic change, the response replaces the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateProfile;

impl MutationStrategy for UpdateProfile {
    type Target = Option<UserProfile>;
    type Payload = ProfileUpdate;
    type Entity = UserProfile;

    fn method(&self) -> Method {
        Method::PUT
    }

    fn path(&self) -> &str {
        paths::UPDATE_USER
    }

    fn fallback_message(&self) -> &str {
        "Failed to update profile"
    }

    fn apply_optimistic(
        &self,
        _target: &mut Option<UserProfile>,
        _payload: &ProfileUpdate,
    ) -> Option<String> {
        None
    }

    fn commit(
        &self,
        target: &mut Option<UserProfile>,
        _optimistic: Option<&str>,
        entity: &UserProfile,
    ) {
        *target = Some(entity.clone());
    }

    fn rollback(&self, _target: &mut Option<UserProfile>, _optimistic: Option<&str>) {}
}
