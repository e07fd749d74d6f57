//! # Mock Collaborators
//!
//! Test doubles for the store, the identity provider and the event publisher.
//!
//! Each mock delegates to the in-memory adapter and adds three things on top:
//!
//! - a shared [`CallJournal`] recording when every call starts and finishes, keyed by
//!   user id so overlap checks cover every collaborator
//! - failure injection ([`Faults::fail_next`], [`Faults::fail_always`])
//! - [`Gate`]s that park a call until the test releases it
//!
//! ```rust,ignore
//! let mocks = MockCollaborators::new();
//! mocks.store.insert(UserRecord::new(1, "ext-1"));
//! let gate = mocks.store.faults().hold(1);
//!
//! let users = user_actor::new(mocks.context(UserManagementOptions::default()));
//! // ... start a call, then:
//! gate.entered().await;
//! gate.open();
//! ```

use crate::config::UserManagementOptions;
use crate::gateways::{
    Claims, EventPublisher, IdentityProvider, InMemoryIdentityProvider, InMemoryUserStore,
    ProviderError, PublishError, StoreError, UserStore,
};
use crate::model::{DomainEvent, UserId, UserRecord, UserStatus};
use crate::user_actor::UserContext;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// CALL JOURNAL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    Finished,
}

/// One journal line: `method` was entered or left for `subject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub method: &'static str,
    pub subject: String,
    pub phase: Phase,
}

/// Ordered record of collaborator calls, shared by every mock of one
/// [`MockCollaborators`].
///
/// Calls addressed by external id are journaled under the owning user id once the
/// record has been seeded through [`MockUserStore::insert`].
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
    owners: Arc<DashMap<String, UserId>>,
}

impl CallJournal {
    /// Journal calls made for `external_id` under `user_id`.
    pub fn alias(&self, external_id: &str, user_id: UserId) {
        self.owners.insert(external_id.to_string(), user_id);
    }

    /// The user id owning `external_id`, or the external id itself when unknown.
    pub fn subject_for(&self, external_id: &str) -> String {
        self.owners
            .get(external_id)
            .map(|user_id| user_id.to_string())
            .unwrap_or_else(|| external_id.to_string())
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }

    /// Started calls as `"method(subject)"`, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.phase == Phase::Started)
            .map(|entry| format!("{}({})", entry.method, entry.subject))
            .collect()
    }

    /// How many times `method` was entered.
    pub fn count(&self, method: &str) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.phase == Phase::Started && entry.method == method)
            .count()
    }

    /// Highest number of calls for `subject` that were in flight at the same time,
    /// across every collaborator.
    pub fn max_in_flight(&self, subject: &str) -> usize {
        let mut in_flight = 0usize;
        let mut max = 0usize;
        for entry in lock(&self.entries).iter().filter(|e| e.subject == subject) {
            match entry.phase {
                Phase::Started => {
                    in_flight += 1;
                    max = max.max(in_flight);
                }
                Phase::Finished => in_flight = in_flight.saturating_sub(1),
            }
        }
        max
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    fn start(&self, method: &'static str, subject: String) -> InFlight {
        lock(&self.entries).push(JournalEntry {
            method,
            subject: subject.clone(),
            phase: Phase::Started,
        });
        InFlight {
            journal: self.clone(),
            method,
            subject,
        }
    }
}

/// Records `Finished` when dropped, including when the call's future is abandoned.
struct InFlight {
    journal: CallJournal,
    method: &'static str,
    subject: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.journal.entries).push(JournalEntry {
            method: self.method,
            subject: std::mem::take(&mut self.subject),
            phase: Phase::Finished,
        });
    }
}

// =============================================================================
// GATES AND FAULTS
// =============================================================================

/// Parks calls until opened. Starts closed.
#[derive(Debug)]
pub struct Gate {
    open: watch::Sender<bool>,
    entered: Notify,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            open: watch::Sender::new(false),
            entered: Notify::new(),
        }
    }
}

impl Gate {
    /// Resolves once a call has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        let mut open = self.open.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = open.wait_for(|open| *open).await;
    }
}

/// Failure injection and gating for one mock collaborator.
#[derive(Debug)]
pub struct Faults<E> {
    next: Mutex<VecDeque<E>>,
    always: Mutex<Option<E>>,
    gates: DashMap<String, Arc<Gate>>,
    gate_all: Mutex<Option<Arc<Gate>>>,
}

impl<E> Default for Faults<E> {
    fn default() -> Self {
        Self {
            next: Mutex::new(VecDeque::new()),
            always: Mutex::new(None),
            gates: DashMap::new(),
            gate_all: Mutex::new(None),
        }
    }
}

impl<E: Clone> Faults<E> {
    /// The next call fails with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: E) {
        lock(&self.next).push_back(error);
    }

    /// Every call fails with `error` until [`Faults::reset`].
    pub fn fail_always(&self, error: E) {
        *lock(&self.always) = Some(error);
    }

    /// Parks calls for `subject` until the returned gate is opened.
    pub fn hold(&self, subject: impl ToString) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates.insert(subject.to_string(), gate.clone());
        gate
    }

    /// Parks every call until the returned gate is opened.
    pub fn hold_all(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *lock(&self.gate_all) = Some(gate.clone());
        gate
    }

    /// Drops every queued failure and gate. Opens the gates first so nothing stays parked.
    pub fn reset(&self) {
        lock(&self.next).clear();
        *lock(&self.always) = None;
        for gate in self.gates.iter() {
            gate.open();
        }
        self.gates.clear();
        if let Some(gate) = lock(&self.gate_all).take() {
            gate.open();
        }
    }

    async fn pass(&self, subject: &str) {
        let gate = self
            .gates
            .get(subject)
            .map(|gate| gate.clone())
            .or_else(|| lock(&self.gate_all).clone());
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }

    fn injected(&self) -> Option<E> {
        lock(&self.next)
            .pop_front()
            .or_else(|| lock(&self.always).clone())
    }
}

/// Journals the call, waits at any gate, then fails if asked to or runs `call`.
async fn intercept<T, E, F>(
    journal: &CallJournal,
    faults: &Faults<E>,
    method: &'static str,
    subject: String,
    call: F,
) -> Result<T, E>
where
    E: Clone,
    F: Future<Output = Result<T, E>>,
{
    let _in_flight = journal.start(method, subject.clone());
    faults.pass(&subject).await;
    if let Some(error) = faults.injected() {
        return Err(error);
    }
    call.await
}

// =============================================================================
// MOCKS
// =============================================================================

#[derive(Debug)]
pub struct MockUserStore {
    inner: InMemoryUserStore,
    faults: Faults<StoreError>,
    journal: CallJournal,
}

impl MockUserStore {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            inner: InMemoryUserStore::new(),
            faults: Faults::default(),
            journal,
        }
    }

    /// Failure injection and gates. Subjects are user ids.
    pub fn faults(&self) -> &Faults<StoreError> {
        &self.faults
    }

    /// Seeds a record and maps its external id to the user id in the journal.
    pub fn insert(&self, user: UserRecord) {
        self.journal.alias(&user.external_id, user.user_id);
        self.inner.insert(user);
    }

    pub fn remove(&self, user_id: UserId) -> Option<UserRecord> {
        self.inner.remove(user_id)
    }

    /// The stored record, bypassing the actor cache.
    pub fn get(&self, user_id: UserId) -> Option<UserRecord> {
        self.inner.get(user_id)
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        intercept(
            &self.journal,
            &self.faults,
            "store.get_user",
            user_id.to_string(),
            self.inner.get_user(user_id),
        )
        .await
    }

    async fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<u64, StoreError> {
        intercept(
            &self.journal,
            &self.faults,
            "store.set_status",
            user_id.to_string(),
            self.inner.set_status(user_id, status),
        )
        .await
    }

    async fn update_roles(
        &self,
        user_id: UserId,
        add: &BTreeSet<String>,
        remove: &BTreeSet<String>,
    ) -> Result<u64, StoreError> {
        intercept(
            &self.journal,
            &self.faults,
            "store.update_roles",
            user_id.to_string(),
            self.inner.update_roles(user_id, add, remove),
        )
        .await
    }
}

#[derive(Debug)]
pub struct MockIdentityProvider {
    inner: InMemoryIdentityProvider,
    faults: Faults<ProviderError>,
    journal: CallJournal,
    minted: Mutex<HashMap<String, Vec<(String, Duration)>>>,
}

impl MockIdentityProvider {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            inner: InMemoryIdentityProvider::new(),
            faults: Faults::default(),
            journal,
            minted: Mutex::new(HashMap::new()),
        }
    }

    /// Failure injection and gates. Subjects are user ids, or the raw external id for
    /// claims on a record the store was never seeded with.
    pub fn faults(&self) -> &Faults<ProviderError> {
        &self.faults
    }

    pub fn claims_for(&self, external_id: &str) -> Option<Claims> {
        self.inner.claims_for(external_id)
    }

    /// Tokens minted for `uid` with the lifetime each was asked for.
    pub fn minted_for(&self, uid: &str) -> Vec<(String, Duration)> {
        lock(&self.minted).get(uid).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn set_claims(&self, external_id: &str, claims: &Claims) -> Result<(), ProviderError> {
        intercept(
            &self.journal,
            &self.faults,
            "identity.set_claims",
            self.journal.subject_for(external_id),
            self.inner.set_claims(external_id, claims),
        )
        .await
    }

    async fn mint_custom_token(
        &self,
        uid: &str,
        claims: Option<&Claims>,
        ttl: Duration,
    ) -> Result<String, ProviderError> {
        let token = intercept(
            &self.journal,
            &self.faults,
            "identity.mint_custom_token",
            uid.to_string(),
            self.inner.mint_custom_token(uid, claims, ttl),
        )
        .await?;
        lock(&self.minted)
            .entry(uid.to_string())
            .or_default()
            .push((token.clone(), ttl));
        Ok(token)
    }
}

/// Publisher that keeps every accepted event.
#[derive(Debug)]
pub struct MockEventPublisher {
    published: Mutex<Vec<DomainEvent>>,
    faults: Faults<PublishError>,
    journal: CallJournal,
}

impl MockEventPublisher {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            faults: Faults::default(),
            journal,
        }
    }

    /// Failure injection and gates. Subjects are user ids.
    pub fn faults(&self) -> &Faults<PublishError> {
        &self.faults
    }

    pub fn published(&self) -> Vec<DomainEvent> {
        lock(&self.published).clone()
    }

    pub fn published_for(&self, user_id: UserId) -> Vec<DomainEvent> {
        lock(&self.published)
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let published = &self.published;
        intercept(
            &self.journal,
            &self.faults,
            "events.publish",
            event.user_id.to_string(),
            async move {
                lock(published).push(event.clone());
                Ok(())
            },
        )
        .await
    }
}

/// One set of mocks sharing a journal.
#[derive(Debug, Clone)]
pub struct MockCollaborators {
    pub store: Arc<MockUserStore>,
    pub identity: Arc<MockIdentityProvider>,
    pub events: Arc<MockEventPublisher>,
    pub journal: CallJournal,
}

impl Default for MockCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCollaborators {
    pub fn new() -> Self {
        let journal = CallJournal::default();
        Self {
            store: Arc::new(MockUserStore::new(journal.clone())),
            identity: Arc::new(MockIdentityProvider::new(journal.clone())),
            events: Arc::new(MockEventPublisher::new(journal.clone())),
            journal,
        }
    }

    /// A [`UserContext`] wired to these mocks.
    pub fn context(&self, options: UserManagementOptions) -> UserContext {
        UserContext::new(
            self.store.clone(),
            self.identity.clone(),
            self.events.clone(),
            options,
        )
    }
}
