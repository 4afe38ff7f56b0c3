//! Per-id state map and the scoped release guard.

use crate::error::{StateError, StateResult};
use crate::state::EntityState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

type StateMap<K, S> = Arc<Mutex<HashMap<K, S>>>;

/// Tracks exactly one state per known entity id.
pub struct EntityStateMachine<K, S> {
    states: StateMap<K, S>,
    label: &'static str,
}

impl<K, S> EntityStateMachine<K, S>
where
    K: Eq + Hash + Clone + Display + Send + 'static,
    S: EntityState,
{
    /// Create an empty machine. `label` names the entity category in logs.
    pub fn new(label: &'static str) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Record `id` in its baseline state. Returns `false` if already known.
    pub fn register(&self, id: K) -> bool {
        let mut states = self.states.lock();
        if states.contains_key(&id) {
            return false;
        }
        states.insert(id, S::BASELINE);
        true
    }

    /// Current state, `None` if the entity is unknown.
    pub fn state(&self, id: &K) -> Option<S> {
        self.states.lock().get(id).copied()
    }

    /// Overwrite the state of `id` unconditionally.
    pub fn set_state(&self, id: K, state: S) {
        trace!(entity = self.label, id = %id, state = %state, "State set");
        self.states.lock().insert(id, state);
    }

    /// Require `id` to be known and currently in `required`.
    ///
    /// # Errors
    ///
    /// `NotRegistered`, `Busy` if it is in another busy state, or
    /// `UnexpectedState`.
    pub fn ensure_state(&self, id: &K, required: S) -> StateResult<()> {
        let current = self.state(id).ok_or_else(|| StateError::NotRegistered {
            id: id.to_string(),
        })?;
        if current == required {
            return Ok(());
        }
        if current.is_busy() {
            return Err(StateError::Busy {
                id: id.to_string(),
                state: current.to_string(),
            });
        }
        Err(StateError::UnexpectedState {
            id: id.to_string(),
            expected: required.to_string(),
            actual: current.to_string(),
        })
    }

    /// Move a registered, idle entity into `busy`.
    ///
    /// The returned guard restores the baseline when dropped.
    ///
    /// # Errors
    ///
    /// `NotRegistered` for unknown ids, `Busy` if an operation is in flight.
    pub fn try_begin(&self, id: K, busy: S) -> StateResult<StateGuard<K, S>> {
        Self::require_busy(busy)?;
        let mut states = self.states.lock();
        match states.get(&id).copied() {
            None => {
                debug!(entity = self.label, id = %id, "Rejected: not registered");
                Err(StateError::NotRegistered { id: id.to_string() })
            }
            Some(current) if current.is_busy() => {
                debug!(entity = self.label, id = %id, state = %current, "Rejected: busy");
                Err(StateError::Busy {
                    id: id.to_string(),
                    state: current.to_string(),
                })
            }
            Some(_) => {
                states.insert(id.clone(), busy);
                trace!(entity = self.label, id = %id, state = %busy, "Entered busy state");
                Ok(StateGuard::new(
                    Arc::clone(&self.states),
                    id,
                    busy,
                    Release::Baseline,
                    self.label,
                ))
            }
        }
    }

    /// Reserve an unknown id for a registering operation.
    ///
    /// Dropping the guard without [`StateGuard::commit`] forgets the id again.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if the id is idle, `Busy` if it is mid-operation.
    pub fn try_begin_registration(&self, id: K, busy: S) -> StateResult<StateGuard<K, S>> {
        Self::require_busy(busy)?;
        let mut states = self.states.lock();
        match states.get(&id).copied() {
            Some(current) if current.is_busy() => Err(StateError::Busy {
                id: id.to_string(),
                state: current.to_string(),
            }),
            Some(_) => Err(StateError::AlreadyRegistered { id: id.to_string() }),
            None => {
                states.insert(id.clone(), busy);
                Ok(StateGuard::new(
                    Arc::clone(&self.states),
                    id,
                    busy,
                    Release::Forget,
                    self.label,
                ))
            }
        }
    }

    /// Run `operation` while `id` is held in `busy`.
    ///
    /// # Errors
    ///
    /// The state conflict converted into `E`, or the operation's own error.
    pub async fn run<T, E, F, Fut>(&self, id: K, busy: S, operation: F) -> Result<T, E>
    where
        E: From<StateError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _guard = self.try_begin(id, busy)?;
        operation().await
    }

    /// Forget `id`.
    pub fn remove(&self, id: &K) -> Option<S> {
        self.states.lock().remove(id)
    }

    /// Forget every entity.
    pub fn clear(&self) {
        self.states.lock().clear();
    }

    /// Number of known entities.
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    /// Number of entities with an operation in flight.
    pub fn busy_count(&self) -> usize {
        self.states.lock().values().filter(|s| s.is_busy()).count()
    }

    fn require_busy(state: S) -> StateResult<()> {
        if state.is_busy() {
            Ok(())
        } else {
            Err(StateError::NotABusyState {
                state: state.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    /// Restore the baseline.
    Baseline,
    /// Remove the id (failed registration).
    Forget,
}

/// Holds an entity in a busy state until dropped.
#[must_use = "dropping the guard immediately releases the entity"]
pub struct StateGuard<K, S>
where
    K: Eq + Hash + Clone + Display,
    S: EntityState,
{
    states: StateMap<K, S>,
    id: K,
    busy: S,
    release: Release,
    label: &'static str,
}

impl<K, S> StateGuard<K, S>
where
    K: Eq + Hash + Clone + Display,
    S: EntityState,
{
    fn new(states: StateMap<K, S>, id: K, busy: S, release: Release, label: &'static str) -> Self {
        Self {
            states,
            id,
            busy,
            release,
            label,
        }
    }

    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn state(&self) -> S {
        self.busy
    }

    /// Mark a registration as successful: the id stays known on release.
    pub fn commit(&mut self) {
        self.release = Release::Baseline;
    }
}

impl<K, S> Drop for StateGuard<K, S>
where
    K: Eq + Hash + Clone + Display,
    S: EntityState,
{
    fn drop(&mut self) {
        let mut states = self.states.lock();
        // A cleanup while we were busy already forgot the id; leave it gone.
        if states.get(&self.id) != Some(&self.busy) {
            return;
        }
        match self.release {
            Release::Baseline => {
                states.insert(self.id.clone(), S::BASELINE);
            }
            Release::Forget => {
                states.remove(&self.id);
            }
        }
        trace!(entity = self.label, id = %self.id, from = %self.busy, "Released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum DomainState {
        Registered,
        Registering,
        Updating,
        Mapping,
    }

    impl fmt::Display for DomainState {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Debug::fmt(self, f)
        }
    }

    impl EntityState for DomainState {
        const BASELINE: Self = DomainState::Registered;
    }

    fn machine() -> EntityStateMachine<String, DomainState> {
        let machine = EntityStateMachine::new("domain");
        machine.register("physics".to_string());
        machine
    }

    #[derive(Debug, PartialEq)]
    enum OpError {
        State(StateError),
        Remote,
    }

    impl From<StateError> for OpError {
        fn from(err: StateError) -> Self {
            OpError::State(err)
        }
    }

    #[test]
    fn test_guard_restores_baseline() {
        let machine = machine();
        {
            let guard = machine
                .try_begin("physics".to_string(), DomainState::Updating)
                .unwrap();
            assert_eq!(guard.state(), DomainState::Updating);
            assert_eq!(machine.state(&"physics".to_string()), Some(DomainState::Updating));
            assert_eq!(machine.busy_count(), 1);
        }
        assert_eq!(
            machine.state(&"physics".to_string()),
            Some(DomainState::Registered)
        );
        assert_eq!(machine.busy_count(), 0);
    }

    #[test]
    fn test_busy_rejects_second_operation() {
        let machine = machine();
        let _guard = machine
            .try_begin("physics".to_string(), DomainState::Updating)
            .unwrap();

        let err = machine
            .try_begin("physics".to_string(), DomainState::Mapping)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Entity physics is busy, currently in state Updating"
        );
        assert!(err.is_busy());
    }

    #[test]
    fn test_unrelated_ids_do_not_contend() {
        let machine = machine();
        machine.register("chemistry".to_string());
        let _a = machine
            .try_begin("physics".to_string(), DomainState::Updating)
            .unwrap();
        let _b = machine
            .try_begin("chemistry".to_string(), DomainState::Updating)
            .unwrap();
        assert_eq!(machine.busy_count(), 2);
    }

    #[test]
    fn test_unknown_entity_not_registered() {
        let machine = machine();
        let err = machine
            .try_begin("biology".to_string(), DomainState::Updating)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Entity biology is not registered");
    }

    #[test]
    fn test_baseline_is_not_a_busy_state() {
        let machine = machine();
        assert!(matches!(
            machine.try_begin("physics".to_string(), DomainState::Registered),
            Err(StateError::NotABusyState { .. })
        ));
    }

    #[test]
    fn test_registration_guard() {
        let machine = machine();

        // Uncommitted registration forgets the id
        {
            let _guard = machine
                .try_begin_registration("biology".to_string(), DomainState::Registering)
                .unwrap();
            assert!(machine
                .try_begin_registration("biology".to_string(), DomainState::Registering)
                .err()
                .unwrap()
                .is_busy());
        }
        assert_eq!(machine.state(&"biology".to_string()), None);

        // Committed registration leaves it at baseline
        {
            let mut guard = machine
                .try_begin_registration("biology".to_string(), DomainState::Registering)
                .unwrap();
            guard.commit();
        }
        assert_eq!(
            machine.state(&"biology".to_string()),
            Some(DomainState::Registered)
        );

        assert_eq!(
            machine
                .try_begin_registration("biology".to_string(), DomainState::Registering)
                .err(),
            Some(StateError::AlreadyRegistered {
                id: "biology".into()
            })
        );
    }

    #[test]
    fn test_clear_while_busy_is_not_undone() {
        let machine = machine();
        let guard = machine
            .try_begin("physics".to_string(), DomainState::Updating)
            .unwrap();
        machine.clear();
        drop(guard);
        assert!(machine.is_empty());
    }

    #[test]
    fn test_ensure_state() {
        let machine = machine();
        assert!(machine
            .ensure_state(&"physics".to_string(), DomainState::Registered)
            .is_ok());
        machine.set_state("physics".to_string(), DomainState::Mapping);
        assert!(matches!(
            machine.ensure_state(&"physics".to_string(), DomainState::Registered),
            Err(StateError::Busy { .. })
        ));
        assert!(matches!(
            machine.ensure_state(&"nope".to_string(), DomainState::Registered),
            Err(StateError::NotRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_releases_after_failure() {
        let machine = machine();

        let result: Result<(), OpError> = machine
            .run("physics".to_string(), DomainState::Updating, || async {
                Err(OpError::Remote)
            })
            .await;
        assert_eq!(result, Err(OpError::Remote));

        let result: Result<u32, OpError> = machine
            .run("physics".to_string(), DomainState::Mapping, || async { Ok(1) })
            .await;
        assert_eq!(result, Ok(1));
        assert_eq!(
            machine.state(&"physics".to_string()),
            Some(DomainState::Registered)
        );
    }

    #[tokio::test]
    async fn test_concurrent_run_observes_busy() {
        let machine = machine();
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let first = machine.run("physics".to_string(), DomainState::Updating, || async move {
            let _ = gate.await;
            Ok::<_, OpError>("first")
        });
        let second = async {
            tokio::task::yield_now().await;
            let r = machine
                .run("physics".to_string(), DomainState::Mapping, || async {
                    Ok::<_, OpError>("second")
                })
                .await;
            let _ = release.send(());
            r
        };

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, Ok("first"));
        assert!(matches!(b, Err(OpError::State(StateError::Busy { .. }))));

        let third = machine
            .run("physics".to_string(), DomainState::Mapping, || async {
                Ok::<_, OpError>("third")
            })
            .await;
        assert_eq!(third, Ok("third"));
    }

    #[tokio::test]
    async fn test_dropped_future_releases_guard() {
        let machine = machine();
        {
            let pending = machine.run("physics".to_string(), DomainState::Updating, || {
                std::future::pending::<Result<(), OpError>>()
            });
            tokio::pin!(pending);
            let polled = futures_poll_once(pending.as_mut()).await;
            assert!(polled);
            assert_eq!(machine.busy_count(), 1);
        }
        assert_eq!(machine.busy_count(), 0);
    }

    /// Polls once and reports whether the future was still pending.
    async fn futures_poll_once<F: Future + Unpin>(fut: F) -> bool {
        let mut fut = fut;
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(std::pin::Pin::new(&mut fut).poll(cx).is_pending())
        })
        .await
    }
}
