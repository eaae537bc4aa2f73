//! Serialized event loop around a [`StateMachine`].
//!
//! Research agents, the process supervisor and the user all report back
//! concurrently, but a run's snapshot must see their events one at a time.
//! [`FsmRuntime::spawn`] moves the machine into a tokio task that drains an
//! mpsc channel in arrival order; [`FsmHandle`] is the cloneable sender side.
//! When a [`SnapshotStore`] is attached, the snapshot is written after every
//! dispatch so a restarted process can pick the run back up.

use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EpicflowError, Result};
use crate::state_machine::{Event, Snapshot, StateMachine, TransitionResult};

const CHANNEL_CAPACITY: usize = 64;

/// JSON file holding the latest snapshot of one run.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the persisted snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Err(EpicflowError::SnapshotMissing(self.path.clone()));
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write `snapshot` to a sibling temp file, then rename it over the target.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

enum Request {
    Dispatch {
        event: Event,
        reply: oneshot::Sender<TransitionResult>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Spawns the task that owns a run's state machine.
pub struct FsmRuntime;

impl FsmRuntime {
    /// Move `machine` into a new task and return a handle to it.
    ///
    /// The task ends once every [`FsmHandle`] is dropped; awaiting the join
    /// handle then yields the machine back.
    pub fn spawn(
        machine: StateMachine,
        store: Option<SnapshotStore>,
    ) -> (FsmHandle, JoinHandle<StateMachine>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let run_id = Uuid::new_v4();
        let task = tokio::spawn(run_loop(run_id, machine, store, rx));
        (FsmHandle { tx, run_id }, task)
    }
}

async fn run_loop(
    run_id: Uuid,
    mut machine: StateMachine,
    store: Option<SnapshotStore>,
    mut rx: mpsc::Receiver<Request>,
) -> StateMachine {
    debug!(%run_id, state = %machine.state(), "runtime started");

    while let Some(request) = rx.recv().await {
        match request {
            Request::Dispatch { event, reply } => {
                let result = machine.dispatch(event);
                if result.changed
                    && let Some(store) = &store
                    && let Err(err) = store.save(machine.snapshot()).await
                {
                    warn!(%run_id, path = %store.path().display(), %err, "snapshot not persisted");
                }
                // The caller may have given up waiting; the transition still stands.
                let _ = reply.send(result);
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(machine.snapshot().clone());
            }
        }
    }

    debug!(%run_id, state = %machine.state(), "runtime stopped");
    machine
}

/// Cloneable handle used by collaborators to feed events into one run.
#[derive(Debug, Clone)]
pub struct FsmHandle {
    tx: mpsc::Sender<Request>,
    run_id: Uuid,
}

impl FsmHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Queue `event` behind any already-submitted events and wait for its result.
    pub async fn dispatch(&self, event: Event) -> Result<TransitionResult> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Dispatch { event, reply })
            .await
            .map_err(|_| EpicflowError::RuntimeStopped)?;
        rx.await.map_err(|_| EpicflowError::RuntimeStopped)
    }

    /// Current snapshot, as of every event submitted before this call.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Snapshot { reply })
            .await
            .map_err(|_| EpicflowError::RuntimeStopped)?;
        rx.await.map_err(|_| EpicflowError::RuntimeStopped)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Dispatch { event, .. } => write!(f, "Dispatch({})", event.kind()),
            Request::Snapshot { .. } => write!(f, "Snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{Context, State};

    #[tokio::test]
    async fn dispatch_through_handle() {
        let (handle, task) = FsmRuntime::spawn(StateMachine::default(), None);

        let r = handle.dispatch(Event::Boot).await.unwrap();
        assert_eq!(r.state, State::IdleProbeBd);

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, State::IdleProbeBd);

        drop(handle);
        let machine = task.await.unwrap();
        assert_eq!(machine.state_history(), &[State::Boot]);
    }

    #[tokio::test]
    async fn concurrent_senders_are_applied_one_at_a_time() {
        let ctx = Context {
            max_reviewer_feedback_count: 100,
            ..Default::default()
        };
        let machine = StateMachine::new(Some(State::PlanReview), ctx);
        let (handle, task) = FsmRuntime::spawn(machine, None);

        let mut senders = Vec::new();
        for _ in 0..10 {
            let h = handle.clone();
            senders.push(tokio::spawn(async move {
                h.dispatch(Event::PlanReviewFeedback { blocking: false })
                    .await
                    .unwrap()
            }));
        }
        for sender in senders {
            sender.await.unwrap();
        }

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, State::PlanReview);
        assert_eq!(snap.context.reviewer_feedback_count, 10);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_is_persisted_and_restorable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("runs").join("snapshot.json"));
        assert!(!store.exists());

        let (handle, task) = FsmRuntime::spawn(StateMachine::default(), Some(store.clone()));
        handle.dispatch(Event::Boot).await.unwrap();
        handle
            .dispatch(Event::BdProbeResult { candidates: vec![] })
            .await
            .unwrap();
        drop(handle);
        task.await.unwrap();

        let restored = store.load().unwrap();
        assert_eq!(restored.state, State::Idle);

        let mut machine = StateMachine::from_snapshot(restored);
        let r = machine.dispatch(Event::UserInput {
            text: "resume me".into(),
        });
        assert_eq!(r.state, State::Intake);
    }

    #[tokio::test]
    async fn absorbed_events_do_not_rewrite_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let (handle, task) = FsmRuntime::spawn(StateMachine::default(), Some(store.clone()));

        handle.dispatch(Event::Tick).await.unwrap();
        assert!(!store.exists());

        drop(handle);
        task.await.unwrap();
    }

    #[test]
    fn loading_missing_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent.json"));
        assert!(matches!(
            store.load(),
            Err(EpicflowError::SnapshotMissing(_))
        ));
    }

    #[tokio::test]
    async fn stopped_runtime_reports_error() {
        let (handle, task) = FsmRuntime::spawn(StateMachine::default(), None);
        task.abort();
        let _ = task.await;
        assert!(matches!(
            handle.dispatch(Event::Boot).await,
            Err(EpicflowError::RuntimeStopped)
        ));
    }
}
