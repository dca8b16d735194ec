//! Optimistic reorder state machine.
//!
//! A move is applied to the displayed order immediately and then persisted.
//! Every submission carries a sequence number; only the response for the most
//! recently issued number may commit or roll back. Earlier responses are
//! dropped whatever order they arrive in.

use std::sync::Arc;

use shared::{
    domain::{Item, ItemDraft, ItemId},
    protocol::ReorderResponse,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    error::{ClientError, NetworkError, Restored},
    gateway::PersistenceGateway,
    interaction::MoveRequest,
    store::OrderedCollectionStore,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    Idle,
    Reordering,
    RollingBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Fetched,
    Optimistic,
    RolledBack,
}

#[derive(Debug, Clone)]
pub enum CollectionEvent {
    OrderChanged {
        ids: Vec<ItemId>,
        origin: ChangeOrigin,
    },
    PhaseChanged(ReorderPhase),
    ReorderFailed {
        seq: u64,
        error: ClientError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The move was a no-op; nothing was submitted.
    Unchanged,
    Committed { seq: u64 },
    /// A newer move was issued before this response arrived.
    Superseded { seq: u64 },
}

/// An optimistically applied move awaiting its persistence result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReorder {
    pub seq: u64,
    pub item_ids: Vec<ItemId>,
}

struct CoordinatorState {
    store: OrderedCollectionStore,
    /// Last order known to match the server.
    confirmed: Option<Vec<Item>>,
    /// Highest sequence number already reflected in `confirmed`.
    confirmed_seq: u64,
    issued_seq: u64,
    phase: ReorderPhase,
}

pub struct ReorderCoordinator {
    gateway: Arc<dyn PersistenceGateway>,
    inner: Mutex<CoordinatorState>,
    events: broadcast::Sender<CollectionEvent>,
}

impl ReorderCoordinator {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            inner: Mutex::new(CoordinatorState {
                store: OrderedCollectionStore::new(),
                confirmed: None,
                confirmed_seq: 0,
                issued_seq: 0,
                phase: ReorderPhase::Idle,
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    pub async fn displayed(&self) -> Vec<Item> {
        self.inner.lock().await.store.items().to_vec()
    }

    pub async fn displayed_ids(&self) -> Vec<ItemId> {
        self.inner.lock().await.store.ids()
    }

    pub async fn phase(&self) -> ReorderPhase {
        self.inner.lock().await.phase
    }

    /// Re-synchronizes with the server.
    ///
    /// While a reorder is pending the fetched `sort_order` is not trusted:
    /// local relative order is kept and the confirmed snapshot is dropped so a
    /// later rollback goes back to the server. The same applies when a move
    /// was issued while the fetch was in flight, since the fetch may predate it.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let issued_before = self.inner.lock().await.issued_seq;
        let items = self.gateway.fetch_all().await.map_err(|error| {
            error!(%error, "failed to fetch items");
            ClientError::Network(error)
        })?;

        let mut state = self.inner.lock().await;
        if state.phase == ReorderPhase::Idle && state.issued_seq == issued_before {
            state.store.load(items.clone());
            state.confirmed = Some(items);
            state.confirmed_seq = state.issued_seq;
        } else {
            debug!(
                phase = ?state.phase,
                issued_before,
                latest = state.issued_seq,
                "fetch may predate local order; merging into local order"
            );
            state.store.reconcile(items);
            state.confirmed = None;
        }
        self.emit_order(&state, ChangeOrigin::Fetched);
        Ok(())
    }

    pub async fn create_item(&self, draft: ItemDraft) -> Result<(), ClientError> {
        draft.validate()?;
        let created = self.gateway.create(&draft).await.map_err(|error| {
            error!(%error, "failed to create item");
            ClientError::Network(error)
        })?;
        info!(item_id = %created.id, "item created");
        self.refresh().await
    }

    pub async fn update_item(&self, item_id: ItemId, draft: ItemDraft) -> Result<(), ClientError> {
        draft.validate()?;
        self.gateway
            .update(item_id, &draft)
            .await
            .map_err(|error| {
                error!(%item_id, %error, "failed to update item");
                ClientError::Network(error)
            })?;
        self.refresh().await
    }

    pub async fn delete_item(&self, item_id: ItemId) -> Result<(), ClientError> {
        self.gateway.remove(item_id).await.map_err(|error| {
            error!(%item_id, %error, "failed to delete item");
            ClientError::Network(error)
        })?;
        info!(%item_id, "item deleted");
        self.refresh().await
    }

    /// Applies a move optimistically, persists it, and commits or rolls back.
    pub async fn move_item(&self, request: MoveRequest) -> Result<ReorderOutcome, ClientError> {
        let Some(pending) = self.begin_move(request).await else {
            return Ok(ReorderOutcome::Unchanged);
        };
        let result = self.gateway.reorder(&pending.item_ids).await;
        self.finish_move(&pending, result).await
    }

    /// `Idle --moveRequest-->`: computes the candidate order, shows it, and
    /// issues the next sequence number. `None` when the move is a no-op.
    pub async fn begin_move(&self, request: MoveRequest) -> Option<PendingReorder> {
        let mut state = self.inner.lock().await;
        if state
            .store
            .is_noop_move(request.source_id, request.target_id)
        {
            debug!(source = %request.source_id, target = %request.target_id, "ignoring no-op move");
            return None;
        }

        let candidate = state
            .store
            .move_by_ids(request.source_id, request.target_id);
        state.store.load(candidate);
        state.issued_seq += 1;
        let seq = state.issued_seq;
        self.set_phase(&mut state, ReorderPhase::Reordering);
        self.emit_order(&state, ChangeOrigin::Optimistic);
        debug!(seq, source = %request.source_id, target = %request.target_id, "move applied optimistically");

        Some(PendingReorder {
            seq,
            item_ids: state.store.ids(),
        })
    }

    /// Handles the persistence result for `pending`.
    pub async fn finish_move(
        &self,
        pending: &PendingReorder,
        result: Result<ReorderResponse, NetworkError>,
    ) -> Result<ReorderOutcome, ClientError> {
        let seq = pending.seq;
        let mut state = self.inner.lock().await;
        if seq != state.issued_seq {
            debug!(
                seq,
                latest = state.issued_seq,
                succeeded = result.is_ok(),
                "discarding superseded reorder response"
            );
            return Ok(ReorderOutcome::Superseded { seq });
        }

        let source = match result {
            Ok(ack) => {
                state.confirmed = Some(state.store.items().to_vec());
                state.confirmed_seq = seq;
                self.set_phase(&mut state, ReorderPhase::Idle);
                info!(seq, message = %ack.message, "reorder committed");
                return Ok(ReorderOutcome::Committed { seq });
            }
            Err(source) => source,
        };

        warn!(seq, error = %source, "reorder failed; rolling back");
        self.set_phase(&mut state, ReorderPhase::RollingBack);

        // Only trust the snapshot if no earlier submission may have landed
        // on the server since it was taken.
        let snapshot_reliable = state.confirmed.is_some() && state.confirmed_seq + 1 == seq;
        let restored = if snapshot_reliable {
            self.restore_snapshot(&mut state);
            Restored::Snapshot
        } else {
            drop(state);
            let fetched = self.gateway.fetch_all().await;
            state = self.inner.lock().await;
            self.restore_after_refetch(&mut state, seq, fetched)
        };

        if restored != Restored::Superseded {
            self.set_phase(&mut state, ReorderPhase::Idle);
        }
        let error = ClientError::OrderConflict {
            seq,
            source,
            restored,
        };
        let _ = self.events.send(CollectionEvent::ReorderFailed {
            seq,
            error: error.clone(),
        });
        Err(error)
    }

    fn restore_snapshot(&self, state: &mut CoordinatorState) {
        if let Some(confirmed) = state.confirmed.clone() {
            state.store.load(confirmed);
            self.emit_order(state, ChangeOrigin::RolledBack);
        }
    }

    fn restore_after_refetch(
        &self,
        state: &mut CoordinatorState,
        seq: u64,
        fetched: Result<Vec<Item>, NetworkError>,
    ) -> Restored {
        if seq != state.issued_seq {
            debug!(seq, latest = state.issued_seq, "newer move issued during rollback");
            return Restored::Superseded;
        }
        match fetched {
            Ok(items) => {
                state.store.load(items.clone());
                state.confirmed = Some(items);
                state.confirmed_seq = seq;
                self.emit_order(state, ChangeOrigin::RolledBack);
                Restored::Refetched
            }
            Err(error) if state.confirmed.is_some() => {
                error!(seq, %error, "refetch after failed reorder failed; using last confirmed order");
                self.restore_snapshot(state);
                Restored::Snapshot
            }
            Err(error) => {
                error!(seq, %error, "refetch after failed reorder failed; no confirmed order");
                Restored::Nothing
            }
        }
    }

    fn set_phase(&self, state: &mut CoordinatorState, phase: ReorderPhase) {
        if state.phase != phase {
            state.phase = phase;
            let _ = self.events.send(CollectionEvent::PhaseChanged(phase));
        }
    }

    fn emit_order(&self, state: &CoordinatorState, origin: ChangeOrigin) {
        let _ = self.events.send(CollectionEvent::OrderChanged {
            ids: state.store.ids(),
            origin,
        });
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
