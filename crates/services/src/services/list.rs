//! Table views over the store, one per collection.

use std::sync::Arc;

use models::{
    Entity, EntityKind,
    fixture::{Fixture, MatchStatus},
    player::Player,
    standing::Standing,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{
    form::EntityForm,
    gateway::ApiError,
    media::MediaHost,
    store::{DashboardStore, Slot, Snapshot, StoreError, Stored},
};

#[derive(Debug, Clone, Error)]
pub enum ListError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no {kind} with id `{id}`")]
    NotFound { kind: EntityKind, id: String },
}

/// Rows of one store slot plus the row currently open for editing.
pub struct EntityList<T: Entity> {
    store: Arc<DashboardStore>,
    media: Arc<dyn MediaHost>,
    slot: Arc<Slot<T>>,
    editing: Option<String>,
}

impl<T: Stored> EntityList<T> {
    pub fn new(store: Arc<DashboardStore>, media: Arc<dyn MediaHost>) -> Self {
        let slot = store.slot::<T>().clone();
        Self {
            store,
            media,
            slot,
            editing: None,
        }
    }
}

impl EntityList<Fixture> {
    /// Matches with the given status.
    pub fn matches(
        store: Arc<DashboardStore>,
        media: Arc<dyn MediaHost>,
        status: MatchStatus,
    ) -> Self {
        let slot = store.match_slot(status).clone();
        Self {
            store,
            media,
            slot,
            editing: None,
        }
    }
}

impl<T: Entity> EntityList<T> {
    /// Rows, fetched on first use.
    pub async fn load(&self) -> Result<Snapshot<T>, ListError> {
        Ok(self.slot.ensure_loaded(self.store.cancel_token()).await?)
    }

    pub fn rows(&self) -> Snapshot<T> {
        self.slot.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.slot.subscribe()
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.rows().iter().find(|row| row.id() == Some(id)).cloned()
    }

    /// Delete a record and refresh the collection. The refresh happens
    /// whether or not the delete succeeded; the delete's result is returned.
    pub async fn delete(&self, id: &str) -> Result<(), ListError> {
        let deleted = self.store.gateway().delete(T::KIND, id).await;
        match &deleted {
            Ok(()) => info!(kind = %T::KIND, id, "record deleted"),
            Err(e) => warn!(kind = %T::KIND, id, error = %e, "delete failed"),
        }

        if let Err(e) = self.store.refresh_kind(T::KIND).await {
            warn!(kind = %T::KIND, error = %e, "refresh after delete failed");
        }

        deleted.map_err(ListError::from)
    }

    pub fn open_create(&self) -> EntityForm<T> {
        EntityForm::create(self.store.clone(), self.media.clone())
    }

    /// Open the edit form for one row. Any other row's form stops being
    /// addressable.
    pub fn open_edit(&mut self, id: &str) -> Result<EntityForm<T>, ListError> {
        let row = self.find(id).ok_or_else(|| ListError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })?;
        self.editing = Some(id.to_string());
        Ok(EntityForm::edit(
            self.store.clone(),
            self.media.clone(),
            row,
        ))
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.editing.as_deref() == Some(id)
    }

    pub fn close_edit(&mut self) {
        self.editing = None;
    }
}

impl EntityList<Player> {
    /// Players whose position matches, ignoring case.
    pub fn by_position(&self, position: &str) -> Vec<Player> {
        self.rows()
            .iter()
            .filter(|p| p.plays(position))
            .cloned()
            .collect()
    }
}

impl EntityList<Standing> {
    /// League tabs in order of first appearance.
    pub fn leagues(&self) -> Vec<String> {
        let mut leagues: Vec<String> = Vec::new();
        for row in self.rows().iter() {
            if !leagues.contains(&row.league) {
                leagues.push(row.league.clone());
            }
        }
        leagues
    }

    /// One league's table sorted by position; `None` selects the first tab.
    pub fn table(&self, league: Option<&str>) -> Vec<Standing> {
        let league = match league {
            Some(league) => league.to_string(),
            None => match self.leagues().into_iter().next() {
                Some(first) => first,
                None => return Vec::new(),
            },
        };

        let mut rows: Vec<Standing> = self
            .rows()
            .iter()
            .filter(|row| row.league == league)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.position);
        rows
    }
}
