//! Session-wide cache of the last fetched collection of every entity.
//!
//! Each collection lives in a [`Slot`]. Refreshes are numbered; when a
//! response settles it is written only if no newer refresh was requested in
//! the meantime, so a slow response can never overwrite a newer one. A lazy
//! [`Slot::ensure_loaded`] joins the in-flight fetch instead of issuing a
//! second request. Closing the store abandons everything still pending.

use std::sync::Arc;

use futures::{
    FutureExt,
    future::{BoxFuture, Shared, try_join3},
};
use models::{
    Entity, EntityKind,
    banner::Banner,
    featured_player::FeaturedPlayer,
    fixture::{Fixture, MatchStatus},
    league::League,
    news::News,
    player::Player,
    sponsor::Sponsor,
    standing::Standing,
    star_performer::StarPerformer,
    trophy::Trophy,
    user::User,
};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::gateway::{ApiError, Gateway};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("dashboard store is closed")]
    Closed,
}

/// How a refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response became the slot's snapshot.
    Applied { generation: u64, len: usize },
    /// A newer refresh was requested first; the response was dropped.
    Superseded { generation: u64 },
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub type Snapshot<T> = Arc<Vec<T>>;

type Fetcher<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, ApiError>> + Send + Sync>;
type SharedFetch<T> = Shared<BoxFuture<'static, Result<Snapshot<T>, ApiError>>>;

struct InFlight<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct SlotState<T> {
    requested: u64,
    applied: u64,
    loaded: bool,
    in_flight: Option<InFlight<T>>,
}

/// One cached collection.
pub struct Slot<T> {
    name: &'static str,
    fetcher: Fetcher<T>,
    state: Mutex<SlotState<T>>,
    tx: watch::Sender<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> Slot<T> {
    fn new(name: &'static str, fetcher: Fetcher<T>) -> Self {
        let (tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            name,
            fetcher,
            state: Mutex::new(SlotState {
                requested: 0,
                applied: 0,
                loaded: false,
                in_flight: None,
            }),
            tx,
        }
    }

    /// The current collection; empty until the first refresh lands.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    /// Observe every snapshot written to this slot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// Take the next generation and start its fetch. Must run under the
    /// state lock so no other caller can start a fetch in between.
    fn begin(&self, state: &mut SlotState<T>) -> (u64, SharedFetch<T>) {
        state.requested += 1;
        let generation = state.requested;
        let fetch = (self.fetcher)().map(|r| r.map(Arc::new)).boxed().shared();
        state.in_flight = Some(InFlight {
            generation,
            fetch: fetch.clone(),
        });
        debug!(slot = self.name, generation, "refresh requested");
        (generation, fetch)
    }

    pub(crate) async fn refresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RefreshOutcome, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Closed);
        }

        let (generation, fetch) = self.begin(&mut *self.state.lock().await);
        self.await_fetch(generation, fetch, cancel).await
    }

    /// Return the cached collection, loading it first if nothing has landed yet.
    ///
    /// Concurrent callers share one fetch. A caller whose fetch is superseded
    /// follows the newer one, so the result is always a fetched collection.
    pub(crate) async fn ensure_loaded(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Snapshot<T>, StoreError> {
        loop {
            if cancel.is_cancelled() {
                return Err(StoreError::Closed);
            }

            let (generation, fetch) = {
                let mut state = self.state.lock().await;
                if state.loaded {
                    return Ok(self.snapshot());
                }
                let pending = state
                    .in_flight
                    .as_ref()
                    .map(|f| (f.generation, f.fetch.clone()));
                match pending {
                    Some((generation, fetch)) => {
                        debug!(slot = self.name, generation, "joining in-flight refresh");
                        (generation, fetch)
                    }
                    None => self.begin(&mut state),
                }
            };

            if self.await_fetch(generation, fetch, cancel).await?.is_applied() {
                return Ok(self.snapshot());
            }
        }
    }

    async fn await_fetch(
        &self,
        generation: u64,
        fetch: SharedFetch<T>,
        cancel: &CancellationToken,
    ) -> Result<RefreshOutcome, StoreError> {
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(slot = self.name, generation, "refresh abandoned");
                return Err(StoreError::Closed);
            }
            result = fetch => result,
        };

        let mut state = self.state.lock().await;
        if state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            state.in_flight = None;
        }
        if cancel.is_cancelled() {
            return Err(StoreError::Closed);
        }

        let items = result.map_err(|e| {
            warn!(slot = self.name, generation, error = %e, "refresh failed");
            StoreError::Api(e)
        })?;

        if generation < state.requested || generation <= state.applied {
            debug!(
                slot = self.name,
                generation,
                newest = state.requested,
                "dropping superseded response"
            );
            return Ok(RefreshOutcome::Superseded { generation });
        }

        state.applied = generation;
        state.loaded = true;
        let len = items.len();
        self.tx.send_replace(items);
        debug!(slot = self.name, generation, len, "snapshot applied");
        Ok(RefreshOutcome::Applied { generation, len })
    }
}

fn fetch_all<T: Entity>(gateway: Arc<dyn Gateway>) -> Fetcher<T> {
    Box::new(move || {
        let gateway = gateway.clone();
        async move { gateway.fetch_all::<T>().await }.boxed()
    })
}

fn fetch_matches(gateway: Arc<dyn Gateway>, status: MatchStatus) -> Fetcher<Fixture> {
    Box::new(move || {
        let gateway = gateway.clone();
        async move {
            gateway
                .fetch_where(|m: &Fixture| m.has_status(status))
                .await
        }
        .boxed()
    })
}

/// Entities that live in exactly one slot of the store.
pub trait Stored: Entity {
    fn slot(store: &DashboardStore) -> &Arc<Slot<Self>>;
}

macro_rules! stored {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl Stored for $ty {
                fn slot(store: &DashboardStore) -> &Arc<Slot<Self>> {
                    &store.$field
                }
            }
        )+
    };
}

stored! {
    Player => players,
    FeaturedPlayer => featured_players,
    Banner => banners,
    Sponsor => sponsors,
    Trophy => trophies,
    League => leagues,
    News => news,
    Standing => standings,
    StarPerformer => star_performers,
    User => users,
}

pub struct DashboardStore {
    gateway: Arc<dyn Gateway>,
    cancel: CancellationToken,
    live_matches: Arc<Slot<Fixture>>,
    upcoming_matches: Arc<Slot<Fixture>>,
    completed_matches: Arc<Slot<Fixture>>,
    players: Arc<Slot<Player>>,
    featured_players: Arc<Slot<FeaturedPlayer>>,
    banners: Arc<Slot<Banner>>,
    sponsors: Arc<Slot<Sponsor>>,
    trophies: Arc<Slot<Trophy>>,
    leagues: Arc<Slot<League>>,
    news: Arc<Slot<News>>,
    standings: Arc<Slot<Standing>>,
    star_performers: Arc<Slot<StarPerformer>>,
    users: Arc<Slot<User>>,
}

impl DashboardStore {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let g = &gateway;
        Self {
            live_matches: Arc::new(Slot::new(
                "live_matches",
                fetch_matches(g.clone(), MatchStatus::Live),
            )),
            upcoming_matches: Arc::new(Slot::new(
                "upcoming_matches",
                fetch_matches(g.clone(), MatchStatus::Upcoming),
            )),
            completed_matches: Arc::new(Slot::new(
                "completed_matches",
                fetch_matches(g.clone(), MatchStatus::Completed),
            )),
            players: Arc::new(Slot::new("players", fetch_all(g.clone()))),
            featured_players: Arc::new(Slot::new("featured_players", fetch_all(g.clone()))),
            banners: Arc::new(Slot::new("banners", fetch_all(g.clone()))),
            sponsors: Arc::new(Slot::new("sponsors", fetch_all(g.clone()))),
            trophies: Arc::new(Slot::new("trophies", fetch_all(g.clone()))),
            leagues: Arc::new(Slot::new("leagues", fetch_all(g.clone()))),
            news: Arc::new(Slot::new("news", fetch_all(g.clone()))),
            standings: Arc::new(Slot::new("standings", fetch_all(g.clone()))),
            star_performers: Arc::new(Slot::new("star_performers", fetch_all(g.clone()))),
            users: Arc::new(Slot::new("users", fetch_all(g.clone()))),
            cancel: CancellationToken::new(),
            gateway,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn slot<T: Stored>(&self) -> &Arc<Slot<T>> {
        T::slot(self)
    }

    pub fn snapshot<T: Stored>(&self) -> Snapshot<T> {
        self.slot::<T>().snapshot()
    }

    pub fn subscribe<T: Stored>(&self) -> watch::Receiver<Snapshot<T>> {
        self.slot::<T>().subscribe()
    }

    pub async fn refresh<T: Stored>(&self) -> Result<RefreshOutcome, StoreError> {
        self.slot::<T>().refresh(&self.cancel).await
    }

    pub async fn ensure_loaded<T: Stored>(&self) -> Result<Snapshot<T>, StoreError> {
        self.slot::<T>().ensure_loaded(&self.cancel).await
    }

    pub fn match_slot(&self, status: MatchStatus) -> &Arc<Slot<Fixture>> {
        match status {
            MatchStatus::Live => &self.live_matches,
            MatchStatus::Upcoming => &self.upcoming_matches,
            MatchStatus::Completed => &self.completed_matches,
        }
    }

    pub fn matches(&self, status: MatchStatus) -> Snapshot<Fixture> {
        self.match_slot(status).snapshot()
    }

    pub async fn ensure_matches_loaded(
        &self,
        status: MatchStatus,
    ) -> Result<Snapshot<Fixture>, StoreError> {
        self.match_slot(status).ensure_loaded(&self.cancel).await
    }

    /// Re-fetch the match collection once per status, concurrently.
    pub async fn refresh_matches(&self) -> Result<[RefreshOutcome; 3], StoreError> {
        let (live, upcoming, completed) = try_join3(
            self.live_matches.refresh(&self.cancel),
            self.upcoming_matches.refresh(&self.cancel),
            self.completed_matches.refresh(&self.cancel),
        )
        .await?;
        Ok([live, upcoming, completed])
    }

    /// Refresh whichever slots hold `kind`.
    pub async fn refresh_kind(&self, kind: EntityKind) -> Result<(), StoreError> {
        match kind {
            EntityKind::Match => self.refresh_matches().await.map(|_| ()),
            EntityKind::Player => self.refresh::<Player>().await.map(|_| ()),
            EntityKind::FeaturedPlayer => self.refresh::<FeaturedPlayer>().await.map(|_| ()),
            EntityKind::Banner => self.refresh::<Banner>().await.map(|_| ()),
            EntityKind::Sponsor => self.refresh::<Sponsor>().await.map(|_| ()),
            EntityKind::Trophy => self.refresh::<Trophy>().await.map(|_| ()),
            EntityKind::League => self.refresh::<League>().await.map(|_| ()),
            EntityKind::News => self.refresh::<News>().await.map(|_| ()),
            EntityKind::Standing => self.refresh::<Standing>().await.map(|_| ()),
            EntityKind::StarPerformer => self.refresh::<StarPerformer>().await.map(|_| ()),
            EntityKind::User => self.refresh::<User>().await.map(|_| ()),
        }
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Abandon pending refreshes and refuse new ones.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("closing dashboard store");
            self.cancel.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }
}
