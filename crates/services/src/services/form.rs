//! Create and edit forms over a single entity draft.
//!
//! A form owns its draft, tracks image uploads per field and, on submit,
//! performs exactly one write followed by exactly one store refresh. Nothing
//! reaches the network while a required field is missing or an upload is
//! still in flight.

use std::{collections::BTreeMap, sync::Arc};

use models::Entity;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    gateway::ApiError,
    media::{ImageUpload, MediaError, MediaHost},
    store::{DashboardStore, StoreError},
};

#[derive(Debug, Clone, Error)]
pub enum FormError {
    #[error("please fill in all required fields: {}", .0.join(", "))]
    Validation(Vec<&'static str>),
    #[error("row {row}: please fill in all required fields: {}", .missing.join(", "))]
    RowValidation {
        row: usize,
        missing: Vec<&'static str>,
    },
    #[error("nothing to submit")]
    NoRows,
    #[error("image uploads still in progress: {}", .0.join(", "))]
    UploadsPending(Vec<String>),
    #[error("form can no longer be changed ({0:?})")]
    NotEditable(FormPhase),
    #[error("unknown image field `{0}`")]
    UnknownImageField(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// Fresh create form holding the placeholder draft.
    Empty,
    /// Edit form holding an unmodified copy of an existing record.
    Prefilled,
    Editing,
    Submitting,
    Closed,
}

impl FormPhase {
    fn is_editable(self) -> bool {
        !matches!(self, FormPhase::Submitting | FormPhase::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploaded(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Create,
    Update,
}

/// Result of a successful write.
#[derive(Debug)]
pub struct Submitted {
    pub mode: SubmitMode,
    /// The write landed even when the follow-up refresh did not.
    pub refresh: Result<(), StoreError>,
}

#[derive(Debug)]
struct FieldUpload {
    ticket: u64,
    state: UploadState,
}

#[derive(Debug)]
struct FormState<T> {
    phase: FormPhase,
    draft: T,
    id: Option<String>,
    uploads: BTreeMap<String, FieldUpload>,
    tickets: u64,
}

impl<T> FormState<T> {
    fn editable(&self) -> Result<(), FormError> {
        if self.phase.is_editable() {
            Ok(())
        } else {
            Err(FormError::NotEditable(self.phase))
        }
    }

    fn pending_uploads(&self) -> Vec<String> {
        self.uploads
            .iter()
            .filter(|(_, u)| u.state == UploadState::Pending)
            .map(|(field, _)| field.clone())
            .collect()
    }
}

/// A create or edit form for one record.
///
/// Cloning yields another handle to the same form, so uploads can be driven
/// from separate tasks.
pub struct EntityForm<T: Entity> {
    store: Arc<DashboardStore>,
    media: Arc<dyn MediaHost>,
    state: Arc<Mutex<FormState<T>>>,
}

impl<T: Entity> Clone for EntityForm<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            media: self.media.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Entity> EntityForm<T> {
    fn with_state(
        store: Arc<DashboardStore>,
        media: Arc<dyn MediaHost>,
        phase: FormPhase,
        draft: T,
    ) -> Self {
        let id = draft.id().map(str::to_string);
        Self {
            store,
            media,
            state: Arc::new(Mutex::new(FormState {
                phase,
                draft,
                id,
                uploads: BTreeMap::new(),
                tickets: 0,
            })),
        }
    }

    /// A create form starting from the entity's placeholder draft.
    pub fn create(store: Arc<DashboardStore>, media: Arc<dyn MediaHost>) -> Self {
        Self::with_state(store, media, FormPhase::Empty, T::blank())
    }

    /// An edit form prefilled with `entity`. Submitting updates the record
    /// with the entity's identity; an entity without one is created instead.
    pub fn edit(store: Arc<DashboardStore>, media: Arc<dyn MediaHost>, entity: T) -> Self {
        Self::with_state(store, media, FormPhase::Prefilled, entity)
    }

    pub fn phase(&self) -> FormPhase {
        self.state.lock().phase
    }

    pub fn draft(&self) -> T {
        self.state.lock().draft.clone()
    }

    pub fn id(&self) -> Option<String> {
        self.state.lock().id.clone()
    }

    pub fn mode(&self) -> SubmitMode {
        match self.state.lock().id {
            Some(_) => SubmitMode::Update,
            None => SubmitMode::Create,
        }
    }

    /// Apply an edit to the draft.
    pub fn update(&self, edit: impl FnOnce(&mut T)) -> Result<(), FormError> {
        let mut state = self.state.lock();
        state.editable()?;
        edit(&mut state.draft);
        state.phase = FormPhase::Editing;
        Ok(())
    }

    pub fn upload_state(&self, field: &str) -> Option<UploadState> {
        self.state
            .lock()
            .uploads
            .get(field)
            .map(|u| u.state.clone())
    }

    pub fn pending_uploads(&self) -> Vec<String> {
        self.state.lock().pending_uploads()
    }

    /// Required fields that are still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.state.lock().draft.missing_fields()
    }

    /// Upload `image` and store its hosted URL in the image field at `field`.
    ///
    /// On failure the draft is left untouched and the error is recorded for
    /// the field. Uploads to different fields may run concurrently; if the
    /// same field is uploaded twice, the later upload wins.
    pub async fn upload_image(&self, field: &str, image: ImageUpload) -> Result<String, FormError> {
        let ticket = {
            let mut state = self.state.lock();
            state.editable()?;
            if state.draft.clone().image_mut(field).is_none() {
                return Err(FormError::UnknownImageField(field.to_string()));
            }
            state.tickets += 1;
            let ticket = state.tickets;
            state.uploads.insert(
                field.to_string(),
                FieldUpload {
                    ticket,
                    state: UploadState::Pending,
                },
            );
            state.phase = FormPhase::Editing;
            ticket
        };
        debug!(kind = %T::KIND, field, file = %image.file_name, "uploading image");

        let result = self.media.upload(image).await;

        let mut state = self.state.lock();
        let current = state
            .uploads
            .get(field)
            .is_some_and(|u| u.ticket == ticket);
        if !current || !state.phase.is_editable() {
            debug!(kind = %T::KIND, field, "discarding stale upload result");
            return result.map_err(FormError::from);
        }

        match result {
            Ok(url) => {
                let outcome = match state.draft.image_mut(field) {
                    Some(slot) => {
                        *slot = url.clone();
                        UploadState::Uploaded(url.clone())
                    }
                    None => UploadState::Failed("field was removed".to_string()),
                };
                let removed = matches!(outcome, UploadState::Failed(_));
                if let Some(upload) = state.uploads.get_mut(field) {
                    upload.state = outcome;
                }
                if removed {
                    return Err(FormError::UnknownImageField(field.to_string()));
                }
                Ok(url)
            }
            Err(e) => {
                warn!(kind = %T::KIND, field, error = %e, "image upload failed");
                if let Some(upload) = state.uploads.get_mut(field) {
                    upload.state = UploadState::Failed(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Check the draft without submitting it.
    pub fn validate(&self) -> Result<(), FormError> {
        let state = self.state.lock();
        let pending = state.pending_uploads();
        if !pending.is_empty() {
            return Err(FormError::UploadsPending(pending));
        }
        let missing = state.draft.missing_fields();
        if !missing.is_empty() {
            return Err(FormError::Validation(missing));
        }
        Ok(())
    }

    /// Write the draft: create when it has no identity, update otherwise,
    /// then refresh the entity's collection and close the form.
    pub async fn submit(&self) -> Result<Submitted, FormError> {
        let (draft, id) = {
            let mut state = self.state.lock();
            state.editable()?;
            let pending = state.pending_uploads();
            if !pending.is_empty() {
                return Err(FormError::UploadsPending(pending));
            }
            let missing = state.draft.missing_fields();
            if !missing.is_empty() {
                debug!(kind = %T::KIND, ?missing, "draft rejected");
                state.phase = FormPhase::Editing;
                return Err(FormError::Validation(missing));
            }
            state.phase = FormPhase::Submitting;
            (state.draft.clone(), state.id.clone())
        };

        let gateway = self.store.gateway();
        let (mode, written) = match &id {
            Some(id) => (SubmitMode::Update, gateway.update_entity(id, &draft).await),
            None => (SubmitMode::Create, gateway.create_entity(&draft).await),
        };
        if let Err(e) = written {
            warn!(kind = %T::KIND, id = ?id, error = %e, "write failed");
            self.state.lock().phase = FormPhase::Editing;
            return Err(e.into());
        }

        let refresh = self.store.refresh_kind(T::KIND).await;
        if let Err(e) = &refresh {
            warn!(kind = %T::KIND, error = %e, "refresh after write failed");
        }
        self.state.lock().phase = FormPhase::Closed;
        info!(kind = %T::KIND, id = ?id, ?mode, "form submitted");

        Ok(Submitted { mode, refresh })
    }

    /// Dismiss the form. Uploads that finish afterwards are ignored.
    pub fn close(&self) {
        self.state.lock().phase = FormPhase::Closed;
    }
}

/// Several create drafts submitted with one request.
pub struct BatchForm<T: Entity> {
    store: Arc<DashboardStore>,
    rows: Mutex<Vec<T>>,
    phase: Mutex<FormPhase>,
}

impl<T: Entity> BatchForm<T> {
    /// Starts with one blank row.
    pub fn new(store: Arc<DashboardStore>) -> Self {
        Self {
            store,
            rows: Mutex::new(vec![T::blank()]),
            phase: Mutex::new(FormPhase::Empty),
        }
    }

    pub fn phase(&self) -> FormPhase {
        *self.phase.lock()
    }

    pub fn rows(&self) -> Vec<T> {
        self.rows.lock().clone()
    }

    fn editing(&self) -> Result<(), FormError> {
        let mut phase = self.phase.lock();
        if !phase.is_editable() {
            return Err(FormError::NotEditable(*phase));
        }
        *phase = FormPhase::Editing;
        Ok(())
    }

    /// Append a blank row and return its index.
    pub fn add_row(&self) -> Result<usize, FormError> {
        self.editing()?;
        let mut rows = self.rows.lock();
        rows.push(T::blank());
        Ok(rows.len() - 1)
    }

    pub fn remove_row(&self, row: usize) -> Result<Option<T>, FormError> {
        self.editing()?;
        let mut rows = self.rows.lock();
        Ok((row < rows.len()).then(|| rows.remove(row)))
    }

    /// Edit one row; returns `false` if there is no such row.
    pub fn update_row(&self, row: usize, edit: impl FnOnce(&mut T)) -> Result<bool, FormError> {
        self.editing()?;
        match self.rows.lock().get_mut(row) {
            Some(draft) => {
                edit(draft);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        let rows = self.rows.lock();
        if rows.is_empty() {
            return Err(FormError::NoRows);
        }
        for (row, draft) in rows.iter().enumerate() {
            let missing = draft.missing_fields();
            if !missing.is_empty() {
                return Err(FormError::RowValidation { row, missing });
            }
        }
        Ok(())
    }

    pub async fn submit(&self) -> Result<Submitted, FormError> {
        {
            let mut phase = self.phase.lock();
            if !phase.is_editable() {
                return Err(FormError::NotEditable(*phase));
            }
            self.validate()?;
            *phase = FormPhase::Submitting;
        }

        let rows = self.rows();
        if let Err(e) = self.store.gateway().create_entities(&rows).await {
            warn!(kind = %T::KIND, error = %e, "batch write failed");
            *self.phase.lock() = FormPhase::Editing;
            return Err(e.into());
        }

        let refresh = self.store.refresh_kind(T::KIND).await;
        if let Err(e) = &refresh {
            warn!(kind = %T::KIND, error = %e, "refresh after write failed");
        }
        *self.phase.lock() = FormPhase::Closed;
        info!(kind = %T::KIND, count = rows.len(), "batch submitted");

        Ok(Submitted {
            mode: SubmitMode::Create,
            refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use models::{
        EntityKind, PLACEHOLDER_LOGO_URL,
        banner::Banner,
        fixture::{Fixture, LineupPlayer, MatchStatus},
        league::League,
        star_performer::StarPerformer,
    };
    use serde_json::json;

    use super::*;
    use crate::services::testing::{Call, FakeMedia, MemoryGateway};

    fn setup() -> (Arc<MemoryGateway>, Arc<DashboardStore>, Arc<FakeMedia>) {
        let gateway = MemoryGateway::new();
        let store = Arc::new(DashboardStore::new(gateway.clone()));
        (gateway, store, FakeMedia::new())
    }

    fn image(name: &str) -> ImageUpload {
        ImageUpload::new(name, vec![0xff, 0xd8])
    }

    fn complete_match() -> Fixture {
        let player = LineupPlayer {
            number: 10,
            name: "Iwobi".to_string(),
            image_url: String::new(),
            position: "MF".to_string(),
        };
        let mut fixture = Fixture::blank();
        fixture.competition = "Futsal Cup".to_string();
        fixture.date = "2024-09-01".to_string();
        fixture.stadium = "Arena".to_string();
        fixture.team1.name = "Hawks".to_string();
        fixture.team2.name = "Owls".to_string();
        fixture.status = Some(MatchStatus::Upcoming);
        fixture.match_type = "Group".to_string();
        fixture.team_lineup.team1.lineup.push(player.clone());
        fixture.team_lineup.team2.lineup.push(player);
        fixture
    }

    #[tokio::test]
    async fn test_missing_logo_blocks_league_without_network() {
        let (gateway, store, media) = setup();
        let form = EntityForm::<League>::create(store, media);
        form.update(|l| l.league = "Premier".to_string()).unwrap();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::Validation(ref m) if m == &vec!["logo_url"]));
        assert!(err.to_string().contains("logo_url"));
        assert!(gateway.calls().is_empty());
        assert_eq!(form.phase(), FormPhase::Editing);
    }

    #[tokio::test]
    async fn test_create_writes_once_then_refreshes_once() {
        let (gateway, store, media) = setup();
        let form = EntityForm::<Fixture>::create(store.clone(), media.clone());
        assert_eq!(form.phase(), FormPhase::Empty);
        form.update(|m| *m = complete_match()).unwrap();

        let url = form
            .upload_image("team1.logo_url", image("hawks.png"))
            .await
            .unwrap();
        assert_eq!(url, "https://media.test/hawks.png");
        assert_eq!(
            form.upload_state("team1.logo_url"),
            Some(UploadState::Uploaded(url.clone()))
        );

        let submitted = form.submit().await.unwrap();
        assert_eq!(submitted.mode, SubmitMode::Create);
        assert!(submitted.refresh.is_ok());
        assert_eq!(form.phase(), FormPhase::Closed);

        let writes = gateway.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            Call::Create(EntityKind::Match, body) => {
                assert_eq!(body["team1"]["logo_url"], json!(url));
                assert_eq!(body["status"], json!("Upcoming"));
                assert!(body.get("_id").is_none());
            }
            other => panic!("unexpected write {other:?}"),
        }
        assert_eq!(gateway.fetches(EntityKind::Match), 3);
        assert_eq!(store.matches(MatchStatus::Upcoming).len(), 1);
        assert!(store.matches(MatchStatus::Live).is_empty());
    }

    #[tokio::test]
    async fn test_edit_updates_by_identity() {
        let (gateway, store, media) = setup();
        gateway.seed(
            EntityKind::Banner,
            vec![json!({ "_id": "b1", "imageUrl": "https://img.test/old.png" })],
        );
        let existing: Banner =
            serde_json::from_value(gateway.records(EntityKind::Banner)[0].clone()).unwrap();

        let form = EntityForm::edit(store.clone(), media, existing);
        assert_eq!(form.phase(), FormPhase::Prefilled);
        assert_eq!(form.mode(), SubmitMode::Update);
        form.upload_image("imageUrl", image("new.png")).await.unwrap();

        let submitted = form.submit().await.unwrap();
        assert_eq!(submitted.mode, SubmitMode::Update);
        assert_eq!(
            gateway.writes(),
            vec![Call::Update(
                EntityKind::Banner,
                "b1".to_string(),
                json!({ "_id": "b1", "imageUrl": "https://media.test/new.png" })
            )]
        );
        assert_eq!(gateway.fetches(EntityKind::Banner), 1);
        assert_eq!(
            store.snapshot::<Banner>()[0].image_url,
            "https://media.test/new.png"
        );
    }

    #[tokio::test]
    async fn test_pending_upload_blocks_submit() {
        let (gateway, store, _) = setup();
        let (media, gate) = FakeMedia::gated();
        let form = EntityForm::<Banner>::create(store, media);

        let upload = tokio::spawn({
            let form = form.clone();
            async move { form.upload_image("imageUrl", image("slow.png")).await }
        });
        while form.pending_uploads().is_empty() {
            tokio::task::yield_now().await;
        }

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::UploadsPending(ref f) if f == &vec!["imageUrl".to_string()]));
        assert!(gateway.calls().is_empty());

        gate.add_permits(1);
        upload.await.unwrap().unwrap();
        form.submit().await.unwrap();
        assert_eq!(gateway.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_draft_untouched() {
        let (gateway, store, media) = setup();
        let form = EntityForm::<League>::create(store, media);

        let err = form
            .upload_image("logo_url", image("fail.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::Media(MediaError::Http { status: 400, .. })));
        assert!(matches!(
            form.upload_state("logo_url"),
            Some(UploadState::Failed(_))
        ));
        assert!(form.draft().logo_url.is_empty());
        assert!(form.pending_uploads().is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_uploads_to_different_fields_run_concurrently() {
        let (_, store, _) = setup();
        let (media, gate) = FakeMedia::gated();
        let form = EntityForm::<Fixture>::create(store, media.clone());
        form.update(|m| *m = complete_match()).unwrap();

        let first = tokio::spawn({
            let form = form.clone();
            async move { form.upload_image("team1.logo_url", image("a.png")).await }
        });
        let second = tokio::spawn({
            let form = form.clone();
            async move {
                form.upload_image("teamLineup.team2.0.imageUrl", image("b.png"))
                    .await
            }
        });
        while form.pending_uploads().len() < 2 {
            tokio::task::yield_now().await;
        }

        gate.add_permits(2);
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let draft = form.draft();
        assert_eq!(
            draft.team1.logo_url.as_deref(),
            Some("https://media.test/a.png")
        );
        assert_eq!(
            draft.team_lineup.team2.lineup[0].image_url,
            "https://media.test/b.png"
        );
        assert_eq!(draft.team2.logo_url.as_deref(), Some(PLACEHOLDER_LOGO_URL));
    }

    #[tokio::test]
    async fn test_unknown_image_field_is_refused() {
        let (_, store, media) = setup();
        let form = EntityForm::<Banner>::create(store, media.clone());
        let err = form
            .upload_image("flagImageUrl", image("x.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::UnknownImageField(_)));
        assert!(media.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_returns_to_editing() {
        let (gateway, store, media) = setup();
        gateway.fail_next_write(ApiError::Rejected {
            message: Some("duplicate".to_string()),
        });
        let form = EntityForm::<Banner>::create(store, media);
        form.update(|b| b.image_url = "https://img.test/b.png".to_string())
            .unwrap();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::Api(ApiError::Rejected { .. })));
        assert_eq!(form.phase(), FormPhase::Editing);
        assert_eq!(gateway.fetches(EntityKind::Banner), 0);

        form.submit().await.unwrap();
        assert_eq!(gateway.writes().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_form_rejects_changes() {
        let (gateway, store, media) = setup();
        let form = EntityForm::<Banner>::create(store, media);
        form.update(|b| b.image_url = "https://img.test/b.png".to_string())
            .unwrap();
        form.submit().await.unwrap();

        assert!(matches!(
            form.update(|b| b.image_url.clear()),
            Err(FormError::NotEditable(FormPhase::Closed))
        ));
        assert!(matches!(
            form.submit().await,
            Err(FormError::NotEditable(FormPhase::Closed))
        ));
        assert_eq!(gateway.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_finishing_after_close_is_ignored() {
        let (_, store, _) = setup();
        let (media, gate) = FakeMedia::gated();
        let form = EntityForm::<Banner>::create(store, media);

        let upload = tokio::spawn({
            let form = form.clone();
            async move { form.upload_image("imageUrl", image("late.png")).await }
        });
        while form.pending_uploads().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        form.close();
        gate.add_permits(1);
        upload.await.unwrap().unwrap();

        assert!(form.draft().image_url.is_empty());
    }

    fn performer(name: &str) -> impl FnOnce(&mut StarPerformer) + '_ {
        move |p| {
            p.name = name.to_string();
            p.image_url = format!("https://img.test/{name}.png");
            p.achievement = "Golden Boot".to_string();
            p.tournament = "Futsal Cup".to_string();
        }
    }

    #[tokio::test]
    async fn test_batch_form_validates_every_row() {
        let (gateway, store, _) = setup();
        let form = BatchForm::<StarPerformer>::new(store.clone());
        form.update_row(0, performer("ada")).unwrap();
        let second = form.add_row().unwrap();
        assert_eq!(second, 1);

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::RowValidation { row: 1, .. }));
        assert!(gateway.calls().is_empty());

        form.update_row(1, performer("bo")).unwrap();
        let submitted = form.submit().await.unwrap();
        assert!(submitted.refresh.is_ok());
        assert_eq!(form.phase(), FormPhase::Closed);

        match gateway.writes().as_slice() {
            [Call::CreateBatch(EntityKind::StarPerformer, bodies)] => {
                assert_eq!(bodies.len(), 2);
                assert_eq!(bodies[1]["name"], json!("bo"));
            }
            other => panic!("unexpected writes {other:?}"),
        }
        assert_eq!(store.snapshot::<StarPerformer>().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_form_without_rows() {
        let (gateway, store, _) = setup();
        let form = BatchForm::<StarPerformer>::new(store);
        assert!(form.remove_row(0).unwrap().is_some());
        assert!(form.remove_row(0).unwrap().is_none());

        assert!(matches!(form.submit().await, Err(FormError::NoRows)));
        assert!(gateway.calls().is_empty());
    }
}
