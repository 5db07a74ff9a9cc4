use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use futures::future::try_join_all;
use indicatif::ProgressBar;
use models::{
    Entity, EntityKind,
    fixture::{Fixture, MatchStatus},
    player::Player,
    standing::Standing,
};
use serde_json::Value;
use services::services::{
    config::Config,
    form::{BatchForm, EntityForm, Submitted, SubmitMode},
    gateway::HttpGateway,
    list::EntityList,
    media::{CloudinaryHost, ImageUpload, MediaHost},
    store::{DashboardStore, Snapshot, Stored},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::warn;

use crate::render::{self, Describe};

/// The store and media host for one session.
pub struct Dashboard {
    pub store: Arc<DashboardStore>,
    pub media: Arc<dyn MediaHost>,
}

impl Dashboard {
    pub fn connect(config: &Config) -> Result<Self> {
        let gateway = HttpGateway::new(&config.api).context("failed to build API client")?;
        let media = CloudinaryHost::new(&config.media).context("failed to build media client")?;
        Ok(Self {
            store: Arc::new(DashboardStore::new(Arc::new(gateway))),
            media: Arc::new(media),
        })
    }

    pub fn list<T: Stored>(&self) -> EntityList<T> {
        EntityList::new(self.store.clone(), self.media.clone())
    }

    pub fn matches(&self, status: MatchStatus) -> EntityList<Fixture> {
        EntityList::matches(self.store.clone(), self.media.clone(), status)
    }

    /// The match list whose rows include `id`.
    pub async fn match_list_with(&self, id: &str) -> Result<EntityList<Fixture>> {
        for status in MatchStatus::ALL {
            let list = self.matches(status);
            list.load().await?;
            if list.find(id).is_some() {
                return Ok(list);
            }
        }
        bail!("no match with id `{id}`")
    }
}

async fn with_spinner<F, T, E>(message: String, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message);
    let result = fut.await;
    spinner.finish_and_clear();
    result
}

pub async fn list_rows<T: Describe>(list: EntityList<T>, json: bool) -> Result<()> {
    let rows = with_spinner(
        format!("Loading {}", T::KIND.collection_path()),
        list.load(),
    )
    .await?;
    print_rows(&rows, json)
}

pub async fn list_matches(dash: &Dashboard, status: Option<MatchStatus>, json: bool) -> Result<()> {
    let statuses = match status {
        Some(status) => vec![status],
        None => MatchStatus::ALL.to_vec(),
    };
    for status in statuses {
        let rows = with_spinner(
            format!("Loading {status} matches"),
            dash.matches(status).load(),
        )
        .await?;
        if !json {
            println!("== {status} ({}) ==", rows.len());
        }
        print_rows(&rows, json)?;
    }
    Ok(())
}

pub async fn list_players(dash: &Dashboard, position: Option<&str>, json: bool) -> Result<()> {
    let list = dash.list::<Player>();
    with_spinner("Loading players".to_string(), list.load()).await?;
    let rows = match position {
        Some(position) => list.by_position(position),
        None => list.rows().to_vec(),
    };
    print_rows(&rows, json)
}

pub async fn list_standings(dash: &Dashboard, league: Option<&str>, json: bool) -> Result<()> {
    let list = dash.list::<Standing>();
    with_spinner("Loading standings".to_string(), list.load()).await?;
    if !json {
        println!("Leagues: {}", list.leagues().join(" | "));
    }
    print_rows(&list.table(league), json)
}

fn print_rows<T: Describe>(rows: &[T], json: bool) -> Result<()> {
    if rows.is_empty() && !json {
        println!("(none)");
        return Ok(());
    }
    println!("{}", render::rows(rows, json)?);
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Merge `patch` over `base` (RFC 7396) and read the result back as a record.
fn patched<T: Entity>(base: &T, patch: &Value) -> Result<T> {
    let mut value = serde_json::to_value(base)?;
    json_patch::merge(&mut value, patch);
    serde_json::from_value(value)
        .with_context(|| format!("patch does not describe a {}", T::KIND.label()))
}

async fn upload_all<T: Entity>(form: &EntityForm<T>, images: &[(String, PathBuf)]) -> Result<()> {
    let uploads = images.iter().map(|(field, path)| async move {
        let image = ImageUpload::from_path(path).await?;
        let url = form.upload_image(field, image).await?;
        Ok::<_, anyhow::Error>((field, url))
    });

    let uploaded = with_spinner(
        format!("Uploading {} image(s)", images.len()),
        try_join_all(uploads),
    )
    .await?;
    for (field, url) in uploaded {
        println!("{field}: {url}");
    }
    Ok(())
}

fn report<T: Entity>(submitted: Submitted) {
    let verb = match submitted.mode {
        SubmitMode::Create => "Created",
        SubmitMode::Update => "Updated",
    };
    println!("{verb} {}", T::KIND.label());
    if let Err(e) = submitted.refresh {
        warn!(kind = %T::KIND, error = %e, "saved, but the list could not be refreshed");
    }
}

pub async fn create<T: Entity>(
    dash: &Dashboard,
    file: &Path,
    images: &[(String, PathBuf)],
) -> Result<()> {
    let patch = read_json(file)?;
    if let Value::Array(items) = &patch {
        return create_batch::<T>(dash, items).await;
    }

    let form = EntityForm::<T>::create(dash.store.clone(), dash.media.clone());
    let draft = patched(&form.draft(), &patch)?;
    form.update(|d| *d = draft)?;
    upload_all(&form, images).await?;

    let submitted = with_spinner(format!("Saving {}", T::KIND.label()), form.submit()).await?;
    report::<T>(submitted);
    Ok(())
}

async fn create_batch<T: Entity>(dash: &Dashboard, items: &[Value]) -> Result<()> {
    if T::KIND != EntityKind::StarPerformer {
        bail!("only star performers can be created in bulk");
    }
    if items.is_empty() {
        bail!("the file holds an empty list");
    }

    let form = BatchForm::<T>::new(dash.store.clone());
    for (row, item) in items.iter().enumerate() {
        if row > 0 {
            form.add_row()?;
        }
        let draft = patched(&T::blank(), item)?;
        form.update_row(row, |d| *d = draft)?;
    }

    let submitted = with_spinner(
        format!("Saving {} {}s", items.len(), T::KIND.label()),
        form.submit(),
    )
    .await?;
    report::<T>(submitted);
    Ok(())
}

pub async fn update<T: Entity>(
    mut list: EntityList<T>,
    id: &str,
    file: Option<&Path>,
    images: &[(String, PathBuf)],
) -> Result<()> {
    with_spinner(format!("Loading {}", T::KIND.collection_path()), list.load()).await?;
    let form = list.open_edit(id)?;

    if let Some(file) = file {
        let patch = read_json(file)?;
        let draft = patched(&form.draft(), &patch)?;
        form.update(|d| *d = draft)?;
    }
    upload_all(&form, images).await?;

    let submitted = with_spinner(format!("Saving {}", T::KIND.label()), form.submit()).await;
    list.close_edit();
    report::<T>(submitted?);
    Ok(())
}

pub async fn delete<T: Entity>(list: EntityList<T>, id: &str) -> Result<()> {
    with_spinner(format!("Deleting {} {id}", T::KIND.label()), list.delete(id)).await?;
    println!("Deleted {} {id}; {} remaining", T::KIND.label(), list.rows().len());
    Ok(())
}

pub async fn upload(dash: &Dashboard, path: &Path) -> Result<()> {
    let image = ImageUpload::from_path(path).await?;
    let url = with_spinner(
        format!("Uploading {}", image.file_name),
        dash.media.upload(image),
    )
    .await?;
    println!("{url}");
    Ok(())
}

/// Print the size of a collection every time it changes.
pub fn report_changes<T: Send + Sync + 'static>(
    label: String,
    mut rx: watch::Receiver<Snapshot<T>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let len = rx.borrow_and_update().len();
            println!(
                "[{}] {label}: {len} record(s)",
                chrono::Local::now().format("%H:%M:%S")
            );
        }
    })
}
