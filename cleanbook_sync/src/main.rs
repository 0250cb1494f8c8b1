use std::error::Error;

use async_trait::async_trait;
use cleanbook::{
    domain::{
        core::{CoreEvent, Reservation, ReservationEvent, ReservationStatus},
        Entity,
    },
    infrastructure::core::FILTERABLE_ATTRIBUTES,
    CleanbookConfig,
};
use eventstore::{ClientSettings, Position, StreamPosition, SubscribeToAllOptions};
use meilisearch_sdk::{task_info::TaskInfo, tasks::Task};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

static VERSION_UID: &str = "eventstore_version";

#[tokio::main]
async fn main() {
    match CleanbookConfig::load() {
        Ok(config) => {
            config.logger.init();
            if let Err(error) = subscribe(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("アプリケーションエラー: {}", error)
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EventstoreVersion {
    id: u64,
    event_id: Uuid,
    commit: u64,
    prepare: u64,
}

impl EventstoreVersion {
    fn position(&self) -> Position {
        Position {
            commit: self.commit,
            prepare: self.prepare,
        }
    }
}

async fn subscribe(config: &CleanbookConfig) -> Result<(), Box<dyn Error>> {
    let settings = config.eventstore.url.parse::<ClientSettings>()?;
    let mut client = Client {
        eventstore: eventstore::Client::new(settings)?,
        meilisearch: meilisearch_sdk::Client::new(
            &config.meilisearch.url,
            &config.meilisearch.api_key,
        ),
        task_info: None,
    };
    client
        .meilisearch
        .index(Reservation::ENTITY_NAME)
        .set_filterable_attributes(FILTERABLE_ATTRIBUTES)
        .await?;
    let start = match client
        .meilisearch
        .index(VERSION_UID)
        .get_document::<EventstoreVersion>("1")
        .await
    {
        Ok(version) => StreamPosition::Position(version.position()),
        Err(e) => {
            warn!("バージョン情報がないため先頭から同期します: {}", e);
            StreamPosition::Start
        }
    };
    let mut sub = client
        .eventstore
        .subscribe_to_all(&SubscribeToAllOptions::default().position(start))
        .await;
    loop {
        let resolved = sub.next().await?;
        if let Ok(core_event) = CoreEvent::try_from(&resolved) {
            info!("ドメインイベントを受信: {:?}", core_event);
            if let Err(e) = client.execute(core_event).await {
                error!("イベント実行エラー: {}", e);
                continue;
            }
            if let Err(e) = client.wait_for_completion().await {
                error!("インデックス更新の完了待ちに失敗: {}", e);
                continue;
            }
        } else {
            info!("システムイベントを受信: {:?}", resolved);
        }
        let event = resolved.get_original_event();
        if let Err(e) = client
            .meilisearch
            .index(VERSION_UID)
            .add_documents(
                &[EventstoreVersion {
                    id: 1,
                    event_id: event.id,
                    commit: event.position.commit,
                    prepare: event.position.prepare,
                }],
                Some("id"),
            )
            .await
        {
            error!("バージョン情報保存失敗: {}", e);
        }
    }
}

#[async_trait]
pub trait Execute<E> {
    type Error: Error;
    async fn execute(&mut self, event: E) -> Result<(), Self::Error>;
}

struct Client {
    eventstore: eventstore::Client,
    meilisearch: meilisearch_sdk::Client,
    task_info: Option<TaskInfo>,
}

impl Client {
    async fn wait_for_completion(&self) -> Result<Option<Task>, meilisearch_sdk::errors::Error> {
        if let Some(task_info) = &self.task_info {
            loop {
                match self.meilisearch.wait_for_task(task_info, None, None).await {
                    Ok(task) => match task {
                        Task::Succeeded { .. } | Task::Failed { .. } => return Ok(Some(task)),
                        _ => continue,
                    },
                    Err(meilisearch_sdk::errors::Error::Timeout) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Execute<CoreEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: CoreEvent) -> Result<(), Self::Error> {
        match event {
            CoreEvent::ReservationEvent(event) => self.execute(event).await,
        }
    }
}

#[async_trait]
impl Execute<ReservationEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: ReservationEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Reservation::ENTITY_NAME);
        let task = match event {
            ReservationEvent::ReservationCreated {
                id,
                service_date,
                slot,
                customer,
            } => {
                if let Ok(entity) = Reservation::create(id, service_date, slot, customer) {
                    index.add_documents(&[entity], Some("id")).await?
                } else {
                    warn!("不正なエンティティの登録をスキップしました");
                    return Ok(());
                }
            }
            ReservationEvent::ReservationStatusChanged { id, status } => {
                index
                    .add_or_update(&[json!({"id": id, "status": status})], Some("id"))
                    .await?
            }
            ReservationEvent::TechnicianAssigned { id, technician } => {
                index
                    .add_or_update(
                        &[json!({
                            "id": id,
                            "technician": technician,
                            "status": ReservationStatus::Assigned,
                        })],
                        Some("id"),
                    )
                    .await?
            }
            ReservationEvent::ReservationDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}
