/// 内存文档库
///
/// 纪录保存在进程内的 HashMap 中，每次写入后广播完整快照

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::broadcast;

use super::{next_server_timestamp, sort_by_submission_desc, SNAPSHOT_CHANNEL_CAPACITY};
use crate::models::structs::{
    default_id, ApprovalDecision, InspectionRecord, NewInspectionRecord, RecordsSnapshot,
};
use crate::services::traits::{BaseService, IInspectionStore};
use crate::utils::error::{AppError, AppResult};

#[derive(Default)]
struct StoreState {
    records: HashMap<String, InspectionRecord>,
    revision: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl StoreState {
    fn sorted_records(&self) -> Vec<InspectionRecord> {
        let mut records: Vec<InspectionRecord> = self.records.values().cloned().collect();
        sort_by_submission_desc(&mut records);
        records
    }
}

pub struct MemoryInspectionStore {
    collection_path: String,
    state: RwLock<StoreState>,
    snapshot_tx: broadcast::Sender<RecordsSnapshot>,
}

impl MemoryInspectionStore {
    pub fn new(collection_path: impl Into<String>) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            collection_path: collection_path.into(),
            state: RwLock::new(StoreState::default()),
            snapshot_tx,
        }
    }

    fn lock_error() -> AppError {
        AppError::concurrency_error("文档库锁已损坏")
    }

    /// 写入后递增版本并广播快照（无订阅者时忽略）
    fn publish(&self, state: &mut StoreState) {
        state.revision += 1;
        let snapshot = RecordsSnapshot {
            revision: state.revision,
            records: state.sorted_records(),
        };
        if self.snapshot_tx.send(snapshot).is_err() {
            debug!("[MemoryInspectionStore] 快照 {} 无订阅者", state.revision);
        }
    }
}

#[async_trait]
impl BaseService for MemoryInspectionStore {
    fn service_name(&self) -> &'static str {
        "MemoryInspectionStore"
    }

    async fn initialize(&mut self) -> AppResult<()> {
        info!("{} 已初始化: {}", self.service_name(), self.collection_path);
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        info!("{} 已关闭。", self.service_name());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        self.state.read().map(|_| ()).map_err(|_| Self::lock_error())
    }
}

#[async_trait]
impl IInspectionStore for MemoryInspectionStore {
    fn collection_path(&self) -> &str {
        &self.collection_path
    }

    async fn create_record(&self, record: NewInspectionRecord) -> AppResult<InspectionRecord> {
        let mut state = self.state.write().map_err(|_| Self::lock_error())?;
        let submitted_at = next_server_timestamp(state.last_timestamp);
        state.last_timestamp = Some(submitted_at);

        let stored = InspectionRecord::from_new(default_id(), record, submitted_at);
        state.records.insert(stored.id.clone(), stored.clone());
        self.publish(&mut state);
        debug!("[MemoryInspectionStore] 新增纪录 {}", stored.id);
        Ok(stored)
    }

    async fn load_record(&self, id: &str) -> AppResult<Option<InspectionRecord>> {
        let state = self.state.read().map_err(|_| Self::lock_error())?;
        Ok(state.records.get(id).cloned())
    }

    async fn load_all_records(&self) -> AppResult<Vec<InspectionRecord>> {
        let state = self.state.read().map_err(|_| Self::lock_error())?;
        Ok(state.sorted_records())
    }

    async fn apply_approval(&self, id: &str, decision: &ApprovalDecision) -> AppResult<InspectionRecord> {
        let mut state = self.state.write().map_err(|_| Self::lock_error())?;
        let decided_at = next_server_timestamp(state.last_timestamp);

        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| AppError::not_found_error("InspectionRecord", format!("找不到紀錄 {}", id)))?;
        record
            .apply_decision(decision, decided_at)
            .map_err(|status| AppError::already_decided(id, status.to_string()))?;
        let updated = record.clone();

        state.last_timestamp = Some(decided_at);
        self.publish(&mut state);
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordsSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn current_revision(&self) -> u64 {
        self.state.read().map(|s| s.revision).unwrap_or_default()
    }
}
