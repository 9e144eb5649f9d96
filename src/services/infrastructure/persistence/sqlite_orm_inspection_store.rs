// 使用SeaORM和SQLite实现巡察纪录文档库

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Schema,
};
use tokio::sync::broadcast;

use super::{next_server_timestamp, SNAPSHOT_CHANNEL_CAPACITY};
use crate::log_backend_failure;
use crate::models::entities::inspection_record::{self, Column, Entity};
use crate::models::enums::ApprovalStatus;
use crate::models::structs::{
    default_id, ApprovalDecision, InspectionRecord, NewInspectionRecord, RecordsSnapshot,
};
use crate::services::traits::{BaseService, IInspectionStore};
use crate::utils::error::{AppError, AppResult};
use crate::utils::time_utils;

// 默认的SQLite数据库文件名
const DEFAULT_DB_FILE: &str = "grain_inspection.sqlite";
// 数据库URL前缀
const SQLITE_URL_PREFIX: &str = "sqlite://";

/// 基于SeaORM和SQLite的巡察纪录文档库
pub struct SqliteOrmInspectionStore {
    db_conn: Arc<DatabaseConnection>,
    db_file_path: PathBuf,
    collection_path: String,
    /// 上一个指派的时间戳与快照版本；写入期间持有，保证时间戳严格递增
    write_state: tokio::sync::Mutex<WriteState>,
    revision: Mutex<u64>,
    snapshot_tx: broadcast::Sender<RecordsSnapshot>,
}

struct WriteState {
    last_timestamp: Option<DateTime<Utc>>,
}

impl SqliteOrmInspectionStore {
    /// 创建新的 SqliteOrmInspectionStore 实例
    ///
    /// * `db_path_opt` - SQLite数据库文件的可选路径。如果为None，则使用当前目录下的默认文件。
    pub async fn new(db_path_opt: Option<&Path>, collection_path: impl Into<String>) -> AppResult<Self> {
        let db_file_path = db_path_opt
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join(DEFAULT_DB_FILE));

        // 确保数据库文件的父目录存在
        if let Some(parent_dir) = db_file_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                tokio::fs::create_dir_all(parent_dir).await.map_err(|e| {
                    AppError::io_error(format!("创建数据库目录失败: {:?}", parent_dir), e.kind().to_string())
                })?;
            }
        }

        // mode=rwc: 数据库文件不存在时自动创建
        let db_url = format!("{}{}?mode=rwc", SQLITE_URL_PREFIX, db_file_path.to_string_lossy());
        let mut options = ConnectOptions::new(db_url);
        options
            .max_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|db_err| AppError::persistence_error(db_err.to_string()))?;

        Self::setup_schema(&conn).await?;

        let collection_path = collection_path.into();
        let last_timestamp = Self::latest_timestamp(&conn, &collection_path).await?;
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        Ok(Self {
            db_conn: Arc::new(conn),
            db_file_path,
            collection_path,
            write_state: tokio::sync::Mutex::new(WriteState { last_timestamp }),
            revision: Mutex::new(0),
            snapshot_tx,
        })
    }

    /// 初始化数据库表结构（如果不存在）
    async fn setup_schema(db: &DatabaseConnection) -> AppResult<()> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        let stmt = schema.create_table_from_entity(Entity).if_not_exists().to_owned();
        db.execute(backend.build(&stmt))
            .await
            .map_err(|e| AppError::persistence_error(format!("创建 inspection_records 表失败: {}", e)))?;

        log::info!("数据库表结构设置完成或已存在。");
        Ok(())
    }

    /// 集合内最新的提交/审核时间，作为时间戳递增的起点
    async fn latest_timestamp(db: &DatabaseConnection, collection_path: &str) -> AppResult<Option<DateTime<Utc>>> {
        let models = Entity::find()
            .filter(Column::CollectionPath.eq(collection_path))
            .all(db)
            .await?;
        let latest_us = models
            .iter()
            .flat_map(|m| std::iter::once(m.submission_timestamp_us).chain(m.approval_timestamp_us))
            .max();
        Ok(latest_us.and_then(time_utils::from_micros))
    }

    /// 数据库文件路径
    pub fn db_file_path(&self) -> &Path {
        &self.db_file_path
    }

    async fn find_model(&self, id: &str) -> AppResult<Option<inspection_record::Model>> {
        let model = Entity::find_by_id(id.to_string())
            .filter(Column::CollectionPath.eq(self.collection_path.as_str()))
            .one(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载巡察纪录失败: {}", e)))?;
        Ok(model)
    }

    /// 写入后递增版本并广播完整快照，调用方须持有 `write_state`
    async fn publish_snapshot(&self) -> AppResult<()> {
        let records = self.load_all_records().await?;
        let revision = {
            let mut guard = self
                .revision
                .lock()
                .map_err(|_| AppError::concurrency_error("快照版本锁已损坏"))?;
            *guard += 1;
            *guard
        };
        if self.snapshot_tx.send(RecordsSnapshot { revision, records }).is_err() {
            debug!("[SqliteOrmInspectionStore] 快照 {} 无订阅者", revision);
        }
        Ok(())
    }
}

#[async_trait]
impl BaseService for SqliteOrmInspectionStore {
    fn service_name(&self) -> &'static str {
        "SqliteOrmInspectionStore"
    }

    async fn initialize(&mut self) -> AppResult<()> {
        // 连接与表结构已在 new 中完成
        info!("{} 已初始化: {:?}", self.service_name(), self.db_file_path);
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        info!("{} 已关闭。", self.service_name());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        self.db_conn.ping().await.map_err(|db_err| {
            AppError::persistence_error(format!("数据库健康检查失败: {}", db_err))
        })?;
        debug!("数据库连接健康。");
        Ok(())
    }
}

#[async_trait]
impl IInspectionStore for SqliteOrmInspectionStore {
    fn collection_path(&self) -> &str {
        &self.collection_path
    }

    async fn create_record(&self, record: NewInspectionRecord) -> AppResult<InspectionRecord> {
        let stored = {
            let mut write_state = self.write_state.lock().await;
            let submitted_at = next_server_timestamp(write_state.last_timestamp);
            let stored = InspectionRecord::from_new(default_id(), record, submitted_at);

            let active_model = inspection_record::ActiveModel::from_record(&stored, &self.collection_path)?;
            active_model.insert(self.db_conn.as_ref()).await.map_err(|e| {
                log_backend_failure!("保存巡察纪录失败: {}", e);
                AppError::persistence_error(format!("保存巡察纪录失败: {}", e))
            })?;

            write_state.last_timestamp = Some(submitted_at);
            // 仍持有写锁，快照内容与版本号按写入顺序对应
            self.publish_snapshot().await?;
            stored
        };

        Ok(stored)
    }

    async fn load_record(&self, id: &str) -> AppResult<Option<InspectionRecord>> {
        match self.find_model(id).await? {
            Some(model) => Ok(Some(InspectionRecord::try_from(model)?)),
            None => Ok(None),
        }
    }

    async fn load_all_records(&self) -> AppResult<Vec<InspectionRecord>> {
        let models = Entity::find()
            .filter(Column::CollectionPath.eq(self.collection_path.as_str()))
            .order_by_desc(Column::SubmissionTimestampUs)
            .order_by_asc(Column::Id)
            .all(self.db_conn.as_ref())
            .await
            .map_err(|e| AppError::persistence_error(format!("加载所有巡察纪录失败: {}", e)))?;
        models.into_iter().map(InspectionRecord::try_from).collect()
    }

    async fn apply_approval(&self, id: &str, decision: &ApprovalDecision) -> AppResult<InspectionRecord> {
        let updated = {
            let mut write_state = self.write_state.lock().await;
            let decided_at = next_server_timestamp(write_state.last_timestamp);

            let model = self.find_model(id).await?.ok_or_else(|| {
                AppError::not_found_error("InspectionRecord", format!("找不到紀錄 {}", id))
            })?;
            let mut record = InspectionRecord::try_from(model)?;
            record
                .apply_decision(decision, decided_at)
                .map_err(|status| AppError::already_decided(id, status.to_string()))?;

            // 只更新审核栏位，且仅在纪录仍为待审核时生效
            let patch = inspection_record::ActiveModel {
                approval_status: Set(record.approval_status.to_string()),
                approver_id: Set(record.approver_id.clone()),
                approver_name: Set(record.approver_name.clone()),
                approval_timestamp_us: Set(record.approval_timestamp.map(time_utils::to_micros)),
                ..ActiveModelTrait::default()
            };
            let result = Entity::update_many()
                .set(patch)
                .filter(Column::Id.eq(id))
                .filter(Column::CollectionPath.eq(self.collection_path.as_str()))
                .filter(Column::ApprovalStatus.eq(ApprovalStatus::Pending.to_string()))
                .filter(Column::ApproverId.is_null())
                .exec(self.db_conn.as_ref())
                .await
                .map_err(|e| {
                    log_backend_failure!("更新审核状态失败: {}", e);
                    AppError::persistence_error(format!("更新审核状态失败: {}", e))
                })?;

            if result.rows_affected == 0 {
                let current = self
                    .find_model(id)
                    .await?
                    .map(|m| m.approval_status)
                    .unwrap_or_else(|| "Unknown".to_string());
                return Err(AppError::already_decided(id, current));
            }

            write_state.last_timestamp = Some(decided_at);
            self.publish_snapshot().await?;
            record
        };

        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordsSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn current_revision(&self) -> u64 {
        self.revision.lock().map(|r| *r).unwrap_or_default()
    }
}
