/// 巡察纪录文档库实现
///
/// - `MemoryInspectionStore`: 进程内实现，用于测试与 `memory` 后端
/// - `SqliteOrmInspectionStore`: SeaORM + SQLite 持久化实现

pub mod memory_inspection_store;
pub mod sqlite_orm_inspection_store;


pub use memory_inspection_store::MemoryInspectionStore;
pub use sqlite_orm_inspection_store::SqliteOrmInspectionStore;

use chrono::{DateTime, Utc};

use crate::models::structs::InspectionRecord;
use crate::utils::time_utils;

/// 快照广播通道容量
pub(crate) const SNAPSHOT_CHANNEL_CAPACITY: usize = 32;

/// 指派下一个服务端时间戳（微秒精度，严格大于上一个）
pub(crate) fn next_server_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now_us = time_utils::to_micros(Utc::now());
    let next_us = match last {
        Some(prev) => now_us.max(time_utils::to_micros(prev) + 1),
        None => now_us,
    };
    time_utils::from_micros(next_us).unwrap_or_else(Utc::now)
}

/// 按提交时间倒序排列，缺少提交时间的排在最后，同一时间按ID排序
pub(crate) fn sort_by_submission_desc(records: &mut [InspectionRecord]) {
    records.sort_by(|a, b| {
        b.submission_timestamp
            .cmp(&a.submission_timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
}
