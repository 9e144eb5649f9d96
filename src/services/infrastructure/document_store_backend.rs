/// 文档库提交后端
///
/// 把 `IInspectionStore` 包装成提交管线使用的 `ISubmissionBackend`

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::models::structs::{NewInspectionRecord, SubmissionReceipt};
use crate::services::traits::{IInspectionStore, ISubmissionBackend};
use crate::utils::error::AppResult;

pub struct DocumentStoreBackend {
    store: Arc<dyn IInspectionStore>,
}

impl DocumentStoreBackend {
    pub fn new(store: Arc<dyn IInspectionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ISubmissionBackend for DocumentStoreBackend {
    fn backend_name(&self) -> &'static str {
        "document_store"
    }

    async fn submit_record(&self, record: &NewInspectionRecord) -> AppResult<SubmissionReceipt> {
        let stored = self.store.create_record(record.clone()).await?;
        debug!(
            "[DocumentStoreBackend] 纪录 {} 已写入 {}",
            stored.id,
            self.store.collection_path()
        );
        Ok(SubmissionReceipt {
            record_id: Some(stored.id),
            backend: self.backend_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::persistence::MemoryInspectionStore;
    use crate::test_support::sample_new_record;

    #[tokio::test]
    async fn receipt_carries_assigned_id() {
        let store = Arc::new(MemoryInspectionStore::new("artifacts/t/public/data/inspections"));
        let backend = DocumentStoreBackend::new(store.clone());

        let receipt = backend.submit_record(&sample_new_record()).await.unwrap();
        assert_eq!(receipt.backend, "document_store");

        let id = receipt.record_id.unwrap();
        let stored = store.load_record(&id).await.unwrap().unwrap();
        assert!(stored.submission_timestamp.is_some());
        assert!(stored.approval_status.is_pending());
    }
}
