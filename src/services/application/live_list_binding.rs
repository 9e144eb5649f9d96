/// 即时纪录列表
///
/// 订阅文档库快照，先渲染一次当前内容，之后每次收到新快照就整体重绘。
/// 绑定在会话的取消令牌上：会话登出或文档库关闭时结束。

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::structs::{InspectionRecord, RecordsSnapshot};
use crate::services::application::record_renderer::RecordRenderer;
use crate::services::domain::session::SessionContext;
use crate::services::infrastructure::persistence::sort_by_submission_desc;
use crate::services::traits::{IInspectionStore, IListView};
use crate::utils::error::AppResult;

/// 只接受比已渲染版本更新的快照
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RevisionGate {
    last_rendered: Option<u64>,
}

impl RevisionGate {
    /// 版本较新时记录并返回 true
    pub fn accept(&mut self, revision: u64) -> bool {
        match self.last_rendered {
            Some(last) if revision <= last => false,
            _ => {
                self.last_rendered = Some(revision);
                true
            }
        }
    }

    /// 全量重载后强制设置版本
    pub fn reset_to(&mut self, revision: u64) {
        self.last_rendered = Some(revision);
    }

    pub fn last_rendered(&self) -> Option<u64> {
        self.last_rendered
    }
}

struct ListBinder {
    store: Arc<dyn IInspectionStore>,
    renderer: Arc<RecordRenderer>,
    view: Arc<dyn IListView>,
    actor: String,
    gate: RevisionGate,
}

impl ListBinder {
    fn render(&self, mut records: Vec<InspectionRecord>) -> AppResult<()> {
        sort_by_submission_desc(&mut records);
        let html = self.renderer.render_list(&records, Some(&self.actor))?;
        self.view.replace_content(html);
        Ok(())
    }

    /// 全量读取并重绘
    async fn reload(&mut self) {
        let revision = self.store.current_revision();
        match self.store.load_all_records().await.and_then(|records| self.render(records)) {
            Ok(()) => self.gate.reset_to(revision),
            Err(e) => {
                warn!("[LiveListBinding] 载入纪录失败: {}", e);
                self.view.show_error(&format!("載入錯誤: {}", e.user_message()));
            }
        }
    }

    async fn run(mut self, mut rx: broadcast::Receiver<RecordsSnapshot>, cancel: CancellationToken) {
        self.reload().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("[LiveListBinding] 会话结束，停止监听");
                    break;
                }
                received = rx.recv() => match received {
                    Ok(snapshot) => {
                        if !self.gate.accept(snapshot.revision) {
                            debug!("[LiveListBinding] 忽略过期快照 {}", snapshot.revision);
                            continue;
                        }
                        if let Err(e) = self.render(snapshot.records) {
                            warn!("[LiveListBinding] 渲染快照失败: {}", e);
                            self.view.show_error(&format!("載入錯誤: {}", e.user_message()));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("[LiveListBinding] 落后 {} 个快照，全量重载", skipped);
                        self.reload().await;
                    }
                    Err(RecvError::Closed) => {
                        info!("[LiveListBinding] 快照通道已关闭");
                        break;
                    }
                }
            }
        }
    }
}

/// 运行中的列表绑定
pub struct LiveListBinding {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LiveListBinding {
    /// 启动监听；订阅先于首次载入，避免漏掉中间的写入
    pub fn start(
        store: Arc<dyn IInspectionStore>,
        renderer: Arc<RecordRenderer>,
        view: Arc<dyn IListView>,
        session: &SessionContext,
    ) -> Self {
        let rx = store.subscribe();
        let cancel = session.cancellation_token();
        let binder = ListBinder {
            store,
            renderer,
            view,
            actor: session.user_id().to_string(),
            gate: RevisionGate::default(),
        };
        let handle = tokio::spawn(binder.run(rx, cancel.clone()));
        info!("[LiveListBinding] 已启动 (使用者 {})", session.short_id());
        Self { cancel, handle }
    }

    /// 停止监听（不影响会话本身）
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 等待监听任务结束
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!("[LiveListBinding] 监听任务异常结束: {}", e);
        }
    }
}
