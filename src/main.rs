// 穀倉假日巡察 命令行入口
//
// 用法:
//   grain-inspection list              渲染全部纪录
//   grain-inspection status            显示系统状态
//   grain-inspection export [目录]      匯出 CSV
//   grain-inspection approve <纪录ID>   审核通过
//   grain-inspection reject <纪录ID>    审核驳回
//   grain-inspection sample-submit     以示范资料提交一笔纪录

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use grain_inspection_lib::commands::{self, ApprovalRequest};
use grain_inspection_lib::logging::init_logging;
use grain_inspection_lib::models::enums::{CheckStatus, OperationStatus};
use grain_inspection_lib::services::domain::PointerPosition;
use grain_inspection_lib::services::traits::{IConfirmationPrompt, IUserNotifier};
use grain_inspection_lib::utils::load_app_config;
use grain_inspection_lib::{init_app_state, AppState};

/// 提示直接输出到终端
struct ConsoleNotifier;

impl IUserNotifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        println!("{}", message);
    }
}

/// 终端确认，输入 y 表示确认
struct ConsolePrompt;

impl IConfirmationPrompt for ConsolePrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        if std::io::stdout().flush().is_err() {
            return false;
        }
        // 读取标准输入会阻塞，让出当前工作线程
        let answer = tokio::task::block_in_place(|| {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        });
        match answer {
            Ok(line) => is_confirmation(&line),
            Err(_) => false,
        }
    }
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn print_usage() {
    println!("用法: grain-inspection <list|status|export [目录]|approve <ID>|reject <ID>|sample-submit>");
}

/// 填入示范资料并签名后提交
async fn sample_submit(state: &AppState) -> Result<()> {
    {
        let mut form = state.form.lock().await;
        form.state.silo_selection = "一廠#1".to_string();
        form.state.operation_status = OperationStatus::Inbound;
        form.state.general_notes = "假日巡察完成，無異常。".to_string();
        form.state.patrol_points = vec!["北側".to_string()];
        if let Some((_, item)) = state.schema.iter_items().nth(2) {
            let id = item.id.clone();
            form.state.set_item_status(&id, CheckStatus::Normal);
            form.state.set_item_remark(&id, "人員、機具正常");
        }
        form.signature.start_stroke(PointerPosition::Mouse { offset_x: 20.0, offset_y: 40.0 });
        form.signature.extend_stroke(PointerPosition::Mouse { offset_x: 120.0, offset_y: 80.0 });
        form.signature.extend_stroke(PointerPosition::Mouse { offset_x: 220.0, offset_y: 30.0 });
        form.signature.end_stroke();
    }

    let response = commands::submit_inspection(state).await.map_err(anyhow::Error::msg)?;
    if !response.success {
        bail!(response.message);
    }
    if let Some(id) = response.record_id {
        println!("纪录ID: {}", id);
    }
    Ok(())
}

async fn run(state: &AppState, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        None | Some("list") => {
            let html = commands::render_inspection_list(state).await.map_err(anyhow::Error::msg)?;
            println!("{}", html);
        }
        Some("status") => {
            let status = state.system_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Some("export") => {
            let response = commands::export_to_csv(args.get(1).cloned(), state)
                .await
                .map_err(anyhow::Error::msg)?;
            if !response.success {
                bail!(response.message);
            }
            println!("{}", response.message);
        }
        Some(decision @ ("approve" | "reject")) => {
            let record_id = args.get(1).context("缺少纪录ID")?;
            let request = ApprovalRequest {
                record_id: record_id.clone(),
                decision: decision.to_string(),
            };
            let response = commands::handle_approval(request, state).await.map_err(anyhow::Error::msg)?;
            if !response.success && !response.cancelled {
                bail!(response.message);
            }
        }
        Some("sample-submit") => sample_submit(state).await?,
        Some(_) => print_usage(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config(None).context("加载配置失败")?;
    if let Err(e) = init_logging(&config.logging_config) {
        eprintln!("日志初始化失败: {}", e);
    }

    let state = init_app_state(config, Arc::new(ConsoleNotifier), Arc::new(ConsolePrompt))
        .await
        .context("初始化应用状态失败")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run(&state, &args).await;
    state.shutdown();
    result
}
