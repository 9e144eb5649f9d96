/// 命令模块
///
/// 包含界面或命令行可调用的所有命令

pub mod inspection_commands;

// 重新导出命令
pub use inspection_commands::{
    export_to_csv,
    handle_approval,
    render_inspection_list,
    submit_inspection,
    ApprovalRequest,
};
