use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::utils::error::{AppError, AppResult};

/// 环境变量前缀，例如 `GRAIN_BACKEND_CONFIG__BACKEND_TYPE=memory`
pub const ENV_PREFIX: &str = "GRAIN";

/// 应用程序主配置结构
/// 包含巡察系统运行所需的所有配置信息
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 应用程序基本设置
    pub app_settings: AppSettings,
    /// 资料后端配置
    pub backend_config: BackendConfig,
    /// 登入配置
    pub auth_config: AuthConfig,
    /// 审核配置
    pub approval_config: ApprovalConfig,
    /// CSV 匯出配置
    pub export_config: ExportConfig,
    /// 签名板配置
    pub signature_config: SignatureConfig,
    /// 日志配置
    pub logging_config: LoggingConfig,
    /// 自定义检查表 JSON 路径，未设置时使用内建的穀倉巡察表
    pub checklist_path: Option<PathBuf>,
}

/// 应用程序基本设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 应用程序名称
    pub app_name: String,
    /// 应用程序ID，决定文档集合路径
    pub app_id: String,
    /// 运行环境 (development, testing, production)
    pub environment: String,
    /// 是否启用调试模式
    pub debug_mode: bool,
}

/// 后端类型
///
/// - `sqlite`: SeaORM/SQLite 文档库
/// - `memory`: 进程内文档库（测试、演示用）
/// - `spreadsheet`: 试算表 HTTP 端点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// 后端类型 (sqlite, memory, spreadsheet)
    pub backend_type: String,
    /// SQLite 数据库文件路径
    pub database_path: PathBuf,
    /// 试算表端点 URL
    pub spreadsheet_url: Option<String>,
    /// 请求超时（毫秒）
    pub request_timeout_ms: u64,
}

/// 登入配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// 宿主环境注入的初始令牌
    pub initial_token: Option<String>,
    /// HS256 令牌密钥，未设置时令牌无法校验，一律匿名登入
    pub token_secret: Option<String>,
}

/// 审核配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApprovalConfig {
    /// 允许审核的使用者ID，空表示任何已登入者均可审核
    pub approver_ids: Vec<String>,
}

/// CSV 匯出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 输出目录
    pub output_dir: PathBuf,
    /// 文件名前缀
    pub file_prefix: String,
}

/// 签名板配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// 画布 CSS 宽度
    pub viewport_width: u32,
    /// 画布 CSS 高度
    pub viewport_height: u32,
    /// 设备像素比
    pub device_pixel_ratio: f64,
    /// 笔画宽度（CSS 像素）
    pub line_width: f64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (debug, info, warn, error)
    pub log_level: String,
    /// 日志文件路径
    pub log_file_path: Option<PathBuf>,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 是否启用文件输出
    pub file_output: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "GrainInspection".to_string(),
            app_id: "default-app-id".to_string(),
            environment: "development".to_string(),
            debug_mode: false,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: "sqlite".to_string(),
            database_path: PathBuf::from("data/inspections.sqlite"),
            spreadsheet_url: None,
            request_timeout_ms: 15000,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            file_prefix: "GrainInspection_Report".to_string(),
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            viewport_width: 600,
            viewport_height: 200,
            device_pixel_ratio: 1.0,
            line_width: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file_path: Some(PathBuf::from("logs/grain_inspection.log")),
            console_output: true,
            file_output: false,
        }
    }
}

impl AppConfig {
    /// 文档集合路径 `artifacts/<app_id>/public/data/inspections`
    pub fn collection_path(&self) -> String {
        format!("artifacts/{}/public/data/inspections", self.app_settings.app_id)
    }
}

/// 配置管理器
/// 负责加载、保存和管理应用程序配置
pub struct ConfigManager {
    config: AppConfig,
    config_file_path: PathBuf,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_file_path: PathBuf) -> Self {
        Self {
            config: AppConfig::default(),
            config_file_path,
        }
    }

    /// 加载配置
    ///
    /// 依序叠加：JSON 配置文件（可选）→ `GRAIN_` 前缀的环境变量，未出现的栏位取默认值
    pub fn load(&mut self) -> AppResult<()> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(self.config_file_path.as_path())
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("approval_config.approver_ids")
                    .try_parsing(true),
            )
            .build()?;

        self.config = settings
            .try_deserialize()
            .map_err(|e| AppError::configuration_error(format!("解析配置失败: {}", e)))?;

        Ok(())
    }

    /// 将配置保存到文件
    pub async fn save_to_file(&self) -> AppResult<()> {
        // 确保目录存在
        if let Some(parent) = self.config_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await
                    .map_err(|e| AppError::io_error(format!("创建配置目录失败: {}", e), e.kind().to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| AppError::json_error(format!("序列化配置失败: {}", e)))?;

        tokio::fs::write(&self.config_file_path, content)
            .await
            .map_err(|e| AppError::io_error(format!("写入配置文件失败: {}", e), e.kind().to_string()))?;

        Ok(())
    }

    /// 配置文件路径
    pub fn config_file_path(&self) -> &Path {
        &self.config_file_path
    }

    /// 获取配置的只读引用
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取配置的可变引用
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> AppResult<()> {
        if self.config.app_settings.app_id.trim().is_empty() {
            return Err(AppError::configuration_error("应用程序ID不能为空"));
        }

        // 验证环境配置
        let valid_environments = ["development", "testing", "production"];
        if !valid_environments.contains(&self.config.app_settings.environment.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的环境配置: {}，有效值: {:?}",
                self.config.app_settings.environment, valid_environments
            )));
        }

        // 验证日志级别
        let valid_log_levels = ["debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging_config.log_level.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.config.logging_config.log_level, valid_log_levels
            )));
        }

        // 验证后端类型
        let valid_backends = ["sqlite", "memory", "spreadsheet"];
        let backend_type = self.config.backend_config.backend_type.as_str();
        if !valid_backends.contains(&backend_type) {
            return Err(AppError::configuration_error(format!(
                "无效的后端类型: {}，有效值: {:?}",
                backend_type, valid_backends
            )));
        }

        if backend_type == "spreadsheet" {
            let url = self.config.backend_config.spreadsheet_url.as_deref().unwrap_or("");
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::configuration_error("试算表后端需要有效的端点URL"));
            }
        }

        let signature = &self.config.signature_config;
        if signature.viewport_width == 0 || signature.viewport_height == 0 {
            return Err(AppError::configuration_error("签名板尺寸不能为0"));
        }
        if !(signature.device_pixel_ratio.is_finite() && signature.device_pixel_ratio > 0.0) {
            return Err(AppError::configuration_error("设备像素比必须为正数"));
        }
        if !(signature.line_width.is_finite() && signature.line_width > 0.0) {
            return Err(AppError::configuration_error("笔画宽度必须为正数"));
        }

        if self.config.export_config.file_prefix.trim().is_empty() {
            return Err(AppError::configuration_error("匯出文件名前缀不能为空"));
        }

        Ok(())
    }

    /// 重置为默认配置
    pub fn reset_to_default(&mut self) {
        self.config = AppConfig::default();
    }
}

/// 加载并校验配置
///
/// 未指定路径时使用 `config/grain_inspection.json`，文件不存在时全部取默认值与环境变量
pub fn load_app_config(config_path: Option<PathBuf>) -> AppResult<AppConfig> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("config/grain_inspection.json"));
    let mut config_manager = ConfigManager::new(config_path);

    config_manager.load()?;
    config_manager.validate_config()?;
    Ok(config_manager.get_config().clone())
}
