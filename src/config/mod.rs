// ==========================================
// 配送单号 CSV 导入 - 配置层
// ==========================================
// 职责: 导入/导出 CSV 的分隔符、编码、临时目录、表头列名
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ImportConfigReader, ImportSettings};
