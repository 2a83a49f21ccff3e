// ==========================================
// 配送单号 CSV 导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{
    parse_char_setting, parse_encoding_list, parse_encoding_setting, ImportConfigReader,
    DEFAULT_DETECT_PREFIX_BYTES,
};
use crate::db::open_sqlite_connection;
use crate::domain::import::{CanonicalHeader, DEFAULT_ORDER_ID_LABEL, DEFAULT_SHIP_NUMBER_LABEL};
use crate::importer::error::{ImportError, ImportResult};
use encoding_rs::{Encoding, SHIFT_JIS};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const CSV_IMPORT_DELIMITER: &str = "csv_import_delimiter";
    pub const CSV_IMPORT_ENCLOSURE: &str = "csv_import_enclosure";
    pub const CSV_EXPORT_SEPARATOR: &str = "csv_export_separator";
    pub const CSV_EXPORT_ENCODING: &str = "csv_export_encoding";
    pub const CSV_TEMP_REALDIR: &str = "csv_temp_realdir";
    pub const CSV_DETECT_PREFIX_BYTES: &str = "csv_detect_prefix_bytes";
    pub const CSV_DETECT_ENCODINGS: &str = "csv_detect_encodings";
    pub const CSV_HEADER_ORDER_ID: &str = "csv_header_order_id";
    pub const CSV_HEADER_SHIP_NUMBER: &str = "csv_header_ship_number";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置
    pub fn list_global_configs(&self) -> ImportResult<HashMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }
}

impl ImportConfigReader for ConfigManager {
    fn get_import_delimiter(&self) -> ImportResult<u8> {
        match self.get_config_value(config_keys::CSV_IMPORT_DELIMITER)? {
            Some(v) => parse_char_setting(config_keys::CSV_IMPORT_DELIMITER, &v),
            None => Ok(b','),
        }
    }

    fn get_import_enclosure(&self) -> ImportResult<u8> {
        match self.get_config_value(config_keys::CSV_IMPORT_ENCLOSURE)? {
            Some(v) => parse_char_setting(config_keys::CSV_IMPORT_ENCLOSURE, &v),
            None => Ok(b'"'),
        }
    }

    fn get_export_separator(&self) -> ImportResult<u8> {
        match self.get_config_value(config_keys::CSV_EXPORT_SEPARATOR)? {
            Some(v) => parse_char_setting(config_keys::CSV_EXPORT_SEPARATOR, &v),
            None => Ok(b','),
        }
    }

    fn get_export_encoding(&self) -> ImportResult<&'static Encoding> {
        match self.get_config_value(config_keys::CSV_EXPORT_ENCODING)? {
            Some(v) => parse_encoding_setting(config_keys::CSV_EXPORT_ENCODING, &v),
            None => Ok(SHIFT_JIS),
        }
    }

    fn get_temp_dir(&self) -> ImportResult<PathBuf> {
        Ok(self
            .get_config_value(config_keys::CSV_TEMP_REALDIR)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir))
    }

    fn get_detect_prefix_bytes(&self) -> ImportResult<usize> {
        let key = config_keys::CSV_DETECT_PREFIX_BYTES;
        match self.get_config_value(key)? {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: v.clone(),
                    message: "必须是正整数".to_string(),
                }),
            None => Ok(DEFAULT_DETECT_PREFIX_BYTES),
        }
    }

    fn get_detect_encodings(&self) -> ImportResult<Vec<&'static Encoding>> {
        let value = self
            .get_config_value(config_keys::CSV_DETECT_ENCODINGS)?
            .unwrap_or_else(|| "UTF-8,Shift_JIS,EUC-JP".to_string());
        parse_encoding_list(config_keys::CSV_DETECT_ENCODINGS, &value)
    }

    fn get_header(&self) -> ImportResult<CanonicalHeader> {
        let order_id_label = self
            .get_config_value(config_keys::CSV_HEADER_ORDER_ID)?
            .unwrap_or_else(|| DEFAULT_ORDER_ID_LABEL.to_string());
        let ship_number_label = self
            .get_config_value(config_keys::CSV_HEADER_SHIP_NUMBER)?
            .unwrap_or_else(|| DEFAULT_SHIP_NUMBER_LABEL.to_string());
        Ok(CanonicalHeader::new(
            order_id_label.trim(),
            ship_number_label.trim(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use encoding_rs::{EUC_JP, UTF_8};

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let config = manager();
        let settings = config.load_import_settings().unwrap();
        assert_eq!(settings.delimiter, b',');
        assert_eq!(settings.enclosure, b'"');
        assert_eq!(settings.export_encoding, SHIFT_JIS);
        assert_eq!(settings.detect_prefix_bytes, DEFAULT_DETECT_PREFIX_BYTES);
        assert_eq!(settings.header, CanonicalHeader::default());
    }

    #[test]
    fn test_overrides_from_config_kv() {
        let config = manager();
        config
            .set_global_config_value(config_keys::CSV_IMPORT_DELIMITER, "\\t")
            .unwrap();
        config
            .set_global_config_value(config_keys::CSV_EXPORT_ENCODING, "UTF-8")
            .unwrap();
        config
            .set_global_config_value(config_keys::CSV_DETECT_ENCODINGS, "EUC-JP")
            .unwrap();
        config
            .set_global_config_value(config_keys::CSV_HEADER_ORDER_ID, "orderId")
            .unwrap();

        let settings = config.load_import_settings().unwrap();
        assert_eq!(settings.delimiter, b'\t');
        assert_eq!(settings.export_encoding, UTF_8);
        assert_eq!(settings.detect_encodings, vec![UTF_8, EUC_JP]);
        assert_eq!(settings.header.order_id_label, "orderId");
        assert_eq!(settings.header.ship_number_label, "配送伝票番号");
        assert_eq!(config.list_global_configs().unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let config = manager();
        config
            .set_global_config_value(config_keys::CSV_DETECT_PREFIX_BYTES, "zero")
            .unwrap();
        let err = config.get_detect_prefix_bytes().unwrap_err();
        assert!(matches!(err, ImportError::ConfigValueError { .. }));
    }
}
