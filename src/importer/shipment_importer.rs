// ==========================================
// 配送单号 CSV 导入 - 导入协调器
// ==========================================
// 流程: 暂存上传 → 解码读取 → 表头校验 → 空文件校验 → 开启事务
//       → 逐行（校验 → 对账暂存）→ 提交 / 回滚
// 规则:
// - 校验错误（结构/业务）: 回滚，返回失败的 ImportOutcome
// - IO / 持久化错误: 回滚后作为 Err 返回
// - 临时文件在任何结果下都会释放
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::import::ImportOutcome;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, CsvRow};
use crate::importer::reconciler::ShipmentReconciler;
use crate::importer::row_validator::RowValidator;
use crate::importer::transaction::ImportUnitOfWork;
use crate::importer::upload::TempUpload;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ShipNumberImporter Trait
// ==========================================
pub trait ShipNumberImporter {
    /// 从本地文件导入
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 成功或校验失败（已回滚）
    /// - Err: IO / 持久化错误（已回滚）
    fn import_file(&self, path: &Path) -> ImportResult<ImportOutcome>;

    /// 从上传内容导入
    ///
    /// # 参数
    /// - file_name: 客户端文件名（仅用于结果显示）
    /// - extension: 客户端文件扩展名
    /// - bytes: 上传内容
    fn import_bytes(
        &self,
        file_name: Option<&str>,
        extension: &str,
        bytes: &[u8],
    ) -> ImportResult<ImportOutcome>;
}

// ==========================================
// ShipNumberImporterImpl
// ==========================================
pub struct ShipNumberImporterImpl<C>
where
    C: ImportConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    config: C,
}

impl<C> ShipNumberImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建导入器
    ///
    /// # 参数
    /// - conn: 共享数据库连接（导入期间独占）
    /// - config: 配置读取器
    pub fn new(conn: Arc<Mutex<Connection>>, config: C) -> Self {
        Self { conn, config }
    }

    #[instrument(skip_all, fields(batch_id = %batch_id))]
    fn run(
        &self,
        batch_id: String,
        file_name: Option<String>,
        upload: TempUpload,
        settings: &ImportSettings,
    ) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        info!(file_name = ?file_name, path = %upload.path().display(), "开始导入配送单号");

        let mut outcome = ImportOutcome {
            batch_id,
            file_name,
            committed: false,
            total_rows: 0,
            created: 0,
            updated: 0,
            errors: Vec::new(),
            elapsed_ms: 0,
        };

        let result = self.process(&upload, settings, &mut outcome);
        // 上传文件在返回前删除
        drop(upload);
        outcome.elapsed_ms = start_time.elapsed().as_millis();

        match result {
            Ok(()) => {
                info!(
                    total_rows = outcome.total_rows,
                    created = outcome.created,
                    updated = outcome.updated,
                    elapsed_ms = outcome.elapsed_ms as u64,
                    "配送单号导入完成"
                );
                Ok(outcome)
            }
            Err(ImportError::Validation(v)) => {
                warn!(
                    row_number = ?v.row_number,
                    kind = ?v.kind,
                    elapsed_ms = outcome.elapsed_ms as u64,
                    "配送单号导入失败，已回滚"
                );
                outcome.errors.push(v);
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, category = ?e.category(), "配送单号导入异常终止");
                Err(e)
            }
        }
    }

    fn process(
        &self,
        upload: &TempUpload,
        settings: &ImportSettings,
        outcome: &mut ImportOutcome,
    ) -> ImportResult<()> {
        let validator = RowValidator::new(settings.header.clone());

        // === 步骤 1: 解码并读取表头 ===
        debug!("步骤 1: 解码并读取表头");
        let rows = CsvParser::from_settings(settings).open(upload.path())?;
        validator.validate_header(rows.headers())?;

        // === 步骤 2: 空文件校验 ===
        debug!("步骤 2: 空文件校验");
        let mut rows = rows.peekable();
        validator.ensure_not_empty(&mut rows)?;

        // === 步骤 3: 开启事务 ===
        debug!("步骤 3: 开启事务");
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;
        let mut uow = ImportUnitOfWork::begin(&mut conn)?;

        // === 步骤 4: 逐行校验与对账 ===
        debug!("步骤 4: 逐行校验与对账");
        if let Err(e) = stage_rows(rows, &validator, &mut uow, outcome) {
            match uow.rollback() {
                Ok(discarded) => debug!(discarded, "暂存记录已丢弃"),
                Err(rollback_err) => warn!(error = %rollback_err, "事务回滚失败"),
            }
            return Err(e);
        }

        // === 步骤 5: 提交 ===
        debug!("步骤 5: 提交");
        let summary = uow.commit()?;
        outcome.committed = true;
        outcome.created = summary.inserted;
        outcome.updated = summary.updated;
        Ok(())
    }
}

/// 按文件顺序处理全部数据行；首个错误即返回
fn stage_rows<I>(
    rows: I,
    validator: &RowValidator,
    uow: &mut ImportUnitOfWork<'_>,
    outcome: &mut ImportOutcome,
) -> ImportResult<()>
where
    I: Iterator<Item = ImportResult<CsvRow>>,
{
    let reconciler = ShipmentReconciler::new();
    for row in rows {
        let row = row?;
        outcome.total_rows += 1;
        let validated = validator.validate_row(&row, &*uow)?;
        reconciler.reconcile(validated, uow)?;
    }
    Ok(())
}

impl<C> ShipNumberImporter for ShipNumberImporterImpl<C>
where
    C: ImportConfigReader,
{
    fn import_file(&self, path: &Path) -> ImportResult<ImportOutcome> {
        let settings = self.config.load_import_settings()?;
        let upload = TempUpload::store_file(&settings.temp_dir, path)?;
        let file_name = upload.original_name().map(str::to_string);
        let batch_id = Uuid::new_v4().to_string();

        self.run(batch_id, file_name, upload, &settings)
    }

    fn import_bytes(
        &self,
        file_name: Option<&str>,
        extension: &str,
        bytes: &[u8],
    ) -> ImportResult<ImportOutcome> {
        let settings = self.config.load_import_settings()?;
        let upload = TempUpload::store_bytes(&settings.temp_dir, extension, bytes)?;
        let batch_id = Uuid::new_v4().to_string();

        self.run(batch_id, file_name.map(str::to_string), upload, &settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};
    use crate::domain::import::ValidationErrorKind;
    use crate::repository::{ShipmentRepository, SqliteShipmentRepository};
    use tempfile::TempDir;

    fn importer(dir: &TempDir) -> ShipNumberImporterImpl<ImportSettings> {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute_batch("INSERT INTO orders (order_id) VALUES (1001), (1002);")
            .unwrap();

        let settings = ImportSettings {
            temp_dir: dir.path().to_path_buf(),
            ..ImportSettings::default()
        };
        ShipNumberImporterImpl::new(Arc::new(Mutex::new(conn)), settings)
    }

    fn stored(importer: &ShipNumberImporterImpl<ImportSettings>) -> Vec<(i64, String)> {
        let conn = importer.conn.lock().unwrap();
        SqliteShipmentRepository::new(&conn)
            .find_all()
            .unwrap()
            .into_iter()
            .map(|r| (r.order_id, r.ship_number))
            .collect()
    }

    #[test]
    fn test_import_bytes_commits_valid_batch() {
        let dir = TempDir::new().unwrap();
        let importer = importer(&dir);

        let outcome = importer
            .import_bytes(
                Some("ship.csv"),
                "csv",
                "注文番号,配送伝票番号\n1001,YT-555\n1002,YT-556\n".as_bytes(),
            )
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.file_name.as_deref(), Some("ship.csv"));
        assert_eq!(outcome.total_rows, 2);
        assert_eq!(outcome.created, 2);
        assert_eq!(
            stored(&importer),
            vec![(1001, "YT-555".to_string()), (1002, "YT-556".to_string())]
        );
    }

    #[test]
    fn test_validation_failure_rolls_back() {
        let dir = TempDir::new().unwrap();
        let importer = importer(&dir);

        let outcome = importer
            .import_bytes(
                None,
                "csv",
                "注文番号,配送伝票番号\n1001,YT-555\n9999,YT-556\n".as_bytes(),
            )
            .unwrap();

        assert!(!outcome.committed);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row_number, Some(2));
        assert_eq!(outcome.errors[0].kind, ValidationErrorKind::OrderNotFound);
        assert!(stored(&importer).is_empty());
    }

    #[test]
    fn test_connection_usable_after_failed_import() {
        let dir = TempDir::new().unwrap();
        let importer = importer(&dir);

        let failed = importer
            .import_bytes(None, "csv", "注文番号,配送伝票番号\n1001,\n".as_bytes())
            .unwrap();
        assert!(!failed.is_success());

        let ok = importer
            .import_bytes(None, "csv", "注文番号,配送伝票番号\n1001,YT-1\n".as_bytes())
            .unwrap();
        assert!(ok.is_success());
        assert_eq!(stored(&importer).len(), 1);
    }

    #[test]
    fn test_temp_dir_is_empty_after_import() {
        let dir = TempDir::new().unwrap();
        let importer = importer(&dir);

        importer
            .import_bytes(None, "csv", "注文番号,配送伝票番号\n1001,YT-1\n".as_bytes())
            .unwrap();
        importer
            .import_bytes(None, "csv", "wrong,header\n1001,YT-1\n".as_bytes())
            .unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
