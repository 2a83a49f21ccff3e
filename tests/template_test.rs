// ==========================================
// CSV 模板导出 集成测试
// ==========================================
// 测试目标: 配置的导出编码/分隔符/表头列名生效
// ==========================================


use encoding_rs::SHIFT_JIS;
use ship_number_csv::config::{config_keys, ConfigManager, ImportConfigReader};
use ship_number_csv::importer::{CsvTemplateEmitter, ImportError, TEMPLATE_FILE_NAME};
use tempfile::TempDir;
use test_helpers::create_test_db;

#[test]
fn test_default_template_from_config() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let settings = ConfigManager::new(&db_path)
        .unwrap()
        .load_import_settings()
        .unwrap();
    let out_dir = TempDir::new().unwrap();

    let path = CsvTemplateEmitter::from_settings(&settings)
        .write_to(out_dir.path())
        .unwrap();

    assert_eq!(path.file_name().unwrap(), TEMPLATE_FILE_NAME);
    let bytes = std::fs::read(&path).unwrap();
    let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(&bytes);
    assert!(!had_errors);
    assert_eq!(text, "注文番号,配送伝票番号\n");
}

#[test]
fn test_configured_separator_encoding_and_labels() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_global_config_value(config_keys::CSV_EXPORT_SEPARATOR, ";")
        .unwrap();
    config
        .set_global_config_value(config_keys::CSV_EXPORT_ENCODING, "UTF-8")
        .unwrap();
    config
        .set_global_config_value(config_keys::CSV_HEADER_ORDER_ID, "Order No")
        .unwrap();

    let settings = config.load_import_settings().unwrap();
    let bytes = CsvTemplateEmitter::from_settings(&settings).render().unwrap();

    assert_eq!(bytes, "Order No;配送伝票番号\n".as_bytes());
    // 只有表头一行
    assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
}

#[test]
fn test_labels_not_representable_in_export_encoding() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_global_config_value(config_keys::CSV_EXPORT_ENCODING, "ISO-8859-1")
        .unwrap();

    let settings = config.load_import_settings().unwrap();
    let err = CsvTemplateEmitter::from_settings(&settings)
        .render()
        .unwrap_err();

    assert!(matches!(err, ImportError::UnmappableCharacter { .. }));
}
