// ==========================================
// 配送单号 CSV 导入 - 上传文件暂存
// ==========================================
// 职责: 将上传内容保存到临时目录（upload_<uuid>.<ext>）
// 生命周期: 守卫对象 Drop 时删除文件；删除失败只记日志
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

// ==========================================
// TempUpload - 暂存的上传文件
// ==========================================
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    original_name: Option<String>,
}

impl TempUpload {
    /// 保存上传字节
    ///
    /// # 参数
    /// - dir: 临时目录（不存在时创建）
    /// - extension: 客户端文件扩展名（任意，只保留字母数字）
    /// - bytes: 上传内容
    pub fn store_bytes(dir: &Path, extension: &str, bytes: &[u8]) -> ImportResult<Self> {
        let path = Self::allocate_path(dir, extension)?;
        fs::write(&path, bytes).map_err(|e| {
            ImportError::UploadStorageError(format!("{}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), size = bytes.len(), "上传文件已暂存");

        Ok(Self {
            path,
            original_name: None,
        })
    }

    /// 复制本地文件作为上传内容
    pub fn store_file(dir: &Path, source: &Path) -> ImportResult<Self> {
        if !source.is_file() {
            return Err(ImportError::FileNotFound(source.display().to_string()));
        }

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let path = Self::allocate_path(dir, extension)?;
        let size = fs::copy(source, &path).map_err(|e| {
            ImportError::UploadStorageError(format!("{}: {}", path.display(), e))
        })?;
        debug!(source = %source.display(), path = %path.display(), size, "上传文件已暂存");

        Ok(Self {
            path,
            original_name: source
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
        })
    }

    fn allocate_path(dir: &Path, extension: &str) -> ImportResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| {
            ImportError::UploadStorageError(format!("{}: {}", dir.display(), e))
        })?;

        let ext: String = extension
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(16)
            .collect::<String>()
            .to_ascii_lowercase();
        let mut file_name = format!("upload_{}", Uuid::new_v4().simple());
        if !ext.is_empty() {
            file_name.push('.');
            file_name.push_str(&ext);
        }
        Ok(dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 客户端原始文件名（从本地文件暂存时可用）
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "暂存上传文件已删除"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            // 删除失败不影响导入结果
            Err(e) => warn!(path = %self.path.display(), error = %e, "暂存上传文件删除失败"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_bytes_and_cleanup_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = {
            let upload = TempUpload::store_bytes(dir.path(), "CSV", b"a,b\n").unwrap();
            let name = upload.path().file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("upload_"));
            assert!(name.ends_with(".csv"));
            assert_eq!(fs::read(upload.path()).unwrap(), b"a,b\n");
            upload.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_store_bytes_sanitizes_extension() {
        let dir = TempDir::new().unwrap();
        let upload = TempUpload::store_bytes(dir.path(), "../tx t", b"").unwrap();
        assert!(upload.path().to_string_lossy().ends_with(".txt"));
        assert_eq!(upload.path().parent().unwrap(), dir.path());
    }

    #[test]
    fn test_store_file_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = TempUpload::store_file(dir.path(), Path::new("no/such/file.csv")).unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }

    #[test]
    fn test_drop_tolerates_already_removed_file() {
        let dir = TempDir::new().unwrap();
        let upload = TempUpload::store_bytes(dir.path(), "csv", b"x").unwrap();
        fs::remove_file(upload.path()).unwrap();
        drop(upload);
    }
}
