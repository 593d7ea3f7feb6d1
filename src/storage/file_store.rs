//! 代码文件存储
//!
//! 上传的代码文件保存在 `upload.dir` 下，提交记录只保存相对路径。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::errors::{HWSystemError, Result};

#[async_trait]
pub trait FileStore: Send + Sync {
    /// 读取文件内容，文件不存在时返回 `NotFound`
    async fn read_to_string(&self, path: &str) -> Result<String>;
}

/// 本地磁盘文件存储
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config() -> Self {
        Self::new(&AppConfig::get().upload.dir)
    }

    /// 解析相对路径，拒绝跳出存储根目录的路径
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || path.is_empty() {
            return Err(HWSystemError::validation(format!("非法的文件路径: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_to_string(&self, path: &str) -> Result<String> {
        let full_path = self.resolve(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HWSystemError::not_found(format!("文件不存在: {path}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hwsystem-file-store-{name}-{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_read_existing_file() {
        let root = temp_root("read");
        std::fs::write(root.join("main.py"), "print('hi')\n").unwrap();

        let store = LocalFileStore::new(&root);
        let content = store.read_to_string("main.py").await.unwrap();
        assert_eq!(content, "print('hi')\n");

        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let root = temp_root("missing");
        let store = LocalFileStore::new(&root);

        let err = store.read_to_string("nope.rs").await.unwrap_err();
        assert!(matches!(err, HWSystemError::NotFound(_)));

        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let store = LocalFileStore::new(temp_root("escape"));

        for path in ["../etc/passwd", "/etc/passwd", ""] {
            let err = store.read_to_string(path).await.unwrap_err();
            assert!(matches!(err, HWSystemError::Validation(_)), "{path}");
        }
    }
}
