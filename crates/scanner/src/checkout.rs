//! 체크아웃 디렉토리: 스캔 작업마다 고유한 임시 디렉토리
//!
//! [`Checkout`]이 drop되면 디렉토리와 그 안의 모든 파일이 삭제됩니다.
//! 스캔 작업이 정상 종료하든, 실패하든, 취소되어 future가 drop되든
//! 같은 경로로 정리됩니다.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ScannerError;

/// 체크아웃 디렉토리 이름 접두사
pub const CHECKOUT_PREFIX: &str = "fsa-scan-";

/// 스캔 작업 전용 임시 디렉토리
#[derive(Debug)]
pub struct Checkout {
    id: Uuid,
    dir: TempDir,
}

impl Checkout {
    /// 새 체크아웃 디렉토리를 생성합니다 (동기 I/O).
    ///
    /// `parent`가 `None`이면 시스템 임시 디렉토리 아래에 생성합니다.
    ///
    /// # Errors
    ///
    /// 디렉토리를 만들 수 없으면 `ScannerError::PreStep`
    pub fn create(parent: Option<&Path>) -> Result<Self, ScannerError> {
        let id = Uuid::new_v4();
        let parent: PathBuf = match parent {
            Some(p) => p.to_path_buf(),
            None => std::env::temp_dir(),
        };

        let dir = tempfile::Builder::new()
            .prefix(&format!("{CHECKOUT_PREFIX}{id}-"))
            .tempdir_in(&parent)
            .map_err(|e| {
                ScannerError::PreStep(format!("{}: {e}", parent.display()))
            })?;

        debug!(checkout_id = %id, path = %dir.path().display(), "checkout directory created");
        Ok(Self { id, dir })
    }

    /// 체크아웃 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 체크아웃 경로
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 디렉토리를 즉시 삭제하고 실패를 보고합니다.
    pub fn close(self) -> Result<(), ScannerError> {
        let id = self.id;
        let path = self.dir.path().display().to_string();
        self.dir.close().map_err(|e| {
            warn!(checkout_id = %id, path = %path, error = %e, "failed to remove checkout directory");
            ScannerError::Io { path, source: e }
        })?;
        debug!(checkout_id = %id, "checkout directory removed");
        Ok(())
    }
}
