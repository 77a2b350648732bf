//! 스캐너 설정
//!
//! [`ScannerConfig`]는 core의 [`ScannerSection`](fsa_core::config::ScannerSection)에서
//! 만들어지며, 스캔 작업이 사용하는 경로와 제한값을 담습니다.
//!
//! # 사용 예시
//!
//! ```
//! use fsa_scanner::{ScannerConfig, ScannerConfigBuilder};
//!
//! let config = ScannerConfig::default();
//! config.validate().unwrap();
//!
//! let config = ScannerConfigBuilder::new()
//!     .git_program("/usr/bin/git")
//!     .fetch_timeout_secs(120)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.fetch_timeout().as_secs(), 120);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScannerError;

/// 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 체크아웃 디렉토리의 상위 경로 (`None`이면 시스템 임시 디렉토리)
    pub checkout_parent: Option<PathBuf>,
    /// git 클라이언트 실행 파일
    pub git_program: String,
    /// svn 클라이언트 실행 파일
    pub svn_program: String,
    /// 소스 가져오기 제한 시간 (초)
    pub fetch_timeout_secs: u64,
    /// 해석할 파일의 최대 크기 (바이트)
    pub max_file_size: u64,
    /// 스캔당 최대 프로젝트 루트 수
    pub max_projects: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            checkout_parent: None,
            git_program: "git".to_owned(),
            svn_program: "svn".to_owned(),
            fetch_timeout_secs: 600,
            max_file_size: 50 * 1024 * 1024, // 50 MB
            max_projects: 10_000,
        }
    }
}

/// 설정 상한값 상수
const MAX_FETCH_TIMEOUT_SECS: u64 = 86_400; // 1 day
const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024; // 1 GB
const MAX_PROJECTS_LIMIT: usize = 1_000_000;

impl ScannerConfig {
    /// core의 `ScannerSection`에서 스캐너 설정을 생성합니다.
    pub fn from_core(core: &fsa_core::config::ScannerSection) -> Self {
        let checkout_parent = if core.checkout_parent.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&core.checkout_parent))
        };

        Self {
            checkout_parent,
            git_program: core.git_program.clone(),
            svn_program: core.svn_program.clone(),
            fetch_timeout_secs: core.fetch_timeout_secs,
            max_file_size: core.max_file_size,
            max_projects: core.max_projects,
        }
    }

    /// 소스 가져오기 제한 시간
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `git_program`, `svn_program`: 비어있으면 안 됨
    /// - `fetch_timeout_secs`: 1-86400
    /// - `max_file_size`: 1-1073741824 (1GB)
    /// - `max_projects`: 1-1000000
    /// - `checkout_parent`: `..` 컴포넌트 금지
    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.git_program.trim().is_empty() {
            return Err(config_error("git_program", "must not be empty"));
        }

        if self.svn_program.trim().is_empty() {
            return Err(config_error("svn_program", "must not be empty"));
        }

        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(config_error(
                "fetch_timeout_secs",
                &format!("must be 1-{MAX_FETCH_TIMEOUT_SECS}"),
            ));
        }

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(config_error(
                "max_file_size",
                &format!("must be 1-{MAX_FILE_SIZE}"),
            ));
        }

        if self.max_projects == 0 || self.max_projects > MAX_PROJECTS_LIMIT {
            return Err(config_error(
                "max_projects",
                &format!("must be 1-{MAX_PROJECTS_LIMIT}"),
            ));
        }

        if let Some(ref parent) = self.checkout_parent
            && parent
                .components()
                .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(config_error(
                "checkout_parent",
                "contains path traversal pattern '..'",
            ));
        }

        Ok(())
    }
}

fn config_error(field: &str, reason: &str) -> ScannerError {
    ScannerError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// [`ScannerConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 체크아웃 상위 디렉토리를 설정합니다.
    pub fn checkout_parent(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.checkout_parent = Some(path.into());
        self
    }

    /// git 실행 파일을 설정합니다.
    pub fn git_program(mut self, program: impl Into<String>) -> Self {
        self.config.git_program = program.into();
        self
    }

    /// svn 실행 파일을 설정합니다.
    pub fn svn_program(mut self, program: impl Into<String>) -> Self {
        self.config.svn_program = program.into();
        self
    }

    /// 가져오기 제한 시간(초)을 설정합니다.
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// 최대 파일 크기(바이트)를 설정합니다.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 최대 프로젝트 루트 수를 설정합니다.
    pub fn max_projects(mut self, max: usize) -> Self {
        self.config.max_projects = max;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `ScannerError::Config` 반환
    pub fn build(self) -> Result<ScannerConfig, ScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
