//! 스캐너 에러 타입
//!
//! [`ScannerError`]는 스캔 작업 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! 스캔 작업 경계에서 [`ScannerError::into_outcome`]으로 [`ScanOutcome`]에 접히며,
//! `From<ScannerError> for FsaError` 구현으로 상위 에러 타입으로도 전파됩니다.
//!
//! # 상태 코드 매핑
//!
//! - **CONNECTION_FAILURE**: `Fetch`, `FetchTimeout`
//! - **PRE_STEP_FAILURE**: `PreStep`
//! - **SERVER_FAILURE**: `Cancelled`, `Internal`, `Config`
//! - **CLIENT_AGENT_FAILURE**: 나머지 (입력 경로, 패턴, 해석 실패)

use fsa_core::error::{ConfigError, FsaError, ScanError};
use fsa_core::outcome::{ScanOutcome, StatusCode};

/// 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// 소스 저장소 가져오기 실패
    #[error("failed to fetch {scm} repository: {reason}")]
    Fetch {
        /// SCM 유형
        scm: String,
        /// 실패 사유
        reason: String,
    },

    /// 소스 저장소 가져오기 시간 초과
    #[error("fetch timed out after {secs}s")]
    FetchTimeout {
        /// 제한 시간 (초)
        secs: u64,
    },

    /// 작업 디렉토리 준비 실패
    #[error("failed to prepare checkout directory: {0}")]
    PreStep(String),

    /// 스캔 대상 디렉토리가 없거나 디렉토리가 아님
    #[error("scan directory not found: {path}")]
    SourceMissing {
        /// 요청된 경로
        path: String,
    },

    /// 잘못된 glob 패턴
    #[error("invalid glob pattern '{pattern}': {reason}")]
    Pattern {
        /// 패턴 문자열
        pattern: String,
        /// 실패 사유
        reason: String,
    },

    /// 매니페스트/아카이브 해석 실패
    #[error("failed to resolve {path}: {reason}")]
    Resolve {
        /// 파일 경로 (스캔 루트 기준)
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 모든 프로젝트 루트 해석 실패
    #[error("none of {roots} project roots could be resolved (last error: {last_error})")]
    NoProjectResolved {
        /// 시도한 루트 수
        roots: usize,
        /// 마지막 에러 메시지
        last_error: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 취소됨
    #[error("scan cancelled")]
    Cancelled,

    /// 내부 작업 실패 (blocking 작업 패닉 등)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScannerError {
    /// 이 에러에 대응하는 결과 상태 코드를 반환합니다.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Fetch { .. } | Self::FetchTimeout { .. } => StatusCode::ConnectionFailure,
            Self::PreStep(_) => StatusCode::PreStepFailure,
            Self::Cancelled | Self::Internal(_) | Self::Config { .. } => StatusCode::ServerFailure,
            Self::SourceMissing { .. }
            | Self::Pattern { .. }
            | Self::Resolve { .. }
            | Self::NoProjectResolved { .. }
            | Self::Io { .. } => StatusCode::ClientAgentFailure,
        }
    }

    /// 에러를 실패 결과로 변환합니다.
    pub fn into_outcome(self) -> ScanOutcome {
        match self {
            Self::Cancelled => ScanOutcome::cancelled(),
            other => ScanOutcome::failure(other.status_code(), other.to_string()),
        }
    }
}

impl From<ScannerError> for FsaError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::Fetch { .. } | ScannerError::FetchTimeout { .. } => {
                FsaError::Scan(ScanError::Fetch(err.to_string()))
            }
            ScannerError::PreStep(msg) => FsaError::Scan(ScanError::PreStep(msg)),
            ScannerError::Cancelled => FsaError::Scan(ScanError::Cancelled),
            ScannerError::Config { field, reason } => {
                FsaError::Config(ConfigError::InvalidValue { field, reason })
            }
            ScannerError::Io { source, .. } => FsaError::Io(source),
            other => FsaError::Scan(ScanError::Resolution(other.to_string())),
        }
    }
}
