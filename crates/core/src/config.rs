//! 설정 관리: fsa.toml 파싱 및 런타임 설정
//!
//! [`FsaConfig`]는 서비스 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`FSA_SERVER_PORT=8181` 형식)
//! 3. 설정 파일 (`fsa.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), fsa_core::error::FsaError> {
//! use fsa_core::config::FsaConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = FsaConfig::load("fsa.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = FsaConfig::parse("[server]\nport = 9000")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FsaError};

/// FSA 통합 설정
///
/// `fsa.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FsaConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP 프론트엔드 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 스캔 executor 설정
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// 스캐너 설정
    #[serde(default)]
    pub scanner: ScannerSection,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// 설정 상한값 상수
const MAX_CONCURRENT_SCANS: usize = 10_000;
const MAX_QUEUED_SCANS: usize = 100_000;
const MAX_CONNECTIONS: usize = 100_000;
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024; // 64 MB

impl FsaConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FsaError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값 + 환경변수로 설정을 구성합니다.
    pub fn from_env() -> Result<Self, FsaError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FsaError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsaError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                FsaError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, FsaError> {
        toml::from_str(toml_str).map_err(|e| {
            FsaError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `FSA_{SECTION}_{FIELD}`
    /// 예: `FSA_EXECUTOR_MAX_CONCURRENT_SCANS=50`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "FSA_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "FSA_GENERAL_LOG_FORMAT");

        // Server
        override_string(&mut self.server.listen_addr, "FSA_SERVER_LISTEN_ADDR");
        override_u16(&mut self.server.port, "FSA_SERVER_PORT");
        override_usize(
            &mut self.server.max_connections,
            "FSA_SERVER_MAX_CONNECTIONS",
        );
        override_u32(&mut self.server.accept_backlog, "FSA_SERVER_ACCEPT_BACKLOG");
        override_usize(&mut self.server.max_body_bytes, "FSA_SERVER_MAX_BODY_BYTES");
        override_u64(
            &mut self.server.request_timeout_secs,
            "FSA_SERVER_REQUEST_TIMEOUT_SECS",
        );

        // Executor
        override_usize(
            &mut self.executor.max_concurrent_scans,
            "FSA_EXECUTOR_MAX_CONCURRENT_SCANS",
        );
        override_usize(
            &mut self.executor.max_queued_scans,
            "FSA_EXECUTOR_MAX_QUEUED_SCANS",
        );
        override_u64(
            &mut self.executor.task_timeout_secs,
            "FSA_EXECUTOR_TASK_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.executor.cancel_grace_ms,
            "FSA_EXECUTOR_CANCEL_GRACE_MS",
        );

        // Scanner
        override_string(
            &mut self.scanner.checkout_parent,
            "FSA_SCANNER_CHECKOUT_PARENT",
        );
        override_string(&mut self.scanner.git_program, "FSA_SCANNER_GIT_PROGRAM");
        override_string(&mut self.scanner.svn_program, "FSA_SCANNER_SVN_PROGRAM");
        override_u64(
            &mut self.scanner.fetch_timeout_secs,
            "FSA_SCANNER_FETCH_TIMEOUT_SECS",
        );
        override_u64(&mut self.scanner.max_file_size, "FSA_SCANNER_MAX_FILE_SIZE");
        override_usize(&mut self.scanner.max_projects, "FSA_SCANNER_MAX_PROJECTS");

        // Metrics
        override_bool(&mut self.metrics.enabled, "FSA_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "FSA_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "FSA_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), FsaError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.server.listen_addr.parse::<std::net::IpAddr>().is_err() {
            return Err(invalid(
                "server.listen_addr",
                format!("'{}' is not an IP address", self.server.listen_addr),
            ));
        }

        if self.server.max_connections == 0 || self.server.max_connections > MAX_CONNECTIONS {
            return Err(invalid(
                "server.max_connections",
                format!("must be 1-{MAX_CONNECTIONS}"),
            ));
        }

        if self.server.accept_backlog == 0 {
            return Err(invalid("server.accept_backlog", "must be at least 1".to_owned()));
        }

        if self.server.max_body_bytes == 0 || self.server.max_body_bytes > MAX_BODY_BYTES {
            return Err(invalid(
                "server.max_body_bytes",
                format!("must be 1-{MAX_BODY_BYTES}"),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(invalid(
                "server.request_timeout_secs",
                "must be at least 1".to_owned(),
            ));
        }

        if self.executor.max_concurrent_scans == 0
            || self.executor.max_concurrent_scans > MAX_CONCURRENT_SCANS
        {
            return Err(invalid(
                "executor.max_concurrent_scans",
                format!("must be 1-{MAX_CONCURRENT_SCANS}"),
            ));
        }

        // 0이면 대기열 없이 슬롯이 모두 차는 즉시 거부
        if self.executor.max_queued_scans > MAX_QUEUED_SCANS {
            return Err(invalid(
                "executor.max_queued_scans",
                format!("must be 0-{MAX_QUEUED_SCANS}"),
            ));
        }

        if self.executor.task_timeout_secs == 0 {
            return Err(invalid(
                "executor.task_timeout_secs",
                "must be at least 1".to_owned(),
            ));
        }

        if self.scanner.git_program.is_empty() {
            return Err(invalid("scanner.git_program", "must not be empty".to_owned()));
        }

        if self.scanner.svn_program.is_empty() {
            return Err(invalid("scanner.svn_program", "must not be empty".to_owned()));
        }

        if Path::new(&self.scanner.checkout_parent)
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(invalid(
                "scanner.checkout_parent",
                "contains path traversal pattern '..'".to_owned(),
            ));
        }

        if self.scanner.fetch_timeout_secs == 0 {
            return Err(invalid(
                "scanner.fetch_timeout_secs",
                "must be at least 1".to_owned(),
            ));
        }

        if self.scanner.max_file_size == 0 {
            return Err(invalid("scanner.max_file_size", "must be at least 1".to_owned()));
        }

        if self.scanner.max_projects == 0 {
            return Err(invalid("scanner.max_projects", "must be at least 1".to_owned()));
        }

        if self.metrics.enabled && self.metrics.listen_addr.parse::<std::net::IpAddr>().is_err() {
            return Err(invalid(
                "metrics.listen_addr",
                format!("'{}' is not an IP address", self.metrics.listen_addr),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> FsaError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// HTTP 프론트엔드 설정
///
/// 연결 수준 제한은 executor의 작업 제한과 독립적입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 동시 연결 최대 수
    pub max_connections: usize,
    /// accept 대기 연결 수 (listen backlog)
    pub accept_backlog: u32,
    /// 요청 본문 최대 크기 (바이트)
    pub max_body_bytes: usize,
    /// 요청당 스캔 대기 시간 (초)
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// 요청당 대기 시간을 `Duration`으로 반환합니다.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_owned(),
            port: 8181,
            max_connections: 1000,
            accept_backlog: 1024,
            max_body_bytes: 1024 * 1024, // 1 MB
            request_timeout_secs: 1800,
        }
    }
}

/// 스캔 executor 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// 동시 실행 가능한 스캔 슬롯 수
    pub max_concurrent_scans: usize,
    /// 슬롯 대기열 최대 길이
    pub max_queued_scans: usize,
    /// 스캔 작업 하나의 최대 실행 시간 (초)
    pub task_timeout_secs: u64,
    /// 취소 후 작업 종료를 기다리는 유예 시간 (밀리초)
    pub cancel_grace_ms: u64,
}

impl ExecutorConfig {
    /// 작업 실행 예산을 `Duration`으로 반환합니다.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// 취소 유예 시간을 `Duration`으로 반환합니다.
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: 200,
            max_queued_scans: 1000,
            task_timeout_secs: 1800,
            cancel_grace_ms: 5000,
        }
    }
}

/// 스캐너 설정 섹션
///
/// `fsa-scanner` 크레이트의 `ScannerConfig::from_core()`로 변환됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// 체크아웃 임시 디렉토리의 상위 경로 (비어 있으면 시스템 임시 디렉토리)
    pub checkout_parent: String,
    /// git 실행 파일
    pub git_program: String,
    /// svn 실행 파일
    pub svn_program: String,
    /// 저장소 가져오기 제한 시간 (초)
    pub fetch_timeout_secs: u64,
    /// 해석 대상 파일 최대 크기 (바이트)
    pub max_file_size: u64,
    /// 스캔당 최대 프로젝트 루트 수
    pub max_projects: usize,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            checkout_parent: String::new(),
            git_program: "git".to_owned(),
            svn_program: "svn".to_owned(),
            fetch_timeout_secs: 600,
            max_file_size: 50 * 1024 * 1024, // 50 MB
            max_projects: 10_000,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크랩 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9181,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}
