//! 에러 타입: 도메인별 에러 정의

/// FSA 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum FsaError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 분석 요청 파싱/검증 에러
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// 스캔 실행 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 분석 요청 에러
///
/// 잘못된 입력은 executor 슬롯을 소비하지 않고 즉시 거부됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// JSON 형식 오류
    #[error("malformed request body: {0}")]
    Malformed(String),

    /// 필수 필드 누락
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    /// 유효하지 않은 필드 값
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

/// 스캔 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 소스 저장소 가져오기 실패
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// 의존성 해석 실패
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// 작업 디렉토리 준비 실패
    #[error("pre-step failed: {0}")]
    PreStep(String),

    /// 취소됨
    #[error("scan cancelled")]
    Cancelled,
}
