//! 스캔 결과: 상태 코드, 프로젝트 기술자, 응답 봉투
//!
//! [`ScanOutcome`]은 스캔 작업의 결과이며, [`ResultEnvelope`]는
//! 클라이언트로 직렬화되는 고정 형식입니다.
//!
//! ```text
//! { "result": { "projects": [...], "details": "..." }, "status": "SUCCESS" }
//! ```
//!
//! 상태 코드는 전송 계층(HTTP) 상태와 무관하게 항상 본문에 담깁니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 스캔 결과 상태 코드
///
/// 닫힌 열거형이며, 와이어 문자열과 프로세스 코드는
/// [`StatusCode::TABLE`] 한 곳에서만 정의됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// 스캔 성공
    Success,
    /// 클라이언트 입력 또는 해석 실패
    ClientAgentFailure,
    /// 소스 저장소 연결 실패
    ConnectionFailure,
    /// 서버 측 실패 (타임아웃, 취소, 내부 오류)
    ServerFailure,
    /// 작업 디렉토리 준비 실패
    PreStepFailure,
}

impl StatusCode {
    /// (상태, 와이어 문자열, 프로세스 코드) 매핑 테이블
    pub const TABLE: [(StatusCode, &'static str, i32); 5] = [
        (StatusCode::Success, "SUCCESS", 0),
        (StatusCode::ClientAgentFailure, "CLIENT_AGENT_FAILURE", -3),
        (StatusCode::ConnectionFailure, "CONNECTION_FAILURE", -4),
        (StatusCode::ServerFailure, "SERVER_FAILURE", -5),
        (StatusCode::PreStepFailure, "PRE_STEP_FAILURE", -6),
    ];

    fn entry(self) -> (StatusCode, &'static str, i32) {
        // TABLE은 모든 변형을 순서대로 포함
        Self::TABLE[self as usize]
    }

    /// 와이어 문자열 (`"SUCCESS"` 등)
    pub fn as_str(self) -> &'static str {
        self.entry().1
    }

    /// 프로세스 종료 코드
    pub fn code(self) -> i32 {
        self.entry().2
    }

    /// 프로세스 코드에서 상태를 찾습니다.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(status, _, _)| *status)
    }

    /// 성공 여부
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 해석된 의존성 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInfo {
    /// 아티팩트 이름
    pub name: String,
    /// 버전 (알 수 없으면 빈 문자열)
    pub version: String,
    /// 생태계 (`npm`, `cargo`, `binary` 등)
    pub ecosystem: String,
    /// Package URL
    pub purl: String,
    /// 체크섬 (형식은 생태계마다 다름: Cargo는 SHA-256 hex, npm은 SRI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// 스캔 루트 기준 파일 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_path: Option<String>,
    /// 직접 의존성 이름 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// 논리적 프로젝트 루트 하나에 대한 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    /// 프로젝트 이름
    pub name: String,
    /// 스캔 트리 기준 상대 경로 (`.`이면 최상위)
    pub root: String,
    /// 프로젝트 버전 (최상위 루트에만 설정)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// 의존성 목록 (순서 무의미)
    pub dependencies: Vec<DependencyInfo>,
}

impl ProjectDescriptor {
    /// 의존성 수
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }
}

/// 스캔 작업 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// 성공: 발견된 프로젝트 (비어 있을 수 있음)
    Success(Vec<ProjectDescriptor>),
    /// 실패: 상태와 사유
    Failure {
        /// 실패 상태 (Success가 아님)
        status: StatusCode,
        /// 사람이 읽을 수 있는 사유
        message: String,
    },
}

impl ScanOutcome {
    /// 실패 결과를 생성합니다.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Failure {
            status,
            message: message.into(),
        }
    }

    /// 작업 시간 초과 결과
    pub fn timeout() -> Self {
        Self::failure(StatusCode::ServerFailure, "timeout")
    }

    /// 취소 결과
    pub fn cancelled() -> Self {
        Self::failure(StatusCode::ServerFailure, "scan cancelled")
    }

    /// 결과 상태 코드
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::Success,
            Self::Failure { status, .. } => *status,
        }
    }

    /// 성공 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// 발견된 프로젝트 (실패 시 빈 슬라이스)
    pub fn projects(&self) -> &[ProjectDescriptor] {
        match self {
            Self::Success(projects) => projects,
            Self::Failure { .. } => &[],
        }
    }
}

/// 응답 봉투의 `result` 필드
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectsDetails {
    /// 발견된 프로젝트
    pub projects: Vec<ProjectDescriptor>,
    /// 실패 사유 (성공 시 빈 문자열)
    #[serde(default)]
    pub details: String,
}

/// 클라이언트 응답 봉투
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// 프로젝트 및 세부 정보
    pub result: ProjectsDetails,
    /// 결과 상태
    pub status: StatusCode,
}

impl ResultEnvelope {
    /// 실패 봉투를 생성합니다.
    pub fn failure(status: StatusCode, details: impl Into<String>) -> Self {
        Self {
            result: ProjectsDetails {
                projects: Vec::new(),
                details: details.into(),
            },
            status,
        }
    }

    /// JSON 바이트로 직렬화합니다.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// JSON 바이트에서 역직렬화합니다.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl From<ScanOutcome> for ResultEnvelope {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Success(projects) => Self {
                result: ProjectsDetails {
                    projects,
                    details: String::new(),
                },
                status: StatusCode::Success,
            },
            ScanOutcome::Failure { status, message } => Self::failure(status, message),
        }
    }
}
