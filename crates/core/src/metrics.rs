//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `fsa_`
//! - 구성 요소: `executor_`, `scanner_`, `http_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(fsa_core::metrics::EXECUTOR_SCANS_SUBMITTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 상태 레이블 키 (SUCCESS, CONNECTION_FAILURE, ...)
pub const LABEL_STATUS: &str = "status";

/// 에코시스템 레이블 키 (npm, cargo, binary)
pub const LABEL_ECOSYSTEM: &str = "ecosystem";

/// HTTP 경로 레이블 키
pub const LABEL_ROUTE: &str = "route";

/// SCM 유형 레이블 키 (git, svn, ...)
pub const LABEL_SCM: &str = "scm";

// ─── Executor 메트릭 ────────────────────────────────────────────────

/// Executor: 제출된 스캔 수 (counter)
pub const EXECUTOR_SCANS_SUBMITTED_TOTAL: &str = "fsa_executor_scans_submitted_total";

/// Executor: 용량 초과로 거부된 스캔 수 (counter)
pub const EXECUTOR_SCANS_REJECTED_TOTAL: &str = "fsa_executor_scans_rejected_total";

/// Executor: 완료된 스캔 수 (counter, label: status)
pub const EXECUTOR_SCANS_COMPLETED_TOTAL: &str = "fsa_executor_scans_completed_total";

/// Executor: 시간 초과된 스캔 수 (counter)
pub const EXECUTOR_SCANS_TIMED_OUT_TOTAL: &str = "fsa_executor_scans_timed_out_total";

/// Executor: 패닉으로 종료된 스캔 수 (counter)
pub const EXECUTOR_SCANS_PANICKED_TOTAL: &str = "fsa_executor_scans_panicked_total";

/// Executor: 스캔 소요 시간 (histogram, 초)
pub const EXECUTOR_SCAN_DURATION_SECONDS: &str = "fsa_executor_scan_duration_seconds";

/// Executor: 실행 중인 스캔 수 (gauge)
pub const EXECUTOR_ACTIVE_SCANS: &str = "fsa_executor_active_scans";

/// Executor: 슬롯 대기 중인 스캔 수 (gauge)
pub const EXECUTOR_QUEUED_SCANS: &str = "fsa_executor_queued_scans";

// ─── Scanner 메트릭 ─────────────────────────────────────────────────

/// Scanner: 해석된 프로젝트 수 (counter)
pub const SCANNER_PROJECTS_RESOLVED_TOTAL: &str = "fsa_scanner_projects_resolved_total";

/// Scanner: 해석된 의존성 수 (counter, label: ecosystem)
pub const SCANNER_DEPENDENCIES_RESOLVED_TOTAL: &str = "fsa_scanner_dependencies_resolved_total";

/// Scanner: 해석 실패한 프로젝트 루트 수 (counter)
pub const SCANNER_ROOT_FAILURES_TOTAL: &str = "fsa_scanner_root_failures_total";

/// Scanner: 소스 가져오기 실패 수 (counter, label: scm)
pub const SCANNER_FETCH_FAILURES_TOTAL: &str = "fsa_scanner_fetch_failures_total";

/// Scanner: 소스 가져오기 소요 시간 (histogram, 초)
pub const SCANNER_FETCH_DURATION_SECONDS: &str = "fsa_scanner_fetch_duration_seconds";

/// Scanner: 검사한 파일 수 (counter)
pub const SCANNER_FILES_WALKED_TOTAL: &str = "fsa_scanner_files_walked_total";

// ─── HTTP 메트릭 ────────────────────────────────────────────────────

/// HTTP: 처리한 요청 수 (counter, label: route)
pub const HTTP_REQUESTS_TOTAL: &str = "fsa_http_requests_total";

/// HTTP: 잘못된 입력으로 거부된 분석 요청 수 (counter)
pub const HTTP_INVALID_REQUESTS_TOTAL: &str = "fsa_http_invalid_requests_total";

/// HTTP: 열린 연결 수 (gauge)
pub const HTTP_OPEN_CONNECTIONS: &str = "fsa_http_open_connections";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스캔 소요 시간 히스토그램 버킷 (초)
///
/// 100ms ~ 30분 범위 (clone + 해석 포함)
pub const SCAN_DURATION_BUCKETS: [f64; 11] = [
    0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `fsa-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Executor
    describe_counter!(
        EXECUTOR_SCANS_SUBMITTED_TOTAL,
        "Total number of scans admitted by the executor"
    );
    describe_counter!(
        EXECUTOR_SCANS_REJECTED_TOTAL,
        "Total number of scans rejected because the executor was saturated"
    );
    describe_counter!(
        EXECUTOR_SCANS_COMPLETED_TOTAL,
        "Total number of scans completed, by outcome status"
    );
    describe_counter!(
        EXECUTOR_SCANS_TIMED_OUT_TOTAL,
        "Total number of scans cancelled after exceeding the task budget"
    );
    describe_counter!(
        EXECUTOR_SCANS_PANICKED_TOTAL,
        "Total number of scans that panicked"
    );
    describe_histogram!(
        EXECUTOR_SCAN_DURATION_SECONDS,
        "Wall-clock time of a single scan in seconds"
    );
    describe_gauge!(EXECUTOR_ACTIVE_SCANS, "Number of scans holding a slot");
    describe_gauge!(
        EXECUTOR_QUEUED_SCANS,
        "Number of admitted scans waiting for a slot"
    );

    // Scanner
    describe_counter!(
        SCANNER_PROJECTS_RESOLVED_TOTAL,
        "Total number of project roots resolved"
    );
    describe_counter!(
        SCANNER_DEPENDENCIES_RESOLVED_TOTAL,
        "Total number of dependencies resolved, by ecosystem"
    );
    describe_counter!(
        SCANNER_ROOT_FAILURES_TOTAL,
        "Total number of project roots that failed to resolve"
    );
    describe_counter!(
        SCANNER_FETCH_FAILURES_TOTAL,
        "Total number of failed source control fetches"
    );
    describe_histogram!(
        SCANNER_FETCH_DURATION_SECONDS,
        "Time to fetch a source tree in seconds"
    );
    describe_counter!(
        SCANNER_FILES_WALKED_TOTAL,
        "Total number of files matched by the include/exclude filter"
    );

    // HTTP
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests by route");
    describe_counter!(
        HTTP_INVALID_REQUESTS_TOTAL,
        "Total number of analyze requests rejected as invalid input"
    );
    describe_gauge!(HTTP_OPEN_CONNECTIONS, "Number of open client connections");
}
