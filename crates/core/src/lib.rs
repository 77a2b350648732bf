#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod request;
pub mod task;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, FsaError, RequestError, ScanError};

// 설정
pub use config::FsaConfig;

// 요청
pub use request::{ScanRequest, ScanRequestBuilder, ScmSource, ScmType};

// 결과
pub use outcome::{
    DependencyInfo, ProjectDescriptor, ProjectsDetails, ResultEnvelope, ScanOutcome, StatusCode,
};

// 작업 trait
pub use task::{BoxFuture, ScanTask};
