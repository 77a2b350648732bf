//! 의존성 해석기 (package-lock.json, Cargo.lock, 바이너리 아카이브)
//!
//! [`DependencyResolver`] trait은 각 파일 형식의 해석기가 구현해야 하는 인터페이스입니다.
//! [`ResolverSet`]은 등록된 해석기 중 파일을 처리할 수 있는 것을 찾습니다.
//!
//! # 지원 형식
//!
//! - `package-lock.json` (JSON) -- [`NpmLockResolver`]
//! - `Cargo.lock` (TOML) -- [`CargoLockResolver`]
//! - `.jar`, `.whl`, `.nupkg` 등 아카이브 -- [`ArchiveFingerprinter`]
//!
//! # 확장
//!
//! 새로운 형식을 지원하려면 `DependencyResolver` trait을 구현하고
//! `ResolverSet::with_resolver`로 등록합니다.

pub mod archive;
pub mod cargo;
pub mod npm;

use std::fmt;
use std::path::Path;

use fsa_core::outcome::DependencyInfo;

use crate::error::ScannerError;

pub use archive::ArchiveFingerprinter;
pub use cargo::CargoLockResolver;
pub use npm::NpmLockResolver;

/// 패키지 생태계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    /// Rust (crates.io)
    Cargo,
    /// JavaScript (npm)
    Npm,
    /// Java 아카이브 (jar/war/ear/aar)
    Maven,
    /// Python wheel
    Pypi,
    /// Ruby gem
    Gem,
    /// .NET 패키지
    Nuget,
    /// 기타 바이너리
    Generic,
}

impl Ecosystem {
    /// 생태계 이름 (결과 및 메트릭 레이블에 사용)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Npm => "npm",
            Self::Maven => "maven",
            Self::Pypi => "pypi",
            Self::Gem => "gem",
            Self::Nuget => "nuget",
            Self::Generic => "generic",
        }
    }

    /// Package URL 타입
    ///
    /// 예: Cargo -> "pkg:cargo/", Npm -> "pkg:npm/"
    pub fn purl_type(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이름과 버전으로 PURL을 생성합니다.
pub fn make_purl(ecosystem: Ecosystem, name: &str, version: &str) -> String {
    format!("pkg:{}/{}@{}", ecosystem.purl_type(), name, version)
}

/// 의존성 해석기 trait
pub trait DependencyResolver: Send + Sync {
    /// 해석기 이름 (로그용)
    fn name(&self) -> &str;

    /// 주어진 경로의 파일을 이 해석기가 처리할 수 있는지 확인합니다.
    ///
    /// 파일 이름 패턴으로 판별합니다 (예: "Cargo.lock", "*.jar").
    fn can_resolve(&self, path: &Path) -> bool;

    /// 파일 내용을 해석하여 의존성 목록을 반환합니다.
    ///
    /// # Arguments
    ///
    /// - `content`: 파일 내용
    /// - `source_path`: 스캔 루트 기준 파일 경로 (에러 메시지 및 `systemPath`용)
    fn resolve(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<Vec<DependencyInfo>, ScannerError>;
}

/// 등록된 해석기 목록
pub struct ResolverSet {
    resolvers: Vec<Box<dyn DependencyResolver>>,
}

impl ResolverSet {
    /// 해석기가 없는 빈 목록을 생성합니다.
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// 해석기를 추가합니다.
    pub fn with_resolver(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// 경로를 처리할 수 있는 첫 번째 해석기를 찾습니다.
    pub fn find(&self, path: &Path) -> Option<&dyn DependencyResolver> {
        self.resolvers
            .iter()
            .find(|r| r.can_resolve(path))
            .map(|r| r.as_ref())
    }

    /// 경로가 인식되는 파일인지 확인합니다.
    pub fn recognizes(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    /// 등록된 해석기 이름 목록
    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }
}

impl Default for ResolverSet {
    fn default() -> Self {
        Self::empty()
            .with_resolver(NpmLockResolver)
            .with_resolver(CargoLockResolver)
            .with_resolver(ArchiveFingerprinter)
    }
}

/// UTF-8 텍스트로 변환합니다.
pub(crate) fn utf8<'a>(content: &'a [u8], source_path: &str) -> Result<&'a str, ScannerError> {
    std::str::from_utf8(content).map_err(|e| ScannerError::Resolve {
        path: source_path.to_owned(),
        reason: format!("not valid UTF-8: {e}"),
    })
}
