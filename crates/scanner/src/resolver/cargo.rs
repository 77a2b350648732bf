//! Cargo.lock 해석기
//!
//! [`CargoLockResolver`]는 Cargo.lock의 `[[package]]` 항목 중
//! 레지스트리/git 소스가 있는 외부 crate를 의존성으로 돌려줍니다.
//! `source`가 없는 항목은 워크스페이스 자체 crate이므로 제외합니다.

use std::path::Path;

use serde::Deserialize;

use fsa_core::outcome::DependencyInfo;

use crate::error::ScannerError;
use crate::resolver::{DependencyResolver, Ecosystem, make_purl, utf8};

/// Cargo.lock 해석기
pub struct CargoLockResolver;

#[derive(Deserialize)]
struct CargoLockFile {
    #[serde(default)]
    package: Vec<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
    version: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl DependencyResolver for CargoLockResolver {
    fn name(&self) -> &str {
        "cargo-lock"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "Cargo.lock")
    }

    fn resolve(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<Vec<DependencyInfo>, ScannerError> {
        let text = utf8(content, source_path)?;
        let lock_file: CargoLockFile = toml::from_str(text).map_err(|e| ScannerError::Resolve {
            path: source_path.to_owned(),
            reason: e.to_string(),
        })?;

        let dependencies = lock_file
            .package
            .into_iter()
            .filter(|pkg| pkg.source.is_some())
            .map(|pkg| DependencyInfo {
                purl: make_purl(Ecosystem::Cargo, &pkg.name, &pkg.version),
                ecosystem: Ecosystem::Cargo.to_string(),
                checksum: pkg.checksum,
                system_path: Some(source_path.to_owned()),
                dependencies: pkg
                    .dependencies
                    .iter()
                    .map(|d| dependency_name(d).to_owned())
                    .collect(),
                name: pkg.name,
                version: pkg.version,
            })
            .collect();

        Ok(dependencies)
    }
}

/// `"serde 1.0.204 (registry+...)"` 형식에서 crate 이름만 추출
fn dependency_name(entry: &str) -> &str {
    entry.split_whitespace().next().unwrap_or(entry)
}
