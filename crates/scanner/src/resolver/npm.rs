//! package-lock.json 해석기
//!
//! [`NpmLockResolver`]는 NPM의 package-lock.json (v2/v3) 파일에서
//! 설치된 패키지 목록을 추출합니다.
//!
//! # package-lock.json v3 형식 예시
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0" },
//!     "node_modules/lodash": { "version": "4.17.21", "resolved": "...", "integrity": "sha512-..." }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use fsa_core::outcome::DependencyInfo;

use crate::error::ScannerError;
use crate::resolver::{DependencyResolver, Ecosystem, make_purl, utf8};

/// package-lock.json 해석기
pub struct NpmLockResolver;

/// package-lock.json 구조 (파싱용)
#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default)]
    packages: HashMap<String, NpmPackageEntry>,
}

/// package-lock.json 내 개별 패키지 (파싱용)
#[derive(Deserialize)]
struct NpmPackageEntry {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    integrity: Option<String>,
    #[serde(default)]
    link: bool,
    #[serde(default)]
    dependencies: Option<HashMap<String, String>>,
}

impl DependencyResolver for NpmLockResolver {
    fn name(&self) -> &str {
        "npm-lock"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "package-lock.json")
    }

    fn resolve(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<Vec<DependencyInfo>, ScannerError> {
        let text = utf8(content, source_path)?;
        let lock_file: NpmLockFile =
            serde_json::from_str(text).map_err(|e| ScannerError::Resolve {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        let mut dependencies = Vec::new();

        for (key, entry) in lock_file.packages {
            // 루트 패키지는 키가 빈 문자열, 워크스페이스 링크는 실제 패키지가 아님
            if key.is_empty() || entry.link {
                continue;
            }

            let Some(version) = entry.version else {
                continue;
            };
            let name = extract_package_name(&key);
            let purl = make_purl(Ecosystem::Npm, &name, &version);

            let mut deps: Vec<String> = entry
                .dependencies
                .map(|d| d.into_keys().collect())
                .unwrap_or_default();
            deps.sort();

            dependencies.push(DependencyInfo {
                name,
                version,
                ecosystem: Ecosystem::Npm.to_string(),
                purl,
                checksum: entry.integrity,
                system_path: Some(source_path.to_owned()),
                dependencies: deps,
            });
        }

        // HashMap 순회 순서와 무관하게 결과를 고정
        dependencies.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(dependencies)
    }
}

/// "node_modules/@scope/name" 또는 "node_modules/name" 에서 패키지명 추출
fn extract_package_name(key: &str) -> String {
    match key.rfind("node_modules/") {
        Some(pos) => key[pos + "node_modules/".len()..].to_owned(),
        None => key.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PACKAGE_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": {
      "name": "my-app",
      "version": "1.0.0",
      "dependencies": {
        "lodash": "^4.17.21"
      }
    },
    "node_modules/lodash": {
      "version": "4.17.21",
      "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz",
      "integrity": "sha512-v2kDE..."
    },
    "node_modules/express": {
      "version": "4.18.2",
      "resolved": "https://registry.npmjs.org/express/-/express-4.18.2.tgz",
      "integrity": "sha512-abc...",
      "dependencies": {
        "accepts": "~1.3.8"
      }
    },
    "node_modules/shared": {
      "resolved": "packages/shared",
      "link": true
    }
  }
}"#;

    #[test]
    fn can_resolve_package_lock_json() {
        let resolver = NpmLockResolver;
        assert!(resolver.can_resolve(Path::new("package-lock.json")));
        assert!(resolver.can_resolve(Path::new("/project/package-lock.json")));
        assert!(!resolver.can_resolve(Path::new("Cargo.lock")));
        assert!(!resolver.can_resolve(Path::new("package.json")));
    }

    #[test]
    fn resolve_sample_package_lock() {
        let deps = NpmLockResolver
            .resolve(SAMPLE_PACKAGE_LOCK.as_bytes(), "web/package-lock.json")
            .unwrap();

        // root entry and workspace link are skipped
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "express");
        assert_eq!(deps[1].name, "lodash");

        let lodash = &deps[1];
        assert_eq!(lodash.version, "4.17.21");
        assert_eq!(lodash.ecosystem, "npm");
        assert_eq!(lodash.purl, "pkg:npm/lodash@4.17.21");
        assert!(lodash.checksum.is_some());
        assert_eq!(lodash.system_path.as_deref(), Some("web/package-lock.json"));

        assert_eq!(deps[0].dependencies, ["accepts"]);
    }

    #[test]
    fn resolve_empty_packages() {
        let deps = NpmLockResolver
            .resolve(br#"{ "packages": {} }"#, "package-lock.json")
            .unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn resolve_invalid_json_returns_error() {
        let result = NpmLockResolver.resolve(b"not json!", "package-lock.json");
        assert!(matches!(result, Err(ScannerError::Resolve { ref path, .. }) if path == "package-lock.json"));
    }

    #[test]
    fn extract_package_name_simple() {
        assert_eq!(extract_package_name("node_modules/lodash"), "lodash");
    }

    #[test]
    fn extract_package_name_scoped() {
        assert_eq!(
            extract_package_name("node_modules/@types/node"),
            "@types/node"
        );
    }

    #[test]
    fn extract_package_name_nested() {
        assert_eq!(
            extract_package_name("node_modules/express/node_modules/debug"),
            "debug"
        );
    }
}
