//! 바이너리 아카이브 지문 해석기
//!
//! [`ArchiveFingerprinter`]는 아카이브 파일의 SHA-256 지문과 파일 이름에서
//! 추정한 이름/버전으로 의존성 한 건을 만듭니다.
//!
//! ```text
//! lib/guava-31.1-jre.jar  ->  name "guava", version "31.1-jre", ecosystem "maven"
//! ```

use std::path::Path;

use sha2::{Digest, Sha256};

use fsa_core::outcome::DependencyInfo;

use crate::error::ScannerError;
use crate::resolver::{DependencyResolver, Ecosystem};

/// 확장자별 생태계
const ARCHIVE_EXTENSIONS: [(&str, Ecosystem); 9] = [
    ("jar", Ecosystem::Maven),
    ("war", Ecosystem::Maven),
    ("ear", Ecosystem::Maven),
    ("aar", Ecosystem::Maven),
    ("whl", Ecosystem::Pypi),
    ("gem", Ecosystem::Gem),
    ("nupkg", Ecosystem::Nuget),
    ("dll", Ecosystem::Generic),
    ("tgz", Ecosystem::Npm),
];

/// 아카이브 지문 해석기
pub struct ArchiveFingerprinter;

impl ArchiveFingerprinter {
    /// 경로의 확장자로 생태계를 찾습니다 (대소문자 구분 없음).
    pub fn ecosystem_for(path: &Path) -> Option<Ecosystem> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        ARCHIVE_EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, eco)| *eco)
    }
}

impl DependencyResolver for ArchiveFingerprinter {
    fn name(&self) -> &str {
        "archive"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        Self::ecosystem_for(path).is_some()
    }

    fn resolve(
        &self,
        content: &[u8],
        source_path: &str,
    ) -> Result<Vec<DependencyInfo>, ScannerError> {
        let path = Path::new(source_path);
        let ecosystem = Self::ecosystem_for(path).ok_or_else(|| ScannerError::Resolve {
            path: source_path.to_owned(),
            reason: "unsupported archive extension".to_owned(),
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScannerError::Resolve {
                path: source_path.to_owned(),
                reason: "archive has no file name".to_owned(),
            })?;

        let checksum = hex::encode(Sha256::digest(content));
        let (name, version) = split_name_version(stem);
        let purl = format!("pkg:generic/{name}@{version}?checksum=sha256:{checksum}");

        Ok(vec![DependencyInfo {
            name: name.to_owned(),
            version: version.to_owned(),
            ecosystem: ecosystem.to_string(),
            purl,
            checksum: Some(checksum),
            system_path: Some(source_path.to_owned()),
            dependencies: Vec::new(),
        }])
    }
}

/// `name-1.2.3` 형식의 파일 이름을 이름과 버전으로 나눕니다.
///
/// 숫자로 시작하는 첫 `-` 뒤 부분을 버전으로 봅니다. 없으면 버전은 빈 문자열입니다.
fn split_name_version(stem: &str) -> (&str, &str) {
    stem.char_indices()
        .filter(|(_, c)| *c == '-' || *c == '_')
        .map(|(i, _)| i)
        .find(|&i| {
            stem[i + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .map_or((stem, ""), |i| (&stem[..i], &stem[i + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_archive_extensions() {
        let resolver = ArchiveFingerprinter;
        assert!(resolver.can_resolve(Path::new("lib/app.jar")));
        assert!(resolver.can_resolve(Path::new("dist/pkg-1.0-py3-none-any.whl")));
        assert!(resolver.can_resolve(Path::new("bin/Newtonsoft.Json.DLL")));
        assert!(!resolver.can_resolve(Path::new("src/Main.java")));
        assert!(!resolver.can_resolve(Path::new("Makefile")));
    }

    #[test]
    fn fingerprint_is_sha256_of_content() {
        let deps = ArchiveFingerprinter
            .resolve(b"hello", "lib/guava-31.1-jre.jar")
            .unwrap();
        assert_eq!(deps.len(), 1);
        let dep = &deps[0];
        assert_eq!(
            dep.checksum.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        assert_eq!(dep.name, "guava");
        assert_eq!(dep.version, "31.1-jre");
        assert_eq!(dep.ecosystem, "maven");
        assert!(dep.purl.starts_with("pkg:generic/guava@31.1-jre?checksum=sha256:"));
        assert_eq!(dep.system_path.as_deref(), Some("lib/guava-31.1-jre.jar"));
    }

    #[test]
    fn split_name_version_cases() {
        assert_eq!(split_name_version("commons-lang3-3.12.0"), ("commons-lang3", "3.12.0"));
        assert_eq!(split_name_version("requests-2.31.0-py3-none-any"), ("requests", "2.31.0-py3-none-any"));
        assert_eq!(split_name_version("tool"), ("tool", ""));
        assert_eq!(split_name_version("my_lib_1.0"), ("my_lib", "1.0"));
    }

    #[test]
    fn ecosystem_per_extension() {
        assert_eq!(
            ArchiveFingerprinter::ecosystem_for(Path::new("a.nupkg")),
            Some(Ecosystem::Nuget)
        );
        assert_eq!(
            ArchiveFingerprinter::ecosystem_for(Path::new("a.GEM")),
            Some(Ecosystem::Gem)
        );
        assert_eq!(ArchiveFingerprinter::ecosystem_for(Path::new("a")), None);
    }
}
