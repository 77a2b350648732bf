//! 파일 탐색: include/exclude glob 필터와 지연 디렉토리 순회
//!
//! [`FileFilter`]는 스캔 루트 기준 상대 경로에 glob 패턴을 적용하고,
//! [`SourceWalker`]는 필터를 통과한 파일을 지연 iterator로 돌려줍니다.
//! 순회는 호출마다 새로 시작하며 결과를 미리 모으지 않습니다.
//! 취소 토큰이 주어지면 필터와 무관하게 항목마다 확인하여 즉시 멈춥니다.
//!
//! # 패턴 규칙
//!
//! - include가 비어 있으면 모든 파일이 대상입니다.
//! - `*`는 경로 구분자를 넘지 않고, `**`는 0개 이상의 디렉토리에 매칭됩니다.
//! - `/`가 없는 패턴(`*.jar`)은 모든 깊이에서 매칭됩니다.
//! - `.git`, `.svn`, `.hg` 디렉토리는 순회하지 않습니다.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::ScannerError;

/// 순회하지 않는 VCS 메타데이터 디렉토리
const VCS_DIRS: [&str; 3] = [".git", ".svn", ".hg"];

/// include/exclude glob 필터
#[derive(Debug, Clone)]
pub struct FileFilter {
    includes: Option<GlobSet>,
    excludes: GlobSet,
}

impl FileFilter {
    /// 패턴 목록으로 필터를 생성합니다.
    ///
    /// # Errors
    ///
    /// 패턴이 잘못되면 `ScannerError::Pattern`
    pub fn new(
        includes: &[String],
        excludes: &[String],
        case_sensitive: bool,
    ) -> Result<Self, ScannerError> {
        let includes = if includes.is_empty() {
            None
        } else {
            Some(build_set(includes, case_sensitive)?)
        };
        let excludes = build_set(excludes, case_sensitive)?;
        Ok(Self { includes, excludes })
    }

    /// 모든 파일을 통과시키는 필터
    pub fn match_all() -> Self {
        Self {
            includes: None,
            excludes: GlobSet::empty(),
        }
    }

    /// 상대 경로가 필터를 통과하는지 확인합니다.
    pub fn is_match(&self, relative: &Path) -> bool {
        let included = self
            .includes
            .as_ref()
            .is_none_or(|set| set.is_match(relative));
        included && !self.excludes.is_match(relative)
    }
}

fn build_set(patterns: &[String], case_sensitive: bool) -> Result<GlobSet, ScannerError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let normalized = pattern.trim().replace('\\', "/");
        let normalized = normalized.trim_start_matches("./");
        builder.add(compile(normalized, pattern, case_sensitive)?);

        // 디렉토리 구분이 없는 패턴은 모든 깊이에서 매칭
        if !normalized.contains('/') {
            builder.add(compile(&format!("**/{normalized}"), pattern, case_sensitive)?);
        }
    }
    builder.build().map_err(|e| ScannerError::Pattern {
        pattern: patterns.join(","),
        reason: e.to_string(),
    })
}

fn compile(
    glob: &str,
    original: &str,
    case_sensitive: bool,
) -> Result<globset::Glob, ScannerError> {
    GlobBuilder::new(glob)
        .case_insensitive(!case_sensitive)
        .literal_separator(true)
        .build()
        .map_err(|e| ScannerError::Pattern {
            pattern: original.to_owned(),
            reason: e.kind().to_string(),
        })
}

/// 필터를 통과한 파일 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// 절대 경로
    pub path: PathBuf,
    /// 스캔 루트 기준 상대 경로
    pub relative: PathBuf,
    /// 파일 크기 (바이트)
    pub size: u64,
}

impl WalkedFile {
    /// `/` 구분자를 사용한 상대 경로 문자열
    pub fn relative_str(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// 스캔 루트 순회기
#[derive(Debug, Clone)]
pub struct SourceWalker {
    root: PathBuf,
    filter: FileFilter,
    follow_symlinks: bool,
    max_file_size: u64,
    cancel: Option<CancellationToken>,
}

impl SourceWalker {
    /// 새 순회기를 생성합니다.
    pub fn new(root: impl Into<PathBuf>, filter: FileFilter) -> Self {
        Self {
            root: root.into(),
            filter,
            follow_symlinks: false,
            max_file_size: u64::MAX,
            cancel: None,
        }
    }

    /// 심볼릭 링크 추적 여부를 설정합니다.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// 최대 파일 크기를 설정합니다. 더 큰 파일은 경고 후 건너뜁니다.
    pub fn max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    /// 취소 토큰을 연결합니다. 취소되면 순회가 다음 항목에서 끝납니다.
    ///
    /// 끝난 순회가 완료인지 취소인지는 호출자가 토큰으로 구분해야 합니다.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 스캔 루트
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 필터를 통과한 파일을 지연 순회합니다 (동기 I/O).
    ///
    /// `tokio::task::spawn_blocking` 내에서 호출되어야 합니다.
    /// 읽을 수 없는 항목은 경고 후 건너뜁니다.
    pub fn files(&self) -> impl Iterator<Item = WalkedFile> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_vcs_dir(entry))
            // 매칭되지 않는 항목도 여기서 확인
            .take_while(move |_| !self.is_cancelled())
            .filter_map(move |entry| match entry {
                Ok(entry) => self.accept(entry),
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "failed to read directory entry, skipping");
                    None
                }
            })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn accept(&self, entry: DirEntry) -> Option<WalkedFile> {
        if !entry.file_type().is_file() {
            return None;
        }

        let relative = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();
        if !self.filter.is_match(&relative) {
            return None;
        }

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "failed to read file metadata, skipping");
                return None;
            }
        };

        if size > self.max_file_size {
            warn!(
                path = %relative.display(),
                size,
                max = self.max_file_size,
                "file too large, skipping"
            );
            return None;
        }

        debug!(path = %relative.display(), size, "file matched");
        Some(WalkedFile {
            path: entry.into_path(),
            relative,
            size,
        })
    }
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| VCS_DIRS.contains(&name))
}
