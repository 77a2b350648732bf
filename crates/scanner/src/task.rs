//! 기본 스캔 작업 -- 가져오기, 탐색, 프로젝트 루트별 해석
//!
//! [`DependencyScanTask`]는 core의 [`ScanTask`] trait을 구현하여
//! executor가 요청마다 실행합니다.
//!
//! # 흐름
//!
//! ```text
//! scm?  --yes--> Checkout::create --> SourceFetcher::fetch --+
//!   |                                                         |
//!   +--no--> dependencyDirs ---------------------------------+
//!                                                             |
//!                               spawn_blocking: SourceWalker --> roots --> resolvers
//!                                                             |
//!                                                  Vec<ProjectDescriptor>
//! ```
//!
//! # 취소 지점
//!
//! 가져오기 전, 가져오기 후, 탐색 항목마다, 프로젝트 루트마다 토큰을 확인합니다.
//! 탐색은 필터에 걸리지 않는 항목에서도 멈춥니다.
//!
//! 체크아웃은 blocking 해석 단계가 끝날 때 삭제되므로, executor는 작업이
//! 반환될 때까지 슬롯을 놓지 않습니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fsa_core::metrics as m;
use fsa_core::outcome::{DependencyInfo, ProjectDescriptor, ScanOutcome};
use fsa_core::request::ScanRequest;
use fsa_core::task::{BoxFuture, ScanTask};

use crate::checkout::Checkout;
use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::fetch::{CommandFetcher, SourceFetcher};
use crate::resolver::ResolverSet;
use crate::walker::{FileFilter, SourceWalker, WalkedFile};

/// 스캔할 디렉토리 하나
#[derive(Debug, Clone)]
struct ScanTree {
    /// 디렉토리 경로
    path: PathBuf,
    /// 최상위 프로젝트 이름 (없으면 디렉토리 이름)
    name: Option<String>,
}

/// 기본 스캔 작업
///
/// 설정, 가져오기 구현, 해석기 목록을 `Arc`로 공유하므로 복제 비용이 낮습니다.
#[derive(Clone)]
pub struct DependencyScanTask {
    config: Arc<ScannerConfig>,
    fetcher: Arc<dyn SourceFetcher>,
    resolvers: Arc<ResolverSet>,
}

impl DependencyScanTask {
    /// 외부 git/svn 클라이언트와 기본 해석기로 작업을 생성합니다.
    pub fn new(config: ScannerConfig) -> Self {
        let fetcher = CommandFetcher::from_config(&config);
        Self::with_parts(config, Arc::new(fetcher), ResolverSet::default())
    }

    /// 가져오기 구현과 해석기 목록을 지정하여 생성합니다.
    pub fn with_parts(
        config: ScannerConfig,
        fetcher: Arc<dyn SourceFetcher>,
        resolvers: ResolverSet,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            resolvers: Arc::new(resolvers),
        }
    }

    /// 스캐너 설정
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// 요청 하나를 스캔합니다.
    ///
    /// 실패는 `Err`로 돌려주며, [`ScanTask::run`]에서 결과로 접힙니다.
    pub async fn scan(
        &self,
        request: ScanRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<ProjectDescriptor>, ScannerError> {
        if cancel.is_cancelled() {
            return Err(ScannerError::Cancelled);
        }

        let filter = FileFilter::new(
            request.includes(),
            request.excludes(),
            request.glob_case_sensitive(),
        )?;

        let (trees, checkout) = match request.scm() {
            Some(scm) => {
                let parent = self.config.checkout_parent.clone();
                let checkout =
                    tokio::task::spawn_blocking(move || Checkout::create(parent.as_deref()))
                        .await
                        .map_err(|e| ScannerError::PreStep(format!("spawn_blocking failed: {e}")))??;

                let started = Instant::now();
                if let Err(e) = self.fetcher.fetch(scm, checkout.path(), &cancel).await {
                    if !matches!(e, ScannerError::Cancelled) {
                        counter!(m::SCANNER_FETCH_FAILURES_TOTAL, m::LABEL_SCM => scm.scm_type().to_string())
                            .increment(1);
                    }
                    return Err(e);
                }
                histogram!(m::SCANNER_FETCH_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());

                if cancel.is_cancelled() {
                    return Err(ScannerError::Cancelled);
                }

                let name = request
                    .project_name()
                    .map(str::to_owned)
                    .or_else(|| repository_name(scm.url()));
                let tree = ScanTree {
                    path: checkout.path().to_path_buf(),
                    name,
                };
                (vec![tree], Some(checkout))
            }
            None => {
                let trees = request
                    .dependency_dirs()
                    .iter()
                    .map(|dir| ScanTree {
                        path: PathBuf::from(dir),
                        name: request.project_name().map(str::to_owned),
                    })
                    .collect();
                (trees, None)
            }
        };

        let resolve = ResolveContext {
            resolvers: Arc::clone(&self.resolvers),
            filter,
            follow_symlinks: request.follow_symlinks(),
            max_file_size: self.config.max_file_size,
            max_projects: self.config.max_projects,
            project_version: request.project_version().map(str::to_owned),
            cancel,
        };

        // 체크아웃은 blocking 작업이 소유하여 해석이 끝난 뒤 같은 스레드에서 삭제
        tokio::task::spawn_blocking(move || {
            let result = resolve.run(&trees);
            // 삭제 실패는 close()가 이미 경고로 남김
            if let Some(checkout) = checkout
                && let Err(e) = checkout.close()
            {
                debug!(error = %e, "checkout cleanup failed after scan");
            }
            result
        })
        .await
        .map_err(|e| ScannerError::Internal(format!("resolution task failed: {e}")))?
    }
}

impl ScanTask for DependencyScanTask {
    fn name(&self) -> &str {
        "dependency-scan"
    }

    fn run(&self, request: ScanRequest, cancel: CancellationToken) -> BoxFuture<'static, ScanOutcome> {
        let task = self.clone();
        Box::pin(async move {
            match task.scan(request, cancel).await {
                Ok(projects) => {
                    info!(projects = projects.len(), "scan completed");
                    ScanOutcome::Success(projects)
                }
                Err(e) => {
                    warn!(error = %e, status = %e.status_code(), "scan failed");
                    e.into_outcome()
                }
            }
        })
    }
}

/// blocking 해석 단계 상태
struct ResolveContext {
    resolvers: Arc<ResolverSet>,
    filter: FileFilter,
    follow_symlinks: bool,
    max_file_size: u64,
    max_projects: usize,
    project_version: Option<String>,
    cancel: CancellationToken,
}

impl ResolveContext {
    /// 모든 트리를 탐색하고 해석합니다 (동기 I/O).
    fn run(&self, trees: &[ScanTree]) -> Result<Vec<ProjectDescriptor>, ScannerError> {
        // 탐색 전에 모든 대상 디렉토리를 먼저 확인
        for tree in trees {
            if !tree.path.is_dir() {
                return Err(ScannerError::SourceMissing {
                    path: tree.path.display().to_string(),
                });
            }
        }

        let mut projects = Vec::new();
        let mut attempted = 0usize;
        let mut last_error = None;

        for tree in trees {
            let roots = self.collect_roots(tree, attempted)?;
            let base_name = tree.name.clone().unwrap_or_else(|| directory_name(&tree.path));

            for (dir, files) in roots {
                self.checkpoint()?;
                attempted += 1;

                let is_top = dir.as_os_str().is_empty();
                let root = if is_top { ".".to_owned() } else { slash_path(&dir) };
                let name = if is_top {
                    base_name.clone()
                } else {
                    directory_name(&dir)
                };

                match self.resolve_root(&files) {
                    Ok(dependencies) => {
                        counter!(m::SCANNER_PROJECTS_RESOLVED_TOTAL).increment(1);
                        record_dependencies(&dependencies);
                        debug!(root = %root, dependencies = dependencies.len(), "project root resolved");
                        projects.push(ProjectDescriptor {
                            name,
                            root,
                            version: if is_top { self.project_version.clone() } else { None },
                            dependencies,
                        });
                    }
                    Err(e) => {
                        counter!(m::SCANNER_ROOT_FAILURES_TOTAL).increment(1);
                        warn!(root = %root, error = %e, "project root failed, continuing with siblings");
                        last_error = Some(e.to_string());
                    }
                }
            }
        }

        if projects.is_empty()
            && let Some(last_error) = last_error
        {
            return Err(ScannerError::NoProjectResolved {
                roots: attempted,
                last_error,
            });
        }

        Ok(projects)
    }

    /// 인식되는 파일을 디렉토리(프로젝트 루트)별로 모읍니다.
    fn collect_roots(
        &self,
        tree: &ScanTree,
        roots_so_far: usize,
    ) -> Result<BTreeMap<PathBuf, Vec<WalkedFile>>, ScannerError> {
        let walker = SourceWalker::new(&tree.path, self.filter.clone())
            .follow_symlinks(self.follow_symlinks)
            .max_file_size(self.max_file_size)
            .cancel_on(self.cancel.clone());

        let mut roots: BTreeMap<PathBuf, Vec<WalkedFile>> = BTreeMap::new();
        let mut truncated = false;

        for file in walker.files() {
            self.checkpoint()?;
            counter!(m::SCANNER_FILES_WALKED_TOTAL).increment(1);

            if !self.resolvers.recognizes(&file.relative) {
                continue;
            }

            let dir = file
                .relative
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();

            if !roots.contains_key(&dir) && roots_so_far + roots.len() >= self.max_projects {
                if !truncated {
                    warn!(max_projects = self.max_projects, "project root limit reached, ignoring further roots");
                    truncated = true;
                }
                continue;
            }
            roots.entry(dir).or_default().push(file);
        }
        // 취소로 끝난 순회와 완료된 순회를 구분
        self.checkpoint()?;

        debug!(root = %tree.path.display(), project_roots = roots.len(), "walk completed");
        Ok(roots)
    }

    /// 프로젝트 루트 하나를 해석합니다.
    ///
    /// 루트 안의 파일이 하나라도 해석되면 성공이며, 모두 실패하면 마지막 에러를 돌려줍니다.
    fn resolve_root(&self, files: &[WalkedFile]) -> Result<Vec<DependencyInfo>, ScannerError> {
        let mut dependencies = Vec::new();
        let mut resolved_any = false;
        let mut last_error = None;

        for file in files {
            let rel = file.relative_str();
            let Some(resolver) = self.resolvers.find(&file.relative) else {
                continue;
            };

            let content = match std::fs::read(&file.path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %rel, error = %e, "failed to read file");
                    last_error = Some(ScannerError::Io { path: rel, source: e });
                    continue;
                }
            };

            match resolver.resolve(&content, &rel) {
                Ok(mut deps) => {
                    resolved_any = true;
                    dependencies.append(&mut deps);
                }
                Err(e) => {
                    warn!(path = %rel, resolver = resolver.name(), error = %e, "failed to resolve file");
                    last_error = Some(e);
                }
            }
        }

        match (resolved_any, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(dependencies),
        }
    }

    fn checkpoint(&self) -> Result<(), ScannerError> {
        if self.cancel.is_cancelled() {
            Err(ScannerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn record_dependencies(dependencies: &[DependencyInfo]) {
    for dep in dependencies {
        counter!(m::SCANNER_DEPENDENCIES_RESOLVED_TOTAL, m::LABEL_ECOSYSTEM => dep.ecosystem.clone())
            .increment(1);
    }
}

/// 저장소 URL에서 이름을 추정합니다 (`https://host/org/repo.git` -> `repo`).
fn repository_name(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_owned())
}

/// 디렉토리의 마지막 이름 (`.` 등은 절대 경로로 바꾼 뒤 사용)
fn directory_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .or_else(|| {
            std::fs::canonicalize(path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        })
        .unwrap_or_else(|| "project".to_owned())
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
