//! 소스 가져오기: git/svn 클라이언트로 저장소를 체크아웃 디렉토리에 받아옵니다.
//!
//! [`SourceFetcher`] trait은 dyn-compatible하도록 [`BoxFuture`]를 반환합니다.
//! 기본 구현 [`CommandFetcher`]는 외부 클라이언트를 자식 프로세스로 실행하며,
//! 자식 프로세스는 `kill_on_drop`으로 생성되어 취소/시간 초과 시 종료됩니다.
//!
//! # 명령 형식
//!
//! ```text
//! git clone --depth 1 --quiet [--branch <b>] -- <url> <dest>
//! svn checkout --non-interactive --quiet [--username <u>] [--password-from-stdin] -- <url> <dest>
//! ```
//!
//! 비밀번호는 명령줄 인자에 넣지 않습니다. git은 `GIT_CONFIG_*` 환경변수로
//! `http.extraHeader`를 전달하고, svn은 표준 입력으로 전달합니다.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fsa_core::request::{ScmSource, ScmType};
use fsa_core::task::BoxFuture;

use crate::config::ScannerConfig;
use crate::error::ScannerError;

/// 소스 가져오기 trait
pub trait SourceFetcher: Send + Sync + 'static {
    /// `source`를 `destination` 디렉토리로 가져옵니다.
    ///
    /// `cancel`이 취소되면 진행 중인 작업을 중단하고 `ScannerError::Cancelled`를 반환합니다.
    fn fetch<'a>(
        &'a self,
        source: &'a ScmSource,
        destination: &'a Path,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ScannerError>>;
}

/// 외부 git/svn 클라이언트 기반 가져오기
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    git_program: String,
    svn_program: String,
    timeout: Duration,
}

impl CommandFetcher {
    /// 새 가져오기 구현을 생성합니다.
    pub fn new(
        git_program: impl Into<String>,
        svn_program: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            git_program: git_program.into(),
            svn_program: svn_program.into(),
            timeout,
        }
    }

    /// 스캐너 설정에서 생성합니다.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(
            config.git_program.clone(),
            config.svn_program.clone(),
            config.fetch_timeout(),
        )
    }

    /// 가져오기 명령을 구성합니다.
    pub fn command(&self, source: &ScmSource, destination: &Path) -> Command {
        match source.scm_type() {
            ScmType::Svn => self.svn_command(source, destination),
            _ => self.git_command(source, destination),
        }
    }

    fn git_command(&self, source: &ScmSource, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.git_program);
        cmd.arg("clone").arg("--depth").arg("1").arg("--quiet");
        if let Some(branch) = source.branch() {
            cmd.arg("--branch").arg(branch);
        }
        cmd.arg("--")
            .arg(source.url())
            .arg(destination)
            // 자격 증명이 틀려도 프롬프트에서 멈추지 않도록
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(header) = basic_auth_header(source) {
            // 환경변수는 같은 사용자만 읽을 수 있음 (/proc/<pid>/environ)
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", header);
        }
        cmd
    }

    fn svn_command(&self, source: &ScmSource, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.svn_program);
        cmd.arg("checkout").arg("--non-interactive").arg("--quiet");
        if !source.user().is_empty() {
            cmd.arg("--username").arg(source.user());
        }
        if stdin_secret(source).is_some() {
            cmd.arg("--password-from-stdin");
        }
        if source.branch().is_some() {
            debug!("branch is ignored for svn sources; encode it in the url");
        }
        cmd.arg("--").arg(source.url()).arg(destination);
        cmd
    }

    async fn run(
        &self,
        source: &ScmSource,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ScannerError> {
        let scm = source.scm_type().to_string();
        let mut cmd = self.command(source, destination);
        let secret = stdin_secret(source);
        let mut child = cmd
            .stdin(if secret.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScannerError::Fetch {
                scm: scm.clone(),
                reason: format!("failed to start client: {e}"),
            })?;

        if let Some(secret) = secret
            && let Some(mut stdin) = child.stdin.take()
        {
            let written = async {
                stdin.write_all(secret.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.shutdown().await
            }
            .await;
            if let Err(e) = written {
                return Err(ScannerError::Fetch {
                    scm,
                    reason: format!("failed to pass credentials to client: {e}"),
                });
            }
        }

        info!(scm = %scm, url = %source.url(), dest = %destination.display(), "fetching source tree");

        // 자식 프로세스는 wait_with_output future가 소유하므로
        // select!에서 이 future가 drop되면 kill_on_drop으로 종료됨
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(scm = %scm, "fetch cancelled, killing client");
                return Err(ScannerError::Cancelled);
            }
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                Ok(output) => output.map_err(|e| ScannerError::Fetch {
                    scm: scm.clone(),
                    reason: e.to_string(),
                })?,
                Err(_) => {
                    warn!(scm = %scm, timeout_secs = self.timeout.as_secs(), "fetch timed out, killing client");
                    return Err(ScannerError::FetchTimeout {
                        secs: self.timeout.as_secs(),
                    });
                }
            },
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = redact(stderr_summary(&stderr, output.status), source);
            return Err(ScannerError::Fetch { scm, reason });
        }

        debug!(scm = %scm, dest = %destination.display(), "fetch completed");
        Ok(())
    }
}

impl SourceFetcher for CommandFetcher {
    fn fetch<'a>(
        &'a self,
        source: &'a ScmSource,
        destination: &'a Path,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ScannerError>> {
        Box::pin(self.run(source, destination, cancel))
    }
}

/// git HTTP(S) 저장소용 `Authorization: Basic` 헤더
///
/// 자격 증명이 없거나 HTTP(S)가 아닌 URL(`git@host:repo` 등)이면 `None`입니다.
fn basic_auth_header(source: &ScmSource) -> Option<String> {
    if !source.has_credentials() {
        return None;
    }

    match url::Url::parse(source.url()) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => {
            debug!(url = %source.url(), "credentials not passed for non-http url");
            return None;
        }
    }

    let token = STANDARD.encode(format!("{}:{}", source.user(), source.pass()));
    Some(format!("Authorization: Basic {token}"))
}

/// 표준 입력으로 전달할 비밀번호 (svn만 해당)
fn stdin_secret(source: &ScmSource) -> Option<&str> {
    (source.scm_type() == ScmType::Svn && !source.pass().is_empty()).then(|| source.pass())
}

fn stderr_summary(stderr: &str, status: std::process::ExitStatus) -> String {
    let last = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last();
    match last {
        Some(line) => line.to_owned(),
        None => format!("client exited with {status}"),
    }
}

fn redact(message: String, source: &ScmSource) -> String {
    if source.pass().is_empty() {
        message
    } else {
        message.replace(source.pass(), "***")
    }
}
