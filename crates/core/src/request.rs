//! 분석 요청: `/analyze` 본문에서 만들어지는 불변 스캔 설정
//!
//! [`ScanRequest`]는 검증을 통해서만 생성됩니다 ([`ScanRequest::from_json`],
//! [`ScanRequestBuilder::build`]). 한 번 만들어지면 변경되지 않으며
//! 요청-응답 한 주기 동안만 존재합니다.
//!
//! # 불변 조건
//!
//! - SCM 필드가 있으면 `type`과 `url`이 함께 있어야 합니다.
//! - `type`이 있으면 `user`/`pass`는 빈 문자열일 수 있지만 생략될 수 없습니다.
//! - SCM이 없으면 `dependencyDirs`가 하나 이상 있어야 합니다 (로컬 스캔).
//! - `orgToken`은 비어 있으면 안 됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// 지원하는 소스 관리 시스템 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    /// 일반 git 저장소
    Git,
    /// GitHub (git 프로토콜)
    GitHub,
    /// GitLab (git 프로토콜)
    GitLab,
    /// Bitbucket (git 프로토콜)
    Bitbucket,
    /// Subversion
    Svn,
}

impl ScmType {
    /// 문자열에서 SCM 유형을 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "git" => Some(Self::Git),
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            "bitbucket" => Some(Self::Bitbucket),
            "svn" | "subversion" => Some(Self::Svn),
            _ => None,
        }
    }

    /// git 클라이언트로 가져오는 유형인지 확인합니다.
    pub fn is_git_based(&self) -> bool {
        !matches!(self, Self::Svn)
    }
}

impl fmt::Display for ScmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::GitHub => write!(f, "github"),
            Self::GitLab => write!(f, "gitlab"),
            Self::Bitbucket => write!(f, "bitbucket"),
            Self::Svn => write!(f, "svn"),
        }
    }
}

/// 검증된 소스 관리 위치와 자격 증명
#[derive(Clone, PartialEq, Eq)]
pub struct ScmSource {
    scm_type: ScmType,
    url: String,
    user: String,
    pass: String,
    branch: Option<String>,
}

impl ScmSource {
    /// SCM 유형
    pub fn scm_type(&self) -> ScmType {
        self.scm_type
    }

    /// 저장소 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 사용자명 (빈 문자열 가능)
    pub fn user(&self) -> &str {
        &self.user
    }

    /// 비밀번호/토큰 (빈 문자열 가능)
    pub fn pass(&self) -> &str {
        &self.pass
    }

    /// 체크아웃할 브랜치/태그
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// 자격 증명이 지정되었는지 확인합니다.
    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() || !self.pass.is_empty()
    }
}

// 비밀번호가 로그에 남지 않도록 Debug를 직접 구현
impl fmt::Debug for ScmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScmSource")
            .field("scm_type", &self.scm_type)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("branch", &self.branch)
            .finish()
    }
}

/// 불변 스캔 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    scm: Option<ScmSource>,
    dependency_dirs: Vec<String>,
    includes: Vec<String>,
    excludes: Vec<String>,
    glob_case_sensitive: bool,
    follow_symlinks: bool,
    org_token: String,
    project_name: Option<String>,
    project_version: Option<String>,
}

impl ScanRequest {
    /// JSON 본문을 파싱하고 검증합니다.
    ///
    /// # Errors
    ///
    /// - 본문이 JSON 객체가 아니면 `RequestError::Malformed`
    /// - 필수 필드가 없으면 `RequestError::MissingField`
    /// - 필드 값이 잘못되면 `RequestError::InvalidField`
    pub fn from_json(body: &[u8]) -> Result<Self, RequestError> {
        let raw: RawScanRequest =
            serde_json::from_slice(body).map_err(|e| RequestError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }

    /// 요청을 JSON 바이트로 직렬화합니다 (클라이언트/테스트용).
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&RawScanRequest::from(self))
    }

    /// 소스 관리 위치 (없으면 로컬 스캔)
    pub fn scm(&self) -> Option<&ScmSource> {
        self.scm.as_ref()
    }

    /// 로컬 스캔 디렉토리
    pub fn dependency_dirs(&self) -> &[String] {
        &self.dependency_dirs
    }

    /// 포함 glob 패턴 (비어 있으면 모든 파일)
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// 제외 glob 패턴
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// glob 대소문자 구분 여부
    pub fn glob_case_sensitive(&self) -> bool {
        self.glob_case_sensitive
    }

    /// 심볼릭 링크 추적 여부
    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// 대상 조직 토큰
    pub fn org_token(&self) -> &str {
        &self.org_token
    }

    /// 대상 프로젝트 이름
    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    /// 대상 프로젝트 버전
    pub fn project_version(&self) -> Option<&str> {
        self.project_version.as_deref()
    }

    /// 로컬 파일시스템만 스캔하는 요청인지 확인합니다.
    pub fn is_local(&self) -> bool {
        self.scm.is_none()
    }
}

/// 와이어 형식 (검증 전)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scm: Option<RawScmSource>,
    #[serde(default)]
    dependency_dirs: Vec<String>,
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
    #[serde(default)]
    glob_case_sensitive: bool,
    #[serde(default)]
    follow_symlinks: bool,
    #[serde(default)]
    org_token: Option<String>,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    project_version: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawScmSource {
    #[serde(default, rename = "type")]
    scm_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    pass: Option<String>,
    #[serde(default)]
    branch: Option<String>,
}

impl RawScmSource {
    fn is_empty(&self) -> bool {
        self.scm_type.is_none()
            && self.url.is_none()
            && self.user.is_none()
            && self.pass.is_none()
            && self.branch.is_none()
    }
}

impl TryFrom<RawScanRequest> for ScanRequest {
    type Error = RequestError;

    fn try_from(raw: RawScanRequest) -> Result<Self, Self::Error> {
        let scm = match raw.scm {
            Some(scm) if !scm.is_empty() => Some(validate_scm(scm)?),
            _ => None,
        };

        let dependency_dirs: Vec<String> = raw
            .dependency_dirs
            .into_iter()
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty())
            .collect();

        if scm.is_none() && dependency_dirs.is_empty() {
            return Err(RequestError::MissingField {
                field: "dependencyDirs".to_owned(),
            });
        }

        validate_patterns("includes", &raw.includes)?;
        validate_patterns("excludes", &raw.excludes)?;

        let org_token = non_empty(raw.org_token).ok_or_else(|| RequestError::MissingField {
            field: "orgToken".to_owned(),
        })?;

        Ok(Self {
            scm,
            dependency_dirs,
            includes: raw.includes,
            excludes: raw.excludes,
            glob_case_sensitive: raw.glob_case_sensitive,
            follow_symlinks: raw.follow_symlinks,
            org_token,
            project_name: non_empty(raw.project_name),
            project_version: non_empty(raw.project_version),
        })
    }
}

impl From<&ScanRequest> for RawScanRequest {
    fn from(req: &ScanRequest) -> Self {
        Self {
            scm: req.scm.as_ref().map(|s| RawScmSource {
                scm_type: Some(s.scm_type.to_string()),
                url: Some(s.url.clone()),
                user: Some(s.user.clone()),
                pass: Some(s.pass.clone()),
                branch: s.branch.clone(),
            }),
            dependency_dirs: req.dependency_dirs.clone(),
            includes: req.includes.clone(),
            excludes: req.excludes.clone(),
            glob_case_sensitive: req.glob_case_sensitive,
            follow_symlinks: req.follow_symlinks,
            org_token: Some(req.org_token.clone()),
            project_name: req.project_name.clone(),
            project_version: req.project_version.clone(),
        }
    }
}

fn validate_scm(raw: RawScmSource) -> Result<ScmSource, RequestError> {
    let type_str = non_empty(raw.scm_type).ok_or_else(|| RequestError::MissingField {
        field: "scm.type".to_owned(),
    })?;
    let scm_type =
        ScmType::from_str_loose(&type_str).ok_or_else(|| RequestError::InvalidField {
            field: "scm.type".to_owned(),
            reason: format!("unsupported source control type '{type_str}'"),
        })?;
    let url = non_empty(raw.url).ok_or_else(|| RequestError::MissingField {
        field: "scm.url".to_owned(),
    })?;
    // 자격 증명은 빈 문자열이어도 되지만 생략할 수는 없음
    let user = raw.user.ok_or_else(|| RequestError::MissingField {
        field: "scm.user".to_owned(),
    })?;
    let pass = raw.pass.ok_or_else(|| RequestError::MissingField {
        field: "scm.pass".to_owned(),
    })?;

    if url.chars().any(char::is_whitespace) || url.starts_with('-') {
        return Err(RequestError::InvalidField {
            field: "scm.url".to_owned(),
            reason: "must not contain whitespace or start with '-'".to_owned(),
        });
    }

    let branch = non_empty(raw.branch);
    if let Some(ref b) = branch
        && b.starts_with('-')
    {
        return Err(RequestError::InvalidField {
            field: "scm.branch".to_owned(),
            reason: "must not start with '-'".to_owned(),
        });
    }

    Ok(ScmSource {
        scm_type,
        url,
        user,
        pass,
        branch,
    })
}

/// 패턴을 스캐너와 같은 방식으로 정규화한 뒤 컴파일해 본다.
/// 문법 오류는 슬롯을 차지하기 전에 여기서 걸러진다.
fn validate_patterns(field: &str, patterns: &[String]) -> Result<(), RequestError> {
    for pattern in patterns {
        if pattern.trim().is_empty() {
            return Err(RequestError::InvalidField {
                field: field.to_owned(),
                reason: "glob patterns must not be empty".to_owned(),
            });
        }
        let normalized = pattern.trim().replace('\\', "/");
        let normalized = normalized.trim_start_matches("./");
        if let Err(e) = globset::GlobBuilder::new(normalized)
            .literal_separator(true)
            .build()
        {
            return Err(RequestError::InvalidField {
                field: field.to_owned(),
                reason: format!("invalid glob pattern '{pattern}': {}", e.kind()),
            });
        }
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// [`ScanRequest`] 빌더
///
/// 빌드 시 JSON 경로와 동일한 검증을 수행합니다.
#[derive(Default)]
pub struct ScanRequestBuilder {
    raw: RawScanRequest,
}

impl ScanRequestBuilder {
    /// 빈 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 소스 관리 위치를 설정합니다.
    pub fn scm(
        mut self,
        scm_type: impl Into<String>,
        url: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
    ) -> Self {
        self.raw.scm = Some(RawScmSource {
            scm_type: Some(scm_type.into()),
            url: Some(url.into()),
            user: Some(user.into()),
            pass: Some(pass.into()),
            branch: None,
        });
        self
    }

    /// 체크아웃할 브랜치를 설정합니다 (`scm()` 이후에 호출).
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        if let Some(ref mut scm) = self.raw.scm {
            scm.branch = Some(branch.into());
        }
        self
    }

    /// 로컬 스캔 디렉토리를 추가합니다.
    pub fn dependency_dir(mut self, dir: impl Into<String>) -> Self {
        self.raw.dependency_dirs.push(dir.into());
        self
    }

    /// 포함 패턴을 추가합니다.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.raw.includes.push(pattern.into());
        self
    }

    /// 제외 패턴을 추가합니다.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.raw.excludes.push(pattern.into());
        self
    }

    /// glob 대소문자 구분 여부를 설정합니다.
    pub fn glob_case_sensitive(mut self, enabled: bool) -> Self {
        self.raw.glob_case_sensitive = enabled;
        self
    }

    /// 심볼릭 링크 추적 여부를 설정합니다.
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.raw.follow_symlinks = enabled;
        self
    }

    /// 조직 토큰을 설정합니다.
    pub fn org_token(mut self, token: impl Into<String>) -> Self {
        self.raw.org_token = Some(token.into());
        self
    }

    /// 프로젝트 이름을 설정합니다.
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.raw.project_name = Some(name.into());
        self
    }

    /// 프로젝트 버전을 설정합니다.
    pub fn project_version(mut self, version: impl Into<String>) -> Self {
        self.raw.project_version = Some(version.into());
        self
    }

    /// 요청을 검증하고 빌드합니다.
    pub fn build(self) -> Result<ScanRequest, RequestError> {
        ScanRequest::try_from(self.raw)
    }
}
