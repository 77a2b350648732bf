//! 스캔 작업 trait: executor와 스캐너 구현 사이의 경계
//!
//! [`ScanTask`]는 dyn-compatible하도록 [`BoxFuture`]를 반환합니다.
//! executor는 `Arc<dyn ScanTask>` 하나를 모든 요청에 공유합니다.
//!
//! 구현은 실패를 `Err`로 돌려주지 않고 항상 [`ScanOutcome`]으로 접어야 합니다.
//! 취소 토큰이 취소되면 가능한 빨리 정리 후 반환해야 합니다.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::outcome::ScanOutcome;
use crate::request::ScanRequest;

/// `Send` boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 스캔 작업
pub trait ScanTask: Send + Sync + 'static {
    /// 작업 이름 (로그용)
    fn name(&self) -> &str;

    /// 요청 하나를 스캔합니다.
    fn run(&self, request: ScanRequest, cancel: CancellationToken)
    -> BoxFuture<'static, ScanOutcome>;
}
