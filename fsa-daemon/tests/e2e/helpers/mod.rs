pub mod client;
pub mod config;
pub mod tasks;

use std::net::SocketAddr;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fsa_daemon::FsaService;

/// A service serving in the background until [`RunningService::stop`].
pub struct RunningService {
    pub addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl RunningService {
    pub fn start(service: FsaService) -> Self {
        let addr = service.local_addr();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(service.run_until(async move { token.cancelled().await }));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    /// Trigger graceful shutdown and wait for the server loop to return.
    pub async fn stop(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(10), self.handle)
            .await
            .expect("server should stop within 10s")
            .expect("server task should not panic")
    }
}
