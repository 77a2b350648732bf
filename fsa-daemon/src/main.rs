use anyhow::Result;
use clap::Parser;

use fsa_daemon::FsaService;
use fsa_daemon::cli::DaemonCli;
use fsa_daemon::logging;
use fsa_daemon::service;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일 -> 환경변수 -> CLI
    let mut config = service::load_config(&cli.config).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        config_found = cli.config.exists(),
        "fsa-daemon starting"
    );

    let service = FsaService::build_from_config(config).await?;
    service.run().await?;

    tracing::info!("fsa-daemon shut down");
    Ok(())
}
