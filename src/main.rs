use std::process::ExitCode;

use time::UtcOffset;
use tracing_subscriber::EnvFilter;

use kisschat::{Server, ServerConfig, ServerError, StaticDir};

fn main() -> ExitCode {
    // The local offset can only be read soundly while the process is still
    // single-threaded, so resolve it before the runtime starts.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(offset)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(offset: UtcOffset) -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;
    let source = StaticDir::new(config.web_root.clone());
    let server = Server::with_offset(config, source, offset);
    let listener = server.bind().await?;

    let config = server.config();
    tracing::info!(
        addr = %listener.local_addr()?,
        rate_capacity = config.rate_capacity,
        rate_window = ?config.rate_window,
        max_messages = config.max_messages,
        web_root = %config.web_root.display(),
        "chat server running"
    );

    server.run(listener).await;
    tracing::info!("server shutdown complete");
    Ok(())
}
