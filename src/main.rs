use anyhow::Context;
use imgdrop::cli::Args;
use imgdrop::config::{AppState, Config};
use imgdrop::logger;
use imgdrop::server::{self, Server};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let args = Args::from_env();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger::log_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let cfg = Config::load(args).context("failed to load configuration")?;
    logger::init(&cfg.logging).context("failed to initialize logging")?;

    let state = Arc::new(AppState::new(cfg));
    let created = state.uploads.ensure_exists().with_context(|| {
        format!(
            "failed to create uploads directory {}",
            state.uploads.root().display()
        )
    })?;
    if created {
        logger::log_upload_dir_created(state.uploads.root());
    }

    // Create the Tokio runtime, sized by `server.workers` when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = state.config.server.workers.filter(|&n| n > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async_main(state))
}

async fn async_main(state: Arc<AppState>) -> anyhow::Result<()> {
    let server = Server::bind(Arc::clone(&state)).context("failed to start server")?;
    logger::log_server_start(&server.local_addr(), state.uploads.root());

    server
        .serve(server::shutdown_signal())
        .await
        .context("server did not shut down cleanly")?;

    logger::log_shutdown_complete();
    Ok(())
}
