//! Worker child process entry point
//!
//! Started by the supervisor with `--port`; the IPC channel is selected from
//! the environment the supervisor sets up.

use clap::Parser;
use std::sync::Arc;

use shared::shutdown::shutdown_signal;
use shared::{logging, ProcessId, PushoverNotifier, ShutdownCoordinator, EXIT_FAILURE};
use worker::services::master_link;
use worker::{crash, Args, CrashReporter, Worker, WorkerConfig, WorkerError, WorkerResult};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    ProcessId::init_worker();
    logging::init_tracing(Some(&args.log_level));

    let config = WorkerConfig::from_args(&args);
    let link = master_link::from_env();
    if !link.is_connected() {
        logging::log_warning(ProcessId::current(), "Running without a master, IPC messages are dropped");
    }

    let reporter = CrashReporter::new(link.clone(), Arc::new(PushoverNotifier::from_env()))
        .with_exit_delay(config.exit_delay);
    crash::install(reporter);

    let worker = Arc::new(Worker::new(config, link));
    let listener = match worker.bind() {
        Ok(listener) => listener,
        Err(e) => {
            logging::log_error(ProcessId::current(), "Binding HTTP listener", &e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    logging::log_startup(
        ProcessId::current(),
        &format!("worker {} on {}", ProcessId::current().pid(), worker.config().bind_address),
    );

    let server = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.serve(listener, shutdown_signal()).await })
    };

    let drained: WorkerResult<()> = match server.await {
        Ok(result) => result,
        // The panic hook already owns the exit
        Err(e) if e.is_panic() => std::future::pending().await,
        Err(e) => Err(WorkerError::server(e.to_string())),
    };

    let exit_code = ShutdownCoordinator::new().complete(drained).await;
    std::process::exit(exit_code);
}
