//! Main entry point for the supervisor binary
//!
//! Validates the environment, spawns the worker pool and keeps it alive
//! until SIGINT/SIGTERM, then stops every worker before exiting.

use clap::Parser;

use shared::shutdown::shutdown_signal;
use shared::{logging, process_info, ProcessId, PushoverNotifier, ShutdownCoordinator, EXIT_FAILURE};
use supervisor::config::{parse_failure_code, resolve_worker_bin};
use supervisor::services::{RealEnvValidator, RealWorkerSpawner};
use supervisor::{Args, EnvValidator, Supervisor, SupervisorConfig};

#[tokio::main]
async fn main() {
    // Load .env before clap reads its env fallbacks
    let _ = dotenv::dotenv();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match parse_failure_code(&e) {
            Some(code) => {
                let _ = e.print();
                std::process::exit(code);
            }
            None => e.exit(),
        },
    };

    ProcessId::init_master();
    logging::init_tracing(Some(&args.log_level));

    match RealEnvValidator::new().validate() {
        Ok(report) if !report.missing_optional.is_empty() => {
            logging::log_warning(
                ProcessId::current(),
                &format!("Optional environment variables are not set: [{}]", report.missing_optional.join(", ")),
            );
        }
        Ok(_) => {}
        Err(e) => {
            logging::log_error(ProcessId::current(), "Environment validation", &e);
            std::process::exit(EXIT_FAILURE);
        }
    }

    let config = SupervisorConfig::from_args(&args);
    let worker_bin = match resolve_worker_bin(args.worker_bin.as_ref()) {
        Ok(path) => path,
        Err(e) => {
            logging::log_error(ProcessId::current(), "Worker executable", &e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    logging::log_startup(
        ProcessId::current(),
        &format!("supervisor ({})", args.app_env.as_deref().unwrap_or("unknown environment")),
    );
    process_info!(
        ProcessId::current(),
        "[Master] {} running with {}/{} workers",
        ProcessId::current().pid(),
        config.worker_count,
        config.available_cores
    );

    let spawner = RealWorkerSpawner::new(worker_bin)
        .with_arg("--port")
        .with_arg(args.port.to_string())
        .with_log_level(args.log_level.clone());
    let notifier = PushoverNotifier::from_env();

    let mut supervisor = Supervisor::new(config, spawner, notifier);

    // Set up graceful shutdown
    let shutdown_sender = supervisor.get_shutdown_sender();
    tokio::spawn(async move {
        shutdown_signal().await;
        logging::log_shutdown(ProcessId::current(), "Stopping workers");
        let _ = shutdown_sender.send(()).await;
    });

    let drained = supervisor.run().await;
    let exit_code = ShutdownCoordinator::new().complete(drained).await;
    std::process::exit(exit_code);
}
