#![forbid(unsafe_code)]

use std::sync::atomic::AtomicBool;
use std::time::Duration;
use wq_runner::{
    AckImmediately, RunnerConfig, Sweeper, Worker, WorkerOptions, logging, parse_args_from, usage,
};
use wq_storage::SqliteStore;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn run(cfg: RunnerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&cfg.db_path)?;
    let stop = AtomicBool::new(false);

    if cfg.stats {
        let counts = store.status_counts()?;
        println!("{}", serde_json::to_string(&counts)?);
        return Ok(());
    }

    if cfg.prune {
        let mut sweeper = Sweeper::new(store, cfg.keep_days);
        if cfg.once {
            let removed = sweeper.sweep_once()?;
            println!("{removed}");
        } else {
            sweeper.run(Duration::from_secs(cfg.sweep_every_s), &stop);
        }
        return Ok(());
    }

    let mut worker = Worker::new(
        store,
        WorkerOptions {
            worker_id: cfg.worker_id.clone(),
            lease_ms: cfg.lease_ms,
            heartbeat_ms: cfg.heartbeat_ms,
            poll: Duration::from_millis(cfg.poll_ms),
            retry: cfg.retry,
        },
    );
    let mut handler = AckImmediately;
    if cfg.once {
        let outcome = worker.run_once(&mut handler)?;
        tracing::info!(outcome = ?outcome, "single run finished");
    } else {
        worker.run(&mut handler, &stop);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = match parse_args_from(&args, env_var) {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            print!("{}", usage());
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", usage());
            std::process::exit(2);
        }
    };

    logging::init(cfg.log_json);
    tracing::debug!(config = ?cfg, "runner config");
    run(cfg)
}
