#![forbid(unsafe_code)]

use crate::RunnerError;
use std::path::PathBuf;
use wq_core::RetryPolicy;
use wq_core::limits::{DEFAULT_LEASE_MS, clamp_lease_ms};

pub(crate) const DEFAULT_DB_PATH: &str = ".wq/queue.db";
const DEFAULT_POLL_MS: u64 = 1_500;
const DEFAULT_KEEP_DAYS: i64 = 30;
const DEFAULT_SWEEP_EVERY_S: u64 = 3_600;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    pub db_path: PathBuf,
    pub worker_id: String,
    pub poll_ms: u64,
    pub lease_ms: u64,
    pub heartbeat_ms: u64,
    pub retry: RetryPolicy,
    pub keep_days: i64,
    pub sweep_every_s: u64,
    pub once: bool,
    pub drain_ack: bool,
    pub prune: bool,
    pub stats: bool,
    pub log_json: bool,
}

pub fn usage() -> &'static str {
    "wq_runner: drive the SQLite work queue from the worker side\n\n\
USAGE:\n\
  wq_runner [--db PATH] [--worker-id ID] [--poll-ms MS]\n\
            [--lease-ms MS] [--heartbeat-ms MS]\n\
            [--retry-base-ms MS] [--retry-max-ms MS]\n\
            [--keep-days N] [--sweep-every-s S]\n\
            [--once] (--drain-ack | --prune | --stats)\n\n\
MODES:\n\
  --drain-ack claim jobs and mark them done WITHOUT running them;\n\
              this completes real jobs (use on scratch queues only)\n\
  --prune     delete terminal jobs older than --keep-days\n\
  --stats     print per-status job counts as JSON and exit\n\n\
ENV:\n\
  WQ_DB, WQ_WORKER_ID, WQ_POLL_MS, WQ_LEASE_MS, WQ_HEARTBEAT_MS,\n\
  WQ_RETRY_BASE_MS, WQ_RETRY_MAX_MS, WQ_KEEP_DAYS, WQ_SWEEP_EVERY_S,\n\
  WQ_LOG_JSON=1, RUST_LOG\n"
}

fn default_worker_id(env: &impl Fn(&str) -> Option<String>) -> String {
    let host = env("HOSTNAME").unwrap_or_else(|| "worker".to_string());
    format!("{host}-{}", std::process::id())
}

fn parse_num<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("{flag} must be an integer (got {raw:?})"))
}

fn env_num<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, String> {
    match env(name) {
        Some(raw) => parse_num(name, &raw),
        None => Ok(default),
    }
}

/// Resolves config from `env` first, then `args` (flags win).
///
/// `env` returns trimmed, non-empty values only. Returns `Ok(None)` for `--help`.
pub fn parse_args_from(
    args: &[String],
    env: impl Fn(&str) -> Option<String>,
) -> Result<Option<RunnerConfig>, RunnerError> {
    resolve(args, env).map_err(RunnerError::Config)
}

fn resolve(
    args: &[String],
    env: impl Fn(&str) -> Option<String>,
) -> Result<Option<RunnerConfig>, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(None);
    }

    let mut db_path = env("WQ_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    let mut worker_id = env("WQ_WORKER_ID");
    let mut poll_ms: u64 = env_num(&env, "WQ_POLL_MS", DEFAULT_POLL_MS)?;
    let mut lease_ms: u64 = env_num(&env, "WQ_LEASE_MS", DEFAULT_LEASE_MS)?;
    let mut heartbeat_ms: Option<u64> = env("WQ_HEARTBEAT_MS")
        .map(|v| parse_num("WQ_HEARTBEAT_MS", &v))
        .transpose()?;
    let defaults = RetryPolicy::default();
    let mut retry_base_ms: u64 = env_num(&env, "WQ_RETRY_BASE_MS", defaults.base_ms)?;
    let mut retry_max_ms: u64 = env_num(&env, "WQ_RETRY_MAX_MS", defaults.max_ms)?;
    let mut keep_days: i64 = env_num(&env, "WQ_KEEP_DAYS", DEFAULT_KEEP_DAYS)?;
    let mut sweep_every_s: u64 = env_num(&env, "WQ_SWEEP_EVERY_S", DEFAULT_SWEEP_EVERY_S)?;
    let log_json = env("WQ_LOG_JSON").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let mut once = false;
    let mut drain_ack = false;
    let mut prune = false;
    let mut stats = false;

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "--db" => {
                i += 1;
                let v = args.get(i).ok_or("--db requires PATH")?;
                db_path = PathBuf::from(v);
            }
            "--worker-id" => {
                i += 1;
                let v = args.get(i).ok_or("--worker-id requires ID")?;
                worker_id = Some(v.to_string());
            }
            "--poll-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--poll-ms requires MS")?;
                poll_ms = parse_num(a, v)?;
            }
            "--lease-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--lease-ms requires MS")?;
                lease_ms = parse_num(a, v)?;
            }
            "--heartbeat-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--heartbeat-ms requires MS")?;
                heartbeat_ms = Some(parse_num(a, v)?);
            }
            "--retry-base-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--retry-base-ms requires MS")?;
                retry_base_ms = parse_num(a, v)?;
            }
            "--retry-max-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--retry-max-ms requires MS")?;
                retry_max_ms = parse_num(a, v)?;
            }
            "--keep-days" => {
                i += 1;
                let v = args.get(i).ok_or("--keep-days requires N")?;
                keep_days = parse_num(a, v)?;
            }
            "--sweep-every-s" => {
                i += 1;
                let v = args.get(i).ok_or("--sweep-every-s requires S")?;
                sweep_every_s = parse_num(a, v)?;
            }
            "--once" => once = true,
            "--drain-ack" => drain_ack = true,
            "--prune" => prune = true,
            "--stats" => stats = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let modes = [drain_ack, prune, stats].into_iter().filter(|m| *m).count();
    if modes == 0 {
        return Err("nothing to do: pass one of --drain-ack, --prune, --stats".to_string());
    }
    if modes > 1 {
        return Err("--drain-ack, --prune and --stats are mutually exclusive".to_string());
    }

    let worker_id = worker_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default_worker_id(&env));
    let lease_ms = clamp_lease_ms(Some(lease_ms));
    // A third of the lease leaves two missed heartbeats of slack before reclaim.
    let heartbeat_ms = heartbeat_ms
        .unwrap_or(lease_ms / 3)
        .clamp(1_000, lease_ms.saturating_sub(1).max(1_000));

    Ok(Some(RunnerConfig {
        db_path,
        worker_id,
        poll_ms: poll_ms.max(50),
        lease_ms,
        heartbeat_ms,
        retry: RetryPolicy {
            base_ms: retry_base_ms,
            max_ms: retry_max_ms,
        },
        keep_days: keep_days.max(0),
        sweep_every_s: sweep_every_s.max(1),
        once,
        drain_ack,
        prune,
        stats,
        log_json,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn help_short_circuits() {
        let parsed = parse_args_from(&args(&["--prune", "--help"]), env_from(&[])).expect("parse");
        assert!(parsed.is_none());
    }

    #[test]
    fn defaults_apply_without_env() {
        let cfg = parse_args_from(&args(&["--drain-ack"]), env_from(&[("HOSTNAME", "box")]))
            .expect("parse")
            .expect("config");
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(cfg.worker_id.starts_with("box-"));
        assert_eq!(cfg.poll_ms, DEFAULT_POLL_MS);
        assert_eq!(cfg.lease_ms, DEFAULT_LEASE_MS);
        assert_eq!(cfg.heartbeat_ms, DEFAULT_LEASE_MS / 3);
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert_eq!(cfg.keep_days, DEFAULT_KEEP_DAYS);
        assert!(cfg.drain_ack && !cfg.prune && !cfg.stats && !cfg.once);
        assert!(!cfg.log_json);
    }

    #[test]
    fn flags_override_env() {
        let env = env_from(&[
            ("WQ_DB", "/var/lib/wq/env.db"),
            ("WQ_WORKER_ID", "env-worker"),
            ("WQ_KEEP_DAYS", "90"),
            ("WQ_LOG_JSON", "1"),
        ]);
        let cfg = parse_args_from(
            &args(&[
                "--db",
                "/tmp/flag.db",
                "--keep-days",
                "7",
                "--prune",
                "--once",
            ]),
            env,
        )
        .expect("parse")
        .expect("config");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/flag.db"));
        assert_eq!(cfg.worker_id, "env-worker");
        assert_eq!(cfg.keep_days, 7);
        assert!(cfg.prune && cfg.once);
        assert!(cfg.log_json);
    }

    #[test]
    fn lease_and_heartbeat_are_kept_consistent() {
        let cfg = parse_args_from(
            &args(&["--drain-ack", "--lease-ms", "10", "--heartbeat-ms", "999999"]),
            env_from(&[]),
        )
        .expect("parse")
        .expect("config");
        assert_eq!(cfg.lease_ms, 5_000);
        assert!(cfg.heartbeat_ms < cfg.lease_ms);
    }

    fn config_err(raw: &[&str], env: impl Fn(&str) -> Option<String>) -> String {
        match parse_args_from(&args(raw), env) {
            Err(RunnerError::Config(msg)) => msg,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn bad_input_is_reported() {
        let err = config_err(&["--drain-ack", "--poll-ms", "soon"], env_from(&[]));
        assert!(err.contains("--poll-ms"), "{err}");

        let err = config_err(&["--drain-ack", "--db"], env_from(&[]));
        assert_eq!(err, "--db requires PATH");

        let err = config_err(&["--drain-ack", "--bogus"], env_from(&[]));
        assert_eq!(err, "unknown argument: --bogus");

        let err = config_err(&["--once"], env_from(&[]));
        assert!(err.starts_with("nothing to do"), "{err}");

        let err = config_err(&["--prune", "--stats"], env_from(&[]));
        assert!(err.contains("mutually exclusive"), "{err}");

        let err = config_err(&["--stats"], env_from(&[("WQ_LEASE_MS", "x")]));
        assert!(err.contains("WQ_LEASE_MS"), "{err}");
    }

    #[test]
    fn config_errors_display_with_prefix() {
        let err = parse_args_from(&args(&["--bogus"]), env_from(&[])).expect_err("unknown flag");
        assert_eq!(err.to_string(), "config: unknown argument: --bogus");
    }

    #[test]
    fn drain_mode_is_explicit_about_completing_jobs() {
        let cfg = parse_args_from(&args(&["--drain-ack", "--once"]), env_from(&[]))
            .expect("parse")
            .expect("config");
        assert!(cfg.drain_ack && cfg.once);

        let err = config_err(&["--dry-run"], env_from(&[]));
        assert_eq!(err, "unknown argument: --dry-run");

        assert!(usage().contains("WITHOUT running them"));
    }
}
