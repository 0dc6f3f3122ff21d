use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod server;

use handler::fs::LocalFs;
use handler::RequestHandler;
use server::{create_reusable_listener, start_server_loop, start_signal_handler, SignalHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path_from_args(std::env::args().skip(1))?;
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Request handling runs on the blocking pool, so its size is the worker count
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(cfg.server.workers)
        .max_blocking_threads(cfg.server.workers)
        .thread_name("file-server-worker")
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals))?;

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg, RequestHandler::new(LocalFs)));
    start_server_loop(listener, state, Arc::new(AtomicUsize::new(0)), signals).await;
    Ok(())
}

/// Config path from `-c <path>` / `--config <path>` / `--config=<path>`
fn config_path_from_args(mut args: impl Iterator<Item = String>) -> Result<String, String> {
    let mut path = config::DEFAULT_CONFIG_PATH.to_string();
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--config=") {
            value.clone_into(&mut path);
        } else if arg == "-c" || arg == "--config" {
            path = args
                .next()
                .ok_or_else(|| format!("{arg} requires a path argument"))?;
        } else {
            return Err(format!(
                "Unknown argument: {arg}\nUsage: etag-file-server [-c|--config <path>]"
            ));
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(ToString::to_string).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_config_path_from_args() {
        assert_eq!(config_path_from_args(args(&[])).unwrap(), "config");
        assert_eq!(config_path_from_args(args(&["-c", "prod.toml"])).unwrap(), "prod.toml");
        assert_eq!(config_path_from_args(args(&["--config=a/b"])).unwrap(), "a/b");
        assert!(config_path_from_args(args(&["--config"])).is_err());
        assert!(config_path_from_args(args(&["--port", "1"])).is_err());
    }
}
