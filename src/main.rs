mod config;
mod embeddings;
mod logging;
mod protocol;
mod queue;
mod worker;

use std::path::Path;

use anyhow::Context;

use crate::embeddings::EmbeddingModel;
use crate::queue::RedisQueue;
use crate::worker::DestinationPolicy;

fn main() {
    if let Err(e) = real_main() {
        // Keep stderr noisy for operator bug reports; logs also go to file.
        eprintln!("[sent2vec worker] fatal error: {e:?}");
        log::error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!(
        "usage: sent2vec_worker <model-dir> <input-queue> [<result-queue>]\n\n  \
         <model-dir>     directory holding config.json, model.safetensors, tokenizer.json\n  \
         <input-queue>   redis list the worker pops requests from\n  \
         <result-queue>  fixed redis list for responses; omit to route per message\n                  \
         via each request's `result_queue` field\n\n\
         connection parameters come from the environment:\n  \
         REDIS_HOST, REDIS_PORT (required), REDIS_PASSWORD (optional)"
    );
}

fn real_main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        print_usage();
        std::process::exit(1);
    }

    logging::init_logging()?;

    let (host, port, password) = connection_from_env()?;
    let mut queue = RedisQueue::connect(&host, port, password.as_deref())?;

    log::info!("Loading model from {} ...", args[1]);
    let model = EmbeddingModel::load(Path::new(&args[1]))?;
    log::info!("... done");

    let input_queue = args[2].clone();
    let destination = match args.get(3) {
        Some(q) => {
            log::info!("Listening on {}, responses to fixed queue {}", input_queue, q);
            DestinationPolicy::Fixed(q.clone())
        }
        None => {
            log::info!("Listening on {}, responses routed per message", input_queue);
            DestinationPolicy::PerMessage
        }
    };

    let processed = worker::run(&mut queue, &model, &input_queue, &destination);
    log::info!("Connection lost after {} responses, exiting", processed);
    Ok(())
}

fn connection_from_env() -> anyhow::Result<(String, u16, Option<String>)> {
    let host = std::env::var(config::queue::ENV_REDIS_HOST)
        .with_context(|| format!("{} is not set", config::queue::ENV_REDIS_HOST))?;
    let port_raw = std::env::var(config::queue::ENV_REDIS_PORT)
        .with_context(|| format!("{} is not set", config::queue::ENV_REDIS_PORT))?;
    let port: u16 = port_raw
        .parse()
        .with_context(|| format!("{} is not a valid port: {port_raw}", config::queue::ENV_REDIS_PORT))?;
    let password = std::env::var(config::queue::ENV_REDIS_PASSWORD)
        .ok()
        .filter(|p| !p.is_empty());
    Ok((host, port, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so the env mutations stay sequential.
    #[test]
    fn connection_env_parsing() {
        std::env::remove_var(config::queue::ENV_REDIS_HOST);
        std::env::remove_var(config::queue::ENV_REDIS_PORT);
        std::env::remove_var(config::queue::ENV_REDIS_PASSWORD);
        assert!(connection_from_env().is_err());

        std::env::set_var(config::queue::ENV_REDIS_HOST, "redis.internal");
        assert!(connection_from_env().is_err(), "port still missing");

        std::env::set_var(config::queue::ENV_REDIS_PORT, "not-a-port");
        assert!(connection_from_env().is_err());

        std::env::set_var(config::queue::ENV_REDIS_PORT, "6380");
        let (host, port, password) = connection_from_env().unwrap();
        assert_eq!(host, "redis.internal");
        assert_eq!(port, 6380);
        assert!(password.is_none());

        std::env::set_var(config::queue::ENV_REDIS_PASSWORD, "hunter2");
        let (_, _, password) = connection_from_env().unwrap();
        assert_eq!(password.as_deref(), Some("hunter2"));

        std::env::remove_var(config::queue::ENV_REDIS_HOST);
        std::env::remove_var(config::queue::ENV_REDIS_PORT);
        std::env::remove_var(config::queue::ENV_REDIS_PASSWORD);
    }
}
