// IMPORTANT:
// Keep ALL numeric values centralized here (repo rule: no hardcoded numeric values scattered around).

// NOTE: WORKER_VERSION must stay in sync with the `version` field in Cargo.toml.
pub const WORKER_VERSION: &str = "0.3.0";

pub mod logging {
    pub const LOG_DIR_REL: &str = ".sent2vec/logs";
    pub const LOG_FILE_NAME: &str = "sent2vec_worker.log";

    // The file sink keeps the full per-request history; stderr only mirrors
    // from STDERR_MIRROR up, so a worker running under a supervisor surfaces
    // failures without the per-item chatter.
    pub const FILE_LOG_SPEC: &str = "debug";
    pub const STDERR_MIRROR: flexi_logger::Duplicate = flexi_logger::Duplicate::Warn;

    pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    pub const LOG_ROTATE_KEEP_FILES: usize = 5;
}

pub mod queue {
    // Connection parameters come from the environment; host/port are required.
    pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
    pub const ENV_REDIS_PORT: &str = "REDIS_PORT";
    pub const ENV_REDIS_PASSWORD: &str = "REDIS_PASSWORD";

    // How long a single BLPOP blocks before the loop spins again.
    pub const BLPOP_TIMEOUT_SECS: f64 = 3600.0;

    // TTL applied to the result key when a request asks for single-request delivery.
    pub const SINGLE_REQUEST_TTL_SECS: i64 = 10;
}

pub mod protocol {
    // `mode` value that marks the result key as one-shot (short TTL).
    pub const MODE_SINGLE_REQUEST: &str = "single_request";
}

pub mod embedding {
    // Max word-piece tokens fed to the model. Longer requests are pre-truncated;
    // producers are expected to tokenize/segment upstream.
    pub const MAX_TOKENS: usize = 256;
}
