//! Capture-window settings.
//!
//! Each value is resolved from an environment variable, falling back to a
//! default. Resolution happens exactly once per process, on the first
//! `vkCreateInstance`; the layer keeps the result in its process-global
//! capture context.

const ENV_START_DRAW_CALL: &str = "VKSCOOP_START_DRAW_CALL";
const ENV_DRAW_CALL_COUNT: &str = "VKSCOOP_DRAW_CALL_COUNT";
const ENV_OUTPUT_FILE_PREFIX: &str = "VKSCOOP_OUTPUT_FILE_PREFIX";

fn default_start_draw_call() -> u64 {
    0
}

fn default_draw_call_count() -> u64 {
    1
}

fn default_output_file_prefix() -> String {
    "vkscoop_output".to_string()
}

/// Which draw calls get captured, and where the output goes.
///
/// The capture window is the inclusive ordinal range
/// `[start_draw_call, last_draw_call]`.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub start_draw_call: u64,
    pub draw_call_count: u64,
    pub last_draw_call: u64,
    pub output_file_prefix: String,
}

impl CaptureSettings {
    /// Resolve settings from the environment.
    ///
    /// A variable that is set but does not parse as an integer is a
    /// configuration error the user must see; it aborts.
    pub fn from_env() -> Self {
        let start_draw_call = env_u64(ENV_START_DRAW_CALL, default_start_draw_call());
        let draw_call_count = env_u64(ENV_DRAW_CALL_COUNT, default_draw_call_count());
        let output_file_prefix =
            std::env::var(ENV_OUTPUT_FILE_PREFIX).unwrap_or_else(|_| default_output_file_prefix());

        Self::new(start_draw_call, draw_call_count, output_file_prefix)
    }

    pub fn new(start_draw_call: u64, draw_call_count: u64, output_file_prefix: String) -> Self {
        Self {
            start_draw_call,
            draw_call_count,
            last_draw_call: start_draw_call + draw_call_count,
            output_file_prefix,
        }
    }

    /// True when the given draw ordinal falls inside the capture window.
    pub fn in_window(&self, draw_call: u64) -> bool {
        draw_call >= self.start_draw_call && draw_call <= self.last_draw_call
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => match value.parse::<u64>() {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!(name, value, %err, "malformed numeric setting");
                panic!("{name}={value:?} is not a valid u64");
            }
        },
        Err(_) => default,
    }
}
