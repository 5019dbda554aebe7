//! Process-wide capture state.

use std::sync::atomic::AtomicU64;
use std::sync::OnceLock;

use tracing::info;

use vkscoop_core::logging::init_logging;
use vkscoop_core::CaptureSettings;

pub struct GlobalCapture {
    pub settings: CaptureSettings,
    /// Ordinal source for every draw call submitted in the process.
    pub draw_counter: AtomicU64,
}

static GLOBAL: OnceLock<GlobalCapture> = OnceLock::new();

/// The process-wide capture state, initialized on first use. Logging comes
/// up first so settings parsing can report through it.
pub fn global() -> &'static GlobalCapture {
    GLOBAL.get_or_init(|| {
        init_logging();
        let settings = CaptureSettings::from_env();
        info!(
            start_draw_call = settings.start_draw_call,
            draw_call_count = settings.draw_call_count,
            output_file_prefix = %settings.output_file_prefix,
            "capture window configured"
        );
        GlobalCapture {
            settings,
            draw_counter: AtomicU64::new(0),
        }
    })
}
