//! Log output for the worker.
//!
//! Everything logs through the `log` facade. Inside the browser the records
//! go to the worker's devtools console.

/// Install the console logger at `level`.
///
/// Safe to call more than once; later calls only adjust the level.
pub fn init(level: log::Level) {
    #[cfg(target_arch = "wasm32")]
    if console_log::init_with_level(level).is_ok() {
        return;
    }

    log::set_max_level(level.to_level_filter());
}
