/// Installs the platform logger.
///
/// Natively this is `env_logger`, filtered by `RUST_LOG` and defaulting to
/// `info`. On wasm32 records go to the browser console and panics are
/// reported there too. Calling this more than once is harmless.
pub fn init() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if env_logger::Builder::from_env(env).try_init().is_err() {
            log::debug!("Logger already installed");
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::debug!("Logger already installed");
        }
    }
}
