//! Logger initialisation

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::{info, warn};

use crate::config::LoggingConfig;

/// Key under which handlers record the requested file name in the MDC
pub const MDC_FILE_KEY: &str = "file";

/// Initialise log4rs from the configured file, or env_logger if that fails.
pub fn init(config: &LoggingConfig) {
    let path = Path::new(&config.config_file);
    let log4rs_error = if path.exists() {
        match log4rs::init_file(path, Default::default()) {
            Ok(()) => {
                info!("Logging configured from {}", path.display());
                return;
            }
            Err(e) => Some(e.to_string()),
        }
    } else {
        None
    };

    let initialised = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .is_ok();
    if !initialised {
        return;
    }
    match log4rs_error {
        Some(e) => warn!("Invalid log config {}: {}; logging to stderr", path.display(), e),
        None => info!("No log config at {}, logging to stderr", path.display()),
    }
}

/// Run `fut` with the MDC `file` key set to `name`.
///
/// The MDC is thread-local and actix interleaves requests on one worker
/// thread, so the key is set before every poll and removed after it; it is
/// never visible to other requests or left behind once the future finishes.
pub fn in_file_scope<F: Future>(name: impl Into<String>, fut: F) -> FileScope<F> {
    FileScope {
        name: name.into(),
        inner: Box::pin(fut),
    }
}

/// Future returned by [`in_file_scope`]
pub struct FileScope<F> {
    name: String,
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for FileScope<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _guard = MdcFileGuard::insert(&this.name);
        this.inner.as_mut().poll(cx)
    }
}

struct MdcFileGuard;

impl MdcFileGuard {
    fn insert(name: &str) -> Self {
        log_mdc::insert(MDC_FILE_KEY, name);
        MdcFileGuard
    }
}

impl Drop for MdcFileGuard {
    fn drop(&mut self) {
        log_mdc::remove(MDC_FILE_KEY);
    }
}
