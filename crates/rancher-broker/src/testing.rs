//! Shared fixtures for unit tests.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rancher_models::SessionMode;
use tracing::subscriber::DefaultGuard;

use crate::pipeline::Pipeline;
use crate::retry::{NoBackoff, RetryConfig};
use crate::transport::Transport;

/// Three retries, no backoff, short timeouts.
pub fn transport() -> Transport {
    let retry = RetryConfig::builder()
        .max_retries(3)
        .backoff(NoBackoff)
        .total_timeout(Duration::from_secs(10))
        .build();
    Transport::with_timeout(Duration::from_secs(5), retry).expect("test client")
}

pub fn pipeline(mode: SessionMode) -> Pipeline {
    Pipeline::new(Arc::new(transport()), mode)
}

/// Formatted log output of the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events here until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
