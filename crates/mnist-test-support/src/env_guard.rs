//! RAII guard for environment variables touched by a test.
//!
//! Pair it with `#[serial(mnist_env)]`: the internal mutex serializes
//! threads inside one test binary, `serial_test` serializes the tests.

use std::env;
use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

/// Snapshot of a set of variables, restored on drop (also on panic).
///
/// Guard every key a test touches with one `EnvGuard`; creating a second
/// guard while the first is alive would wait on the same lock.
#[derive(Debug)]
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Capture `keys` and clear them so the test starts from a known state.
    pub fn new(keys: &[&str]) -> Self {
        let lock = env_lock().lock().unwrap_or_else(|e| e.into_inner());
        let saved = keys.iter().map(|k| (k.to_string(), env::var(k).ok())).collect();
        for key in keys {
            env::remove_var(key);
        }
        Self { saved, _lock: lock }
    }

    pub fn set(&self, key: &str, value: &str) {
        debug_assert!(self.saved.iter().any(|(k, _)| k == key), "{key} is not guarded");
        env::set_var(key, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.saved {
            match old {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
