use hashbrown::HashSet;
use std::sync::{Mutex, OnceLock};

static SEEN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Logs `message` at `level` the first time it is seen in this process.
///
/// Returns whether the message was emitted.
pub fn log_once(level: log::Level, target: &str, message: String) -> bool {
    let seen = SEEN.get_or_init(|| Mutex::new(HashSet::new()));
    let fresh = seen.lock().unwrap().insert(message.clone());
    if fresh {
        log::log!(target: target, level, "{message}");
    }
    fresh
}
