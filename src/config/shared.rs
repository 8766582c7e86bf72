//! Copy-on-write configuration epochs for concurrent hosts.
//!
//! [`Config`] itself needs `&mut` for every change, so a single thread can
//! never observe a half-applied update. Hosts sharing one configuration
//! across threads wrap it in [`SharedConfig`]: readers take a cheap snapshot
//! of the current epoch, writers publish a modified clone.

use super::Config;
use crate::error::ConfigResult;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Atomically swappable [`Config`].
#[derive(Debug)]
pub struct SharedConfig {
    current: ArcSwap<Config>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// The current epoch. Lookups on it are unaffected by later updates.
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Replace the configuration wholesale.
    pub fn store(&self, config: Config) {
        self.current.store(Arc::new(config));
        debug!("Published new configuration epoch");
    }

    /// Apply `update` to a clone of the current epoch and publish it.
    ///
    /// `update` may run more than once if another writer races this one.
    pub fn update(&self, update: impl Fn(&mut Config)) {
        self.current.rcu(|current| {
            let mut next = Config::clone(current);
            update(&mut next);
            next
        });
        debug!("Published new configuration epoch");
    }

    /// [`Config::get`] against the current epoch.
    pub fn get(&self, key: &str) -> ConfigResult<Option<Value>> {
        self.current.load().get(key)
    }

    /// [`Config::has`] against the current epoch.
    pub fn has(&self, key: &str) -> bool {
        self.current.load().has(key)
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let shared = SharedConfig::new(Config::new().with_source(
            MemorySource::from_value(json!({"greeting": "{= who}"}), 0).unwrap(),
        ));
        shared.update(|config| {
            config.set_variable("who", "world");
        });
        let before = shared.snapshot();

        shared.update(|config| {
            config.set_variable("who", "moon");
        });

        assert_eq!(before.get("greeting").unwrap(), Some(json!("world")));
        assert_eq!(shared.get("greeting").unwrap(), Some(json!("moon")));
    }

    #[test]
    fn test_concurrent_readers() {
        let shared = Arc::new(SharedConfig::from(Config::new().with_source(
            MemorySource::from_value(json!({"n": 1}), 0).unwrap(),
        )));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(shared.has("n"));
                        assert!(shared.get("n").unwrap().is_some());
                    }
                })
            })
            .collect();

        shared.update(|config| {
            config.add_source(MemorySource::from_value(json!({"n": 2}), 10).unwrap());
        });

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(shared.get("n").unwrap(), Some(json!(2)));
    }
}
