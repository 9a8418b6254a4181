//! Live configuration channel
//!
//! A fixed-capacity registry of named numeric settings. Writes dispatch to
//! the owning component's change handler synchronously, on the updating
//! thread, before the write returns; nothing is queued or deferred. The
//! persisted backing store stays behind the
//! [`SettingsStore`](canbridge_core::SettingsStore) trait and is replayed
//! through the registry once, at boot.

use canbridge_core::SettingsStore;
use generic_array::{ArrayLength, GenericArray};
use log::debug;

/// A value registered with the configuration channel
pub trait Setting {
    /// Replace the stored value.
    fn set(&mut self, value: i32);

    /// Current stored value.
    fn get(&self) -> i32;

    /// Fired synchronously after every value change performed through the
    /// channel.
    fn changed(&mut self);
}

/// A single registration slot
pub struct Entry<'a> {
    key: &'static str,
    setting: &'a mut dyn Setting,
}

/// Errors that may occur during registration
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterError {
    /// Every slot is taken; grow the registry's capacity parameter
    CapacityExhausted,
    /// The key is already registered
    DuplicateKey,
}

/// Write target does not exist
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownKey;

/// Fixed-capacity settings registry.
///
/// Capacity is a type-level length, e.g. `Settings<U4>`; registration can
/// therefore never allocate and the full set of settings is known at
/// wiring time.
pub struct Settings<'a, N: ArrayLength<Option<Entry<'a>>>> {
    entries: GenericArray<Option<Entry<'a>>, N>,
}

impl<'a, N: ArrayLength<Option<Entry<'a>>>> Settings<'a, N> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: GenericArray::default(),
        }
    }

    /// Attach `setting` to the channel under `key`.
    pub fn register(
        &mut self,
        key: &'static str,
        setting: &'a mut dyn Setting,
    ) -> Result<(), RegisterError> {
        if self.entries.iter().flatten().any(|entry| entry.key == key) {
            return Err(RegisterError::DuplicateKey);
        }
        let slot = self
            .entries
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(RegisterError::CapacityExhausted)?;
        *slot = Some(Entry { key, setting });
        Ok(())
    }

    /// Store `value` into the setting registered under `key` and fire its
    /// change notification before returning.
    pub fn write(&mut self, key: &str, value: i32) -> Result<(), UnknownKey> {
        let entry = self
            .entries
            .iter_mut()
            .flatten()
            .find(|entry| entry.key == key)
            .ok_or(UnknownKey)?;
        entry.setting.set(value);
        entry.setting.changed();
        Ok(())
    }

    /// Current value of the setting registered under `key`.
    pub fn read(&self, key: &str) -> Option<i32> {
        self.entries
            .iter()
            .flatten()
            .find(|entry| entry.key == key)
            .map(|entry| entry.setting.get())
    }

    /// Replay every persisted record into the registry.
    ///
    /// Records whose key is no longer registered are skipped; stale
    /// storage content must not block boot.
    pub fn restore<S: SettingsStore>(&mut self, store: &mut S) {
        store.load(&mut |key, value| {
            if self.write(key, value).is_err() {
                debug!("skipping persisted record for unknown setting {}", key);
            }
        });
    }
}

impl<'a, N: ArrayLength<Option<Entry<'a>>>> Default for Settings<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::Store;
    use generic_array::typenum::consts::{U1, U4};

    #[derive(Default)]
    struct Probe {
        value: i32,
        notifications: u32,
    }

    impl Setting for Probe {
        fn set(&mut self, value: i32) {
            self.value = value;
        }

        fn get(&self) -> i32 {
            self.value
        }

        fn changed(&mut self) {
            self.notifications += 1;
        }
    }

    #[test]
    fn writes_dispatch_to_the_registered_setting() {
        let mut probe = Probe::default();
        let mut settings = Settings::<U4>::new();
        settings.register("clock", &mut probe).unwrap();

        assert_eq!(settings.write("clock", 42), Ok(()));
        assert_eq!(settings.read("clock"), Some(42));

        drop(settings);
        assert_eq!(probe.value, 42);
        assert_eq!(probe.notifications, 1);
    }

    #[test]
    fn unknown_keys_are_reported() {
        let mut probe = Probe::default();
        let mut settings = Settings::<U4>::new();
        settings.register("clock", &mut probe).unwrap();

        assert_eq!(settings.write("uart", 7), Err(UnknownKey));
        assert_eq!(settings.read("uart"), None);
    }

    #[test]
    fn registration_is_bounded_by_capacity() {
        let mut first = Probe::default();
        let mut second = Probe::default();
        let mut settings = Settings::<U1>::new();

        assert_eq!(settings.register("clock", &mut first), Ok(()));
        assert_eq!(
            settings.register("uart", &mut second),
            Err(RegisterError::CapacityExhausted)
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut first = Probe::default();
        let mut second = Probe::default();
        let mut settings = Settings::<U4>::new();

        settings.register("clock", &mut first).unwrap();
        assert_eq!(
            settings.register("clock", &mut second),
            Err(RegisterError::DuplicateKey)
        );
    }

    #[test]
    fn restore_replays_known_records_and_skips_the_rest() {
        let mut probe = Probe::default();
        let mut settings = Settings::<U4>::new();
        settings.register("clock", &mut probe).unwrap();

        let mut store = Store {
            records: &[("clock", 80_000_000), ("termination", 1)],
        };
        settings.restore(&mut store);

        drop(settings);
        assert_eq!(probe.value, 80_000_000);
        assert_eq!(probe.notifications, 1);
    }
}
