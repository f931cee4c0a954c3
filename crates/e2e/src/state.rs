//! Cross-context transfer of persisted client-side configuration
//!
//! The system under test keeps its durable configuration in client-local
//! storage, so "two devices sharing a backend" has to be faked: the
//! harness lifts the serialized keys out of the editor context and writes
//! them, untouched, into the display context before its meaningful load.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::browser::Context;
use crate::error::{HarnessError, HarnessResult};

/// Persisted-store key holding the screens collection
pub const SCREENS_KEY: &str = "cms_screens";

/// Persisted-store key holding the media-files collection
pub const MEDIA_FILES_KEY: &str = "cms_media_files";

/// Opaque serialized configuration lifted out of one browsing context.
///
/// Values are kept byte-for-byte as read; their schema belongs to the
/// system under test and is never parsed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedState {
    entries: BTreeMap<String, String>,
}

impl CapturedState {
    /// Read `keys` from the context's persisted store. Every key must be
    /// present: the editor flow is expected to have written them, and a
    /// silently missing key would otherwise surface much later as an
    /// empty display.
    pub async fn capture(ctx: &Context, keys: &[&str]) -> HarnessResult<Self> {
        let mut entries = BTreeMap::new();
        for &key in keys {
            let value = ctx
                .local_storage_get(key)
                .await?
                .ok_or_else(|| HarnessError::MissingStateKey(key.to_string()))?;
            debug!("Captured {} ({} bytes)", key, value.len());
            entries.insert(key.to_string(), value);
        }
        Ok(Self { entries })
    }

    /// Write every captured key into the target context's store, verbatim.
    /// The caller must reload the target page afterwards: the display
    /// surface reads the store at load time, not reactively.
    pub async fn inject(&self, ctx: &Context) -> HarnessResult<()> {
        for (key, value) in &self.entries {
            ctx.local_storage_set(key, value).await?;
        }
        info!(
            "Injected {} persisted key(s) into target context",
            self.entries.len()
        );
        Ok(())
    }

    /// The captured serialized value for `key`, if it was captured.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_from(pairs: &[(&str, &str)]) -> CapturedState {
        CapturedState {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn values_are_preserved_byte_for_byte() {
        let screens =
            r#"[{"id":"screen-1","assignedFolder":"eventos","name":"Pantalla \"1\""}]"#;
        let media = r#"[{"url":"blob:http://localhost/uno","type":"image/png"}]"#;

        let state = state_from(&[(SCREENS_KEY, screens), (MEDIA_FILES_KEY, media)]);

        assert_eq!(state.get(SCREENS_KEY), Some(screens));
        assert_eq!(state.get(MEDIA_FILES_KEY), Some(media));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn uncaptured_key_reads_as_none() {
        let state = state_from(&[(SCREENS_KEY, "[]")]);
        assert_eq!(state.get(MEDIA_FILES_KEY), None);
    }

    #[test]
    fn non_ascii_payloads_survive() {
        let value = r#"[{"name":"promoción de verano ☀"}]"#;
        let state = state_from(&[(MEDIA_FILES_KEY, value)]);
        assert_eq!(state.get(MEDIA_FILES_KEY), Some(value));
    }
}
