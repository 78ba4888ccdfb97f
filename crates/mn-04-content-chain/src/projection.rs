//! # Channel Content Projection
//!
//! Version chains per channel, one document row per channel address.
//! Forward entries grow the chains through [`chain::add_unit`] and
//! [`chain::promote`]; revert entries shrink them through the exact
//! inverses. Removal is transitive: a drained chain drops its content
//! entry, a drained channel drops its row, so replaying a branch and
//! unwinding it leaves the store byte-identical to before.

use std::collections::BTreeMap;

use mn_01_staged_store::{KeyValue, Staged, StagedKv, StoreError};
use serde::{Deserialize, Serialize};
use shared_types::{Address, ContentUnitBody};

use crate::chain::{self, ContentVersionChain};
use crate::codec;

/// Every content version chain of one channel, keyed by content id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelContents {
    pub contents: BTreeMap<u64, ContentVersionChain>,
}

fn channel_key(channel: &str) -> Vec<u8> {
    format!("chn:{}", channel).into_bytes()
}

/// The chain the log guarantees to exist. A miss means the mirror and the
/// log have drifted.
fn known_chain<'a>(
    contents: &'a mut ChannelContents,
    channel: &str,
    content_id: u64,
) -> &'a mut ContentVersionChain {
    match contents.contents.get_mut(&content_id) {
        Some(entry) => entry,
        None => {
            tracing::error!(
                "[mn-04] chain desync: content {} missing from channel {}",
                content_id,
                channel
            );
            panic!("chain desync: unknown content {}", content_id);
        }
    }
}

/// Content version chains of every channel seen in the log.
pub struct ChannelContentProjection<B: KeyValue> {
    kv: StagedKv<B>,
}

impl<B: KeyValue> ChannelContentProjection<B> {
    pub fn open(backing: B) -> Result<Self, StoreError> {
        Ok(ChannelContentProjection {
            kv: StagedKv::open("content", backing)?,
        })
    }

    /// Adds a unit revision to a content's open edit set, creating the
    /// channel row and the chain on first sight.
    pub fn apply_content_unit(
        &mut self,
        channel: &str,
        content_id: u64,
        uri: &str,
        unit: ContentUnitBody,
    ) -> Result<(), StoreError> {
        let mut contents = self.channel_contents(channel)?.unwrap_or_default();
        let entry = contents.contents.entry(content_id).or_default();
        chain::add_unit(entry, uri, unit);
        self.write(channel, &contents)
    }

    /// Removes a unit revision, the exact inverse of
    /// [`apply_content_unit`](Self::apply_content_unit). Drained chains and
    /// channels are removed transitively.
    pub fn revert_content_unit(
        &mut self,
        channel: &str,
        content_id: u64,
        uri: &str,
    ) -> Result<(), StoreError> {
        let mut contents = self.known_channel(channel)?;
        let entry = known_chain(&mut contents, channel, content_id);
        chain::remove_unit(entry, uri);
        if entry.is_empty() {
            contents.contents.remove(&content_id);
        }
        if contents.contents.is_empty() {
            self.kv.delete(channel_key(channel));
            Ok(())
        } else {
            self.write(channel, &contents)
        }
    }

    /// Promotes the most recent revisions of `uris` into a new approved
    /// version of the content's chain.
    pub fn apply_approve(
        &mut self,
        channel: &str,
        content_id: u64,
        uris: &[String],
    ) -> Result<(), StoreError> {
        self.with_chain(channel, content_id, |entry| chain::promote(entry, uris))
    }

    /// Un-approves, the exact inverse of [`apply_approve`](Self::apply_approve)
    /// for the same uris.
    pub fn revert_approve(
        &mut self,
        channel: &str,
        content_id: u64,
        uris: &[String],
    ) -> Result<(), StoreError> {
        self.with_chain(channel, content_id, |entry| chain::demote(entry, uris))
    }

    fn with_chain(
        &mut self,
        channel: &str,
        content_id: u64,
        op: impl FnOnce(&mut ContentVersionChain),
    ) -> Result<(), StoreError> {
        let mut contents = self.known_channel(channel)?;
        let entry = known_chain(&mut contents, channel, content_id);
        op(entry);
        self.write(channel, &contents)
    }

    /// Loads a channel document that the log guarantees to exist.
    fn known_channel(&self, channel: &str) -> Result<ChannelContents, StoreError> {
        match self.channel_contents(channel)? {
            Some(contents) => Ok(contents),
            None => {
                tracing::error!("[mn-04] chain desync: channel {} has no row", channel);
                panic!("chain desync: unknown channel {}", channel);
            }
        }
    }

    fn write(&mut self, channel: &str, contents: &ChannelContents) -> Result<(), StoreError> {
        let bytes = codec::encode("channel contents", contents)?;
        self.kv.put(channel_key(channel), bytes);
        Ok(())
    }

    /// One content's full version chain, oldest first.
    pub fn chain(
        &self,
        channel: &str,
        content_id: u64,
    ) -> Result<Option<ContentVersionChain>, StoreError> {
        Ok(self
            .channel_contents(channel)?
            .and_then(|contents| contents.contents.get(&content_id).cloned()))
    }

    /// Every chain of one channel; `None` for channels never seen.
    pub fn channel_contents(&self, channel: &str) -> Result<Option<ChannelContents>, StoreError> {
        match self.kv.get(&channel_key(channel))? {
            Some(bytes) => Ok(Some(codec::decode("channel contents", &bytes)?)),
            None => Ok(None),
        }
    }

    /// The channel whose content currently references `file_uri`, if any.
    ///
    /// Scans every channel document. The rebalance planner resolves a
    /// handful of uris per pass with this; nothing hot calls it.
    pub fn channel_of_file(&self, file_uri: &str) -> Result<Option<Address>, StoreError> {
        let prefix = b"chn:";
        for (key, value) in self.kv.scan_prefix(prefix)? {
            let contents: ChannelContents = codec::decode("channel contents", &value)?;
            let references = contents.contents.values().any(|chain| {
                chain.iter().any(|version| {
                    version
                        .content_units
                        .values()
                        .any(|unit| unit.file_uris.iter().any(|uri| uri == file_uri))
                })
            });
            if !references {
                continue;
            }
            let channel = String::from_utf8(key[prefix.len()..].to_vec()).map_err(|_| {
                StoreError::corruption("channel key holds a non-utf8 address".to_string())
            })?;
            return Ok(Some(channel));
        }
        Ok(None)
    }

    /// All live rows outside the `meta:` namespace. State-equality hook.
    pub fn rows(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.kv.rows()
    }

    pub fn into_backing(self) -> B {
        self.kv.into_backing()
    }
}

impl<B: KeyValue> Staged for ChannelContentProjection<B> {
    fn name(&self) -> &'static str {
        self.kv.name()
    }

    fn save(&mut self) {
        self.kv.save()
    }

    fn discard(&mut self) {
        self.kv.discard()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.kv.commit()
    }

    fn watermark(&self) -> Option<u64> {
        self.kv.watermark()
    }

    fn set_watermark(&mut self, index: u64) {
        self.kv.set_watermark(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mn_01_staged_store::InMemoryKv;

    fn projection() -> ChannelContentProjection<InMemoryKv> {
        ChannelContentProjection::open(InMemoryKv::new()).unwrap()
    }

    fn unit(author: &str) -> ContentUnitBody {
        ContentUnitBody {
            author_addresses: vec![author.to_string()],
            file_uris: vec![format!("files/{}", author)],
        }
    }

    #[test]
    fn test_first_unit_creates_channel_and_chain() {
        let mut content = projection();
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();

        let chain = content.chain("news", 1).unwrap().unwrap();
        assert_eq!(chain.len(), 1);
        assert!(!chain[0].approved);
        assert!(chain[0].content_units.contains_key("articles/1"));
    }

    #[test]
    fn test_contents_of_one_channel_are_independent() {
        let mut content = projection();
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content
            .apply_content_unit("news", 2, "articles/2", unit("ben"))
            .unwrap();

        let contents = content.channel_contents("news").unwrap().unwrap();
        assert_eq!(contents.contents.len(), 2);
    }

    #[test]
    fn test_revert_removes_drained_content_and_channel() {
        let mut content = projection();
        let before = content.rows().unwrap();

        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content.revert_content_unit("news", 1, "articles/1").unwrap();

        assert_eq!(content.rows().unwrap(), before);
        assert!(content.channel_contents("news").unwrap().is_none());
    }

    #[test]
    fn test_revert_keeps_channel_with_other_contents() {
        let mut content = projection();
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content
            .apply_content_unit("news", 2, "articles/2", unit("ben"))
            .unwrap();

        content.revert_content_unit("news", 2, "articles/2").unwrap();

        let contents = content.channel_contents("news").unwrap().unwrap();
        assert_eq!(contents.contents.len(), 1);
        assert!(contents.contents.contains_key(&1));
    }

    #[test]
    fn test_approve_then_revert_restores_rows_exactly() {
        let mut content = projection();
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content
            .apply_content_unit("news", 1, "articles/2", unit("ben"))
            .unwrap();
        let before = content.rows().unwrap();

        let uris = vec!["articles/1".to_string()];
        content.apply_approve("news", 1, &uris).unwrap();
        content.revert_approve("news", 1, &uris).unwrap();

        assert_eq!(content.rows().unwrap(), before);
    }

    #[test]
    fn test_edit_after_approval_survives_its_revert() {
        let mut content = projection();
        let uris = vec!["articles/1".to_string()];
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content.apply_approve("news", 1, &uris).unwrap();
        content
            .apply_content_unit("news", 1, "articles/2", unit("ben"))
            .unwrap();
        content.revert_approve("news", 1, &uris).unwrap();

        let chain = content.chain("news", 1).unwrap().unwrap();
        assert_eq!(chain.len(), 1);
        assert!(!chain[0].approved);
        assert!(chain[0].content_units.contains_key("articles/1"));
        assert!(chain[0].content_units.contains_key("articles/2"));
    }

    #[test]
    #[should_panic(expected = "chain desync")]
    fn test_revert_against_unknown_channel_is_fatal() {
        let mut content = projection();
        let _ = content.revert_content_unit("news", 1, "articles/1");
    }

    #[test]
    fn test_channels_do_not_interfere() {
        let mut content = projection();
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content
            .apply_content_unit("sports", 1, "scores/1", unit("ben"))
            .unwrap();

        content.revert_content_unit("news", 1, "articles/1").unwrap();

        assert!(content.channel_contents("news").unwrap().is_none());
        assert!(content.channel_contents("sports").unwrap().is_some());
    }

    #[test]
    fn test_channel_of_file_finds_the_referencing_channel() {
        let mut content = projection();
        content
            .apply_content_unit("news", 1, "articles/1", unit("ann"))
            .unwrap();
        content
            .apply_content_unit("sports", 4, "scores/1", unit("ben"))
            .unwrap();

        assert_eq!(
            content.channel_of_file("files/ben").unwrap(),
            Some("sports".to_string())
        );
        assert_eq!(content.channel_of_file("files/nobody").unwrap(), None);
    }
}
