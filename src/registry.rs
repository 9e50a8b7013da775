//! Per-kind reference counts for live GPU handles.
//!
//! One table per resource kind maps a raw handle to the number of wrapper
//! values currently aliasing it. An entry with a positive count denotes a
//! live GPU allocation; when the count reaches zero the entry is removed and
//! the releasing caller is responsible for freeing the GPU object.

use std::collections::HashMap;

use crate::device::{RawHandle, ResourceKind};

const KIND_COUNT: usize = ResourceKind::ALL.len();

/// What a release observed; tells the caller whether the object must be freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleaseOutcome {
    /// Other owners remain, or the handle was not tracked at all.
    OwnersRemain,
    /// The count reached zero; the entry is gone and the caller frees.
    LastOwner,
}

#[derive(Default)]
pub(crate) struct HandleRegistry {
    tables: [HashMap<u64, u32>; KIND_COUNT],
}

impl HandleRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Increment the count for a handle, inserting a zero-based entry if it
    /// was absent. Sentinel handles are ignored.
    pub(crate) fn retain(&mut self, kind: ResourceKind, handle: RawHandle) {
        if handle.is_none() {
            return;
        }
        let count = self.tables[kind.index()].entry(handle.0).or_insert(0);
        *count += 1;
        log::trace!("retain {} {} -> {}", kind, handle.get(), *count);
    }

    /// Decrement the count for a handle. Releasing an untracked handle is a
    /// tolerated no-op (double releases happen across temporaries); it is
    /// logged and reported as `OwnersRemain` so the caller never frees twice.
    pub(crate) fn release(&mut self, kind: ResourceKind, handle: RawHandle) -> ReleaseOutcome {
        if handle.is_none() {
            return ReleaseOutcome::OwnersRemain;
        }
        let table = &mut self.tables[kind.index()];
        match table.get_mut(&handle.0) {
            Some(count) if *count > 1 => {
                *count -= 1;
                log::trace!("release {} {} -> {}", kind, handle.get(), *count);
                ReleaseOutcome::OwnersRemain
            }
            Some(_) => {
                table.remove(&handle.0);
                log::trace!("release {} {} -> 0, freeing", kind, handle.get());
                ReleaseOutcome::LastOwner
            }
            None => {
                log::warn!("release of untracked {} handle {}", kind, handle.get());
                ReleaseOutcome::OwnersRemain
            }
        }
    }

    /// Current count for a handle; zero if untracked.
    pub(crate) fn count(&self, kind: ResourceKind, handle: RawHandle) -> u32 {
        self.tables[kind.index()]
            .get(&handle.0)
            .copied()
            .unwrap_or(0)
    }

    /// Number of live handles of a kind.
    pub(crate) fn live(&self, kind: ResourceKind) -> usize {
        self.tables[kind.index()].len()
    }

    /// Remove and return every live handle, for context teardown.
    pub(crate) fn drain_all(&mut self) -> Vec<(ResourceKind, RawHandle)> {
        let mut leaked = Vec::new();
        for kind in ResourceKind::ALL {
            for (&raw, &count) in &self.tables[kind.index()] {
                log::warn!(
                    "context teardown: {} handle {} still has {} owner(s)",
                    kind,
                    raw,
                    count
                );
                leaked.push((kind, RawHandle(raw)));
            }
            self.tables[kind.index()].clear();
        }
        leaked
    }

    /// Log current counts per kind. Diagnostic only.
    pub(crate) fn dump(&self) {
        for kind in ResourceKind::ALL {
            let table = &self.tables[kind.index()];
            if table.is_empty() {
                continue;
            }
            let mut entries: Vec<_> = table.iter().collect();
            entries.sort_by_key(|(raw, _)| **raw);
            let summary: Vec<String> = entries
                .iter()
                .map(|(raw, count)| format!("#{raw}x{count}"))
                .collect();
            log::debug!("{}: {} live [{}]", kind, table.len(), summary.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: RawHandle = RawHandle(1);
    const H2: RawHandle = RawHandle(2);

    #[test]
    fn retain_release_roundtrip() {
        let mut registry = HandleRegistry::new();
        registry.retain(ResourceKind::Texture, H1);
        registry.retain(ResourceKind::Texture, H1);
        assert_eq!(registry.count(ResourceKind::Texture, H1), 2);

        assert_eq!(
            registry.release(ResourceKind::Texture, H1),
            ReleaseOutcome::OwnersRemain
        );
        assert_eq!(
            registry.release(ResourceKind::Texture, H1),
            ReleaseOutcome::LastOwner
        );
        assert_eq!(registry.count(ResourceKind::Texture, H1), 0);
    }

    #[test]
    fn release_of_untracked_handle_is_a_no_op() {
        let mut registry = HandleRegistry::new();
        assert_eq!(
            registry.release(ResourceKind::Texture, H1),
            ReleaseOutcome::OwnersRemain
        );
        // A double release after the last owner freed must not ask for a
        // second free.
        registry.retain(ResourceKind::Texture, H2);
        assert_eq!(
            registry.release(ResourceKind::Texture, H2),
            ReleaseOutcome::LastOwner
        );
        assert_eq!(
            registry.release(ResourceKind::Texture, H2),
            ReleaseOutcome::OwnersRemain
        );
    }

    #[test]
    fn kinds_do_not_share_a_namespace() {
        let mut registry = HandleRegistry::new();
        registry.retain(ResourceKind::Texture, H1);
        registry.retain(ResourceKind::ShaderProgram, H1);
        assert_eq!(registry.count(ResourceKind::Texture, H1), 1);
        assert_eq!(registry.count(ResourceKind::ShaderProgram, H1), 1);

        registry.release(ResourceKind::Texture, H1);
        assert_eq!(registry.count(ResourceKind::ShaderProgram, H1), 1);
    }

    #[test]
    fn sentinel_handles_are_ignored() {
        let mut registry = HandleRegistry::new();
        registry.retain(ResourceKind::Texture, RawHandle::NONE);
        assert_eq!(registry.live(ResourceKind::Texture), 0);
        assert_eq!(
            registry.release(ResourceKind::Texture, RawHandle::NONE),
            ReleaseOutcome::OwnersRemain
        );
    }

    #[test]
    fn drain_reports_leaks() {
        let mut registry = HandleRegistry::new();
        registry.retain(ResourceKind::Texture, H1);
        registry.retain(ResourceKind::MeshBuffers, H2);
        let leaked = registry.drain_all();
        assert_eq!(leaked.len(), 2);
        assert_eq!(registry.live(ResourceKind::Texture), 0);
        assert_eq!(registry.live(ResourceKind::MeshBuffers), 0);
    }
}
