use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{FrameAsset, Result};

/// Display slot that a track pushes its current frame into.
pub trait Sprite {
    fn set_asset(&mut self, asset: &FrameAsset) -> Result<()>;
}

/// Shared sprite slot. Clones observe the same state, so the renderer can keep
/// a handle while the scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct SpriteSlot {
    shared: Arc<Mutex<SlotState>>,
}

#[derive(Debug, Default)]
struct SlotState {
    current: Option<FrameAsset>,
    version: u64,
}

impl SpriteSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed frame, if any update happened yet.
    pub fn current(&self) -> Option<FrameAsset> {
        self.lock().current.clone()
    }

    /// Number of updates received so far.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Returns the current frame only if it changed after `seen`, along with
    /// the new version.
    pub fn changed_since(&self, seen: u64) -> Option<(u64, FrameAsset)> {
        let state = self.lock();
        if state.version == seen {
            return None;
        }
        state.current.clone().map(|asset| (state.version, asset))
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // The slot holds plain data; a panicked writer cannot leave it torn.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sprite for SpriteSlot {
    fn set_asset(&mut self, asset: &FrameAsset) -> Result<()> {
        let mut state = self.lock();
        state.current = Some(asset.clone());
        state.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_updates() {
        let slot = SpriteSlot::new();
        let mut writer = slot.clone();
        assert!(slot.current().is_none());

        let frame = FrameAsset::new("a", vec![]);
        writer.set_asset(&frame).unwrap();

        assert!(slot.current().unwrap().same_frame(&frame));
        assert_eq!(slot.version(), 1);
    }

    #[test]
    fn reports_changes_only_once() {
        let mut slot = SpriteSlot::new();
        assert!(slot.changed_since(0).is_none());

        slot.set_asset(&FrameAsset::new("a", vec![])).unwrap();
        let (seen, frame) = slot.changed_since(0).unwrap();
        assert_eq!(frame.label(), "a");
        assert!(slot.changed_since(seen).is_none());
    }
}
