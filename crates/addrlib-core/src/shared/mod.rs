//! Named, process-wide de-duplicated database regions.
//!
//! The first caller to acquire a name becomes its owner and runs the build
//! closure; every other caller attaches to the owner's region. Attachers that
//! arrive while the owner is still building block until the region is
//! published, so nobody ever observes a partially built region.

mod region;

pub use region::Region;

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};

use tracing::{debug, warn};

use crate::error::{Error, Result};

enum SlotState {
    Building,
    Ready(Arc<Region>),
    Failed(String),
}

struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn building() -> Self {
        Self {
            state: Mutex::new(SlotState::Building),
            ready: Condvar::new(),
        }
    }

    fn publish(&self, state: SlotState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        self.ready.notify_all();
    }

    fn wait(&self, name: &str) -> Result<Arc<Region>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while matches!(*state, SlotState::Building) {
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        match &*state {
            SlotState::Ready(region) => Ok(Arc::clone(region)),
            SlotState::Failed(message) => Err(Error::SharedRegionCreationFailed {
                name: name.to_string(),
                message: message.clone(),
            }),
            SlotState::Building => unreachable!("loop exits only once the slot is published"),
        }
    }
}

/// Result of [`SharedCache::acquire`]
#[derive(Debug, Clone)]
pub struct Acquired {
    pub region: Arc<Region>,
    /// `true` for the single caller that built the region
    pub is_owner: bool,
}

/// Registry of named regions.
#[derive(Default)]
pub struct SharedCache {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

/// Publishes a failure if the owner's build closure unwinds.
struct BuildGuard<'a> {
    cache: &'a SharedCache,
    name: &'a str,
    slot: &'a Arc<Slot>,
    finished: bool,
}

impl BuildGuard<'_> {
    fn finish(mut self, state: SlotState) {
        let failed = matches!(state, SlotState::Failed(_));
        self.slot.publish(state);
        if failed {
            self.cache.forget(self.name, self.slot);
        }
        self.finished = true;
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Builder of shared region '{}' did not finish", self.name);
            self.slot
                .publish(SlotState::Failed("owner aborted while building".to_string()));
            self.cache.forget(self.name, self.slot);
        }
    }
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> &'static SharedCache {
        static GLOBAL: OnceLock<SharedCache> = OnceLock::new();
        GLOBAL.get_or_init(SharedCache::new)
    }

    /// Create the region `name` with `build`, or attach to the existing one.
    ///
    /// `build` runs at most once per name while that name is registered. If
    /// it fails, the error goes to the owner, waiting attachers receive
    /// [`Error::SharedRegionCreationFailed`], and the name is released so a
    /// later caller may try again.
    pub fn acquire<F>(&self, name: &str, build: F) -> Result<Acquired>
    where
        F: FnOnce() -> Result<Region>,
    {
        let (slot, is_owner) = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(name) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Arc::new(Slot::building());
                    slots.insert(name.to_string(), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if !is_owner {
            debug!("Attaching to shared region '{}'", name);
            let region = slot.wait(name)?;
            return Ok(Acquired {
                region,
                is_owner: false,
            });
        }

        debug!("Creating shared region '{}'", name);
        let guard = BuildGuard {
            cache: self,
            name,
            slot: &slot,
            finished: false,
        };

        match build() {
            Ok(region) => {
                let region = Arc::new(region);
                guard.finish(SlotState::Ready(Arc::clone(&region)));
                debug!("Published shared region '{}' ({} bytes)", name, region.len());
                Ok(Acquired {
                    region,
                    is_owner: true,
                })
            }
            Err(e) => {
                guard.finish(SlotState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Whether `name` is registered (built or being built)
    pub fn contains(&self, name: &str) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget(&self, name: &str, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(name).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(name);
        }
    }
}
