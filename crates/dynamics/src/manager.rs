//! Process-wide registry that drives every live structure.
//!
//! The manager holds weak references: dropping the last
//! [`SharedStructure`] handle unregisters a structure implicitly.

use crate::backend::ComputeMethod;
use crate::cadence::{HostCallback, UpdateMethod};
use crate::error::DynamicsError;
use crate::hierarchy::Hierarchy;
use crate::structure::Structure;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

static MANAGER_LIVE: AtomicBool = AtomicBool::new(false);

pub type SharedStructure = Arc<Mutex<Structure>>;

/// Wraps a structure for registration.
#[must_use]
pub fn share(structure: Structure) -> SharedStructure {
    Arc::new(Mutex::new(structure))
}

/// Predicate consulted before each drive; `false` suspends all stepping.
pub type DynamicsGate = Box<dyn Fn() -> bool + Send + Sync>;

pub struct DynamicsManager {
    structures: Vec<Weak<Mutex<Structure>>>,
    default_update_method: UpdateMethod,
    default_compute_method: ComputeMethod,
    gate: Option<DynamicsGate>,
}

impl std::fmt::Debug for DynamicsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicsManager")
            .field("structures", &self.structures.len())
            .field("default_update_method", &self.default_update_method)
            .field("default_compute_method", &self.default_compute_method)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

impl DynamicsManager {
    /// Claims the single manager slot for this process.
    ///
    /// # Errors
    ///
    /// `ManagerAlreadyExists` while another manager is alive.
    pub fn new() -> Result<Self, DynamicsError> {
        if MANAGER_LIVE.swap(true, Ordering::AcqRel) {
            tracing::warn!("refusing to create a second dynamics manager");
            return Err(DynamicsError::ManagerAlreadyExists);
        }
        Ok(Self {
            structures: Vec::new(),
            default_update_method: UpdateMethod::default(),
            default_compute_method: ComputeMethod::default(),
            gate: None,
        })
    }

    /// # Errors
    ///
    /// `DuplicateRegistration` when the structure is already registered.
    pub fn register(&mut self, structure: &SharedStructure) -> Result<(), DynamicsError> {
        self.prune();
        let weak = Arc::downgrade(structure);
        if self.structures.iter().any(|w| w.ptr_eq(&weak)) {
            tracing::warn!("structure is already registered");
            return Err(DynamicsError::DuplicateRegistration);
        }
        self.structures.push(weak);
        tracing::debug!(structures = self.structures.len(), "registered structure");
        Ok(())
    }

    /// # Errors
    ///
    /// `NotRegistered` when the structure was never registered.
    pub fn unregister(&mut self, structure: &SharedStructure) -> Result<(), DynamicsError> {
        let weak = Arc::downgrade(structure);
        let before = self.structures.len();
        self.structures.retain(|w| !w.ptr_eq(&weak));
        if self.structures.len() == before {
            return Err(DynamicsError::NotRegistered);
        }
        Ok(())
    }

    /// Number of registered structures that are still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.structures.iter().filter(|w| w.strong_count() > 0).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&mut self) {
        self.structures.retain(|w| w.strong_count() > 0);
    }

    fn live(&mut self) -> Vec<SharedStructure> {
        self.prune();
        self.structures.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn set_enabled_all(&mut self, hierarchy: &mut Hierarchy, enabled: bool) {
        for structure in self.live() {
            structure.lock().set_enabled(hierarchy, enabled);
        }
    }

    pub fn pause_all(&mut self) {
        for structure in self.live() {
            structure.lock().pause();
        }
    }

    pub fn resume_all(&mut self) {
        for structure in self.live() {
            structure.lock().resume();
        }
    }

    pub fn prewarm_all(&mut self, hierarchy: &mut Hierarchy) {
        for structure in self.live() {
            structure.lock().prewarm(hierarchy);
        }
    }

    #[must_use]
    pub fn default_update_method(&self) -> UpdateMethod {
        self.default_update_method
    }

    /// Sets the update method for every registered structure.
    pub fn set_default_update_method(&mut self, method: UpdateMethod) {
        self.default_update_method = method;
        for structure in self.live() {
            structure.lock().settings.update_method = method;
        }
    }

    #[must_use]
    pub fn default_compute_method(&self) -> ComputeMethod {
        self.default_compute_method
    }

    /// Sets the compute method for every registered structure.
    pub fn set_default_compute_method(&mut self, method: ComputeMethod) {
        self.default_compute_method = method;
        for structure in self.live() {
            structure.lock().settings.compute_method = method;
        }
    }

    pub fn set_gate(&mut self, gate: impl Fn() -> bool + Send + Sync + 'static) {
        self.gate = Some(Box::new(gate));
    }

    pub fn clear_gate(&mut self) {
        self.gate = None;
    }

    #[must_use]
    pub fn dynamics_allowed(&self) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate())
    }

    /// Forwards a host callback to every live structure, in registration
    /// order. Returns how many structures stepped.
    pub fn drive(&mut self, hierarchy: &mut Hierarchy, callback: HostCallback) -> usize {
        if !self.dynamics_allowed() {
            return 0;
        }
        self.live()
            .into_iter()
            .filter(|structure| structure.lock().handle(hierarchy, callback))
            .count()
    }
}

impl Drop for DynamicsManager {
    fn drop(&mut self) {
        MANAGER_LIVE.store(false, Ordering::Release);
    }
}
