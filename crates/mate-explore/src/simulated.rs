//! A scripted, in-memory app implementing [`Device`]: screens, action edges,
//! crash-inducing actions and flaky resets. Deterministic, for tests and
//! demos.

use std::collections::{BTreeMap, BTreeSet};

use mate_model::observation::{Action, ScreenObservation};

use crate::device::{Device, DeviceError, ExecutionOutcome};

/// Index of a screen in a [`SimulatedApp`].
pub type ScreenId = usize;

#[derive(Debug, Clone)]
pub struct SimulatedApp {
    screens: Vec<ScreenObservation>,
    edges: BTreeMap<(ScreenId, Action), ScreenId>,
    crashes: BTreeSet<(ScreenId, Action)>,
    outbound: BTreeSet<(ScreenId, Action)>,
    initial: ScreenId,
    current: ScreenId,
    crashed: bool,
    seen: BTreeSet<ScreenId>,
    failing_resets: u32,
    executed: u64,
    resets: u64,
}

impl SimulatedApp {
    /// An app whose initial screen is `initial`.
    pub fn new(initial: ScreenObservation) -> Self {
        Self {
            screens: vec![initial],
            edges: BTreeMap::new(),
            crashes: BTreeSet::new(),
            outbound: BTreeSet::new(),
            initial: 0,
            current: 0,
            crashed: false,
            seen: BTreeSet::from([0]),
            failing_resets: 0,
            executed: 0,
            resets: 0,
        }
    }

    pub fn add_screen(&mut self, screen: ScreenObservation) -> ScreenId {
        self.screens.push(screen);
        self.screens.len() - 1
    }

    /// `action` on screen `from` leads to screen `to`. Actions without an
    /// edge leave the screen unchanged.
    pub fn add_edge(&mut self, from: ScreenId, action: Action, to: ScreenId) {
        self.edges.insert((from, action), to);
    }

    /// `action` on screen `from` crashes the app.
    pub fn add_crash(&mut self, from: ScreenId, action: Action) {
        self.crashes.insert((from, action));
    }

    /// `action` on screen `from` leaves the app; the screen stays.
    pub fn add_outbound(&mut self, from: ScreenId, action: Action) {
        self.outbound.insert((from, action));
    }

    /// The next `count` resets fail.
    pub fn fail_next_resets(&mut self, count: u32) {
        self.failing_resets = count;
    }

    pub fn current_screen(&self) -> ScreenId {
        self.current
    }

    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }
}

impl Device for SimulatedApp {
    fn observe(&mut self) -> Result<ScreenObservation, DeviceError> {
        if self.crashed {
            return Err(DeviceError::Observe("app not running".into()));
        }
        self.screens
            .get(self.current)
            .cloned()
            .ok_or_else(|| DeviceError::Observe(format!("no screen {}", self.current)))
    }

    fn execute(&mut self, action: &Action) -> ExecutionOutcome {
        self.executed += 1;
        if self.crashed {
            return ExecutionOutcome::FailureExecutorError;
        }
        let Some(screen) = self.screens.get(self.current) else {
            return ExecutionOutcome::FailureUnknown;
        };
        if !screen.actions.contains(action) {
            return ExecutionOutcome::FailureExecutorError;
        }
        let key = (self.current, action.clone());
        if self.crashes.contains(&key) {
            self.crashed = true;
            return ExecutionOutcome::FailureAppCrash;
        }
        if self.outbound.contains(&key) {
            return ExecutionOutcome::SuccessOutbound;
        }
        match self.edges.get(&key) {
            Some(&to) => {
                self.current = to;
                if self.seen.insert(to) {
                    ExecutionOutcome::SuccessNewState
                } else {
                    ExecutionOutcome::Success
                }
            }
            None => ExecutionOutcome::Success,
        }
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        if self.failing_resets > 0 {
            self.failing_resets -= 1;
            return Err(DeviceError::Reset("simulated reset failure".into()));
        }
        self.resets += 1;
        self.current = self.initial;
        self.crashed = false;
        Ok(())
    }
}
