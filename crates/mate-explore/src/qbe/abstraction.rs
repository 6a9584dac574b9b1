//! Abstraction functions mapping concrete states and actions onto the small
//! fixed index ranges of a Q-matrix.
//!
//! Every function here is pure: equal inputs always yield the same index.

use std::collections::BTreeMap;

use mate_model::graph::LogicalState;
use mate_model::observation::{Action, ActionKind};

/// Number of abstract action buckets in the standard table.
pub const ABSTRACT_ACTIONS: usize = 7;

/// The standard kind -> bucket table.
///
/// 0 click, 1 long click, 2 text entry, 3 swipe, 4 back,
/// 5 menu, 6 system (keys, restart, intents).
pub const STANDARD_ACTION_TABLE: [(ActionKind, usize); 18] = [
    (ActionKind::Click, 0),
    (ActionKind::LongClick, 1),
    (ActionKind::TypeText, 2),
    (ActionKind::ClearText, 2),
    (ActionKind::SwipeUp, 3),
    (ActionKind::SwipeDown, 3),
    (ActionKind::SwipeLeft, 3),
    (ActionKind::SwipeRight, 3),
    (ActionKind::Back, 4),
    (ActionKind::Menu, 5),
    (ActionKind::Enter, 6),
    (ActionKind::DpadUp, 6),
    (ActionKind::DpadDown, 6),
    (ActionKind::DpadLeft, 6),
    (ActionKind::DpadRight, 6),
    (ActionKind::DpadCenter, 6),
    (ActionKind::Restart, 6),
    (ActionKind::Intent, 6),
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AbstractionError {
    #[error("abstraction size must be > 0")]
    EmptyRange,

    #[error("action kind {0} has no abstract index")]
    MissingKind(ActionKind),

    #[error("action kind {kind} maps to {index}, outside [0, {size})")]
    IndexOutOfRange {
        kind: ActionKind,
        index: usize,
        size: usize,
    },
}

/// Abstraction of logical states onto `[0, size)`.
pub trait StateAbstraction {
    fn size(&self) -> usize;
    fn index(&self, state: &LogicalState) -> usize;
}

/// Abstract state = number of enabled actions, saturating at `size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCountAbstraction {
    size: usize,
}

impl ActionCountAbstraction {
    pub fn new(size: usize) -> Result<Self, AbstractionError> {
        if size == 0 {
            return Err(AbstractionError::EmptyRange);
        }
        Ok(Self { size })
    }
}

impl StateAbstraction for ActionCountAbstraction {
    fn size(&self) -> usize {
        self.size
    }

    fn index(&self, state: &LogicalState) -> usize {
        state.observation().enabled_actions().min(self.size - 1)
    }
}

/// Abstract state = hash of package and activity, modulo `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityAbstraction {
    size: usize,
}

impl ActivityAbstraction {
    pub fn new(size: usize) -> Result<Self, AbstractionError> {
        if size == 0 {
            return Err(AbstractionError::EmptyRange);
        }
        Ok(Self { size })
    }
}

impl StateAbstraction for ActivityAbstraction {
    fn size(&self) -> usize {
        self.size
    }

    fn index(&self, state: &LogicalState) -> usize {
        let obs = state.observation();
        (screen_hash(&obs.package, &obs.activity) % self.size as u64) as usize
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over `package`, a zero byte, then `activity`. Stable across
/// builds and platforms, so stored Q-matrices keep their row meaning.
fn screen_hash(package: &str, activity: &str) -> u64 {
    package
        .bytes()
        .chain(std::iter::once(0))
        .chain(activity.bytes())
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

/// Explicit, exhaustive table from action kind to abstract action index.
///
/// Completeness and range are checked at construction, so lookups cannot
/// miss afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAbstraction {
    table: BTreeMap<ActionKind, usize>,
    size: usize,
}

impl ActionAbstraction {
    pub fn new(
        entries: impl IntoIterator<Item = (ActionKind, usize)>,
        size: usize,
    ) -> Result<Self, AbstractionError> {
        if size == 0 {
            return Err(AbstractionError::EmptyRange);
        }
        let table: BTreeMap<ActionKind, usize> = entries.into_iter().collect();
        for kind in ActionKind::ALL {
            match table.get(&kind) {
                None => return Err(AbstractionError::MissingKind(kind)),
                Some(&index) if index >= size => {
                    return Err(AbstractionError::IndexOutOfRange { kind, index, size })
                }
                Some(_) => {}
            }
        }
        Ok(Self { table, size })
    }

    /// The standard 7-bucket table.
    pub fn standard() -> Result<Self, AbstractionError> {
        Self::new(STANDARD_ACTION_TABLE, ABSTRACT_ACTIONS)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn index(&self, action: &Action) -> usize {
        // Every kind is present: checked in `new`.
        self.table[&action.kind]
    }
}
