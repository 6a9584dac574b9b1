use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QMatrixError {
    #[error("Q-matrix dimensions must be > 0, got {states}x{actions}")]
    EmptyDimensions { states: usize, actions: usize },

    #[error("row {row} has {len} columns, expected {expected}")]
    RaggedRow { row: usize, len: usize, expected: usize },

    #[error("index ({state}, {action}) outside {states}x{actions} matrix")]
    OutOfBounds {
        state: usize,
        action: usize,
        states: usize,
        actions: usize,
    },

    #[error("Q-values must be finite and >= 0, got {0}")]
    InvalidValue(f64),

    #[error("matrix is {found_states}x{found_actions} but abstractions define {expected_states}x{expected_actions}")]
    DimensionMismatch {
        found_states: usize,
        found_actions: usize,
        expected_states: usize,
        expected_actions: usize,
    },
}

/// Dense `states x actions` table of learned action priorities.
///
/// Invariant: every stored value is finite and >= 0. Out-of-range indices
/// are errors, never clamped. Serialized as a list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct QMatrix {
    states: usize,
    actions: usize,
    values: Vec<f64>,
}

impl QMatrix {
    /// All-zero matrix.
    pub fn zeros(states: usize, actions: usize) -> Result<Self, QMatrixError> {
        if states == 0 || actions == 0 {
            return Err(QMatrixError::EmptyDimensions { states, actions });
        }
        Ok(Self {
            states,
            actions,
            values: vec![0.0; states * actions],
        })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, QMatrixError> {
        let states = rows.len();
        let actions = rows.first().map(|r| r.len()).unwrap_or(0);
        if states == 0 || actions == 0 {
            return Err(QMatrixError::EmptyDimensions { states, actions });
        }
        let mut values = Vec::with_capacity(states * actions);
        for (row, cols) in rows.into_iter().enumerate() {
            if cols.len() != actions {
                return Err(QMatrixError::RaggedRow {
                    row,
                    len: cols.len(),
                    expected: actions,
                });
            }
            for v in cols {
                check_value(v)?;
                values.push(v);
            }
        }
        Ok(Self {
            states,
            actions,
            values,
        })
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn actions(&self) -> usize {
        self.actions
    }

    pub fn get(&self, state: usize, action: usize) -> Result<f64, QMatrixError> {
        let idx = self.offset(state, action)?;
        Ok(self.values[idx])
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) -> Result<(), QMatrixError> {
        check_value(value)?;
        let idx = self.offset(state, action)?;
        self.values[idx] = value;
        Ok(())
    }

    pub fn row(&self, state: usize) -> Result<&[f64], QMatrixError> {
        let start = self.offset(state, 0)?;
        Ok(&self.values[start..start + self.actions])
    }

    /// Largest value in a row.
    pub fn max_in_row(&self, state: usize) -> Result<f64, QMatrixError> {
        Ok(self.row(state)?.iter().copied().fold(0.0, f64::max))
    }

    /// One Q-learning step:
    /// `q(s,a) += alpha * (reward + gamma * max q(s',·) - q(s,a))`,
    /// clamped at 0 so the invariant holds for negative rewards.
    pub fn update(
        &mut self,
        state: usize,
        action: usize,
        reward: f64,
        next_state: usize,
        alpha: f64,
        gamma: f64,
    ) -> Result<f64, QMatrixError> {
        let current = self.get(state, action)?;
        let future = self.max_in_row(next_state)?;
        let updated = (current + alpha * (reward + gamma * future - current)).max(0.0);
        self.set(state, action, updated)?;
        Ok(updated)
    }

    /// Reject a matrix whose shape differs from the abstraction ranges.
    pub fn check_dimensions(&self, states: usize, actions: usize) -> Result<(), QMatrixError> {
        if self.states != states || self.actions != actions {
            return Err(QMatrixError::DimensionMismatch {
                found_states: self.states,
                found_actions: self.actions,
                expected_states: states,
                expected_actions: actions,
            });
        }
        Ok(())
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.actions).map(|c| c.to_vec()).collect()
    }

    fn offset(&self, state: usize, action: usize) -> Result<usize, QMatrixError> {
        if state >= self.states || action >= self.actions {
            return Err(QMatrixError::OutOfBounds {
                state,
                action,
                states: self.states,
                actions: self.actions,
            });
        }
        Ok(state * self.actions + action)
    }
}

fn check_value(value: f64) -> Result<(), QMatrixError> {
    if !value.is_finite() || value < 0.0 {
        return Err(QMatrixError::InvalidValue(value));
    }
    Ok(())
}

impl TryFrom<Vec<Vec<f64>>> for QMatrix {
    type Error = QMatrixError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        QMatrix::from_rows(rows)
    }
}

impl From<QMatrix> for Vec<Vec<f64>> {
    fn from(matrix: QMatrix) -> Self {
        matrix.to_rows()
    }
}
