//! Export of the GUI model for visualization and downstream tooling.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::graph::{GuiModel, StateId, Transition};

/// Serializable view of one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub id: StateId,
    pub package: String,
    pub activity: String,
    pub widget_count: usize,
    pub action_count: usize,
}

/// Serializable view of a whole model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub root: Option<StateId>,
    pub states: Vec<StateRecord>,
    pub transitions: Vec<Transition>,
}

impl ModelSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl GuiModel {
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            root: self.root().map(|s| s.id()),
            states: self
                .states()
                .iter()
                .map(|s| StateRecord {
                    id: s.id(),
                    package: s.observation().package.clone(),
                    activity: s.observation().activity.clone(),
                    widget_count: s.observation().widgets.len(),
                    action_count: s.actions().len(),
                })
                .collect(),
            transitions: self.transitions().cloned().collect(),
        }
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph gui_model {\n");
        for state in self.states() {
            let obs = state.observation();
            let shape = if Some(state.id()) == self.root().map(|r| r.id()) {
                "doublecircle"
            } else {
                "circle"
            };
            let _ = writeln!(
                out,
                "    s{} [label=\"S{}\\n{}\", shape={}];",
                state.id(),
                state.id(),
                escape(&obs.activity),
                shape
            );
        }
        for t in self.transitions() {
            let _ = writeln!(
                out,
                "    s{} -> s{} [label=\"{}\"];",
                t.source,
                t.target,
                escape(&t.action.to_string())
            );
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use crate::graph::GuiModel;
    use crate::observation::{Action, ScreenObservation};

    #[test]
    fn test_dot_contains_states_and_edges() {
        let mut model = GuiModel::default();
        let a = model.get_or_create_state(ScreenObservation::new("pkg", "Main"));
        let b = model.get_or_create_state(ScreenObservation::new("pkg", "Say \"hi\""));
        model
            .record_transition(a.id(), b.id(), Action::click("go"))
            .unwrap();

        let dot = model.to_dot();
        assert!(dot.starts_with("digraph gui_model {"));
        assert!(dot.contains("s0 [label=\"S0\\nMain\", shape=doublecircle];"));
        assert!(dot.contains("Say \\\"hi\\\""));
        assert!(dot.contains("s0 -> s1 [label=\"click(go)\"];"));
    }

    #[test]
    fn test_snapshot_roundtrips_through_json() {
        let mut model = GuiModel::default();
        let a = model.get_or_create_state(
            ScreenObservation::new("pkg", "Main").with_action(Action::back()),
        );
        model.record_transition(a.id(), a.id(), Action::back()).unwrap();

        let snapshot = model.snapshot();
        assert_eq!(snapshot.root, Some(0));
        assert_eq!(snapshot.states[0].action_count, 1);

        let json = snapshot.to_json().unwrap();
        let parsed: super::ModelSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
