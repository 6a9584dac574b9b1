use mate_model::equivalence::StateEquivalence;
use mate_model::graph::{GuiModel, ModelError};
use mate_model::observation::{Action, Bounds, ScreenObservation, Widget};

fn dialog(button_text: &str) -> ScreenObservation {
    ScreenObservation::new("com.example.notes", "EditorActivity")
        .with_widget(Widget::new("android.widget.FrameLayout", 0))
        .with_widget(Widget::new("android.widget.LinearLayout", 1))
        .with_widget(Widget::new("android.widget.LinearLayout", 2))
        .with_widget(
            Widget::new("android.widget.Button", 3)
                .with_text(button_text)
                .with_bounds(Bounds::new(0, 100, 200, 160)),
        )
        .with_action(Action::click("button1"))
}

#[test]
fn test_cancel_vs_abort_attribute_sensitivity() {
    let cancel_a = dialog("Cancel");
    let cancel_b = dialog("Cancel");
    let abort = dialog("Abort");

    assert!(StateEquivalence::WidgetAttributes.equivalent(&cancel_a, &cancel_b));
    assert!(!StateEquivalence::WidgetAttributes.equivalent(&cancel_a, &abort));
    assert!(StateEquivalence::Widget.equivalent(&cancel_a, &abort));
}

#[test]
fn test_equivalence_is_reflexive_and_symmetric() {
    let screens = [dialog("Cancel"), dialog("Abort"), ScreenObservation::new("other", "X")];
    let levels = [
        StateEquivalence::Package,
        StateEquivalence::Activity,
        StateEquivalence::Widget,
        StateEquivalence::WidgetAttributes,
        StateEquivalence::similarity(0.7).unwrap(),
    ];
    for level in levels {
        for a in &screens {
            assert!(level.equivalent(a, a), "{level:?} not reflexive");
            for b in &screens {
                assert_eq!(level.equivalent(a, b), level.equivalent(b, a));
            }
        }
    }
}

#[test]
fn test_reordered_widgets_are_different_widget_states() {
    // Positional comparison: a list whose equal-looking rows swap places
    // is a different state at the widget level.
    let row = |text: &str, top: i32| {
        Widget::new("android.widget.TextView", 4)
            .with_text(text)
            .with_bounds(Bounds::new(0, top, 100, top + 20))
    };
    let a = ScreenObservation::new("pkg", "List")
        .with_widget(row("alpha", 0))
        .with_widget(row("beta", 20));
    let b = ScreenObservation::new("pkg", "List")
        .with_widget(row("beta", 20))
        .with_widget(row("alpha", 0));

    assert!(!StateEquivalence::Widget.equivalent(&a, &b));
    assert!(!StateEquivalence::WidgetAttributes.equivalent(&a, &b));
    // The feature-vector notion is order insensitive.
    assert!(StateEquivalence::similarity(1.0).unwrap().equivalent(&a, &b));
}

#[test]
fn test_equivalent_observations_share_state_id() {
    let mut model = GuiModel::new(StateEquivalence::Widget);
    let a = model.get_or_create_state(dialog("Cancel"));
    assert!(model.reached_new_state());
    let b = model.get_or_create_state(dialog("Abort"));
    assert!(!model.reached_new_state());
    assert_eq!(a.id(), b.id());
    assert_eq!(model.state_count(), 1);
}

#[test]
fn test_state_ids_strictly_increasing() {
    let mut model = GuiModel::new(StateEquivalence::Activity);
    let mut last = None;
    for activity in ["A", "B", "A", "C", "B", "D"] {
        let state = model.get_or_create_state(ScreenObservation::new("pkg", activity));
        if model.reached_new_state() {
            if let Some(prev) = last {
                assert!(state.id() > prev);
            }
            last = Some(state.id());
        }
    }
    assert_eq!(model.state_count(), 4);
    let ids: Vec<_> = model.states().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[test]
fn test_transition_recording_is_idempotent() {
    let mut model = GuiModel::new(StateEquivalence::Activity);
    let a = model.get_or_create_state(ScreenObservation::new("pkg", "A"));
    let b = model.get_or_create_state(ScreenObservation::new("pkg", "B"));

    assert_eq!(model.record_transition(a.id(), b.id(), Action::click("x")), Ok(true));
    assert_eq!(model.record_transition(a.id(), b.id(), Action::click("x")), Ok(false));
    assert_eq!(model.transition_count(), 1);

    assert_eq!(model.record_transition(a.id(), b.id(), Action::back()), Ok(true));
    assert_eq!(model.transition_count(), 2);
}

#[test]
fn test_transition_with_unknown_state_fails() {
    let mut model = GuiModel::default();
    let a = model.get_or_create_state(ScreenObservation::new("pkg", "A"));
    assert_eq!(
        model.record_transition(a.id(), 42, Action::back()),
        Err(ModelError::UnknownState(42))
    );
    assert_eq!(
        model.record_transition(9, a.id(), Action::back()),
        Err(ModelError::UnknownState(9))
    );
    assert_eq!(model.transition_count(), 0);
}

#[test]
fn test_similarity_threshold_groups_near_duplicates() {
    let base = |extra: &str| {
        ScreenObservation::new("pkg", "Feed")
            .with_widget(Widget::new("Toolbar", 1).with_text("Feed"))
            .with_widget(Widget::new("Button", 2).with_text("Refresh"))
            .with_widget(Widget::new("Button", 2).with_text("Post"))
            .with_widget(Widget::new("TextView", 3).with_text(extra))
    };
    // 3 of 4 features shared: similarity 0.75.
    let mut loose = GuiModel::new(StateEquivalence::similarity(0.7).unwrap());
    let a = loose.get_or_create_state(base("item 1"));
    let b = loose.get_or_create_state(base("item 2"));
    assert_eq!(a.id(), b.id());

    let mut strict = GuiModel::new(StateEquivalence::similarity(0.8).unwrap());
    let a = strict.get_or_create_state(base("item 1"));
    let b = strict.get_or_create_state(base("item 2"));
    assert_ne!(a.id(), b.id());
}
