//! Screen observations and the actions available from them.
//!
//! A `ScreenObservation` is produced by the device collaborator and never
//! mutated afterwards. Actions are plain values: two observations of the
//! same logical interaction produce equal (and equally hashed) actions.

use serde::{Deserialize, Serialize};

/// Screen rectangle of a widget, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// One widget of the observed hierarchy, flattened in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Widget {
    pub class: String,
    pub depth: u32,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub content_description: String,
    #[serde(default)]
    pub bounds: Bounds,
}

impl Widget {
    pub fn new(class: &str, depth: u32) -> Self {
        Self {
            class: class.to_string(),
            depth,
            resource_id: String::new(),
            text: String::new(),
            content_description: String::new(),
            bounds: Bounds::default(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.content_description = description.to_string();
        self
    }

    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = resource_id.to_string();
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Structural identity: everything except the dynamic text content.
    pub fn same_structure(&self, other: &Widget) -> bool {
        self.class == other.class
            && self.depth == other.depth
            && self.resource_id == other.resource_id
            && self.bounds == other.bounds
    }

    /// Structural identity plus text and content description.
    pub fn same_attributes(&self, other: &Widget) -> bool {
        self.same_structure(other)
            && self.text == other.text
            && self.content_description == other.content_description
    }

    /// Text if present, otherwise the content description.
    pub fn label(&self) -> &str {
        if self.text.is_empty() {
            &self.content_description
        } else {
            &self.text
        }
    }
}

/// Kind of a single interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    LongClick,
    TypeText,
    ClearText,
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    Back,
    Menu,
    Enter,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    DpadCenter,
    Restart,
    Intent,
}

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [ActionKind; 18] = [
        ActionKind::Click,
        ActionKind::LongClick,
        ActionKind::TypeText,
        ActionKind::ClearText,
        ActionKind::SwipeUp,
        ActionKind::SwipeDown,
        ActionKind::SwipeLeft,
        ActionKind::SwipeRight,
        ActionKind::Back,
        ActionKind::Menu,
        ActionKind::Enter,
        ActionKind::DpadUp,
        ActionKind::DpadDown,
        ActionKind::DpadLeft,
        ActionKind::DpadRight,
        ActionKind::DpadCenter,
        ActionKind::Restart,
        ActionKind::Intent,
    ];

    pub fn is_dpad(self) -> bool {
        matches!(
            self,
            ActionKind::DpadUp
                | ActionKind::DpadDown
                | ActionKind::DpadLeft
                | ActionKind::DpadRight
                | ActionKind::DpadCenter
        )
    }

    pub fn is_swipe(self) -> bool {
        matches!(
            self,
            ActionKind::SwipeUp | ActionKind::SwipeDown | ActionKind::SwipeLeft | ActionKind::SwipeRight
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::LongClick => "long_click",
            ActionKind::TypeText => "type_text",
            ActionKind::ClearText => "clear_text",
            ActionKind::SwipeUp => "swipe_up",
            ActionKind::SwipeDown => "swipe_down",
            ActionKind::SwipeLeft => "swipe_left",
            ActionKind::SwipeRight => "swipe_right",
            ActionKind::Back => "back",
            ActionKind::Menu => "menu",
            ActionKind::Enter => "enter",
            ActionKind::DpadUp => "dpad_up",
            ActionKind::DpadDown => "dpad_down",
            ActionKind::DpadLeft => "dpad_left",
            ActionKind::DpadRight => "dpad_right",
            ActionKind::DpadCenter => "dpad_center",
            ActionKind::Restart => "restart",
            ActionKind::Intent => "intent",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single interaction: a UI gesture, an intent, or a virtual control
/// action such as restart.
///
/// `target` identifies the widget (resource id or hierarchy path) for
/// widget actions; `payload` carries typed text or the intent descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            target: None,
            payload: None,
        }
    }

    pub fn on(kind: ActionKind, target: &str) -> Self {
        Self {
            kind,
            target: Some(target.to_string()),
            payload: None,
        }
    }

    pub fn click(target: &str) -> Self {
        Self::on(ActionKind::Click, target)
    }

    pub fn type_text(target: &str, text: &str) -> Self {
        Self {
            kind: ActionKind::TypeText,
            target: Some(target.to_string()),
            payload: Some(text.to_string()),
        }
    }

    pub fn intent(descriptor: &str) -> Self {
        Self {
            kind: ActionKind::Intent,
            target: None,
            payload: Some(descriptor.to_string()),
        }
    }

    pub fn back() -> Self {
        Self::new(ActionKind::Back)
    }

    pub fn menu() -> Self {
        Self::new(ActionKind::Menu)
    }

    pub fn restart() -> Self {
        Self::new(ActionKind::Restart)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(target) = &self.target {
            write!(f, "({target})")?;
        }
        if let Some(payload) = &self.payload {
            write!(f, "[{payload}]")?;
        }
        Ok(())
    }
}

/// Immutable snapshot of the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenObservation {
    pub package: String,
    pub activity: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ScreenObservation {
    pub fn new(package: &str, activity: &str) -> Self {
        Self {
            package: package.to_string(),
            activity: activity.to_string(),
            widgets: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Number of candidate actions offered by this screen.
    pub fn enabled_actions(&self) -> usize {
        self.actions.len()
    }
}
