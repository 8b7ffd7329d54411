//! Payload types exchanged with the window manager

use serde::Deserialize;

/// Window identifier assigned by the window manager (a `con_id`)
pub type WindowId = i64;

/// The `change` field of a window event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    Focus,
    Close,
    /// new, title, move, floating, urgent, mark, ...
    #[serde(other)]
    Other,
}

/// Container part of a window event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventContainer {
    pub id: WindowId,
    /// i3 floating state: `auto_on`, `user_on`, `auto_off`, `user_off`
    #[serde(default)]
    pub floating: Option<String>,
    /// Sway marks floating containers with `floating_con`
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
}

/// A decoded `window` event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeEvent {
    pub change: WindowChange,
    pub container: EventContainer,
}

impl ChangeEvent {
    pub fn container_id(&self) -> WindowId {
        self.container.id
    }

    /// Whether the window the event is about floats
    pub fn is_floating(&self) -> bool {
        let i3_floating = self
            .container
            .floating
            .as_deref()
            .is_some_and(|state| state.ends_with("_on"));
        let sway_floating = self.container.node_type.as_deref() == Some("floating_con");
        i3_floating || sway_floating
    }
}

/// One entry of a RUN_COMMAND reply
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// SUBSCRIBE reply
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeReply {
    pub success: bool,
}

/// What `read_event` found on a subscribed connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmEvent {
    Window(ChangeEvent),
    /// Non-object payload, i.e. a command acknowledgement
    Acknowledgement,
    /// Object payload of another message type
    Other(u32),
}
