use serde::{Deserialize, Serialize};

use crate::capabilities::{LinkError, LinkStatus};
use crate::config::CoreConfig;
use crate::model::AlarmId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // ------------------------------------------------------------------
    // Shell intents
    // ------------------------------------------------------------------
    DraftTimeChanged { time: String },
    DraftMedicineChanged { medicine: String },
    /// Add or update, depending on the editing session.
    SubmitAlarm,
    BeginCreate,
    BeginEdit { id: AlarmId },

    RequestDelete { id: AlarmId },
    ConfirmDelete,
    CancelDelete,

    Connect,
    Disconnect,
    SendConfiguration,
    /// Seed the connection state from the driver at mount.
    SyncLinkStatus,

    DismissFeedback,
    Configure { config: CoreConfig },
    Teardown,

    // ------------------------------------------------------------------
    // Capability continuations (never sent by the shell)
    // ------------------------------------------------------------------
    #[serde(skip)]
    ConnectResolved { result: Result<bool, LinkError> },
    #[serde(skip)]
    DisconnectResolved { result: Result<(), LinkError> },
    #[serde(skip)]
    ConfigurationSent { result: Result<bool, LinkError> },
    #[serde(skip)]
    LinkStatusReported { result: Result<LinkStatus, LinkError> },
    #[serde(skip)]
    FeedbackExpired { generation: u64 },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DraftTimeChanged { .. } => "draft_time_changed",
            Self::DraftMedicineChanged { .. } => "draft_medicine_changed",
            Self::SubmitAlarm => "submit_alarm",
            Self::BeginCreate => "begin_create",
            Self::BeginEdit { .. } => "begin_edit",
            Self::RequestDelete { .. } => "request_delete",
            Self::ConfirmDelete => "confirm_delete",
            Self::CancelDelete => "cancel_delete",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::SendConfiguration => "send_configuration",
            Self::SyncLinkStatus => "sync_link_status",
            Self::DismissFeedback => "dismiss_feedback",
            Self::Configure { .. } => "configure",
            Self::Teardown => "teardown",
            Self::ConnectResolved { .. } => "connect_resolved",
            Self::DisconnectResolved { .. } => "disconnect_resolved",
            Self::ConfigurationSent { .. } => "configuration_sent",
            Self::LinkStatusReported { .. } => "link_status_reported",
            Self::FeedbackExpired { .. } => "feedback_expired",
        }
    }
}
