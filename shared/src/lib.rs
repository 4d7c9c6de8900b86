//! Shared core for the pill-dispenser companion app.
//!
//! The platform shell renders [`ViewModel`] and forwards user intents as
//! [`Event`]s. Everything with real state-transition complexity lives here:
//! the alarm list, the peripheral connection state machine and the
//! feedback slot that reports each outcome.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alarm_store;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod controller;
pub mod delete_gate;
pub mod editing;
pub mod event;
pub mod feedback;
pub mod model;
pub mod session;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use alarm_store::AlarmStore;
pub use app::{App, DraftView, Model, ViewModel};
pub use capabilities::{
    Capabilities, Effect, FeedbackTimer, LinkError, LinkOperation, LinkOutput, LinkResult,
    LinkStatus, PeripheralLink, SimulatedLink, SimulatedLinkConfig, TimerOperation, TimerOutput,
};
pub use config::{ConfigError, CoreConfig};
pub use controller::{ConnectionController, ControllerStatus};
pub use crux_core::App as CruxApp;
pub use delete_gate::DeleteGate;
pub use editing::{AlarmEditingSession, Clock, CommitOutcome, FixedClock, SystemClock};
pub use event::Event;
pub use feedback::FeedbackChannel;
pub use model::{
    format_time, Alarm, AlarmId, ConnectionState, FeedbackKind, FeedbackMessage, LinkOp,
    TransferState,
};
pub use session::{Session, SessionId};

pub const DEFAULT_FEEDBACK_TTL: Duration = Duration::from_millis(3000);

pub const MSG_ALARM_ADDED: &str = "Alarma agregada con éxito.";
pub const MSG_ALARM_UPDATED: &str = "Alarma actualizada con éxito.";
pub const MSG_ALARM_DELETED: &str = "Alarma eliminada con éxito.";
pub const MSG_MISSING_FIELDS: &str = "Por favor, ingresa una hora y un medicamento.";
pub const MSG_ALARM_NOT_FOUND: &str = "La alarma ya no existe.";
pub const MSG_CONNECTED: &str = "Conectado al pastillero vía Bluetooth.";
pub const MSG_CONNECT_FAILED: &str = "Fallo al conectar con el pastillero.";
pub const MSG_DISCONNECTED: &str = "Desconectado del pastillero.";
pub const MSG_CONNECT_FIRST: &str = "Por favor, conecta el pastillero primero.";
pub const MSG_CONFIG_SENT: &str = "Configuración enviada al pastillero con éxito.";
pub const MSG_CONFIG_SEND_FAILED: &str = "Fallo al enviar la configuración.";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    NotConnected,
    LinkFailure,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::NotConnected => "NOT_CONNECTED",
            Self::LinkFailure => "LINK_FAILURE",
        }
    }

    /// Whether a failure of this kind is reported through the feedback slot.
    /// Rejected intents are expected to be disabled in the UI already.
    #[must_use]
    pub const fn is_user_visible(self) -> bool {
        !matches!(self, Self::InvalidState)
    }
}

/// Which required alarm field was missing on create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Time,
    Medicine,
    Both,
}

impl MissingField {
    /// `None` when both fields are non-empty. Whitespace counts as content.
    #[must_use]
    pub fn check(time: &str, medicine: &str) -> Option<Self> {
        match (time.is_empty(), medicine.is_empty()) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Time),
            (false, true) => Some(Self::Medicine),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("alarm time and medicine are required (missing: {missing:?})")]
    Validation { missing: MissingField },

    #[error("alarm {0} not found")]
    NotFound(AlarmId),

    #[error("{op} not allowed while {connection}/{transfer}")]
    InvalidState {
        op: LinkOp,
        connection: ConnectionState,
        transfer: TransferState,
    },

    #[error("peripheral is not connected")]
    NotConnected,

    #[error("peripheral link failed during {op}: {reason}")]
    LinkFailure { op: LinkOp, reason: String },
}

impl CoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::LinkFailure { .. } => ErrorKind::LinkFailure,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Feedback text and kind for failures the user should see.
    #[must_use]
    pub const fn user_facing_message(&self) -> Option<(&'static str, FeedbackKind)> {
        match self {
            Self::Validation { .. } => Some((MSG_MISSING_FIELDS, FeedbackKind::Error)),
            Self::NotFound(_) => Some((MSG_ALARM_NOT_FOUND, FeedbackKind::Error)),
            Self::NotConnected => Some((MSG_CONNECT_FIRST, FeedbackKind::Warning)),
            Self::LinkFailure { op, .. } => match op {
                LinkOp::Connect => Some((MSG_CONNECT_FAILED, FeedbackKind::Error)),
                LinkOp::SendConfiguration => Some((MSG_CONFIG_SEND_FAILED, FeedbackKind::Error)),
                LinkOp::Disconnect => None,
            },
            Self::InvalidState { .. } => None,
        }
    }
}
