//! Peripheral connection state machine.
//!
//! State is the pair `(ConnectionState, TransferState)` plus the operation
//! currently awaiting the link. At most one link operation is outstanding at
//! any time; an intent the machine does not allow is rejected with
//! [`CoreError::InvalidState`] and produces no feedback.
//!
//! ```text
//!  Disconnected --connect--> Connecting --ok--> Connected
//!       ^                        |                 |  \
//!       +-------- refused -------+                 |   send: Idle -> Sending -> Idle
//!       +----------------- disconnect -------------+
//! ```
//!
//! Every operation is split in two: `begin` checks the guard and enters the
//! transitional state before the shell is asked to do anything, and the
//! matching `finish_*` applies the link's answer.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capabilities::{LinkError, LinkStatus};
use crate::model::{ConnectionState, LinkOp, TransferState};
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ControllerStatus {
    pub connection: ConnectionState,
    pub transfer: TransferState,
    pub in_flight: Option<LinkOp>,
}

impl ControllerStatus {
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// Sole mutator of the connection and transfer state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionController {
    status: ControllerStatus,
    /// Cleared by the first seed or the first user-initiated operation.
    awaiting_seed: SeedState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum SeedState {
    #[default]
    Open,
    Closed,
}

impl ConnectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    /// Check the guard for `op` and enter its transitional state.
    pub fn begin(&mut self, op: LinkOp) -> Result<(), CoreError> {
        let current = self.status;

        if op == LinkOp::SendConfiguration && !current.connection.is_connected() {
            return Err(CoreError::NotConnected);
        }

        let allowed = current.in_flight.is_none()
            && match op {
                LinkOp::Connect => current.connection == ConnectionState::Disconnected,
                LinkOp::Disconnect | LinkOp::SendConfiguration => {
                    current.connection.is_connected() && !current.transfer.is_sending()
                }
            };
        if !allowed {
            return Err(self.invalid(op));
        }

        self.awaiting_seed = SeedState::Closed;
        self.status.in_flight = Some(op);
        match op {
            LinkOp::Connect => self.status.connection = ConnectionState::Connecting,
            LinkOp::SendConfiguration => self.status.transfer = TransferState::Sending,
            LinkOp::Disconnect => {}
        }
        debug!(%op, "Link operation started");
        Ok(())
    }

    pub fn finish_connect(&mut self, result: Result<bool, LinkError>) -> Result<(), CoreError> {
        self.settle(LinkOp::Connect)?;
        match result {
            Ok(true) => {
                self.status.connection = ConnectionState::Connected;
                info!("Peripheral connected");
                Ok(())
            }
            Ok(false) => {
                self.status.connection = ConnectionState::Disconnected;
                Err(Self::failure(
                    LinkOp::Connect,
                    "peripheral refused the connection".into(),
                ))
            }
            Err(e) => {
                self.status.connection = ConnectionState::Disconnected;
                Err(Self::failure(LinkOp::Connect, e.to_string()))
            }
        }
    }

    /// Always ends `Disconnected`, whatever the link reports.
    pub fn finish_disconnect(&mut self, result: Result<(), LinkError>) -> Result<(), CoreError> {
        self.settle(LinkOp::Disconnect)?;
        if let Err(e) = result {
            warn!(error = %e, "Link reported a disconnect error; treating as disconnected");
        }
        self.status.connection = ConnectionState::Disconnected;
        info!("Peripheral disconnected");
        Ok(())
    }

    pub fn finish_send(&mut self, result: Result<bool, LinkError>) -> Result<(), CoreError> {
        self.settle(LinkOp::SendConfiguration)?;
        self.status.transfer = TransferState::Idle;
        match result {
            Ok(true) => {
                info!("Configuration delivered");
                Ok(())
            }
            Ok(false) => Err(Self::failure(
                LinkOp::SendConfiguration,
                "peripheral rejected the configuration".into(),
            )),
            Err(e) => Err(Self::failure(LinkOp::SendConfiguration, e.to_string())),
        }
    }

    /// Whether the driver's status mirror may still seed the state. Only the
    /// very first report, arriving before any user-initiated operation, is
    /// ever adopted.
    #[must_use]
    pub fn accepts_seed(&self) -> bool {
        self.awaiting_seed == SeedState::Open && self.status.in_flight.is_none()
    }

    /// Seed the connection state from the driver's mirror. The `connecting`
    /// flag is never adopted: only an outstanding connect may hold the
    /// machine in `Connecting`.
    pub fn adopt_link_status(&mut self, mirror: LinkStatus) -> bool {
        if !self.accepts_seed() {
            debug!(?mirror, "Link status mirror ignored");
            return false;
        }
        self.awaiting_seed = SeedState::Closed;

        let mirrored = if mirror.connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        if mirrored == self.status.connection {
            return false;
        }
        info!(from = %self.status.connection, to = %mirrored, "Seeded from link status mirror");
        self.status.connection = mirrored;
        true
    }

    fn settle(&mut self, op: LinkOp) -> Result<(), CoreError> {
        if self.status.in_flight != Some(op) {
            return Err(self.invalid(op));
        }
        self.status.in_flight = None;
        Ok(())
    }

    fn invalid(&self, op: LinkOp) -> CoreError {
        CoreError::InvalidState {
            op,
            connection: self.status.connection,
            transfer: self.status.transfer,
        }
    }

    fn failure(op: LinkOp, reason: String) -> CoreError {
        warn!(%op, %reason, "Link operation failed");
        CoreError::LinkFailure { op, reason }
    }
}
