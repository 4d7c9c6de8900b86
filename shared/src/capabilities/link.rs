use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Alarm;

/// The peripheral link as a shell capability.
///
/// The core never talks to the BLE driver itself: it asks the shell to run
/// a [`LinkOperation`] and receives the [`LinkResult`] back as an event. All
/// operations may take arbitrarily long; none of them is abortable once
/// started. A shell that gives up on one resolves it with
/// [`LinkError::Cancelled`].
#[derive(Clone)]
pub struct PeripheralLink<E> {
    context: CapabilityContext<LinkOperation, E>,
}

impl<Ev> Capability<Ev> for PeripheralLink<Ev> {
    type Operation = LinkOperation;
    type MappedSelf<MappedEv> = PeripheralLink<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        PeripheralLink::new(self.context.map_event(f))
    }
}

impl<E> PeripheralLink<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<LinkOperation, E>) -> Self {
        Self { context }
    }

    /// `Ok(false)` means the peripheral refused the connection.
    pub fn connect<F>(&self, callback: F)
    where
        F: FnOnce(Result<bool, LinkError>) -> E + Send + 'static,
    {
        self.request(LinkOperation::Connect, move |result| {
            callback(result.and_then(|output| match output {
                LinkOutput::Connected(connected) => Ok(connected),
                other => Err(LinkError::unexpected("connect", &other)),
            }))
        });
    }

    pub fn disconnect<F>(&self, callback: F)
    where
        F: FnOnce(Result<(), LinkError>) -> E + Send + 'static,
    {
        self.request(LinkOperation::Disconnect, move |result| {
            callback(result.and_then(|output| match output {
                LinkOutput::Disconnected => Ok(()),
                other => Err(LinkError::unexpected("disconnect", &other)),
            }))
        });
    }

    /// Push the full alarm schedule. `Ok(false)` means the peripheral
    /// rejected it.
    pub fn send_configuration<F>(&self, alarms: Vec<Alarm>, callback: F)
    where
        F: FnOnce(Result<bool, LinkError>) -> E + Send + 'static,
    {
        self.request(LinkOperation::SendConfiguration { alarms }, move |result| {
            callback(result.and_then(|output| match output {
                LinkOutput::ConfigurationAccepted(accepted) => Ok(accepted),
                other => Err(LinkError::unexpected("send_configuration", &other)),
            }))
        });
    }

    /// Ask the shell for the driver's best-effort status mirror.
    pub fn query_status<F>(&self, callback: F)
    where
        F: FnOnce(Result<LinkStatus, LinkError>) -> E + Send + 'static,
    {
        self.request(LinkOperation::QueryStatus, move |result| {
            callback(result.and_then(|output| match output {
                LinkOutput::Status(status) => Ok(status),
                other => Err(LinkError::unexpected("query_status", &other)),
            }))
        });
    }

    fn request<F>(&self, operation: LinkOperation, callback: F)
    where
        F: FnOnce(LinkResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LinkOperation {
    Connect,
    Disconnect,
    SendConfiguration { alarms: Vec<Alarm> },
    QueryStatus,
}

impl LinkOperation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::SendConfiguration { .. } => "send_configuration",
            Self::QueryStatus => "query_status",
        }
    }
}

impl Operation for LinkOperation {
    type Output = LinkResult;
}

/// What the driver reports about the link, independent of the core's own
/// state machine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    pub connecting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkOutput {
    Connected(bool),
    Disconnected,
    ConfigurationAccepted(bool),
    Status(LinkStatus),
}

pub type LinkResult = Result<LinkOutput, LinkError>;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LinkError {
    #[error("peripheral unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("operation cancelled by the shell")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("shell answered {operation} with {output}")]
    UnexpectedOutput { operation: String, output: String },
}

impl LinkError {
    fn unexpected(operation: &str, output: &LinkOutput) -> Self {
        Self::UnexpectedOutput {
            operation: operation.to_owned(),
            output: format!("{output:?}"),
        }
    }
}
