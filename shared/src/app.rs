//! The Crux app: model, update and view.
//!
//! Intents arrive as [`Event`]s. Link operations and feedback timers are
//! requested from the shell through [`Capabilities`]; their answers come
//! back as continuation events. Once the session is torn down every event
//! is dropped before it can touch the model.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, debug_span, info, warn};

use crate::alarm_store::AlarmStore;
use crate::capabilities::Capabilities;
use crate::controller::{ConnectionController, ControllerStatus};
use crate::delete_gate::DeleteGate;
use crate::editing::{AlarmEditingSession, Clock, CommitOutcome, SystemClock};
use crate::event::Event;
use crate::feedback::FeedbackChannel;
use crate::model::{
    Alarm, AlarmId, ConnectionState, FeedbackKind, FeedbackMessage, LinkOp, TransferState,
};
use crate::session::Session;
use crate::{
    CoreError, MSG_ALARM_ADDED, MSG_ALARM_DELETED, MSG_ALARM_UPDATED, MSG_CONFIG_SENT,
    MSG_CONNECTED, MSG_DISCONNECTED,
};

#[derive(Debug)]
pub struct Model {
    alarms: AlarmStore,
    editing: AlarmEditingSession,
    deletes: DeleteGate,
    link: ConnectionController,
    feedback: FeedbackChannel,
    session: Session,
}

impl Default for Model {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl Model {
    /// A fresh session whose "current time" defaults come from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            alarms: AlarmStore::new(),
            editing: AlarmEditingSession::new(clock),
            deletes: DeleteGate::new(),
            link: ConnectionController::new(),
            feedback: FeedbackChannel::default(),
            session: Session::default(),
        }
    }

    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        self.alarms.list()
    }

    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        self.link.status()
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&FeedbackMessage> {
        self.feedback.current()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftView {
    pub time: String,
    pub medicine: String,
    /// The alarm being edited; `None` while the form creates a new one.
    pub editing: Option<AlarmId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub alarms: Vec<Alarm>,
    pub connection: ConnectionState,
    pub transfer: TransferState,
    pub feedback: Option<FeedbackMessage>,
    pub draft: DraftView,
    pub staged_delete: Option<AlarmId>,
    pub can_toggle_connection: bool,
    pub can_send_configuration: bool,
}

#[derive(Default)]
pub struct App;

impl App {
    fn post(text: &str, kind: FeedbackKind, model: &mut Model, caps: &Capabilities) {
        let generation = model.feedback.post(text, kind);
        caps.feedback_timer
            .after(model.feedback.ttl(), move || Event::FeedbackExpired { generation });
    }

    fn reject(error: &CoreError, model: &mut Model, caps: &Capabilities) {
        if error.kind().is_user_visible() {
            info!(code = error.code(), %error, "Intent failed");
        } else {
            debug!(code = error.code(), %error, "Intent rejected");
        }
        if let Some((text, kind)) = error.user_facing_message() {
            Self::post(text, kind, model, caps);
        }
    }

    fn submit(model: &mut Model, caps: &Capabilities) {
        let outcome = match model.editing.commit(&mut model.alarms) {
            Ok(outcome) => outcome,
            Err(e) => return Self::reject(&e, model, caps),
        };
        debug!(alarm_id = %outcome.alarm().id, "Draft committed");
        let text = match outcome {
            CommitOutcome::Created(_) => MSG_ALARM_ADDED,
            CommitOutcome::Updated(_) => MSG_ALARM_UPDATED,
        };
        Self::post(text, FeedbackKind::Success, model, caps);
    }

    fn begin_edit(id: AlarmId, model: &mut Model, caps: &Capabilities) {
        match model.alarms.get(id) {
            Some(alarm) => model.editing.begin_edit(alarm),
            None => Self::reject(&CoreError::NotFound(id), model, caps),
        }
    }

    fn confirm_delete(model: &mut Model, caps: &Capabilities) {
        if model.deletes.confirm(&mut model.alarms).is_some() {
            Self::post(MSG_ALARM_DELETED, FeedbackKind::Success, model, caps);
        }
    }

    fn start_link_op(op: LinkOp, model: &mut Model, caps: &Capabilities) {
        if let Err(e) = model.link.begin(op) {
            Self::reject(&e, model, caps);
            return;
        }
        let link = &caps.peripheral_link;
        match op {
            LinkOp::Connect => link.connect(|result| Event::ConnectResolved { result }),
            LinkOp::Disconnect => link.disconnect(|result| Event::DisconnectResolved { result }),
            LinkOp::SendConfiguration => {
                // Snapshot; edits made meanwhile go out with the next send.
                let alarms = model.alarms.list().to_vec();
                link.send_configuration(alarms, |result| Event::ConfigurationSent { result });
            }
        }
    }

    fn finish_link_op(
        outcome: Result<(), CoreError>,
        success: (&str, FeedbackKind),
        model: &mut Model,
        caps: &Capabilities,
    ) {
        match outcome {
            Ok(()) => Self::post(success.0, success.1, model, caps),
            Err(e) => Self::reject(&e, model, caps),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let session = model.session().id();
        if !model.session().is_alive() {
            debug!(%session, event = event.name(), "Event dropped after teardown");
            return;
        }
        let span = debug_span!("update", %session, event = event.name());
        let _entered = span.enter();

        match event {
            Event::DraftTimeChanged { time } => model.editing.set_time(time),
            Event::DraftMedicineChanged { medicine } => model.editing.set_medicine(medicine),
            Event::SubmitAlarm => Self::submit(model, caps),
            Event::BeginCreate => model.editing.begin_create(),
            Event::BeginEdit { id } => Self::begin_edit(id, model, caps),

            Event::RequestDelete { id } => {
                model.deletes.request(id);
            }
            Event::ConfirmDelete => Self::confirm_delete(model, caps),
            Event::CancelDelete => {
                model.deletes.cancel();
            }

            Event::Connect => Self::start_link_op(LinkOp::Connect, model, caps),
            Event::Disconnect => Self::start_link_op(LinkOp::Disconnect, model, caps),
            Event::SendConfiguration => {
                Self::start_link_op(LinkOp::SendConfiguration, model, caps);
            }
            Event::ConnectResolved { result } => {
                let outcome = model.link.finish_connect(result);
                Self::finish_link_op(outcome, (MSG_CONNECTED, FeedbackKind::Success), model, caps);
            }
            Event::DisconnectResolved { result } => {
                let outcome = model.link.finish_disconnect(result);
                Self::finish_link_op(outcome, (MSG_DISCONNECTED, FeedbackKind::Info), model, caps);
            }
            Event::ConfigurationSent { result } => {
                let outcome = model.link.finish_send(result);
                Self::finish_link_op(outcome, (MSG_CONFIG_SENT, FeedbackKind::Success), model, caps);
            }

            Event::SyncLinkStatus => {
                if model.link.accepts_seed() {
                    caps.peripheral_link
                        .query_status(|result| Event::LinkStatusReported { result });
                } else {
                    debug!("Connection state already established; status sync skipped");
                }
            }
            Event::LinkStatusReported { result } => match result {
                Ok(mirror) => {
                    model.link.adopt_link_status(mirror);
                }
                Err(e) => warn!(error = %e, "Link status query failed"),
            },

            Event::DismissFeedback => model.feedback.dismiss(),
            Event::FeedbackExpired { generation } => {
                model.feedback.expire(generation);
            }
            Event::Configure { config } => match config.validate() {
                Ok(()) => model.feedback.set_ttl(config.feedback_ttl()),
                Err(e) => warn!(error = %e, "Configuration rejected"),
            },
            Event::Teardown => {
                model.session.teardown();
                info!("Session torn down");
                return;
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        let status = model.status();
        ViewModel {
            alarms: model.alarms().to_vec(),
            connection: status.connection,
            transfer: status.transfer,
            feedback: model.feedback().cloned(),
            draft: DraftView {
                time: model.editing.draft_time().to_owned(),
                medicine: model.editing.draft_medicine().to_owned(),
                editing: model.editing.target(),
            },
            staged_delete: model.deletes.staged(),
            can_toggle_connection: !status.is_busy(),
            can_send_configuration: status.connection.is_connected()
                && !status.is_busy()
                && !model.alarms.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{
        Effect, LinkError, LinkOperation, LinkOutput, LinkStatus, TimerOperation, TimerOutput,
    };
    use crate::config::CoreConfig;
    use crate::editing::FixedClock;
    use crate::{MissingField, MSG_ALARM_NOT_FOUND, MSG_CONNECT_FIRST, MSG_MISSING_FIELDS};
    use crux_core::testing::AppTester;
    use crux_core::Request;

    fn model() -> Model {
        Model::with_clock(Arc::new(FixedClock::new("07:30")))
    }

    fn link_requests(effects: Vec<Effect>) -> Vec<Request<LinkOperation>> {
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::PeripheralLink(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn timer_requests(effects: Vec<Effect>) -> Vec<Request<TimerOperation>> {
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::FeedbackTimer(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn add(app: &AppTester<App, Effect>, model: &mut Model, time: &str, medicine: &str) {
        app.update(Event::DraftTimeChanged { time: time.into() }, model);
        app.update(Event::DraftMedicineChanged { medicine: medicine.into() }, model);
        app.update(Event::SubmitAlarm, model);
    }

    /// Run `Connect` and answer it with `output`, feeding the continuation back.
    fn connect_with(app: &AppTester<App, Effect>, model: &mut Model, output: LinkOutput) {
        let update = app.update(Event::Connect, model);
        let mut request = link_requests(update.effects).pop().unwrap();
        let update = app.resolve(&mut request, Ok(output)).unwrap();
        for event in update.events {
            app.update(event, model);
        }
    }

    #[test]
    fn test_initial_view() {
        let app = AppTester::<App, Effect>::default();
        let view = app.view(&model());

        assert!(view.alarms.is_empty());
        assert_eq!(view.connection, ConnectionState::Disconnected);
        assert_eq!(view.transfer, TransferState::Idle);
        assert_eq!(view.draft.time, "07:30");
        assert_eq!(view.draft.medicine, "");
        assert_eq!(view.draft.editing, None);
        assert!(view.can_toggle_connection);
        assert!(!view.can_send_configuration);
        assert!(view.feedback.is_none());
    }

    #[test]
    fn test_submit_renders_and_arms_expiry() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        app.update(Event::DraftTimeChanged { time: "08:00".into() }, &mut model);
        app.update(
            Event::DraftMedicineChanged {
                medicine: "Paracetamol".into(),
            },
            &mut model,
        );

        let update = app.update(Event::SubmitAlarm, &mut model);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));

        let timers = timer_requests(update.effects);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].operation, TimerOperation::Start { millis: 3000 });
        assert_eq!(model.feedback().unwrap().text, MSG_ALARM_ADDED);
    }

    #[test]
    fn test_feedback_expires_when_timer_fires() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        add(&app, &mut model, "08:00", "Paracetamol");

        let update = app.update(Event::SubmitAlarm, &mut model);
        assert_eq!(model.feedback().unwrap().text, MSG_MISSING_FIELDS);
        let mut timer = timer_requests(update.effects).pop().unwrap();

        let update = app.resolve(&mut timer, TimerOutput::Elapsed).unwrap();
        for event in update.events {
            app.update(event, &mut model);
        }
        assert!(model.feedback().is_none());
    }

    #[test]
    fn test_update_flow() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        add(&app, &mut model, "08:00", "Paracetamol");
        let id = model.alarms()[0].id;

        app.update(Event::BeginEdit { id }, &mut model);
        assert_eq!(app.view(&model).draft.editing, Some(id));
        app.update(Event::DraftTimeChanged { time: "09:00".into() }, &mut model);
        app.update(Event::SubmitAlarm, &mut model);

        assert_eq!(model.alarms()[0].time, "09:00");
        assert_eq!(model.feedback().unwrap().text, MSG_ALARM_UPDATED);
        assert_eq!(app.view(&model).draft.editing, None);
    }

    #[test]
    fn test_begin_edit_unknown_alarm() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        app.update(Event::BeginEdit { id: AlarmId(9) }, &mut model);

        let message = model.feedback().unwrap();
        assert_eq!(message.text, MSG_ALARM_NOT_FOUND);
        assert_eq!(message.kind, FeedbackKind::Error);
        assert_eq!(app.view(&model).draft.editing, None);
    }

    #[test]
    fn test_update_of_deleted_alarm_keeps_draft() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        add(&app, &mut model, "08:00", "Paracetamol");
        let id = model.alarms()[0].id;

        app.update(Event::BeginEdit { id }, &mut model);
        app.update(Event::RequestDelete { id }, &mut model);
        app.update(Event::ConfirmDelete, &mut model);
        app.update(Event::SubmitAlarm, &mut model);

        assert_eq!(model.feedback().unwrap().text, MSG_ALARM_NOT_FOUND);
        let draft = app.view(&model).draft;
        assert_eq!(draft.medicine, "Paracetamol");
        assert_eq!(draft.editing, Some(id));
    }

    #[test]
    fn test_whitespace_medicine_is_accepted() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        add(&app, &mut model, "08:00", " ");

        assert_eq!(model.alarms().len(), 1);
        assert_eq!(model.alarms()[0].medicine, " ");
        assert_eq!(model.feedback().unwrap().text, MSG_ALARM_ADDED);
    }

    #[test]
    fn test_missing_medicine_reports_validation() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        app.update(Event::DraftTimeChanged { time: "10:00".into() }, &mut model);
        app.update(Event::SubmitAlarm, &mut model);

        assert!(model.alarms().is_empty());
        assert_eq!(
            model.editing.commit(&mut model.alarms),
            Err(CoreError::Validation {
                missing: MissingField::Medicine
            })
        );
    }

    #[test]
    fn test_confirm_without_staged_is_silent() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        let update = app.update(Event::ConfirmDelete, &mut model);

        assert!(model.feedback().is_none());
        assert!(timer_requests(update.effects).is_empty());
    }

    #[test]
    fn test_connect_requests_link_and_applies_answer() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();

        let update = app.update(Event::Connect, &mut model);
        assert_eq!(model.status().connection, ConnectionState::Connecting);
        assert!(!app.view(&model).can_toggle_connection);

        let mut request = link_requests(update.effects).pop().unwrap();
        assert_eq!(request.operation, LinkOperation::Connect);

        let update = app
            .resolve(&mut request, Ok(LinkOutput::Connected(true)))
            .unwrap();
        assert_eq!(
            update.events,
            vec![Event::ConnectResolved { result: Ok(true) }]
        );
        for event in update.events {
            app.update(event, &mut model);
        }
        assert_eq!(model.status().connection, ConnectionState::Connected);
        assert_eq!(model.feedback().unwrap().text, MSG_CONNECTED);
    }

    #[test]
    fn test_mismatched_link_answer_fails_connect() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        connect_with(&app, &mut model, LinkOutput::Disconnected);

        assert_eq!(model.status(), ControllerStatus::default());
        assert_eq!(model.feedback().unwrap().text, crate::MSG_CONNECT_FAILED);
    }

    #[test]
    fn test_send_snapshots_current_alarms() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        add(&app, &mut model, "08:00", "Paracetamol");
        connect_with(&app, &mut model, LinkOutput::Connected(true));
        assert!(app.view(&model).can_send_configuration);

        let update = app.update(Event::SendConfiguration, &mut model);
        assert_eq!(model.status().transfer, TransferState::Sending);
        let request = link_requests(update.effects).pop().unwrap();
        assert_eq!(
            request.operation,
            LinkOperation::SendConfiguration {
                alarms: model.alarms().to_vec()
            }
        );
    }

    #[test]
    fn test_send_while_disconnected_warns_without_effect() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        add(&app, &mut model, "08:00", "Paracetamol");

        let update = app.update(Event::SendConfiguration, &mut model);
        assert!(link_requests(update.effects).is_empty());
        let message = model.feedback().unwrap();
        assert_eq!(message.text, MSG_CONNECT_FIRST);
        assert_eq!(message.kind, FeedbackKind::Warning);
    }

    #[test]
    fn test_sync_seeds_only_before_user_operations() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();

        let update = app.update(Event::SyncLinkStatus, &mut model);
        let mut request = link_requests(update.effects).pop().unwrap();
        assert_eq!(request.operation, LinkOperation::QueryStatus);
        let mirror = LinkStatus {
            connected: true,
            connecting: false,
        };
        let update = app
            .resolve(&mut request, Ok(LinkOutput::Status(mirror)))
            .unwrap();
        for event in update.events {
            app.update(event, &mut model);
        }
        assert_eq!(model.status().connection, ConnectionState::Connected);
        assert!(model.feedback().is_none());

        let update = app.update(Event::SyncLinkStatus, &mut model);
        assert!(link_requests(update.effects).is_empty());
    }

    #[test]
    fn test_status_report_failure_changes_nothing() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        app.update(
            Event::LinkStatusReported {
                result: Err(LinkError::Cancelled),
            },
            &mut model,
        );
        assert_eq!(model.status(), ControllerStatus::default());
    }

    #[test]
    fn test_configure_changes_feedback_ttl() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        let config = CoreConfig {
            feedback_ttl_ms: 1200,
            ..CoreConfig::default()
        };
        app.update(Event::Configure { config }, &mut model);
        app.update(Event::SubmitAlarm, &mut model);

        let message = model.feedback().unwrap();
        assert_eq!(message.expires_after, std::time::Duration::from_millis(1200));

        let invalid = CoreConfig {
            feedback_ttl_ms: 0,
            ..CoreConfig::default()
        };
        app.update(Event::Configure { config: invalid }, &mut model);
        assert_eq!(model.feedback.ttl(), std::time::Duration::from_millis(1200));
    }

    #[test]
    fn test_events_after_teardown_are_dropped() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        app.update(Event::Teardown, &mut model);

        let update = app.update(Event::Connect, &mut model);
        assert!(update.effects.is_empty());
        assert_eq!(model.status(), ControllerStatus::default());

        add(&app, &mut model, "08:00", "Paracetamol");
        assert!(model.alarms().is_empty());
        assert!(model.feedback().is_none());
    }

    #[test]
    fn test_view_serializes_for_shell() {
        let app = AppTester::<App, Effect>::default();
        let mut model = model();
        app.update(Event::RequestDelete { id: AlarmId(5) }, &mut model);
        let json = serde_json::to_value(app.view(&model)).unwrap();

        assert_eq!(json["connection"], "disconnected");
        assert_eq!(json["transfer"], "idle");
        assert_eq!(json["staged_delete"], 5);
        assert_eq!(json["draft"]["time"], "07:30");
        assert!(json.get("is_editing").is_none());
    }
}
