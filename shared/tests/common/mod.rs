#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use pillbox_core::{
    App, Effect, Event, FixedClock, LinkOperation, LinkResult, Model, SimulatedLink,
    TimerOperation, TimerOutput, ViewModel,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// A test shell: runs the core through `AppTester` and plays the host side
/// of every effect with a `SimulatedLink`.
pub struct Shell {
    app: AppTester<App, Effect>,
    pub model: Model,
    pub link: SimulatedLink,
    link_requests: VecDeque<Request<LinkOperation>>,
    timers: VecDeque<Request<TimerOperation>>,
    pub renders: usize,
}

impl Shell {
    pub fn new(link: SimulatedLink) -> Self {
        Self {
            app: AppTester::default(),
            model: Model::with_clock(Arc::new(FixedClock::new("06:45"))),
            link,
            link_requests: VecDeque::new(),
            timers: VecDeque::new(),
            renders: 0,
        }
    }

    pub fn instant() -> Self {
        Self::new(SimulatedLink::instant())
    }

    pub fn send(&mut self, event: Event) {
        let update = self.app.update(event, &mut self.model);
        self.absorb(update.effects);
        for event in update.events {
            self.send(event);
        }
    }

    pub fn add(&mut self, time: &str, medicine: &str) {
        self.send(Event::DraftTimeChanged { time: time.into() });
        self.send(Event::DraftMedicineChanged {
            medicine: medicine.into(),
        });
        self.send(Event::SubmitAlarm);
    }

    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }

    /// Operations the core asked for that the shell has not answered yet.
    pub fn pending_link(&self) -> Vec<LinkOperation> {
        self.link_requests
            .iter()
            .map(|request| request.operation.clone())
            .collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Answer the oldest link request from the simulated driver.
    pub fn resolve_next_link(&mut self) -> bool {
        let Some(request) = self.link_requests.pop_front() else {
            return false;
        };
        let output = self.link.respond(&request.operation);
        self.resolve_link(request, output);
        true
    }

    /// Answer the oldest link request after the simulated latency.
    pub async fn perform_next_link(&mut self) -> bool {
        let Some(request) = self.link_requests.pop_front() else {
            return false;
        };
        let output = self.link.perform(&request.operation).await;
        self.resolve_link(request, output);
        true
    }

    /// Answer the oldest link request with `output`, bypassing the driver.
    pub fn resolve_next_link_with(&mut self, output: LinkResult) {
        let request = self
            .link_requests
            .pop_front()
            .expect("no pending link request");
        self.resolve_link(request, output);
    }

    /// Answer link requests until none are left.
    pub fn settle(&mut self) {
        while self.resolve_next_link() {}
    }

    pub fn fire_next_timer(&mut self) {
        let mut request = self.timers.pop_front().expect("no pending timer");
        let update = self.app.resolve(&mut request, TimerOutput::Elapsed).unwrap();
        self.absorb(update.effects);
        for event in update.events {
            self.send(event);
        }
    }

    pub fn fire_timers(&mut self) {
        while !self.timers.is_empty() {
            self.fire_next_timer();
        }
    }

    fn resolve_link(&mut self, mut request: Request<LinkOperation>, output: LinkResult) {
        let update = self.app.resolve(&mut request, output).unwrap();
        self.absorb(update.effects);
        for event in update.events {
            self.send(event);
        }
    }

    fn absorb(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render(_) => self.renders += 1,
                Effect::PeripheralLink(request) => self.link_requests.push_back(request),
                Effect::FeedbackTimer(request) => self.timers.push_back(request),
            }
        }
    }
}
