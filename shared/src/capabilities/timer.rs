use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One-shot timers run by the shell, used to expire feedback messages.
#[derive(Clone)]
pub struct FeedbackTimer<E> {
    context: CapabilityContext<TimerOperation, E>,
}

impl<Ev> Capability<Ev> for FeedbackTimer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = FeedbackTimer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        FeedbackTimer::new(self.context.map_event(f))
    }
}

impl<E> FeedbackTimer<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, E>) -> Self {
        Self { context }
    }

    /// Emit `event()` once `delay` has elapsed on the shell's clock.
    pub fn after<F>(&self, delay: Duration, event: F)
    where
        F: FnOnce() -> E + Send + 'static,
    {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .request_from_shell(TimerOperation::Start { millis })
                .await;
            context.update_app(event());
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOperation {
    Start { millis: u64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOutput {
    Elapsed,
}

impl Operation for TimerOperation {
    type Output = TimerOutput;
}
