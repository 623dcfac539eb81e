use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::engine::{Decision, Trigger, VisibilityEngine};
use crate::registry::Surface;
use crate::schedule::{ReadinessGate, ReadyHandle, RecheckTimers};

/// Drives a [`VisibilityEngine`] from host events on a single thread.
///
/// Nothing is evaluated until a [`Trigger::Ready`] arrives, either dispatched
/// directly or delivered through a [`ReadinessGate`]. Triggers that arrive
/// earlier are dropped.
pub struct Session<S: Surface> {
    engine: VisibilityEngine,
    surface: S,
    context: RenderContext,
    config: EngineConfig,
    timers: RecheckTimers,
    inbox: Rc<RefCell<VecDeque<Trigger>>>,
    startup: Option<ReadyHandle>,
    started: bool,
    last: Vec<Decision>,
}

impl<S: Surface> Session<S> {
    pub fn new(engine: VisibilityEngine, surface: S, context: RenderContext, config: EngineConfig) -> Self {
        Self {
            engine,
            surface,
            context,
            config,
            timers: RecheckTimers::new(),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            startup: None,
            started: false,
            last: Vec::new(),
        }
    }

    /// Defer the first pass until the configured form container is inserted.
    pub fn defer_until_ready(&mut self, gate: &ReadinessGate) {
        let inbox = Rc::clone(&self.inbox);
        let handle = gate.when_ready(&self.config.form_container, move || {
            inbox.borrow_mut().push_back(Trigger::Ready);
        });
        self.startup = Some(handle);
        self.pump();
    }

    /// Stop waiting for the form container.
    pub fn cancel_startup(&mut self) {
        if let Some(handle) = self.startup.take() {
            handle.cancel();
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_waiting(&self) -> bool {
        self.startup.as_ref().is_some_and(ReadyHandle::is_pending)
    }

    /// Handle a host event, then anything queued by observers.
    pub fn dispatch(&mut self, trigger: Trigger) {
        self.handle(trigger);
        self.pump();
    }

    /// Process triggers delivered by readiness observers.
    pub fn pump(&mut self) {
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            match next {
                Some(trigger) => self.handle(trigger),
                None => break,
            }
        }
    }

    /// Advance the virtual clock, firing any delayed re-checks that came due.
    pub fn advance(&mut self, elapsed: Duration) {
        for trigger in self.timers.advance(elapsed) {
            self.handle(trigger);
        }
        self.pump();
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn engine(&self) -> &VisibilityEngine {
        &self.engine
    }

    /// Decisions of the most recent pass.
    pub fn last_decisions(&self) -> &[Decision] {
        &self.last
    }

    pub fn pending_rechecks(&self) -> usize {
        self.timers.pending()
    }

    fn handle(&mut self, trigger: Trigger) {
        debug!(?trigger, started = self.started, "trigger");
        match trigger {
            Trigger::Ready => {
                self.started = true;
                self.startup = None;
                self.evaluate();
            }
            _ if !self.started => trace!("not ready; trigger dropped"),
            Trigger::Changed { key } => {
                if self.engine.is_controller(&key) {
                    self.evaluate();
                } else {
                    trace!(%key, "not a controller");
                }
            }
            Trigger::Saved => self.timers.schedule(self.config.recheck_delay(), Trigger::Recheck),
            Trigger::Recheck => self.evaluate(),
        }
    }

    fn evaluate(&mut self) {
        self.last = self.engine.evaluate_all(self.context, &mut self.surface);
    }
}
