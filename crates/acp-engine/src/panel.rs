//! The alarm arming/disarming state machine
//!
//! A panel stores only stable states (`disarmed`, the armed states,
//! `triggered`) plus the timestamp at which the current transition
//! began. The observed state presented to consumers is derived from
//! those fields and the clock: an armed state within its arming window
//! reads as `arming`, a triggered state within its entry delay reads
//! as `pending`. Timer callbacks never carry state; they only prompt a
//! re-derivation, so a stale callback from a superseded transition is
//! harmless by construction (it fails the generation check).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use acp_codes::{CodeError, CodeValidator};
use acp_core::events::StateChangedData;
use acp_core::{
    AlarmState, Context, PanelSnapshot, ATTR_CODE_ARM_REQUIRED, ATTR_CODE_FORMAT, ATTR_NEXT_STATE,
    ATTR_PREVIOUS_STATE,
};
use acp_events::EventBus;
use acp_store::{PanelStore, StoredPanelState};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, trace, warn};

use crate::backend::PanelBackend;
use crate::clock::Clock;
use crate::config::PanelConfig;
use crate::error::{AlarmError, AlarmResult};
use crate::scheduler::Scheduler;

/// Mutable panel state, guarded by the panel's single mutex
///
/// Invariant: `transition_started_at` is `Some` exactly while the
/// panel is inside an arming, pending, or triggered window.
struct PanelInner {
    stable_state: AlarmState,
    previous_state: AlarmState,
    transition_started_at: Option<DateTime<Utc>>,
    /// Bumped on every new transition; scheduled callbacks carry the
    /// generation they were created under and stale ones are no-ops
    generation: u64,
    last_published: Option<PanelSnapshot>,
}

/// A single alarm control panel instance
///
/// All mutation funnels through one internal mutex, serializing direct
/// requests against timer callbacks. Requests never block on timers;
/// they schedule window boundaries and return.
pub struct AlarmPanel {
    config: PanelConfig,
    validator: Arc<dyn CodeValidator>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    bus: Arc<EventBus>,
    store: Option<Arc<PanelStore>>,
    backend: Arc<dyn PanelBackend>,
    inner: Mutex<PanelInner>,
}

impl AlarmPanel {
    /// Create a panel from its configuration and collaborators
    ///
    /// The panel starts disarmed; call [`AlarmPanel::start`] to restore
    /// persisted state and publish the initial snapshot.
    pub fn new(
        config: PanelConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        bus: Arc<EventBus>,
        store: Option<Arc<PanelStore>>,
        backend: Arc<dyn PanelBackend>,
    ) -> Result<Arc<Self>, CodeError> {
        let validator = config.build_validator()?;
        Ok(Arc::new(Self {
            config,
            validator,
            clock,
            scheduler,
            bus,
            store,
            backend,
            inner: Mutex::new(PanelInner {
                stable_state: AlarmState::Disarmed,
                previous_state: AlarmState::Disarmed,
                transition_started_at: None,
                generation: 0,
                last_published: None,
            }),
        }))
    }

    /// The panel's configuration
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Restore persisted state and publish the initial snapshot
    ///
    /// Windows that fully elapsed while the process was down resolve
    /// immediately to their settled state; a window still open at
    /// restore time resumes its countdown from where it left off.
    /// Missing or unreadable storage leaves the panel disarmed.
    pub async fn start(self: &Arc<Self>) {
        let now = self.clock.now();

        let restored = match &self.store {
            Some(store) => match store.load(&self.config.name).await {
                Ok(saved) => saved,
                Err(err) => {
                    warn!(
                        panel = %self.config.name,
                        error = %err,
                        "failed to load persisted panel state, starting disarmed"
                    );
                    None
                }
            },
            None => None,
        };

        let context = Context::new();
        let event = {
            let mut inner = self.lock();
            if let Some(saved) = restored {
                if saved.state.is_stable() && saved.previous_state.is_stable() {
                    inner.stable_state = saved.state;
                    inner.previous_state = saved.previous_state;
                    inner.transition_started_at = saved.transition_started_at;
                } else {
                    warn!(
                        panel = %self.config.name,
                        state = %saved.state,
                        "persisted state is not a stable state, starting disarmed"
                    );
                }
            }

            self.settle(&mut inner, now);
            self.schedule_remaining(&inner, now);
            self.publish(&mut inner, now, &context)
        };

        self.fire(event, context);
        self.persist().await;
    }

    // ------------------------------------------------------------------
    // Public contract
    // ------------------------------------------------------------------

    /// Request a transition to an armed state
    ///
    /// When the panel requires a code for arming, the submitted code
    /// must authorize `(current stable state) -> target`. An accepted
    /// request always restarts the arming window, including re-arming
    /// an already armed or arming panel.
    pub async fn request_arm(
        self: &Arc<Self>,
        target: AlarmState,
        code: Option<&str>,
    ) -> AlarmResult<()> {
        if !target.is_armable() {
            return Err(AlarmError::NotArmable { state: target });
        }

        let now = self.clock.now();
        let context = Context::new();
        let event = {
            let mut inner = self.lock();
            let from = inner.stable_state;

            if self.config.code_arm_required && !self.validator.validate(code, from, target) {
                debug!(panel = %self.config.name, %target, "arm request declined: invalid code");
                return Err(AlarmError::InvalidCode { target });
            }

            inner.previous_state = from;
            inner.stable_state = target;
            inner.generation = inner.generation.wrapping_add(1);

            let arming = self.config.arming_time_for(target);
            if arming > Duration::zero() {
                inner.transition_started_at = Some(now);
                self.schedule_refresh(now + arming, inner.generation, context.child());
            } else {
                inner.transition_started_at = None;
            }

            debug!(panel = %self.config.name, from = %from, to = %target, "arm request accepted");
            self.publish(&mut inner, now, &context)
        };

        self.fire(event, context);
        if let Err(err) = self.backend.send_arm(target, code).await {
            warn!(panel = %self.config.name, error = %err, "backend arm command failed");
        }
        self.persist().await;
        Ok(())
    }

    /// Request a transition to `disarmed`
    ///
    /// Disarming always validates the code when one is configured,
    /// regardless of `code_arm_required`.
    pub async fn request_disarm(self: &Arc<Self>, code: Option<&str>) -> AlarmResult<()> {
        let now = self.clock.now();
        let context = Context::new();
        let event = {
            let mut inner = self.lock();
            let from = inner.stable_state;

            if !self
                .validator
                .validate(code, from, AlarmState::Disarmed)
            {
                debug!(panel = %self.config.name, "disarm request declined: invalid code");
                return Err(AlarmError::InvalidCode {
                    target: AlarmState::Disarmed,
                });
            }

            inner.previous_state = from;
            inner.stable_state = AlarmState::Disarmed;
            inner.transition_started_at = None;
            inner.generation = inner.generation.wrapping_add(1);

            debug!(panel = %self.config.name, from = %from, "disarm request accepted");
            self.publish(&mut inner, now, &context)
        };

        self.fire(event, context);
        if let Err(err) = self.backend.send_disarm(code).await {
            warn!(panel = %self.config.name, error = %err, "backend disarm command failed");
        }
        self.persist().await;
        Ok(())
    }

    /// Report a trigger condition (sensor or physical input)
    ///
    /// No code is required. When the trigger window for the currently
    /// active state is zero, triggering from that state is disabled and
    /// the request is a no-op. After the entry delay the panel reads as
    /// `triggered`, and once the trigger window elapses it reverts to
    /// the previously active state (or `disarmed`, per
    /// `disarm_after_trigger`).
    pub async fn request_trigger(self: &Arc<Self>) -> AlarmResult<()> {
        let now = self.clock.now();
        let context = Context::new();
        let event = {
            let mut inner = self.lock();
            let settled = self.settle(&mut inner, now);

            // While a window is open (arming or pending/triggered) the
            // panel is still effectively in the state it held before
            // the transition began; window lookup and revert use that
            // state, not the one being transitioned to.
            let origin = if inner.transition_started_at.is_some() {
                inner.previous_state
            } else {
                inner.stable_state
            };

            let trigger = self.config.trigger_time_for(origin);
            if trigger <= Duration::zero() {
                debug!(panel = %self.config.name, state = %origin, "trigger disabled for state, ignoring");
                let event = self.publish(&mut inner, now, &context);
                drop(inner);
                self.fire(event, context);
                if settled {
                    self.persist().await;
                }
                return Ok(());
            }

            inner.previous_state = origin;
            inner.stable_state = AlarmState::Triggered;
            inner.transition_started_at = Some(now);
            inner.generation = inner.generation.wrapping_add(1);

            let delay = self.config.delay_time_for(origin);
            if delay > Duration::zero() {
                // Pending -> triggered boundary: re-publish only
                self.schedule_refresh(now + delay, inner.generation, context.child());
            }
            // Trigger window end: auto-revert
            self.schedule_refresh(now + delay + trigger, inner.generation, context.child());

            debug!(panel = %self.config.name, from = %origin, "trigger accepted");
            self.publish(&mut inner, now, &context)
        };

        self.fire(event, context);
        if let Err(err) = self.backend.send_trigger().await {
            warn!(panel = %self.config.name, error = %err, "backend trigger command failed");
        }
        self.persist().await;
        Ok(())
    }

    /// The observed state at the current time
    pub fn observed_state(&self) -> AlarmState {
        self.observed_state_at(self.clock.now())
    }

    /// The observed state at `now`
    ///
    /// Querying past the end of a window settles the stored state the
    /// same way the window's timer callback would, so readers are
    /// consistent even if the callback has not run yet.
    pub fn observed_state_at(&self, now: DateTime<Utc>) -> AlarmState {
        let context = Context::new();
        let (state, event) = {
            let mut inner = self.lock();
            let changed = self.settle(&mut inner, now);
            let state = self.observed(&inner, now);
            let event = if changed {
                self.publish(&mut inner, now, &context)
            } else {
                None
            };
            (state, event)
        };
        self.fire(event, context);
        state
    }

    /// The last explicitly-set stable state
    pub fn stable_state(&self) -> AlarmState {
        self.lock().stable_state
    }

    /// The stable state held before the current transition began
    pub fn previous_state(&self) -> AlarmState {
        self.lock().previous_state
    }

    /// When the current transition began, if one is in progress
    pub fn transition_started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().transition_started_at
    }

    /// The most recently published snapshot
    pub fn last_published(&self) -> Option<PanelSnapshot> {
        self.lock().last_published.clone()
    }

    // ------------------------------------------------------------------
    // Service-style wrappers
    //
    // These match the hosting framework's services: an invalid code is
    // logged and swallowed, never surfaced to the caller.
    // ------------------------------------------------------------------

    /// Arm in away mode
    pub async fn arm_away(self: &Arc<Self>, code: Option<&str>) {
        self.report(self.request_arm(AlarmState::ArmedAway, code).await);
    }

    /// Arm in home mode
    pub async fn arm_home(self: &Arc<Self>, code: Option<&str>) {
        self.report(self.request_arm(AlarmState::ArmedHome, code).await);
    }

    /// Arm in night mode
    pub async fn arm_night(self: &Arc<Self>, code: Option<&str>) {
        self.report(self.request_arm(AlarmState::ArmedNight, code).await);
    }

    /// Arm in vacation mode
    pub async fn arm_vacation(self: &Arc<Self>, code: Option<&str>) {
        self.report(self.request_arm(AlarmState::ArmedVacation, code).await);
    }

    /// Arm with a custom bypass
    pub async fn arm_custom_bypass(self: &Arc<Self>, code: Option<&str>) {
        self.report(self.request_arm(AlarmState::ArmedCustomBypass, code).await);
    }

    /// Disarm the panel
    pub async fn disarm(self: &Arc<Self>, code: Option<&str>) {
        self.report(self.request_disarm(code).await);
    }

    /// Trigger the panel
    pub async fn trigger(self: &Arc<Self>) {
        self.report(self.request_trigger().await);
    }

    fn report(&self, result: AlarmResult<()>) {
        if let Err(err) = result {
            warn!(panel = %self.config.name, error = %err, "alarm command declined");
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, PanelInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Derive the observed state from stored state plus elapsed time
    fn observed(&self, inner: &PanelInner, now: DateTime<Utc>) -> AlarmState {
        match inner.stable_state {
            AlarmState::Triggered => {
                let Some(t0) = inner.transition_started_at else {
                    return AlarmState::Triggered;
                };
                let delay = self.config.delay_time_for(inner.previous_state);
                if now < t0 + delay {
                    return AlarmState::Pending;
                }
                let trigger = self.config.trigger_time_for(inner.previous_state);
                if now < t0 + delay + trigger {
                    return AlarmState::Triggered;
                }
                if self.config.disarm_after_trigger {
                    AlarmState::Disarmed
                } else {
                    inner.previous_state
                }
            }
            state if state.is_armable() => {
                if let Some(t0) = inner.transition_started_at {
                    if now < t0 + self.config.arming_time_for(state) {
                        return AlarmState::Arming;
                    }
                }
                state
            }
            state => state,
        }
    }

    /// Resolve any window that has fully elapsed by `now`
    ///
    /// Returns true when the stored state changed.
    fn settle(&self, inner: &mut PanelInner, now: DateTime<Utc>) -> bool {
        let Some(t0) = inner.transition_started_at else {
            return false;
        };

        match inner.stable_state {
            AlarmState::Triggered => {
                let delay = self.config.delay_time_for(inner.previous_state);
                let trigger = self.config.trigger_time_for(inner.previous_state);
                if now < t0 + delay + trigger {
                    return false;
                }
                let settled = if self.config.disarm_after_trigger {
                    AlarmState::Disarmed
                } else {
                    inner.previous_state
                };
                debug!(
                    panel = %self.config.name,
                    to = %settled,
                    "trigger window elapsed, reverting"
                );
                inner.stable_state = settled;
                inner.transition_started_at = None;
                inner.generation = inner.generation.wrapping_add(1);
                true
            }
            state if state.is_armable() => {
                if now < t0 + self.config.arming_time_for(state) {
                    return false;
                }
                debug!(panel = %self.config.name, state = %state, "arming window elapsed");
                inner.transition_started_at = None;
                inner.generation = inner.generation.wrapping_add(1);
                true
            }
            _ => {
                // A disarmed panel has no window to sit in
                inner.transition_started_at = None;
                false
            }
        }
    }

    /// Schedule the remaining boundaries of a restored open window
    fn schedule_remaining(self: &Arc<Self>, inner: &PanelInner, now: DateTime<Utc>) {
        let Some(t0) = inner.transition_started_at else {
            return;
        };

        match inner.stable_state {
            AlarmState::Triggered => {
                let pending_until = t0 + self.config.delay_time_for(inner.previous_state);
                if now < pending_until {
                    self.schedule_refresh(pending_until, inner.generation, Context::new());
                }
                let trigger = self.config.trigger_time_for(inner.previous_state);
                self.schedule_refresh(pending_until + trigger, inner.generation, Context::new());
            }
            state if state.is_armable() => {
                self.schedule_refresh(
                    t0 + self.config.arming_time_for(state),
                    inner.generation,
                    Context::new(),
                );
            }
            _ => {}
        }
    }

    /// Schedule a window boundary for the given transition generation
    fn schedule_refresh(self: &Arc<Self>, at: DateTime<Utc>, generation: u64, context: Context) {
        let weak: Weak<AlarmPanel> = Arc::downgrade(self);
        self.scheduler.schedule(
            at,
            Box::pin(async move {
                if let Some(panel) = weak.upgrade() {
                    panel.window_elapsed(generation, context).await;
                }
            }),
        );
    }

    /// Timer callback: re-derive and publish, resolving elapsed windows
    async fn window_elapsed(self: Arc<Self>, generation: u64, context: Context) {
        let now = self.clock.now();
        let (settled, event) = {
            let mut inner = self.lock();
            if inner.generation != generation {
                trace!(panel = %self.config.name, "stale transition timer, ignoring");
                return;
            }
            let settled = self.settle(&mut inner, now);
            (settled, self.publish(&mut inner, now, &context))
        };

        self.fire(event, context);
        if settled {
            self.persist().await;
        }
    }

    /// Build the current snapshot and record it if it changed
    ///
    /// Returns the event to fire after the lock is released, or `None`
    /// when the observed state and attributes are unchanged.
    fn publish(
        &self,
        inner: &mut PanelInner,
        now: DateTime<Utc>,
        context: &Context,
    ) -> Option<StateChangedData> {
        let observed = self.observed(inner, now);

        let mut attributes = HashMap::new();
        attributes.insert(
            ATTR_PREVIOUS_STATE.to_string(),
            json!(inner.previous_state.as_str()),
        );
        let next_state = match observed {
            AlarmState::Arming => Some(inner.stable_state),
            AlarmState::Pending => Some(AlarmState::Triggered),
            _ => None,
        };
        if let Some(next) = next_state {
            attributes.insert(ATTR_NEXT_STATE.to_string(), json!(next.as_str()));
        }
        if let Some(format) = self.validator.code_format() {
            attributes.insert(ATTR_CODE_FORMAT.to_string(), json!(format.as_str()));
        }
        attributes.insert(
            ATTR_CODE_ARM_REQUIRED.to_string(),
            json!(self.config.code_arm_required),
        );

        let snapshot = match &inner.last_published {
            Some(previous) => previous.with_update(observed, attributes, now, context.clone()),
            None => PanelSnapshot::new(
                self.config.name.clone(),
                observed,
                attributes,
                now,
                context.clone(),
            ),
        };

        if inner.last_published.as_ref() == Some(&snapshot) {
            return None;
        }

        let old_state = inner.last_published.replace(snapshot.clone());
        Some(StateChangedData {
            panel: self.config.name.clone(),
            old_state,
            new_state: snapshot,
        })
    }

    fn fire(&self, event: Option<StateChangedData>, context: Context) {
        if let Some(event) = event {
            self.bus.fire_typed(event, context);
        }
    }

    /// Write the stable state triple to the store, if one is attached
    async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let stored = {
            let inner = self.lock();
            StoredPanelState {
                state: inner.stable_state,
                previous_state: inner.previous_state,
                transition_started_at: inner.transition_started_at,
            }
        };
        if let Err(err) = store.save(&self.config.name, &stored).await {
            warn!(
                panel = %self.config.name,
                error = %err,
                "failed to persist panel state"
            );
        }
    }
}
