//! The tracking state machine and its public engine facade.
//!
//! All session state lives in a single-writer core guarded by one mutex.
//! Both event sources — the fix stream drained from the location provider
//! and the 1 Hz session clock — lock the core, mutate, snapshot, unlock,
//! and broadcast, so the two are serialized no matter which threads they
//! arrive on.

use crate::location::provider::LocationProvider;
use crate::location::types::{GpsSignal, LocationError, LocationFix};
use crate::metrics::calories::estimate_calories;
use crate::tracking::autopause::{AutoPauseDetector, AutoPauseEvent};
use crate::tracking::clock::SessionClock;
use crate::tracking::filters::{pace_from_speed, FixOutcome, LocationFilter};
use crate::tracking::hub::{SubscriptionHub, SubscriptionToken};
use crate::tracking::resources::{SessionResources, StreamEvent};
use crate::tracking::segments::{SegmentAlert, SegmentAlertFn, SegmentTarget, SegmentTrackingState};
use crate::tracking::types::{
    DataSource, SplitMetrics, SportType, TrackedWorkoutMetrics, TrackerConfig, TrackingError,
    TrackingState, TrackingStatus,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;

/// How a start request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartOutcome {
    /// A fresh session was started
    Started,
    /// Same session id, already running: no-op
    AlreadyActive,
}

/// Single-writer session state plus the stateful processing units.
struct SessionCore {
    config: TrackerConfig,
    state: TrackingState,
    filter: LocationFilter,
    autopause: AutoPauseDetector,
    splits: Vec<SplitMetrics>,
    last_split_elapsed: u32,
    alert_fn: Option<SegmentAlertFn>,
}

impl SessionCore {
    fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: TrackingState::default(),
            filter: LocationFilter::new(),
            autopause: AutoPauseDetector::new(),
            splits: Vec::new(),
            last_split_elapsed: 0,
            alert_fn: None,
        }
    }

    fn snapshot(&self) -> TrackingState {
        self.state.clone()
    }

    /// Whether the 1 Hz clock should be driving this state.
    fn is_tickable(&self) -> bool {
        matches!(
            self.state.status,
            TrackingStatus::Tracking | TrackingStatus::SegmentTransition
        )
    }

    fn start(
        &mut self,
        session_id: &str,
        sport_type: SportType,
        targets: Option<Vec<SegmentTarget>>,
        alert_fn: Option<SegmentAlertFn>,
        now: DateTime<Utc>,
    ) -> Result<StartOutcome, TrackingError> {
        match self.state.status {
            TrackingStatus::Tracking
            | TrackingStatus::Paused
            | TrackingStatus::AutoPaused
            | TrackingStatus::SegmentTransition => {
                if self.state.session_id.as_deref() == Some(session_id) {
                    tracing::debug!(session_id, "start ignored, session already active");
                    Ok(StartOutcome::AlreadyActive)
                } else {
                    Err(TrackingError::SessionAlreadyActive(
                        self.state.session_id.clone().unwrap_or_default(),
                    ))
                }
            }
            TrackingStatus::Stopping | TrackingStatus::Summary => {
                Err(TrackingError::InvalidTransition {
                    from: self.state.status,
                })
            }
            TrackingStatus::Idle | TrackingStatus::Countdown => {
                self.reset();
                self.state.status = TrackingStatus::Tracking;
                self.state.session_id = Some(session_id.to_string());
                self.state.sport_type = Some(sport_type);
                self.state.started_at = Some(now);
                self.state.segments = targets
                    .filter(|t| !t.is_empty())
                    .map(|t| SegmentTrackingState::new(t, now));
                self.alert_fn = alert_fn;

                tracing::info!(
                    session_id,
                    sport = %sport_type,
                    structured = self.state.segments.is_some(),
                    "tracking started"
                );
                Ok(StartOutcome::Started)
            }
        }
    }

    fn begin_countdown(&mut self) -> Result<(), TrackingError> {
        if self.state.status != TrackingStatus::Idle {
            return Err(TrackingError::InvalidTransition {
                from: self.state.status,
            });
        }
        self.state.status = TrackingStatus::Countdown;
        Ok(())
    }

    fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TrackingError> {
        if !self.state.status.is_active() {
            return Err(TrackingError::NoActiveSession);
        }
        if self.state.status != TrackingStatus::Tracking {
            return Err(TrackingError::InvalidTransition {
                from: self.state.status,
            });
        }

        self.state.status = TrackingStatus::Paused;
        self.state.paused_at = Some(now);
        self.autopause.reset();
        tracing::info!("tracking paused");
        Ok(())
    }

    fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TrackingError> {
        if !self.state.status.is_active() {
            return Err(TrackingError::NoActiveSession);
        }
        match self.state.status {
            TrackingStatus::Paused | TrackingStatus::AutoPaused => {
                self.credit_pause(now);
                self.state.status = TrackingStatus::Tracking;
                self.autopause.reset();
                tracing::info!("tracking resumed");
                Ok(())
            }
            _ => Err(TrackingError::InvalidTransition {
                from: self.state.status,
            }),
        }
    }

    fn stop(&mut self, now: DateTime<Utc>) -> Result<TrackedWorkoutMetrics, TrackingError> {
        if !self.state.status.is_active() {
            return Err(TrackingError::NoActiveSession);
        }

        self.state.status = TrackingStatus::Stopping;
        self.credit_pause(now);

        let sport_type = self.state.sport_type.unwrap_or(SportType::Other);
        let metrics = TrackedWorkoutMetrics {
            session_id: self.state.session_id.clone().unwrap_or_default(),
            sport_type,
            duration_seconds: self.state.elapsed_seconds,
            total_paused_seconds: self.state.total_paused_seconds,
            distance_meters: self.state.distance_meters,
            average_pace_secs_per_km: self.state.average_pace_secs_per_km,
            average_speed_kmh: self.state.average_speed_kmh,
            elevation_gain_meters: self.state.elevation_gain_meters,
            elevation_loss_meters: self.state.elevation_loss_meters,
            calories: estimate_calories(
                sport_type,
                self.config.weight_kg,
                self.state.elapsed_seconds,
            ),
            data_source: DataSource::LiveTracking,
            started_at: self.state.started_at.unwrap_or(now),
            completed_at: now,
            splits: self.splits.clone(),
            segments: self.state.segments.as_ref().map(|s| s.segments.clone()),
        };

        self.state.status = TrackingStatus::Summary;
        tracing::info!(
            session_id = %metrics.session_id,
            distance_m = metrics.distance_meters,
            duration_s = metrics.duration_seconds,
            "tracking stopped"
        );
        Ok(metrics)
    }

    fn discard(&mut self) {
        if self.state.status != TrackingStatus::Idle {
            tracing::info!("tracking discarded");
        }
        self.reset();
    }

    fn skip_segment(&mut self, now: DateTime<Utc>) -> Result<(), TrackingError> {
        if !self.state.status.is_active() {
            return Err(TrackingError::NoActiveSession);
        }
        if self.state.segments.is_none() {
            return Err(TrackingError::NoSegmentPlan);
        }
        if !matches!(
            self.state.status,
            TrackingStatus::Tracking | TrackingStatus::SegmentTransition
        ) {
            return Err(TrackingError::InvalidTransition {
                from: self.state.status,
            });
        }

        let mut alerts = Vec::new();
        if let Some(segments) = self.state.segments.as_mut() {
            alerts = segments.skip(now);
        }
        self.state.status = TrackingStatus::Tracking;
        self.fire_alerts(alerts);
        Ok(())
    }

    fn toggle_auto_advance(&mut self) -> Result<bool, TrackingError> {
        if !self.state.status.is_active() {
            return Err(TrackingError::NoActiveSession);
        }
        let Some(segments) = self.state.segments.as_mut() else {
            return Err(TrackingError::NoSegmentPlan);
        };
        segments.auto_advance = !segments.auto_advance;
        tracing::debug!(auto_advance = segments.auto_advance, "auto-advance toggled");
        Ok(segments.auto_advance)
    }

    /// One second of clock time.
    fn tick(&mut self, now: DateTime<Utc>) {
        match self.state.status {
            TrackingStatus::Tracking => {
                self.state.elapsed_seconds += 1;

                let mut alerts = Vec::new();
                let mut entered_transition = false;
                if let Some(segments) = self.state.segments.as_mut() {
                    alerts = segments.on_tick(now);
                    entered_transition = segments.in_transition();
                }
                if entered_transition {
                    self.state.status = TrackingStatus::SegmentTransition;
                }
                self.recompute_averages();
                self.fire_alerts(alerts);
            }
            TrackingStatus::SegmentTransition => {
                let mut alerts = Vec::new();
                let mut back_to_tracking = false;
                if let Some(segments) = self.state.segments.as_mut() {
                    alerts = segments.on_countdown_tick(now);
                    back_to_tracking = !segments.in_transition();
                } else {
                    back_to_tracking = true;
                }
                if back_to_tracking {
                    self.state.status = TrackingStatus::Tracking;
                }
                self.fire_alerts(alerts);
            }
            _ => {}
        }
    }

    /// One fix from the location stream.
    fn handle_fix(&mut self, fix: &LocationFix) {
        match self.state.status {
            TrackingStatus::Tracking | TrackingStatus::SegmentTransition => {
                self.process_moving_fix(fix)
            }
            TrackingStatus::Paused | TrackingStatus::AutoPaused => self.process_paused_fix(fix),
            _ => {}
        }
    }

    fn process_moving_fix(&mut self, fix: &LocationFix) {
        self.state.gps_signal = Some(GpsSignal::from_accuracy(fix.horizontal_accuracy));

        match self.filter.process(fix) {
            FixOutcome::Rejected => {}
            FixOutcome::First => {
                self.state.last_location = Some(fix.clone());
            }
            FixOutcome::Jitter { raw_speed_mps } => {
                self.state.last_location = Some(fix.clone());
                self.apply_autopause(raw_speed_mps, fix.timestamp);
            }
            FixOutcome::Accepted(accepted) => {
                self.state.distance_meters += accepted.distance_delta_m;
                self.state.elevation_gain_meters += accepted.elevation_gain_m;
                self.state.elevation_loss_meters += accepted.elevation_loss_m;
                self.state.current_pace_secs_per_km =
                    pace_from_speed(accepted.smoothed_speed_mps);
                self.state.last_location = Some(fix.clone());

                // Segment distance only accumulates while tracking proper;
                // during the transition countdown the session total still
                // grows but no segment owns the meters.
                let mut alerts = Vec::new();
                let mut entered_transition = false;
                if self.state.status == TrackingStatus::Tracking {
                    if let Some(segments) = self.state.segments.as_mut() {
                        alerts = segments.add_distance(accepted.distance_delta_m, fix.timestamp);
                        entered_transition = segments.in_transition();
                    }
                }
                if entered_transition {
                    self.state.status = TrackingStatus::SegmentTransition;
                }

                self.update_splits();
                self.recompute_averages();
                self.fire_alerts(alerts);
                self.apply_autopause(accepted.raw_speed_mps, fix.timestamp);
            }
        }
    }

    fn process_paused_fix(&mut self, fix: &LocationFix) {
        self.state.gps_signal = Some(GpsSignal::from_accuracy(fix.horizontal_accuracy));
        self.state.last_location = Some(fix.clone());

        let speed = self.filter.observe(fix);
        if self.state.status == TrackingStatus::AutoPaused && self.config.auto_pause_enabled {
            if let Some(speed) = speed {
                if self.autopause.update(speed, fix.timestamp, true)
                    == Some(AutoPauseEvent::Resume)
                {
                    self.credit_pause(fix.timestamp);
                    self.state.status = TrackingStatus::Tracking;
                    tracing::info!("auto-resumed");
                }
            }
        }
    }

    fn apply_autopause(&mut self, speed_mps: f64, at: DateTime<Utc>) {
        if !self.config.auto_pause_enabled {
            return;
        }
        if self.state.status != TrackingStatus::Tracking {
            return;
        }
        if self.autopause.update(speed_mps, at, false) == Some(AutoPauseEvent::Pause) {
            self.state.status = TrackingStatus::AutoPaused;
            self.state.paused_at = Some(at);
            tracing::info!("auto-paused");
        }
    }

    fn credit_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.state.paused_at.take() {
            let paused = (now - paused_at).num_seconds().max(0) as u32;
            self.state.total_paused_seconds += paused;
        }
    }

    fn update_splits(&mut self) {
        let completed_km = (self.state.distance_meters / 1000.0) as u32;
        while (self.splits.len() as u32) < completed_km {
            let kilometer = self.splits.len() as u32 + 1;
            let duration = self
                .state
                .elapsed_seconds
                .saturating_sub(self.last_split_elapsed);
            self.splits.push(SplitMetrics {
                kilometer,
                duration_seconds: duration,
                pace_secs_per_km: duration as f64,
            });
            self.last_split_elapsed = self.state.elapsed_seconds;
            tracing::debug!(kilometer, duration, "kilometer split recorded");
        }
    }

    fn recompute_averages(&mut self) {
        if self.state.elapsed_seconds > 0 && self.state.distance_meters > 0.0 {
            let speed_mps = self.state.distance_meters / self.state.elapsed_seconds as f64;
            self.state.average_speed_kmh = Some(speed_mps * 3.6);
            self.state.average_pace_secs_per_km = pace_from_speed(speed_mps);
        }
    }

    fn fire_alerts(&self, alerts: Vec<SegmentAlert>) {
        if let Some(alert_fn) = &self.alert_fn {
            for alert in alerts {
                alert_fn(alert);
            }
        }
    }

    fn reset(&mut self) {
        self.state = TrackingState::default();
        self.filter.reset();
        self.autopause.reset();
        self.splits.clear();
        self.last_split_elapsed = 0;
        self.alert_fn = None;
    }
}

/// Public live-tracking engine.
///
/// One engine instance manages at most one session at a time by
/// construction. Create it inside a tokio runtime; the session clock spawns
/// on the runtime that was current at construction.
pub struct TrackingEngine {
    provider: Arc<dyn LocationProvider>,
    config: TrackerConfig,
    core: Arc<Mutex<SessionCore>>,
    hub: Arc<SubscriptionHub>,
    clock: Arc<Mutex<SessionClock>>,
    resources: Mutex<SessionResources>,
}

impl TrackingEngine {
    /// Create an idle engine over the given location provider.
    pub fn new(provider: Arc<dyn LocationProvider>, config: TrackerConfig) -> Self {
        Self {
            provider,
            config: config.clone(),
            core: Arc::new(Mutex::new(SessionCore::new(config))),
            hub: Arc::new(SubscriptionHub::new()),
            clock: Arc::new(Mutex::new(SessionClock::new(Handle::current()))),
            resources: Mutex::new(SessionResources::new()),
        }
    }

    /// Start a session. Acquires the location stream and background grant
    /// and starts the session clock. Calling again with the same session id
    /// while active is a no-op; a different id is rejected.
    pub fn start_tracking(
        &self,
        session_id: &str,
        sport_type: SportType,
        targets: Option<Vec<SegmentTarget>>,
        on_segment_alert: Option<SegmentAlertFn>,
    ) -> Result<(), TrackingError> {
        if !self.provider.is_enabled() {
            return Err(LocationError::ServicesDisabled.into());
        }

        let outcome = lock(&self.core).start(
            session_id,
            sport_type,
            targets,
            on_segment_alert,
            Utc::now(),
        )?;
        if outcome == StartOutcome::AlreadyActive {
            return Ok(());
        }

        let core = self.core.clone();
        let hub = self.hub.clone();
        let clock = self.clock.clone();
        let acquired = lock(&self.resources).acquire(
            self.provider.as_ref(),
            &self.config.location,
            move |event| Self::dispatch_stream_event(&core, &hub, &clock, event),
        );
        if let Err(e) = acquired {
            // Undo the lifecycle transition; the session never ran.
            lock(&self.core).discard();
            return Err(e.into());
        }

        Self::spawn_ticker(&self.core, &self.hub, &self.clock);
        self.broadcast();
        Ok(())
    }

    /// Enter the pre-start countdown state.
    pub fn begin_countdown(&self) -> Result<(), TrackingError> {
        lock(&self.core).begin_countdown()?;
        self.broadcast();
        Ok(())
    }

    /// Manually pause the session and stop the clock.
    pub fn pause_tracking(&self) -> Result<(), TrackingError> {
        lock(&self.core).pause(Utc::now())?;
        lock(&self.clock).stop();
        self.broadcast();
        Ok(())
    }

    /// Resume a paused or auto-paused session and restart the clock.
    pub fn resume_tracking(&self) -> Result<(), TrackingError> {
        lock(&self.core).resume(Utc::now())?;
        Self::spawn_ticker(&self.core, &self.hub, &self.clock);
        self.broadcast();
        Ok(())
    }

    /// Finalize the session into an immutable metrics record. All resources
    /// are released whether or not finalization succeeds.
    pub fn stop_tracking(&self) -> Result<TrackedWorkoutMetrics, TrackingError> {
        let result = lock(&self.core).stop(Utc::now());
        lock(&self.clock).stop();
        lock(&self.resources).release();
        if result.is_ok() {
            self.broadcast();
        }
        result
    }

    /// Abandon the session from any state: release everything, reset to
    /// idle, produce nothing. Safe to call repeatedly.
    pub fn discard_tracking(&self) {
        lock(&self.core).discard();
        lock(&self.clock).stop();
        lock(&self.resources).release();
        self.broadcast();
    }

    /// Complete the current segment immediately and advance.
    pub fn skip_to_next_segment(&self) -> Result<(), TrackingError> {
        lock(&self.core).skip_segment(Utc::now())?;
        self.broadcast();
        Ok(())
    }

    /// Flip automatic advancement for the structured plan.
    pub fn toggle_auto_advance(&self) -> Result<bool, TrackingError> {
        let enabled = lock(&self.core).toggle_auto_advance()?;
        self.broadcast();
        Ok(enabled)
    }

    /// Pre-session readiness probe: one-shot position classified into a
    /// signal quality tier.
    pub fn check_gps_availability(&self) -> Result<GpsSignal, TrackingError> {
        if !self.provider.is_enabled() {
            return Err(LocationError::ServicesDisabled.into());
        }
        let fix = self.provider.current_position()?;
        Ok(GpsSignal::from_accuracy(fix.horizontal_accuracy))
    }

    /// Snapshot of the current state.
    pub fn get_state(&self) -> TrackingState {
        lock(&self.core).snapshot()
    }

    /// Register a state observer; every mutation broadcasts a snapshot.
    pub fn subscribe(
        &self,
        observer: impl Fn(TrackingState) + Send + 'static,
    ) -> SubscriptionToken {
        self.hub.subscribe(observer)
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.hub.unsubscribe(token);
    }

    /// Feed one fix into the engine. The drain worker uses this path; a
    /// platform layer that owns its own location callbacks may call it
    /// directly.
    pub fn handle_location(&self, fix: LocationFix) {
        Self::dispatch_stream_event(&self.core, &self.hub, &self.clock, StreamEvent::Fix(fix));
    }

    fn dispatch_stream_event(
        core: &Arc<Mutex<SessionCore>>,
        hub: &Arc<SubscriptionHub>,
        clock: &Arc<Mutex<SessionClock>>,
        event: StreamEvent,
    ) {
        match event {
            StreamEvent::Fix(fix) => {
                let (snapshot, tickable) = {
                    let mut core = lock(core);
                    core.handle_fix(&fix);
                    (core.snapshot(), core.is_tickable())
                };
                hub.broadcast(&snapshot);

                // A fix can flip the auto-pause state; keep the clock in
                // step with it.
                let running = lock(clock).is_running();
                if tickable && !running {
                    Self::spawn_ticker(core, hub, clock);
                } else if !tickable && running {
                    lock(clock).stop();
                }
            }
            StreamEvent::Ended => {
                let snapshot = {
                    let mut core = lock(core);
                    if core.state.status.is_active() {
                        core.state.error = Some("location stream ended".to_string());
                        tracing::warn!("location stream ended while session active");
                        Some(core.snapshot())
                    } else {
                        None
                    }
                };
                if let Some(snapshot) = snapshot {
                    hub.broadcast(&snapshot);
                }
            }
        }
    }

    fn spawn_ticker(
        core: &Arc<Mutex<SessionCore>>,
        hub: &Arc<SubscriptionHub>,
        clock: &Arc<Mutex<SessionClock>>,
    ) {
        let tick_core = core.clone();
        let tick_hub = hub.clone();
        lock(clock).start(move || {
            let (snapshot, keep_running) = {
                let mut core = lock(&tick_core);
                core.tick(Utc::now());
                (core.snapshot(), core.is_tickable())
            };
            tick_hub.broadcast(&snapshot);
            keep_running
        });
    }

    fn broadcast(&self) {
        let snapshot = lock(&self.core).snapshot();
        self.hub.broadcast(&snapshot);
    }
}

/// Lock with poison recovery: a panicked observer must not brick the engine.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
