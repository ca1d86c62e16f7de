//! Driver vigilance (VACMA).
//!
//! Above the activation speed exactly one timer pair runs, chosen by the
//! vigilance pedal: a short pair while released, a long pair while held.
//! Switching pairs restarts the new pair from zero. Throttle or dynamic
//! brake movement and the horn count as activity and restart the running
//! pair. The alert timer sounds the cab alarm; the emergency timer latches
//! emergency braking until the train is below activation speed and the
//! driver rearms.

use tcs_common::consts::kph_to_mps;
use tcs_common::tcs::config::VacmaConfig;
use tcs_common::tcs::state::VacmaPair;

use crate::primitives::Timer;

/// Inputs for one VACMA tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VacmaInputs {
    pub speed_mps: f64,
    pub pressed: bool,
    /// Throttle or dynamic brake moved, or horn sounded, this tick.
    pub activity: bool,
    pub rearm: bool,
}

/// Alarm edge reported to the cab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacmaTransition {
    AlertStarted,
    AlertStopped,
}

#[derive(Debug, Clone, Copy)]
struct TimerPair {
    alert: Timer,
    emergency: Timer,
}

impl TimerPair {
    fn new(alert_s: f64, emergency_s: f64) -> Self {
        Self {
            alert: Timer::new(alert_s),
            emergency: Timer::new(emergency_s),
        }
    }

    fn restart(&mut self) {
        self.stop();
        self.alert.start();
        self.emergency.start();
    }

    fn stop(&mut self) {
        self.alert.stop();
        self.emergency.stop();
    }

    fn update(&mut self, elapsed_s: f64) {
        self.alert.update(elapsed_s);
        self.emergency.update(elapsed_s);
    }
}

/// VACMA subsystem state.
#[derive(Debug, Clone)]
pub struct Vacma {
    activation_speed_mps: f64,
    released: TimerPair,
    pressed: TimerPair,
    pair: VacmaPair,
    alert: bool,
    emergency: bool,
}

impl Vacma {
    pub fn new(config: &VacmaConfig) -> Self {
        Self {
            activation_speed_mps: kph_to_mps(config.activation_speed_kph),
            released: TimerPair::new(config.released_alert_delay_s, config.released_emergency_delay_s),
            pressed: TimerPair::new(config.pressed_alert_delay_s, config.pressed_emergency_delay_s),
            pair: VacmaPair::Idle,
            alert: false,
            emergency: false,
        }
    }

    #[inline]
    pub const fn pair(&self) -> VacmaPair {
        self.pair
    }

    #[inline]
    pub const fn alert(&self) -> bool {
        self.alert
    }

    #[inline]
    pub const fn emergency_braking(&self) -> bool {
        self.emergency
    }

    /// Advance one tick. Returns the alarm edge, if any.
    pub fn update(&mut self, inputs: &VacmaInputs, elapsed_s: f64) -> Option<VacmaTransition> {
        let active = inputs.speed_mps.abs() >= self.activation_speed_mps;

        if self.emergency {
            if !active && inputs.rearm {
                tracing::info!("VACMA emergency rearmed");
                self.emergency = false;
            }
            self.select(VacmaPair::Idle);
            return self.set_alert(false);
        }

        if let Some(running) = self.running_mut() {
            running.update(elapsed_s);
        }

        let wanted = match (active, inputs.pressed) {
            (false, _) => VacmaPair::Idle,
            (true, true) => VacmaPair::Pressed,
            (true, false) => VacmaPair::Released,
        };
        if wanted != self.pair {
            self.select(wanted);
        } else if inputs.activity {
            if let Some(running) = self.running_mut() {
                running.restart();
            }
        }

        let (alert, emergency) = match self.running_mut() {
            Some(running) => (running.alert.triggered(), running.emergency.triggered()),
            None => (false, false),
        };
        if emergency {
            tracing::warn!(pair = ?self.pair, "VACMA vigilance timeout, emergency braking");
            self.emergency = true;
            self.select(VacmaPair::Idle);
            return self.set_alert(false);
        }
        self.set_alert(alert)
    }

    fn running_mut(&mut self) -> Option<&mut TimerPair> {
        match self.pair {
            VacmaPair::Idle => None,
            VacmaPair::Pressed => Some(&mut self.pressed),
            VacmaPair::Released => Some(&mut self.released),
        }
    }

    fn select(&mut self, pair: VacmaPair) {
        if pair == self.pair {
            return;
        }
        self.released.stop();
        self.pressed.stop();
        self.pair = pair;
        if let Some(running) = self.running_mut() {
            running.restart();
        }
    }

    fn set_alert(&mut self, alert: bool) -> Option<VacmaTransition> {
        if alert == self.alert {
            return None;
        }
        self.alert = alert;
        Some(if alert {
            VacmaTransition::AlertStarted
        } else {
            VacmaTransition::AlertStopped
        })
    }
}
