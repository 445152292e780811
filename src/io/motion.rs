//! PIR motion sensor monitoring via GPIO
//!
//! Owns the sensor input pin for the process lifetime and translates level
//! transitions into `MotionEvent`s: rising edge = motion started, falling
//! edge = motion stopped. The interrupt wait polls with a short timeout so
//! the shutdown signal is observed.
//!
//! Sensor I/O faults are logged and the wait re-armed; the monitor never
//! crashes the process on a read error.

use crate::domain::types::MotionEvent;
use crate::infra::config::Config;
use rppal::gpio::{Gpio, Level, Trigger};
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Backoff before re-acquiring the pin after a GPIO fault
const REARM_DELAY: Duration = Duration::from_secs(1);

pub struct MotionMonitor {
    gpio_pin: u8,
    poll_interval: Duration,
    event_tx: Option<mpsc::Sender<MotionEvent>>,
}

impl MotionMonitor {
    pub fn new(config: &Config) -> Self {
        Self {
            gpio_pin: config.sensor_gpio_pin(),
            poll_interval: Duration::from_millis(config.sensor_poll_interval_ms()),
            event_tx: None,
        }
    }

    /// Set the event sender for motion transitions
    pub fn with_event_tx(mut self, tx: mpsc::Sender<MotionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run the interrupt wait loop. Blocking; intended for a dedicated
    /// blocking worker (`tokio::task::spawn_blocking`).
    pub fn run(self, shutdown: watch::Receiver<bool>) {
        info!(
            gpio_pin = %self.gpio_pin,
            poll_interval_ms = %self.poll_interval.as_millis(),
            "motion_monitor_started"
        );

        let Some(event_tx) = self.event_tx else {
            error!("motion_monitor_no_event_tx");
            return;
        };

        while !*shutdown.borrow() {
            // Acquire the pin; on failure log, back off, re-arm
            let mut pin = match Self::acquire_pin(self.gpio_pin) {
                Ok(pin) => pin,
                Err(e) => {
                    error!(gpio_pin = %self.gpio_pin, error = %e, "motion_sensor_open_failed");
                    thread::sleep(REARM_DELAY);
                    continue;
                }
            };

            info!(gpio_pin = %self.gpio_pin, "motion_sensor_armed");

            // Interrupt wait loop; exits to re-acquire on a read fault
            loop {
                if *shutdown.borrow() {
                    info!("motion_monitor_shutdown");
                    return;
                }

                match pin.poll_interrupt(false, Some(self.poll_interval)) {
                    Ok(Some(level)) => {
                        let event = match level {
                            Level::High => MotionEvent::Started,
                            Level::Low => MotionEvent::Stopped,
                        };
                        if event_tx.blocking_send(event).is_err() {
                            // Pipeline gone; nothing left to monitor for
                            info!("motion_monitor_channel_closed");
                            return;
                        }
                    }
                    Ok(None) => {} // Poll timeout, check shutdown and re-wait
                    Err(e) => {
                        error!(gpio_pin = %self.gpio_pin, error = %e, "motion_sensor_read_error");
                        thread::sleep(REARM_DELAY);
                        break;
                    }
                }
            }
        }

        info!("motion_monitor_shutdown");
    }

    fn acquire_pin(gpio_pin: u8) -> Result<rppal::gpio::InputPin, rppal::gpio::Error> {
        let mut pin = Gpio::new()?.get(gpio_pin)?.into_input_pulldown();
        pin.set_interrupt(Trigger::Both)?;
        Ok(pin)
    }
}
