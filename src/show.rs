//! The update cycle: periodically flush dirty fixture state to the bridge.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use log::{debug, error};

use crate::bridge::{ColorCommand, LightTransport, TransportError};
use crate::color::XyBri;
use crate::fixture::FixtureHandle;
use crate::registry::Registry;

pub struct Show<T: LightTransport> {
    registry: Registry,
    transport: T,
    update_interval: Duration,
}

impl<T: LightTransport> Show<T> {
    pub fn new(registry: Registry, transport: T, update_hz: f64) -> Self {
        Self {
            registry,
            transport,
            update_interval: Duration::from_secs_f64(1. / update_hz),
        }
    }

    /// Run the update cycle forever in the current thread at the configured
    /// rate.
    pub fn run(&mut self) {
        let mut last_update = Instant::now();
        loop {
            let mut since_last = Instant::now() - last_update;
            while since_last >= self.update_interval {
                self.tick();
                last_update += self.update_interval;
                since_last = Instant::now() - last_update;
            }
            std::thread::sleep(self.update_interval - since_last);
        }
    }

    /// Flush every dirty fixture to the transport.
    ///
    /// The dirty set is snapshotted before processing, so fades applied
    /// while the tick runs land in the next tick rather than being lost or
    /// double-processed. A failure on one fixture is logged, the fixture is
    /// re-marked dirty for retry, and the rest of the batch still runs.
    ///
    /// Returns the number of fixtures that failed to update.
    pub fn tick(&mut self) -> usize {
        let dirty: Vec<FixtureHandle> = self
            .registry
            .fixtures()
            .filter(|f| f.lock().is_ok_and(|f| f.dirty()))
            .cloned()
            .collect();
        if !dirty.is_empty() {
            debug!("updating {} dirty fixture(s)", dirty.len());
        }
        let mut failures = 0;
        for fixture in dirty {
            if let Err(err) = self.update_fixture(&fixture) {
                failures += 1;
                error!("fixture update failed: {err:#}");
            }
        }
        failures
    }

    /// Sample one fixture and send the resulting commands.
    fn update_fixture(&self, handle: &FixtureHandle) -> Result<()> {
        // Sample under the fixture lock, then release it before any I/O.
        let (number, color, fade_ms) = {
            let Ok(mut fixture) = handle.lock() else {
                bail!("fixture state lock poisoned");
            };
            let (color, fade_ms) = fixture.sample_and_clear();
            (fixture.number().to_string(), color, fade_ms)
        };
        let result = self.send(&number, color, fade_ms);
        if result.is_err() {
            // Force a retry on the next tick.
            if let Ok(mut fixture) = handle.lock() {
                fixture.mark_dirty();
            }
        }
        result.with_context(|| format!("sending state for fixture {number}"))
    }

    fn send(&self, number: &str, color: XyBri, fade_ms: Option<u32>) -> Result<(), TransportError> {
        if color.is_black() {
            return self.transport.set_power(number, false);
        }
        if !self.transport.get_power(number)? {
            self.transport.set_power(number, true)?;
        }
        self.transport.set_color(
            number,
            &ColorCommand {
                xy: (color.x, color.y),
                bri: color.bri,
                transition_time: fade_ms.map(transition_ticks),
            },
        )
    }
}

/// Convert a fade duration in ms to the bridge's 100 ms transition ticks.
fn transition_ticks(fade_ms: u32) -> u16 {
    (fade_ms / 100).min(u32::from(u16::MAX)) as u16
}
