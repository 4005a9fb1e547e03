//! Per-channel brightness state: either a fixed level or a time-varying
//! fade producer supplied by the caller.

use anyhow::Result;
use log::warn;
use number::UnipolarFloat;

/// How far ahead a producer is asked to look when sampled, in ms.
///
/// A fade that will not settle within this window keeps its fixture dirty,
/// so the producer is consulted again on the next tick.
pub const MAX_LOOKAHEAD_MS: u32 = 30000;

/// A fade producer callback.
///
/// Given a maximum look-ahead window in ms, return the brightness to
/// display now and the duration in ms over which it is being faded toward.
pub type FadeProducer = Box<dyn FnMut(u32) -> Result<(f64, u32)> + Send>;

/// One channel slot of a fixture.
pub enum Fade {
    /// A fixed brightness level; never re-triggers sampling.
    Constant(UnipolarFloat),
    /// A time-varying brightness producer.
    Producer(FadeProducer),
}

impl Fade {
    /// Wrap a producer callback.
    pub fn with_producer(produce: impl FnMut(u32) -> Result<(f64, u32)> + Send + 'static) -> Self {
        Self::Producer(Box::new(produce))
    }

    /// Sample this slot.
    ///
    /// A producer that fails or returns garbage contributes zero and leaves
    /// the slot unsettled so the next tick retries it.
    pub fn sample(&mut self, fixture: &str, channel: usize) -> ChannelSample {
        match self {
            Self::Constant(level) => ChannelSample {
                brightness: *level,
                fade_ms: None,
                unsettled: false,
            },
            Self::Producer(produce) => match produce(MAX_LOOKAHEAD_MS) {
                Ok((brightness, fade_ms)) => {
                    let in_range = (0.0..=1.0).contains(&brightness);
                    let level = if brightness.is_finite() && in_range {
                        UnipolarFloat::new(brightness)
                    } else if brightness.is_finite() {
                        warn!(
                            "fade producer for {fixture}-{channel} returned out-of-range \
                             brightness {brightness}, clamping"
                        );
                        UnipolarFloat::new(brightness)
                    } else {
                        warn!(
                            "fade producer for {fixture}-{channel} returned non-finite \
                             brightness, treating as 0"
                        );
                        UnipolarFloat::ZERO
                    };
                    ChannelSample {
                        brightness: level,
                        fade_ms: Some(fade_ms),
                        unsettled: fade_ms >= MAX_LOOKAHEAD_MS
                            || !in_range
                            || !brightness.is_finite(),
                    }
                }
                Err(err) => {
                    warn!("fade producer for {fixture}-{channel} failed: {err:#}");
                    ChannelSample {
                        brightness: UnipolarFloat::ZERO,
                        fade_ms: None,
                        unsettled: true,
                    }
                }
            },
        }
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::Constant(UnipolarFloat::ZERO)
    }
}

/// The result of sampling one channel slot.
pub struct ChannelSample {
    pub brightness: UnipolarFloat,
    /// The fade duration reported by a producer; None for constant slots.
    pub fade_ms: Option<u32>,
    /// True if this slot must be sampled again on the next tick.
    pub unsettled: bool,
}
