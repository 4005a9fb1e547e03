//! State for a single addressable fixture: three channel slots plus the
//! dirty flag that gates retransmission.

use std::sync::{Arc, Mutex};

use log::error;
use number::UnipolarFloat;

use crate::color::{rgb_to_xy_bri, XyBri};
use crate::fade::Fade;

/// A fixture is shared between the registry, the update cycle, and any
/// channel handles issued to callers.
pub type FixtureHandle = Arc<Mutex<Fixture>>;

/// One addressable light with three brightness channels (R, G, B).
pub struct Fixture {
    number: String,
    dirty: bool,
    channels: [Fade; 3],
}

impl Fixture {
    /// Create a fixture with all channels off.
    ///
    /// New fixtures start dirty so their initial state is transmitted.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            dirty: true,
            channels: Default::default(),
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// True if this fixture has state changes pending transmission.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Re-mark this fixture dirty, forcing retransmission on the next tick.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Sample all three channels, convert them to the bridge encoding, and
    /// clear the dirty flag.
    ///
    /// The flag is cleared optimistically and re-asserted if any channel's
    /// fade has not settled within the look-ahead window, so an in-flight
    /// fade is sampled again on the next tick.
    ///
    /// Returns the converted color and the shortest fade duration among
    /// producer-held channels, or None if every slot holds a constant.
    pub fn sample_and_clear(&mut self) -> (XyBri, Option<u32>) {
        self.dirty = false;
        let mut min_fade_ms: Option<u32> = None;
        let mut levels = [UnipolarFloat::ZERO; 3];
        for (channel, fade) in self.channels.iter_mut().enumerate() {
            let sample = fade.sample(&self.number, channel);
            levels[channel] = sample.brightness;
            if let Some(fade_ms) = sample.fade_ms {
                if min_fade_ms.is_none_or(|current| fade_ms < current) {
                    min_fade_ms = Some(fade_ms);
                }
            }
            if sample.unsettled {
                self.dirty = true;
            }
        }
        let [r, g, b] = levels;
        (rgb_to_xy_bri(r, g, b), min_fade_ms)
    }
}

/// A caller-facing reference to one channel slot of one fixture.
#[derive(Clone)]
pub struct ChannelHandle {
    fixture: FixtureHandle,
    channel: usize,
}

impl ChannelHandle {
    pub(crate) fn new(fixture: FixtureHandle, channel: usize) -> Self {
        Self { fixture, channel }
    }

    /// The composite channel identifier, `"{fixture}-{channel}"`.
    pub fn id(&self) -> String {
        let Ok(fixture) = self.fixture.lock() else {
            return format!("?-{}", self.channel);
        };
        format!("{}-{}", fixture.number(), self.channel)
    }

    /// Replace this channel's fade and mark the fixture dirty.
    ///
    /// The slot is replaced wholesale; producers are never mutated in place.
    /// Producers run under the fixture lock during sampling, so a producer
    /// must not call set_fade on a channel of its own fixture.
    pub fn set_fade(&self, fade: Fade) {
        let Ok(mut fixture) = self.fixture.lock() else {
            error!("failed to lock fixture state for channel {}", self.channel);
            return;
        };
        fixture.channels[self.channel] = fade;
        fixture.dirty = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fade::MAX_LOOKAHEAD_MS;
    use number::UnipolarFloat;

    fn handle(fixture: &FixtureHandle, channel: usize) -> ChannelHandle {
        ChannelHandle::new(fixture.clone(), channel)
    }

    #[test]
    fn test_new_fixture_starts_dirty() {
        assert!(Fixture::new("1").dirty());
    }

    /// Constant slots produce the same command every time and do not
    /// re-assert dirtiness.
    #[test]
    fn test_constant_sampling_idempotent() {
        let mut fixture = Fixture::new("1");
        let first = fixture.sample_and_clear();
        assert!(!fixture.dirty());
        let second = fixture.sample_and_clear();
        assert_eq!(first, second);
        assert!(!fixture.dirty());
        // All constants: no transition time to report.
        assert_eq!(None, first.1);
        assert!(first.0.is_black());
    }

    #[test]
    fn test_set_fade_marks_dirty() {
        let fixture = Arc::new(Mutex::new(Fixture::new("1")));
        fixture.lock().unwrap().sample_and_clear();
        assert!(!fixture.lock().unwrap().dirty());

        handle(&fixture, 1).set_fade(Fade::Constant(UnipolarFloat::ONE));
        assert!(fixture.lock().unwrap().dirty());
    }

    #[test]
    fn test_pure_red_conversion() {
        let fixture = Arc::new(Mutex::new(Fixture::new("1")));
        handle(&fixture, 0).set_fade(Fade::with_producer(|_| Ok((1.0, 0))));

        let (color, fade_ms) = fixture.lock().unwrap().sample_and_clear();
        assert!((color.x - 0.735).abs() < 1e-3);
        assert!((color.y - 0.265).abs() < 1e-3);
        assert!((color.bri - 0.2343).abs() < 1e-3);
        assert_eq!(Some(0), fade_ms);
        assert!(!fixture.lock().unwrap().dirty());
    }

    /// The reported transition time is the shortest fade among channels
    /// held by producers.
    #[test]
    fn test_min_fade_tracking() {
        let fixture = Arc::new(Mutex::new(Fixture::new("1")));
        handle(&fixture, 0).set_fade(Fade::with_producer(|_| Ok((0.2, 500))));
        handle(&fixture, 2).set_fade(Fade::with_producer(|_| Ok((0.4, 200))));

        let (_, fade_ms) = fixture.lock().unwrap().sample_and_clear();
        assert_eq!(Some(200), fade_ms);
    }

    #[test]
    fn test_unsettled_fade_keeps_fixture_dirty() {
        let fixture = Arc::new(Mutex::new(Fixture::new("1")));
        handle(&fixture, 0).set_fade(Fade::with_producer(|_| Ok((0.5, MAX_LOOKAHEAD_MS))));

        fixture.lock().unwrap().sample_and_clear();
        assert!(fixture.lock().unwrap().dirty());
    }

    #[test]
    fn test_handle_id() {
        let fixture = Arc::new(Mutex::new(Fixture::new("12")));
        assert_eq!("12-2", handle(&fixture, 2).id());
    }
}
