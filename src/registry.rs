//! Lookup and lazy creation of fixture state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};

use crate::fixture::{ChannelHandle, Fixture, FixtureHandle};

/// All fixtures known to the driver, keyed by fixture number.
///
/// Fixtures are created on first reference to any of their channels and
/// live for the life of the process; entries are never removed.
#[derive(Default)]
pub struct Registry {
    fixtures: HashMap<String, FixtureHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a handle to one channel of a fixture, creating the fixture
    /// on first reference.
    pub fn resolve_channel(&mut self, number: &str, channel: usize) -> Result<ChannelHandle> {
        if channel > 2 {
            bail!("channel index {channel} out of range for fixture {number}");
        }
        let fixture = self
            .fixtures
            .entry(number.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Fixture::new(number))));
        Ok(ChannelHandle::new(fixture.clone(), channel))
    }

    /// Iterate over all known fixtures.
    pub fn fixtures(&self) -> impl Iterator<Item = &FixtureHandle> {
        self.fixtures.values()
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

/// Split a composite channel identifier `"{fixture}-{channel}"` into the
/// fixture number and channel index.
///
/// The fixture number may itself contain dashes; the channel index is
/// everything after the last one.
pub fn parse_channel_number(number: &str) -> Result<(&str, usize)> {
    let Some((fixture, channel)) = number.rsplit_once('-') else {
        bail!("malformed channel number {number}, expected a -channel suffix");
    };
    let channel = channel
        .parse()
        .with_context(|| format!("invalid channel index in {number}"))?;
    Ok((fixture, channel))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lazy_creation_is_idempotent() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        let first = registry.resolve_channel("7", 0).unwrap();
        let second = registry.resolve_channel("7", 2).unwrap();
        assert_eq!(1, registry.len());
        assert_eq!("7-0", first.id());
        assert_eq!("7-2", second.id());

        registry.resolve_channel("8", 1).unwrap();
        assert_eq!(2, registry.len());
    }

    #[test]
    fn test_channel_index_out_of_range() {
        let mut registry = Registry::new();
        assert!(registry.resolve_channel("7", 3).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_parse_channel_number() {
        assert_eq!(("12", 2), parse_channel_number("12-2").unwrap());
        // Dashes in the fixture number belong to the fixture.
        assert_eq!(("porch-light", 0), parse_channel_number("porch-light-0").unwrap());
        assert!(parse_channel_number("12").is_err());
        assert!(parse_channel_number("12-x").is_err());
    }
}
