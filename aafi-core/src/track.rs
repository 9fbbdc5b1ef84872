//! Audio tracks and clips

use crate::essence::{AudioEssence, EssenceId};
use crate::gain::AudioGain;
use crate::rational::{eu_to_hmsf, eu_to_samples, Hmsf, Rational};
use crate::timeline::{ItemRef, TimelineItem};
use crate::transition::Transition;
use crate::{reserve_one, Error, Position, Result};

/// Identifier of a track: its index in the container's track list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackId(pub usize);

/// Channel layout of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackFormat {
    #[default]
    Mono,
    Stereo,
    Surround5_1,
    Surround7_1,
}

impl TrackFormat {
    /// Number of channels carried by the format
    pub fn channels(self) -> u16 {
        match self {
            TrackFormat::Mono => 1,
            TrackFormat::Stereo => 2,
            TrackFormat::Surround5_1 => 6,
            TrackFormat::Surround7_1 => 8,
        }
    }

    /// Format carrying exactly `channels` channels
    pub fn from_channels(channels: u16) -> Option<Self> {
        match channels {
            1 => Some(TrackFormat::Mono),
            2 => Some(TrackFormat::Stereo),
            6 => Some(TrackFormat::Surround5_1),
            8 => Some(TrackFormat::Surround7_1),
            _ => None,
        }
    }
}

/// Start timecode of a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timecode {
    /// Start, in edit units
    pub start: Position,
    /// Frames per second
    pub fps: u16,
    /// Drop-frame counting
    pub drop: bool,
}

/// Placement of an essence on a track
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioClip {
    track: TrackId,
    /// Essence played by this clip, owned by the container
    pub essence: Option<EssenceId>,
    /// Clip gain, if any
    pub gain: Option<AudioGain>,
    /// Position on the track, in edit units
    pub pos: Position,
    /// Length, in edit units
    pub len: Position,
    /// Offset into the essence, in edit units
    pub essence_offset: Position,
}

impl AudioClip {
    /// Creates an empty clip belonging to `track`
    pub fn new(track: TrackId) -> Self {
        Self {
            track,
            essence: None,
            gain: None,
            pos: 0,
            len: 0,
            essence_offset: 0,
        }
    }

    /// Track this clip was created on
    pub fn track(&self) -> TrackId {
        self.track
    }

    /// End position, exclusive
    pub fn end(&self) -> Position {
        self.pos + self.len
    }

    /// Converts a value in the track's edit units to essence samples
    pub fn eu_to_samples(
        &self,
        value: Position,
        track: &AudioTrack,
        essence: &AudioEssence,
    ) -> Result<i64> {
        eu_to_samples(value, track.require_edit_rate()?, essence.format.samples_per_sec)
    }

    /// Splits a value in the track's edit units into hours to frames
    pub fn eu_to_hmsf(&self, value: Position, track: &AudioTrack, fps: u16) -> Result<Hmsf> {
        eu_to_hmsf(value, track.require_edit_rate()?, fps)
    }
}

/// One audio track of the composition
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioTrack {
    id: TrackId,
    /// Track number as shown to the user
    pub number: u32,
    pub name: Option<String>,
    pub format: TrackFormat,
    /// Edit rate of every item on the track
    pub edit_rate: Option<Rational>,
    /// Track volume fader
    pub gain: Option<AudioGain>,
    /// Track pan automation
    pub pan: Option<AudioGain>,
    items: Vec<TimelineItem>,
}

impl AudioTrack {
    /// Creates an empty mono track
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            number: id.0 as u32 + 1,
            format: TrackFormat::Mono,
            ..Default::default()
        }
    }

    /// Identifier of this track in its container
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Appends a clip and returns it for the caller to fill in
    pub fn new_clip(&mut self) -> Result<&mut AudioClip> {
        let index = self.push_item(TimelineItem::Clip(AudioClip::new(self.id)))?;
        match &mut self.items[index] {
            TimelineItem::Clip(clip) => Ok(clip),
            TimelineItem::Transition(_) => unreachable!("item was pushed as a clip"),
        }
    }

    /// Appends a transition
    pub fn new_transition(&mut self, transition: Transition) -> Result<&mut Transition> {
        let index = self.push_item(TimelineItem::Transition(transition))?;
        match &mut self.items[index] {
            TimelineItem::Transition(trans) => Ok(trans),
            TimelineItem::Clip(_) => unreachable!("item was pushed as a transition"),
        }
    }

    /// Appends an already built item and returns its index.
    ///
    /// A clip built for another track is attached to this one.
    pub fn push_item(&mut self, mut item: TimelineItem) -> Result<usize> {
        reserve_one(&mut self.items, "timeline item")?;
        if let TimelineItem::Clip(clip) = &mut item {
            clip.track = self.id;
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Iterates over the items in track order
    pub fn items(&self) -> impl Iterator<Item = ItemRef<'_>> + '_ {
        (0..self.items.len()).map(move |i| ItemRef::new(self, i))
    }

    /// Returns the item at `index`
    pub fn item(&self, index: usize) -> Option<ItemRef<'_>> {
        (index < self.items.len()).then(|| ItemRef::new(self, index))
    }

    /// Mutable access to the clip at `index`
    pub fn clip_mut(&mut self, index: usize) -> Option<&mut AudioClip> {
        self.items.get_mut(index).and_then(TimelineItem::as_clip_mut)
    }

    /// Mutable access to the transition at `index`
    pub fn transition_mut(&mut self, index: usize) -> Option<&mut Transition> {
        self.items
            .get_mut(index)
            .and_then(TimelineItem::as_transition_mut)
    }

    /// Iterates over the clips only
    pub fn clips(&self) -> impl Iterator<Item = &AudioClip> {
        self.items.iter().filter_map(TimelineItem::as_clip)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Releases every item, returning how many were released
    pub fn free_items(&mut self) -> usize {
        let count = self.items.len();
        for mut item in self.items.drain(..) {
            item.release();
        }
        count
    }

    /// Releases name, gain, pan and items, returning the items released
    pub(crate) fn release(&mut self) -> usize {
        self.name = None;
        self.gain = None;
        self.pan = None;
        self.free_items()
    }

    pub(crate) fn item_slice(&self) -> &[TimelineItem] {
        &self.items
    }

    pub(crate) fn clips_from_mut(
        &mut self,
        start: usize,
    ) -> impl Iterator<Item = &mut AudioClip> + '_ {
        self.items
            .iter_mut()
            .skip(start)
            .filter_map(TimelineItem::as_clip_mut)
    }

    fn require_edit_rate(&self) -> Result<Rational> {
        self.edit_rate.ok_or(Error::MissingEditRate(self.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gain::Interpolation;
    use crate::timeline::ItemKind;
    use crate::transition::TransitionKind;

    #[test]
    fn test_new_track_defaults() {
        let track = AudioTrack::new(TrackId(2));
        assert_eq!(track.format, TrackFormat::Mono);
        assert_eq!(track.number, 3);
        assert!(track.gain.is_none());
        assert!(track.is_empty());
    }

    #[test]
    fn test_format_from_channels() {
        for format in [
            TrackFormat::Mono,
            TrackFormat::Stereo,
            TrackFormat::Surround5_1,
            TrackFormat::Surround7_1,
        ] {
            assert_eq!(TrackFormat::from_channels(format.channels()), Some(format));
        }
        assert_eq!(TrackFormat::from_channels(3), None);
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let mut track = AudioTrack::new(TrackId(0));
        track.new_clip().unwrap().pos = 0;
        track
            .new_transition(Transition::with_default_curve(
                TransitionKind::CrossFade,
                Interpolation::Linear,
                10,
                5,
            ))
            .unwrap();
        track.new_clip().unwrap().pos = 90;

        let kinds: Vec<_> = track.items().map(|i| i.kind()).collect();
        assert_eq!(
            kinds,
            vec![ItemKind::Clip, ItemKind::Transition, ItemKind::Clip]
        );
        assert_eq!(track.clips().last().unwrap().pos, 90);
    }

    #[test]
    fn test_clip_back_reference() {
        let mut track = AudioTrack::new(TrackId(4));
        let clip = track.new_clip().unwrap();
        assert_eq!(clip.track(), TrackId(4));
        assert!(clip.essence.is_none());

        let detached = TimelineItem::Clip(AudioClip::new(TrackId(9)));
        let index = track.push_item(detached).unwrap();
        assert_eq!(track.clip_mut(index).unwrap().track(), TrackId(4));
    }

    #[test]
    fn test_free_items() {
        let mut track = AudioTrack::new(TrackId(0));
        track.new_clip().unwrap().gain = Some(AudioGain::constant(Rational::one()));
        track.new_clip().unwrap();

        assert_eq!(track.free_items(), 2);
        assert!(track.is_empty());
        assert_eq!(track.free_items(), 0);
    }

    #[test]
    fn test_clip_conversions() {
        let mut track = AudioTrack::new(TrackId(0));
        track.edit_rate = Some(Rational::new(25, 1));
        let mut essence = AudioEssence::default();
        essence.format.samples_per_sec = 48000;

        let clip = AudioClip::new(TrackId(0));
        assert_eq!(clip.eu_to_samples(50, &track, &essence).unwrap(), 96000);
        assert_eq!(clip.eu_to_hmsf(26, &track, 25).unwrap().frames, 1);

        track.edit_rate = None;
        assert!(matches!(
            clip.eu_to_samples(50, &track, &essence),
            Err(Error::MissingEditRate(1))
        ));
    }
}
