//! Decoded AAF object store
//!
//! These types are what the file decoder hands over to the interface layer:
//! Mobs with their slots and segments, already turned from raw property
//! streams into typed values. Reading the compound file and decoding the
//! class dictionary happen behind the [`Decoder`] trait.

use crate::essence::{DataNode, MobId};
use crate::gain::{ControlPoint, Interpolation};
use crate::{Position, Rational, Result};
use std::path::Path;

/// Fills an object store from a file
pub trait Decoder {
    /// Reads `path` into `store`, replacing its previous content
    fn decode(&self, store: &mut AafData, path: &Path) -> Result<()>;
}

/// All objects decoded from one AAF file
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AafData {
    /// Content storage Mobs
    pub mobs: Vec<Mob>,
    /// Embedded essence streams
    pub essence_data: Vec<EssenceData>,
}

impl AafData {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases every decoded object
    pub fn clear(&mut self) {
        self.mobs.clear();
        self.essence_data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty() && self.essence_data.is_empty()
    }

    /// Finds a Mob by id
    pub fn mob(&self, id: &MobId) -> Option<&Mob> {
        self.mobs.iter().find(|m| &m.mob_id == id)
    }

    /// Finds the embedded data stream of a SourceMob
    pub fn essence_data(&self, id: &MobId) -> Option<&EssenceData> {
        self.essence_data.iter().find(|d| &d.mob_id == id)
    }

    /// Iterates over MasterMobs
    pub fn master_mobs(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.iter().filter(|m| matches!(m.kind, MobKind::Master))
    }

    /// The composition to present: the first top-level one, else the first one
    pub fn top_level_composition(&self) -> Option<&Mob> {
        let mut compositions = self
            .mobs
            .iter()
            .filter(|m| matches!(m.kind, MobKind::Composition { .. }));
        let first = compositions.clone().next();
        compositions
            .find(|m| matches!(m.kind, MobKind::Composition { top_level: true }))
            .or(first)
    }
}

/// Date and time as stored in AAF timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    pub year: i16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    /// `yyyy:mm:dd`, the BWF origination date layout
    pub fn bwf_date(&self) -> String {
        format!("{:04}:{:02}:{:02}", self.year, self.month, self.day)
    }

    /// `hh:mm:ss`, the BWF origination time layout
    pub fn bwf_time(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// A named string attached to a Mob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaggedValue {
    pub name: String,
    pub value: String,
}

/// What a Mob stands for
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MobKind {
    /// An edited composition
    Composition { top_level: bool },
    /// Collects the sources of one piece of material
    Master,
    /// Describes essence: a file, a tape or an import
    Source(EssenceDescriptor),
}

/// A Mob with its slots
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mob {
    pub mob_id: MobId,
    pub name: Option<String>,
    pub kind: MobKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub slots: Vec<MobSlot>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub user_comments: Vec<TaggedValue>,
    pub creation_time: Option<Timestamp>,
}

impl Mob {
    /// Finds a slot by id
    pub fn slot(&self, slot_id: u32) -> Option<&MobSlot> {
        self.slots.iter().find(|s| s.slot_id == slot_id)
    }

    /// The essence descriptor of a SourceMob
    pub fn descriptor(&self) -> Option<&EssenceDescriptor> {
        match &self.kind {
            MobKind::Source(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Kind of media carried by a slot
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataDef {
    Sound,
    Picture,
    Timecode,
    Other(String),
}

/// A timeline slot of a Mob
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobSlot {
    pub slot_id: u32,
    pub name: Option<String>,
    pub physical_track_number: Option<u32>,
    pub edit_rate: Rational,
    #[cfg_attr(feature = "serde", serde(default))]
    pub origin: Position,
    pub data_def: DataDef,
    pub segment: Segment,
}

/// File format of a SourceMob's essence descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorKind {
    Wave,
    Aifc,
    Pcm,
    /// Plain SoundDescriptor without a file format
    Sound,
    /// Tape, import or any non-audio descriptor
    Other,
}

/// Essence descriptor of a SourceMob
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EssenceDescriptor {
    pub kind: DescriptorKind,
    /// NetworkLocator URLs
    #[cfg_attr(feature = "serde", serde(default))]
    pub locators: Vec<String>,
    pub sample_rate: Option<Rational>,
    pub length: Option<Position>,
    pub channels: Option<u16>,
    pub quantization_bits: Option<u16>,
    pub block_align: Option<u16>,
    pub average_bps: Option<u32>,
    /// Raw WAVE header (or AIFC header) kept by WAVE/AIFC descriptors
    pub summary: Option<Vec<u8>>,
}

impl EssenceDescriptor {
    /// Creates an empty descriptor of the given kind
    pub fn new(kind: DescriptorKind) -> Self {
        Self {
            kind,
            locators: Vec::new(),
            sample_rate: None,
            length: None,
            channels: None,
            quantization_bits: None,
            block_align: None,
            average_bps: None,
            summary: None,
        }
    }

    /// True for descriptors of audio files
    pub fn is_audio(&self) -> bool {
        !matches!(self.kind, DescriptorKind::Other)
    }
}

/// Embedded essence stream of a SourceMob
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EssenceData {
    pub mob_id: MobId,
    /// Stream length, in bytes
    pub length: u64,
    /// Compound file nodes holding the stream
    #[cfg_attr(feature = "serde", serde(default))]
    pub nodes: Vec<DataNode>,
}

/// Effect applied by an OperationGroup
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationDef {
    MonoAudioGain,
    StereoAudioGain,
    MonoAudioPan,
    MonoAudioDissolve,
    TwoParameterMonoAudioDissolve,
    StereoAudioDissolve,
    Other(String),
}

impl OperationDef {
    pub fn is_gain(&self) -> bool {
        matches!(self, OperationDef::MonoAudioGain | OperationDef::StereoAudioGain)
    }
}

/// Parameter identifier
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterDef {
    Amplitude,
    Level,
    OutgoingLevel,
    IncomingLevel,
    Pan,
    Other(String),
}

/// Value of an effect parameter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterValue {
    Constant(Rational),
    Varying {
        interpolation: Interpolation,
        points: Vec<ControlPoint>,
    },
}

/// An effect parameter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub definition: ParameterDef,
    pub value: ParameterValue,
}

/// An effect applied to its input segments
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperationGroup {
    pub operation: OperationDef,
    pub length: Position,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: Vec<Parameter>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub inputs: Vec<Segment>,
}

impl OperationGroup {
    /// Finds a parameter by definition
    pub fn parameter(&self, definition: &ParameterDef) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|p| &p.definition == definition)
            .map(|p| &p.value)
    }
}

/// Timeline content of a slot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    Sequence(Vec<Segment>),
    SourceClip {
        length: Position,
        start_time: Position,
        source_id: MobId,
        source_slot_id: u32,
    },
    Filler {
        length: Position,
    },
    Transition {
        length: Position,
        cut_point: Position,
        operation: OperationGroup,
    },
    OperationGroup(OperationGroup),
    Selector {
        selected: Box<Segment>,
        #[cfg_attr(feature = "serde", serde(default))]
        alternates: Vec<Segment>,
    },
    Timecode {
        length: Position,
        start: Position,
        fps: u16,
        drop: bool,
    },
    /// A class the interface layer does not interpret
    Other {
        class: String,
        length: Position,
    },
}

impl Segment {
    /// Length in edit units as declared by the segment
    pub fn length(&self) -> Position {
        match self {
            Segment::Sequence(components) => components
                .iter()
                .map(|c| match c {
                    // Transitions overlap their neighbours
                    Segment::Transition { length, .. } => -length,
                    other => other.length(),
                })
                .sum(),
            Segment::SourceClip { length, .. }
            | Segment::Filler { length }
            | Segment::Transition { length, .. }
            | Segment::Timecode { length, .. }
            | Segment::Other { length, .. } => *length,
            Segment::OperationGroup(group) => group.length,
            Segment::Selector { selected, .. } => selected.length(),
        }
    }
}

/// Decodes an object store previously dumped as JSON
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

#[cfg(feature = "serde")]
impl Decoder for JsonDecoder {
    fn decode(&self, store: &mut AafData, path: &Path) -> Result<()> {
        let file = std::fs::File::open(path)?;
        *store = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition(id: u8, top_level: bool) -> Mob {
        let mut mob_id = MobId::default();
        mob_id.0[0] = id;
        Mob {
            mob_id,
            name: None,
            kind: MobKind::Composition { top_level },
            slots: Vec::new(),
            user_comments: Vec::new(),
            creation_time: None,
        }
    }

    #[test]
    fn test_top_level_composition() {
        let mut store = AafData::new();
        assert!(store.top_level_composition().is_none());

        store.mobs.push(composition(1, false));
        assert_eq!(store.top_level_composition().unwrap().mob_id.0[0], 1);

        store.mobs.push(composition(2, true));
        assert_eq!(store.top_level_composition().unwrap().mob_id.0[0], 2);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_sequence_length_subtracts_transitions() {
        let clip = |length| Segment::SourceClip {
            length,
            start_time: 0,
            source_id: MobId::default(),
            source_slot_id: 1,
        };
        let seq = Segment::Sequence(vec![
            clip(100),
            Segment::Transition {
                length: 10,
                cut_point: 5,
                operation: OperationGroup {
                    operation: OperationDef::MonoAudioDissolve,
                    length: 10,
                    parameters: Vec::new(),
                    inputs: Vec::new(),
                },
            },
            clip(50),
            Segment::Filler { length: 20 },
        ]);
        assert_eq!(seq.length(), 160);
    }

    #[test]
    fn test_timestamp_layout() {
        let ts = Timestamp {
            year: 2017,
            month: 10,
            day: 4,
            hour: 9,
            minute: 5,
            second: 0,
        };
        assert_eq!(ts.bwf_date(), "2017:10:04");
        assert_eq!(ts.bwf_time(), "09:05:00");
    }
}
