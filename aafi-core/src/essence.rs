//! Audio essence descriptions
//!
//! An essence is one unit of referenced audio media, either embedded in the
//! AAF file or living in an external file. Its WAVE format block and BWF
//! broadcast metadata are kept exactly as found in the source.

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Stable identifier of an essence inside its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EssenceId(pub u32);

/// 32-byte AAF Mob identifier (a basic SMPTE UMID)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MobId(pub [u8; 32]);

impl MobId {
    /// Returns true if every byte is zero
    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl FromStr for MobId {
    type Err = Error;

    /// Parses 64 hexadecimal digits
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 64 || !s.is_ascii() {
            return Err(Error::InvalidMobId(s.to_string()));
        }

        let mut id = [0u8; 32];
        for (i, byte) in id.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidMobId(s.to_string()))?;
        }
        Ok(Self(id))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MobId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MobId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MobId({})", self)
    }
}

impl fmt::Display for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Opaque handle to a data node of the underlying compound file
///
/// Only the container reader can give meaning to the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataNode(pub u32);

/// Kind of audio file the essence was described as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EssenceType {
    #[default]
    Pcm,
    Wave,
    Aifc,
    Bwav,
}

impl EssenceType {
    /// Returns the numeric type tag
    pub fn tag(self) -> u16 {
        match self {
            EssenceType::Pcm => 0x01,
            EssenceType::Wave => 0x02,
            EssenceType::Aifc => 0x03,
            EssenceType::Bwav => 0x04,
        }
    }
}

/// Fields of a RIFF WAVE `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveFormat {
    /// Compression tag (1 for PCM)
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    /// Size of the fields read by [`WaveFormat::read`]
    pub const SIZE: usize = 16;

    /// Reads the body of a `fmt ` chunk (without the chunk header)
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let format_tag = reader.read_u16::<LittleEndian>()?;
        let channels = reader.read_u16::<LittleEndian>()?;
        let samples_per_sec = reader.read_u32::<LittleEndian>()?;
        let avg_bytes_per_sec = reader.read_u32::<LittleEndian>()?;
        let block_align = reader.read_u16::<LittleEndian>()?;
        let bits_per_sample = reader.read_u16::<LittleEndian>()?;

        Ok(Self {
            format_tag,
            channels,
            samples_per_sec,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
        })
    }

    /// Finds and reads the `fmt ` chunk of a complete RIFF/WAVE header
    pub fn from_riff(data: &[u8]) -> Result<Self> {
        let body = find_riff_chunk(data, b"fmt ").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "no fmt chunk in WAVE summary",
            ))
        })?;
        Self::read(&mut &body[..])
    }
}

/// Fields of a BWF `bext` chunk, stored with their on-disk sizes
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BroadcastExtension {
    #[cfg_attr(feature = "serde", serde(with = "byte_array"))]
    pub description: [u8; 256],
    #[cfg_attr(feature = "serde", serde(with = "byte_array"))]
    pub originator: [u8; 32],
    #[cfg_attr(feature = "serde", serde(with = "byte_array"))]
    pub originator_reference: [u8; 32],
    /// Samples since midnight of the first sample
    pub time_reference: u64,
    #[cfg_attr(feature = "serde", serde(with = "byte_array"))]
    pub umid: [u8; 64],
    /// yyyy:mm:dd
    #[cfg_attr(feature = "serde", serde(with = "byte_array"))]
    pub origination_date: [u8; 10],
    /// hh:mm:ss
    #[cfg_attr(feature = "serde", serde(with = "byte_array"))]
    pub origination_time: [u8; 8],
}

impl Default for BroadcastExtension {
    fn default() -> Self {
        Self {
            description: [0; 256],
            originator: [0; 32],
            originator_reference: [0; 32],
            time_reference: 0,
            umid: [0; 64],
            origination_date: [0; 10],
            origination_time: [0; 8],
        }
    }
}

impl fmt::Debug for BroadcastExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastExtension")
            .field("description", &text(&self.description))
            .field("originator", &text(&self.originator))
            .field("originator_reference", &text(&self.originator_reference))
            .field("time_reference", &self.time_reference)
            .field("origination_date", &text(&self.origination_date))
            .field("origination_time", &text(&self.origination_time))
            .finish_non_exhaustive()
    }
}

impl BroadcastExtension {
    /// Reads the body of a `bext` chunk up to and including the UMID
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bext = Self::default();
        reader.read_exact(&mut bext.description)?;
        reader.read_exact(&mut bext.originator)?;
        reader.read_exact(&mut bext.originator_reference)?;
        reader.read_exact(&mut bext.origination_date)?;
        reader.read_exact(&mut bext.origination_time)?;
        let low = reader.read_u32::<LittleEndian>()?;
        let high = reader.read_u32::<LittleEndian>()?;
        bext.time_reference = (high as u64) << 32 | low as u64;
        let _version = reader.read_u16::<LittleEndian>()?;
        reader.read_exact(&mut bext.umid)?;
        Ok(bext)
    }

    /// Finds and reads the `bext` chunk of a complete RIFF/WAVE header
    pub fn from_riff(data: &[u8]) -> Option<Result<Self>> {
        find_riff_chunk(data, b"bext").map(|body| Self::read(&mut &body[..]))
    }

    /// Copies `value` into the description field, truncating if needed
    pub fn set_description(&mut self, value: &str) {
        copy_text(&mut self.description, value);
    }

    /// Copies `value` into the originator field, truncating if needed
    pub fn set_originator(&mut self, value: &str) {
        copy_text(&mut self.originator, value);
    }

    /// Copies `value` into the originator reference field, truncating if needed
    pub fn set_originator_reference(&mut self, value: &str) {
        copy_text(&mut self.originator_reference, value);
    }

    /// Copies date (`yyyy:mm:dd`) and time (`hh:mm:ss`) of origination
    pub fn set_origination(&mut self, date: &str, time: &str) {
        copy_text(&mut self.origination_date, date);
        copy_text(&mut self.origination_time, time);
    }

    /// Description up to the first NUL
    pub fn description(&self) -> String {
        text(&self.description)
    }

    /// Originator up to the first NUL
    pub fn originator(&self) -> String {
        text(&self.originator)
    }

    /// Originator reference up to the first NUL
    pub fn originator_reference(&self) -> String {
        text(&self.originator_reference)
    }

    /// Origination date up to the first NUL
    pub fn origination_date(&self) -> String {
        text(&self.origination_date)
    }

    /// Origination time up to the first NUL
    pub fn origination_time(&self) -> String {
        text(&self.origination_time)
    }
}

/// One unit of referenced audio media
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioEssence {
    /// Identifier used by clips to reference this essence
    pub id: EssenceId,
    /// Data lives inside the AAF file
    pub is_embedded: bool,
    /// Location of the original file when not embedded
    pub original_file: Option<String>,
    /// Location the essence was exported to
    pub exported_file: Option<String>,
    /// File name without directory
    pub file_name: Option<String>,
    /// File name made unique among all essences of the composition
    pub unique_file_name: Option<String>,
    /// Length of the essence data, in bytes
    pub length: u64,
    /// Data stream nodes of an embedded essence, in stream order
    pub nodes: Vec<DataNode>,
    /// SourceMob this essence data belongs to
    pub source_mob_id: MobId,
    /// MasterMob referenced by composition clips
    pub master_mob_id: MobId,
    pub essence_type: EssenceType,
    pub format: WaveFormat,
    pub bext: BroadcastExtension,
    /// Number of composition clips cut from this essence
    pub sub_clip_count: u16,
}

impl AudioEssence {
    /// Returns the file names held by this essence
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        [
            &self.original_file,
            &self.exported_file,
            &self.file_name,
            &self.unique_file_name,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
    }

    /// Releases the owned names and data nodes
    pub fn clear_files(&mut self) {
        self.original_file = None;
        self.exported_file = None;
        self.file_name = None;
        self.unique_file_name = None;
        self.nodes.clear();
    }
}

/// Returns the body of the first chunk with the given id in a RIFF buffer
fn find_riff_chunk<'a>(data: &'a [u8], id: &[u8; 4]) -> Option<&'a [u8]> {
    // Skip the "RIFF" <size> "WAVE" header when present
    let mut rest = if data.len() >= 12 && &data[0..4] == b"RIFF" {
        &data[12..]
    } else {
        data
    };

    while rest.len() >= 8 {
        let chunk_id = &rest[0..4];
        let size = (&rest[4..8]).read_u32::<LittleEndian>().ok()? as usize;
        let body = rest.get(8..8 + size)?;
        if chunk_id == id {
            return Some(body);
        }
        // Chunks are padded to an even size
        let next = 8 + size + (size & 1);
        rest = rest.get(next..)?;
    }

    None
}

fn copy_text(dst: &mut [u8], value: &str) {
    dst.fill(0);
    let n = value.len().min(dst.len());
    dst[..n].copy_from_slice(&value.as_bytes()[..n]);
}

fn text(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(feature = "serde")]
mod byte_array {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"a fixed-size byte field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn fmt_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.write_u16::<LittleEndian>(1).unwrap();
        body.write_u16::<LittleEndian>(2).unwrap();
        body.write_u32::<LittleEndian>(48000).unwrap();
        body.write_u32::<LittleEndian>(48000 * 6).unwrap();
        body.write_u16::<LittleEndian>(6).unwrap();
        body.write_u16::<LittleEndian>(24).unwrap();
        body
    }

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.write_u32::<LittleEndian>(body.len() as u32).unwrap();
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn test_wave_format_read() {
        let format = WaveFormat::read(&mut &fmt_body()[..]).unwrap();
        assert_eq!(format.format_tag, 1);
        assert_eq!(format.channels, 2);
        assert_eq!(format.samples_per_sec, 48000);
        assert_eq!(format.avg_bytes_per_sec, 288000);
        assert_eq!(format.block_align, 6);
        assert_eq!(format.bits_per_sample, 24);
    }

    #[test]
    fn test_wave_format_truncated() {
        let body = fmt_body();
        assert!(WaveFormat::read(&mut &body[..10]).is_err());
    }

    #[test]
    fn test_riff_summary() {
        let mut bext = vec![0u8; 412];
        bext[..5].copy_from_slice(b"Take1");
        bext[256..260].copy_from_slice(b"Desk");
        bext[320..330].copy_from_slice(b"2017:10:04");
        bext[330..338].copy_from_slice(b"12:30:00");
        bext[338..342].copy_from_slice(&0x0000_0010u32.to_le_bytes());
        bext[342..346].copy_from_slice(&0x0000_0001u32.to_le_bytes());
        bext[348] = 0x06;

        let mut riff = b"RIFF\0\0\0\0WAVE".to_vec();
        riff.extend(chunk(b"junk", &[1, 2, 3]));
        riff.extend(chunk(b"bext", &bext));
        riff.extend(chunk(b"fmt ", &fmt_body()));

        let format = WaveFormat::from_riff(&riff).unwrap();
        assert_eq!(format.channels, 2);

        let bext = BroadcastExtension::from_riff(&riff).unwrap().unwrap();
        assert_eq!(bext.description(), "Take1");
        assert_eq!(bext.originator(), "Desk");
        assert_eq!(bext.origination_date(), "2017:10:04");
        assert_eq!(bext.origination_time(), "12:30:00");
        assert_eq!(bext.time_reference, (1u64 << 32) | 0x10);
        assert_eq!(bext.umid[0], 0x06);
    }

    #[test]
    fn test_riff_without_fmt() {
        let riff = chunk(b"data", &[0; 4]);
        assert!(WaveFormat::from_riff(&riff).is_err());
        assert!(BroadcastExtension::from_riff(&riff).is_none());
    }

    #[test]
    fn test_set_description_truncates() {
        let mut bext = BroadcastExtension::default();
        bext.set_originator(&"x".repeat(40));
        assert_eq!(bext.originator().len(), 32);
        bext.set_originator("short");
        assert_eq!(bext.originator(), "short");
    }

    #[test]
    fn test_mob_id_display() {
        let mut id = MobId::default();
        assert!(id.is_nil());
        id.0[31] = 0xab;
        assert!(id.to_string().ends_with("ab"));
        assert_eq!(id.to_string().len(), 64);
        assert_eq!(id.to_string().parse::<MobId>().unwrap(), id);
        assert!("0a0b".parse::<MobId>().is_err());
        assert!("zz".repeat(32).parse::<MobId>().is_err());
    }

    #[test]
    fn test_clear_files() {
        let mut essence = AudioEssence {
            original_file: Some("file:///a.wav".to_string()),
            file_name: Some("a.wav".to_string()),
            nodes: vec![DataNode(3)],
            ..Default::default()
        };
        assert_eq!(essence.file_names().count(), 2);
        essence.clear_files();
        assert_eq!(essence.file_names().count(), 0);
        assert!(essence.nodes.is_empty());
    }
}
