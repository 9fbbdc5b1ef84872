//! The audio container: every track and essence of a composition

use crate::essence::{AudioEssence, EssenceId, MobId};
use crate::track::{AudioTrack, Timecode, TrackId};
use crate::{reserve_one, Result};

/// Owns the essence list, the track list and the start timecode
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioContainer {
    /// Start timecode of the composition
    pub tc: Option<Timecode>,
    /// Stored oldest first; exposed newest first
    essences: Vec<AudioEssence>,
    tracks: Vec<AudioTrack>,
    current_track: Option<TrackId>,
    next_essence_id: u32,
}

impl AudioContainer {
    /// Creates an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is no track, no essence and no timecode
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.essences.is_empty() && self.tc.is_none()
    }

    /// Appends a new mono track and makes it the current one
    pub fn new_track(&mut self) -> Result<&mut AudioTrack> {
        reserve_one(&mut self.tracks, "audio track")?;
        let id = TrackId(self.tracks.len());
        self.tracks.push(AudioTrack::new(id));
        self.current_track = Some(id);
        Ok(&mut self.tracks[id.0])
    }

    /// Iterates over tracks in creation order
    pub fn tracks(&self) -> std::slice::Iter<'_, AudioTrack> {
        self.tracks.iter()
    }

    /// Number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, id: TrackId) -> Option<&AudioTrack> {
        self.tracks.get(id.0)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut AudioTrack> {
        self.tracks.get_mut(id.0)
    }

    /// The most recently created track
    pub fn current_track(&self) -> Option<&AudioTrack> {
        self.current_track.and_then(|id| self.track(id))
    }

    pub fn current_track_mut(&mut self) -> Option<&mut AudioTrack> {
        self.current_track.and_then(|id| self.tracks.get_mut(id.0))
    }

    /// Releases every track and its items, returning `(tracks, items)` released
    pub fn free_tracks(&mut self) -> (usize, usize) {
        let tracks = self.tracks.len();
        let items: usize = self
            .tracks
            .drain(..)
            .map(|mut track| track.release())
            .sum();
        self.current_track = None;
        (tracks, items)
    }

    /// Creates an essence at the head of the essence list
    pub fn new_essence(&mut self) -> Result<&mut AudioEssence> {
        reserve_one(&mut self.essences, "audio essence")?;
        let id = EssenceId(self.next_essence_id);
        self.next_essence_id += 1;
        self.essences.push(AudioEssence {
            id,
            ..Default::default()
        });
        let last = self.essences.len() - 1;
        Ok(&mut self.essences[last])
    }

    /// Iterates over essences, most recently created first
    pub fn essences(&self) -> std::iter::Rev<std::slice::Iter<'_, AudioEssence>> {
        self.essences.iter().rev()
    }

    /// Number of essences
    pub fn essence_count(&self) -> usize {
        self.essences.len()
    }

    /// Looks up an essence by id
    pub fn essence(&self, id: EssenceId) -> Option<&AudioEssence> {
        self.essences.iter().find(|e| e.id == id)
    }

    pub fn essence_mut(&mut self, id: EssenceId) -> Option<&mut AudioEssence> {
        self.essences.iter_mut().find(|e| e.id == id)
    }

    /// Looks up the essence referenced through a MasterMob
    pub fn essence_by_master_mob(&self, mob_id: &MobId) -> Option<&AudioEssence> {
        self.essences().find(|e| &e.master_mob_id == mob_id)
    }

    /// Releases every essence, returning how many were released
    pub fn free_essences(&mut self) -> usize {
        let count = self.essences.len();
        for mut essence in self.essences.drain(..) {
            essence.clear_files();
        }
        count
    }

    /// Releases tracks, essences and timecode
    pub fn clear(&mut self) -> (usize, usize, usize) {
        let (tracks, items) = self.free_tracks();
        let essences = self.free_essences();
        self.tc = None;
        (tracks, items, essences)
    }
}
