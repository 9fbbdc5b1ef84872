//! Top-level handle of the interface layer

use crate::audio::AudioContainer;
use crate::comment::UserComment;
use crate::resolve::{self, ResolveOptions};
use crate::store::{AafData, Decoder};
use crate::{reserve_one, Error, Result};
use std::path::Path;

/// Counts of objects released by [`AafIface::release`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseStats {
    pub tracks: usize,
    pub items: usize,
    pub essences: usize,
    pub comments: usize,
}

impl ReleaseStats {
    /// Total number of released objects
    pub fn total(&self) -> usize {
        self.tracks + self.items + self.essences + self.comments
    }
}

/// Owns a decoded file and the audio timeline resolved from it
#[derive(Debug)]
pub struct AafIface {
    store: AafData,
    audio: AudioContainer,
    composition_name: Option<String>,
    /// Stored oldest first; exposed newest first
    comments: Vec<UserComment>,
    options: ResolveOptions,
}

impl AafIface {
    /// Creates a context around `store`, or around an empty store.
    ///
    /// The audio container is empty until [`AafIface::load_file`] or
    /// [`AafIface::resolve`] runs.
    pub fn new(store: Option<AafData>) -> Result<Self> {
        Self::with_options(store, ResolveOptions::default())
    }

    /// Creates a context with explicit resolution options
    pub fn with_options(store: Option<AafData>, options: ResolveOptions) -> Result<Self> {
        let store = store.unwrap_or_default();
        tracing::debug!("Created interface over {} Mobs", store.mobs.len());
        Ok(Self {
            store,
            audio: AudioContainer::new(),
            composition_name: None,
            comments: Vec::new(),
            options,
        })
    }

    /// Decodes `path` and resolves its audio timeline.
    ///
    /// When decoding fails, nothing is resolved and the container keeps its
    /// previous content.
    pub fn load_file(&mut self, decoder: &dyn Decoder, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("Loading {}", path.display());

        let mut store = AafData::new();
        decoder.decode(&mut store, path).map_err(|e| {
            tracing::error!("Could not load {}: {}", path.display(), e);
            Error::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        self.release();
        self.store = store;
        self.resolve()
    }

    /// Resolves the current store into the audio container.
    ///
    /// The previous timeline and comments are released first, so resolving
    /// again rebuilds the same result.
    pub fn resolve(&mut self) -> Result<()> {
        self.audio.clear();
        self.free_comments();
        self.composition_name = None;

        let composition = resolve::retrieve(&self.store, &mut self.audio, &self.options)?;
        self.composition_name = composition.name;
        for comment in composition.comments {
            reserve_one(&mut self.comments, "user comment")?;
            self.comments.push(comment);
        }
        Ok(())
    }

    /// The decoded object store
    pub fn store(&self) -> &AafData {
        &self.store
    }

    pub fn audio(&self) -> &AudioContainer {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioContainer {
        &mut self.audio
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Name of the resolved composition
    pub fn composition_name(&self) -> Option<&str> {
        self.composition_name.as_deref()
    }

    /// Iterates over comments, most recently added first
    pub fn comments(&self) -> impl Iterator<Item = &UserComment> {
        self.comments.iter().rev()
    }

    /// Adds an empty comment at the head of the comment list
    pub fn new_comment(&mut self) -> Result<&mut UserComment> {
        reserve_one(&mut self.comments, "user comment")?;
        self.comments.push(UserComment::default());
        let last = self.comments.len() - 1;
        Ok(&mut self.comments[last])
    }

    /// Releases every comment, returning how many were released
    pub fn free_comments(&mut self) -> usize {
        let count = self.comments.len();
        self.comments.clear();
        count
    }

    /// Releases everything the context owns; safe to call repeatedly
    pub fn release(&mut self) -> ReleaseStats {
        let (tracks, items, essences) = self.audio.clear();
        let comments = self.free_comments();
        self.composition_name = None;
        self.store.clear();

        let stats = ReleaseStats {
            tracks,
            items,
            essences,
            comments,
        };
        if stats.total() > 0 {
            tracing::debug!("Released {:?}", stats);
        }
        stats
    }
}

impl Drop for AafIface {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::essence::MobId;
    use crate::store::{DataDef, Mob, MobKind, MobSlot, Segment};
    use crate::{ItemKind, Rational, Transition, TransitionKind};
    use std::path::PathBuf;

    struct FailingDecoder;

    impl Decoder for FailingDecoder {
        fn decode(&self, _store: &mut AafData, _path: &Path) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )))
        }
    }

    /// Hands over a prepared store, whatever the path
    struct StoreDecoder(AafData);

    impl Decoder for StoreDecoder {
        fn decode(&self, store: &mut AafData, _path: &Path) -> Result<()> {
            *store = self.0.clone();
            Ok(())
        }
    }

    fn one_track_store() -> AafData {
        let seq = Segment::Sequence(vec![
            Segment::Filler { length: 48000 },
            Segment::SourceClip {
                length: 96000,
                start_time: 0,
                source_id: MobId([1; 32]),
                source_slot_id: 1,
            },
        ]);
        AafData {
            mobs: vec![Mob {
                mob_id: MobId([9; 32]),
                name: Some("Mix".to_string()),
                kind: MobKind::Composition { top_level: true },
                slots: vec![MobSlot {
                    slot_id: 1,
                    name: Some("Dialog".to_string()),
                    physical_track_number: None,
                    edit_rate: Rational::new(48000, 1),
                    origin: 0,
                    data_def: DataDef::Sound,
                    segment: seq,
                }],
                user_comments: Vec::new(),
                creation_time: None,
            }],
            essence_data: Vec::new(),
        }
    }

    #[test]
    fn test_new_is_empty() {
        let iface = AafIface::new(None).unwrap();
        assert!(iface.audio().is_empty());
        assert!(iface.store().is_empty());
        assert!(iface.composition_name().is_none());
        assert_eq!(iface.comments().count(), 0);
    }

    #[test]
    fn test_failed_load_resolves_nothing() {
        let mut iface = AafIface::new(None).unwrap();
        let err = iface
            .load_file(&FailingDecoder, "/nonexistent.aaf")
            .unwrap_err();

        match err {
            Error::Load { path, reason } => {
                assert_eq!(path, "/nonexistent.aaf");
                assert!(reason.contains("no such file"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(iface.audio().track_count(), 0);
        assert_eq!(iface.audio().essence_count(), 0);
    }

    #[test]
    fn test_load_resolves() {
        let mut iface = AafIface::new(None).unwrap();
        iface
            .load_file(&StoreDecoder(one_track_store()), PathBuf::from("mix.aaf"))
            .unwrap();

        assert_eq!(iface.composition_name(), Some("Mix"));
        let track = iface.audio().tracks().next().unwrap();
        assert_eq!(track.name.as_deref(), Some("Dialog"));
        let clip = track.clips().next().unwrap();
        assert_eq!((clip.pos, clip.len), (48000, 96000));

        // Reloading replaces the previous timeline
        iface
            .load_file(&StoreDecoder(one_track_store()), "mix.aaf")
            .unwrap();
        assert_eq!(iface.audio().track_count(), 1);
    }

    #[test]
    fn test_resolve_twice_rebuilds() {
        let mut store = one_track_store();
        store.mobs[0].user_comments.push(crate::store::TaggedValue {
            name: "Take".to_string(),
            value: "3".to_string(),
        });

        let mut iface = AafIface::new(Some(store)).unwrap();
        iface.resolve().unwrap();
        iface.resolve().unwrap();

        assert_eq!(iface.audio().track_count(), 1);
        assert_eq!(iface.audio().tracks().next().unwrap().len(), 1);
        assert_eq!(iface.comments().count(), 1);
        assert_eq!(iface.composition_name(), Some("Mix"));
    }

    #[test]
    fn test_comments_are_lifo() {
        let mut iface = AafIface::new(None).unwrap();
        *iface.new_comment().unwrap() = UserComment::new("a", "1");
        *iface.new_comment().unwrap() = UserComment::new("b", "2");

        let names: Vec<_> = iface.comments().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(iface.free_comments(), 2);
        assert_eq!(iface.free_comments(), 0);
    }

    #[test]
    fn test_one_track_fade_scenario() {
        let mut iface = AafIface::new(None).unwrap();
        let audio = iface.audio_mut();

        let track = audio.new_track().unwrap();
        track.edit_rate = Some(Rational::new(48000, 1));
        let clip = track.new_clip().unwrap();
        clip.pos = 0;
        clip.len = 96000;
        track
            .new_transition(Transition::with_default_curve(
                TransitionKind::FadeOut,
                crate::Interpolation::Linear,
                4800,
                0,
            ))
            .unwrap();

        let track = iface.audio().tracks().next().unwrap();
        let kinds: Vec<_> = track.items().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec![ItemKind::Clip, ItemKind::Transition]);

        let clip = track.item(0).unwrap();
        assert_eq!(clip.fade_out().unwrap().len, 4800);
        assert!(clip.fade_in().is_none());

        let stats = iface.release();
        assert_eq!(
            stats,
            ReleaseStats {
                tracks: 1,
                items: 2,
                essences: 0,
                comments: 0
            }
        );
        assert_eq!(iface.release(), ReleaseStats::default());
    }
}
