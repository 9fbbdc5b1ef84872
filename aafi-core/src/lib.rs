//! AAFI Core Library
//!
//! This library turns a decoded Advanced Authoring Format (AAF) object store
//! into a simplified, linear audio timeline: tracks holding clips and
//! transitions, gain automation, and the essences clips refer to.

pub mod audio;
pub mod comment;
pub mod essence;
pub mod gain;
pub mod iface;
pub mod rational;
pub mod resolve;
pub mod store;
pub mod timeline;
pub mod track;
pub mod transition;

pub use audio::AudioContainer;
pub use comment::UserComment;
pub use essence::{AudioEssence, BroadcastExtension, DataNode, EssenceId, EssenceType, MobId, WaveFormat};
pub use gain::{AudioGain, ControlPoint, GainKind, Interpolation};
pub use iface::{AafIface, ReleaseStats};
pub use rational::{eu_to_hmsf, eu_to_samples, Hmsf, Rational};
pub use resolve::ResolveOptions;
pub use store::{AafData, Decoder};
pub use timeline::{ItemKind, ItemRef, TimelineItem};
pub use track::{AudioClip, AudioTrack, Timecode, TrackFormat, TrackId};
pub use transition::{Transition, TransitionCurves, TransitionKind};

#[cfg(feature = "serde")]
pub use store::JsonDecoder;

/// Position or length expressed in edit units of the owning track
pub type Position = i64;

/// Result type for aafi-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for aafi-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Allocation failed while creating {what}")]
    Allocation {
        what: &'static str,
        #[source]
        source: std::collections::TryReserveError,
    },

    #[error("Failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Zero denominator in rational {0}")]
    ZeroDenominator(Rational),

    #[error("Track {0} has no edit rate")]
    MissingEditRate(u32),

    #[error("Invalid Mob id: {0}")]
    InvalidMobId(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    #[error("Invalid flags: {0:#06x}")]
    InvalidFlags(u32),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reserves room for one more element, reporting failure instead of aborting.
///
/// Every creator goes through this so an exhausted allocator surfaces as
/// [`Error::Allocation`] and leaves the list untouched.
pub(crate) fn reserve_one<T>(list: &mut Vec<T>, what: &'static str) -> Result<()> {
    list.try_reserve(1).map_err(|source| {
        tracing::error!("Out of memory while creating {}: {}", what, source);
        Error::Allocation { what, source }
    })
}
