//! Timeline items and adjacency queries
//!
//! A track holds an ordered sequence of items, each being either a clip or a
//! transition. Neighbours are derived from the position in that sequence, so
//! `prev` and `next` always agree with each other.

use crate::track::{AudioClip, AudioTrack};
use crate::transition::Transition;

/// Which payload an item holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKind {
    Clip,
    Transition,
}

/// One slot in a track's item sequence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimelineItem {
    Clip(AudioClip),
    Transition(Transition),
}

impl TimelineItem {
    /// Returns the payload kind
    pub fn kind(&self) -> ItemKind {
        match self {
            TimelineItem::Clip(_) => ItemKind::Clip,
            TimelineItem::Transition(_) => ItemKind::Transition,
        }
    }

    /// Returns the clip payload
    pub fn as_clip(&self) -> Option<&AudioClip> {
        match self {
            TimelineItem::Clip(clip) => Some(clip),
            TimelineItem::Transition(_) => None,
        }
    }

    /// Returns the transition payload
    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            TimelineItem::Transition(trans) => Some(trans),
            TimelineItem::Clip(_) => None,
        }
    }

    pub(crate) fn as_clip_mut(&mut self) -> Option<&mut AudioClip> {
        match self {
            TimelineItem::Clip(clip) => Some(clip),
            TimelineItem::Transition(_) => None,
        }
    }

    pub(crate) fn as_transition_mut(&mut self) -> Option<&mut Transition> {
        match self {
            TimelineItem::Transition(trans) => Some(trans),
            TimelineItem::Clip(_) => None,
        }
    }

    /// Releases what the payload owns: clip gain or transition curves
    ///
    /// Returns the number of gain or curve objects released.
    pub(crate) fn release(&mut self) -> usize {
        match self {
            TimelineItem::Clip(clip) => usize::from(clip.gain.take().is_some()),
            TimelineItem::Transition(trans) => trans.clear_curves(),
        }
    }
}

/// Borrowed view of an item together with its position in the track
#[derive(Debug, Clone, Copy)]
pub struct ItemRef<'a> {
    track: &'a AudioTrack,
    index: usize,
}

impl<'a> ItemRef<'a> {
    pub(crate) fn new(track: &'a AudioTrack, index: usize) -> Self {
        Self { track, index }
    }

    /// Position of the item within its track
    pub fn index(&self) -> usize {
        self.index
    }

    /// The track holding this item
    pub fn track(&self) -> &'a AudioTrack {
        self.track
    }

    /// The item itself
    pub fn item(&self) -> &'a TimelineItem {
        &self.track.item_slice()[self.index]
    }

    pub fn kind(&self) -> ItemKind {
        self.item().kind()
    }

    pub fn as_clip(&self) -> Option<&'a AudioClip> {
        self.item().as_clip()
    }

    pub fn as_transition(&self) -> Option<&'a Transition> {
        self.item().as_transition()
    }

    /// The item before this one, if any
    pub fn prev(&self) -> Option<ItemRef<'a>> {
        self.index.checked_sub(1).map(|i| ItemRef::new(self.track, i))
    }

    /// The item after this one, if any
    pub fn next(&self) -> Option<ItemRef<'a>> {
        let i = self.index + 1;
        (i < self.track.item_slice().len()).then(|| ItemRef::new(self.track, i))
    }

    /// Fade in applied to this item
    ///
    /// The previous item, when it is a transition flagged as a fade in.
    /// Transitions have no fades of their own.
    pub fn fade_in(&self) -> Option<&'a Transition> {
        self.as_clip()?;
        self.prev()
            .and_then(|prev| prev.as_transition())
            .filter(|trans| trans.is_fade_in())
    }

    /// Fade out applied to this item
    ///
    /// The next item, when it is a transition flagged as a fade out.
    pub fn fade_out(&self) -> Option<&'a Transition> {
        self.as_clip()?;
        self.next()
            .and_then(|next| next.as_transition())
            .filter(|trans| trans.is_fade_out())
    }
}
