//! Resolution pass: decoded Mobs to a linear audio timeline
//!
//! Essences are built first from MasterMob/SourceMob pairs so that clips can
//! point at them. The top-level composition is then walked slot by slot;
//! sequences, selectors, fillers and gain operation groups collapse into
//! plain clips and transitions on one track per sound slot.

use crate::audio::AudioContainer;
use crate::comment::UserComment;
use crate::essence::{AudioEssence, BroadcastExtension, EssenceId, EssenceType, MobId, WaveFormat};
use crate::gain::{AudioGain, Interpolation};
use crate::store::{
    AafData, DataDef, DescriptorKind, EssenceDescriptor, Mob, MobSlot, OperationDef,
    OperationGroup, ParameterDef, ParameterValue, Segment,
};
use crate::track::{AudioTrack, Timecode, TrackFormat, TrackId};
use crate::transition::{Transition, TransitionKind};
use crate::{Position, Result};
use std::collections::HashMap;

/// Options of the resolution pass
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Number given to the first track without a physical track number
    pub first_track_number: u32,
    /// Interpolation of transitions whose curve is not described
    pub default_interpolation: Interpolation,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            first_track_number: 1,
            default_interpolation: Interpolation::Linear,
        }
    }
}

/// Composition-level data found while resolving
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub name: Option<String>,
    pub comments: Vec<UserComment>,
}

/// Populates `audio` from `store`, essences first and tracks second
pub fn retrieve(
    store: &AafData,
    audio: &mut AudioContainer,
    options: &ResolveOptions,
) -> Result<Composition> {
    let index = retrieve_essences(store, audio)?;
    let composition = retrieve_clips(store, audio, &index, options)?;
    count_sub_clips(audio);

    tracing::debug!(
        "Resolved {} essences and {} tracks",
        audio.essence_count(),
        audio.track_count()
    );

    Ok(composition)
}

/// Maps Mob references found in compositions to essences
#[derive(Debug, Default)]
struct EssenceIndex {
    by_slot: HashMap<(MobId, u32), EssenceId>,
    by_mob: HashMap<MobId, EssenceId>,
}

impl EssenceIndex {
    fn insert(&mut self, master: MobId, slot_id: u32, source: MobId, id: EssenceId) {
        self.by_slot.insert((master, slot_id), id);
        self.by_mob.entry(master).or_insert(id);
        self.by_mob.entry(source).or_insert(id);
    }

    fn lookup(&self, mob: &MobId, slot_id: u32) -> Option<EssenceId> {
        self.by_slot
            .get(&(*mob, slot_id))
            .or_else(|| self.by_mob.get(mob))
            .copied()
    }
}

fn retrieve_essences(store: &AafData, audio: &mut AudioContainer) -> Result<EssenceIndex> {
    let mut index = EssenceIndex::default();

    for master in store.master_mobs() {
        for slot in master.slots.iter().filter(|s| s.data_def == DataDef::Sound) {
            let Some((source_id, source_slot_id)) = find_source_clip(&slot.segment) else {
                tracing::debug!("MasterMob {} slot {} has no SourceClip", master.mob_id, slot.slot_id);
                continue;
            };

            let Some(source) = store.mob(&source_id) else {
                tracing::warn!("SourceMob {} referenced by MasterMob {} not found", source_id, master.mob_id);
                continue;
            };

            let Some(descriptor) = source.descriptor().filter(|d| d.is_audio()) else {
                tracing::warn!("SourceMob {} has no audio descriptor", source_id);
                continue;
            };

            let unique_name = unique_file_name(audio, master, source, descriptor);

            let essence = audio.new_essence()?;
            essence.master_mob_id = master.mob_id;
            essence.source_mob_id = source_id;
            essence.unique_file_name = Some(unique_name);

            fill_format(essence, descriptor);
            fill_location(essence, store, &source_id, descriptor);
            if essence.essence_type != EssenceType::Bwav {
                fill_bext(essence, master, source, source_slot_id);
            }

            index.insert(master.mob_id, slot.slot_id, source_id, essence.id);
        }
    }

    Ok(index)
}

/// First SourceClip reachable from a segment
fn find_source_clip(segment: &Segment) -> Option<(MobId, u32)> {
    match segment {
        Segment::SourceClip {
            source_id,
            source_slot_id,
            ..
        } if !source_id.is_nil() => Some((*source_id, *source_slot_id)),
        Segment::Sequence(components) => components.iter().find_map(find_source_clip),
        Segment::OperationGroup(group) => group.inputs.iter().find_map(find_source_clip),
        Segment::Selector { selected, .. } => find_source_clip(selected),
        _ => None,
    }
}

fn fill_format(essence: &mut AudioEssence, descriptor: &EssenceDescriptor) {
    essence.essence_type = match descriptor.kind {
        DescriptorKind::Wave => EssenceType::Wave,
        DescriptorKind::Aifc => EssenceType::Aifc,
        DescriptorKind::Pcm | DescriptorKind::Sound | DescriptorKind::Other => EssenceType::Pcm,
    };

    // WAVE descriptors keep the whole RIFF header in their summary
    if let (DescriptorKind::Wave, Some(summary)) = (descriptor.kind, &descriptor.summary) {
        match WaveFormat::from_riff(summary) {
            Ok(format) => essence.format = format,
            Err(e) => tracing::warn!("Unreadable WAVE summary for {}: {}", essence.source_mob_id, e),
        }

        match BroadcastExtension::from_riff(summary) {
            Some(Ok(bext)) => {
                essence.bext = bext;
                essence.essence_type = EssenceType::Bwav;
            }
            Some(Err(e)) => tracing::warn!("Unreadable bext chunk for {}: {}", essence.source_mob_id, e),
            None => {}
        }
    }

    let format = &mut essence.format;
    if format.format_tag == 0 {
        format.format_tag = 1;
    }
    if let Some(channels) = descriptor.channels {
        format.channels = channels;
    }
    if let Some(bits) = descriptor.quantization_bits {
        format.bits_per_sample = bits;
    }
    if let Some(rate) = descriptor.sample_rate {
        match rate.numerator.checked_div(rate.denominator).map(u32::try_from) {
            Some(Ok(hz)) => format.samples_per_sec = hz,
            _ => tracing::warn!("Invalid sample rate {} for {}", rate, essence.source_mob_id),
        }
    }
    if let Some(align) = descriptor.block_align {
        format.block_align = align;
    }
    if let Some(bps) = descriptor.average_bps {
        format.avg_bytes_per_sec = bps;
    }
}

fn fill_location(
    essence: &mut AudioEssence,
    store: &AafData,
    source_id: &MobId,
    descriptor: &EssenceDescriptor,
) {
    if let Some(data) = store.essence_data(source_id) {
        essence.is_embedded = true;
        essence.length = data.length;
        essence.nodes = data.nodes.clone();
        return;
    }

    if let Some(url) = descriptor.locators.first() {
        essence.original_file = Some(url.clone());
        essence.file_name = url
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
    } else {
        tracing::warn!("External essence {} has no locator", source_id);
    }
}

/// Builds BWF metadata from the Mobs when the source carries no bext chunk
fn fill_bext(essence: &mut AudioEssence, master: &Mob, source: &Mob, source_slot_id: u32) {
    let bext = &mut essence.bext;

    if let Some(name) = master.name.as_deref().or(source.name.as_deref()) {
        bext.set_description(name);
    }

    bext.umid[..32].copy_from_slice(&source.mob_id.0);

    if let Some(slot) = source.slot(source_slot_id) {
        bext.time_reference = slot.origin.max(0) as u64;
    }

    if let Some(created) = source.creation_time {
        bext.set_origination(&created.bwf_date(), &created.bwf_time());
    }
}

fn unique_file_name(
    audio: &AudioContainer,
    master: &Mob,
    source: &Mob,
    descriptor: &EssenceDescriptor,
) -> String {
    let base = master
        .name
        .clone()
        .or_else(|| source.name.clone())
        .or_else(|| {
            descriptor
                .locators
                .first()
                .and_then(|url| url.rsplit(['/', '\\']).next().map(str::to_string))
        })
        .unwrap_or_else(|| master.mob_id.to_string());

    let taken = |name: &str| {
        audio
            .essences()
            .any(|e| e.unique_file_name.as_deref() == Some(name))
    };

    if !taken(&base) {
        return base;
    }

    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|name| !taken(name))
        .unwrap_or(base)
}

fn retrieve_clips(
    store: &AafData,
    audio: &mut AudioContainer,
    index: &EssenceIndex,
    options: &ResolveOptions,
) -> Result<Composition> {
    let Some(comp) = store.top_level_composition() else {
        tracing::debug!("No CompositionMob in store");
        return Ok(Composition::default());
    };

    let composition = Composition {
        name: comp.name.clone(),
        comments: comp
            .user_comments
            .iter()
            .map(|c| UserComment::new(c.name.clone(), c.value.clone()))
            .collect(),
    };

    let mut next_number = options.first_track_number;

    for slot in &comp.slots {
        match &slot.data_def {
            DataDef::Sound => {
                let track = audio.new_track()?;
                track.number = slot.physical_track_number.unwrap_or(next_number);
                next_number = track.number + 1;
                resolve_sound_slot(track, slot, index, options)?;

                let track_id = track.id();
                if let Some(format) = essence_format(audio, track_id) {
                    if let Some(track) = audio.track_mut(track_id) {
                        track.format = format;
                    }
                }
            }
            DataDef::Timecode => {
                if let Some(tc) = find_timecode(&slot.segment) {
                    audio.tc = Some(tc);
                }
            }
            other => tracing::debug!("Skipping {:?} slot {}", other, slot.slot_id),
        }
    }

    Ok(composition)
}

/// Multichannel layout of the first essence played on a track
fn essence_format(audio: &AudioContainer, track: TrackId) -> Option<TrackFormat> {
    audio
        .track(track)?
        .clips()
        .filter_map(|clip| clip.essence.and_then(|id| audio.essence(id)))
        .find_map(|essence| TrackFormat::from_channels(essence.format.channels))
        .filter(|format| *format != TrackFormat::Mono)
}

fn find_timecode(segment: &Segment) -> Option<Timecode> {
    match segment {
        Segment::Timecode {
            start, fps, drop, ..
        } => Some(Timecode {
            start: *start,
            fps: *fps,
            drop: *drop,
        }),
        Segment::Sequence(components) => components.iter().find_map(find_timecode),
        _ => None,
    }
}

fn resolve_sound_slot(
    track: &mut AudioTrack,
    slot: &MobSlot,
    index: &EssenceIndex,
    options: &ResolveOptions,
) -> Result<()> {
    track.name = slot.name.clone();
    track.edit_rate = Some(slot.edit_rate);

    // Operation groups wrapping the whole slot apply to the track
    let mut segment = &slot.segment;
    while let Segment::OperationGroup(group) = segment {
        let Some(input) = group.inputs.first() else {
            break;
        };
        match &group.operation {
            op if op.is_gain() => {
                if *op == OperationDef::StereoAudioGain {
                    track.format = TrackFormat::Stereo;
                }
                track.gain = gain_from(group, &ParameterDef::Amplitude);
            }
            OperationDef::MonoAudioPan => track.pan = gain_from(group, &ParameterDef::Pan),
            _ => break,
        }
        segment = input;
    }

    let mut walker = SlotWalker {
        track,
        index,
        options,
        pos: 0,
    };
    walker.walk(segment)
}

/// Walks one slot, appending items to its track
struct SlotWalker<'a> {
    track: &'a mut AudioTrack,
    index: &'a EssenceIndex,
    options: &'a ResolveOptions,
    pos: Position,
}

impl SlotWalker<'_> {
    fn walk(&mut self, segment: &Segment) -> Result<()> {
        match segment {
            Segment::Sequence(components) => {
                for (i, component) in components.iter().enumerate() {
                    if let Segment::Transition {
                        length,
                        cut_point,
                        operation,
                    } = component
                    {
                        let before = i > 0 && is_audible(&components[i - 1]);
                        let after = components.get(i + 1).is_some_and(is_audible);
                        self.transition(*length, *cut_point, operation, before, after)?;
                    } else {
                        self.walk(component)?;
                    }
                }
            }
            Segment::SourceClip {
                length,
                start_time,
                source_id,
                source_slot_id,
            } => {
                if source_id.is_nil() {
                    // A clip pointing nowhere is silence
                    self.pos += length;
                    return Ok(());
                }

                let essence = self.index.lookup(source_id, *source_slot_id);
                if essence.is_none() {
                    tracing::warn!("No essence for SourceClip referencing {}", source_id);
                }

                let clip = self.track.new_clip()?;
                clip.pos = self.pos;
                clip.len = *length;
                clip.essence_offset = *start_time;
                clip.essence = essence;
                self.pos += length;
            }
            Segment::Filler { length } => self.pos += length,
            Segment::OperationGroup(group) => self.operation_group(group)?,
            Segment::Selector { selected, .. } => self.walk(selected)?,
            Segment::Transition { .. } => {
                tracing::warn!("Transition outside of a Sequence ignored");
            }
            Segment::Timecode { length, .. } => self.pos += length,
            Segment::Other { class, length } => {
                tracing::warn!("Unsupported segment {} treated as silence", class);
                self.pos += length;
            }
        }
        Ok(())
    }

    fn operation_group(&mut self, group: &OperationGroup) -> Result<()> {
        let Some(input) = group.inputs.first() else {
            self.pos += group.length;
            return Ok(());
        };

        let first_item = self.track.len();
        self.walk(input)?;

        if group.operation.is_gain() {
            if let Some(gain) = gain_from(group, &ParameterDef::Amplitude) {
                // Innermost gain wins when groups are nested
                for clip in self.track.clips_from_mut(first_item) {
                    if clip.gain.is_none() {
                        clip.gain = Some(gain.clone());
                    }
                }
            }
        } else {
            tracing::debug!("Operation {:?} on clip level ignored", group.operation);
        }

        Ok(())
    }

    fn transition(
        &mut self,
        length: Position,
        cut_point: Position,
        operation: &OperationGroup,
        before: bool,
        after: bool,
    ) -> Result<()> {
        let kind = match (before, after) {
            (false, _) => TransitionKind::FadeIn,
            (true, false) => TransitionKind::FadeOut,
            (true, true) => TransitionKind::CrossFade,
        };

        // The transition overlaps the end of the previous segment
        self.pos = (self.pos - length).max(0);

        let transition = transition_from(kind, length, cut_point, operation, self.options);
        self.track.new_transition(transition)?;
        Ok(())
    }
}

/// Segments producing sound
fn is_audible(segment: &Segment) -> bool {
    match segment {
        Segment::SourceClip { source_id, .. } => !source_id.is_nil(),
        Segment::Sequence(components) => components.iter().any(is_audible),
        Segment::OperationGroup(group) => group.inputs.iter().any(is_audible),
        Segment::Selector { selected, .. } => is_audible(selected),
        Segment::Filler { .. }
        | Segment::Transition { .. }
        | Segment::Timecode { .. }
        | Segment::Other { .. } => false,
    }
}

fn gain_from(group: &OperationGroup, definition: &ParameterDef) -> Option<AudioGain> {
    let value = group
        .parameter(definition)
        .or_else(|| group.parameter(&ParameterDef::Level))?;

    match value {
        ParameterValue::Constant(v) => Some(AudioGain::constant(*v)),
        ParameterValue::Varying {
            interpolation,
            points,
        } => match AudioGain::variable(*interpolation, points.clone()) {
            Ok(gain) => Some(gain),
            Err(e) => {
                tracing::warn!("Ignoring {:?} curve: {}", definition, e);
                None
            }
        },
    }
}

fn transition_from(
    kind: TransitionKind,
    length: Position,
    cut_point: Position,
    operation: &OperationGroup,
    options: &ResolveOptions,
) -> Transition {
    let varying = |definition: &ParameterDef| match operation.parameter(definition) {
        Some(ParameterValue::Varying {
            interpolation,
            points,
        }) => Some((*interpolation, points.clone())),
        _ => None,
    };

    let built = if operation.operation == OperationDef::TwoParameterMonoAudioDissolve {
        match (
            varying(&ParameterDef::OutgoingLevel),
            varying(&ParameterDef::IncomingLevel),
        ) {
            (Some((interpolation, a)), Some((incoming, b))) => {
                // One interpolation per transition: the outgoing one
                if incoming != interpolation {
                    tracing::warn!(
                        "Incoming curve interpolation {:?} replaced by {:?}",
                        incoming,
                        interpolation
                    );
                }
                Some(Transition::two_curve(
                    kind,
                    interpolation,
                    length,
                    cut_point,
                    a,
                    b,
                ))
            }
            _ => None,
        }
    } else {
        varying(&ParameterDef::Level).map(|(interpolation, curve)| {
            Transition::single(kind, interpolation, length, cut_point, curve)
        })
    };

    match built {
        Some(Ok(transition)) => transition,
        Some(Err(e)) => {
            tracing::warn!("Invalid transition curve, using default: {}", e);
            Transition::with_default_curve(kind, options.default_interpolation, length, cut_point)
        }
        None => {
            Transition::with_default_curve(kind, options.default_interpolation, length, cut_point)
        }
    }
}

fn count_sub_clips(audio: &mut AudioContainer) {
    let mut counts: HashMap<EssenceId, u16> = HashMap::new();
    for clip in audio.tracks().flat_map(|t| t.clips()) {
        if let Some(id) = clip.essence {
            let count = counts.entry(id).or_default();
            *count = count.saturating_add(1);
        }
    }

    for (id, count) in counts {
        if let Some(essence) = audio.essence_mut(id) {
            essence.sub_clip_count = count;
        }
    }
}
