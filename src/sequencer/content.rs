// Content - Musical material the transport dispatches to
// Tracks and note handles are collaborators; the transport only sees these traits

use super::play_position::{PlayMode, PlayPosition};

/// Playable track (instrument, sample, beat/bassline or automation track)
pub trait Track: Send {
    /// Render `frames` frames for the tick at `position`, starting `offset`
    /// frames into the current period. `content_index` selects the
    /// beat/bassline or pattern slot when only one of them should sound.
    fn play(
        &mut self,
        position: &PlayPosition,
        frames: usize,
        offset: usize,
        content_index: Option<usize>,
    );

    /// Length of the track's content in tacts
    fn length_tacts(&self) -> i64;
}

/// Registry of currently sounding note handles
pub trait NoteRegistry: Send {
    /// Silence every active note immediately
    fn clear(&mut self);

    /// Rescale note lengths after a tempo change
    fn retempo(&mut self, bpm: u16);

    /// Reset envelope/LFO phase when song playback starts from the top
    fn restart_modulators(&mut self) {}
}

/// Registry that ignores every call (no note engine attached)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNoteRegistry;

impl NoteRegistry for NullNoteRegistry {
    fn clear(&mut self) {}

    fn retempo(&mut self, _bpm: u16) {}
}

/// Index of a track in the arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

/// Pattern chosen for preview playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRef {
    /// Track owning the pattern
    pub track: TrackId,
    /// Slot of the pattern within its track
    pub index: usize,
    pub length_tacts: i64,
    /// Pattern is being rendered offline (freeze)
    pub freezing: bool,
}

impl PatternRef {
    pub fn new(track: TrackId, index: usize, length_tacts: i64) -> Self {
        Self {
            track,
            index,
            length_tacts,
            freezing: false,
        }
    }
}

/// One beat/bassline: the track that plays it and its length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatBassline {
    pub track: TrackId,
    pub length_tacts: i64,
}

/// Beat/bassline container with a current selection
#[derive(Debug, Clone, Default)]
pub struct BeatBasslines {
    entries: Vec<BeatBassline>,
    current: usize,
}

impl BeatBasslines {
    pub fn add(&mut self, entry: BeatBassline) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Select a beat/bassline; out-of-range selections are ignored
    pub fn set_current(&mut self, index: usize) {
        if index < self.entries.len() {
            self.current = index;
        }
    }

    pub fn current(&self) -> Option<&BeatBassline> {
        self.entries.get(self.current)
    }

    pub fn set_length(&mut self, index: usize, length_tacts: i64) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.length_tacts = length_tacts;
        }
    }
}

/// All tracks of the song plus the beat/bassline container
#[derive(Default)]
pub struct Arrangement {
    tracks: Vec<Box<dyn Track>>,
    automation: Option<Box<dyn Track>>,
    bb: BeatBasslines,
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: Box<dyn Track>) -> TrackId {
        self.tracks.push(track);
        TrackId(self.tracks.len() - 1)
    }

    pub fn track(&self, id: TrackId) -> Option<&dyn Track> {
        self.tracks.get(id.0).map(|t| t.as_ref())
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Box<dyn Track>> {
        self.tracks.get_mut(id.0)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn clear_tracks(&mut self) {
        self.tracks.clear();
        self.bb = BeatBasslines::default();
    }

    /// Global automation track, played before regular tracks in song mode
    pub fn set_automation_track(&mut self, track: Option<Box<dyn Track>>) {
        self.automation = track;
    }

    pub fn beat_basslines(&self) -> &BeatBasslines {
        &self.bb
    }

    pub fn beat_basslines_mut(&mut self) -> &mut BeatBasslines {
        &mut self.bb
    }

    /// Longest track, in tacts
    pub fn length_tacts(&self) -> i64 {
        self.tracks
            .iter()
            .map(|t| t.length_tacts())
            .max()
            .unwrap_or(0)
    }

    /// Play every track selected by `list` for one tick-start
    pub fn dispatch(
        &mut self,
        list: ContentList,
        position: &PlayPosition,
        frames: usize,
        offset: usize,
    ) {
        let content_index = list.content_index();
        match list {
            ContentList::SongTracks => {
                if let Some(automation) = self.automation.as_mut() {
                    automation.play(position, frames, offset, content_index);
                }
                for track in self.tracks.iter_mut() {
                    track.play(position, frames, offset, content_index);
                }
            }
            ContentList::SingleTrack(id)
            | ContentList::BeatBassline { track: id, .. }
            | ContentList::Pattern { track: id, .. } => {
                if let Some(track) = self.tracks.get_mut(id.0) {
                    track.play(position, frames, offset, content_index);
                }
            }
        }
    }
}

/// Material audible in the current play mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentList {
    SongTracks,
    SingleTrack(TrackId),
    BeatBassline { track: TrackId, index: usize },
    Pattern { track: TrackId, index: usize },
}

impl ContentList {
    /// Resolve the audible content for `mode`. Returns `None` when nothing
    /// would sound (no mode, missing reference, empty song).
    pub fn resolve(
        mode: PlayMode,
        arrangement: &Arrangement,
        track_to_play: Option<TrackId>,
        pattern_to_play: Option<&PatternRef>,
    ) -> Option<Self> {
        let exists = |id: TrackId| id.0 < arrangement.track_count();
        match mode {
            PlayMode::None => None,
            PlayMode::PlaySong => {
                (arrangement.track_count() > 0).then_some(ContentList::SongTracks)
            }
            PlayMode::PlayTrack => track_to_play
                .filter(|id| exists(*id))
                .map(ContentList::SingleTrack),
            PlayMode::PlayBB => {
                let bb = arrangement.beat_basslines();
                bb.current()
                    .filter(|entry| exists(entry.track))
                    .map(|entry| ContentList::BeatBassline {
                        track: entry.track,
                        index: bb.current_index(),
                    })
            }
            PlayMode::PlayPattern => pattern_to_play
                .filter(|p| exists(p.track))
                .map(|p| ContentList::Pattern {
                    track: p.track,
                    index: p.index,
                }),
        }
    }

    /// Slot passed to `Track::play`, if the content is a single slot
    pub fn content_index(&self) -> Option<usize> {
        match self {
            ContentList::SongTracks | ContentList::SingleTrack(_) => None,
            ContentList::BeatBassline { index, .. } | ContentList::Pattern { index, .. } => {
                Some(*index)
            }
        }
    }
}
