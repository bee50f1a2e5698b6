// Transport - Song playback state machine and per-period scheduler
// Drains queued actions, advances the active play position tick by tick,
// dispatches tick starts to the audible content and mirrors state to host sync

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::action::{Action, ActionQueue};
use super::content::{
    Arrangement, ContentList, NoteRegistry, NullNoteRegistry, PatternRef, Track, TrackId,
};
use super::loop_controller::{LoopController, StopBehavior};
use super::play_position::{PlayMode, PlayPosition};
use super::timeline::{TICKS_PER_QUARTER, Tempo, TimeSignature};
use crate::config::TransportConfig;
use crate::messaging::channels::{self, EventConsumer, EventProducer};
use crate::messaging::event::TransportEvent;
use crate::project::{LoopSettings, SongSettings};
use crate::sync::HostSync;

pub const DEFAULT_MASTER_VOLUME: u16 = 100;
pub const MAX_MASTER_VOLUME: u16 = 200;
pub const MIN_MASTER_PITCH: i8 = -12;
pub const MAX_MASTER_PITCH: i8 = 12;

/// Song transport: one play position per mode, the action queue and the
/// frame loop that advances whichever mode is active
pub struct SongTransport {
    tempo: Tempo,
    time_signature: TimeSignature,
    ticks_per_tact: i64,
    sample_rate: u32,
    frames_per_period: usize,
    frames_per_tick: f64,

    master_volume: u16,
    master_pitch: i8,

    play_mode: PlayMode,
    playing: bool,
    paused: bool,
    exporting: bool,
    positions: [PlayPosition; PlayMode::COUNT],
    actions: ActionQueue,

    arrangement: Arrangement,
    track_to_play: Option<TrackId>,
    pattern_to_play: Option<PatternRef>,
    loop_pattern: bool,
    length_tacts: i64,

    elapsed_ms: f64,
    elapsed_tacts: i64,
    elapsed_beats: i64,

    notes: Box<dyn NoteRegistry>,
    host_sync: HostSync,
    events: Option<EventProducer>,
}

impl SongTransport {
    pub fn new(sample_rate: u32, frames_per_period: usize, host_sync: HostSync) -> Self {
        let tempo = Tempo::default();
        let time_signature = TimeSignature::default();
        let mut transport = Self {
            tempo,
            time_signature,
            ticks_per_tact: time_signature.ticks_per_tact(),
            sample_rate,
            frames_per_period,
            frames_per_tick: tempo.frames_per_tick(sample_rate),
            master_volume: DEFAULT_MASTER_VOLUME,
            master_pitch: 0,
            play_mode: PlayMode::None,
            playing: false,
            paused: false,
            exporting: false,
            positions: Default::default(),
            actions: ActionQueue::new(),
            arrangement: Arrangement::new(),
            track_to_play: None,
            pattern_to_play: None,
            loop_pattern: false,
            length_tacts: 0,
            elapsed_ms: 0.0,
            elapsed_tacts: 0,
            elapsed_beats: 0,
            notes: Box::new(NullNoteRegistry),
            host_sync,
            events: None,
        };
        transport.host_sync.set_tempo(tempo.bpm());
        transport
            .host_sync
            .set_time_signature(time_signature.numerator, time_signature.denominator);
        transport.host_sync.set_sample_rate(sample_rate);
        transport.host_sync.set_buffer_size(frames_per_period as u32);
        transport
    }

    /// Build from configuration, attaching host sync and an event channel
    pub fn from_config(config: &TransportConfig) -> (Self, EventConsumer) {
        let host_sync = HostSync::connect(
            &config.host_sync,
            config.sample_rate,
            config.frames_per_period as u32,
        );
        let mut transport = Self::new(config.sample_rate, config.frames_per_period, host_sync);
        let (tx, rx) = channels::create_event_channel(config.event_capacity);
        transport.set_event_producer(tx);
        (transport, rx)
    }

    pub fn set_event_producer(&mut self, tx: EventProducer) {
        self.events = Some(tx);
    }

    pub fn set_note_registry(&mut self, notes: Box<dyn NoteRegistry>) {
        self.notes = notes;
    }

    fn emit(&mut self, event: TransportEvent) {
        if let Some(tx) = self.events.as_mut() {
            channels::emit(tx, event);
        }
    }

    // ========================================================================
    // Action queue & mode transitions
    // ========================================================================

    /// Queue an action; it takes effect at the start of the next period
    pub fn enqueue(&mut self, action: Action) {
        self.actions.enqueue(action);
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn play_song(&mut self) {
        self.enqueue(Action::PlaySong);
    }

    pub fn play_track(&mut self, track: TrackId) {
        self.track_to_play = Some(track);
        self.enqueue(Action::PlayTrack);
    }

    pub fn play_bb(&mut self) {
        self.enqueue(Action::PlayBB);
    }

    /// Preview a pattern; `looped` wraps playback at the pattern's length
    pub fn play_pattern(&mut self, pattern: Option<PatternRef>, looped: bool) {
        self.pattern_to_play = pattern;
        self.loop_pattern = looped;
        self.enqueue(Action::PlayPattern);
    }

    pub fn stop(&mut self) {
        self.enqueue(Action::Stop);
    }

    pub fn pause(&mut self) {
        self.enqueue(Action::Pause);
    }

    pub fn resume(&mut self) {
        self.enqueue(Action::ResumeFromPause);
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Apply every queued action in arrival order
    pub fn drain_actions(&mut self) {
        while let Some(action) = self.actions.pop() {
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Stop => self.apply_stop(),
            Action::PlaySong => self.start_mode(PlayMode::PlaySong),
            Action::PlayTrack => self.start_mode(PlayMode::PlayTrack),
            Action::PlayBB => self.start_mode(PlayMode::PlayBB),
            Action::PlayPattern => {
                if self.pattern_to_play.is_some() {
                    self.start_mode(PlayMode::PlayPattern);
                } else {
                    log::debug!("PlayPattern ignored: no pattern selected");
                }
            }
            Action::Pause => {
                self.playing = false;
                self.paused = true;
                self.host_sync.set_playing(self.exporting);
                self.emit(TransportEvent::Paused);
            }
            Action::ResumeFromPause => {
                self.playing = true;
                self.paused = false;
                self.host_sync.set_playing(true);
                self.emit(TransportEvent::Resumed);
            }
        }
    }

    fn start_mode(&mut self, mode: PlayMode) {
        if self.playing && self.play_mode != mode {
            // previous mode stops sounding but keeps its position
            self.notes.clear();
        }
        self.play_mode = mode;
        self.playing = true;
        self.paused = false;
        self.host_sync.set_playing(true);

        let pos = &mut self.positions[mode.index()];
        let ticks = pos.ticks();
        if let Some(timeline) = pos.timeline_mut() {
            timeline.save_position(ticks);
        }
        log::debug!("Playback started in {} mode at tick {}", mode, ticks);
        self.emit(TransportEvent::PlaybackStarted(mode));
    }

    fn apply_stop(&mut self) {
        let mode = self.play_mode;
        self.playing = false;
        self.paused = false;
        self.host_sync.set_playing(self.exporting);

        let pos = &mut self.positions[mode.index()];
        let rewind_to = match pos.timeline_mut() {
            Some(timeline) => match timeline.stop_behavior() {
                StopBehavior::ReturnToZero => Some(0),
                StopBehavior::ReturnToSavedStart => timeline.take_saved_position(),
                StopBehavior::KeepPosition => None,
            },
            None => Some(0),
        };
        if let Some(ticks) = rewind_to {
            pos.set_ticks(ticks);
            self.elapsed_ms = self.tempo.ticks_to_ms(ticks);
        }
        pos.set_current_frame(0.0);
        let ticks = pos.ticks();

        self.notes.clear();
        self.host_sync.set_position(ticks);
        log::debug!("Playback stopped in {} mode at tick {}", mode, ticks);
        self.emit(TransportEvent::PlaybackStopped(mode));
    }

    // ========================================================================
    // Scheduler
    // ========================================================================

    /// One processing period: drain actions, then render
    pub fn process_period(&mut self) {
        self.drain_actions();
        self.render_period();
    }

    /// Advance the active play position by one period and dispatch tick starts
    pub fn render_period(&mut self) {
        if !self.playing {
            return;
        }

        let mode = self.play_mode;
        let Some(content) = ContentList::resolve(
            mode,
            &self.arrangement,
            self.track_to_play,
            self.pattern_to_play.as_ref(),
        ) else {
            return;
        };
        let idx = mode.index();

        if mode == PlayMode::PlaySong
            && self.positions[idx].ticks() == 0
            && self.positions[idx].current_frame() == 0.0
        {
            self.notes.restart_modulators();
        }

        let loop_points = self.active_loop_points();
        if let Some((begin, end)) = loop_points {
            let pos = &mut self.positions[idx];
            if pos.ticks() < begin || pos.ticks() >= end {
                pos.set_ticks(begin);
                self.elapsed_ms = self.tempo.ticks_to_ms(begin);
            }
        }

        let frames_per_tick = self.frames_per_tick;
        if !frames_per_tick.is_finite() || frames_per_tick <= 0.0 {
            return;
        }

        let period = self.frames_per_period;
        let ticks_per_tact = self.ticks_per_tact;
        let ms_per_tick = self.tempo.ms_per_tick();
        self.host_sync.set_buffer_size(period as u32);

        let mut total_frames_played = 0usize;
        while total_frames_played < period {
            let mut played_frames = period - total_frames_played;
            let mut current_frame = self.positions[idx].current_frame();

            if current_frame >= frames_per_tick {
                let mut ticks =
                    self.positions[idx].ticks() + (current_frame / frames_per_tick) as i64;

                if let Some(max_tact) = self.region_end_tact(mode) {
                    let region_end = max_tact * ticks_per_tact;
                    if ticks >= region_end {
                        // keep the overshoot so bar-relative timing stays continuous
                        ticks %= region_end;
                    }
                }

                match loop_points {
                    Some((begin, end)) => {
                        self.host_sync.set_cycle(Some((begin, end)));
                        if ticks >= end || ticks < begin {
                            ticks = begin;
                            self.elapsed_ms = self.tempo.ticks_to_ms(begin);
                        }
                    }
                    None => self.host_sync.set_cycle(None),
                }

                self.positions[idx].set_ticks(ticks);
                self.host_sync.set_position(ticks);

                current_frame %= frames_per_tick;
                self.positions[idx].set_current_frame(current_frame);
            }

            let last_frames = frames_per_tick as i64 - current_frame as i64;
            if last_frames <= 0 {
                // fractional tail of a tick: step one frame into the next tick
                total_frames_played += 1;
                self.positions[idx].set_current_frame(current_frame + 1.0);
                self.elapsed_ms += ms_per_tick / frames_per_tick;
                continue;
            }
            if (last_frames as usize) < played_frames {
                played_frames = last_frames as usize;
            }

            if current_frame as i64 == 0 {
                self.arrangement.dispatch(
                    content,
                    &self.positions[idx],
                    played_frames,
                    total_frames_played,
                );
            }

            total_frames_played += played_frames;
            self.positions[idx].set_current_frame(current_frame + played_frames as f64);
            self.elapsed_ms += played_frames as f64 / frames_per_tick * ms_per_tick;
        }

        let song_pos = &self.positions[PlayMode::PlaySong.index()];
        self.elapsed_tacts = song_pos.tact(ticks_per_tact);
        self.elapsed_beats = (song_pos.ticks() % ticks_per_tact) / TICKS_PER_QUARTER;
    }

    /// Loop region in effect for the active mode, if any
    fn active_loop_points(&self) -> Option<(i64, i64)> {
        if self.exporting || self.pattern_is_freezing() {
            return None;
        }
        self.positions[self.play_mode.index()]
            .timeline()
            .filter(|timeline| timeline.loop_points_enabled())
            .map(|timeline| (timeline.loop_begin(), timeline.loop_end()))
    }

    /// Length in tacts of the bounded region for `mode` (at least one), or
    /// `None` when playback runs on without wrapping
    fn region_end_tact(&self, mode: PlayMode) -> Option<i64> {
        let end = match mode {
            PlayMode::PlayTrack => self
                .track_to_play
                .and_then(|id| self.arrangement.track(id))
                .map(|track| track.length_tacts()),
            PlayMode::PlayBB => self
                .arrangement
                .beat_basslines()
                .current()
                .map(|bb| bb.length_tacts),
            PlayMode::PlayPattern => {
                let loop_points_enabled = self.positions[mode.index()]
                    .timeline()
                    .is_some_and(|timeline| timeline.loop_points_enabled());
                self.pattern_to_play
                    .filter(|_| self.loop_pattern && !loop_points_enabled)
                    .map(|pattern| pattern.length_tacts)
            }
            PlayMode::PlaySong | PlayMode::None => None,
        };
        end.map(|tacts| tacts.max(1))
    }

    // ========================================================================
    // Tempo, signature and audio settings
    // ========================================================================

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Change tempo (clamped). Elapsed ticks are untouched; only the frame
    /// rate of subsequent ticks changes.
    pub fn set_tempo(&mut self, bpm: u16) {
        self.tempo.set_bpm(bpm);
        let bpm = self.tempo.bpm();
        self.notes.retempo(bpm);
        self.update_frames_per_tick();
        self.host_sync.set_tempo(bpm);
        self.emit(TransportEvent::TempoChanged(bpm));
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_time_signature(&mut self, numerator: u8, denominator: u8) {
        let old_ticks_per_tact = self.ticks_per_tact;
        self.time_signature = TimeSignature::new(numerator, denominator);
        self.ticks_per_tact = self.time_signature.ticks_per_tact();
        self.host_sync.set_time_signature(
            self.time_signature.numerator,
            self.time_signature.denominator,
        );
        self.emit(TransportEvent::TimeSignatureChanged {
            old_ticks_per_tact,
            new_ticks_per_tact: self.ticks_per_tact,
        });
    }

    pub fn ticks_per_tact(&self) -> i64 {
        self.ticks_per_tact
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Called when the audio device changes rate
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.update_frames_per_tick();
        self.host_sync.set_sample_rate(sample_rate);
    }

    pub fn frames_per_period(&self) -> usize {
        self.frames_per_period
    }

    pub fn set_frames_per_period(&mut self, frames: usize) {
        self.frames_per_period = frames;
        self.host_sync.set_buffer_size(frames as u32);
    }

    pub fn frames_per_tick(&self) -> f64 {
        self.frames_per_tick
    }

    fn update_frames_per_tick(&mut self) {
        self.frames_per_tick = self.tempo.frames_per_tick(self.sample_rate);
    }

    pub fn master_volume(&self) -> u16 {
        self.master_volume
    }

    /// Master volume in percent, clamped to [0, 200]
    pub fn set_master_volume(&mut self, volume: u16) {
        self.master_volume = volume.min(MAX_MASTER_VOLUME);
        self.emit(TransportEvent::MasterVolumeChanged(self.master_volume));
    }

    pub fn master_pitch(&self) -> i8 {
        self.master_pitch
    }

    /// Master pitch in semitones, clamped to [-12, 12]
    pub fn set_master_pitch(&mut self, semitones: i8) {
        self.master_pitch = semitones.clamp(MIN_MASTER_PITCH, MAX_MASTER_PITCH);
    }

    // ========================================================================
    // Positions & timelines
    // ========================================================================

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn position(&self, mode: PlayMode) -> &PlayPosition {
        &self.positions[mode.index()]
    }

    pub fn current_position(&self) -> &PlayPosition {
        self.position(self.play_mode)
    }

    /// Seek `mode`'s position, shifting elapsed time by the jump
    pub fn set_play_pos(&mut self, ticks: i64, mode: PlayMode) {
        let ticks = ticks.max(0);
        let pos = &mut self.positions[mode.index()];
        let delta = ticks - pos.ticks();
        pos.set_ticks(ticks);
        pos.set_current_frame(0.0);
        self.elapsed_ms = (self.elapsed_ms + self.tempo.ticks_to_ms(delta)).max(0.0);
        if mode == self.play_mode {
            self.host_sync.set_position(ticks);
        }
    }

    pub fn attach_timeline(&mut self, mode: PlayMode, timeline: LoopController) {
        self.positions[mode.index()].attach_timeline(timeline);
    }

    pub fn timeline(&self, mode: PlayMode) -> Option<&LoopController> {
        self.positions[mode.index()].timeline()
    }

    pub fn timeline_mut(&mut self, mode: PlayMode) -> Option<&mut LoopController> {
        self.positions[mode.index()].timeline_mut()
    }

    // ========================================================================
    // State queries
    // ========================================================================

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopped(&self) -> bool {
        !self.playing && !self.paused
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Whole tacts of song-mode position
    pub fn elapsed_tacts(&self) -> i64 {
        self.elapsed_tacts
    }

    /// Quarter-note beats into the current song tact
    pub fn elapsed_beats(&self) -> i64 {
        self.elapsed_beats
    }

    pub fn host_sync(&self) -> &HostSync {
        &self.host_sync
    }

    // ========================================================================
    // Content
    // ========================================================================

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    pub fn arrangement_mut(&mut self) -> &mut Arrangement {
        &mut self.arrangement
    }

    pub fn track_to_play(&self) -> Option<TrackId> {
        self.track_to_play
    }

    pub fn pattern_to_play(&self) -> Option<&PatternRef> {
        self.pattern_to_play.as_ref()
    }

    pub fn loop_pattern(&self) -> bool {
        self.loop_pattern
    }

    /// Mark the previewed pattern as being frozen (rendered offline)
    pub fn set_pattern_freezing(&mut self, freezing: bool) {
        if let Some(pattern) = self.pattern_to_play.as_mut() {
            pattern.freezing = freezing;
        }
    }

    fn pattern_is_freezing(&self) -> bool {
        self.play_mode == PlayMode::PlayPattern
            && self.pattern_to_play.is_some_and(|p| p.freezing)
    }

    pub fn is_freezing_pattern(&self) -> bool {
        self.playing && self.pattern_is_freezing()
    }

    /// False while rendering offline (export or pattern freeze)
    pub fn is_real_time_task(&self) -> bool {
        !(self.exporting || self.pattern_is_freezing())
    }

    pub fn length_tacts(&self) -> i64 {
        self.length_tacts
    }

    /// Recompute the song length from its tracks
    pub fn update_length(&mut self) {
        let length = self.arrangement.length_tacts();
        if length != self.length_tacts {
            self.length_tacts = length;
            self.emit(TransportEvent::LengthChanged(length));
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Restart song playback for an offline render; loop points are ignored
    pub fn start_export(&mut self) {
        self.enqueue(Action::Stop);
        self.enqueue(Action::PlaySong);
        self.exporting = true;
        self.host_sync.set_playing(true);
        log::info!("Export started");
    }

    pub fn stop_export(&mut self) {
        self.enqueue(Action::Stop);
        self.exporting = false;
        self.host_sync.set_playing(self.playing);
        log::info!("Export stopped");
    }

    // ========================================================================
    // Project state
    // ========================================================================

    /// Stop immediately and restore every setting to its default
    pub fn clear_project(&mut self) {
        self.actions.clear();
        if !self.is_stopped() {
            self.apply_stop();
        }
        for pos in self.positions.iter_mut() {
            pos.reset();
        }
        self.elapsed_ms = 0.0;
        self.elapsed_tacts = 0;
        self.elapsed_beats = 0;
        self.play_mode = PlayMode::None;
        self.exporting = false;

        self.arrangement.clear_tracks();
        self.track_to_play = None;
        self.pattern_to_play = None;
        self.loop_pattern = false;

        self.set_tempo(Tempo::default().bpm());
        let ts = TimeSignature::default();
        self.set_time_signature(ts.numerator, ts.denominator);
        self.set_master_volume(DEFAULT_MASTER_VOLUME);
        self.set_master_pitch(0);
        self.update_length();
        self.host_sync.set_position(0);
    }

    /// Snapshot of the persisted song settings
    pub fn settings(&self) -> SongSettings {
        SongSettings {
            bpm: self.tempo.bpm(),
            time_signature: self.time_signature,
            master_volume: self.master_volume,
            master_pitch: self.master_pitch,
            loop_points: self.timeline(PlayMode::PlaySong).map(LoopSettings::from),
        }
    }

    /// Apply loaded settings; values are clamped like any other mutation
    pub fn apply_settings(&mut self, settings: &SongSettings) {
        self.set_tempo(settings.bpm);
        self.set_time_signature(
            settings.time_signature.numerator,
            settings.time_signature.denominator,
        );
        self.set_master_volume(settings.master_volume);
        self.set_master_pitch(settings.master_pitch);

        if let Some(timeline) = self.timeline_mut(PlayMode::PlaySong) {
            timeline.set_loop_points_enabled(false);
            if let Some(loop_settings) = &settings.loop_points {
                loop_settings.apply_to(timeline);
            }
        }
    }
}

/// Coarse-locked transport shared by the control and audio threads
#[derive(Clone)]
pub struct TransportHandle {
    inner: Arc<Mutex<SongTransport>>,
}

impl TransportHandle {
    pub fn new(transport: SongTransport) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Lock the transport; a poisoned lock is recovered, never propagated
    pub fn lock(&self) -> MutexGuard<'_, SongTransport> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Short critical section for the control thread
    pub fn with<R>(&self, f: impl FnOnce(&mut SongTransport) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn enqueue(&self, action: Action) {
        self.lock().enqueue(action);
    }

    /// Audio thread: hold the lock for one whole period
    pub fn process_period(&self) {
        self.lock().process_period();
    }
}
