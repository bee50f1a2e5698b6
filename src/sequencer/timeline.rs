// Timeline - Musical time representation
// Tempo, time signature and tick/tact conversions shared by every play position

use std::fmt;

/// Ticks per quarter note (fixed resolution of musical time)
pub const TICKS_PER_QUARTER: i64 = 48;

/// Ticks per tact in 4/4
pub const DEFAULT_TICKS_PER_TACT: i64 = TICKS_PER_QUARTER * 4;

pub const MIN_TEMPO: u16 = 10;
pub const MAX_TEMPO: u16 = 999;
pub const DEFAULT_TEMPO: u16 = 140;

const MIN_SIGNATURE_PART: u8 = 1;
const MAX_SIGNATURE_PART: u8 = 32;

/// Time signature (numerator/denominator)
/// Example: 6/8 = TimeSignature { numerator: 6, denominator: 8 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    /// Creates a time signature, clamping both parts to [1, 32]
    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator: numerator.clamp(MIN_SIGNATURE_PART, MAX_SIGNATURE_PART),
            denominator: denominator.clamp(MIN_SIGNATURE_PART, MAX_SIGNATURE_PART),
        }
    }

    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    pub fn three_four() -> Self {
        Self::new(3, 4)
    }

    pub fn six_eight() -> Self {
        Self::new(6, 8)
    }

    /// Ticks in one tact (bar) under this signature. Never zero.
    pub fn ticks_per_tact(&self) -> i64 {
        let ticks =
            DEFAULT_TICKS_PER_TACT * self.numerator as i64 / self.denominator.max(1) as i64;
        ticks.max(1)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in whole BPM, always within [MIN_TEMPO, MAX_TEMPO]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tempo {
    bpm: u16,
}

impl Tempo {
    /// Creates a tempo, clamping out-of-range values
    pub fn new(bpm: u16) -> Self {
        Self {
            bpm: bpm.clamp(MIN_TEMPO, MAX_TEMPO),
        }
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    /// Set BPM value (clamped)
    pub fn set_bpm(&mut self, bpm: u16) {
        self.bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
    }

    /// Audio frames spanned by one tick at the given sample rate
    pub fn frames_per_tick(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 * 60.0 / (self.bpm as f64 * TICKS_PER_QUARTER as f64)
    }

    /// Milliseconds spanned by one tick
    pub fn ms_per_tick(&self) -> f64 {
        60_000.0 / (TICKS_PER_QUARTER as f64 * self.bpm as f64)
    }

    /// Milliseconds from tick 0 to `ticks` at this tempo
    pub fn ticks_to_ms(&self, ticks: i64) -> f64 {
        ticks as f64 * self.ms_per_tick()
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Position in ticks, with tact helpers for a given ticks-per-tact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MidiTime(pub i64);

impl MidiTime {
    pub fn from_tacts(tacts: i64, ticks_per_tact: i64) -> Self {
        Self(tacts * ticks_per_tact)
    }

    pub fn ticks(&self) -> i64 {
        self.0
    }

    /// Whole tacts elapsed (0-based)
    pub fn tact(&self, ticks_per_tact: i64) -> i64 {
        self.0 / ticks_per_tact.max(1)
    }

    /// Ticks past the start of the current tact
    pub fn ticks_in_tact(&self, ticks_per_tact: i64) -> i64 {
        self.0 % ticks_per_tact.max(1)
    }

    /// Position in quarter notes
    pub fn quarter_notes(&self) -> f64 {
        self.0 as f64 / TICKS_PER_QUARTER as f64
    }
}

impl fmt::Display for MidiTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tact = self.tact(DEFAULT_TICKS_PER_TACT) + 1;
        let beat = self.ticks_in_tact(DEFAULT_TICKS_PER_TACT) / TICKS_PER_QUARTER + 1;
        let tick = self.0 % TICKS_PER_QUARTER;
        write!(f, "{}:{:02}:{:02}", tact, beat, tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_tact() {
        assert_eq!(TimeSignature::four_four().ticks_per_tact(), 192);
        assert_eq!(TimeSignature::three_four().ticks_per_tact(), 144);
        assert_eq!(TimeSignature::six_eight().ticks_per_tact(), 144);
        assert_eq!(TimeSignature::new(7, 16).ticks_per_tact(), 84);
        assert_eq!(TimeSignature::four_four().to_string(), "4/4");
    }

    #[test]
    fn test_time_signature_is_clamped() {
        let ts = TimeSignature::new(0, 64);
        assert_eq!(ts.numerator, 1);
        assert_eq!(ts.denominator, 32);
        // 192 * 1 / 32 = 6
        assert_eq!(ts.ticks_per_tact(), 6);
        assert!(TimeSignature::new(1, 255).ticks_per_tact() > 0);
    }

    #[test]
    fn test_tempo_clamping() {
        assert_eq!(Tempo::new(5).bpm(), MIN_TEMPO);
        assert_eq!(Tempo::new(5000).bpm(), MAX_TEMPO);

        let mut tempo = Tempo::default();
        assert_eq!(tempo.bpm(), DEFAULT_TEMPO);
        tempo.set_bpm(0);
        assert_eq!(tempo.bpm(), MIN_TEMPO);
    }

    #[test]
    fn test_frames_per_tick() {
        // 48000 * 60 / (120 * 48) = 500
        let tempo = Tempo::new(120);
        assert_eq!(tempo.frames_per_tick(48000), 500.0);
        assert!((Tempo::new(120).frames_per_tick(44100) - 459.375).abs() < 1e-9);
        assert_eq!(tempo.frames_per_tick(0), 0.0);
    }

    #[test]
    fn test_ms_per_tick() {
        let tempo = Tempo::new(120);
        let expected = 60_000.0 / (120.0 * 48.0);
        assert!((tempo.ms_per_tick() - expected).abs() < 1e-12);
        assert!((tempo.ticks_to_ms(48) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_midi_time_tacts() {
        let t = MidiTime(400);
        assert_eq!(t.tact(192), 2);
        assert_eq!(t.ticks_in_tact(192), 16);
        assert_eq!(MidiTime::from_tacts(3, 144).ticks(), 432);
        assert_eq!(MidiTime(96).quarter_notes(), 2.0);
        assert_eq!(MidiTime(0).to_string(), "1:01:00");
        assert_eq!(MidiTime(200).to_string(), "2:01:08");
    }
}
