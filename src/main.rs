use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use env_logger::Env;
use song_transport::audio::AudioEngine;
use song_transport::messaging::channels;
use song_transport::{
    PlayMode, PlayPosition, SongTransport, TICKS_PER_QUARTER, Track, TransportConfig,
    TransportHandle,
};

const DEMO_LENGTH: Duration = Duration::from_secs(8);
const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Demo track counting the beats it is asked to start
struct BeatCounter {
    beats: Arc<AtomicU64>,
    length_tacts: i64,
}

impl Track for BeatCounter {
    fn play(&mut self, position: &PlayPosition, _: usize, _: usize, _: Option<usize>) {
        if position.ticks() % TICKS_PER_QUARTER == 0 {
            self.beats.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn length_tacts(&self) -> i64 {
        self.length_tacts
    }
}

/// Period clock for machines without an output device
fn run_without_device(transport: TransportHandle, stop_at: Instant) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let (sample_rate, frames) = transport.with(|t| (t.sample_rate(), t.frames_per_period()));
        let period = Duration::from_secs_f64(frames as f64 / sample_rate.max(1) as f64);
        while Instant::now() < stop_at {
            transport.process_period();
            thread::sleep(period);
        }
    })
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => match TransportConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}", e);
                return;
            }
        },
        None => TransportConfig::default(),
    };

    let (transport, mut events) = SongTransport::from_config(&config);
    let transport = TransportHandle::new(transport);
    let beats = Arc::new(AtomicU64::new(0));
    transport.with(|t| {
        t.arrangement_mut().add_track(Box::new(BeatCounter {
            beats: Arc::clone(&beats),
            length_tacts: 4,
        }));
        t.update_length();
    });

    let stop_at = Instant::now() + DEMO_LENGTH;
    let (_engine, fallback) = match AudioEngine::start(transport.clone()) {
        Ok(engine) => (Some(engine), None),
        Err(e) => {
            log::warn!("{}; driving the transport from a timer instead", e);
            (None, Some(run_without_device(transport.clone(), stop_at)))
        }
    };

    transport.with(|t| t.play_song());

    while Instant::now() < stop_at {
        thread::sleep(REPORT_INTERVAL);
        let (time, elapsed_ms, ticks_per_tact) = transport.with(|t| {
            (
                t.position(PlayMode::PlaySong).time(),
                t.elapsed_ms(),
                t.ticks_per_tact(),
            )
        });
        log::info!(
            "Song position {} (tact {}), {:.0} ms elapsed, {} beats",
            time,
            time.tact(ticks_per_tact) + 1,
            elapsed_ms,
            beats.load(Ordering::Relaxed)
        );
        for event in channels::drain(&mut events) {
            log::debug!("Transport event: {:?}", event);
        }
    }

    transport.with(|t| t.stop());
    thread::sleep(REPORT_INTERVAL);
    if let Some(handle) = fallback
        && handle.join().is_err()
    {
        log::error!("Timer thread panicked");
    }
    log::info!("Stopped");
}
