use crate::config::AudioSource;
use anyhow::{anyhow, bail, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

/// FFT size of the byte-frequency level analyser (128 bins).
pub const LEVEL_FFT_SIZE: usize = 256;
/// Live capture advances the analyser once per this many samples.
pub const LEVEL_HOP: usize = 1024;
const LEVEL_SMOOTHING: f32 = 0.8;
const LEVEL_MIN_DB: f32 = -100.0;
const LEVEL_MAX_DB: f32 = -30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    /// Mean byte-frequency magnitude in `[0, 1]`.
    pub level: f32,
}

/// Latest features, written by the analysis thread and read by the render loop.
pub struct AtomicAudioFeatures {
    level: AtomicU32,
}

impl Default for AtomicAudioFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicAudioFeatures {
    pub fn new() -> Self {
        Self {
            level: AtomicU32::new(0),
        }
    }

    pub fn store(&self, f: AudioFeatures) {
        self.level.store(f.level.to_bits(), Ordering::Release);
    }

    pub fn load(&self) -> AudioFeatures {
        AudioFeatures {
            level: f32::from_bits(self.level.load(Ordering::Acquire)),
        }
    }
}

/// Byte-frequency analyser: Blackman window, |X|/N magnitudes, exponential
/// smoothing across calls, decibels mapped from [-100, -30] onto 0..=255.
pub struct LevelAnalyser {
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl Default for LevelAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelAnalyser {
    pub fn new() -> Self {
        let n = LEVEL_FFT_SIZE;
        let window = (0..n)
            .map(|i| {
                let x = i as f32 / n as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();
        let mut planner = FftPlanner::<f32>::new();
        Self {
            window,
            fft: planner.plan_fft_forward(n),
            buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: vec![0.0; n / 2],
            bytes: vec![0; n / 2],
        }
    }

    /// Analyses the last `LEVEL_FFT_SIZE` samples of `recent` (zero-padded at the
    /// front when shorter) and returns the mean byte value divided by 255.
    pub fn process(&mut self, recent: &[f32]) -> f32 {
        let n = LEVEL_FFT_SIZE;
        let take = recent.len().min(n);
        let src = &recent[recent.len() - take..];
        let pad = n - take;
        for i in 0..n {
            let s = if i < pad { 0.0 } else { src[i - pad] };
            self.buf[i] = Complex {
                re: s * self.window[i],
                im: 0.0,
            };
        }
        self.fft.process(&mut self.buf);

        let mut sum = 0u32;
        for (k, c) in self.buf.iter().take(n / 2).enumerate() {
            let mag = (c.re * c.re + c.im * c.im).sqrt() / n as f32;
            let s = LEVEL_SMOOTHING * self.smoothed[k] + (1.0 - LEVEL_SMOOTHING) * mag;
            self.smoothed[k] = if s.is_finite() { s } else { 0.0 };
            let byte = db_to_byte(20.0 * self.smoothed[k].max(1e-12).log10());
            self.bytes[k] = byte;
            sum += byte as u32;
        }
        sum as f32 / self.bytes.len() as f32 / 255.0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Maps [-100, -30] dB linearly onto 0..=255, flooring and clamping.
pub fn db_to_byte(db: f32) -> u8 {
    let range = LEVEL_MAX_DB - LEVEL_MIN_DB;
    (255.0 / range * (db - LEVEL_MIN_DB)).floor().clamp(0.0, 255.0) as u8
}

/// Copies the `out.len()` samples ending at `sample_end` of a looping playback
/// into `out`. Positions past the end wrap around; positions before the first
/// sample are silence.
pub fn fill_window(samples: &[f32], sample_end: usize, out: &mut [f32]) {
    out.fill(0.0);
    let n = samples.len();
    if n == 0 {
        return;
    }
    let len = out.len();
    for (i, dst) in out.iter_mut().enumerate() {
        let Some(pos) = (sample_end + i).checked_sub(len) else {
            continue;
        };
        *dst = samples[pos % n];
    }
}

/// One feature frame per video frame, analysing the looped audio that ends at
/// each frame time.
pub fn build_feature_track(
    samples: &[f32],
    sample_rate_hz: u32,
    fps: u32,
    frame_count: usize,
) -> Vec<AudioFeatures> {
    let mut analyser = LevelAnalyser::new();
    let mut window = vec![0.0f32; LEVEL_FFT_SIZE];
    let sr = sample_rate_hz as f64;
    let fps_f = fps.max(1) as f64;

    (0..frame_count)
        .map(|frame| {
            let sample_end = (frame as f64 / fps_f * sr).floor() as usize;
            fill_window(samples, sample_end, &mut window);
            AudioFeatures {
                level: analyser.process(&window),
            }
        })
        .collect()
}

/// Decodes a WAV file to mono f32 samples.
pub fn read_wav_mono(path: &Path) -> anyhow::Result<(u32, Vec<f32>)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("open wav {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("decode float samples")?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("unsupported bit depth {}", spec.bits_per_sample);
            }
            let max_val = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .context("decode int samples")?
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| (frame.iter().sum::<f32>() / channels as f32).clamp(-1.0, 1.0))
        .collect();
    Ok((spec.sample_rate, mono))
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

pub struct AudioSystem {
    _stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    features: Arc<AtomicAudioFeatures>,
    pub sample_rate_hz: u32,
}

impl AudioSystem {
    pub fn new(
        source: AudioSource,
        device_query: Option<&str>,
        file: Option<&Path>,
    ) -> anyhow::Result<Self> {
        match source {
            AudioSource::Off => Err(anyhow!("audio source is off")),
            AudioSource::Mic => Self::new_mic(device_query),
            AudioSource::File => {
                let path = file.ok_or_else(|| anyhow!("--audio-source file needs --audio-file"))?;
                Self::new_file(path)
            }
        }
    }

    fn new_mic(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_mic_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb = HeapRb::<f32>::new((sample_rate_hz as usize).saturating_mul(4));
        let (mut prod, cons) = rb.split();

        let err_fn = |err| tracing::warn!("audio input stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        stream.play().context("start input stream")?;
        tracing::info!(sample_rate_hz, channels, "microphone capture started");

        Ok(Self::spawn_analyzer(stream, cons, sample_rate_hz))
    }

    /// Loops a WAV file through the default output device and analyses the
    /// samples as they are played.
    fn new_file(path: &Path) -> anyhow::Result<Self> {
        let (file_rate, samples) = read_wav_mono(path)?;
        if samples.is_empty() {
            bail!("wav {} had no samples", path.display());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device found"))?;
        let supported = device
            .default_output_config()
            .context("get default output config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb = HeapRb::<f32>::new((sample_rate_hz as usize).saturating_mul(4));
        let (prod, cons) = rb.split();
        let player = LoopPlayer {
            samples: Arc::new(samples),
            pos: 0.0,
            step: file_rate as f64 / sample_rate_hz.max(1) as f64,
            prod,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_playback::<f32>(&device, &config, channels, player)?,
            SampleFormat::I16 => build_playback::<i16>(&device, &config, channels, player)?,
            SampleFormat::U16 => build_playback::<u16>(&device, &config, channels, player)?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        stream.play().context("start output stream")?;
        tracing::info!(
            file = %path.display(),
            file_rate,
            sample_rate_hz,
            "file playback started"
        );

        Ok(Self::spawn_analyzer(stream, cons, sample_rate_hz))
    }

    fn spawn_analyzer(
        stream: cpal::Stream,
        mut cons: ringbuf::HeapCons<f32>,
        sample_rate_hz: u32,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let features = Arc::new(AtomicAudioFeatures::new());
        let features_for_thread = Arc::clone(&features);
        let stop_for_thread = Arc::clone(&stop);

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(&mut cons, &stop_for_thread, &features_for_thread)
        });

        Self {
            _stream: stream,
            stop,
            analyzer_handle: Some(analyzer_handle),
            features,
            sample_rate_hz,
        }
    }

    pub fn features(&self) -> Arc<AtomicAudioFeatures> {
        Arc::clone(&self.features)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
    }
}

struct LoopPlayer {
    samples: Arc<Vec<f32>>,
    pos: f64,
    step: f64,
    prod: ringbuf::HeapProd<f32>,
}

impl LoopPlayer {
    fn next_sample(&mut self) -> f32 {
        let len = self.samples.len();
        let i = self.pos as usize % len;
        let s = self.samples[i];
        self.pos += self.step;
        if self.pos >= len as f64 {
            self.pos -= len as f64;
        }
        let _ = self.prod.try_push(s);
        s
    }
}

fn build_playback<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut player: LoopPlayer,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = channels.max(1);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let v = T::from_sample(player.next_sample());
                frame.fill(v);
            }
        },
        |err| tracing::warn!("audio output stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn select_mic_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    if let Some(want) = device_query.map(|s| s.to_lowercase()) {
        return devices
            .iter()
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&want))
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    let channels = channels.max(1);
    for frame in data.chunks(channels) {
        let acc: f32 = frame.iter().map(|s| s.to_float_sample()).sum();
        let _ = prod.try_push(acc / channels as f32);
    }
}

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    stop: &AtomicBool,
    features: &AtomicAudioFeatures,
) {
    let n = LEVEL_FFT_SIZE;
    let mut ring = vec![0.0f32; n];
    let mut ordered = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut since_last = 0usize;
    let mut analyser = LevelAnalyser::new();

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            ring[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            since_last += 1;
            if since_last >= LEVEL_HOP {
                since_last = 0;
                for (i, dst) in ordered.iter_mut().enumerate() {
                    *dst = ring[(write_pos + i) % n];
                }
                features.store(AudioFeatures {
                    level: analyser.process(&ordered),
                });
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amp: f32, sr: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / sr).sin())
            .collect()
    }

    #[test]
    fn silence_has_zero_level() {
        let mut a = LevelAnalyser::new();
        assert_eq!(a.process(&[0.0; LEVEL_FFT_SIZE]), 0.0);
        assert!(a.bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn level_rises_with_smoothing_toward_steady_state() {
        let tone = sine(1_000.0, 0.8, 48_000.0, LEVEL_FFT_SIZE);
        let mut a = LevelAnalyser::new();
        let first = a.process(&tone);
        let mut last = first;
        for _ in 0..40 {
            last = a.process(&tone);
        }
        assert!(first > 0.0);
        assert!(last > first, "first={first} last={last}");
        assert!(last <= 1.0);
        // Tone bin near 1 kHz (bin width 187.5 Hz) should be much louder than the top bins.
        assert!(a.bytes()[5] > a.bytes()[120]);
    }

    #[test]
    fn db_maps_linearly_onto_bytes() {
        assert_eq!(db_to_byte(-100.0), 0);
        assert_eq!(db_to_byte(-65.0), 127);
        assert_eq!(db_to_byte(-30.0), 255);
        assert_eq!(db_to_byte(-20.0), 255);
        assert_eq!(db_to_byte(-140.0), 0);
    }

    #[test]
    fn dc_input_gives_known_bin_bytes() {
        // Blackman leaves 0.42 of a DC level in bin 0, 0.25 in bin 1, 0.04 in bin 2.
        // The first call keeps 0.2 of it after smoothing, so bin 0 sits at -65 dB.
        let c = 10f32.powf(-65.0 / 20.0) / (0.2 * 0.42);
        let mut a = LevelAnalyser::new();
        a.process(&[c; LEVEL_FFT_SIZE]);
        let b = a.bytes();
        assert_eq!(b[0], 127);
        assert_eq!(b[1], 111);
        assert_eq!(b[2], 53);
        assert!(b[3..].iter().all(|v| *v == 0));
    }

    #[test]
    fn atomic_features_round_trip() {
        let f = AtomicAudioFeatures::new();
        let v = AudioFeatures { level: 0.5 };
        f.store(v);
        assert_eq!(f.load(), v);
    }

    #[test]
    fn fill_window_zero_pads_the_start() {
        let samples = [1.0, 2.0, 3.0];
        let mut out = [9.0; 5];
        fill_window(&samples, 2, &mut out);
        assert_eq!(out, [0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn fill_window_wraps_past_the_end() {
        let samples = [1.0, 2.0, 3.0];
        let mut out = [9.0; 4];
        fill_window(&samples, 5, &mut out);
        assert_eq!(out, [2.0, 3.0, 1.0, 2.0]);
        fill_window(&[], 5, &mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn feature_track_is_deterministic() {
        let sr = 22_050;
        let samples = sine(220.0, 0.5, sr as f32, sr as usize);
        let a = build_feature_track(&samples, sr, 10, 10);
        let b = build_feature_track(&samples, sr, 10, 10);
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        assert!(a[9].level > 0.0);
    }
}
