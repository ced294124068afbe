//! Audio Test Fixture Generator
//!
//! Real WAV content, so intake content sniffing sees audio.

use std::io::Cursor;
use std::path::Path;

/// Mono 16-bit sine tone
fn write_tone<W: std::io::Write + std::io::Seek>(writer: W, duration_seconds: f64) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(writer, spec)?;
    let total_samples = (duration_seconds * spec.sample_rate as f64) as usize;
    for i in 0..total_samples {
        let t = i as f64 / spec.sample_rate as f64;
        let sample = (t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 0.3;
        writer.write_sample((sample * i16::MAX as f64) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// WAV file contents held in memory
pub fn wav_bytes(duration_seconds: f64) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_tone(&mut cursor, duration_seconds).unwrap();
    cursor.into_inner()
}

/// Write a WAV file to `path`
pub fn generate_test_wav(path: &Path, duration_seconds: f64) -> anyhow::Result<()> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_tone(file, duration_seconds)
}
