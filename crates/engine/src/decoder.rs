// FILE: crates/engine/src/decoder.rs

use crate::error::{EngineError, EngineResult};
use std::io::Cursor;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Encoded audio as returned by a preview provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    /// e.g. `audio/L16;codec=pcm;rate=24000` or `audio/wav`
    pub mime_type: Option<String>,
}

impl EncodedAudio {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Format assumed for headerless PCM payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeHints {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            channels: 1,
        }
    }
}

/// Fully decoded, directly playable audio: interleaved f32 frames
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> EngineResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(EngineError::Decode(format!(
                "Invalid format: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        if samples.is_empty() {
            return Err(EngineError::Decode("No audio samples".to_string()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(EngineError::Decode(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Turns provider payloads into [`DecodedBuffer`]s.
///
/// Container formats (WAV, MP3, FLAC, OGG, ...) are probed with symphonia;
/// anything else is treated as raw signed 16-bit little-endian PCM in the
/// format given by the hints, or by a `rate=` parameter on the MIME type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewDecoder;

impl PreviewDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes on the blocking pool
    pub async fn decode(
        &self,
        audio: EncodedAudio,
        hints: DecodeHints,
    ) -> EngineResult<DecodedBuffer> {
        tokio::task::spawn_blocking(move || decode_blocking(audio, hints))
            .await
            .map_err(|e| EngineError::Decode(format!("Decode task failed: {}", e)))?
    }
}

pub fn decode_blocking(audio: EncodedAudio, hints: DecodeHints) -> EngineResult<DecodedBuffer> {
    if audio.bytes.is_empty() {
        return Err(EngineError::Decode("Empty audio payload".to_string()));
    }

    let mime = audio.mime_type.as_deref().unwrap_or("");
    if is_raw_pcm_mime(mime) || (mime.is_empty() && !has_container_magic(&audio.bytes)) {
        let hints = DecodeHints {
            sample_rate: mime_rate(mime).unwrap_or(hints.sample_rate),
            ..hints
        };
        return decode_pcm16(&audio.bytes, hints);
    }

    decode_container(audio.bytes, extension_for_mime(mime))
}

fn decode_pcm16(bytes: &[u8], hints: DecodeHints) -> EngineResult<DecodedBuffer> {
    if bytes.len() % 2 != 0 {
        return Err(EngineError::Decode(format!(
            "PCM16 payload has odd length {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    DecodedBuffer::new(samples, hints.sample_rate, hints.channels)
}

fn decode_container(bytes: Vec<u8>, extension: Option<&str>) -> EngineResult<DecodedBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EngineError::Decode(format!("Failed to probe format: {}", e)))?;

    let mut reader = probed.format;

    let track = reader
        .default_track()
        .ok_or_else(|| EngineError::Decode("No audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut spec: Option<SignalSpec> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(EngineError::Decode(format!("Failed to read packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let packet_spec = *decoded.spec();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, packet_spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
                spec.get_or_insert(packet_spec);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Decode error, skipping packet: {}", e);
            }
            Err(e) => {
                return Err(EngineError::Decode(format!("Failed to decode packet: {}", e)));
            }
        }
    }

    let spec = spec.ok_or_else(|| EngineError::Decode("No decodable audio frames".to_string()))?;
    DecodedBuffer::new(samples, spec.rate, spec.channels.count() as u16)
}

fn is_raw_pcm_mime(mime: &str) -> bool {
    let base = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    matches!(base.as_str(), "audio/l16" | "audio/pcm" | "audio/raw")
}

fn mime_rate(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let base = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match base.as_str() {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/flac" => Some("flac"),
        "audio/ogg" => Some("ogg"),
        _ => None,
    }
}

fn has_container_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"RIFF")
        || bytes.starts_with(b"ID3")
        || bytes.starts_with(b"fLaC")
        || bytes.starts_with(b"OggS")
        || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
}
