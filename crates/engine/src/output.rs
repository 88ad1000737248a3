// crates/engine/src/output.rs
// cpal-backed audio context

use crate::audio_device::{AudioDeviceInfo, AudioDeviceManager};
use crate::context::{AudioContext, AudioGraph, ContextState, GraphControl};
use crate::decoder::DecodedBuffer;
use crate::error::{EngineError, EngineResult};
use crate::resampler::{resample, ResampleQuality};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Audio output configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOutputConfig {
    /// Device id or name; `None` uses the system default
    pub device: Option<String>,
    pub buffer_size: Option<u32>,
    pub resample_quality: ResampleQuality,
}

/// Commands handled by the audio thread
enum ContextCommand {
    Build {
        id: u64,
        samples: Arc<DecodedBuffer>,
        control: Arc<GraphControl>,
        reply: Sender<EngineResult<()>>,
    },
    Start {
        id: u64,
        reply: Sender<EngineResult<()>>,
    },
    Stop {
        id: u64,
        reply: Sender<EngineResult<()>>,
    },
    Suspend {
        reply: Sender<EngineResult<()>>,
    },
    Resume {
        reply: Sender<EngineResult<()>>,
    },
    Shutdown,
}

fn request(
    tx: &Sender<ContextCommand>,
    make: impl FnOnce(Sender<EngineResult<()>>) -> ContextCommand,
) -> EngineResult<()> {
    let (reply_tx, reply_rx) = bounded(1);
    tx.send(make(reply_tx))
        .map_err(|e| EngineError::Output(format!("Audio thread gone: {}", e)))?;
    reply_rx
        .recv_timeout(REPLY_TIMEOUT)
        .map_err(|e| EngineError::Output(format!("Audio thread did not answer: {}", e)))?
}

/// Output context on a dedicated thread.
///
/// cpal streams are not `Send` on every platform, so the thread owns them
/// and everything else talks to it over a command channel.
pub struct CpalContext {
    command_tx: Sender<ContextCommand>,
    handle: Option<thread::JoinHandle<()>>,
    device: AudioDeviceInfo,
    sample_rate: u32,
    quality: ResampleQuality,
    state: ContextState,
    next_graph_id: u64,
}

impl CpalContext {
    pub fn new(config: AudioOutputConfig) -> EngineResult<Self> {
        let (command_tx, command_rx) = bounded(16);
        let (ready_tx, ready_rx) = bounded(1);
        let quality = config.resample_quality;

        let handle = thread::Builder::new()
            .name("audioshelf-output".to_string())
            .spawn(move || audio_thread(config, command_rx, ready_tx))
            .map_err(|e| EngineError::Output(format!("Failed to spawn audio thread: {}", e)))?;

        let (device, stream_config) = ready_rx
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|e| EngineError::Output(format!("Audio thread did not start: {}", e)))??;

        log::info!(
            "Audio output on '{}' at {} Hz, {} channels",
            device.name,
            stream_config.sample_rate.0,
            stream_config.channels
        );

        Ok(Self {
            command_tx,
            handle: Some(handle),
            device,
            sample_rate: stream_config.sample_rate.0,
            quality,
            state: ContextState::Running,
            next_graph_id: 0,
        })
    }

    pub fn device_info(&self) -> &AudioDeviceInfo {
        &self.device
    }
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> EngineResult<()> {
        request(&self.command_tx, |reply| ContextCommand::Resume { reply })?;
        self.state = ContextState::Running;
        Ok(())
    }

    fn suspend(&mut self) -> EngineResult<()> {
        request(&self.command_tx, |reply| ContextCommand::Suspend { reply })?;
        self.state = ContextState::Suspended;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_graph(
        &mut self,
        buffer: Arc<DecodedBuffer>,
        gain: f32,
    ) -> EngineResult<Box<dyn AudioGraph>> {
        let samples = if buffer.sample_rate() == self.sample_rate {
            buffer
        } else {
            Arc::new(resample(&buffer, self.sample_rate, self.quality)?)
        };

        let control = Arc::new(GraphControl::new(
            samples.frames() as u64,
            samples.sample_rate(),
            gain,
        ));

        self.next_graph_id += 1;
        let id = self.next_graph_id;

        request(&self.command_tx, |reply| ContextCommand::Build {
            id,
            samples,
            control: Arc::clone(&control),
            reply,
        })?;

        Ok(Box::new(CpalGraph {
            id,
            command_tx: self.command_tx.clone(),
            control,
            stopped: false,
        }))
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        let _ = self.command_tx.send(ContextCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct CpalGraph {
    id: u64,
    command_tx: Sender<ContextCommand>,
    control: Arc<GraphControl>,
    stopped: bool,
}

impl AudioGraph for CpalGraph {
    fn start(&mut self) -> EngineResult<()> {
        if self.stopped {
            return Err(EngineError::AlreadyStopped);
        }
        let id = self.id;
        request(&self.command_tx, |reply| ContextCommand::Start { id, reply })
    }

    fn stop(&mut self) -> EngineResult<()> {
        if self.stopped {
            return Err(EngineError::AlreadyStopped);
        }
        self.stopped = true;
        let id = self.id;
        request(&self.command_tx, |reply| ContextCommand::Stop { id, reply })
    }

    fn control(&self) -> Arc<GraphControl> {
        Arc::clone(&self.control)
    }
}

impl Drop for CpalGraph {
    fn drop(&mut self) {
        if !self.stopped {
            let (reply, _) = bounded(1);
            let _ = self.command_tx.send(ContextCommand::Stop { id: self.id, reply });
        }
    }
}

/// The one graph the thread is rendering
struct LiveStream {
    id: u64,
    stream: Stream,
}

fn audio_thread(
    config: AudioOutputConfig,
    command_rx: Receiver<ContextCommand>,
    ready_tx: Sender<EngineResult<(AudioDeviceInfo, StreamConfig)>>,
) {
    let opened = AudioDeviceManager::new().and_then(|manager| {
        let (device, info) = manager.output_device(config.device.as_deref())?;
        let supported = device
            .default_output_config()
            .map_err(|e| EngineError::Output(format!("No default config: {}", e)))?;
        let mut stream_config = supported.config();
        if let Some(size) = config.buffer_size {
            stream_config.buffer_size = cpal::BufferSize::Fixed(size);
        }
        Ok((device, info, stream_config))
    });

    let (device, info, stream_config) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if ready_tx
        .send(Ok((info.clone(), stream_config.clone())))
        .is_err()
    {
        return;
    }

    let out_channels = stream_config.channels as usize;
    let mut live: Option<LiveStream> = None;
    let mut suspended = false;

    while let Ok(command) = command_rx.recv() {
        match command {
            ContextCommand::Build {
                id,
                samples,
                control,
                reply,
            } => {
                if let Some(previous) = live.take() {
                    log::warn!("Replacing graph {} that was never stopped", previous.id);
                }

                let source_channels = samples.channels() as usize;
                let device_name = info.name.clone();
                let result = device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            control.render(samples.samples(), source_channels, data, out_channels);
                        },
                        move |err| {
                            log::error!("Audio output error on device '{}': {}", device_name, err);
                        },
                        None,
                    )
                    .map_err(|e| EngineError::Output(format!("Failed to build stream: {}", e)));

                let result = result.map(|stream| {
                    // Some backends start streams on creation
                    let _ = stream.pause();
                    live = Some(LiveStream { id, stream });
                });
                let _ = reply.send(result);
            }
            ContextCommand::Start { id, reply } => {
                let result = match live.as_ref() {
                    Some(current) if current.id == id => {
                        if suspended {
                            Ok(())
                        } else {
                            current.stream.play().map_err(|e| {
                                EngineError::Output(format!("Failed to start stream: {}", e))
                            })
                        }
                    }
                    _ => Err(EngineError::AlreadyStopped),
                };
                let _ = reply.send(result);
            }
            ContextCommand::Stop { id, reply } => {
                let result = if live.as_ref().is_some_and(|current| current.id == id) {
                    live = None;
                    log::debug!("Graph {} stopped", id);
                    Ok(())
                } else {
                    Err(EngineError::AlreadyStopped)
                };
                let _ = reply.send(result);
            }
            ContextCommand::Suspend { reply } => {
                suspended = true;
                let result = match live.as_ref() {
                    Some(current) => current
                        .stream
                        .pause()
                        .map_err(|e| EngineError::Output(format!("Failed to pause stream: {}", e))),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            ContextCommand::Resume { reply } => {
                suspended = false;
                let result = match live.as_ref() {
                    Some(current) => current
                        .stream
                        .play()
                        .map_err(|e| EngineError::Output(format!("Failed to resume stream: {}", e))),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            ContextCommand::Shutdown => break,
        }
    }

    log::debug!("Audio thread for '{}' exiting", info.name);
}
