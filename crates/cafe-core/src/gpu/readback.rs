//! GPU buffer readback.
//!
//! `StagingBuffer` tracks one asynchronous map through an mpsc channel so callers can poll
//! without blocking the frame loop.

use std::sync::mpsc;

use crate::error::GpuError;

/// Progress of a pending map
#[derive(Debug, PartialEq)]
pub enum ReadyState {
    Idle,
    Pending,
    Ready,
    Failed(String),
}

/// A single staging buffer with async map tracking
pub struct StagingBuffer {
    buffer: wgpu::Buffer,
    size: u64,
    rx: Option<mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>>,
}

impl StagingBuffer {
    pub fn new(device: &wgpu::Device, label: &str, size: u64) -> Self {
        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            size,
            rx: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, src: &wgpu::Buffer, byte_size: u64) {
        encoder.copy_buffer_to_buffer(src, 0, &self.buffer, 0, byte_size.min(self.size));
    }

    /// Request the map; call after the copy has been submitted
    pub fn start_map(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        self.rx = Some(rx);
    }

    pub fn is_mapping(&self) -> bool {
        self.rx.is_some()
    }

    pub fn check_ready(&mut self) -> ReadyState {
        let Some(receiver) = &self.rx else {
            return ReadyState::Idle;
        };
        match receiver.try_recv() {
            Ok(Ok(())) => {
                self.rx = None;
                ReadyState::Ready
            }
            Ok(Err(e)) => {
                self.rx = None;
                ReadyState::Failed(e.to_string())
            }
            Err(mpsc::TryRecvError::Empty) => ReadyState::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.rx = None;
                ReadyState::Failed("map callback dropped".to_string())
            }
        }
    }

    /// Copy out the mapped contents and unmap
    pub fn read<T: bytemuck::Pod>(&self, byte_size: u64) -> Vec<T> {
        let out = {
            let data = self.buffer.slice(..byte_size.min(self.size)).get_mapped_range();
            bytemuck::cast_slice(&data).to_vec()
        };
        self.buffer.unmap();
        out
    }
}

/// Copy a storage buffer to the CPU, blocking until the map completes
pub fn read_buffer_blocking<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Buffer,
    byte_size: u64,
) -> Result<Vec<T>, GpuError> {
    if byte_size == 0 {
        return Ok(Vec::new());
    }
    let mut staging = StagingBuffer::new(device, "readback_staging", byte_size);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    staging.copy_from(&mut encoder, src, byte_size);
    queue.submit(Some(encoder.finish()));
    staging.start_map();
    device.poll(wgpu::Maintain::Wait);

    match staging.check_ready() {
        ReadyState::Ready => Ok(staging.read(byte_size)),
        ReadyState::Failed(msg) => Err(GpuError::BufferMapping(msg)),
        state => Err(GpuError::BufferMapping(format!("map not complete after wait: {:?}", state))),
    }
}
