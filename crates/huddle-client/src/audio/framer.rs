/// Accumulates device callbacks of arbitrary length into fixed-size frames.
#[derive(Debug)]
pub struct Framer {
    frame_size: usize,
    pending: Vec<f32>,
}

impl Framer {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Samples waiting for a full frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append `samples` and call `emit` once per completed frame, oldest first.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.frame_size {
            let frame: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            emit(frame);
        }
    }
}
