//! Stereo feedback delay used as a send return
//!
//! Fully wet: the dry signal stays on the channel strips and the return
//! bus only carries echoes.

use crate::types::StereoBuffer;

/// Maximum delay time in seconds
const MAX_DELAY_SECONDS: f32 = 2.0;

/// Default echo time
pub const DEFAULT_DELAY_SECS: f32 = 0.25;

/// Default feedback amount
pub const DEFAULT_FEEDBACK: f32 = 0.35;

/// Stereo delay line
struct DelayLine {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
}

impl DelayLine {
    fn new(max_samples: usize) -> Self {
        let len = max_samples.max(2);
        Self {
            buffer_l: vec![0.0; len],
            buffer_r: vec![0.0; len],
            write_pos: 0,
            delay_samples: 1,
        }
    }

    fn set_delay_samples(&mut self, samples: usize) {
        self.delay_samples = samples.clamp(1, self.buffer_l.len() - 1);
    }

    #[inline]
    fn read(&self) -> (f32, f32) {
        let len = self.buffer_l.len();
        let read_pos = (self.write_pos + len - self.delay_samples) % len;
        (self.buffer_l[read_pos], self.buffer_r[read_pos])
    }

    #[inline]
    fn write(&mut self, left: f32, right: f32) {
        self.buffer_l[self.write_pos] = left;
        self.buffer_r[self.write_pos] = right;
        self.write_pos = (self.write_pos + 1) % self.buffer_l.len();
    }

    fn reset(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
    }
}

/// Ping-pong style stereo delay return
pub struct StereoDelay {
    line: DelayLine,
    sample_rate: u32,
    feedback: f32,
    ping_pong: bool,
}

impl StereoDelay {
    pub fn new(sample_rate: u32) -> Self {
        let max_samples = (MAX_DELAY_SECONDS * sample_rate as f32) as usize;
        let mut delay = Self {
            line: DelayLine::new(max_samples),
            sample_rate,
            feedback: DEFAULT_FEEDBACK,
            ping_pong: true,
        };
        delay.set_time(DEFAULT_DELAY_SECS);
        delay
    }

    /// Set the echo time in seconds (10 ms .. 2 s)
    pub fn set_time(&mut self, secs: f32) {
        let secs = secs.clamp(0.01, MAX_DELAY_SECONDS);
        self.line
            .set_delay_samples((secs * self.sample_rate as f32) as usize);
    }

    /// Set feedback (0 .. 0.95)
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.95);
    }

    pub fn set_ping_pong(&mut self, enabled: bool) {
        self.ping_pong = enabled;
    }

    /// Replace the buffer with its echoes
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        let feedback = self.feedback;
        for sample in buffer.iter_mut() {
            let (delayed_l, delayed_r) = self.line.read();
            let (fb_l, fb_r) = if self.ping_pong {
                (delayed_r * feedback, delayed_l * feedback)
            } else {
                (delayed_l * feedback, delayed_r * feedback)
            };
            self.line.write(sample.left + fb_l, sample.right + fb_r);
            sample.left = delayed_l;
            sample.right = delayed_r;
        }
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    #[test]
    fn test_impulse_echoes_after_delay_time() {
        let mut delay = StereoDelay::new(1000);
        delay.set_time(0.01); // 10 samples
        delay.set_ping_pong(false);

        let mut buf = StereoBuffer::silence(32);
        buf[0] = StereoSample::new(1.0, 0.5);
        delay.process(&mut buf);

        assert_eq!(buf[0], StereoSample::silence());
        assert_eq!(buf[10], StereoSample::new(1.0, 0.5));
        assert!((buf[20].left - DEFAULT_FEEDBACK).abs() < 1e-6);
    }

    #[test]
    fn test_ping_pong_swaps_channels() {
        let mut delay = StereoDelay::new(1000);
        delay.set_time(0.01);
        delay.set_feedback(0.5);

        let mut buf = StereoBuffer::silence(32);
        buf[0] = StereoSample::new(1.0, 0.0);
        delay.process(&mut buf);

        assert_eq!(buf[10].left, 1.0);
        assert_eq!(buf[20].left, 0.0);
        assert!((buf[20].right - 0.5).abs() < 1e-6);
    }
}
