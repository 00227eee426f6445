use crate::{Error, Float, Result};

pub const CHANNELS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The frame was folded into the running mean.
    Accumulated,
    /// The frame completed the sample budget and the image was frozen.
    Finalized,
    /// The budget was already reached; nothing changed.
    Ignored,
}

/// 8-bit RGB image frozen from a finished accumulation.
///
/// Rows are stored bottom-to-top, matching the framebuffer the samples came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub samples: u32,
}

impl FinalImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, samples: u32) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize * CHANNELS);
        Self { width, height, pixels, samples }
    }

    pub fn row_len(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// `row` counts up from the bottom.
    pub fn row(&self, row: u32) -> &[u8] {
        let start = row as usize * self.row_len();
        &self.pixels[start..start + self.row_len()]
    }

    pub fn pixel(&self, col: u32, row: u32) -> [u8; 3] {
        let i = (row as usize * self.width as usize + col as usize) * CHANNELS;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Copy of the pixels with rows ordered top-to-bottom, as image files expect.
    pub fn flipped_rows(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len());
        for row in (0..self.height).rev() {
            out.extend_from_slice(self.row(row));
        }
        out
    }
}

/// Running per-pixel mean over a fixed budget of single-sample frames.
///
/// The buffer always holds the mean of the frames seen so far, updated in place as
/// `mean += (sample - mean) / n`. A run of equal frames keeps the mean exactly at
/// that value. The finished buffer is truncated to bytes exactly once and then
/// frozen; later frames are ignored.
pub struct FrameAccumulator {
    width: u32,
    height: u32,
    mean: Vec<Float>,
    sample_count: u32,
    target_samples: u32,
    image: Option<FinalImage>,
}

impl FrameAccumulator {
    pub fn new(width: u32, height: u32, target_samples: u32) -> Result<Self> {
        if target_samples == 0 {
            return Err(Error::InvalidConfig("sample count must be at least 1".to_string()));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "cannot accumulate a {}x{} image", width, height
            )));
        }
        let len = width as usize * height as usize * CHANNELS;
        Ok(Self {
            width,
            height,
            mean: vec![0.0; len],
            sample_count: 0,
            target_samples,
            image: None,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes expected per submitted frame.
    pub fn frame_len(&self) -> usize {
        self.mean.len()
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn target_samples(&self) -> u32 {
        self.target_samples
    }

    pub fn is_ready(&self) -> bool {
        self.image.is_some()
    }

    /// Fold one raw RGB frame (row-major, bottom row first) into the mean.
    pub fn submit(&mut self, frame: &[u8]) -> Result<SubmitStatus> {
        if self.is_ready() {
            return Ok(SubmitStatus::Ignored);
        }
        if frame.len() != self.mean.len() {
            return Err(Error::FrameSizeMismatch { expected: self.mean.len(), got: frame.len() });
        }

        self.sample_count += 1;
        let n = self.sample_count as Float;
        for (m, &s) in self.mean.iter_mut().zip(frame) {
            *m += (s as Float - *m) / n;
        }
        tracing::trace!(sample = self.sample_count, target = self.target_samples, "accumulated frame");

        if self.sample_count == self.target_samples {
            self.finalize();
            Ok(SubmitStatus::Finalized)
        } else {
            Ok(SubmitStatus::Accumulated)
        }
    }

    fn finalize(&mut self) {
        debug_assert!(self.image.is_none());
        // float -> u8 casts truncate towards zero and saturate at 255
        let pixels = self.mean.iter().map(|&m| m as u8).collect();
        self.image = Some(FinalImage::new(self.width, self.height, pixels, self.sample_count));
        tracing::debug!(samples = self.sample_count, "accumulation finalized");
    }

    /// The running mean of the frames seen so far, truncated to bytes.
    pub fn preview(&self) -> Vec<u8> {
        match &self.image {
            Some(image) => image.pixels.clone(),
            None => self.mean.iter().map(|&m| m as u8).collect(),
        }
    }

    pub fn final_image(&self) -> Option<&FinalImage> {
        self.image.as_ref()
    }

    /// Per-channel mean of the frames submitted so far, in storage order.
    pub fn mean(&self) -> &[Float] {
        &self.mean
    }

    /// Discard all samples and start over with the same budget.
    pub fn reset(&mut self) {
        self.mean.iter_mut().for_each(|m| *m = 0.0);
        self.sample_count = 0;
        self.image = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn constant_frame(acc: &FrameAccumulator, value: u8) -> Vec<u8> {
        vec![value; acc.frame_len()]
    }

    #[test]
    fn test_truncates_mean() {
        let mut acc = FrameAccumulator::new(1, 1, 4).unwrap();
        let statuses: Vec<_> = [0u8, 255, 0, 255].iter()
            .map(|&v| acc.submit(&[v, v, v]).unwrap())
            .collect();

        assert_eq!(statuses, vec![
            SubmitStatus::Accumulated,
            SubmitStatus::Accumulated,
            SubmitStatus::Accumulated,
            SubmitStatus::Finalized,
        ]);
        assert_eq!(acc.mean()[0], 127.5);
        assert_eq!(acc.final_image().unwrap().pixel(0, 0), [127, 127, 127]);
    }

    #[test]
    fn test_constant_frames() {
        for &value in &[0u8, 1, 77, 128, 254, 255] {
            let mut acc = FrameAccumulator::new(3, 2, 8).unwrap();
            for _ in 0..8 {
                let frame = constant_frame(&acc, value);
                acc.submit(&frame).unwrap();
            }
            let image = acc.final_image().unwrap();
            assert!(image.pixels.iter().all(|&p| p == value), "value {}", value);
        }
    }

    #[test]
    fn test_constant_frames_any_budget() {
        for budget in 1..=64 {
            for value in 0..=255u8 {
                let mut acc = FrameAccumulator::new(1, 1, budget).unwrap();
                for _ in 0..budget {
                    acc.submit(&[value; 3]).unwrap();
                }
                assert_eq!(
                    acc.final_image().unwrap().pixel(0, 0),
                    [value; 3],
                    "budget {} value {}", budget, value
                );
            }
        }
    }

    #[test]
    fn test_mean_follows_submissions() {
        let mut acc = FrameAccumulator::new(1, 1, 4).unwrap();
        let means: Vec<Float> = [0u8, 255, 0, 255].iter()
            .map(|&v| {
                acc.submit(&[v, v, v]).unwrap();
                acc.mean()[0]
            })
            .collect();
        assert_eq!(means, vec![0.0, 127.5, 85.0, 127.5]);
    }

    #[test]
    fn test_submit_after_budget_is_ignored() {
        let mut acc = FrameAccumulator::new(2, 1, 2).unwrap();
        acc.submit(&[10, 20, 30, 40, 50, 60]).unwrap();
        assert!(!acc.is_ready());
        acc.submit(&[10, 20, 30, 40, 50, 60]).unwrap();
        assert!(acc.is_ready());

        let mean = acc.mean().to_vec();
        let image = acc.final_image().cloned();

        assert_eq!(acc.submit(&[255; 6]).unwrap(), SubmitStatus::Ignored);
        assert_eq!(acc.submit(&[1; 4]).unwrap(), SubmitStatus::Ignored);
        assert_eq!(acc.mean(), &mean[..]);
        assert_eq!(acc.final_image().cloned(), image);
        assert_eq!(acc.sample_count(), 2);
    }

    #[test]
    fn test_single_sample_budget() {
        let mut acc = FrameAccumulator::new(1, 2, 1).unwrap();
        assert_eq!(acc.submit(&[0, 0, 0, 255, 255, 255]).unwrap(), SubmitStatus::Finalized);
        assert_eq!(acc.final_image().unwrap().pixels, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_rejects_wrong_frame_size() {
        let mut acc = FrameAccumulator::new(2, 2, 4).unwrap();
        let err = acc.submit(&[0; 3]).unwrap_err();
        assert!(matches!(err, Error::FrameSizeMismatch { expected: 12, got: 3 }));
        assert_eq!(acc.sample_count(), 0);
    }

    #[test]
    fn test_preview() {
        let mut acc = FrameAccumulator::new(1, 1, 4).unwrap();
        assert_eq!(acc.preview(), vec![0, 0, 0]);
        acc.submit(&[200, 100, 40]).unwrap();
        assert_eq!(acc.preview(), vec![200, 100, 40]);
        acc.submit(&[100, 100, 40]).unwrap();
        assert_eq!(acc.preview(), vec![150, 100, 40]);
    }

    #[test]
    fn test_reset() {
        let mut acc = FrameAccumulator::new(1, 1, 1).unwrap();
        acc.submit(&[9, 9, 9]).unwrap();
        assert!(acc.is_ready());
        acc.reset();
        assert!(!acc.is_ready());
        assert_eq!(acc.sample_count(), 0);
        assert_eq!(acc.submit(&[3, 3, 3]).unwrap(), SubmitStatus::Finalized);
        assert_eq!(acc.final_image().unwrap().pixels, vec![3, 3, 3]);
    }

    #[test]
    fn test_flipped_rows() {
        let image = FinalImage::new(1, 3, vec![1, 1, 1, 2, 2, 2, 3, 3, 3], 1);
        assert_eq!(image.flipped_rows(), vec![3, 3, 3, 2, 2, 2, 1, 1, 1]);
    }
}
