use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::geometry::Roi;
use crate::track::backend::{TrackerBackend, TrackerFactory};

/// Default search radius around the last known position, in pixels.
pub const DEFAULT_SEARCH_MARGIN: u32 = 24;
/// Mean absolute luma difference above which the target counts as lost.
pub const DEFAULT_MAX_MEAN_DIFF: f32 = 40.0;

/// Samples compared per candidate position, at most.
const MAX_SAMPLES: u32 = 1024;

#[derive(Clone, Copy, Debug)]
pub struct TemplateParams {
    pub search_margin: u32,
    pub max_mean_diff: f32,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            search_margin: DEFAULT_SEARCH_MARGIN,
            max_mean_diff: DEFAULT_MAX_MEAN_DIFF,
        }
    }
}

/// CPU tracker: exhaustive sum-of-absolute-differences search for the
/// initial luma patch within a window around the last position.
pub struct TemplateBackend {
    params: TemplateParams,
    template: Vec<u8>,
    roi: Option<Roi>,
    frame_size: (u32, u32),
}

impl TemplateBackend {
    pub fn new(params: TemplateParams) -> Self {
        Self {
            params,
            template: Vec::new(),
            roi: None,
            frame_size: (0, 0),
        }
    }

    fn sample_stride(roi: &Roi) -> u32 {
        let area = roi.width * roi.height;
        let mut stride = 1;
        while area / (stride * stride) > MAX_SAMPLES {
            stride += 1;
        }
        stride
    }

    /// Mean absolute difference at (`x`, `y`), or `None` once it exceeds `bound`.
    fn score(
        &self,
        luma: &[u8],
        frame_width: u32,
        roi: &Roi,
        x: u32,
        y: u32,
        bound: f32,
    ) -> Option<f32> {
        let stride = Self::sample_stride(roi);
        let total = (roi.width.div_ceil(stride) * roi.height.div_ceil(stride)) as f32;
        let limit = bound * total;
        let mut sad = 0u64;
        for ty in (0..roi.height).step_by(stride as usize) {
            let frame_row = ((y + ty) * frame_width + x) as usize;
            let template_row = (ty * roi.width) as usize;
            for tx in (0..roi.width).step_by(stride as usize) {
                let a = luma[frame_row + tx as usize];
                let b = self.template[template_row + tx as usize];
                sad += a.abs_diff(b) as u64;
            }
            if sad as f32 > limit {
                return None;
            }
        }
        let mean = sad as f32 / total;
        (mean <= bound).then_some(mean)
    }
}

impl TrackerBackend for TemplateBackend {
    fn name(&self) -> &'static str {
        "template"
    }

    fn init(&mut self, frame: &Frame, roi: Roi) -> Result<()> {
        if roi.x < 0
            || roi.y < 0
            || roi.x as u32 + roi.width > frame.width()
            || roi.y as u32 + roi.height > frame.height()
        {
            return Err(anyhow!(
                "region {:?} outside {}x{} frame",
                roi,
                frame.width(),
                frame.height()
            ));
        }
        let luma = to_luma(frame);
        let fw = frame.width() as usize;
        let mut template = Vec::with_capacity((roi.width * roi.height) as usize);
        for row in 0..roi.height as usize {
            let start = (roi.y as usize + row) * fw + roi.x as usize;
            template.extend_from_slice(&luma[start..start + roi.width as usize]);
        }
        self.template = template;
        self.roi = Some(roi);
        self.frame_size = (frame.width(), frame.height());
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<Option<Roi>> {
        let roi = self.roi.ok_or_else(|| anyhow!("template backend used before init"))?;
        if (frame.width(), frame.height()) != self.frame_size {
            return Err(anyhow!(
                "frame size changed from {:?} to {}x{}",
                self.frame_size,
                frame.width(),
                frame.height()
            ));
        }
        let luma = to_luma(frame);
        let margin = self.params.search_margin as i32;
        let max_x = (frame.width() - roi.width) as i32;
        let max_y = (frame.height() - roi.height) as i32;

        let mut best: Option<(f32, i32, i32)> = None;
        for y in (roi.y - margin).max(0)..=(roi.y + margin).min(max_y) {
            for x in (roi.x - margin).max(0)..=(roi.x + margin).min(max_x) {
                let bound = best.map_or(self.params.max_mean_diff, |(s, _, _)| s);
                let score = self.score(&luma, frame.width(), &roi, x as u32, y as u32, bound);
                if let Some(score) = score {
                    let closer = best.map_or(true, |(s, bx, by)| {
                        score < s
                            || (score == s
                                && (x - roi.x).abs() + (y - roi.y).abs()
                                    < (bx - roi.x).abs() + (by - roi.y).abs())
                    });
                    if closer {
                        best = Some((score, x, y));
                    }
                }
            }
        }

        Ok(best.map(|(_, x, y)| {
            let found = Roi::new(x, y, roi.width, roi.height);
            self.roi = Some(found);
            found
        }))
    }
}

/// Factory for `TemplateBackend` instances.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateFactory {
    pub params: TemplateParams,
}

impl TemplateFactory {
    pub fn new(params: TemplateParams) -> Self {
        Self { params }
    }
}

impl TrackerFactory for TemplateFactory {
    fn name(&self) -> &'static str {
        "template"
    }

    fn create(&self) -> Result<Box<dyn TrackerBackend>> {
        Ok(Box::new(TemplateBackend::new(self.params)))
    }
}

fn to_luma(frame: &Frame) -> Vec<u8> {
    frame
        .pixels()
        .chunks_exact(3)
        .map(|rgb| ((rgb[0] as u32 * 77 + rgb[1] as u32 * 150 + rgb[2] as u32 * 29) >> 8) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scene(seq: u64, target_x: u32, target_y: u32) -> Frame {
        let mut image = RgbImage::from_pixel(160, 120, Rgb([20, 20, 20]));
        for y in target_y..target_y + 16 {
            for x in target_x..target_x + 16 {
                let shade = (((x - target_x) * 12) + ((y - target_y) * 3)) as u8;
                image.put_pixel(x, y, Rgb([200, 120 + shade / 2, shade]));
            }
        }
        Frame::new(seq, image)
    }

    #[test]
    fn follows_target_within_search_window() -> Result<()> {
        let mut backend = TemplateBackend::new(TemplateParams::default());
        backend.init(&scene(1, 40, 30), Roi::new(40, 30, 16, 16))?;

        let found = backend.update(&scene(2, 47, 35))?;
        assert_eq!(found, Some(Roi::new(47, 35, 16, 16)));

        let found = backend.update(&scene(3, 55, 41))?;
        assert_eq!(found, Some(Roi::new(55, 41, 16, 16)));
        Ok(())
    }

    #[test]
    fn reports_loss_when_target_leaves_window() -> Result<()> {
        let mut backend = TemplateBackend::new(TemplateParams::default());
        backend.init(&scene(1, 10, 10), Roi::new(10, 10, 16, 16))?;

        let found = backend.update(&scene(2, 130, 90))?;
        assert_eq!(found, None);
        Ok(())
    }

    #[test]
    fn rejects_region_outside_frame() {
        let mut backend = TemplateBackend::new(TemplateParams::default());
        assert!(backend.init(&scene(1, 10, 10), Roi::new(150, 110, 16, 16)).is_err());
    }

    #[test]
    fn update_before_init_is_an_error() {
        let mut backend = TemplateBackend::new(TemplateParams::default());
        assert!(backend.update(&scene(1, 10, 10)).is_err());
    }
}
