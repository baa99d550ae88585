//! Band images: decoded pixel data split into f32 planes plus the sample
//! depth needed to write them back unchanged.

mod io;
mod plane;


pub use io::{load_image, save_image, ImageFormat};
pub use plane::Plane;

use rayon::prelude::*;

/// Per-sample storage type of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SampleDepth {
    U8,
    U16,
    F32,
}

impl SampleDepth {
    /// Largest representable sample value, `None` for float samples.
    pub fn max_value(&self) -> Option<f32> {
        match self {
            SampleDepth::U8 => Some(u8::MAX as f32),
            SampleDepth::U16 => Some(u16::MAX as f32),
            SampleDepth::F32 => None,
        }
    }

    /// Round and clamp a resampled value to this depth's range.
    #[inline]
    pub fn quantize(&self, value: f32) -> f32 {
        match self.max_value() {
            Some(max) => value.round().clamp(0.0, max),
            None => value,
        }
    }
}

/// Channel layout of a band image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ChannelLayout {
    Gray,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn channel_count(&self) -> usize {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }

    pub(crate) fn from_channel_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Gray),
            3 => Some(ChannelLayout::Rgb),
            4 => Some(ChannelLayout::Rgba),
            _ => None,
        }
    }
}

/// A decoded band image, one [`Plane`] per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BandImage {
    planes: Vec<Plane>,
    layout: ChannelLayout,
    depth: SampleDepth,
}

impl BandImage {
    /// Build from planes that all share the same dimensions.
    pub fn new(planes: Vec<Plane>, depth: SampleDepth) -> Self {
        let layout = ChannelLayout::from_channel_count(planes.len())
            .unwrap_or_else(|| panic!("unsupported channel count: {}", planes.len()));
        let dims = planes[0].dimensions();
        assert!(
            planes.iter().all(|p| p.dimensions() == dims),
            "all planes must share the same dimensions"
        );
        Self {
            planes,
            layout,
            depth,
        }
    }

    pub fn gray(plane: Plane, depth: SampleDepth) -> Self {
        Self::new(vec![plane], depth)
    }

    /// Split interleaved samples into planes.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        layout: ChannelLayout,
        depth: SampleDepth,
        samples: &[f32],
    ) -> Self {
        let channels = layout.channel_count();
        assert_eq!(samples.len(), width * height * channels);

        let planes = (0..channels)
            .map(|c| {
                let pixels = samples.iter().skip(c).step_by(channels).copied().collect();
                Plane::new(width, height, pixels)
            })
            .collect();

        Self {
            planes,
            layout,
            depth,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        self.planes[0].dimensions()
    }

    #[inline]
    pub fn depth(&self) -> SampleDepth {
        self.depth
    }

    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Apply `f` to every plane, keeping layout and depth.
    pub fn map_planes<F>(&self, f: F) -> BandImage
    where
        F: Fn(&Plane) -> Plane,
    {
        let planes = self.planes.iter().map(&f).collect();
        BandImage {
            planes,
            layout: self.layout,
            depth: self.depth,
        }
    }

    /// Single-channel intensity view used for photometric comparison.
    ///
    /// RGB(A) is reduced with Rec.601 luma weights; alpha is ignored.
    pub fn to_intensity(&self) -> Plane {
        match self.layout {
            ChannelLayout::Gray => self.planes[0].clone(),
            ChannelLayout::Rgb | ChannelLayout::Rgba => {
                let (r, g, b) = (&self.planes[0], &self.planes[1], &self.planes[2]);
                let pixels = r
                    .pixels()
                    .par_iter()
                    .zip(g.pixels().par_iter())
                    .zip(b.pixels().par_iter())
                    .map(|((&r, &g), &b)| 0.299 * r + 0.587 * g + 0.114 * b)
                    .collect();
                Plane::new(self.width(), self.height(), pixels)
            }
        }
    }

    /// Interleave the planes back into one sample vector, quantized to the
    /// image's sample depth.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let channels = self.planes.len();
        let mut out = vec![0.0f32; self.width() * self.height() * channels];
        out.par_chunks_mut(channels)
            .enumerate()
            .for_each(|(i, px)| {
                for (c, v) in px.iter_mut().enumerate() {
                    *v = self.depth.quantize(self.planes[c].pixels()[i]);
                }
            });
        out
    }
}
