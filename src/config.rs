use std::time::Duration;

pub const DEFAULT_MAX_IMAGE_WIDTH_IN: f64 = 6.0;
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(20);

/// Pixels per inch assumed for images that carry no physical size.
pub const PIXELS_PER_INCH: f64 = 96.0;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Widest an embedded image may be rendered, in inches.
    pub max_image_width_in: f64,
    /// Ceiling on a single remote image fetch.
    pub image_timeout: Duration,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_image_width_in: DEFAULT_MAX_IMAGE_WIDTH_IN,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
        }
    }
}

impl ConvertOptions {
    pub fn max_image_width_px(&self) -> u32 {
        let px = self.max_image_width_in * PIXELS_PER_INCH;
        if px.is_finite() && px >= 1.0 {
            px.round() as u32
        } else {
            1
        }
    }
}
