//! Constants used throughout the HTML conversion process.

/// Decimal digits kept when rounding CSS values.
pub const CSS_PRECISION: u32 = 4;

/// RGB channels all below this value snap to pure black, hiding slight
/// off-black fills introduced by color conversion.
pub const RGB_BLACK_THRESHOLD: f64 = 36.0;

/// The host's exporter rejects JPEG scale factors above this percentage.
pub const MAX_JPG_SCALE: f64 = 776.19;

/// Pixel counts above these thresholds trigger an oversized-image warning.
pub const JPG_PIXEL_WARN_THRESHOLD: f64 = 32.0 * 1024.0 * 1024.0;
pub const PNG_PIXEL_WARN_THRESHOLD: f64 = 5.0 * 1024.0 * 1024.0;

/// Extra width (px) added to point-text containers to keep unwrapped text
/// from overflowing when the browser measures it slightly wider.
pub const POINT_TEXT_WIDTH_PAD: f64 = 22.0;

/// A mask whose bounds are within this distance of the artboard rect on
/// every side is treated as masking the artboard itself.
pub const MASK_ARTBOARD_TOLERANCE: f64 = 5.0;

/// Sample length used when quoting affected text in warnings.
pub const TEXT_SAMPLE_LEN: usize = 35;

/// Maximum length of the duplicate-id list quoted in warnings.
pub const ID_LIST_SAMPLE_LEN: usize = 65;

/// Version stamped into the generated-by comment and the report footer.
pub const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");
