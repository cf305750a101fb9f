//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions that fit inside a square of `max_edge` pixels.
///
/// The longer edge is scaled down to `max_edge` and the shorter edge
/// follows, preserving aspect ratio. Images already within bounds keep
/// their size: this never upscales. Neither edge rounds down to zero.
///
/// # Arguments
/// * `original` - Original image dimensions (width, height)
/// * `max_edge` - Maximum size of the longer edge in pixels
///
/// # Returns
/// * `(width, height)` - Output dimensions
///
/// # Examples
/// ```
/// # use blt::imaging::calculate_fit_dimensions;
/// // 4000x3000 landscape bounded to 1280 → 1280x960
/// assert_eq!(calculate_fit_dimensions((4000, 3000), 1280), (1280, 960));
///
/// // Small images are left alone
/// assert_eq!(calculate_fit_dimensions((640, 480), 1280), (640, 480));
/// ```
pub fn calculate_fit_dimensions(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);

    if longer_edge <= max_edge || longer_edge == 0 {
        return original;
    }

    let ratio = max_edge as f64 / longer_edge as f64;
    if orig_w >= orig_h {
        // Landscape or square
        let h = ((orig_h as f64 * ratio).round() as u32).max(1);
        (max_edge, h)
    } else {
        // Portrait
        let w = ((orig_w as f64 * ratio).round() as u32).max(1);
        (w, max_edge)
    }
}
