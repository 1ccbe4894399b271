//! Display helpers derived from file metadata.

const SIZE_UNITS: [&str; 6] = ["bytes", "kb", "MB", "GB", "TB", "PB"];

/// Render a byte count with base-1024 units and two decimals.
///
/// The unit is the largest power of 1024 not exceeding `bytes`, clamped at
/// petabytes. Zero renders as `"0 bytes"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pretty_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 bytes".to_string();
    }

    let mut exponent = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exponent < SIZE_UNITS.len() - 1 {
        scaled /= 1024;
        exponent += 1;
    }

    let divisor = (0..exponent).fold(1.0_f64, |acc, _| acc * 1024.0);
    let value = bytes as f64 / divisor;
    format!("{value:.2} {}", SIZE_UNITS[exponent])
}

/// Split a file name into `(name without extension, extension)`.
///
/// The split happens at the last `.`; names without one have an empty
/// extension.
#[must_use]
pub fn split_name(name: &str) -> (&str, &str) {
    name.rfind('.')
        .map_or((name, ""), |dot| (&name[..dot], &name[dot + 1..]))
}

/// Scale `(width, height)` to fit inside `(max_width, max_height)`.
///
/// Aspect ratio is preserved and images are never enlarged. Non-empty inputs
/// always yield at least one pixel per side.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn thumbnail_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height))
        .min(1.0);
    let scale = |side: u32| (f64::from(side) * ratio).round().max(1.0) as u32;
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_size_boundaries() {
        assert_eq!(pretty_size(0), "0 bytes");
        assert_eq!(pretty_size(1), "1.00 bytes");
        assert_eq!(pretty_size(1023), "1023.00 bytes");
        assert_eq!(pretty_size(1024), "1.00 kb");
        assert_eq!(pretty_size(1536), "1.50 kb");
        assert_eq!(pretty_size(1_048_576), "1.00 MB");
        assert_eq!(pretty_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn pretty_size_clamps_at_petabytes() {
        let exabyte = 1024_u64.pow(6);
        assert_eq!(pretty_size(exabyte), "1024.00 PB");
    }

    #[test]
    fn split_name_uses_last_dot() {
        assert_eq!(split_name("photo.final.png"), ("photo.final", "png"));
        assert_eq!(split_name("README"), ("README", ""));
        assert_eq!(split_name(".bashrc"), ("", "bashrc"));
        assert_eq!(split_name("trailing."), ("trailing", ""));
    }

    #[test]
    fn thumbnail_fits_box_and_keeps_aspect() {
        assert_eq!(thumbnail_size(200, 100, 50, 50), (50, 25));
        assert_eq!(thumbnail_size(100, 400, 50, 50), (13, 50));
        assert_eq!(thumbnail_size(20, 10, 50, 50), (20, 10));
        assert_eq!(thumbnail_size(5000, 1, 50, 50), (50, 1));
        assert_eq!(thumbnail_size(0, 10, 50, 50), (0, 0));
    }
}
