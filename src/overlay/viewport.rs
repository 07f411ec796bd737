//! Coordinate mapping between data space and screen space
//!
//! The host chart surface owns the real mapping. [`CoordinateMapper`] is the
//! contract the geometry builder consumes; [`LinearViewport`] is a headless
//! implementation used by the CLI and tests.

/// Data → screen mapping supplied by the host surface
///
/// `None` means the value is off-scale or cannot be mapped.
pub trait CoordinateMapper {
    /// Epoch seconds → x pixel
    fn time_to_x(&self, time: i64) -> Option<f64>;

    /// Price → y pixel (y grows downward)
    fn price_to_y(&self, price: f64) -> Option<f64>;
}

impl<T: CoordinateMapper + ?Sized> CoordinateMapper for &T {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        (**self).time_to_x(time)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        (**self).price_to_y(price)
    }
}

/// Visible data range of the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRange {
    pub time_from: i64,
    pub time_to: i64,
    pub price_low: f64,
    pub price_high: f64,
}

/// Linear viewport over a visible range
///
/// Times outside the visible range map to `None`, mirroring a chart time
/// scale that has no coordinate for bars it does not hold. Prices always map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearViewport {
    pub range: VisibleRange,
    pub width: f64,
    pub height: f64,
}

impl LinearViewport {
    pub fn new(range: VisibleRange, width: f64, height: f64) -> Self {
        Self {
            range,
            width,
            height,
        }
    }

    /// Move the visible window, keeping the pixel size
    pub fn set_range(&mut self, range: VisibleRange) {
        self.range = range;
    }
}

impl CoordinateMapper for LinearViewport {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        let VisibleRange {
            time_from, time_to, ..
        } = self.range;
        if time < time_from || time > time_to || time_to == time_from {
            return None;
        }
        let alpha = (time - time_from) as f64 / (time_to - time_from) as f64;
        Some(alpha * self.width)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        let span = self.range.price_high - self.range.price_low;
        if !price.is_finite() || span <= 0.0 {
            return None;
        }
        Some((self.range.price_high - price) / span * self.height)
    }
}
