//! Scale factory: pure mappings from data domains to visual channels.
//!
//! Every constructor is total. Degenerate domains (empty, min == max,
//! all-zero) never fail; they fall back to a constant mid-range or minimum
//! output so a widget can always paint something sensible.

use egui::Color32;

use crate::themes;

/// Linear position scale over an observed `[min, max]` extent.
#[derive(Clone, Copy, Debug)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        let (mut lo, mut hi) = domain;
        if !lo.is_finite() {
            lo = 0.0;
        }
        if !hi.is_finite() {
            hi = lo;
        }
        Self {
            domain: (lo, hi),
            range,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn map(&self, value: f64) -> f32 {
        let (lo, hi) = self.domain;
        let (r0, r1) = self.range;
        if hi == lo {
            return r0 + (r1 - r0) * 0.5;
        }
        let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0) as f32;
        r0 + (r1 - r0) * t
    }

    /// Round tick values covering the domain, at most `count + 1` of them,
    /// stepping by 1/2/5 decades.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = self.domain;
        if hi <= lo || count == 0 {
            return vec![lo];
        }
        let step = nice_step((hi - lo) / count as f64);
        let first = (lo / step).ceil() * step;
        let mut out = Vec::new();
        let mut v = first;
        while v <= hi + step * 1e-6 {
            out.push(v);
            v += step;
        }
        out
    }
}

fn nice_step(raw: f64) -> f64 {
    let raw = raw.max(f64::MIN_POSITIVE);
    let magnitude = 10f64.powf(raw.log10().floor());
    for mult in [1.0, 2.0, 5.0, 10.0] {
        let step = mult * magnitude;
        if step >= raw {
            return step;
        }
    }
    10.0 * magnitude
}

/// Square-root radius scale over `[0, max]`.
///
/// Radius grows with the square root of the value so that circle *area*,
/// which is what the eye compares, is linear in the value.
#[derive(Clone, Copy, Debug)]
pub struct SqrtScale {
    max: f64,
    range: (f32, f32),
}

impl SqrtScale {
    pub fn new(max: f64, range: (f32, f32)) -> Self {
        let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
        Self { max, range }
    }

    pub fn map(&self, value: f64) -> f32 {
        let (r0, r1) = self.range;
        if self.max <= 0.0 {
            return r0;
        }
        let t = (value.max(0.0) / self.max).sqrt().min(1.0) as f32;
        r0 + (r1 - r0) * t
    }
}

/// Evenly spaced ordinal positions over a declared domain, in declared order.
#[derive(Clone, Debug)]
pub struct BandScale {
    domain: Vec<String>,
    range: (f32, f32),
}

impl BandScale {
    pub fn new(domain: Vec<String>, range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn map(&self, name: &str) -> Option<f32> {
        let i = self.domain.iter().position(|d| d == name)?;
        Some(self.position(i))
    }

    pub fn position(&self, index: usize) -> f32 {
        let (r0, r1) = self.range;
        let n = self.domain.len();
        if n <= 1 {
            return r0 + (r1 - r0) * 0.5;
        }
        let t = index.min(n - 1) as f32 / (n - 1) as f32;
        r0 + (r1 - r0) * t
    }
}

/// Sequential color over `[0, max]`, sampled from the heat ramp.
#[derive(Clone, Copy, Debug)]
pub struct SequentialColor {
    max: f64,
}

impl SequentialColor {
    pub fn new(max: f64) -> Self {
        let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
        Self { max }
    }

    pub fn map(&self, value: f64) -> Color32 {
        if self.max <= 0.0 {
            return themes::heat(0.5);
        }
        themes::heat((value.max(0.0) / self.max) as f32)
    }
}

/// Categorical color assignment.
///
/// The three major suppliers keep their reserved identity colors; everything
/// else cycles the shared palette in domain order, so the assignment is
/// stable for a given domain ordering.
#[derive(Clone, Debug)]
pub struct CategoricalColor {
    assigned: Vec<(String, Color32)>,
}

impl CategoricalColor {
    pub fn new<I, S>(domain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut assigned = Vec::new();
        let mut next = 0usize;
        for name in domain {
            let name = name.into();
            let color = themes::reserved_color(&name).unwrap_or_else(|| {
                let c = themes::CATEGORICAL[next % themes::CATEGORICAL.len()];
                next += 1;
                c
            });
            assigned.push((name, color));
        }
        Self { assigned }
    }

    pub fn map(&self, name: &str) -> Color32 {
        self.assigned
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
            .unwrap_or(Color32::GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_maps_extent_to_range() {
        let s = LinearScale::new((10.0, 20.0), (0.0, 100.0));
        assert_eq!(s.map(10.0), 0.0);
        assert_eq!(s.map(20.0), 100.0);
        assert_eq!(s.map(15.0), 50.0);
        // Out-of-domain values clamp.
        assert_eq!(s.map(-5.0), 0.0);
        assert_eq!(s.map(99.0), 100.0);
    }

    #[test]
    fn degenerate_linear_domain_yields_midpoint() {
        let s = LinearScale::new((7.0, 7.0), (10.0, 30.0));
        assert_eq!(s.map(7.0), 20.0);
        assert_eq!(s.map(123.0), 20.0);
    }

    #[test]
    fn sqrt_scale_is_area_linear() {
        let s = SqrtScale::new(100.0, (0.0, 10.0));
        // Quadrupling the value doubles the radius.
        let r1 = s.map(25.0);
        let r2 = s.map(100.0);
        assert!((r2 - 2.0 * r1).abs() < 1e-5);
    }

    #[test]
    fn sqrt_scale_all_zero_falls_back_to_minimum() {
        let s = SqrtScale::new(0.0, (5.0, 20.0));
        assert_eq!(s.map(0.0), 5.0);
        assert_eq!(s.map(42.0), 5.0);
    }

    #[test]
    fn band_scale_spaces_declared_order() {
        let s = BandScale::new(
            vec!["a".into(), "b".into(), "c".into()],
            (0.0, 100.0),
        );
        assert_eq!(s.map("a"), Some(0.0));
        assert_eq!(s.map("b"), Some(50.0));
        assert_eq!(s.map("c"), Some(100.0));
        assert_eq!(s.map("zzz"), None);
    }

    #[test]
    fn band_scale_single_item_centers() {
        let s = BandScale::new(vec!["only".into()], (0.0, 80.0));
        assert_eq!(s.map("only"), Some(40.0));
    }

    #[test]
    fn sequential_color_degenerate_uses_mid_ramp() {
        let s = SequentialColor::new(0.0);
        assert_eq!(s.map(0.0), themes::heat(0.5));
    }

    #[test]
    fn categorical_reserves_supplier_identity() {
        let s = CategoricalColor::new(["Germany", "United States", "France"]);
        assert_eq!(s.map("United States"), themes::UNITED_STATES);
        // Non-reserved names take palette colors in order, skipping none.
        assert_eq!(s.map("Germany"), themes::CATEGORICAL[0]);
        assert_eq!(s.map("France"), themes::CATEGORICAL[1]);
    }

    #[test]
    fn ticks_cover_domain_with_round_steps() {
        let s = LinearScale::new((0.0, 97.0), (0.0, 1.0));
        let ticks = s.ticks(5);
        assert!(ticks.len() >= 4 && ticks.len() <= 6);
        assert_eq!(ticks[0], 0.0);
        assert!(ticks.windows(2).all(|w| w[1] > w[0]));
        assert!(*ticks.last().unwrap() <= 97.0);
    }
}
