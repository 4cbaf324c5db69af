#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImageView<'_> {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .is_some_and(|n| n == self.data.len())
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

impl GrayImage {
    pub fn new(width: usize, height: usize, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }
}

/// 256-bin intensity histogram.
pub fn histogram(src: &GrayImageView<'_>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in src.data {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold: the level maximising between-class variance.
///
/// Pixels `<= t` form the dark class. Returns `None` for a flat image.
pub fn otsu_threshold(src: &GrayImageView<'_>) -> Option<u8> {
    let hist = histogram(src);
    let total: f64 = src.data.len() as f64;
    if total == 0.0 {
        return None;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut w_dark = 0.0f64;
    let mut sum_dark = 0.0f64;
    let mut best: Option<(u8, f64)> = None;

    for (t, &count) in hist.iter().enumerate() {
        w_dark += count as f64;
        if w_dark == 0.0 {
            continue;
        }
        let w_light = total - w_dark;
        if w_light == 0.0 {
            break;
        }
        sum_dark += t as f64 * count as f64;
        let mean_dark = sum_dark / w_dark;
        let mean_light = (sum_all - sum_dark) / w_light;
        let between = w_dark * w_light * (mean_dark - mean_light).powi(2);
        if best.is_none_or(|(_, b)| between > b) {
            best = Some((t as u8, between));
        }
    }
    best.map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_bimodal_image() {
        let mut img = GrayImage::new(10, 10, 220);
        for y in 0..10 {
            for x in 0..4 {
                img.set(x, y, 30);
            }
        }
        let t = otsu_threshold(&img.view()).expect("threshold");
        assert!((30..220).contains(&t), "threshold {t}");
    }

    #[test]
    fn otsu_rejects_flat_image() {
        let img = GrayImage::new(4, 4, 128);
        assert_eq!(otsu_threshold(&img.view()), None);
    }

    #[test]
    fn view_validity_checks_buffer_length() {
        let data = [0u8; 6];
        let ok = GrayImageView {
            width: 3,
            height: 2,
            data: &data,
        };
        let bad = GrayImageView {
            width: 4,
            height: 2,
            data: &data,
        };
        assert!(ok.is_valid());
        assert!(!bad.is_valid());
    }
}
