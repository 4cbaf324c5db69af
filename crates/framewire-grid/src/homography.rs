use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};

/// Planar projective map, `q ~ H * p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Hartley conditioning: centroid to the origin, mean distance sqrt(2).
fn conditioning(pts: &[Point2<f32>]) -> Matrix3<f64> {
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn condition(t: &Matrix3<f64>, p: Point2<f32>) -> Point2<f64> {
    let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
    Point2::new(v[0], v[1])
}

/// Undo conditioning and fix the scale so that `h33 == 1`.
fn finish(hn: Matrix3<f64>, t_src: &Matrix3<f64>, t_dst: &Matrix3<f64>) -> Option<Homography> {
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / s))
}

/// Exact homography from four correspondences `src[k] -> dst[k]`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns h11..h32 with h33 = 1; two rows per correspondence.
    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let p = condition(&t_src, src[k]);
        let q = condition(&t_dst, dst[k]);
        let (r0, r1) = (2 * k, 2 * k + 1);

        a[(r0, 0)] = p.x;
        a[(r0, 1)] = p.y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -q.x * p.x;
        a[(r0, 7)] = -q.x * p.y;
        b[r0] = q.x;

        a[(r1, 3)] = p.x;
        a[(r1, 4)] = p.y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -q.y * p.x;
        a[(r1, 7)] = -q.y * p.y;
        b[r1] = q.y;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);
    finish(hn, &t_src, &t_dst)
}

/// Least-squares homography (normalized DLT) from `src.len() >= 4` pairs.
pub fn estimate_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if let (Ok(s4), Ok(d4)) = (
        <&[Point2<f32>; 4]>::try_from(src),
        <&[Point2<f32>; 4]>::try_from(dst),
    ) {
        return homography_from_4pt(s4, d4);
    }

    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (k, (&s, &d)) in src.iter().zip(dst).enumerate() {
        let p = condition(&t_src, s);
        let q = condition(&t_dst, d);
        let (r0, r1) = (2 * k, 2 * k + 1);

        a[(r0, 0)] = -p.x;
        a[(r0, 1)] = -p.y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = q.x * p.x;
        a[(r0, 7)] = q.x * p.y;
        a[(r0, 8)] = q.x;

        a[(r1, 3)] = -p.x;
        a[(r1, 4)] = -p.y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = q.y * p.x;
        a[(r1, 7)] = q.y * p.y;
        a[(r1, 8)] = q.y;
    }

    // Null vector of A: last row of V^T.
    let svd = a.svd(true, true);
    let vt = svd.v_t?;
    let h = vt.row(vt.nrows().checked_sub(1)?);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);
    finish(hn, &t_src, &t_dst)
}
