//! Small fixed-size vector and matrix helpers.

pub type Vec3 = [f64; 3];
pub type Mat3 = [[f64; 3]; 3];

pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub fn mat_vec(m: &Mat3, v: &Vec3) -> Vec3 {
    [dot(&m[0], v), dot(&m[1], v), dot(&m[2], v)]
}

pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

pub fn transpose(m: &Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// `r · s · rᵗ`
pub fn rotate_forward(r: &Mat3, s: &Mat3) -> Mat3 {
    mat_mul(r, &mat_mul(s, &transpose(r)))
}

pub fn diagonal(d: &Vec3) -> Mat3 {
    [[d[0], 0.0, 0.0], [0.0, d[1], 0.0], [0.0, 0.0, d[2]]]
}

/// Normal and shear traction vectors of a symmetric `stress` on the plane of
/// unit normal `n`: `tn = n (n·σn)` and `ts = σn − tn`.
pub fn normal_and_shear(stress: &Mat3, n: &Vec3) -> (Vec3, Vec3) {
    let t = mat_vec(stress, n);
    let tn = scale(n, dot(n, &t));
    let ts = sub(&t, &tn);
    (tn, ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traction_split_is_orthogonal() {
        let stress = [[1.0, 0.5, 0.0], [0.5, 2.0, 0.25], [0.0, 0.25, 3.0]];
        let n = {
            let v = [1.0, 2.0, 2.0];
            scale(&v, 1.0 / norm(&v))
        };
        let (tn, ts) = normal_and_shear(&stress, &n);
        assert!(dot(&tn, &ts).abs() < 1e-12);
        assert!(dot(&ts, &n).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_forward_with_identity() {
        let s = diagonal(&[1.0, 2.0, 3.0]);
        assert_eq!(rotate_forward(&IDENTITY, &s), s);
    }
}
