//! Deterministic sampling helpers shared by the renderer and the AO pass

use cgmath::{InnerSpace, Vector3};
use rand::Rng;
use std::f32::consts::PI;

/// Combine a seed with one more key into a well-scrambled 64-bit seed
pub fn mix_seed(seed: u64, key: u64) -> u64 {
    let mut z = seed ^ key.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Jittered position of stratum `(column, row)` in a `columns x rows` grid
/// over the unit square
pub fn jittered_stratum<R: Rng>(rng: &mut R, column: u32, row: u32, columns: u32, rows: u32) -> (f32, f32) {
    let u = (column as f32 + rng.gen::<f32>()) / columns as f32;
    let v = (row as f32 + rng.gen::<f32>()) / rows as f32;
    (u.min(1.0 - f32::EPSILON), v.min(1.0 - f32::EPSILON))
}

/// Map a unit-square point to a cosine-weighted direction around +Z.
/// `elevation` selects the ring, `azimuth` the angle.
pub fn cosine_hemisphere(azimuth: f32, elevation: f32) -> Vector3<f32> {
    let radius = elevation.sqrt();
    let phi = 2.0 * PI * azimuth;
    Vector3::new(
        radius * phi.cos(),
        radius * phi.sin(),
        (1.0 - elevation).max(0.0).sqrt(),
    )
}

/// Two tangents completing unit `normal` to a right-handed orthonormal basis
pub fn orthonormal_basis(normal: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let sign = 1.0f32.copysign(normal.z);
    let a = -1.0 / (sign + normal.z);
    let b = normal.x * normal.y * a;
    let tangent = Vector3::new(1.0 + sign * normal.x * normal.x * a, sign * b, -sign * normal.x);
    let bitangent = Vector3::new(b, sign + normal.y * normal.y * a, -normal.y);
    (tangent, bitangent)
}

/// Express a +Z-hemisphere direction in the frame of `normal`
pub fn to_world(local: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    let (tangent, bitangent) = orthonormal_basis(normal);
    (tangent * local.x + bitangent * local.y + normal * local.z).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mix_seed_spreads_keys() {
        assert_ne!(mix_seed(0, 1), mix_seed(0, 2));
        assert_ne!(mix_seed(1, 0), mix_seed(2, 0));
        assert_eq!(mix_seed(7, 11), mix_seed(7, 11));
    }

    #[test]
    fn test_jitter_stays_in_stratum() {
        let mut rng = StdRng::seed_from_u64(3);
        for column in 0..4 {
            for row in 0..3 {
                let (u, v) = jittered_stratum(&mut rng, column, row, 4, 3);
                assert!(u >= column as f32 / 4.0 && u < (column + 1) as f32 / 4.0);
                assert!(v >= row as f32 / 3.0 && v < (row + 1) as f32 / 3.0);
            }
        }
    }

    #[test]
    fn test_cosine_directions_are_unit_upper_hemisphere() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let d = cosine_hemisphere(rng.gen(), rng.gen());
            assert!((d.magnitude() - 1.0).abs() < 1e-5);
            assert!(d.z >= 0.0);
        }
        assert!((cosine_hemisphere(0.3, 0.0) - Vector3::unit_z()).magnitude() < 1e-6);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let normals = [
            Vector3::unit_z(),
            -Vector3::unit_z(),
            Vector3::unit_x(),
            Vector3::new(0.3, -0.5, 0.8).normalize(),
            Vector3::new(-0.7, 0.1, -0.2).normalize(),
        ];
        for n in normals {
            let (t, b) = orthonormal_basis(n);
            assert!((t.magnitude() - 1.0).abs() < 1e-5);
            assert!((b.magnitude() - 1.0).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!(to_world(Vector3::unit_z(), n).dot(n) > 0.9999);
        }
    }
}
