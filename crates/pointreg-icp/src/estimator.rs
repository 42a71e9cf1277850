use faer::{Col, Mat};

use crate::{
    error::IcpError,
    point::{centroid, Point},
    transform::RigidTransform,
};

/// Relative threshold under which a point set is considered to have no spread.
const SPREAD_TOL: f64 = 1e-20;

/// Relative threshold under which a singular value of the cross-covariance counts as zero.
const RANK_TOL: f64 = 1e-10;

/// Compute the rigid transformation that best aligns two ordered point sets.
///
/// Finds `T` minimizing `Σ ‖T(points_src[i]) - points_dst[i]‖²` in closed form:
///
/// 1. Compute the centroids of both sets.
/// 2. Center both sets by subtracting their centroids.
/// 3. Compute the cross-covariance matrix H = Σ[(src - src_mean) * (dst - dst_mean)^T].
/// 4. Compute the SVD of H = U * S * V^T.
/// 5. Compute R = V * U^T. If det(R) < 0, negate the column of V that belongs to the
///    smallest singular value and recompute R so the result is a proper rotation.
/// 6. Compute t = dst_mean - R * src_mean.
///
/// For more details, see: Arun, K., Huang, T. S., and Blostein, S. D.
/// "Least-squares fitting of two 3-D point sets." IEEE PAMI, 1987.
///
/// # Arguments
///
/// * `points_src` - Source points.
/// * `points_dst` - Destination points, paired by index with `points_src`.
///
/// # Returns
///
/// The transform mapping the source points onto the destination points.
///
/// # Errors
///
/// * [`IcpError::MismatchedLengths`] if the lists have different lengths.
/// * [`IcpError::NotEnoughPoints`] if fewer pairs than the dimension are given.
/// * [`IcpError::DegenerateGeometry`] if the rotation is not unique, e.g. all points
///   coincide or 3D points are collinear.
/// * [`IcpError::Numerical`] if the inputs or the decomposition are not finite.
///
/// Example:
///
/// ```
/// use pointreg_icp::fit_transformation;
/// use pointreg_lie::se2::SE2;
///
/// let src = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
/// let dst = [[2.0, 3.0], [2.0, 4.0], [1.0, 3.0]];
/// let dst_from_src: SE2 = fit_transformation(&src, &dst).unwrap();
/// assert!((dst_from_src.r.log() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
/// ```
pub fn fit_transformation<T: RigidTransform>(
    points_src: &[T::Point],
    points_dst: &[T::Point],
) -> Result<T, IcpError> {
    let (rotation, translation) = fit_rotation_translation(points_src, points_dst)?;
    Ok(T::from_rotation_translation(
        rotation.as_ref(),
        translation.as_ref(),
    ))
}

/// Closed-form rotation and translation aligning `points_src` onto `points_dst`.
pub(crate) fn fit_rotation_translation<P: Point>(
    points_src: &[P],
    points_dst: &[P],
) -> Result<(Mat<f64>, Col<f64>), IcpError> {
    let d = P::DIM;
    let n = points_src.len();

    if n != points_dst.len() {
        return Err(IcpError::MismatchedLengths {
            source_len: n,
            destination_len: points_dst.len(),
        });
    }
    if n < d {
        return Err(IcpError::NotEnoughPoints {
            required: d,
            actual: n,
        });
    }

    let src_centroid = centroid(points_src);
    let dst_centroid = centroid(points_dst);
    if (0..d).any(|i| !src_centroid.read(i).is_finite() || !dst_centroid.read(i).is_finite()) {
        return Err(IcpError::Numerical(
            "input coordinates are not finite".to_string(),
        ));
    }

    // centered point sets, one point per column
    let src_centered = Mat::from_fn(d, n, |i, j| points_src[j].coords()[i] - src_centroid.read(i));
    let dst_centered = Mat::from_fn(d, n, |i, j| points_dst[j].coords()[i] - dst_centroid.read(i));

    // all points of one set coincide: any rotation explains the data equally well
    let src_spread = src_centered.squared_norm_l2();
    let dst_spread = dst_centered.squared_norm_l2();
    let src_norm = squared_norm(points_src);
    let dst_norm = squared_norm(points_dst);
    if src_spread <= SPREAD_TOL * src_norm.max(f64::MIN_POSITIVE)
        || dst_spread <= SPREAD_TOL * dst_norm.max(f64::MIN_POSITIVE)
    {
        return Err(IcpError::DegenerateGeometry {
            smallest_singular_value: 0.0,
        });
    }

    // cross-covariance H = Σ (src - src_mean) * (dst - dst_mean)^T
    let h = src_centered.as_ref() * dst_centered.transpose();

    let svd = h.svd();
    let (u, s, v) = (svd.u(), svd.s_diagonal(), svd.v());

    let singular_values = (0..d).map(|i| s.read(i)).collect::<Vec<_>>();
    let finite = singular_values.iter().all(|x| x.is_finite())
        && (0..d).all(|i| (0..d).all(|j| u.read(i, j).is_finite() && v.read(i, j).is_finite()));
    if !finite {
        return Err(IcpError::Numerical(
            "SVD of the cross-covariance did not converge".to_string(),
        ));
    }

    // index of the smallest singular value
    let (min_idx, min_sv) = singular_values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::INFINITY), |acc, (i, sv)| {
            if sv < acc.1 {
                (i, sv)
            } else {
                acc
            }
        });

    // with two or more vanishing singular values the rotation about the degenerate
    // directions is free; a single one is resolved by the determinant constraint
    let rank_tol = RANK_TOL * (src_spread * dst_spread).sqrt();
    let rank = singular_values.iter().filter(|&&sv| sv > rank_tol).count();
    if rank + 1 < d {
        return Err(IcpError::DegenerateGeometry {
            smallest_singular_value: min_sv,
        });
    }

    // R = V * U^T
    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        // R = V * diag(1, .., -1, .., 1) * U^T, flipping the least significant direction
        log::debug!("reflection detected, flipping singular vector {}", min_idx);
        let mut correction = Mat::<f64>::identity(d, d);
        correction.write(min_idx, min_idx, -1.0);
        let correction_ut = correction.as_ref() * u.transpose();
        rotation = v * correction_ut.as_ref();
    }

    // t = dst_mean - R * src_mean
    let rotated_centroid = rotation.as_ref() * src_centroid.as_ref();
    let translation = dst_centroid.as_ref() - rotated_centroid.as_ref();

    Ok((rotation, translation))
}

fn squared_norm<P: Point>(points: &[P]) -> f64 {
    points
        .iter()
        .flat_map(|p| p.coords().iter())
        .map(|x| x * x)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{DVec2, DVec3};
    use pointreg_lie::{se2::SE2, se3::SE3, so2::SO2, so3::SO3};

    fn create_random_points<const D: usize>(num_points: usize) -> Vec<[f64; D]> {
        (0..num_points)
            .map(|_| std::array::from_fn(|_| rand::random::<f64>()))
            .collect()
    }

    fn transform_all<T: RigidTransform>(t: &T, points: &[T::Point]) -> Vec<T::Point> {
        points.iter().map(|p| t.transform_point(p)).collect()
    }

    #[test]
    fn test_fit_transformation_identity() -> Result<(), IcpError> {
        let points = create_random_points::<3>(30);
        let t: SE3 = fit_transformation(&points, &points)?;
        assert_relative_eq!(t.r.angle(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(t.t.length(), 0.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_triangle_2d() -> Result<(), IcpError> {
        // rotate 90 degrees about the origin, then translate by (2, 3)
        let src = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let dst = vec![[2.0, 3.0], [2.0, 4.0], [1.0, 3.0]];
        let t: SE2 = fit_transformation(&src, &dst)?;
        assert_relative_eq!(t.r.log(), std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(t.t.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(t.t.y, 3.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_combined_3d() -> Result<(), IcpError> {
        // 90 degrees about z, then translate by (5, 3, 2)
        let src = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let dst = vec![
            [5.0, 3.0, 2.0],
            [5.0, 4.0, 2.0],
            [4.0, 3.0, 2.0],
            [5.0, 3.0, 3.0],
        ];
        let t: SE3 = fit_transformation(&src, &dst)?;
        let expected = SO3::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!((t.r.inverse() * expected).angle(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(t.t.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(t.t.y, 3.0, epsilon = 1e-9);
        assert_relative_eq!(t.t.z, 2.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_random_3d() -> Result<(), IcpError> {
        let points_src = create_random_points::<3>(30);
        for _ in 0..10 {
            let expected = SE3::from_random();
            let points_dst = transform_all(&expected, &points_src);

            let t: SE3 = fit_transformation(&points_src, &points_dst)?;
            let points_fit = transform_all(&t, &points_src);
            for (fit, dst) in points_fit.iter().zip(points_dst.iter()) {
                for (a, b) in fit.iter().zip(dst.iter()) {
                    assert_relative_eq!(a, b, epsilon = 1e-9);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_fit_transformation_random_2d() -> Result<(), IcpError> {
        let points_src = create_random_points::<2>(20);
        for _ in 0..10 {
            let expected = SE2::from_random();
            let points_dst = transform_all(&expected, &points_src);

            let t: SE2 = fit_transformation(&points_src, &points_dst)?;
            assert_relative_eq!(t.r.z.x, expected.r.z.x, epsilon = 1e-9);
            assert_relative_eq!(t.r.z.y, expected.r.z.y, epsilon = 1e-9);
            assert_relative_eq!(t.t.x, expected.t.x, epsilon = 1e-9);
            assert_relative_eq!(t.t.y, expected.t.y, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_fit_transformation_collinear_2d() -> Result<(), IcpError> {
        let src = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        let expected = SE2::new(SO2::exp(0.5), DVec2::new(-1.0, 0.25));
        let dst = transform_all(&expected, &src);
        let t: SE2 = fit_transformation(&src, &dst)?;
        assert_relative_eq!(t.r.log(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(t.t.x, -1.0, epsilon = 1e-9);
        assert_relative_eq!(t.t.y, 0.25, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_coplanar_3d() -> Result<(), IcpError> {
        // three points are always coplanar but still determine the rotation
        let src = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        let expected = SE3::from_axis_angle(DVec3::new(1.0, 1.0, 0.0), 0.8, DVec3::ONE);
        let dst = transform_all(&expected, &src);
        let t: SE3 = fit_transformation(&src, &dst)?;
        assert_relative_eq!((t.r.inverse() * expected.r).angle(), 0.0, epsilon = 1e-6);
        assert_relative_eq!((t.t - expected.t).length(), 0.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_rotation_is_proper_for_mirrored_points() -> Result<(), IcpError> {
        let src = create_random_points::<3>(20);
        let dst = src.iter().map(|p| [-p[0], p[1], p[2]]).collect::<Vec<_>>();
        let (rotation, _) = fit_rotation_translation(&src, &dst)?;
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_fit_transformation_single_point() {
        let res = fit_transformation::<SE3>(&[[1.0, 2.0, 3.0]], &[[4.0, 5.0, 6.0]]);
        assert_eq!(
            res.unwrap_err(),
            IcpError::NotEnoughPoints {
                required: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn test_fit_transformation_mismatched() {
        let res = fit_transformation::<SE2>(&[[0.0, 0.0], [1.0, 0.0]], &[[0.0, 0.0]]);
        assert!(matches!(res, Err(IcpError::MismatchedLengths { .. })));
    }

    #[test]
    fn test_fit_transformation_collinear_3d() {
        let src = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]];
        let dst = src
            .iter()
            .map(|p| [p[0] + 1.0, p[1], p[2]])
            .collect::<Vec<_>>();
        let res = fit_transformation::<SE3>(&src, &dst);
        assert!(matches!(res, Err(IcpError::DegenerateGeometry { .. })));
    }

    #[test]
    fn test_fit_transformation_coincident_destination() {
        let src = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let dst = vec![[1.0, 3.0]; 3];
        let res = fit_transformation::<SE2>(&src, &dst);
        assert!(matches!(res, Err(IcpError::DegenerateGeometry { .. })));
    }

    #[test]
    fn test_fit_transformation_not_finite() {
        let src = vec![[0.0, 0.0], [1.0, f64::NAN], [0.0, 1.0]];
        let dst = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let res = fit_transformation::<SE2>(&src, &dst);
        assert!(matches!(res, Err(IcpError::Numerical(_))));
    }
}
