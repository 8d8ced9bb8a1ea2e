pub use glam::*;

/// Largest axis scale of a 2D affine transform, used to pick tessellation
/// quality for transformed shapes.
pub fn max_scaling(transform: &Affine2) -> f32 {
    (transform.matrix2.x_axis + transform.matrix2.y_axis).length() / std::f32::consts::SQRT_2
}

/// Pixel-space to clip-space mapping for a target of the given size.
///
/// `(0, 0)` maps to the top-left corner `(-1, 1)`, `(width, height)` to
/// `(1, -1)`.
pub fn screen_transform(size: Vec2) -> Affine2 {
    Affine2::from_cols(
        Vec2::new(2.0 / size.x, 0.0),
        Vec2::new(0.0, -2.0 / size.y),
        Vec2::new(-1.0, 1.0),
    )
}
