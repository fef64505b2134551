//! Map projections between (latitude, longitude) and raster pixels.
//!
//! Latitudes and longitudes are radians. Pixel rows run north to south and
//! columns run west to east starting at `central_meridian - π`.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectionKind {
    #[default]
    Equirectangular,
    CylindricalEqualArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionModel {
    pub kind: ProjectionKind,
    pub central_meridian: f64,
    /// Parallel of no distortion for the equal-area projection.
    /// Ignored by equirectangular.
    pub standard_parallel: f64,
}

impl Default for ProjectionModel {
    fn default() -> Self {
        Self::equirectangular()
    }
}

impl ProjectionModel {
    pub fn equirectangular() -> Self {
        Self {
            kind: ProjectionKind::Equirectangular,
            central_meridian: 0.0,
            standard_parallel: 0.0,
        }
    }

    /// Lambert (φ₀ = 0), Behrmann (φ₀ = 30°) and Gall–Peters (φ₀ = 45°) are
    /// all this projection with different standard parallels.
    pub fn cylindrical_equal_area(standard_parallel: f64) -> Self {
        Self {
            kind: ProjectionKind::CylindricalEqualArea,
            central_meridian: 0.0,
            standard_parallel,
        }
    }

    pub fn from_kind(kind: ProjectionKind) -> Self {
        match kind {
            ProjectionKind::Equirectangular => Self::equirectangular(),
            ProjectionKind::CylindricalEqualArea => Self::cylindrical_equal_area(0.0),
        }
    }

    pub fn with_central_meridian(mut self, central_meridian: f64) -> Self {
        self.central_meridian = central_meridian;
        self
    }

    /// `(width, height)` of a raster with `resolution` rows.
    pub fn dimensions(&self, resolution: usize) -> (usize, usize) {
        let height = resolution.max(1);
        let width = match self.kind {
            ProjectionKind::Equirectangular => height * 2,
            ProjectionKind::CylindricalEqualArea => {
                let cos_sp = self.standard_parallel.cos();
                ((height as f64 * PI * cos_sp * cos_sp).round() as usize).max(1)
            }
        };
        (width, height)
    }

    /// Fractional row position of a latitude, 0 at the north edge.
    fn lat_to_y(&self, lat: f64, height: usize) -> f64 {
        let h = height as f64;
        match self.kind {
            ProjectionKind::Equirectangular => (FRAC_PI_2 - lat) / PI * h,
            ProjectionKind::CylindricalEqualArea => (1.0 - lat.sin()) / 2.0 * h,
        }
    }

    fn y_to_lat(&self, y: f64, height: usize) -> f64 {
        let h = height as f64;
        match self.kind {
            ProjectionKind::Equirectangular => FRAC_PI_2 - y / h * PI,
            ProjectionKind::CylindricalEqualArea => (1.0 - 2.0 * y / h).clamp(-1.0, 1.0).asin(),
        }
    }

    /// Pixel containing `(lat, lon)`, clamped to the raster.
    pub fn lat_lon_to_pixel(&self, lat: f64, lon: f64, resolution: usize) -> (usize, usize) {
        let (width, height) = self.dimensions(resolution);
        let rel = (wrap_lon(lon - self.central_meridian) + PI) / TAU;
        let x = (rel * width as f64).floor() as isize;
        let y = self.lat_to_y(lat.clamp(-FRAC_PI_2, FRAC_PI_2), height).floor() as isize;
        (
            x.clamp(0, width as isize - 1) as usize,
            y.clamp(0, height as isize - 1) as usize,
        )
    }

    /// Latitude and longitude at the centre of pixel `(x, y)`.
    pub fn pixel_to_lat_lon(&self, x: usize, y: usize, resolution: usize) -> (f64, f64) {
        let (width, height) = self.dimensions(resolution);
        let lat = self.row_latitude(y, height);
        let fx = (x as f64 + 0.5) / width as f64;
        let lon = wrap_lon(self.central_meridian - PI + fx * TAU);
        (lat, lon)
    }

    /// Latitude at the centre of row `y` in a raster `height` rows tall.
    pub fn row_latitude(&self, y: usize, height: usize) -> f64 {
        self.y_to_lat(y as f64 + 0.5, height)
    }

    /// Latitude and longitude extent of one pixel in row `y`.
    pub fn pixel_angular_span(&self, y: usize, resolution: usize) -> (f64, f64) {
        let (width, height) = self.dimensions(resolution);
        let north = self.y_to_lat(y as f64, height);
        let south = self.y_to_lat(y as f64 + 1.0, height);
        ((north - south).abs(), TAU / width as f64)
    }
}

/// Wrap a longitude into `[-π, π)`.
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + PI).rem_euclid(TAU) - PI
}

/// Unit vector for a latitude/longitude; `lon = 0` points at +Z and the north pole at +Y.
pub fn lat_lon_to_dir(lat: f64, lon: f64) -> DVec3 {
    let (slon, clon) = lon.sin_cos();
    let (slat, clat) = lat.sin_cos();
    DVec3::new(clat * slon, slat, clat * clon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use more_asserts::assert_le;

    #[test]
    fn test_equirectangular_is_twice_as_wide() {
        assert_eq!(ProjectionModel::equirectangular().dimensions(90), (180, 90));
    }

    #[test]
    fn test_equal_area_width() {
        let lambert = ProjectionModel::cylindrical_equal_area(0.0);
        assert_eq!(lambert.dimensions(100), (314, 100));
        let gall_peters = ProjectionModel::cylindrical_equal_area(45f64.to_radians());
        assert_eq!(gall_peters.dimensions(100), (157, 100));
    }

    #[test]
    fn test_corners() {
        let p = ProjectionModel::equirectangular();
        assert_eq!(p.lat_lon_to_pixel(FRAC_PI_2, -PI, 10), (0, 0));
        assert_eq!(p.lat_lon_to_pixel(-FRAC_PI_2, PI - 1e-9, 10), (19, 9));
    }

    #[test]
    fn test_round_trip_within_pixel_span() {
        for projection in [
            ProjectionModel::equirectangular(),
            ProjectionModel::cylindrical_equal_area(30f64.to_radians()),
            ProjectionModel::equirectangular().with_central_meridian(1.0),
        ] {
            let resolution = 64;
            for i in 0..50 {
                let lat = -1.5 + 3.0 * (i as f64) / 49.0;
                let lon = -3.1 + 6.2 * ((i * 7 % 50) as f64) / 49.0;
                let (x, y) = projection.lat_lon_to_pixel(lat, lon, resolution);
                let (lat2, lon2) = projection.pixel_to_lat_lon(x, y, resolution);
                let (lat_span, lon_span) = projection.pixel_angular_span(y, resolution);
                assert_le!((lat - lat2).abs(), lat_span);
                assert_le!(wrap_lon(lon - lon2).abs(), lon_span);
            }
        }
    }

    #[test]
    fn test_wrap_lon() {
        assert_abs_diff_eq!(wrap_lon(PI + 0.5), -PI + 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_lon(-PI - 0.5), PI - 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_lon(0.25), 0.25);
    }

    #[test]
    fn test_dir_is_unit() {
        let d = lat_lon_to_dir(0.3, -2.0);
        assert_abs_diff_eq!(d.length(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lat_lon_to_dir(FRAC_PI_2, 0.0).y, 1.0, epsilon = 1e-12);
    }
}
