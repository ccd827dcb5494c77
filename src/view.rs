//! Map view and per-frame transform state.
//!
//! The view uses an equirectangular projection with a cosine latitude
//! correction around the view center. The same projection is exposed twice:
//! as screen-space helpers for the egui label overlay, and as a clip-space
//! matrix for the GPU models.

use eframe::egui::{Pos2, Rect, Vec2};
use geo_types::Coord;
use glam::{Mat4, Vec3, Vec4};

/// Map view for converting geographic coordinates to screen and clip space.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// Center latitude of the view
    pub center_lat: f64,
    /// Center longitude of the view
    pub center_lon: f64,
    /// Half of the visible latitude span at zoom 1, in degrees
    pub range_deg: f64,
    /// Current zoom level
    pub zoom: f32,
    /// Pan offset in screen points
    pub pan_offset: Vec2,
    /// Screen rectangle of the map canvas
    pub screen_rect: Rect,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            // Roughly centered on China, the bundled demo data
            center_lat: 35.0,
            center_lon: 105.0,
            range_deg: 25.0,
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            screen_rect: Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        }
    }
}

/// Transform state handed to models on every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Maps `[lon, lat, z, 1]` to clip space
    pub view_projection: Mat4,
    /// Clip-space units per screen point, per axis
    pub pixel_scale: [f32; 2],
    /// Geographic degrees per screen point
    pub units_per_pixel: f32,
    /// Screen points per degree of longitude and of latitude
    pub pixels_per_degree: [f32; 2],
    /// Canvas size in points
    pub viewport: [f32; 2],
    /// Zoom level of the view
    pub zoom: f32,
}

impl Default for FrameContext {
    fn default() -> Self {
        MapView::default().frame()
    }
}

impl MapView {
    /// Creates a view centered on the given location.
    pub fn new(center_lat: f64, center_lon: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            ..Default::default()
        }
    }

    /// Updates the view with current interaction state.
    pub fn update(&mut self, zoom: f32, pan_offset: Vec2, screen_rect: Rect) {
        self.zoom = zoom;
        self.pan_offset = pan_offset;
        self.screen_rect = screen_rect;
    }

    fn effective_range(&self) -> f64 {
        self.range_deg / self.zoom.max(f32::EPSILON) as f64
    }

    fn lat_correction(&self) -> f64 {
        self.center_lat.to_radians().cos()
    }

    fn half_size(&self) -> f32 {
        (self.screen_rect.size().min_elem() / 2.0).max(1.0)
    }

    /// Converts geographic coordinates (lon, lat) to a screen position.
    pub fn geo_to_screen(&self, coord: Coord<f64>) -> Pos2 {
        let effective_range = self.effective_range();

        let norm_x = (coord.x - self.center_lon) * self.lat_correction() / effective_range;
        // Screen y grows downward
        let norm_y = -(coord.y - self.center_lat) / effective_range;

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.half_size();

        Pos2::new(
            center.x + (norm_x as f32) * half_size,
            center.y + (norm_y as f32) * half_size,
        )
    }

    /// Converts a screen position to geographic coordinates (lon, lat).
    pub fn screen_to_geo(&self, pos: Pos2) -> Coord<f64> {
        let effective_range = self.effective_range();

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.half_size();

        let norm_x = (pos.x - center.x) / half_size;
        let norm_y = (pos.y - center.y) / half_size;

        Coord {
            x: self.center_lon + (norm_x as f64) * effective_range / self.lat_correction(),
            y: self.center_lat - (norm_y as f64) * effective_range,
        }
    }

    /// Returns the visible geographic bounds as (min_lon, min_lat, max_lon, max_lat).
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let top_left = self.screen_to_geo(self.screen_rect.left_top());
        let bottom_right = self.screen_to_geo(self.screen_rect.right_bottom());

        (
            top_left.x.min(bottom_right.x),
            top_left.y.min(bottom_right.y),
            top_left.x.max(bottom_right.x),
            top_left.y.max(bottom_right.y),
        )
    }

    /// Checks if a coordinate is within the visible bounds (with margin).
    pub fn is_visible(&self, coord: Coord<f64>, margin_deg: f64) -> bool {
        let (min_lon, min_lat, max_lon, max_lat) = self.visible_bounds();
        coord.x >= min_lon - margin_deg
            && coord.x <= max_lon + margin_deg
            && coord.y >= min_lat - margin_deg
            && coord.y <= max_lat + margin_deg
    }

    /// Clip-space matrix for geometry in lon/lat degrees.
    ///
    /// Matches `geo_to_screen` when the GL viewport covers `screen_rect`.
    pub fn view_projection(&self) -> Mat4 {
        let effective_range = self.effective_range();
        let half_w = (self.screen_rect.width() / 2.0).max(1.0) as f64;
        let half_h = (self.screen_rect.height() / 2.0).max(1.0) as f64;
        let half_size = self.half_size() as f64;

        let scale_x = self.lat_correction() / effective_range * half_size / half_w;
        let scale_y = 1.0 / effective_range * half_size / half_h;
        let translate_x = -self.center_lon * scale_x + self.pan_offset.x as f64 / half_w;
        let translate_y = -self.center_lat * scale_y - self.pan_offset.y as f64 / half_h;

        Mat4::from_translation(Vec3::new(translate_x as f32, translate_y as f32, 0.0))
            * Mat4::from_scale(Vec3::new(scale_x as f32, scale_y as f32, 1.0 / 1000.0))
    }

    /// Screen points per degree along x (longitude) and y (latitude).
    ///
    /// The x scale carries the latitude correction, so the two differ away
    /// from the equator.
    pub fn pixels_per_degree(&self) -> [f32; 2] {
        let per_degree = self.half_size() as f64 / self.effective_range();
        [(per_degree * self.lat_correction()) as f32, per_degree as f32]
    }

    /// Builds the per-frame transform state.
    pub fn frame(&self) -> FrameContext {
        let size = self.screen_rect.size();
        FrameContext {
            view_projection: self.view_projection(),
            pixel_scale: [2.0 / size.x.max(1.0), 2.0 / size.y.max(1.0)],
            units_per_pixel: (self.effective_range() / self.half_size() as f64) as f32,
            pixels_per_degree: self.pixels_per_degree(),
            viewport: [size.x, size.y],
            zoom: self.zoom,
        }
    }

    /// Projects a coordinate through the clip-space matrix back to a screen position.
    pub fn clip_to_screen(&self, coord: Coord<f64>) -> Pos2 {
        let clip = self.view_projection() * Vec4::new(coord.x as f32, coord.y as f32, 0.0, 1.0);
        let rect = self.screen_rect;
        Pos2::new(
            rect.center().x + clip.x * rect.width() / 2.0,
            rect.center().y - clip.y * rect.height() / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> MapView {
        let mut view = MapView::new(30.0, 110.0);
        view.update(
            2.0,
            Vec2::new(15.0, -10.0),
            Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(640.0, 480.0)),
        );
        view
    }

    #[test]
    fn test_center_maps_to_canvas_center() {
        let view = MapView::new(30.0, 110.0);
        let pos = view.geo_to_screen(Coord { x: 110.0, y: 30.0 });
        assert_eq!(pos, view.screen_rect.center());
    }

    #[test]
    fn test_screen_round_trip() {
        let view = view();
        let geo = Coord { x: 112.5, y: 27.25 };
        let back = view.screen_to_geo(view.geo_to_screen(geo));
        assert!((back.x - geo.x).abs() < 1e-4);
        assert!((back.y - geo.y).abs() < 1e-4);
    }

    #[test]
    fn test_matrix_matches_screen_projection() {
        let view = view();
        for geo in [
            Coord { x: 110.0, y: 30.0 },
            Coord { x: 104.0, y: 36.5 },
            Coord { x: 118.25, y: 22.0 },
        ] {
            let a = view.geo_to_screen(geo);
            let b = view.clip_to_screen(geo);
            assert!((a.x - b.x).abs() < 0.05, "{:?} vs {:?}", a, b);
            assert!((a.y - b.y).abs() < 0.05, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_frame_pixel_scale() {
        let frame = view().frame();
        assert_eq!(frame.viewport, [640.0, 480.0]);
        assert_eq!(frame.pixel_scale, [2.0 / 640.0, 2.0 / 480.0]);
        // 25 degrees / zoom 2 spread over 240 points
        assert!((frame.units_per_pixel - 12.5 / 240.0).abs() < 1e-6);
        assert_eq!(frame.zoom, 2.0);
    }

    #[test]
    fn test_pixels_per_degree_matches_screen_projection() {
        let view = view();
        let [ppd_x, ppd_y] = view.pixels_per_degree();

        let origin = view.geo_to_screen(Coord { x: 110.0, y: 30.0 });
        let east = view.geo_to_screen(Coord { x: 111.0, y: 30.0 });
        let north = view.geo_to_screen(Coord { x: 110.0, y: 31.0 });
        assert!((east.x - origin.x - ppd_x).abs() < 1e-3);
        assert!((origin.y - north.y - ppd_y).abs() < 1e-3);

        // A degree of longitude is shorter than one of latitude at 30N
        assert!((ppd_x / ppd_y - 30f32.to_radians().cos()).abs() < 1e-5);
    }
}
