use eframe::egui;

/// Stage transform: screen = origin + position + world * scale.
///
/// `base_scale` is the scale at which fit-to-screen last ran; it anchors the
/// "100%" readout and the zoom clamp range.
#[derive(Clone, Copy, Debug)]
pub(super) struct Viewport {
    pub scale: f32,
    pub base_scale: f32,
    pub position: egui::Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            base_scale: 1.0,
            position: egui::Vec2::ZERO,
        }
    }
}

const ZOOM_STEP_FACTOR: f32 = 1.1;
const MIN_ZOOM_RATIO: f32 = 0.1;
const MAX_ZOOM_RATIO: f32 = 30.0;
const FIT_PADDING: f32 = 0.9;

impl Viewport {
    pub fn world_to_screen(&self, origin: egui::Pos2, world: egui::Pos2) -> egui::Pos2 {
        origin + self.position + world.to_vec2() * self.scale
    }

    pub fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.position) / self.scale).to_pos2()
    }

    /// Fit the floor extent into the viewport with 10% padding and center it.
    /// Zero-sized extents or viewports leave the transform untouched.
    pub fn fit_to_screen(&mut self, viewport: egui::Vec2, extent: egui::Vec2) {
        if viewport.x <= 0.0 || viewport.y <= 0.0 || extent.x <= 0.0 || extent.y <= 0.0 {
            return;
        }
        let fit = (viewport.x / extent.x).min(viewport.y / extent.y) * FIT_PADDING;
        self.base_scale = fit;
        self.scale = fit;
        self.position = egui::vec2(
            (viewport.x - extent.x * fit) / 2.0,
            (viewport.y - extent.y * fit) / 2.0,
        );
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(
            self.base_scale * MIN_ZOOM_RATIO,
            self.base_scale * MAX_ZOOM_RATIO,
        )
    }

    /// Multiplicative zoom keeping the world point under the pointer fixed on
    /// screen. `delta_y < 0` zooms in (wheel-up).
    pub fn wheel_zoom(&mut self, origin: egui::Pos2, pointer: egui::Pos2, delta_y: f32) {
        let old_scale = self.scale;
        let target = if delta_y < 0.0 {
            old_scale * ZOOM_STEP_FACTOR
        } else {
            old_scale / ZOOM_STEP_FACTOR
        };
        let new_scale = self.clamp_scale(target);
        let before = self.screen_to_world(origin, pointer);
        self.scale = new_scale;
        let after = self.world_to_screen(origin, before);
        self.position += pointer - after;
    }

    /// Linear zoom step (10% of base scale per step) anchored at the viewport
    /// center.
    pub fn step_zoom(&mut self, viewport: egui::Vec2, direction: f32) {
        let old_scale = self.scale;
        let new_scale = self.clamp_scale(old_scale + self.base_scale * 0.1 * direction);
        let center = (viewport * 0.5).to_pos2();
        let before = self.screen_to_world(egui::Pos2::ZERO, center);
        self.scale = new_scale;
        let after = self.world_to_screen(egui::Pos2::ZERO, before);
        self.position += center - after;
    }

    /// Recenter the viewport on a world point without changing the scale
    /// (minimap navigation).
    pub fn navigate_to(&mut self, world: egui::Pos2, viewport: egui::Vec2) {
        self.position = egui::vec2(
            -(world.x * self.scale) + viewport.x / 2.0,
            -(world.y * self.scale) + viewport.y / 2.0,
        );
    }

    pub fn zoom_percent(&self) -> f32 {
        if self.base_scale <= 0.0 {
            100.0
        } else {
            self.scale / self.base_scale * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn fit_to_screen_scales_and_centers() {
        let mut vp = Viewport::default();
        vp.fit_to_screen(egui::vec2(1000.0, 800.0), egui::vec2(30_000.0, 20_000.0));
        // min(1000/30000, 800/20000) * 0.9
        assert!(close(vp.base_scale, 0.03));
        assert!(close(vp.scale, 0.03));
        // scaled extent is 900 x 600, centered in 1000 x 800
        assert!(close(vp.position.x, 50.0));
        assert!(close(vp.position.y, 100.0));
    }

    #[test]
    fn fit_to_screen_ignores_degenerate_input() {
        let mut vp = Viewport::default();
        vp.fit_to_screen(egui::vec2(0.0, 800.0), egui::vec2(100.0, 100.0));
        vp.fit_to_screen(egui::vec2(1000.0, 800.0), egui::vec2(0.0, 100.0));
        assert_eq!(vp.scale, 1.0);
        assert_eq!(vp.position, egui::Vec2::ZERO);
    }

    #[test]
    fn round_trip_between_spaces() {
        let vp = Viewport {
            scale: 0.5,
            base_scale: 0.5,
            position: egui::vec2(40.0, -12.0),
        };
        let origin = egui::pos2(100.0, 50.0);
        let world = egui::pos2(1234.0, 567.0);
        let back = vp.screen_to_world(origin, vp.world_to_screen(origin, world));
        assert!(close(back.x, world.x));
        assert!(close(back.y, world.y));
    }

    #[test]
    fn wheel_zoom_keeps_the_pointer_world_point_fixed() {
        let mut vp = Viewport::default();
        vp.fit_to_screen(egui::vec2(1000.0, 800.0), egui::vec2(30_000.0, 20_000.0));
        let origin = egui::pos2(10.0, 20.0);
        let pointer = egui::pos2(400.0, 300.0);
        let anchor = vp.screen_to_world(origin, pointer);
        let base = vp.base_scale;
        vp.wheel_zoom(origin, pointer, -1.0);
        assert!(close(vp.scale, base * 1.1));
        let after = vp.world_to_screen(origin, anchor);
        assert!(close(after.x, pointer.x));
        assert!(close(after.y, pointer.y));
    }

    #[test]
    fn zoom_clamps_to_the_base_scale_range() {
        let mut vp = Viewport::default();
        vp.fit_to_screen(egui::vec2(1000.0, 800.0), egui::vec2(30_000.0, 20_000.0));
        let origin = egui::Pos2::ZERO;
        for _ in 0..200 {
            vp.wheel_zoom(origin, egui::pos2(500.0, 400.0), 1.0);
        }
        assert!(close(vp.scale, vp.base_scale * 0.1));
        for _ in 0..200 {
            vp.wheel_zoom(origin, egui::pos2(500.0, 400.0), -1.0);
        }
        assert!(close(vp.scale, vp.base_scale * 30.0));
    }

    #[test]
    fn step_zoom_is_linear_in_base_scale() {
        let mut vp = Viewport::default();
        vp.fit_to_screen(egui::vec2(1000.0, 800.0), egui::vec2(30_000.0, 20_000.0));
        let base = vp.base_scale;
        vp.step_zoom(egui::vec2(1000.0, 800.0), 1.0);
        assert!(close(vp.scale, base + base * 0.1));
        vp.step_zoom(egui::vec2(1000.0, 800.0), -1.0);
        assert!(close(vp.scale, base));
    }

    #[test]
    fn navigate_centers_the_world_point() {
        let mut vp = Viewport {
            scale: 0.05,
            base_scale: 0.05,
            position: egui::Vec2::ZERO,
        };
        let dims = egui::vec2(1000.0, 800.0);
        vp.navigate_to(egui::pos2(15_000.0, 10_000.0), dims);
        // The target world point should sit at the viewport center.
        let screen = vp.world_to_screen(egui::Pos2::ZERO, egui::pos2(15_000.0, 10_000.0));
        assert!(close(screen.x, 500.0));
        assert!(close(screen.y, 400.0));
    }
}
