/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pan/zoom state of the view and its framing animation.

use std::time::Duration;

use euclid::default::{Box2D, Point2D, Size2D, Vector2D};

use crate::config::CameraSettings;

/// Camera mapping graph space to screen space.
///
/// `center` is the graph-space point shown at the middle of the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub center: Point2D<f32>,
    pub zoom: f32,
    /// Viewport size in screen pixels.
    pub viewport: Size2D<f32>,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Graph-space margin kept around fitted bounds.
    pub fit_padding: f32,
    animation: Option<CameraAnimation>,
}

#[derive(Debug, Clone, PartialEq)]
struct CameraAnimation {
    from_center: Point2D<f32>,
    from_zoom: f32,
    to_center: Point2D<f32>,
    to_zoom: f32,
    duration: Duration,
    elapsed: Duration,
}

impl Camera {
    pub fn new() -> Self {
        Self::from_settings(&CameraSettings::default())
    }

    pub fn from_settings(settings: &CameraSettings) -> Self {
        Self {
            center: Point2D::origin(),
            zoom: 1.0,
            viewport: Size2D::new(800.0, 600.0),
            zoom_min: settings.min_zoom,
            zoom_max: settings.max_zoom,
            fit_padding: settings.fit_padding,
            animation: None,
        }
    }

    /// Clamp a zoom value to the allowed range. An inverted range resolves
    /// to `zoom_min`; a NaN zoom keeps the current zoom.
    pub fn clamp(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            return self.zoom;
        }
        zoom.min(self.zoom_max).max(self.zoom_min)
    }

    pub fn set_viewport(&mut self, viewport: Size2D<f32>) {
        self.viewport = viewport;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.animation = None;
        self.zoom = self.clamp(zoom);
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, delta: Vector2D<f32>) {
        self.animation = None;
        self.center -= delta / self.zoom;
    }

    fn screen_center(&self) -> Point2D<f32> {
        Point2D::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    pub fn world_to_screen(&self, world: Point2D<f32>) -> Point2D<f32> {
        self.screen_center() + (world - self.center) * self.zoom
    }

    pub fn screen_to_world(&self, screen: Point2D<f32>) -> Point2D<f32> {
        self.center + (screen - self.screen_center()) / self.zoom
    }

    /// Center and zoom that frame `bounds` plus padding.
    pub fn fit_target(&self, bounds: Box2D<f32>) -> (Point2D<f32>, f32) {
        let padded = bounds.size() + Size2D::new(self.fit_padding * 2.0, self.fit_padding * 2.0);
        let width = padded.width.max(1.0);
        let height = padded.height.max(1.0);
        let zoom = (self.viewport.width / width).min(self.viewport.height / height);
        (bounds.center(), self.clamp(zoom))
    }

    /// Frame `bounds` immediately.
    pub fn fit(&mut self, bounds: Box2D<f32>) {
        let (center, zoom) = self.fit_target(bounds);
        self.animation = None;
        self.center = center;
        self.zoom = zoom;
    }

    /// Frame `bounds` over `duration`, eased. A zero duration snaps.
    pub fn animate_fit(&mut self, bounds: Box2D<f32>, duration: Duration) {
        if duration.is_zero() {
            self.fit(bounds);
            return;
        }
        let (to_center, to_zoom) = self.fit_target(bounds);
        self.animation = Some(CameraAnimation {
            from_center: self.center,
            from_zoom: self.zoom,
            to_center,
            to_zoom,
            duration,
            elapsed: Duration::ZERO,
        });
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Advance the framing animation. Returns whether the camera moved.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        animation.elapsed = (animation.elapsed + dt).min(animation.duration);
        let t = animation.elapsed.as_secs_f32() / animation.duration.as_secs_f32();
        if animation.elapsed >= animation.duration {
            self.center = animation.to_center;
            self.zoom = animation.to_zoom;
            self.animation = None;
            return true;
        }
        let eased = t * t * (3.0 - 2.0 * t);
        self.center = animation.from_center.lerp(animation.to_center, eased);
        self.zoom = animation.from_zoom + (animation.to_zoom - animation.from_zoom) * eased;
        true
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
