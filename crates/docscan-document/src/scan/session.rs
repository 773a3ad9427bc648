// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification session. Holds the state behind one scanner screen: the decoded
// photo, the corner selection, the viewport layout, and the current result.
//
// Every corner edit and every retry bumps the session generation; background
// results carrying an older generation are dropped on arrival.

use std::sync::Arc;

use docscan_core::error::{Result, ScanError};
use docscan_core::{
    Corner, ImageSize, Point, Quad, ScannedFile, ScannerConfig, SessionId, Viewport,
};
use image::RgbaImage;
use tracing::{debug, info, instrument, warn};

use crate::geometry::mapper::CoordinateMapper;
use crate::image::processor::ImageProcessor;
use crate::scan::rectify::{RectifiedImage, Rectifier};
use crate::scan::worker::{RectifyJob, RectifyOutcome, RectifyRequest};

/// A corner drag reported by the UI, in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEvent {
    pub corner_index: usize,
    pub display_x: f64,
    pub display_y: f64,
}

/// Owned state for one photo being rectified.
pub struct RectificationSession {
    id: SessionId,
    source: Arc<RgbaImage>,
    size: ImageSize,
    quad: Quad,
    mapper: Option<CoordinateMapper>,
    active: Option<Corner>,
    generation: u64,
    result: Option<RectifiedImage>,
    /// Whether `result` has been rotated since it was produced.
    rotated: bool,
    config: ScannerConfig,
    rectifier: Rectifier,
}

impl RectificationSession {
    // -- Construction ---------------------------------------------------------

    /// Decode a captured photo and start a session on it.
    #[instrument(skip(data, config), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8], config: ScannerConfig) -> Result<Self> {
        let image = ImageProcessor::from_bytes(data)?.into_rgba8();
        Self::from_image(image, config)
    }

    /// Start a session on already-decoded pixels.
    ///
    /// The selection starts as a rectangle inset by `config.default_inset`.
    pub fn from_image(image: RgbaImage, config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        let size = ImageSize::new(image.width(), image.height());
        if size.is_empty() {
            return Err(ScanError::EmptyImage);
        }
        let quad = Quad::inset(size, config.default_inset);
        let session = Self {
            id: SessionId::new(),
            source: Arc::new(image),
            size,
            quad,
            mapper: None,
            active: None,
            generation: 0,
            result: None,
            rotated: false,
            rectifier: Rectifier::new(&config),
            config,
        };
        info!(session = %session.id, size = %size, "Rectification session started");
        Ok(session)
    }

    // -- Accessors ------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn image_size(&self) -> ImageSize {
        self.size
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_corner(&self) -> Option<Corner> {
        self.active
    }

    pub fn mapper(&self) -> Option<&CoordinateMapper> {
        self.mapper.as_ref()
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn rectifier(&self) -> Rectifier {
        self.rectifier
    }

    /// The rectified image currently shown, if any.
    pub fn result(&self) -> Option<&RectifiedImage> {
        self.result.as_ref()
    }

    // -- Layout ---------------------------------------------------------------

    /// Record the viewport the photo is drawn into. Call on every resize.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.mapper = Some(CoordinateMapper::new(self.size, viewport)?);
        debug!(width = viewport.width, height = viewport.height, "Viewport updated");
        Ok(())
    }

    fn require_mapper(&self) -> Result<&CoordinateMapper> {
        self.mapper.as_ref().ok_or(ScanError::ViewportUnavailable {
            width: 0.0,
            height: 0.0,
        })
    }

    /// Display-space positions of the four handles, TL, TR, BR, BL.
    pub fn handles(&self) -> Result<[Point; 4]> {
        Ok(self.require_mapper()?.handles(&self.quad))
    }

    // -- Corner editing -------------------------------------------------------

    /// Start a drag if the pointer lands on a handle.
    ///
    /// Editing is locked while a result is shown; call [`Self::retry`] first.
    pub fn pointer_down(&mut self, pos: Point) -> Result<Option<Corner>> {
        if self.result.is_some() {
            return Ok(None);
        }
        let hit = self
            .require_mapper()?
            .hit_test(pos, &self.quad, self.config.hit_radius);
        self.active = hit;
        debug!(?hit, x = pos.x, y = pos.y, "Pointer down");
        Ok(hit)
    }

    /// Move the active corner to the pointer. Returns whether a corner moved.
    pub fn pointer_move(&mut self, pos: Point) -> Result<bool> {
        let Some(corner) = self.active else {
            return Ok(false);
        };
        let image_point = self.require_mapper()?.to_image_space(pos);
        Ok(self.set_corner(corner, image_point))
    }

    /// End the current drag.
    pub fn pointer_up(&mut self) {
        self.active = None;
    }

    /// Apply one event of the UI's drag stream.
    pub fn apply_drag(&mut self, event: DragEvent) -> Result<bool> {
        let corner = Corner::from_index(event.corner_index)?;
        let image_point = self
            .require_mapper()?
            .to_image_space(Point::new(event.display_x, event.display_y));
        Ok(self.set_corner(corner, image_point))
    }

    /// Move one corner to an image-space point (clamped into the photo).
    ///
    /// Returns false, leaving the selection alone, while a result is shown.
    pub fn set_corner(&mut self, corner: Corner, image_point: Point) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.quad.set_corner(corner, image_point, self.size);
        self.generation += 1;
        true
    }

    /// Replace the whole selection (clamped into the photo).
    pub fn set_quad(&mut self, quad: Quad) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.quad = quad.clamped(self.size);
        self.generation += 1;
        true
    }

    /// Put the corners back at their default inset.
    pub fn reset_corners(&mut self) -> bool {
        self.set_quad(Quad::inset(self.size, self.config.default_inset))
    }

    // -- Rectification --------------------------------------------------------

    /// Snapshot of what a resample needs right now.
    pub fn request(&self) -> RectifyRequest {
        RectifyRequest {
            session: self.id,
            generation: self.generation,
            source: Arc::clone(&self.source),
            quad: self.quad,
        }
    }

    /// Start a background resample of the current selection.
    pub fn spawn_rectify(&self) -> RectifyJob {
        RectifyJob::spawn(self.request(), self.rectifier)
    }

    /// Resample on the current thread and keep the result.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn rectify(&mut self) -> Result<&RectifiedImage> {
        let image = self.request().run(&self.rectifier)?;
        self.rotated = false;
        Ok(self.result.insert(image))
    }

    /// Take a background outcome.
    ///
    /// Returns `Ok(true)` when the outcome answers the current selection and
    /// was stored, `Ok(false)` when it is stale and was dropped. Errors are
    /// only surfaced for current outcomes.
    pub fn accept(&mut self, outcome: RectifyOutcome) -> Result<bool> {
        if outcome.session != self.id || outcome.generation != self.generation {
            debug!(
                outcome_generation = outcome.generation,
                current_generation = self.generation,
                "Discarding stale rectification"
            );
            return Ok(false);
        }
        if self.result.is_some() {
            warn!("Rectification arrived while a result is shown; keeping the shown one");
            return Ok(false);
        }
        let image = outcome.result?;
        self.result = Some(image);
        self.rotated = false;
        Ok(true)
    }

    /// Discard the shown result and unlock corner editing.
    ///
    /// Any resample still in flight becomes stale.
    pub fn retry(&mut self) {
        self.result = None;
        self.rotated = false;
        self.generation += 1;
        debug!(generation = self.generation, "Result discarded");
    }

    /// Rotate the shown result a quarter turn clockwise.
    pub fn rotate_result(&mut self) -> Option<&RectifiedImage> {
        let rotated = self.result.as_ref()?.rotate90();
        self.rotated = true;
        Some(self.result.insert(rotated))
    }

    /// Encode the shown result as the file handed back to the capture flow.
    ///
    /// Returns `Ok(None)` when there is nothing to confirm yet.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn confirm(&self) -> Result<Option<ScannedFile>> {
        let Some(image) = self.result.as_ref() else {
            return Ok(None);
        };
        let file = if self.rotated {
            self.rectifier.encode_rotated(image)?
        } else {
            self.rectifier.encode(image)?
        };
        info!(name = %file.name, bytes = file.len(), size = %file.size, "Scan confirmed");
        Ok(Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::DocumentType;
    use image::Rgba;

    fn session(width: u32, height: u32) -> RectificationSession {
        let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        RectificationSession::from_image(image, ScannerConfig::default()).unwrap()
    }

    #[test]
    fn new_session_has_inset_corners() {
        let s = session(200, 100);
        assert_eq!(*s.quad(), Quad::inset(ImageSize::new(200, 100), 0.1));
        assert!(s.result().is_none());
        assert_eq!(s.generation(), 0);
    }

    #[test]
    fn undecodable_bytes_fail() {
        let err = RectificationSession::from_bytes(b"nope", ScannerConfig::default())
            .err()
            .expect("should fail");
        assert!(matches!(err, ScanError::ImageDecode(_)));
    }

    #[test]
    fn pointer_without_viewport_is_unavailable() {
        let mut s = session(200, 100);
        assert!(matches!(
            s.pointer_down(Point::new(10.0, 10.0)),
            Err(ScanError::ViewportUnavailable { .. })
        ));
    }

    #[test]
    fn drag_protocol_moves_and_clamps_corner() {
        let mut s = session(200, 100);
        // 1:2 scale, no margins.
        s.set_viewport(Viewport::new(400.0, 200.0)).unwrap();
        // TL handle is drawn at (40, 20).
        assert_eq!(s.pointer_down(Point::new(45.0, 25.0)).unwrap(), Some(Corner::TopLeft));
        assert!(s.pointer_move(Point::new(10.0, 8.0)).unwrap());
        assert_eq!(s.quad().top_left, Point::new(5.0, 4.0));
        // Dragging off-screen clamps to the photo.
        assert!(s.pointer_move(Point::new(-100.0, -100.0)).unwrap());
        assert_eq!(s.quad().top_left, Point::new(0.0, 0.0));
        s.pointer_up();
        assert!(!s.pointer_move(Point::new(50.0, 50.0)).unwrap());
        assert_eq!(s.quad().top_left, Point::new(0.0, 0.0));
    }

    #[test]
    fn pointer_down_away_from_handles_starts_no_drag() {
        let mut s = session(200, 100);
        s.set_viewport(Viewport::new(400.0, 200.0)).unwrap();
        // Photo centre, far from every handle.
        assert_eq!(s.pointer_down(Point::new(200.0, 100.0)).unwrap(), None);
        assert_eq!(s.active_corner(), None);
        assert!(!s.pointer_move(Point::new(10.0, 10.0)).unwrap());
        assert_eq!(s.generation(), 0);
    }

    #[test]
    fn drag_events_resolve_corner_index() {
        let mut s = session(200, 100);
        s.set_viewport(Viewport::new(200.0, 100.0)).unwrap();
        let before = s.generation();
        assert!(s
            .apply_drag(DragEvent {
                corner_index: 2,
                display_x: 190.0,
                display_y: 95.0
            })
            .unwrap());
        assert_eq!(s.quad().bottom_right, Point::new(190.0, 95.0));
        assert!(s.generation() > before);
        assert!(matches!(
            s.apply_drag(DragEvent {
                corner_index: 7,
                display_x: 0.0,
                display_y: 0.0
            }),
            Err(ScanError::InvalidCorner(7))
        ));
    }

    #[test]
    fn rectify_rotate_confirm_lifecycle() {
        let mut s = session(100, 80);
        s.set_quad(Quad::rectangle(100.0, 80.0));
        assert_eq!(s.rectify().unwrap().size(), ImageSize::new(100, 80));

        // Editing is locked while the result is shown.
        assert!(!s.set_corner(Corner::TopLeft, Point::new(5.0, 5.0)));

        s.rotate_result();
        assert_eq!(s.result().unwrap().size(), ImageSize::new(80, 100));
        let file = s.confirm().unwrap().unwrap();
        assert_eq!(file.name, "scanned_doc_rotated.jpg");
        assert_eq!(file.document_type, DocumentType::Jpeg);
        assert_eq!(file.size, ImageSize::new(80, 100));

        s.retry();
        assert!(s.result().is_none());
        assert!(s.confirm().unwrap().is_none());
        assert!(s.set_corner(Corner::TopLeft, Point::new(5.0, 5.0)));
    }

    #[test]
    fn rotate_without_result_is_noop() {
        let mut s = session(10, 10);
        assert!(s.rotate_result().is_none());
    }

    #[tokio::test]
    async fn background_result_is_accepted_when_current() {
        let mut s = session(120, 90);
        let outcome = s.spawn_rectify().join().await;
        assert!(s.accept(outcome).unwrap());
        assert_eq!(s.result().unwrap().size(), ImageSize::new(96, 72));
    }

    #[tokio::test]
    async fn stale_background_result_is_dropped() {
        let mut s = session(120, 90);
        let job = s.spawn_rectify();
        // User keeps dragging while the resample runs.
        s.set_corner(Corner::TopRight, Point::new(110.0, 5.0));
        let outcome = job.join().await;
        assert!(!s.accept(outcome).unwrap());
        assert!(s.result().is_none());

        // Same after a retry.
        let job = s.spawn_rectify();
        s.retry();
        assert!(!s.accept(job.join().await).unwrap());
    }

    #[tokio::test]
    async fn current_degenerate_result_surfaces_error() {
        let mut s = session(100, 100);
        s.set_quad(Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]));
        let outcome = s.spawn_rectify().join().await;
        assert!(matches!(s.accept(outcome), Err(ScanError::DegenerateGeometry(_))));
    }
}
