// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background rectification.
//
// Resampling a 2000x2000 output touches four million pixels, so it runs on
// tokio's blocking pool while the caller keeps handling pointer input. The
// job owns everything it reads (a shared handle to the source pixels and a
// copy of the corners) and hands back a fresh buffer. There is no cancel
// signal: the session compares the outcome's generation with its own and
// drops anything stale.

use std::sync::Arc;

use docscan_core::error::{Result, ScanError};
use docscan_core::{Quad, SessionId};
use image::RgbaImage;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::scan::rectify::{RectifiedImage, Rectifier};

/// Everything a resample needs, detached from the session that produced it.
#[derive(Debug, Clone)]
pub struct RectifyRequest {
    pub session: SessionId,
    /// Session generation at the time of the request.
    pub generation: u64,
    pub source: Arc<RgbaImage>,
    pub quad: Quad,
}

impl RectifyRequest {
    /// Run the resample on the current thread.
    pub fn run(&self, rectifier: &Rectifier) -> Result<RectifiedImage> {
        rectifier.rectify(&self.source, &self.quad)
    }
}

/// Result of a finished job, tagged with the request it answers.
#[derive(Debug)]
pub struct RectifyOutcome {
    pub session: SessionId,
    pub generation: u64,
    pub result: Result<RectifiedImage>,
}

/// Handle to a resample running on the blocking pool.
pub struct RectifyJob {
    session: SessionId,
    generation: u64,
    handle: JoinHandle<Result<RectifiedImage>>,
}

impl RectifyJob {
    /// Start resampling on the blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip_all, fields(session = %request.session, generation = request.generation))]
    pub fn spawn(request: RectifyRequest, rectifier: Rectifier) -> Self {
        let session = request.session;
        let generation = request.generation;
        debug!("Spawning background rectification");
        let handle = tokio::task::spawn_blocking(move || request.run(&rectifier));
        Self {
            session,
            generation,
            handle,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the resample to finish.
    ///
    /// A panicked or aborted task is reported as `ScanError::Worker`.
    pub async fn join(self) -> RectifyOutcome {
        let result = match self.handle.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(session = %self.session, error = %join_err, "Rectification task failed");
                Err(ScanError::Worker(join_err.to_string()))
            }
        };
        RectifyOutcome {
            session: self.session,
            generation: self.generation,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::Point;
    use image::Rgba;

    fn request(quad: Quad) -> RectifyRequest {
        RectifyRequest {
            session: SessionId::new(),
            generation: 3,
            source: Arc::new(RgbaImage::from_pixel(64, 48, Rgba([9, 8, 7, 255]))),
            quad,
        }
    }

    #[tokio::test]
    async fn job_returns_tagged_image() {
        let req = request(Quad::rectangle(64.0, 48.0));
        let session = req.session;
        let job = RectifyJob::spawn(req, Rectifier::default());
        assert_eq!(job.generation(), 3);
        let outcome = job.join().await;
        assert_eq!(outcome.session, session);
        assert_eq!(outcome.generation, 3);
        let image = outcome.result.unwrap();
        assert_eq!(image.pixels().dimensions(), (64, 48));
        assert_eq!(image.pixels().get_pixel(5, 5), &Rgba([9, 8, 7, 255]));
    }

    #[tokio::test]
    async fn job_reports_degenerate_geometry() {
        let flat = Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(20.0, 20.0),
            Point::new(0.0, 40.0),
        ]);
        let outcome = RectifyJob::spawn(request(flat), Rectifier::default()).join().await;
        assert!(matches!(outcome.result, Err(ScanError::DegenerateGeometry(_))));
    }
}
