// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docscan_core::{DocumentType, MAX_IMAGE_DIMENSION, Point, Viewport};

/// Flatten photographed documents into upright scans
#[derive(Parser, Debug)]
#[command(name = "docscan", author, version, about, long_about = None)]
pub struct Args {
    /// Scanner settings (JSON). Defaults apply to anything missing.
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rectify the document outlined by four corners
    Rectify {
        /// Photo to rectify (JPEG or PNG)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Document corners in image pixels, in order TL TR BR BL (e.g. 120,80).
        /// Defaults to a rectangle inset from the photo edges.
        #[arg(long, value_name = "X,Y", num_args = 4, value_parser = parse_point)]
        corners: Option<Vec<Point>>,

        /// Where to write the scan (default: next to the input)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Quarter turns clockwise to apply after rectifying
        #[arg(short, long, value_name = "N", default_value_t = 0)]
        rotate: u32,

        /// Output format (overrides the configuration)
        #[arg(short, long, value_name = "jpeg|png", value_parser = parse_format)]
        format: Option<DocumentType>,
    },

    /// Rotate an existing scan clockwise
    Rotate {
        /// Scan to rotate (JPEG or PNG)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Quarter turns clockwise
        #[arg(short, long, value_name = "N", default_value_t = 1)]
        times: u32,

        /// Where to write the rotated scan (default: next to the input)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Render the selection overlay as it would appear on screen
    Preview {
        /// Photo to preview
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Viewport size in display pixels (e.g. 390x640)
        #[arg(long, value_name = "WxH", value_parser = parse_viewport)]
        viewport: Viewport,

        /// Document corners in image pixels, TL TR BR BL
        #[arg(long, value_name = "X,Y", num_args = 4, value_parser = parse_point)]
        corners: Option<Vec<Point>>,

        /// Where to write the PNG (default: preview.png next to the input)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Upload a scan and link it from a job record
    Attach {
        /// Scan to upload (JPEG or PNG)
        #[arg(value_name = "SCANNED")]
        scanned: PathBuf,

        /// Store directory (holds `blobs/` and `records.json`)
        #[arg(long, value_name = "DIR")]
        store: PathBuf,

        /// Key of the record the scan belongs to
        #[arg(long, value_name = "KEY")]
        record: String,

        /// Record field that receives the scan URL
        #[arg(long, value_name = "NAME")]
        field: String,

        /// File name prefix of the stored object
        #[arg(long, value_name = "P", default_value = "scan")]
        prefix: String,

        /// Record table
        #[arg(long, value_name = "TABLE", default_value = "jobs")]
        table: String,
    },
}

/// Parse `x,y` into an image-space point.
pub fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("corner {s:?} is not finite"));
    }
    Ok(Point::new(x, y))
}

/// Parse `WxH` into a viewport.
pub fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH but got {s:?}"))?;
    let w: f64 = w.trim().parse().map_err(|e| format!("bad width in {s:?}: {e}"))?;
    let h: f64 = h.trim().parse().map_err(|e| format!("bad height in {s:?}: {e}"))?;
    let viewport = Viewport::new(w, h);
    if !viewport.fits_canvas() {
        return Err(format!(
            "viewport {s:?} must be positive and at most {MAX_IMAGE_DIMENSION} on each side"
        ));
    }
    Ok(viewport)
}

fn parse_format(s: &str) -> Result<DocumentType, String> {
    s.parse::<DocumentType>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("12.5, 40").unwrap(), Point::new(12.5, 40.0));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
        assert!(parse_point("inf,0").is_err());
    }

    #[test]
    fn parses_viewports() {
        assert_eq!(parse_viewport("390x640").unwrap(), Viewport::new(390.0, 640.0));
        assert!(parse_viewport("390").is_err());
    }

    #[test]
    fn viewport_size_is_bounded() {
        assert!(parse_viewport("16384x16384").is_ok());
        assert!(parse_viewport("16385x10").is_err());
        assert!(parse_viewport("1e9x1e9").is_err());
        assert!(parse_viewport("0x640").is_err());
        assert!(parse_viewport("NaNx640").is_err());
    }

    #[test]
    fn rectify_takes_exactly_four_corners() {
        let args = Args::try_parse_from([
            "docscan", "rectify", "in.jpg", "--corners", "0,0", "10,0", "10,10", "0,10",
        ])
        .unwrap();
        match args.command {
            Command::Rectify { corners, rotate, .. } => {
                assert_eq!(corners.unwrap().len(), 4);
                assert_eq!(rotate, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(
            Args::try_parse_from(["docscan", "rectify", "in.jpg", "--corners", "0,0", "1,1"])
                .is_err()
        );
    }

    #[test]
    fn config_is_global() {
        let args = Args::try_parse_from(["docscan", "rotate", "scan.jpg", "--config", "cfg.json"])
            .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
    }
}
