use std::path::PathBuf;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::{Result, TrimError};

/// JSON body of `POST /trim`
#[derive(Deserialize, Debug)]
pub struct TrimRequest {
    pub audio_url: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub scene_index: Option<i64>,
}

/// A validated `[start, end)` window in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    /// Checks the bounds: `start >= 0`, `end > 0` and `end > start`.
    /// Non-finite values are rejected by the same checks.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !(start.is_finite() && start >= 0.0) {
            return Err(TrimError::InvalidRange("start must be >= 0"));
        }
        if !(end.is_finite() && end > 0.0) {
            return Err(TrimError::InvalidRange("end must be > 0"));
        }
        if end <= start {
            return Err(TrimError::InvalidRange("end must be > start"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Where the input audio comes from
#[derive(Debug)]
pub enum InputSource {
    /// Fetched over HTTP(S)
    Url(String),
    /// Sent inline as a multipart file field
    Upload {
        file_name: Option<String>,
        data: Bytes,
    },
}

/// One trim request, independent of the endpoint it arrived on
#[derive(Debug)]
pub struct TrimJob {
    pub source: InputSource,
    pub range: TimeRange,
    pub scene_index: Option<i64>,
}

impl TrimJob {
    /// Builds a job from the JSON endpoint, validating the range first.
    pub fn from_request(req: TrimRequest) -> Result<Self> {
        let range = TimeRange::new(req.start, req.end)?;
        Ok(Self {
            source: InputSource::Url(req.audio_url),
            range,
            scene_index: req.scene_index,
        })
    }
}

/// A finished trim ready to be streamed back
#[derive(Debug, Clone)]
pub struct TrimResult {
    pub path: PathBuf,
    pub media_type: &'static str,
    pub file_name: String,
}
