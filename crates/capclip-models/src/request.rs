//! The `/process` request: wire schema and boundary validation.
//!
//! The wire payload is loose (optional fields, camelCase credentials, two
//! source shapes). [`ProcessRequest::validate`] turns it into a
//! [`ValidatedRequest`] once, so the pipeline only ever sees typed data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::caption::CaptionStyle;
use crate::error::{ModelError, ModelResult};
use crate::segment::Segment;
use crate::source::{
    normalize_region, object_key_from_url, ClipSource, ObjectStoreSource, PublicUrlSource,
    StoreCredentials,
};
use crate::transcript::{KeywordSet, Word, WordTimeUnit, MAX_WORD_MS};

/// Object-store source as sent by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3ConfigPayload {
    pub endpoint: Option<String>,
    #[serde(rename = "accessKeyId", alias = "access_key_id")]
    pub access_key_id: Option<String>,
    #[serde(rename = "secretAccessKey", alias = "secret_access_key")]
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub output_bucket: Option<String>,
}

/// A requested window as sent by callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentPayload {
    pub start: f64,
    pub end: f64,
}

/// A transcript word in the caller's time unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPayload {
    #[serde(alias = "word")]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// A ready-made SRT document for one segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitlePayload {
    pub segment_index: usize,
    pub subtitle_srt: String,
}

/// Inbound `/process` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub s3_config: Option<S3ConfigPayload>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub segments: Option<Vec<SegmentPayload>>,
    #[serde(default)]
    pub words: Option<Vec<WordPayload>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub output_bucket: Option<String>,
    /// Process only this segment
    #[serde(default)]
    pub segment_index: Option<usize>,
    /// Index used for the output key and result entry
    #[serde(default)]
    pub output_index: Option<usize>,
    #[serde(default)]
    pub subtitles: Option<Vec<SubtitlePayload>>,
    #[serde(default)]
    pub caption_style: Option<CaptionStyle>,
    #[serde(default)]
    pub word_time_unit: Option<WordTimeUnit>,
}

/// Server-side defaults applied to fields a request leaves out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDefaults {
    pub word_time_unit: WordTimeUnit,
    pub caption_style: CaptionStyle,
}

/// Which segments a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSelection {
    All,
    Only(usize),
}

impl SegmentSelection {
    /// Segment indices to enqueue, in order.
    pub fn indices(&self, count: usize) -> Vec<usize> {
        match *self {
            SegmentSelection::All => (0..count).collect(),
            SegmentSelection::Only(index) if index < count => vec![index],
            SegmentSelection::Only(_) => Vec::new(),
        }
    }
}

/// A request after boundary validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub source: ClipSource,
    pub segments: Vec<Segment>,
    /// Absolute-time words in milliseconds
    pub words: Vec<Word>,
    pub keywords: KeywordSet,
    pub output_bucket: Option<String>,
    pub selection: SegmentSelection,
    pub output_index: Option<usize>,
    /// Pre-rendered SRT documents by segment index
    pub subtitles: HashMap<usize, String>,
    pub caption_style: CaptionStyle,
}

impl ValidatedRequest {
    /// Index reported for a processed segment (and used in its output key).
    pub fn result_index(&self, segment_index: usize) -> usize {
        match (self.selection, self.output_index) {
            (SegmentSelection::Only(_), Some(output_index)) => output_index,
            _ => segment_index,
        }
    }
}

impl ProcessRequest {
    /// Validate the payload into a typed request.
    ///
    /// When both source shapes are present the object-store form wins.
    pub fn validate(self, defaults: RequestDefaults) -> ModelResult<ValidatedRequest> {
        let segments = match self.segments {
            Some(segments) if !segments.is_empty() => segments,
            _ => return Err(ModelError::MissingSegments),
        };

        let segments = segments
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                let segment = Segment {
                    start: payload.start,
                    end: payload.end,
                };
                segment.validate(index)?;
                Ok(segment)
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let mut request_output_bucket = non_empty(self.output_bucket);

        let source = match (self.s3_config, non_empty(self.video_url)) {
            (Some(config), _) => {
                if let Some(bucket) = non_empty(config.output_bucket.clone()) {
                    request_output_bucket = Some(bucket);
                }
                ClipSource::ObjectStore(object_store_source(config)?)
            }
            (None, Some(url)) => {
                let key = object_key_from_url(&url)?;
                ClipSource::PublicUrl(PublicUrlSource { url, key })
            }
            (None, None) => return Err(ModelError::MissingSource),
        };

        let selection = match self.segment_index {
            Some(index) if index >= segments.len() => {
                return Err(ModelError::SegmentIndexOutOfRange {
                    index,
                    count: segments.len(),
                })
            }
            Some(index) => SegmentSelection::Only(index),
            None => SegmentSelection::All,
        };

        let unit = self.word_time_unit.unwrap_or(defaults.word_time_unit);
        let words = self
            .words
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                if !payload.start.is_finite() || !payload.end.is_finite() {
                    return Err(ModelError::InvalidWord {
                        index,
                        reason: "start and end must be finite numbers".to_string(),
                    });
                }
                let in_range = |value: f64| {
                    let ms = value * unit.factor_ms();
                    (0.0..=MAX_WORD_MS as f64).contains(&ms)
                };
                if !in_range(payload.start) || !in_range(payload.end) {
                    return Err(ModelError::InvalidWord {
                        index,
                        reason: format!(
                            "start and end must be between 0 and {} ms",
                            MAX_WORD_MS
                        ),
                    });
                }
                Ok(Word::new(
                    payload.text,
                    unit.to_millis(payload.start),
                    unit.to_millis(payload.end),
                ))
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let subtitles = self
            .subtitles
            .unwrap_or_default()
            .into_iter()
            .filter(|s| !s.subtitle_srt.trim().is_empty())
            .fold(HashMap::new(), |mut map, s| {
                map.entry(s.segment_index).or_insert(s.subtitle_srt);
                map
            });

        Ok(ValidatedRequest {
            source,
            segments,
            words,
            keywords: KeywordSet::new(self.keywords.unwrap_or_default()),
            output_bucket: request_output_bucket,
            selection,
            output_index: self.output_index,
            subtitles,
            caption_style: self.caption_style.unwrap_or(defaults.caption_style),
        })
    }
}

fn object_store_source(config: S3ConfigPayload) -> ModelResult<ObjectStoreSource> {
    let endpoint = non_empty(config.endpoint).ok_or(ModelError::MissingSourceField("endpoint"))?;
    let access_key_id =
        non_empty(config.access_key_id).ok_or(ModelError::MissingSourceField("accessKeyId"))?;
    let secret_access_key = non_empty(config.secret_access_key)
        .ok_or(ModelError::MissingSourceField("secretAccessKey"))?;
    let bucket = non_empty(config.bucket).ok_or(ModelError::MissingSourceField("bucket"))?;
    let key = non_empty(config.key).ok_or(ModelError::MissingSourceField("key"))?;

    Ok(ObjectStoreSource {
        endpoint: endpoint.trim_end_matches('/').to_string(),
        bucket,
        key,
        credentials: StoreCredentials {
            access_key_id,
            secret_access_key,
        },
        region: normalize_region(config.region.as_deref()),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
