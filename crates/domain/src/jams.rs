//! The subset of the JAMS document model needed to publish tempo estimates.
//!
//! Field names follow the JAMS 0.3 schema so that files round-trip through
//! the reference tooling. Only the tempo namespace is populated here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{MirexEstimate, TempoError};

pub const JAMS_VERSION: &str = "0.3.4";
pub const TEMPO_NAMESPACE: &str = "tempo";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Curator {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AnnotationMetadata {
    pub curator: Curator,
    pub annotator: BTreeMap<String, String>,
    pub version: String,
    pub corpus: String,
    pub annotation_tools: String,
    pub annotation_rules: String,
    pub validation: String,
    pub data_source: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub time: f64,
    pub duration: f64,
    pub value: f32,
    pub confidence: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub annotation_metadata: AnnotationMetadata,
    pub namespace: String,
    pub data: Vec<Observation>,
    pub sandbox: BTreeMap<String, serde_json::Value>,
    pub time: f64,
    pub duration: f64,
}

impl Annotation {
    pub fn new(namespace: impl Into<String>, duration: f64) -> Self {
        Self {
            annotation_metadata: AnnotationMetadata::default(),
            namespace: namespace.into(),
            data: Vec::new(),
            sandbox: BTreeMap::new(),
            time: 0.0,
            duration,
        }
    }

    pub fn append(&mut self, time: f64, duration: f64, value: f32, confidence: f32) {
        self.data.push(Observation {
            time,
            duration,
            value,
            confidence,
        });
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    pub title: String,
    pub artist: String,
    pub release: String,
    pub duration: f64,
    pub identifiers: BTreeMap<String, String>,
    pub jams_version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JamsDocument {
    pub annotations: Vec<Annotation>,
    pub file_metadata: FileMetadata,
    pub sandbox: BTreeMap<String, serde_json::Value>,
}

/// Provenance recorded in the tempo annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct Provenance {
    pub version: String,
    pub annotation_tools: String,
    pub data_source: String,
}

impl JamsDocument {
    pub fn new(file_name: impl Into<String>, duration: f64) -> Self {
        let file_name = file_name.into();
        let mut identifiers = BTreeMap::new();
        identifiers.insert("file".to_string(), file_name.clone());
        Self {
            annotations: Vec::new(),
            file_metadata: FileMetadata {
                title: file_name,
                artist: String::new(),
                release: String::new(),
                duration,
                identifiers,
                jams_version: JAMS_VERSION.to_string(),
            },
            sandbox: BTreeMap::new(),
        }
    }

    /// Builds a document holding one tempo annotation with both candidates
    /// spanning the whole track.
    pub fn tempo(
        file_name: impl Into<String>,
        duration: f64,
        estimate: &MirexEstimate,
        provenance: &Provenance,
    ) -> Self {
        let mut document = Self::new(file_name, duration);
        let mut annotation = Annotation::new(TEMPO_NAMESPACE, duration);
        annotation.annotation_metadata.version = provenance.version.clone();
        annotation.annotation_metadata.annotation_tools = provenance.annotation_tools.clone();
        annotation.annotation_metadata.data_source = provenance.data_source.clone();
        annotation.append(0.0, duration, estimate.t1, estimate.s1);
        annotation.append(0.0, duration, estimate.t2, estimate.s2());
        document.annotations.push(annotation);
        document
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, TempoError> {
        serde_json::to_vec_pretty(self).map_err(|err| TempoError::Serialization(err.to_string()))
    }
}
