use serde::{Serialize, Serializer};
use std::sync::Arc;
use uuid::Uuid;

use crate::LoadError;

/// URL of a gzip-compressed resource. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef(String);

impl SourceRef {
    /// `None` and `""` both mean "no source"
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.filter(|url| !url.is_empty())
            .map(|url| Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the source, e.g. `contact.png.gz`
    pub fn file_name(&self) -> &str {
        self.0
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one load attempt. Strictly increasing per loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Process-local address of a decompressed object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HandleUrl(String);

impl HandleUrl {
    /// Generate a fresh, unique handle URL
    pub fn new() -> Self {
        Self(format!("blob:dog-loader/{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HandleUrl {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a loader currently stands
#[derive(Debug, Clone)]
pub enum LoadStatus {
    Absent,
    Pending { request: RequestId },
    Ready { handle: HandleUrl },
    Failed { error: Arc<LoadError> },
}

impl LoadStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// What a consumer sees: `{ error, image, loading }`
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSnapshot {
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<LoadError>>,
    pub image: Option<HandleUrl>,
    pub loading: bool,
}

impl From<&LoadStatus> for LoadSnapshot {
    fn from(status: &LoadStatus) -> Self {
        match status {
            LoadStatus::Absent => Self::default(),
            LoadStatus::Pending { .. } => Self {
                loading: true,
                ..Self::default()
            },
            LoadStatus::Ready { handle } => Self {
                image: Some(handle.clone()),
                ..Self::default()
            },
            LoadStatus::Failed { error } => Self {
                error: Some(error.clone()),
                ..Self::default()
            },
        }
    }
}

fn serialize_error<S>(error: &Option<Arc<LoadError>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
