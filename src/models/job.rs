use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a try-on job.
///
/// `Succeeded` and `Failed` are terminal and absorbing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Forward-only transitions. `Queued` may skip straight to a terminal
    /// state for triggers that never acknowledge processing.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, target),
            (Queued, Processing)
                | (Queued, Succeeded)
                | (Queued, Failed)
                | (Processing, Succeeded)
                | (Processing, Failed)
        )
    }
}

/// Compositor mode. Passed through to the worker untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TryOnMode {
    #[default]
    Image,
    Video,
}

/// A garment the user wants to try on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GarmentRef {
    /// Item from the product catalog.
    Catalog { product_id: String },
    /// Direct garment image URL supplied by the user.
    External { image_url: String },
}

/// A status change requested against a job.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: JobStatus,
    pub result_urls: Vec<String>,
    pub error: Option<String>,
}

impl Transition {
    pub fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            result_urls: Vec::new(),
            error: None,
        }
    }

    pub fn succeeded(result_urls: Vec<String>) -> Self {
        Self {
            status: JobStatus::Succeeded,
            result_urls,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            result_urls: Vec::new(),
            error: Some(reason.into()),
        }
    }
}

/// Why a transition was not applied.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionRejection {
    /// The job already reached `Succeeded` or `Failed`.
    AlreadyTerminal(JobStatus),
    /// The move is not allowed by the state machine, or the payload is
    /// missing for the target state.
    Invalid {
        from: JobStatus,
        to: JobStatus,
        reason: &'static str,
    },
}

/// A virtual try-on job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnJob {
    pub id: Uuid,
    pub session_id: String,
    pub asset_id: Uuid,
    pub garments: Vec<GarmentRef>,
    pub mode: TryOnMode,
    pub status: JobStatus,
    pub result_urls: Vec<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryOnJob {
    pub fn new(
        session_id: String,
        asset_id: Uuid,
        garments: Vec<GarmentRef>,
        mode: TryOnMode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            asset_id,
            garments,
            mode,
            status: JobStatus::Queued,
            result_urls: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Catalog product ids referenced by this job, in order.
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.garments.iter().filter_map(|g| match g {
            GarmentRef::Catalog { product_id } => Some(product_id.as_str()),
            GarmentRef::External { .. } => None,
        })
    }

    /// External garment URLs referenced by this job, in order.
    pub fn external_urls(&self) -> impl Iterator<Item = &str> {
        self.garments.iter().filter_map(|g| match g {
            GarmentRef::External { image_url } => Some(image_url.as_str()),
            GarmentRef::Catalog { .. } => None,
        })
    }

    /// Apply a transition in place, returning the previous status.
    ///
    /// Nothing is written unless the transition is accepted, so the caller
    /// can run this under the job's lock as a compare-and-set.
    pub fn apply(&mut self, transition: Transition) -> Result<JobStatus, TransitionRejection> {
        let from = self.status;
        let to = transition.status;

        if from.is_terminal() {
            return Err(TransitionRejection::AlreadyTerminal(from));
        }
        if !from.can_transition_to(to) {
            return Err(TransitionRejection::Invalid {
                from,
                to,
                reason: "transition not allowed",
            });
        }
        if to == JobStatus::Succeeded && transition.result_urls.is_empty() {
            return Err(TransitionRejection::Invalid {
                from,
                to,
                reason: "succeeded requires at least one result url",
            });
        }

        self.status = to;
        self.result_urls = if to == JobStatus::Succeeded {
            transition.result_urls
        } else {
            Vec::new()
        };
        self.error = if to == JobStatus::Failed {
            transition.error
        } else {
            None
        };
        // Never move backwards even if the wall clock does.
        self.updated_at = Utc::now().max(self.updated_at);

        Ok(from)
    }
}
