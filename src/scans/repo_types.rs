use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{RepoError, ScanError};
use crate::nutrition::{Grade, Insight, NutriScore, NutrientHighlight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Processing => "processing",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            ScanStatus::Completed | ScanStatus::Failed => true,
            ScanStatus::Pending | ScanStatus::Processing => false,
        }
    }

    pub fn can_transition_to(self, next: ScanStatus) -> bool {
        use ScanStatus::*;
        match (self, next) {
            (Pending, Processing) | (Pending, Completed) => true,
            (Processing, Completed) | (Processing, Failed) => true,
            (Pending, Pending | Failed) => false,
            (Processing, Pending | Processing) => false,
            (Completed | Failed, _) => false,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "processing" => Ok(ScanStatus::Processing),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            other => Err(RepoError::Corrupt(format!("unknown scan status {other:?}"))),
        }
    }
}

/// One recognition request. Score, highlights and insights are a snapshot of
/// the linked product taken at completion time.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub barcode: Option<String>,
    pub image_ref: Option<String>,
    pub image_stored: bool,
    pub status: ScanStatus,
    pub ocr_raw: Option<String>,
    pub nutri_score: Option<Grade>,
    pub nutri_score_value: Option<i32>,
    pub highlights: Option<Vec<NutrientHighlight>>,
    pub insights: Option<Vec<Insight>>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Scan {
    pub fn new(user_id: Option<Uuid>, barcode: Option<String>, image_ref: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id,
            product_id: None,
            barcode,
            image_stored: image_ref.is_some(),
            image_ref,
            status: ScanStatus::Pending,
            ocr_raw: None,
            nutri_score: None,
            nutri_score_value: None,
            highlights: None,
            insights: None,
            processing_time_ms: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Image key usable for recognition, if the image is still stored.
    pub fn stored_image(&self) -> Option<&str> {
        self.image_ref.as_deref().filter(|_| self.image_stored)
    }

    fn transition(&mut self, next: ScanStatus) -> Result<(), ScanError> {
        if !self.status.can_transition_to(next) {
            return Err(ScanError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    pub fn start_processing(&mut self) -> Result<(), ScanError> {
        self.transition(ScanStatus::Processing)
    }

    /// Links the scan to `product_id` and copies its derived fields.
    pub fn complete(
        &mut self,
        product_id: Uuid,
        score: Option<NutriScore>,
        highlights: Vec<NutrientHighlight>,
        insights: Vec<Insight>,
    ) -> Result<(), ScanError> {
        self.transition(ScanStatus::Completed)?;
        self.product_id = Some(product_id);
        self.nutri_score = score.map(|s| s.grade);
        self.nutri_score_value = score.map(|s| s.score);
        self.highlights = Some(highlights);
        self.insights = Some(insights);
        self.error_message = None;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ScanError> {
        self.transition(ScanStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// In-memory counterpart of `ScanRepository::clear_image`.
    #[cfg(test)]
    pub fn forget_image(&mut self) {
        self.image_ref = None;
        self.image_stored = false;
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[derive(Debug, FromRow)]
pub struct ScanRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub barcode: Option<String>,
    pub image_ref: Option<String>,
    pub image_stored: bool,
    pub status: String,
    pub ocr_raw: Option<String>,
    pub nutri_score: Option<String>,
    pub nutri_score_value: Option<i32>,
    pub highlights: Option<Json<Vec<NutrientHighlight>>>,
    pub insights: Option<Json<Vec<Insight>>>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ScanRow> for Scan {
    type Error = RepoError;

    fn try_from(r: ScanRow) -> Result<Self, Self::Error> {
        let nutri_score = r
            .nutri_score
            .as_deref()
            .map(str::parse::<Grade>)
            .transpose()
            .map_err(RepoError::Corrupt)?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            product_id: r.product_id,
            barcode: r.barcode,
            image_ref: r.image_ref,
            image_stored: r.image_stored,
            status: r.status.parse()?,
            ocr_raw: r.ocr_raw,
            nutri_score,
            nutri_score_value: r.nutri_score_value,
            highlights: r.highlights.map(|j| j.0),
            insights: r.insights.map(|j| j.0),
            processing_time_ms: r.processing_time_ms,
            error_message: r.error_message,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ScanStatus; 4] = [
        ScanStatus::Pending,
        ScanStatus::Processing,
        ScanStatus::Completed,
        ScanStatus::Failed,
    ];

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [ScanStatus::Completed, ScanStatus::Failed] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn allowed_transitions() {
        use ScanStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn status_text_round_trips_and_rejects_unknown() {
        for s in ALL {
            assert_eq!(s.as_str().parse::<ScanStatus>().unwrap(), s);
        }
        assert!(matches!("done".parse::<ScanStatus>(), Err(RepoError::Corrupt(_))));
    }

    #[test]
    fn completing_a_finished_scan_is_rejected() {
        let mut scan = Scan::new(None, None, Some("k.jpg".into()));
        scan.start_processing().unwrap();
        scan.fail("boom").unwrap();
        let err = scan
            .complete(Uuid::new_v4(), None, vec![], vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidTransition { from: ScanStatus::Failed, to: ScanStatus::Completed }
        ));
        assert_eq!(scan.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn stored_image_requires_flag() {
        let mut scan = Scan::new(None, None, Some("k.jpg".into()));
        assert_eq!(scan.stored_image(), Some("k.jpg"));
        scan.image_stored = false;
        assert_eq!(scan.stored_image(), None);
        scan.forget_image();
        assert!(scan.image_ref.is_none());
    }
}
