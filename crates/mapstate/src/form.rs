use std::fmt;

use catalog::{MapPoint, PointDraft, PointKind, StoreError};
use foundation::LngLat;

use crate::sync::MapSync;

/// Raw input of the add-point form.
///
/// Fields hold what the user typed; [`AddPointForm::into_draft`] turns them
/// into a validated [`PointDraft`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddPointForm {
    pub name: String,
    pub description: String,
    pub kind: PointKind,
    /// Comma-separated.
    pub amenities: String,
    pub rating: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
}

impl AddPointForm {
    /// A blank form pinned to `at`.
    pub fn at(at: LngLat) -> Self {
        Self {
            latitude: at.latitude,
            longitude: at.longitude,
            ..Self::default()
        }
    }

    /// Trimmed, non-empty amenities in input order, duplicates removed.
    pub fn amenity_list(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for tag in self.amenities.split(',').map(str::trim) {
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        out
    }

    pub fn into_draft(&self) -> Result<PointDraft, StoreError> {
        let name = self.name.trim();
        let mut draft = PointDraft::new(
            name,
            self.kind.clone(),
            LngLat::new(self.longitude, self.latitude),
        )
        .with_amenities(self.amenity_list());
        let description = self.description.trim();
        if !description.is_empty() {
            draft = draft.with_description(description);
        }
        if let Some(rating) = self.rating {
            draft = draft.with_rating(rating);
        }
        draft.validate()?;
        Ok(draft)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// Nobody is signed in; a login prompt was requested instead.
    LoginRequired,
    /// The form did not produce a valid draft. Nothing was sent.
    Invalid(StoreError),
    /// The store refused the write.
    Rejected(StoreError),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::LoginRequired => write!(f, "sign in to add map points"),
            SubmitError::Invalid(err) => write!(f, "{err}"),
            SubmitError::Rejected(err) => write!(f, "failed to add map point: {err}"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::LoginRequired => None,
            SubmitError::Invalid(err) | SubmitError::Rejected(err) => Some(err),
        }
    }
}

impl MapSync {
    /// Submits the add-point form.
    ///
    /// Without a session the store is never called; the login affordance is
    /// requested instead.
    pub async fn submit(&self, form: &AddPointForm) -> Result<MapPoint, SubmitError> {
        if !self.session().is_authenticated() {
            self.session().request_login("Sign in to add map points");
            return Err(SubmitError::LoginRequired);
        }
        let draft = form.into_draft().map_err(SubmitError::Invalid)?;
        self.add_point(&draft).await.map_err(SubmitError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use catalog::{PointKind, StoreError};
    use foundation::LngLat;
    use pretty_assertions::assert_eq;

    use super::AddPointForm;

    fn form() -> AddPointForm {
        AddPointForm {
            name: "  Lakeside ".into(),
            ..AddPointForm::at(LngLat::new(-105.0, 40.0))
        }
    }

    #[test]
    fn defaults_to_campsite() {
        assert_eq!(AddPointForm::default().kind, PointKind::Campsite);
    }

    #[test]
    fn amenities_are_split_trimmed_and_deduplicated() {
        let f = AddPointForm {
            amenities: " water, toilets,,fire pits , water,".into(),
            ..form()
        };
        assert_eq!(
            f.amenity_list(),
            vec![
                "water".to_string(),
                "toilets".to_string(),
                "fire pits".to_string()
            ]
        );
    }

    #[test]
    fn draft_trims_name_and_drops_blank_description() {
        let draft = AddPointForm {
            description: "   ".into(),
            rating: Some(4.5),
            ..form()
        }
        .into_draft()
        .unwrap();
        assert_eq!(draft.name, "Lakeside");
        assert_eq!(draft.description, None);
        assert_eq!(draft.rating, Some(4.5));
        assert_eq!((draft.longitude, draft.latitude), (-105.0, 40.0));
    }

    #[test]
    fn invalid_input_is_rejected_before_submission() {
        let blank = AddPointForm { name: " ".into(), ..form() };
        assert!(matches!(blank.into_draft(), Err(StoreError::Validation(_))));

        let rating = AddPointForm {
            rating: Some(5.5),
            ..form()
        };
        assert!(matches!(rating.into_draft(), Err(StoreError::Validation(_))));

        let lat = AddPointForm {
            latitude: -91.0,
            ..form()
        };
        assert!(lat.into_draft().is_err());
    }
}
