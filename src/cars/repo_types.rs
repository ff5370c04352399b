use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A car listing. Images are base64 text, returned as stored. On the wire
/// fields are camelCase and the id is `_id`, matching the `userId` claim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid, // owner, set from the creator's token
    pub company: String,
    pub model: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create input: every required field is present and already validated.
#[derive(Debug, Clone)]
pub struct NewCar {
    pub user_id: Uuid,
    pub company: String,
    pub model: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

/// Update input: only the supplied fields change. An empty `description`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarPatch {
    pub company: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl CarPatch {
    pub fn apply(&self, car: &mut Car) {
        if let Some(company) = &self.company {
            car.company = company.clone();
        }
        if let Some(model) = &self.model {
            car.model = model.clone();
        }
        if let Some(description) = &self.description {
            car.description = (!description.is_empty()).then(|| description.clone());
        }
        if let Some(images) = &self.images {
            car.images = images.clone();
        }
        if let Some(tags) = &self.tags {
            car.tags = tags.clone();
        }
    }
}
