use chrono::NaiveDateTime;
use serde::Serialize;

/// Horodatage commun (created_at / updated_at) composé dans chaque entité
/// qui en a besoin. Les valeurs viennent de l'horloge du contexte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreationMetadata {
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CreationMetadata {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

pub trait Timestamped {
    fn metadata(&self) -> CreationMetadata;
}

macro_rules! impl_timestamped {
    ($($model:ty),+ $(,)?) => {
        $(
            impl Timestamped for $model {
                fn metadata(&self) -> CreationMetadata {
                    CreationMetadata {
                        created_at: self.created_at,
                        updated_at: self.updated_at,
                    }
                }
            }
        )+
    };
}

impl_timestamped!(
    super::users::Model,
    super::course::Model,
    super::review::Model,
    super::trainer_rating::Model,
);
