//! In-memory tour store.
//!
//! Entities arrive with their translation rows already joined; this layer
//! issues no queries of its own. The store here is a fixed in-memory set
//! standing in for the persistence collaborator, enough to exercise the
//! localization pipeline end to end.

use serde_json::{Map, Value, json};

use crate::i18n::{
    language::Language,
    project::{ProjectionSpec, TranslationRow},
};

/// Projection target for tour DTOs. `title` and `description` are the only
/// fields a translation row may contribute.
pub const TOUR_PROJECTION: ProjectionSpec =
    ProjectionSpec { dto: "TourDto", translatable: &["title", "description"] };

/// A tour entity with its joined translation rows.
#[derive(Clone, Debug)]
pub struct TourRecord {
    pub id: String,
    pub slug: String,
    pub scene_count: u32,
    pub translations: Vec<TranslationRow>,
}

impl TourRecord {
    /// Language-neutral fields, in DTO key order.
    pub fn base_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("slug".into(), json!(self.slug));
        map.insert("sceneCount".into(), json!(self.scene_count));
        map
    }
}

#[derive(Debug)]
pub struct TourStore {
    tours: Vec<TourRecord>,
}

impl TourStore {
    /// Fixture data: one fully translated tour and one with only the default
    /// language row.
    pub fn sample() -> TourStore {
        fn row(id: &str, language: Language, title: &str, description: &str) -> TranslationRow {
            let mut fields = Map::new();
            fields.insert("title".into(), json!(title));
            fields.insert("description".into(), json!(description));
            TranslationRow { entity_id: id.into(), language, fields }
        }

        TourStore {
            tours: vec![
                TourRecord {
                    id: "tour-001".into(),
                    slug: "sunset-bay".into(),
                    scene_count: 4,
                    translations: vec![
                        row(
                            "tour-001",
                            Language::EnUs,
                            "Sunset Bay",
                            "A walk along the bay at golden hour.",
                        ),
                        row(
                            "tour-001",
                            Language::PhPh,
                            "Look ng Paglubog ng Araw",
                            "Isang lakad sa tabing-dagat sa takipsilim.",
                        ),
                    ],
                },
                TourRecord {
                    id: "tour-002".into(),
                    slug: "old-quarter".into(),
                    scene_count: 7,
                    translations: vec![row(
                        "tour-002",
                        Language::EnUs,
                        "Old Quarter",
                        "Narrow streets and a century of storefronts.",
                    )],
                },
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&TourRecord> {
        self.tours.iter().find(|tour| tour.id == id)
    }

    pub fn list(&self) -> &[TourRecord] {
        &self.tours
    }
}
