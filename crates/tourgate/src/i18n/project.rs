//! Entity translation projection.
//!
//! Domain entities keep their translatable text in per-language rows beside
//! the language-neutral base fields. Projection flattens one entity into a
//! single-language DTO: base fields, minus the raw translation container,
//! plus the allow-listed fields of the row matching the request language.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{context, i18n::language::Language};

/// One language's worth of translated fields for one entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationRow {
    #[serde(rename = "entityId")]
    pub entity_id: String,
    pub language: Language,
    pub fields: Map<String, Value>,
}

/// Declarative description of a projection target: the DTO name (for logs)
/// and the closed set of fields a translation row may contribute. Fields
/// outside the allow-list never reach the DTO, whatever the row contains.
#[derive(Clone, Copy, Debug)]
pub struct ProjectionSpec {
    pub dto: &'static str,
    pub translatable: &'static [&'static str],
}

/// Projects entities into single-language DTO maps.
#[derive(Clone, Debug)]
pub struct EntityProjector {
    default_language: Language,
}

impl EntityProjector {
    pub fn new(default_language: Language) -> Self {
        EntityProjector { default_language }
    }

    fn effective_language(&self) -> Language {
        context::language().unwrap_or(self.default_language)
    }

    /// Flatten `base` plus the matching row from `rows` into a DTO map.
    ///
    /// Translatable keys already present in `base` are dropped first, so the
    /// operation is idempotent: projecting an already-projected map again
    /// with the same row yields the same result. When no row matches the
    /// effective language a warning is logged and the translatable fields
    /// are simply absent from the DTO.
    pub fn project(
        &self,
        base: &Map<String, Value>,
        rows: &[TranslationRow],
        spec: &ProjectionSpec,
    ) -> Map<String, Value> {
        let language = self.effective_language();
        let mut dto: Map<String, Value> = base
            .iter()
            .filter(|(key, _)| !spec.translatable.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        match rows.iter().find(|row| row.language == language) {
            Some(row) => {
                for &field in spec.translatable {
                    if let Some(value) = row.fields.get(field) {
                        dto.insert(field.to_string(), value.clone());
                    }
                }
            }
            None => {
                warn!(dto = spec.dto, language = %language, "no translation row for entity");
            }
        }
        dto
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{self, RequestContext, Surface};
    use serde_json::json;

    const TOUR_DTO: ProjectionSpec = ProjectionSpec { dto: "TourDto", translatable: &["title", "description"] };

    fn row(language: Language, title: &str) -> TranslationRow {
        let mut fields = Map::new();
        fields.insert("title".into(), json!(title));
        fields.insert("internalNote".into(), json!("never shown"));
        TranslationRow { entity_id: "tour-001".into(), language, fields }
    }

    fn base() -> Map<String, Value> {
        json!({"id": "tour-001", "slug": "sunset-bay", "sceneCount": 4})
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn projects_default_language_fields() {
        let projector = EntityProjector::new(Language::EnUs);
        let dto = projector.project(&base(), &[row(Language::EnUs, "Sunset Bay")], &TOUR_DTO);
        assert_eq!(dto["title"], json!("Sunset Bay"));
        assert_eq!(dto["slug"], json!("sunset-bay"));
        assert!(!dto.contains_key("internalNote"));
    }

    #[tokio::test]
    async fn request_language_row_wins() {
        let projector = EntityProjector::new(Language::EnUs);
        let rows = [row(Language::EnUs, "Sunset Bay"), row(Language::PhPh, "Look ng Paglubog")];
        let dto = context::scope(RequestContext::new(Surface::Http), async move {
            context::set_language(Language::PhPh);
            projector.project(&base(), &rows, &TOUR_DTO)
        })
        .await;
        assert_eq!(dto["title"], json!("Look ng Paglubog"));
    }

    #[tokio::test]
    async fn missing_language_row_omits_translatable_fields() {
        let projector = EntityProjector::new(Language::EnUs);
        let rows = [row(Language::EnUs, "Sunset Bay")];
        let dto = context::scope(RequestContext::new(Surface::Http), async move {
            context::set_language(Language::JaJp);
            projector.project(&base(), &rows, &TOUR_DTO)
        })
        .await;
        assert!(!dto.contains_key("title"));
        assert_eq!(dto["slug"], json!("sunset-bay"));
    }

    #[test]
    fn no_rows_omits_translatable_fields() {
        let projector = EntityProjector::new(Language::EnUs);
        let dto = projector.project(&base(), &[], &TOUR_DTO);
        assert!(!dto.contains_key("title"));
        assert_eq!(dto["id"], json!("tour-001"));
    }

    #[test]
    fn projection_is_idempotent() {
        let projector = EntityProjector::new(Language::EnUs);
        let rows = [row(Language::EnUs, "Sunset Bay")];
        let once = projector.project(&base(), &rows, &TOUR_DTO);
        let twice = projector.project(&once, &rows, &TOUR_DTO);
        assert_eq!(once, twice);
    }
}
