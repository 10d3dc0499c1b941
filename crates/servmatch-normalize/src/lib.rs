//! Raw professional record shapes + the conversion into the canonical view.

use chrono::{Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use servmatch_core::{format_phone, regions, ProfessionalView, NOT_SPECIFIED};
use thiserror::Error;
use uuid::Uuid;

pub const CRATE_NAME: &str = "servmatch-normalize";

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";
pub const DEFAULT_WORK_HOURS: &str = "א'-ה' 08:00-18:00";
pub const DEFAULT_CERTIFICATIONS: [&str; 2] = ["רישיון עסק", "ביטוח מקצועי"];

/// Fallback experience range used when neither an explicit value nor a
/// founding year is stored. Display-only.
pub const FALLBACK_EXPERIENCE_YEARS: std::ops::RangeInclusive<u32> = 5..=15;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid {shape} record: {source}")]
    Invalid {
        shape: RecordShape,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordShape {
    Directory,
    QuoteEmbed,
}

impl std::fmt::Display for RecordShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::QuoteEmbed => f.write_str("quote-embed"),
        }
    }
}

/// Row of the `professionals` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub specialty: Option<String>,
    pub profession: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    #[serde(alias = "reviews_count")]
    pub review_count: Option<u32>,
    #[serde(alias = "is_verified")]
    pub verified: Option<bool>,
    pub specialties: Option<Vec<String>>,
    pub region: Option<String>,
    pub company_name: Option<String>,
    pub work_hours: Option<String>,
    pub certifications: Option<Vec<String>>,
    pub experience_years: Option<u32>,
    #[serde(alias = "founded_year")]
    pub founding_year: Option<i32>,
    pub phone: Option<String>,
}

/// Professional as embedded in a `quotes` join; the location is a combined
/// "city, street" string and most profile fields are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedProfessionalRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub profession: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    #[serde(alias = "reviews_count")]
    pub review_count: Option<u32>,
    pub verified: Option<bool>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

impl EmbeddedProfessionalRow {
    /// Stand-in for a quote whose professional join came back empty.
    pub fn bare(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawProfessional {
    Directory(DirectoryRow),
    QuoteEmbed(EmbeddedProfessionalRow),
}

impl RawProfessional {
    pub fn from_json(shape: RecordShape, value: JsonValue) -> Result<Self, NormalizeError> {
        let invalid = |source| NormalizeError::Invalid { shape, source };
        match shape {
            RecordShape::Directory => serde_json::from_value(value)
                .map(Self::Directory)
                .map_err(invalid),
            RecordShape::QuoteEmbed => serde_json::from_value(value)
                .map(Self::QuoteEmbed)
                .map_err(invalid),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Directory(row) => row.id,
            Self::QuoteEmbed(row) => row.id,
        }
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            Self::Directory(_) => RecordShape::Directory,
            Self::QuoteEmbed(_) => RecordShape::QuoteEmbed,
        }
    }
}

/// Field candidates in priority order, flattened from either row shape.
#[derive(Debug, Default)]
struct Candidates<'a> {
    id: Uuid,
    name: [Option<&'a str>; 2],
    profession: [Option<&'a str>; 2],
    city: Option<&'a str>,
    combined_location: Option<&'a str>,
    image: [Option<&'a str>; 2],
    rating: Option<f64>,
    review_count: Option<u32>,
    verified: Option<bool>,
    specialties: Option<&'a [String]>,
    single_specialty: Option<&'a str>,
    region: Option<&'a str>,
    company_name: Option<&'a str>,
    work_hours: Option<&'a str>,
    certifications: Option<&'a [String]>,
    experience_years: Option<u32>,
    founding_year: Option<i32>,
    phone: Option<&'a str>,
}

impl<'a> Candidates<'a> {
    fn from_record(record: &'a RawProfessional) -> Self {
        match record {
            RawProfessional::Directory(row) => Self {
                id: row.id,
                name: [row.name.as_deref(), row.full_name.as_deref()],
                profession: [row.specialty.as_deref(), row.profession.as_deref()],
                city: row.city.as_deref(),
                combined_location: row.location.as_deref(),
                image: [row.image_url.as_deref(), row.image.as_deref()],
                rating: row.rating,
                review_count: row.review_count,
                verified: row.verified,
                specialties: row.specialties.as_deref(),
                single_specialty: row.specialty.as_deref(),
                region: row.region.as_deref(),
                company_name: row.company_name.as_deref(),
                work_hours: row.work_hours.as_deref(),
                certifications: row.certifications.as_deref(),
                experience_years: row.experience_years,
                founding_year: row.founding_year,
                phone: row.phone.as_deref(),
            },
            RawProfessional::QuoteEmbed(row) => Self {
                id: row.id,
                name: [row.name.as_deref(), None],
                profession: [None, row.profession.as_deref()],
                combined_location: row.location.as_deref(),
                image: [None, row.image.as_deref()],
                rating: row.rating,
                review_count: row.review_count,
                verified: row.verified,
                company_name: row.company_name.as_deref(),
                phone: row.phone.as_deref(),
                ..Self::default()
            },
        }
    }
}

fn text_or_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn first_text<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates.iter().copied().find_map(text_or_none)
}

fn first_comma_segment(value: Option<&str>) -> Option<&str> {
    text_or_none(value.and_then(|s| s.split(',').next()))
}

fn non_empty_list(list: Option<&[String]>) -> Option<Vec<String>> {
    let vals = list?
        .iter()
        .filter_map(|s| text_or_none(Some(s.as_str())).map(ToString::to_string))
        .collect::<Vec<_>>();
    if vals.is_empty() {
        None
    } else {
        Some(vals)
    }
}

/// Converts raw professional records into [`ProfessionalView`]s.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    current_year: i32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Utc::now().year())
    }
}

impl Normalizer {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn normalize(&self, record: &RawProfessional) -> ProfessionalView {
        self.normalize_with_rng(record, &mut rand::rng())
    }

    pub fn normalize_with_rng<R: Rng + ?Sized>(
        &self,
        record: &RawProfessional,
        rng: &mut R,
    ) -> ProfessionalView {
        let c = Candidates::from_record(record);

        let name = first_text(&c.name).unwrap_or(NOT_SPECIFIED).to_string();
        let profession = first_text(&c.profession).unwrap_or(NOT_SPECIFIED).to_string();
        let city = text_or_none(c.city).or_else(|| first_comma_segment(c.combined_location));
        let region = text_or_none(c.region)
            .or_else(|| city.and_then(regions::region_of))
            .unwrap_or(NOT_SPECIFIED)
            .to_string();
        let image = first_text(&c.image).unwrap_or(PLACEHOLDER_IMAGE).to_string();
        let specialties = non_empty_list(c.specialties)
            .or_else(|| text_or_none(c.single_specialty).map(|s| vec![s.to_string()]))
            .unwrap_or_default();
        let certifications = non_empty_list(c.certifications).unwrap_or_else(|| {
            DEFAULT_CERTIFICATIONS
                .iter()
                .map(ToString::to_string)
                .collect()
        });
        let experience_years = c
            .experience_years
            .or_else(|| {
                c.founding_year.map(|founded| {
                    self.current_year
                        .checked_sub(founded)
                        .and_then(|years| u32::try_from(years).ok())
                        .unwrap_or(0)
                })
            })
            .unwrap_or_else(|| rng.random_range(FALLBACK_EXPERIENCE_YEARS));

        let company_name = text_or_none(c.company_name)
            .unwrap_or(name.as_str())
            .to_string();

        ProfessionalView {
            id: c.id,
            name,
            company_name,
            profession,
            rating: c.rating.filter(|r| r.is_finite()).unwrap_or(0.0),
            review_count: c.review_count.unwrap_or(0),
            location: city.unwrap_or(NOT_SPECIFIED).to_string(),
            image,
            verified: c.verified.unwrap_or(false),
            specialties,
            region,
            work_hours: text_or_none(c.work_hours)
                .unwrap_or(DEFAULT_WORK_HOURS)
                .to_string(),
            certifications,
            experience_years,
            phone: text_or_none(c.phone)
                .map(format_phone)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        }
    }
}

/// Normalize with the current calendar year and thread-local randomness.
pub fn normalize(record: &RawProfessional) -> ProfessionalView {
    Normalizer::default().normalize(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn id() -> Uuid {
        Uuid::parse_str("0b6f3a52-55b4-4c0e-a1b8-6f7d9a0e1c11").unwrap()
    }

    fn directory(row: DirectoryRow) -> RawProfessional {
        RawProfessional::Directory(row)
    }

    #[test]
    fn id_and_name_only_record_is_fully_populated() {
        let record = directory(DirectoryRow {
            id: id(),
            name: Some("יוסי כהן".into()),
            ..DirectoryRow::default()
        });
        let view = Normalizer::new(2024).normalize_with_rng(&record, &mut StdRng::seed_from_u64(7));

        assert_eq!(view.id, id());
        assert_eq!(view.name, "יוסי כהן");
        assert_eq!(view.company_name, "יוסי כהן");
        assert_eq!(view.profession, NOT_SPECIFIED);
        assert_eq!(view.location, NOT_SPECIFIED);
        assert_eq!(view.region, NOT_SPECIFIED);
        assert_eq!(view.image, PLACEHOLDER_IMAGE);
        assert_eq!(view.work_hours, DEFAULT_WORK_HOURS);
        assert_eq!(view.certifications, vec!["רישיון עסק", "ביטוח מקצועי"]);
        assert_eq!(view.phone, NOT_SPECIFIED);
        assert_eq!(view.rating, 0.0);
        assert_eq!(view.review_count, 0);
        assert!(!view.verified);
        assert!(view.specialties.is_empty());
        assert!(FALLBACK_EXPERIENCE_YEARS.contains(&view.experience_years));
    }

    #[test]
    fn specialty_wins_over_profession_and_blank_values_are_skipped() {
        let record = directory(DirectoryRow {
            id: id(),
            specialty: Some("   ".into()),
            profession: Some("חשמלאי".into()),
            ..DirectoryRow::default()
        });
        assert_eq!(normalize(&record).profession, "חשמלאי");

        let record = directory(DirectoryRow {
            id: id(),
            specialty: Some("אינסטלטור".into()),
            profession: Some("חשמלאי".into()),
            ..DirectoryRow::default()
        });
        let view = normalize(&record);
        assert_eq!(view.profession, "אינסטלטור");
        assert_eq!(view.specialties, vec!["אינסטלטור"]);
    }

    #[test]
    fn city_falls_back_to_first_location_segment_and_derives_region() {
        let record = directory(DirectoryRow {
            id: id(),
            location: Some("תל אביב, רחוב הרצל 5".into()),
            ..DirectoryRow::default()
        });
        let view = normalize(&record);
        assert_eq!(view.location, "תל אביב");
        assert_eq!(view.region, "מרכז");
    }

    #[test]
    fn explicit_region_and_city_take_precedence() {
        let record = directory(DirectoryRow {
            id: id(),
            city: Some("חיפה".into()),
            location: Some("אילת, הנמל".into()),
            region: Some("צפון".into()),
            ..DirectoryRow::default()
        });
        let view = normalize(&record);
        assert_eq!(view.location, "חיפה");
        assert_eq!(view.region, "צפון");
    }

    #[test]
    fn image_url_wins_over_image() {
        let record = directory(DirectoryRow {
            id: id(),
            image_url: Some("https://cdn.example/a.png".into()),
            image: Some("https://cdn.example/b.png".into()),
            ..DirectoryRow::default()
        });
        assert_eq!(normalize(&record).image, "https://cdn.example/a.png");
    }

    #[test]
    fn experience_prefers_explicit_then_founding_year() {
        let normalizer = Normalizer::new(2024);
        let explicit = directory(DirectoryRow {
            id: id(),
            experience_years: Some(3),
            founding_year: Some(1990),
            ..DirectoryRow::default()
        });
        assert_eq!(normalizer.normalize(&explicit).experience_years, 3);

        let founded = directory(DirectoryRow {
            id: id(),
            founding_year: Some(2010),
            ..DirectoryRow::default()
        });
        assert_eq!(normalizer.normalize(&founded).experience_years, 14);

        let future = directory(DirectoryRow {
            id: id(),
            founding_year: Some(2030),
            ..DirectoryRow::default()
        });
        assert_eq!(normalizer.normalize(&future).experience_years, 0);
    }

    #[test]
    fn extreme_founding_years_clamp_to_zero() {
        let normalizer = Normalizer::new(2024);
        for founding_year in [i32::MIN, i32::MAX] {
            let row = directory(DirectoryRow {
                id: id(),
                founding_year: Some(founding_year),
                ..DirectoryRow::default()
            });
            assert_eq!(normalizer.normalize(&row).experience_years, 0);
        }
    }

    #[test]
    fn quote_embed_shape_uses_combined_location_and_formats_phone() {
        let record = RawProfessional::from_json(
            RecordShape::QuoteEmbed,
            json!({
                "id": id(),
                "name": "דנה לוי",
                "profession": "צבעית",
                "location": "באר שבע, שדרות רגר",
                "reviews_count": 12,
                "rating": 4.6,
                "phone": "+972521112233"
            }),
        )
        .unwrap();
        let view = normalize(&record);
        assert_eq!(view.profession, "צבעית");
        assert_eq!(view.location, "באר שבע");
        assert_eq!(view.region, "דרום");
        assert_eq!(view.review_count, 12);
        assert_eq!(view.phone, "052-111-2233");
    }

    #[test]
    fn bare_embed_still_normalizes() {
        let view = normalize(&RawProfessional::QuoteEmbed(EmbeddedProfessionalRow::bare(id())));
        assert_eq!(view.id, id());
        assert_eq!(view.name, NOT_SPECIFIED);
    }

    #[test]
    fn boundary_rejects_wrong_types() {
        let err = RawProfessional::from_json(
            RecordShape::Directory,
            json!({ "id": id(), "rating": "five stars" }),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid directory record"));
    }
}
