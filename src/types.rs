use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// Placeholder for a movie with no genre or country information.
pub const UNKNOWN_TAG: &str = "unknown";

/// Decode a field, treating a value of the wrong shape as absent.
///
/// Source records are loosely typed (`"year": "1999"`, `"rating": null`, ...),
/// so one odd field must not reject the whole line.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// One line of the source stream, before any cleaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Option<Value>,
    #[serde(default)]
    pub countries: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<RawRating>,
    #[serde(default, deserialize_with = "lenient")]
    pub votes: Option<RawVotes>,
    #[serde(default, deserialize_with = "lenient")]
    pub budget: Option<RawMoney>,
    #[serde(default, deserialize_with = "lenient")]
    pub fees: Option<RawFees>,
    #[serde(default)]
    pub persons: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRating {
    #[serde(default, deserialize_with = "lenient")]
    pub kp: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub imdb: Option<f64>,
}

/// Vote counts arrive as numbers or numeric strings; coercion happens later.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVotes {
    #[serde(default)]
    pub kp: Option<Value>,
    #[serde(default)]
    pub imdb: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMoney {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFees {
    #[serde(default, deserialize_with = "lenient")]
    pub usa: Option<RawMoney>,
    #[serde(default, deserialize_with = "lenient")]
    pub russia: Option<RawMoney>,
    #[serde(default, deserialize_with = "lenient")]
    pub world: Option<RawMoney>,
}

/// Genre or country information of a normalized row.
#[derive(Debug, Clone, PartialEq)]
pub enum Tags {
    /// Names flattened from a list.
    List(Vec<String>),
    /// A non-list value kept verbatim.
    Scalar(String),
    /// No information in the source.
    Unknown,
}

impl Tags {
    /// Keys a row contributes when exploded: one per list element, otherwise one.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Tags::List(names) => names.iter().map(String::as_str).collect(),
            Tags::Scalar(s) => vec![s.as_str()],
            Tags::Unknown => vec![UNKNOWN_TAG],
        }
    }

    pub fn display(&self) -> String {
        self.values().join(", ")
    }
}

/// A cleaned movie: named, rated on both platforms, money in roubles.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub id: Option<Value>,
    pub name: String,
    pub year: Option<i32>,
    pub genres: Tags,
    pub countries: Tags,
    pub rating_kp: f64,
    pub rating_imdb: f64,
    pub votes_kp: Option<f64>,
    pub votes_imdb: Option<f64>,
    pub budget_rub: Option<f64>,
    pub fees_rub_usa: Option<f64>,
    pub fees_rub_russia: Option<f64>,
    pub fees_rub_world: Option<f64>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_records: usize,
    pub missing_name: usize,
    pub unrated: usize,
    pub kept_rows: usize,
}

// Aggregate outputs.

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub high_pct: f64,
    pub low_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreRating {
    pub genre: String,
    pub entries: usize,
    pub avg_kp: f64,
    pub avg_imdb: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreSeries {
    pub genre: String,
    pub total: usize,
    /// `(year, count)` for the years the genre appears in, ascending.
    pub points: Vec<(i32, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetCategory {
    HighBudgetHighFees,
    HighBudgetLowFees,
    LowBudgetHighFees,
    LowBudgetLowFees,
}

impl BudgetCategory {
    pub const ALL: [BudgetCategory; 4] = [
        BudgetCategory::HighBudgetHighFees,
        BudgetCategory::HighBudgetLowFees,
        BudgetCategory::LowBudgetHighFees,
        BudgetCategory::LowBudgetLowFees,
    ];

    pub fn title(self) -> &'static str {
        match self {
            BudgetCategory::HighBudgetHighFees => "Big budget, big world fees",
            BudgetCategory::HighBudgetLowFees => "Big budget, small world fees",
            BudgetCategory::LowBudgetHighFees => "Small budget, big world fees",
            BudgetCategory::LowBudgetLowFees => "Small budget, small world fees",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Actor,
    Director,
}

impl Role {
    /// Tag used in the source `enProfession` field.
    pub fn tag(self) -> &'static str {
        match self {
            Role::Actor => "actor",
            Role::Director => "director",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonRating {
    pub name: String,
    pub films: usize,
    pub avg_kp: f64,
    pub avg_imdb: f64,
}

// Display rows handed to the report sink and the console.

#[derive(Debug, Tabled, Clone)]
pub struct PersonRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Films")]
    pub films: usize,
    #[tabled(rename = "AvgKp")]
    pub avg_kp: String,
    #[tabled(rename = "AvgImdb")]
    pub avg_imdb: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct BudgetRow {
    #[tabled(rename = "BudgetRub")]
    pub budget_rub: String,
    #[tabled(rename = "FeesWorldRub")]
    pub fees_rub_world: String,
    #[tabled(rename = "VotesKp")]
    pub votes_kp: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CategoryRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Genres")]
    pub genres: String,
    #[tabled(rename = "Year")]
    pub year: String,
    #[tabled(rename = "BudgetRub")]
    pub budget_rub: String,
    #[tabled(rename = "FeesWorldRub")]
    pub fees_rub_world: String,
    #[tabled(rename = "RatingKp")]
    pub rating_kp: String,
    #[tabled(rename = "RatingImdb")]
    pub rating_imdb: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct GenreRatingRow {
    #[tabled(rename = "Genre")]
    pub genre: String,
    #[tabled(rename = "Entries")]
    pub entries: usize,
    #[tabled(rename = "AvgKp")]
    pub avg_kp: String,
    #[tabled(rename = "AvgImdb")]
    pub avg_imdb: String,
}

// Chart data rows written next to the document.

#[derive(Debug, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RatingPair {
    pub rating_kp: f64,
    pub rating_imdb: f64,
}

#[derive(Debug, Serialize)]
pub struct GenreRatingPoint {
    pub genre: String,
    pub platform: &'static str,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BubblePoint {
    pub budget_rub: f64,
    pub fees_rub_world: f64,
    pub votes_kp: f64,
}
