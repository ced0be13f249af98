// Normalizer: raw stream records -> flat, typed rows ready for aggregation.
//
// Every step is a pure function over one record. Missing or ill-typed inputs
// become `None` and are either tolerated or filtered out, never errors.
use crate::types::{LoadReport, NormalizedRow, RawMoney, RawRecord, Role, Tags};
use crate::util::coerce_numeric;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Fixed conversion rates into roubles.
static EXCHANGE_RATES: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| HashMap::from([("USD", 90.0), ("EUR", 100.0), ("RUB", 1.0)]));

/// Rate for `currency`; unknown codes pass amounts through unchanged.
pub fn rate(currency: &str) -> f64 {
    EXCHANGE_RATES.get(currency).copied().unwrap_or(1.0)
}

/// Convert an amount into roubles. Undefined if either input is undefined.
pub fn convert(amount: Option<f64>, currency: Option<&str>) -> Option<f64> {
    Some(amount? * rate(currency?))
}

fn convert_money(money: Option<&RawMoney>) -> Option<f64> {
    let money = money?;
    convert(coerce_numeric(money.value.as_ref()), money.currency.as_deref())
        .filter(|v| v.is_finite())
}

/// Names of the people whose profession matches `role_tag`, in source order.
///
/// `enProfession` may be a list of tags or a single string; anything that is
/// not a list of persons yields no names.
pub fn extract_roles(persons: Option<&Value>, role_tag: &str) -> Vec<String> {
    let Some(Value::Array(persons)) = persons else {
        return Vec::new();
    };
    persons
        .iter()
        .filter(|p| has_profession(p.get("enProfession"), role_tag))
        .filter_map(|p| p.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn has_profession(profession: Option<&Value>, role_tag: &str) -> bool {
    match profession {
        Some(Value::Array(tags)) => tags.iter().any(|t| t.as_str() == Some(role_tag)),
        Some(Value::String(s)) => s.contains(role_tag),
        _ => false,
    }
}

/// Flatten a genre/country field.
///
/// A list becomes the names of its `{name: ..}` entries (plain strings are
/// taken as names already). A non-list value is kept verbatim. An absent
/// field is `None`; the sentinel is substituted later, during cleaning.
pub fn flatten_tags(field: Option<&Value>) -> Option<Tags> {
    match field? {
        Value::Null => None,
        Value::Array(items) => Some(Tags::List(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => other.get("name").and_then(Value::as_str).map(str::to_string),
                })
                .collect(),
        )),
        Value::String(s) => Some(Tags::Scalar(s.clone())),
        other => Some(Tags::Scalar(other.to_string())),
    }
}

/// One record projected onto the output columns, before row filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub year: Option<i32>,
    pub genres: Option<Tags>,
    pub countries: Option<Tags>,
    pub rating_kp: Option<f64>,
    pub rating_imdb: Option<f64>,
    pub votes_kp: Option<Value>,
    pub votes_imdb: Option<f64>,
    pub budget_rub: Option<f64>,
    pub fees_rub_usa: Option<f64>,
    pub fees_rub_russia: Option<f64>,
    pub fees_rub_world: Option<f64>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

/// Flatten, convert and project one record.
pub fn project(record: RawRecord) -> ProjectedRow {
    let rating = record.rating.unwrap_or_default();
    let votes = record.votes.unwrap_or_default();
    let fees = record.fees.unwrap_or_default();
    ProjectedRow {
        id: record.id,
        name: record.name,
        year: record.year,
        genres: flatten_tags(record.genres.as_ref()),
        countries: flatten_tags(record.countries.as_ref()),
        rating_kp: rating.kp,
        rating_imdb: rating.imdb,
        votes_kp: votes.kp,
        votes_imdb: coerce_numeric(votes.imdb.as_ref()),
        budget_rub: convert_money(record.budget.as_ref()),
        fees_rub_usa: convert_money(fees.usa.as_ref()),
        fees_rub_russia: convert_money(fees.russia.as_ref()),
        fees_rub_world: convert_money(fees.world.as_ref()),
        actors: extract_roles(record.persons.as_ref(), Role::Actor.tag()),
        directors: extract_roles(record.persons.as_ref(), Role::Director.tag()),
    }
}

/// Why a projected row did not survive cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingName,
    Unrated,
}

/// Drop unnamed or unrated rows and fill the sentinel defaults.
pub fn clean(row: ProjectedRow) -> Result<NormalizedRow, Rejection> {
    let votes_kp = coerce_numeric(row.votes_kp.as_ref());
    let name = row
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or(Rejection::MissingName)?;
    let genres = row.genres.unwrap_or(Tags::Unknown);
    let countries = row.countries.unwrap_or(Tags::Unknown);
    let (rating_kp, rating_imdb) = match (row.rating_kp, row.rating_imdb) {
        (Some(kp), Some(imdb)) if kp > 0.0 && imdb > 0.0 => (kp, imdb),
        _ => return Err(Rejection::Unrated),
    };
    Ok(NormalizedRow {
        id: row.id,
        name,
        year: row.year,
        genres,
        countries,
        rating_kp,
        rating_imdb,
        votes_kp,
        votes_imdb: row.votes_imdb,
        budget_rub: row.budget_rub,
        fees_rub_usa: row.fees_rub_usa,
        fees_rub_russia: row.fees_rub_russia,
        fees_rub_world: row.fees_rub_world,
        actors: row.actors,
        directors: row.directors,
    })
}

/// Normalize every record, keeping input order among the survivors.
pub fn normalize(records: Vec<RawRecord>) -> (Vec<NormalizedRow>, LoadReport) {
    let mut report = LoadReport {
        total_records: records.len(),
        ..LoadReport::default()
    };
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        match clean(project(record)) {
            Ok(row) => rows.push(row),
            Err(Rejection::MissingName) => report.missing_name += 1,
            Err(Rejection::Unrated) => report.unrated += 1,
        }
    }
    report.kept_rows = rows.len();
    debug!(?report, "normalization finished");
    info!(
        kept = report.kept_rows,
        total = report.total_records,
        "records normalized"
    );
    (rows, report)
}
