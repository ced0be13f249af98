// Aggregates over the normalized rows.
//
// Nothing here mutates the rows; every function returns a fresh summary and
// an empty input gives an empty (or `None`) result.
use crate::types::{
    BudgetCategory, DistributionSummary, GenreRating, GenreSeries, HistogramBin, NormalizedRow,
    PersonRating, Role, Tier,
};
use crate::util::{average, linear_fit, median, mode, pearson, percent_where};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

pub const MIN_GENRE_ENTRIES: usize = 500;
pub const TOP_GENRES: usize = 15;
pub const TREND_WINDOW: RangeInclusive<i32> = 2000..=2020;
pub const CATEGORY_TOP: usize = 5;
pub const PERSONS_TOP: usize = 10;
pub const HISTOGRAM_BINS: usize = 20;

const MIN_BUDGET_RUB: f64 = 50_000.0;
const MIN_FEES_RUB: f64 = 50_000.0;
const MIN_VOTES_KP: f64 = 1_000.0;

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// One row per element of the multi-valued field picked by `keys`.
pub fn explode<'a, R, F, I>(rows: R, keys: F) -> Vec<(&'a str, &'a NormalizedRow)>
where
    R: IntoIterator<Item = &'a NormalizedRow>,
    F: Fn(&'a NormalizedRow) -> I,
    I: IntoIterator<Item = &'a str>,
{
    rows.into_iter()
        .flat_map(|row| keys(row).into_iter().map(move |k| (k, row)))
        .collect()
}

pub fn explode_genres(rows: &[NormalizedRow]) -> Vec<(&str, &NormalizedRow)> {
    explode(rows, |r| r.genres.values())
}

fn people(row: &NormalizedRow, role: Role) -> &[String] {
    match role {
        Role::Actor => &row.actors,
        Role::Director => &row.directors,
    }
}

pub fn explode_people<'a>(
    rows: impl IntoIterator<Item = &'a NormalizedRow>,
    role: Role,
) -> Vec<(&'a str, &'a NormalizedRow)> {
    explode(rows, move |r| people(r, role).iter().map(String::as_str))
}

pub fn ratings_kp(rows: &[NormalizedRow]) -> Vec<f64> {
    rows.iter().map(|r| r.rating_kp).collect()
}

/// Equal-width bins spanning the observed range; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    let width = (max - min) / bins as f64;
    if width == 0.0 {
        return vec![HistogramBin { lower: min, upper: max, count: values.len() }];
    }
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

pub fn distribution_summary(ratings: &[f64]) -> Option<DistributionSummary> {
    Some(DistributionSummary {
        count: ratings.len(),
        mean: average(ratings),
        median: median(ratings.to_vec()),
        mode: mode(ratings)?,
        high_pct: percent_where(ratings, |r| r > 7.0),
        low_pct: percent_where(ratings, |r| r < 5.0),
    })
}

/// Rows usable for the cross-platform comparison.
pub fn rated_on_imdb(rows: &[NormalizedRow]) -> impl Iterator<Item = &NormalizedRow> {
    rows.iter().filter(|r| r.rating_imdb != 0.0)
}

pub fn platform_correlation(rows: &[NormalizedRow]) -> Option<f64> {
    let (kp, imdb): (Vec<f64>, Vec<f64>) = rated_on_imdb(rows)
        .map(|r| (r.rating_kp, r.rating_imdb))
        .unzip();
    pearson(&kp, &imdb)
}

/// Least-squares trend of IMDb against Kinopoisk ratings, as `(slope, intercept)`.
pub fn linear_fit_ratings(rows: &[NormalizedRow]) -> Option<(f64, f64)> {
    let (kp, imdb): (Vec<f64>, Vec<f64>) = rated_on_imdb(rows)
        .map(|r| (r.rating_kp, r.rating_imdb))
        .unzip();
    linear_fit(&kp, &imdb)
}

/// Mean ratings per genre for genres with at least `min_entries` exploded rows,
/// ordered by ascending IMDb mean.
pub fn genre_ratings(rows: &[NormalizedRow], min_entries: usize) -> Vec<GenreRating> {
    let mut groups: HashMap<&str, (Vec<f64>, Vec<f64>)> = HashMap::new();
    for (genre, row) in explode_genres(rows) {
        let e = groups.entry(genre).or_default();
        e.0.push(row.rating_kp);
        e.1.push(row.rating_imdb);
    }
    let mut out: Vec<GenreRating> = groups
        .into_iter()
        .filter(|(_, (kp, _))| kp.len() >= min_entries)
        .map(|(genre, (kp, imdb))| GenreRating {
            genre: genre.to_string(),
            entries: kp.len(),
            avg_kp: average(&kp),
            avg_imdb: average(&imdb),
        })
        .collect();
    out.sort_by(|a, b| cmp_f64(a.avg_imdb, b.avg_imdb).then_with(|| a.genre.cmp(&b.genre)));
    out
}

/// Films per (year, genre) for the `top_n` genres with the most entries.
///
/// Genres are chosen over all years; `window` then restricts the years shown.
/// Series come out by descending total within the shown years.
pub fn genre_trends(
    rows: &[NormalizedRow],
    top_n: usize,
    window: Option<RangeInclusive<i32>>,
) -> Vec<GenreSeries> {
    let mut counts: BTreeMap<(&str, i32), usize> = BTreeMap::new();
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for (genre, row) in explode_genres(rows) {
        let Some(year) = row.year else { continue };
        *counts.entry((genre, year)).or_default() += 1;
        *totals.entry(genre).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(top_n);

    let mut series: Vec<GenreSeries> = ranked
        .into_iter()
        .map(|(genre, _)| {
            let points: Vec<(i32, usize)> = counts
                .range((genre, i32::MIN)..=(genre, i32::MAX))
                .map(|(&(_, year), &n)| (year, n))
                .filter(|(year, _)| window.as_ref().map_or(true, |w| w.contains(year)))
                .collect();
            GenreSeries {
                genre: genre.to_string(),
                total: points.iter().map(|(_, n)| n).sum(),
                points,
            }
        })
        .filter(|s| !s.points.is_empty())
        .collect();
    series.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.genre.cmp(&b.genre)));
    series
}

/// Films with meaningful budget, world fees and Kinopoisk vote count.
pub fn budget_base(rows: &[NormalizedRow]) -> Vec<&NormalizedRow> {
    rows.iter()
        .filter(|r| {
            r.budget_rub.is_some_and(|b| b > MIN_BUDGET_RUB)
                && r.fees_rub_world.is_some_and(|f| f > MIN_FEES_RUB)
                && r.votes_kp.is_some_and(|v| v > MIN_VOTES_KP)
        })
        .collect()
}

/// Bucket a film by budget and world fees. Bounds are strict.
pub fn categorize(budget: f64, fees: f64) -> Option<BudgetCategory> {
    if budget > 1e8 && fees > 1e9 {
        Some(BudgetCategory::HighBudgetHighFees)
    } else if budget > 1e8 && fees < 1e6 {
        Some(BudgetCategory::HighBudgetLowFees)
    } else if budget < 1e6 && fees > 1e7 {
        Some(BudgetCategory::LowBudgetHighFees)
    } else if budget < 1e6 && fees < 1e6 {
        Some(BudgetCategory::LowBudgetLowFees)
    } else {
        None
    }
}

/// Fees minus budget; only meaningful for rows from [`budget_base`].
pub fn fee_budget_diff(row: &NormalizedRow) -> f64 {
    row.fees_rub_world.unwrap_or(0.0) - row.budget_rub.unwrap_or(0.0)
}

/// Up to `top` films per category of the budget base set.
///
/// Films are ordered by fees minus budget: ascending when budget and fees
/// match (both high, both low), descending when they do not.
pub fn budget_categories<'a>(
    base: &[&'a NormalizedRow],
    top: usize,
) -> Vec<(BudgetCategory, Vec<&'a NormalizedRow>)> {
    BudgetCategory::ALL
        .into_iter()
        .map(|category| {
            let mut films: Vec<&NormalizedRow> = base
                .iter()
                .copied()
                .filter(|r| match (r.budget_rub, r.fees_rub_world) {
                    (Some(b), Some(f)) => categorize(b, f) == Some(category),
                    _ => false,
                })
                .collect();
            let descending = matches!(
                category,
                BudgetCategory::HighBudgetLowFees | BudgetCategory::LowBudgetHighFees
            );
            films.sort_by(|a, b| {
                let ord = cmp_f64(fee_budget_diff(a), fee_budget_diff(b));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
            films.truncate(top);
            (category, films)
        })
        .collect()
}

fn in_tier(row: &NormalizedRow, tier: Tier) -> bool {
    match tier {
        Tier::Top => row.rating_kp > 7.5 || row.rating_imdb > 7.5,
        Tier::Bottom => row.rating_kp < 5.5 || row.rating_imdb < 5.5,
    }
}

/// Best (or worst) rated people of one role.
///
/// Only films in the tier count. Ranking is by mean Kinopoisk rating, then
/// mean IMDb rating, then name.
pub fn rank_people(rows: &[NormalizedRow], role: Role, tier: Tier, top: usize) -> Vec<PersonRating> {
    let tiered = rows.iter().filter(|r| in_tier(r, tier));
    let mut groups: HashMap<&str, (Vec<f64>, Vec<f64>)> = HashMap::new();
    for (name, row) in explode_people(tiered, role) {
        let e = groups.entry(name).or_default();
        e.0.push(row.rating_kp);
        e.1.push(row.rating_imdb);
    }
    let mut ranked: Vec<PersonRating> = groups
        .into_iter()
        .map(|(name, (kp, imdb))| PersonRating {
            name: name.to_string(),
            films: kp.len(),
            avg_kp: average(&kp),
            avg_imdb: average(&imdb),
        })
        .collect();
    ranked.sort_by(|a, b| {
        let ord = cmp_f64(a.avg_kp, b.avg_kp).then_with(|| cmp_f64(a.avg_imdb, b.avg_imdb));
        let ord = match tier {
            Tier::Top => ord.reverse(),
            Tier::Bottom => ord,
        };
        ord.then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(top);
    ranked
}
