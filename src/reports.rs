// Report sections.
//
// Each section computes its aggregate, writes the chart data file under the
// chart directory and emits headings, text, tables and the chart reference to
// the sink. Sections are independent of one another; only the sink order
// matters.
use crate::analysis::{
    budget_base, budget_categories, distribution_summary, genre_ratings, genre_trends, histogram,
    linear_fit_ratings, platform_correlation, rank_people, rated_on_imdb, ratings_kp, CATEGORY_TOP,
    HISTOGRAM_BINS, MIN_GENRE_ENTRIES, PERSONS_TOP, TOP_GENRES, TREND_WINDOW,
};
use crate::error::Result;
use crate::output::{emit_table, write_csv, DisplaySize, ReportSink};
use crate::types::{
    BubblePoint, BudgetRow, CategoryRow, GenreRatingPoint, GenreRatingRow, GenreSeries,
    NormalizedRow, PersonRating, PersonRow, RatingPair, Role, Tier, TrendPoint,
};
use crate::util::{format_int, format_number, format_optional};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RATINGS_CHART: &str = "ratings_distribution.csv";
pub const COMPARISON_CHART: &str = "comparison_ratings.csv";
pub const GENRE_RATINGS_CHART: &str = "genre_ratings_analysis.csv";
pub const GENRE_TRENDS_CHART: &str = "genre_trends_over_time.csv";
pub const TOP_GENRE_TRENDS_CHART: &str = "top_genre_trends.csv";
pub const BUBBLE_CHART: &str = "bubble_chart_budget_vs_fees.csv";

/// Rows of the filtered budget set shown before the bubble chart.
const BUDGET_PREVIEW_ROWS: usize = 5;

const CHART_SIZE: DisplaySize = DisplaySize::width(6.0);
const HISTOGRAM_SIZE: DisplaySize = DisplaySize {
    width: 5.5,
    height: Some(3.3),
};

/// Emit the full report: header, then every section in a fixed order.
pub fn write_report(
    rows: &[NormalizedRow],
    sink: &mut dyn ReportSink,
    chart_dir: &Path,
    generated: NaiveDate,
) -> Result<()> {
    sink.heading("Movie ratings report", 1);
    sink.paragraph(&format!(
        "Generated on {} from {} films.",
        generated.format("%Y-%m-%d"),
        format_int(rows.len())
    ));
    ratings_distribution(rows, sink, chart_dir)?;
    compare_platforms(rows, sink, chart_dir)?;
    ratings_by_genre(rows, sink, chart_dir)?;
    genre_popularity(rows, sink, chart_dir)?;
    genre_popularity_window(rows, sink, chart_dir)?;
    budgets_vs_fees(rows, sink, chart_dir)?;
    budget_fee_categories(rows, sink);
    people_section(rows, sink, Tier::Top);
    people_section(rows, sink, Tier::Bottom);
    Ok(())
}

fn chart(sink: &mut dyn ReportSink, path: PathBuf, size: DisplaySize) {
    debug!(path = %path.display(), "chart data written");
    sink.image(&path, size);
}

pub fn ratings_distribution(rows: &[NormalizedRow], sink: &mut dyn ReportSink, chart_dir: &Path) -> Result<()> {
    let ratings = ratings_kp(rows);
    sink.heading("Kinopoisk rating distribution", 1);
    let Some(summary) = distribution_summary(&ratings) else {
        sink.paragraph("No rated films to summarize.");
        return Ok(());
    };
    sink.paragraph(&format!("Mean rating: {:.2}", summary.mean));
    sink.paragraph(&format!("Median rating: {:.2}", summary.median));
    sink.paragraph(&format!("Modal rating: {:.2}", summary.mode));
    sink.paragraph(&format!("Share of high ratings (above 7): {:.2}%", summary.high_pct));
    sink.paragraph(&format!("Share of low ratings (below 5): {:.2}%", summary.low_pct));

    let path = chart_dir.join(RATINGS_CHART);
    write_csv(&path, &histogram(&ratings, HISTOGRAM_BINS))?;
    sink.heading("Rating histogram", 2);
    chart(sink, path, HISTOGRAM_SIZE);
    Ok(())
}

pub fn compare_platforms(rows: &[NormalizedRow], sink: &mut dyn ReportSink, chart_dir: &Path) -> Result<()> {
    sink.heading("Kinopoisk and IMDb ratings compared", 1);
    match platform_correlation(rows) {
        Some(r) => sink.paragraph(&format!(
            "Pearson correlation between Kinopoisk and IMDb ratings: {:.2}",
            r
        )),
        None => sink.paragraph("Not enough films rated on both platforms to correlate."),
    }
    if let Some((slope, intercept)) = linear_fit_ratings(rows) {
        sink.paragraph(&format!(
            "Trend line: imdb = {:.2} * kinopoisk + {:.2}",
            slope, intercept
        ));
    }
    sink.paragraph("The chart below plots both ratings of every film against each other:");

    let pairs: Vec<RatingPair> = rated_on_imdb(rows)
        .map(|r| RatingPair {
            rating_kp: r.rating_kp,
            rating_imdb: r.rating_imdb,
        })
        .collect();
    let path = chart_dir.join(COMPARISON_CHART);
    write_csv(&path, &pairs)?;
    chart(sink, path, CHART_SIZE);
    Ok(())
}

pub fn ratings_by_genre(rows: &[NormalizedRow], sink: &mut dyn ReportSink, chart_dir: &Path) -> Result<()> {
    sink.heading("Average ratings by genre", 1);
    sink.paragraph(&format!(
        "Mean Kinopoisk and IMDb ratings for genres with at least {} films.",
        MIN_GENRE_ENTRIES
    ));
    let genres = genre_ratings(rows, MIN_GENRE_ENTRIES);
    if genres.is_empty() {
        sink.paragraph("No genre reaches the minimum number of films.");
        return Ok(());
    }
    let table: Vec<GenreRatingRow> = genres
        .iter()
        .map(|g| GenreRatingRow {
            genre: g.genre.clone(),
            entries: g.entries,
            avg_kp: format_number(g.avg_kp, 2),
            avg_imdb: format_number(g.avg_imdb, 2),
        })
        .collect();
    emit_table(sink, &table);

    let points: Vec<GenreRatingPoint> = genres
        .iter()
        .flat_map(|g| {
            [
                GenreRatingPoint { genre: g.genre.clone(), platform: "Kinopoisk", value: g.avg_kp },
                GenreRatingPoint { genre: g.genre.clone(), platform: "IMDb", value: g.avg_imdb },
            ]
        })
        .collect();
    let path = chart_dir.join(GENRE_RATINGS_CHART);
    write_csv(&path, &points)?;
    sink.paragraph("The chart below shows the mean ratings per genre:");
    chart(sink, path, CHART_SIZE);
    Ok(())
}

fn trend_points(series: &[GenreSeries]) -> Vec<TrendPoint> {
    series
        .iter()
        .flat_map(|s| {
            s.points.iter().map(|&(year, count)| TrendPoint {
                year,
                genre: s.genre.clone(),
                count,
            })
        })
        .collect()
}

fn genre_order(series: &[GenreSeries]) -> String {
    series
        .iter()
        .map(|s| format!("{} ({})", s.genre, format_int(s.total)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn genre_popularity(rows: &[NormalizedRow], sink: &mut dyn ReportSink, chart_dir: &Path) -> Result<()> {
    sink.heading("Genre popularity over time", 1);
    sink.paragraph(&format!(
        "How the number of films in the top {} genres changed over the years.",
        TOP_GENRES
    ));
    let series = genre_trends(rows, TOP_GENRES, None);
    if series.is_empty() {
        sink.paragraph("No dated films to chart.");
        return Ok(());
    }
    sink.paragraph(&format!("Genres by number of films: {}.", genre_order(&series)));
    let path = chart_dir.join(GENRE_TRENDS_CHART);
    write_csv(&path, &trend_points(&series))?;
    sink.paragraph(&format!("The chart below shows the top {} genres by year:", TOP_GENRES));
    chart(sink, path, CHART_SIZE);
    Ok(())
}

pub fn genre_popularity_window(rows: &[NormalizedRow], sink: &mut dyn ReportSink, chart_dir: &Path) -> Result<()> {
    let (from, to) = (*TREND_WINDOW.start(), *TREND_WINDOW.end());
    sink.heading(
        &format!("Top {} genre popularity from {} to {}", TOP_GENRES, from, to),
        1,
    );
    sink.paragraph(&format!(
        "Number of films per year for the top {} genres between {} and {}.",
        TOP_GENRES, from, to
    ));
    let series = genre_trends(rows, TOP_GENRES, Some(TREND_WINDOW));
    if series.is_empty() {
        sink.paragraph("No films in this period.");
        return Ok(());
    }
    let path = chart_dir.join(TOP_GENRE_TRENDS_CHART);
    write_csv(&path, &trend_points(&series))?;
    sink.paragraph("Genre popularity by year:");
    chart(sink, path, CHART_SIZE);
    Ok(())
}

pub fn budgets_vs_fees(rows: &[NormalizedRow], sink: &mut dyn ReportSink, chart_dir: &Path) -> Result<()> {
    sink.heading("Budgets and world fees", 1);
    sink.paragraph(
        "Films with a budget and world fees above 50,000 RUB and more than 1,000 \
         Kinopoisk votes.",
    );
    let base = budget_base(rows);
    sink.heading("Filtered films (first rows)", 2);
    let table: Vec<BudgetRow> = base
        .iter()
        .take(BUDGET_PREVIEW_ROWS)
        .map(|r| BudgetRow {
            budget_rub: format_optional(r.budget_rub, 0),
            fees_rub_world: format_optional(r.fees_rub_world, 0),
            votes_kp: format_optional(r.votes_kp, 0),
        })
        .collect();
    emit_table(sink, &table);

    let bubbles: Vec<BubblePoint> = base
        .iter()
        .filter_map(|r| {
            Some(BubblePoint {
                budget_rub: r.budget_rub?,
                fees_rub_world: r.fees_rub_world?,
                votes_kp: r.votes_kp?,
            })
        })
        .collect();
    let path = chart_dir.join(BUBBLE_CHART);
    write_csv(&path, &bubbles)?;
    sink.heading("Bubble chart", 2);
    sink.paragraph("Budget against world fees; bubble size follows the Kinopoisk vote count.");
    chart(sink, path, CHART_SIZE);
    Ok(())
}

pub fn budget_fee_categories(rows: &[NormalizedRow], sink: &mut dyn ReportSink) {
    sink.heading("Budget and fee categories", 1);
    let base = budget_base(rows);
    for (category, films) in budget_categories(&base, CATEGORY_TOP) {
        sink.heading(category.title(), 2);
        let table: Vec<CategoryRow> = films
            .iter()
            .map(|r| CategoryRow {
                name: r.name.clone(),
                genres: r.genres.display(),
                year: r.year.map(|y| y.to_string()).unwrap_or_default(),
                budget_rub: format_optional(r.budget_rub, 0),
                fees_rub_world: format_optional(r.fees_rub_world, 0),
                rating_kp: format_number(r.rating_kp, 1),
                rating_imdb: format_number(r.rating_imdb, 1),
            })
            .collect();
        emit_table(sink, &table);
    }
}

pub fn person_rows(people: &[PersonRating]) -> Vec<PersonRow> {
    people
        .iter()
        .map(|p| PersonRow {
            name: p.name.clone(),
            films: p.films,
            avg_kp: format_number(p.avg_kp, 2),
            avg_imdb: format_number(p.avg_imdb, 2),
        })
        .collect()
}

pub fn people_section(rows: &[NormalizedRow], sink: &mut dyn ReportSink, tier: Tier) {
    let (title, adjective) = match tier {
        Tier::Top => ("Best rated actors and directors", "highest"),
        Tier::Bottom => ("Actors and directors with low ratings", "lowest"),
    };
    sink.heading(title, 1);
    for (role, plural) in [(Role::Actor, "actors"), (Role::Director, "directors")] {
        sink.heading(
            &format!("Top {} {} with the {} ratings", PERSONS_TOP, plural, adjective),
            2,
        );
        let ranked = rank_people(rows, role, tier, PERSONS_TOP);
        emit_table(sink, &person_rows(&ranked));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Block, MarkdownDocument};
    use crate::types::Tags;
    use std::fs;
    use tempfile::tempdir;

    fn film(name: &str, kp: f64, imdb: f64, year: i32, genre: &str, actor: &str) -> NormalizedRow {
        NormalizedRow {
            id: None,
            name: name.to_string(),
            year: Some(year),
            genres: Tags::List(vec![genre.to_string()]),
            countries: Tags::Unknown,
            rating_kp: kp,
            rating_imdb: imdb,
            votes_kp: Some(5_000.0),
            votes_imdb: None,
            budget_rub: Some(2e8),
            fees_rub_world: Some(2e9),
            fees_rub_usa: None,
            fees_rub_russia: None,
            actors: vec![actor.to_string()],
            directors: vec![format!("{} director", name)],
        }
    }

    fn films() -> Vec<NormalizedRow> {
        vec![
            film("Film 1", 6.5, 6.0, 2001, "Drama", "Actor 1"),
            film("Film 2", 7.8, 7.5, 2002, "Comedy", "Actor 3"),
            film("Film 3", 8.2, 8.0, 2003, "Action", "Actor 4"),
            film("Film 4", 5.4, 5.2, 2004, "Drama", "Actor 6"),
            film("Film 5", 4.3, 4.1, 2005, "Horror", "Actor 1"),
            film("Film 6", 9.0, 8.7, 2006, "Action", "Actor 2"),
        ]
    }

    fn headings(doc: &MarkdownDocument, level: usize) -> Vec<String> {
        doc.blocks()
            .iter()
            .filter_map(|b| match b {
                Block::Heading { text, level: l } if *l == level => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn paragraphs(doc: &MarkdownDocument) -> Vec<String> {
        doc.blocks()
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn distribution_section_reports_summary_and_histogram() {
        let dir = tempdir().unwrap();
        let mut doc = MarkdownDocument::new();
        ratings_distribution(&films(), &mut doc, dir.path()).unwrap();
        assert_eq!(headings(&doc, 1), vec!["Kinopoisk rating distribution"]);
        assert_eq!(headings(&doc, 2), vec!["Rating histogram"]);
        let text = paragraphs(&doc);
        assert!(text.contains(&"Mean rating: 6.87".to_string()));
        assert!(text.contains(&"Share of high ratings (above 7): 50.00%".to_string()));
        assert!(matches!(doc.blocks().last(), Some(Block::Image { .. })));
        let csv = fs::read_to_string(dir.path().join(RATINGS_CHART)).unwrap();
        assert_eq!(csv.lines().count(), HISTOGRAM_BINS + 1);
    }

    #[test]
    fn empty_dataset_produces_sections_without_charts() {
        let dir = tempdir().unwrap();
        let mut doc = MarkdownDocument::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        write_report(&[], &mut doc, dir.path(), date).unwrap();
        assert!(paragraphs(&doc).contains(&"No rated films to summarize.".to_string()));
        assert_eq!(paragraphs(&doc)[0], "Generated on 2024-05-01 from 0 films.");
        assert!(!dir.path().join(RATINGS_CHART).exists());
    }

    #[test]
    fn full_report_keeps_section_order() {
        let dir = tempdir().unwrap();
        let mut doc = MarkdownDocument::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        write_report(&films(), &mut doc, dir.path(), date).unwrap();
        assert_eq!(
            headings(&doc, 1),
            vec![
                "Movie ratings report",
                "Kinopoisk rating distribution",
                "Kinopoisk and IMDb ratings compared",
                "Average ratings by genre",
                "Genre popularity over time",
                "Top 15 genre popularity from 2000 to 2020",
                "Budgets and world fees",
                "Budget and fee categories",
                "Best rated actors and directors",
                "Actors and directors with low ratings",
            ]
        );
        for name in [
            RATINGS_CHART,
            COMPARISON_CHART,
            GENRE_TRENDS_CHART,
            TOP_GENRE_TRENDS_CHART,
            BUBBLE_CHART,
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        // six films never reach the per-genre minimum
        assert!(!dir.path().join(GENRE_RATINGS_CHART).exists());
    }

    #[test]
    fn people_tables_hold_display_ready_cells() {
        let mut doc = MarkdownDocument::new();
        people_section(&films(), &mut doc, Tier::Top);
        assert_eq!(
            headings(&doc, 2),
            vec![
                "Top 10 actors with the highest ratings",
                "Top 10 directors with the highest ratings",
            ]
        );
        let tables: Vec<&Block> = doc
            .blocks()
            .iter()
            .filter(|b| matches!(b, Block::Table { .. }))
            .collect();
        assert_eq!(tables.len(), 2);
        let Block::Table { header, rows } = tables[0] else { unreachable!() };
        assert_eq!(header, &vec!["Name", "Films", "AvgKp", "AvgImdb"]);
        assert_eq!(rows[0], vec!["Actor 2", "1", "9.00", "8.70"]);
    }

    #[test]
    fn budget_preview_shows_first_rows_only() {
        let dir = tempdir().unwrap();
        let mut doc = MarkdownDocument::new();
        let mut rows = films();
        rows.extend(films());
        budgets_vs_fees(&rows, &mut doc, dir.path()).unwrap();
        let Some(Block::Table { rows: preview, .. }) =
            doc.blocks().iter().find(|b| matches!(b, Block::Table { .. }))
        else {
            panic!("expected the preview table");
        };
        assert_eq!(preview.len(), BUDGET_PREVIEW_ROWS);
        let bubbles = fs::read_to_string(dir.path().join(BUBBLE_CHART)).unwrap();
        assert_eq!(bubbles.lines().count(), rows.len() + 1);
    }

    #[test]
    fn categories_section_lists_every_bucket() {
        let mut doc = MarkdownDocument::new();
        budget_fee_categories(&films(), &mut doc);
        assert_eq!(headings(&doc, 2).len(), 4);
        let Some(Block::Table { rows, .. }) = doc.blocks().get(2) else {
            panic!("expected the first category table");
        };
        // every film is big budget / big fees with the same diff; input order is kept
        assert_eq!(rows.len(), CATEGORY_TOP);
        assert_eq!(rows[0][0], "Film 1");
        assert_eq!(rows[0][3], "200,000,000");
    }
}
