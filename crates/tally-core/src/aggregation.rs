//! Spending aggregation
//!
//! Pure functions over an in-memory list of expenses. The current date is
//! always passed in explicitly; nothing here reads the clock.

use chrono::{Datelike, Duration, Month, NaiveDate};

use crate::models::{Category, CategoryAggregate, DailySpending, Expense, MonthlySummary};

/// Length of the default daily window, in days before `today`
pub const DEFAULT_DAILY_WINDOW_DAYS: i64 = 30;

/// Longest daily series callers should request, in days
pub const MAX_DAILY_WINDOW_DAYS: i64 = 366;

fn in_month(expense: &Expense, month: Month, year: i32) -> bool {
    expense.date.month() == month.number_from_month() && expense.date.year() == year
}

fn current_month(today: NaiveDate) -> Month {
    // month() is always 1..=12
    Month::try_from(today.month() as u8).unwrap_or(Month::January)
}

/// Total spending for a month
///
/// Month and year default to those of `today`.
pub fn monthly_summary(
    expenses: &[Expense],
    month: Option<Month>,
    year: Option<i32>,
    today: NaiveDate,
) -> MonthlySummary {
    let month = month.unwrap_or_else(|| current_month(today));
    let year = year.unwrap_or_else(|| today.year());

    let total = expenses
        .iter()
        .filter(|e| in_month(e, month, year))
        .map(|e| e.amount)
        .sum();

    MonthlySummary {
        total,
        month: month.name().to_string(),
        year,
    }
}

/// Spending per category, largest first
///
/// Expenses are only filtered when a month or a year is given; the missing
/// half then defaults from `today`. Without either, every expense counts.
pub fn aggregate_by_category(
    expenses: &[Expense],
    month: Option<Month>,
    year: Option<i32>,
    today: NaiveDate,
) -> Vec<CategoryAggregate> {
    let window: Option<(Month, i32)> = if month.is_some() || year.is_some() {
        Some((
            month.unwrap_or_else(|| current_month(today)),
            year.unwrap_or_else(|| today.year()),
        ))
    } else {
        None
    };

    // First-seen order, so equal totals keep input order after the stable sort
    let mut totals: Vec<(Category, f64)> = Vec::new();
    for expense in expenses {
        if let Some((month, year)) = window {
            if !in_month(expense, month, year) {
                continue;
            }
        }

        match totals.iter_mut().find(|(c, _)| *c == expense.category) {
            Some((_, total)) => *total += expense.amount,
            None => totals.push((expense.category, expense.amount)),
        }
    }

    let grand_total: f64 = totals.iter().map(|(_, t)| t).sum();

    let mut aggregates: Vec<CategoryAggregate> = totals
        .into_iter()
        .map(|(category, total)| CategoryAggregate {
            category,
            total,
            percentage: if grand_total > 0.0 {
                total / grand_total * 100.0
            } else {
                0.0
            },
        })
        .collect();

    aggregates.sort_by(|a, b| b.total.total_cmp(&a.total));
    aggregates
}

/// Resolve an optional daily range: `end` defaults to `today`, `start` to
/// 30 days before `today`
pub fn daily_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    (
        start.unwrap_or(today - Duration::days(DEFAULT_DAILY_WINDOW_DAYS)),
        end.unwrap_or(today),
    )
}

/// Number of points [`daily_spending`] yields for the range; zero when inverted
pub fn daily_window_len(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> i64 {
    let (start, end) = daily_window(start, end, today);
    if start > end {
        0
    } else {
        (end - start).num_days() + 1
    }
}

/// Day-by-day spending over a closed date range, zero filled
///
/// Defaults follow [`daily_window`]. An inverted range yields no points.
/// The series is not capped here; see [`MAX_DAILY_WINDOW_DAYS`].
pub fn daily_spending(
    expenses: &[Expense],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<DailySpending> {
    let (start, end) = daily_window(start, end, today);

    if start > end {
        return Vec::new();
    }

    let mut points: Vec<DailySpending> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| DailySpending { date, total: 0.0 })
        .collect();

    for expense in expenses {
        if expense.date < start || expense.date > end {
            continue;
        }
        let index = (expense.date - start).num_days() as usize;
        if let Some(point) = points.get_mut(index) {
            point.total += expense.amount;
        }
    }

    points
}

/// Convert a zero-based month index (0 = January) as used by the API
pub fn month_from_index(index: u32) -> Option<Month> {
    u8::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(1))
        .and_then(|n| Month::try_from(n).ok())
}
