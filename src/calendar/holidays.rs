//! Computed holiday calendars, one rule set per exchange.
//!
//! Full-day market closures only; half-days (e.g. Euronext Dec 24) count
//! as trading days. Hong Kong lunar new year comes from a date table —
//! years outside it fall back to the fixed-date holidays alone.

use super::exchange::Exchange;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// All closure dates for `exchange` in `year`. Order is unspecified; dates
/// already on a weekend are harmless.
pub fn holidays(exchange: Exchange, year: i32) -> Vec<NaiveDate> {
    match exchange {
        Exchange::Nyse => nyse(year),
        Exchange::Stockholm => stockholm(year),
        Exchange::London => london(year),
        Exchange::Frankfurt => frankfurt(year),
        Exchange::Paris => paris(year),
        Exchange::Tokyo => tokyo(year),
        Exchange::HongKong => hong_kong(year),
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Easter Sunday by the anonymous Gregorian computus.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    date(year, month as u32, day as u32)
}

fn good_friday(year: i32) -> NaiveDate {
    easter_sunday(year) - Duration::days(2)
}

fn easter_monday(year: i32) -> NaiveDate {
    easter_sunday(year) + Duration::days(1)
}

/// The n-th given weekday of a month (1-based).
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = date(year, month, 1);
    let offset = (7 + weekday.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        % 7;
    first + Duration::days(offset + 7 * (n as i64 - 1))
}

/// The last given weekday of a month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let first_next = if month == 12 {
        date(year + 1, 1, 1)
    } else {
        date(year, month + 1, 1)
    };
    let mut day = first_next - Duration::days(1);
    while day.weekday() != weekday {
        day -= Duration::days(1);
    }
    day
}

/// US observance shift: Saturday → preceding Friday, Sunday → following Monday.
fn observed_us(day: NaiveDate) -> NaiveDate {
    match day.weekday() {
        Weekday::Sat => day - Duration::days(1),
        Weekday::Sun => day + Duration::days(1),
        _ => day,
    }
}

/// For each holiday landing on a Sunday, add the following Monday in lieu.
fn add_sunday_substitutes(days: &mut Vec<NaiveDate>) {
    let subs: Vec<NaiveDate> = days
        .iter()
        .filter(|d| d.weekday() == Weekday::Sun)
        .map(|d| *d + Duration::days(1))
        .collect();
    days.extend(subs);
}

fn nyse(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(11);

    // New Year's Day is not observed when Jan 1 falls on a Saturday.
    match date(year, 1, 1).weekday() {
        Weekday::Sat => {}
        Weekday::Sun => days.push(date(year, 1, 2)),
        _ => days.push(date(year, 1, 1)),
    }

    days.push(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr. Day
    days.push(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    days.push(good_friday(year));
    days.push(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
    if year >= 2022 {
        days.push(observed_us(date(year, 6, 19))); // Juneteenth
    }
    days.push(observed_us(date(year, 7, 4))); // Independence Day
    days.push(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    days.push(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    days.push(observed_us(date(year, 12, 25))); // Christmas
    days
}

fn stockholm(year: i32) -> Vec<NaiveDate> {
    // Midsummer Eve is the Friday between Jun 19 and Jun 25.
    let mut midsummer_eve = date(year, 6, 19);
    while midsummer_eve.weekday() != Weekday::Fri {
        midsummer_eve += Duration::days(1);
    }

    vec![
        date(year, 1, 1),
        date(year, 1, 6), // Epiphany
        good_friday(year),
        easter_monday(year),
        date(year, 5, 1),
        easter_sunday(year) + Duration::days(39), // Ascension Day
        date(year, 6, 6),                         // National Day
        midsummer_eve,
        date(year, 12, 24),
        date(year, 12, 25),
        date(year, 12, 26),
        date(year, 12, 31),
    ]
}

fn london(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(8);

    let new_year = date(year, 1, 1);
    days.push(match new_year.weekday() {
        Weekday::Sat => date(year, 1, 3),
        Weekday::Sun => date(year, 1, 2),
        _ => new_year,
    });

    days.push(good_friday(year));
    days.push(easter_monday(year));
    days.push(nth_weekday(year, 5, Weekday::Mon, 1)); // Early May bank holiday
    days.push(last_weekday(year, 5, Weekday::Mon)); // Spring bank holiday
    days.push(last_weekday(year, 8, Weekday::Mon)); // Summer bank holiday

    // Christmas / Boxing Day with substitute days around weekends.
    match date(year, 12, 25).weekday() {
        Weekday::Fri => {
            days.push(date(year, 12, 25));
            days.push(date(year, 12, 28));
        }
        Weekday::Sat => {
            days.push(date(year, 12, 27));
            days.push(date(year, 12, 28));
        }
        Weekday::Sun => {
            days.push(date(year, 12, 26));
            days.push(date(year, 12, 27));
        }
        _ => {
            days.push(date(year, 12, 25));
            days.push(date(year, 12, 26));
        }
    }
    days
}

fn frankfurt(year: i32) -> Vec<NaiveDate> {
    vec![
        date(year, 1, 1),
        good_friday(year),
        easter_monday(year),
        date(year, 5, 1),
        easter_sunday(year) + Duration::days(50), // Whit Monday
        date(year, 12, 24),
        date(year, 12, 25),
        date(year, 12, 26),
        date(year, 12, 31),
    ]
}

fn paris(year: i32) -> Vec<NaiveDate> {
    vec![
        date(year, 1, 1),
        good_friday(year),
        easter_monday(year),
        date(year, 5, 1),
        date(year, 12, 25),
        date(year, 12, 26),
    ]
}

/// Gregorian day-of-month of the March equinox (valid 1980–2099).
fn vernal_equinox_day(year: i32) -> u32 {
    let y = (year - 1980) as f64;
    (20.8431 + 0.242194 * y - (y / 4.0).floor()).floor() as u32
}

/// Gregorian day-of-month of the September equinox (valid 1980–2099).
fn autumnal_equinox_day(year: i32) -> u32 {
    let y = (year - 1980) as f64;
    (23.2488 + 0.242194 * y - (y / 4.0).floor()).floor() as u32
}

fn tokyo(year: i32) -> Vec<NaiveDate> {
    let mut days = vec![
        date(year, 1, 1),
        date(year, 1, 2),
        date(year, 1, 3), // New Year market close
        nth_weekday(year, 1, Weekday::Mon, 2), // Coming of Age Day
        date(year, 2, 11), // National Foundation Day
        date(year, 2, 23), // Emperor's Birthday
        date(year, 3, vernal_equinox_day(year)),
        date(year, 4, 29), // Showa Day
        date(year, 5, 3),
        date(year, 5, 4),
        date(year, 5, 5), // Golden Week
        nth_weekday(year, 7, Weekday::Mon, 3), // Marine Day
        date(year, 8, 11), // Mountain Day
        nth_weekday(year, 9, Weekday::Mon, 3), // Respect for the Aged Day
        date(year, 9, autumnal_equinox_day(year)),
        nth_weekday(year, 10, Weekday::Mon, 2), // Sports Day
        date(year, 11, 3),  // Culture Day
        date(year, 11, 23), // Labor Thanksgiving Day
        date(year, 12, 31), // Exchange holiday
    ];
    add_sunday_substitutes(&mut days);
    days
}

/// First day of the lunar new year, from a fixed table.
fn lunar_new_year(year: i32) -> Option<NaiveDate> {
    let (month, day) = match year {
        2010 => (2, 14),
        2011 => (2, 3),
        2012 => (1, 23),
        2013 => (2, 10),
        2014 => (1, 31),
        2015 => (2, 19),
        2016 => (2, 8),
        2017 => (1, 28),
        2018 => (2, 16),
        2019 => (2, 5),
        2020 => (1, 25),
        2021 => (2, 12),
        2022 => (2, 1),
        2023 => (1, 22),
        2024 => (2, 10),
        2025 => (1, 29),
        2026 => (2, 17),
        2027 => (2, 6),
        2028 => (1, 26),
        2029 => (2, 13),
        2030 => (2, 3),
        _ => return None,
    };
    Some(date(year, month, day))
}

fn hong_kong(year: i32) -> Vec<NaiveDate> {
    let mut days = vec![
        date(year, 1, 1),
        good_friday(year),
        easter_monday(year),
        date(year, 5, 1),
        date(year, 7, 1),  // HKSAR Establishment Day
        date(year, 10, 1), // National Day
        date(year, 12, 25),
        date(year, 12, 26),
    ];
    if let Some(cny) = lunar_new_year(year) {
        days.push(cny);
        days.push(cny + Duration::days(1));
        days.push(cny + Duration::days(2));
    }
    add_sunday_substitutes(&mut days);
    days
}
