/*
 *  market.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Exchange trading calendars: sessions, weekends, holidays, early closes
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("unknown market: {0}")]
    UnknownMarket(String),
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Trading calendar lookup.
pub trait MarketCalendar: Send + Sync {
    /// Whether `market` is in session at instant `at`.
    ///
    /// `timezone` is the caller's zone and is validated, the session itself
    /// is evaluated on the exchange's own local date.
    fn is_open_at(&self, market: &str, timezone: &str, at: DateTime<Utc>) -> Result<bool, MarketError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Holidays {
    /// NYSE/NASDAQ rules with observance and early closes
    Us,
    /// England and Wales bank holidays
    Uk,
    /// New Year's Day and Christmas Day only
    Basic,
}

/// One exchange: its zone, sessions and holiday rules.
#[derive(Debug, Clone, Copy)]
pub struct Exchange {
    pub name: &'static str,
    aliases: &'static [&'static str],
    pub tz: Tz,
    /// (open, close) local times, close exclusive
    sessions: &'static [(u32, u32, u32, u32)],
    holidays: Holidays,
}

static EXCHANGES: &[Exchange] = &[
    Exchange { name: "NYSE", aliases: &["XNYS"], tz: chrono_tz::America::New_York, sessions: &[(9, 30, 16, 0)], holidays: Holidays::Us },
    Exchange { name: "NASDAQ", aliases: &["XNAS"], tz: chrono_tz::America::New_York, sessions: &[(9, 30, 16, 0)], holidays: Holidays::Us },
    Exchange { name: "TSX", aliases: &["XTSE"], tz: chrono_tz::America::Toronto, sessions: &[(9, 30, 16, 0)], holidays: Holidays::Basic },
    Exchange { name: "LSE", aliases: &["XLON"], tz: chrono_tz::Europe::London, sessions: &[(8, 0, 16, 30)], holidays: Holidays::Uk },
    Exchange { name: "XETRA", aliases: &["XETR"], tz: chrono_tz::Europe::Berlin, sessions: &[(9, 0, 17, 30)], holidays: Holidays::Basic },
    Exchange { name: "JPX", aliases: &["XTKS", "TSE"], tz: chrono_tz::Asia::Tokyo, sessions: &[(9, 0, 11, 30), (12, 30, 15, 30)], holidays: Holidays::Basic },
    Exchange { name: "HKEX", aliases: &["XHKG"], tz: chrono_tz::Asia::Hong_Kong, sessions: &[(9, 30, 12, 0), (13, 0, 16, 0)], holidays: Holidays::Basic },
    Exchange { name: "SSE", aliases: &["XSHG"], tz: chrono_tz::Asia::Shanghai, sessions: &[(9, 30, 11, 30), (13, 0, 15, 0)], holidays: Holidays::Basic },
    Exchange { name: "ASX", aliases: &["XASX"], tz: chrono_tz::Australia::Sydney, sessions: &[(10, 0, 16, 0)], holidays: Holidays::Basic },
];

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

fn is_weekend(d: NaiveDate) -> bool {
    matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// n-th weekday of a month, 1-based.
fn nth_weekday(year: i32, month: u32, wd: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, wd, n)
}

fn last_weekday(year: i32, month: u32, wd: Weekday) -> Option<NaiveDate> {
    nth_weekday(year, month, wd, 5).or_else(|| nth_weekday(year, month, wd, 4))
}

/// Gregorian Easter Sunday (anonymous algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
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
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Saturday moves to Friday, Sunday to Monday.
fn observed(d: NaiveDate) -> NaiveDate {
    match d.weekday() {
        Weekday::Sat => d - Duration::days(1),
        Weekday::Sun => d + Duration::days(1),
        _ => d,
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Full-day NYSE closures in `year`.
pub fn us_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);
    // New Year's on a Saturday is not moved back into the old year
    if let Some(ny) = ymd(year, 1, 1) {
        if ny.weekday() != Weekday::Sat {
            days.push(observed(ny));
        }
    }
    days.extend(nth_weekday(year, 1, Weekday::Mon, 3));
    days.extend(nth_weekday(year, 2, Weekday::Mon, 3));
    days.extend(easter_sunday(year).map(|e| e - Duration::days(2)));
    days.extend(last_weekday(year, 5, Weekday::Mon));
    if year >= 2022 {
        days.extend(ymd(year, 6, 19).map(observed));
    }
    days.extend(ymd(year, 7, 4).map(observed));
    days.extend(nth_weekday(year, 9, Weekday::Mon, 1));
    days.extend(nth_weekday(year, 11, Weekday::Thu, 4));
    days.extend(ymd(year, 12, 25).map(observed));
    days
}

/// Sessions that end at 13:00 local.
fn us_early_close(d: NaiveDate) -> bool {
    let year = d.year();
    let after_thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4).map(|t| t + Duration::days(1));
    let eves = [ymd(year, 12, 24), ymd(year, 7, 3)];
    after_thanksgiving == Some(d) || eves.iter().any(|e| *e == Some(d))
}

fn uk_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(8);
    days.extend(ymd(year, 1, 1).map(observed_forward));
    if let Some(e) = easter_sunday(year) {
        days.push(e - Duration::days(2));
        days.push(e + Duration::days(1));
    }
    days.extend(nth_weekday(year, 5, Weekday::Mon, 1));
    days.extend(last_weekday(year, 5, Weekday::Mon));
    days.extend(last_weekday(year, 8, Weekday::Mon));
    // Christmas and Boxing Day both roll forward past the weekend
    if let (Some(xmas), Some(boxing)) = (ymd(year, 12, 25), ymd(year, 12, 26)) {
        let xmas_obs = observed_forward(xmas);
        let mut boxing_obs = observed_forward(boxing);
        if boxing_obs <= xmas_obs {
            boxing_obs = xmas_obs + Duration::days(1);
        }
        days.push(xmas_obs);
        days.push(boxing_obs);
    }
    days
}

/// Weekend dates roll forward to Monday.
fn observed_forward(d: NaiveDate) -> NaiveDate {
    match d.weekday() {
        Weekday::Sat => d + Duration::days(2),
        Weekday::Sun => d + Duration::days(1),
        _ => d,
    }
}

impl Exchange {
    /// Case-insensitive lookup by name or MIC alias.
    pub fn lookup(name: &str) -> Option<&'static Exchange> {
        let key = name.trim().to_ascii_uppercase();
        EXCHANGES.iter().find(|x| x.name == key || x.aliases.contains(&key.as_str()))
    }

    pub fn is_holiday(&self, d: NaiveDate) -> bool {
        match self.holidays {
            Holidays::Us => us_holidays(d.year()).contains(&d),
            Holidays::Uk => uk_holidays(d.year()).contains(&d),
            Holidays::Basic => (d.month(), d.day()) == (1, 1) || (d.month(), d.day()) == (12, 25),
        }
    }

    /// Trading sessions on a local date, empty when closed all day.
    pub fn sessions_on(&self, d: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        if is_weekend(d) || self.is_holiday(d) {
            return Vec::new();
        }
        let early = self.holidays == Holidays::Us && us_early_close(d);
        self.sessions
            .iter()
            .map(|&(oh, om, ch, cm)| {
                let close = if early { hm(13, 0) } else { hm(ch, cm) };
                (hm(oh, om), close)
            })
            .collect()
    }

    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.tz);
        let t = local.time();
        self.sessions_on(local.date_naive())
            .iter()
            .any(|&(open, close)| t >= open && t < close)
    }
}

/// Calendar backed by the built-in exchange table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExchangeCalendar;

impl MarketCalendar for ExchangeCalendar {
    fn is_open_at(&self, market: &str, timezone: &str, at: DateTime<Utc>) -> Result<bool, MarketError> {
        let exchange = Exchange::lookup(market).ok_or_else(|| MarketError::UnknownMarket(market.to_string()))?;
        let caller: Tz = timezone
            .parse()
            .map_err(|_| MarketError::UnknownTimezone(timezone.to_string()))?;
        let open = exchange.is_open_at(at);
        debug!(
            "{} is {} at {} ({})",
            exchange.name,
            if open { "open" } else { "closed" },
            at.with_timezone(&caller).format("%Y-%m-%d %H:%M %Z"),
            at
        );
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ny(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn nyse_open(at: DateTime<Utc>) -> bool {
        ExchangeCalendar.is_open_at("NYSE", "America/New_York", at).unwrap()
    }

    #[test]
    fn test_weekend_closed_at_any_hour() {
        // 2024-03-16 is a Saturday
        for day in [16, 17] {
            for hour in 0..24 {
                assert!(!nyse_open(ny(2024, 3, day, hour, 0)), "open on weekend {day} {hour}:00");
            }
        }
    }

    #[test]
    fn test_regular_session_bounds() {
        assert!(!nyse_open(ny(2024, 3, 12, 9, 29)));
        assert!(nyse_open(ny(2024, 3, 12, 9, 30)));
        assert!(nyse_open(ny(2024, 3, 12, 15, 59)));
        assert!(!nyse_open(ny(2024, 3, 12, 16, 0)));
    }

    #[test]
    fn test_us_holidays() {
        let h = us_holidays(2024);
        for (m, d) in [(1, 1), (1, 15), (2, 19), (3, 29), (5, 27), (6, 19), (7, 4), (9, 2), (11, 28), (12, 25)] {
            assert!(h.contains(&NaiveDate::from_ymd_opt(2024, m, d).unwrap()), "missing 2024-{m}-{d}");
        }
        assert!(!nyse_open(ny(2024, 7, 4, 11, 0)));
        assert!(!nyse_open(ny(2024, 3, 29, 11, 0)));
    }

    #[test]
    fn test_observance() {
        // 2022-01-01 is a Saturday, Friday 2021-12-31 trades
        assert!(nyse_open(ny(2021, 12, 31, 11, 0)));
        // 2023-01-01 is a Sunday, observed on Monday
        assert!(!nyse_open(ny(2023, 1, 2, 11, 0)));
        // 2021-12-25 is a Saturday, observed Friday 24th
        assert!(!nyse_open(ny(2021, 12, 24, 11, 0)));
    }

    #[test]
    fn test_juneteenth_from_2022() {
        assert!(nyse_open(ny(2021, 6, 18, 11, 0)));
        assert!(!nyse_open(ny(2023, 6, 19, 11, 0)));
    }

    #[test]
    fn test_early_close() {
        assert!(nyse_open(ny(2024, 11, 29, 12, 59)));
        assert!(!nyse_open(ny(2024, 11, 29, 13, 0)));
        assert!(!nyse_open(ny(2024, 12, 24, 14, 0)));
        assert!(nyse_open(ny(2024, 12, 23, 14, 0)));
    }

    #[test]
    fn test_lunch_break() {
        let hk = |h, m| {
            chrono_tz::Asia::Hong_Kong.with_ymd_and_hms(2024, 3, 12, h, m, 0).unwrap().with_timezone(&Utc)
        };
        let cal = ExchangeCalendar;
        assert!(cal.is_open_at("hkex", "UTC", hk(11, 0)).unwrap());
        assert!(!cal.is_open_at("hkex", "UTC", hk(12, 30)).unwrap());
        assert!(cal.is_open_at("XHKG", "UTC", hk(13, 30)).unwrap());
    }

    #[test]
    fn test_uk_bank_holidays() {
        let lse = Exchange::lookup("lse").unwrap();
        // Easter Monday 2024 and the Christmas roll-forward in 2022
        assert!(lse.is_holiday(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert!(lse.is_holiday(NaiveDate::from_ymd_opt(2022, 12, 27).unwrap()));
        assert!(lse.is_holiday(NaiveDate::from_ymd_opt(2022, 12, 26).unwrap()));
    }

    #[test]
    fn test_unknown_inputs() {
        assert_eq!(
            ExchangeCalendar.is_open_at("MOON", "America/New_York", Utc::now()),
            Err(MarketError::UnknownMarket("MOON".into()))
        );
        assert_eq!(
            ExchangeCalendar.is_open_at("NYSE", "Mars/Olympus", Utc::now()),
            Err(MarketError::UnknownTimezone("Mars/Olympus".into()))
        );
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2024), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(easter_sunday(2025), NaiveDate::from_ymd_opt(2025, 4, 20));
    }
}
