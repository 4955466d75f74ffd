//! One trading week, one dividend.
//!
//! Opens Mon..Fri = 10, 10, 11, 12, 13; dividend 1.00 with ex-date Tuesday and
//! a one-day reference offset, so the reference is Monday at 10.00. Every
//! default target (10.50 / 10.75 / 11.00) is first met on Wednesday, two days
//! after the reference date the window starts on.

use chrono::NaiveDate;
use divrec_analysis::{analyze, Achievement, AnalysisConfig, BucketKey, RecoveryFraction};
use divrec_md::{DividendHistory, DividendRecord, PriceRecord, PriceSeries};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn week() -> PriceSeries {
    let opens = [10, 10, 11, 12, 13];
    PriceSeries::new(
        "TEST",
        opens
            .iter()
            .enumerate()
            .map(|(i, &o)| PriceRecord {
                date: d(2024, 1, 8 + i as u32),
                open_micros: o * 1_000_000,
                high_micros: o * 1_000_000,
                low_micros: o * 1_000_000,
                close_micros: o * 1_000_000,
                volume: 1_000,
            })
            .collect(),
    )
    .unwrap()
}

fn dividend_on(ex_date: NaiveDate) -> DividendHistory {
    DividendHistory::new(
        "TEST",
        vec![DividendRecord {
            ex_date,
            amount_micros: 1_000_000,
        }],
    )
    .unwrap()
}

fn one_dividend() -> DividendHistory {
    dividend_on(d(2024, 1, 9))
}

fn cfg() -> AnalysisConfig {
    AnalysisConfig {
        reference_offset_days: 1,
        ..AnalysisConfig::default()
    }
}

#[test]
fn all_default_targets_met_on_day_two() {
    let report = analyze(&week(), &one_dividend(), &cfg()).unwrap();
    assert_eq!(report.results.len(), 1);
    let r = &report.results[0];
    assert_eq!(r.ex_date, d(2024, 1, 9));
    assert_eq!(r.reference_date, d(2024, 1, 8));
    assert_eq!(r.anchor_date, d(2024, 1, 8));
    assert_eq!(r.reference_price_micros, 10_000_000);

    let prices: Vec<i64> = r.outcomes.iter().map(|o| o.target.price_micros).collect();
    assert_eq!(prices, vec![10_500_000, 10_750_000, 11_000_000]);

    for o in &r.outcomes {
        assert_eq!(
            o.achievement,
            Achievement::Achieved {
                date: d(2024, 1, 10),
                day_count: 2
            }
        );
        // Additive 100% target is reference + amount.
        if o.target.fraction.micros() == 1_000_000 {
            assert_eq!(o.target.price_micros, r.reference_price_micros + r.amount_micros);
        }
    }
}

#[test]
fn ex_date_on_first_record_clamps_reference_to_it() {
    // Ten days before Monday lies before the series; the reference clamps to Monday.
    let report = analyze(
        &week(),
        &dividend_on(d(2024, 1, 8)),
        &AnalysisConfig::default(),
    )
    .unwrap();
    let r = &report.results[0];
    assert_eq!(r.reference_date, d(2024, 1, 8));
    assert_eq!(r.reference_price_micros, 10_000_000);
    let days: Vec<Option<u32>> = r.outcomes.iter().map(|o| o.achievement.day_count()).collect();
    assert_eq!(days, vec![Some(2), Some(2), Some(2)]);
}

#[test]
fn unreachable_target_is_counted_but_not_averaged() {
    let mut c = cfg();
    c.target_fractions.push(RecoveryFraction::from_micros(10_000_000).unwrap()); // 1000%, target 20.00

    let report = analyze(&week(), &one_dividend(), &c).unwrap();
    let unreachable = report.results[0].outcomes.last().unwrap();
    assert_eq!(unreachable.achievement, Achievement::NotAchieved);

    let bucket = report.summary.bucket(BucketKey::Month(1)).unwrap();
    let stats = bucket.stats.last().unwrap();
    assert_eq!(stats.achieved_count, 0);
    assert_eq!(stats.not_achieved_count, 1);
    assert_eq!(stats.mean_day_count, None);

    let reachable = &bucket.stats[0];
    assert_eq!(reachable.mean_day_count, Some(2.0));
    assert_eq!(reachable.not_achieved_count, 0);
}

#[test]
fn achieved_dates_stay_inside_the_window() {
    let report = analyze(&week(), &one_dividend(), &cfg()).unwrap();
    for r in &report.results {
        for o in &r.outcomes {
            if let Achievement::Achieved { date, day_count } = o.achievement {
                assert!(date >= r.anchor_date && date <= r.window_end);
                assert_eq!((date - r.anchor_date).num_days(), i64::from(day_count));
            }
        }
    }
}

#[test]
fn first_crossing_is_stable_when_horizon_grows() {
    let short = AnalysisConfig {
        search_horizon_days: 2,
        ..cfg()
    };
    let long = AnalysisConfig {
        search_horizon_days: 365,
        ..cfg()
    };
    let a = analyze(&week(), &one_dividend(), &short).unwrap();
    let b = analyze(&week(), &one_dividend(), &long).unwrap();
    for (x, y) in a.results[0].outcomes.iter().zip(&b.results[0].outcomes) {
        if x.achievement.is_achieved() {
            assert_eq!(x.achievement, y.achievement);
        }
    }
}

#[test]
fn report_serializes_without_sentinels() {
    let mut c = cfg();
    c.target_fractions.push(RecoveryFraction::from_micros(10_000_000).unwrap());
    let report = analyze(&week(), &one_dividend(), &c).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let last = &json["results"][0]["outcomes"][3]["achievement"];
    assert_eq!(last["status"], "not_achieved");
    assert!(last.get("day_count").is_none());
}
