//! Property tests for readout formatting and lap ratings.

use heistwatch_core::timer::{format_time, recompute_ratings, SetupLap};
use heistwatch_core::Rating;
use proptest::prelude::*;

proptest! {
    #[test]
    fn format_parses_back_to_its_input(ms in 0u64..=3_600_000) {
        let text = format_time(ms);
        prop_assert_eq!(text.len(), 5);
        if let Some((minutes, seconds)) = text.split_once(':') {
            let minutes: u64 = minutes.parse().unwrap();
            let seconds: u64 = seconds.parse().unwrap();
            prop_assert!(minutes >= 1);
            prop_assert!(seconds < 60);
            prop_assert_eq!(minutes * 60 + seconds, ms / 1000);
        } else {
            let (seconds, hundredths) = text.split_once('.').expect("sub-minute form");
            let seconds: u64 = seconds.parse().unwrap();
            let hundredths: u64 = hundredths.parse().unwrap();
            prop_assert!(seconds < 60);
            prop_assert_eq!(seconds, ms / 1000);
            prop_assert_eq!(hundredths, (ms % 1000) / 10);
        }
    }

    #[test]
    fn ratings_single_good_at_first_minimum(
        durations in proptest::collection::vec(0u64..10_000_000, 1..20)
    ) {
        let mut laps: Vec<SetupLap> = durations
            .iter()
            .map(|&duration| SetupLap::capture(duration, 0, ""))
            .collect();
        recompute_ratings(&mut laps);

        let min = *durations.iter().min().unwrap();
        let max = *durations.iter().max().unwrap();

        let good: Vec<usize> = laps
            .iter()
            .enumerate()
            .filter(|(_, lap)| lap.rating == Rating::Good)
            .map(|(index, _)| index)
            .collect();
        prop_assert_eq!(good.len(), 1);
        prop_assert_eq!(laps[good[0]].duration_ms, min);
        prop_assert_eq!(good[0], durations.iter().position(|&d| d == min).unwrap());

        let slow: Vec<usize> = laps
            .iter()
            .enumerate()
            .filter(|(_, lap)| lap.rating == Rating::Slow)
            .map(|(index, _)| index)
            .collect();
        if min == max {
            // The lone extreme already rated Good.
            prop_assert!(slow.is_empty());
        } else {
            prop_assert_eq!(slow.len(), 1);
            prop_assert_eq!(laps[slow[0]].duration_ms, max);
            prop_assert_eq!(slow[0], durations.iter().position(|&d| d == max).unwrap());
        }

        prop_assert!(laps.iter().all(|lap| lap.rating != Rating::Unset));
    }
}
