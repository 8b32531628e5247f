/// Compute X (seconds) and Y (characters) bounds for the results chart
pub fn compute_chart_params(series: &[&[(f64, f64)]], fallback_secs: f64) -> (f64, f64) {
    let points = series.iter().flat_map(|s| s.iter());

    let (mut overall_duration, highest) = points.fold((0.0_f64, 0.0_f64), |(x, y), &(t, v)| {
        (x.max(t), y.max(v))
    });

    if overall_duration <= 0.0 {
        overall_duration = fallback_secs;
    }
    if overall_duration < 1.0 {
        overall_duration = 1.0;
    }

    (overall_duration, highest.max(1.0).round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

/// mm:ss for countdowns
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        let (x, y) = compute_chart_params(&[], 5.0);
        assert_eq!(x, 5.0);
        assert_eq!(y, 1.0);
    }

    #[test]
    fn test_compute_chart_params_spans_both_series() {
        let first = [(10.0, 40.0), (20.0, 85.0)];
        let second = [(10.0, 30.0), (30.0, 70.0)];
        let (x, y) = compute_chart_params(&[&first, &second], 120.0);
        assert_eq!(x, 30.0);
        assert_eq!(y, 85.0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(120), "2:00");
    }
}
