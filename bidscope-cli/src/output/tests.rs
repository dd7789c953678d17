//! CLI output formatting tests.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_seconds, truncate};
    use bidscope_core::{EnrichedRecord, Employee, Meridiem, RateLimitSnapshot, bucket_by_shift};
    use bidscope_store::DatasetMeta;
    use chrono::Utc;
    use std::time::Duration;

    fn record(thread_id: u64, awarded: bool, paid: f64) -> EnrichedRecord {
        EnrichedRecord {
            thread_id: Some(thread_id),
            bid_id: Some(thread_id * 10),
            project_title: format!("Project {thread_id}"),
            client_username: "acme".into(),
            bid_amount: 120.0,
            award_status: if awarded { "awarded" } else { "pending" }.into(),
            awarded,
            total_paid_milestones: paid,
            response_time_seconds: Some(125),
            ..EnrichedRecord::default()
        }
    }

    fn employee(name: &str) -> Employee {
        Employee {
            id: 1,
            name: name.into(),
            color: "#10b981".into(),
            start_hour: 9,
            start_am_pm: Meridiem::Am,
            end_hour: 5,
            end_am_pm: Meridiem::Pm,
        }
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(45), "45s");
        assert_eq!(format_seconds(200), "3m 20s");
        assert_eq!(format_seconds(3900), "1h 5m");
        assert_eq!(format_seconds(90_000), "1d 1h");
        assert_eq!(format_seconds(-30), "-30s");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("a much longer title", 8), "a much …");
    }

    #[test]
    fn test_rows_table_without_colors() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_rows(&[record(7, true, 50.0), record(8, false, 0.0)]);

        assert!(!output.contains("\x1b["));
        assert!(output.starts_with("Thread"));
        assert!(output.contains("Project 7"));
        assert!(output.contains("awarded"));
        assert!(output.contains("pending"));
        assert!(output.contains("2m 5s"));
    }

    #[test]
    fn test_rows_with_error_get_note_line() {
        let formatter = TextFormatter::new(false);
        let mut failed = record(9, false, 0.0);
        failed.bid_id = None;
        failed.error = Some("bid: request failed".into());

        let output = formatter.format_rows(&[failed]);
        assert_eq!(output.lines().count(), 3);
        assert!(output.lines().last().unwrap().trim_start().starts_with("bid:"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn test_empty_rows() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_rows(&[]), "No threads.");
    }

    #[test]
    fn test_colors_applied() {
        let formatter = TextFormatter::new(true);
        let output = formatter.format_rows(&[record(7, true, 50.0)]);
        assert!(output.contains("\x1b[1m"));
        assert!(output.contains("\x1b[32m"));
    }

    #[test]
    fn test_run_summary() {
        let formatter = TextFormatter::new(false);
        let rows = vec![record(1, true, 10.5), record(2, true, 4.5), record(3, false, 0.0)];

        let summary = formatter.format_run_summary(&rows, 1, false, Some(Duration::from_millis(2500)));
        assert_eq!(summary, "3 threads, 2 awarded, 15.00 paid, 1 with errors in 2.5s");

        let cancelled = formatter.format_run_summary(&rows[..1], 0, true, None);
        assert!(cancelled.ends_with("(cancelled, partial results)"));
    }

    #[test]
    fn test_rate_limits() {
        let formatter = TextFormatter::new(false);
        let limits = RateLimitSnapshot {
            limit: "100".into(),
            remaining: "0".into(),
            is_rate_limited: true,
        };
        assert_eq!(
            formatter.format_rate_limits(&limits),
            "Rate limit: 0/100 remaining (rate limited)"
        );
    }

    #[test]
    fn test_datasets() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_datasets(&[]), "No saved datasets.");

        let meta = DatasetMeta {
            name: "march".into(),
            from_date: Some("2024-03-01".into()),
            to_date: None,
            limit: Some(50),
            row_count: 12,
            saved_at: Utc::now(),
        };
        let output = formatter.format_datasets(std::slice::from_ref(&meta));
        assert!(output.contains("march"));
        assert!(output.contains("2024-03-01 to now, limit 50"));
        assert!(formatter.format_dataset_meta(&meta).contains("12 rows"));
    }

    #[test]
    fn test_employees_and_shifts() {
        let formatter = TextFormatter::new(false);
        let employees = vec![employee("Dana")];
        let output = formatter.format_employees(&employees);
        assert!(output.contains("Dana"));
        assert!(output.contains("9 AM - 5 PM"));

        let rows = vec![record(1, true, 0.0)];
        let buckets = bucket_by_shift(&rows, &employees);
        let shifts = formatter.format_shifts(&buckets);
        assert!(shifts.contains("Dana"));
        assert!(shifts.contains("Unassigned"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{JsonFormatter, RunOutput};
    use bidscope_core::{EnrichedRecord, Employee, Meridiem, bucket_by_shift};

    #[test]
    fn test_run_output_shape() {
        let rows = vec![EnrichedRecord {
            thread_id: Some(7),
            ..EnrichedRecord::default()
        }];
        let output = RunOutput {
            threads: &rows,
            failures: 0,
            cancelled: false,
            rate_limits: None,
            duration_ms: Some(1200),
            dataset: None,
        };

        let json = JsonFormatter::new(false).format(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["threads"].as_array().unwrap().len(), 1);
        assert_eq!(value["duration_ms"], 1200);
        assert_eq!(value["cancelled"], false);
        assert!(value.get("rate_limits").is_none());
        assert!(value.get("dataset").is_none());
    }

    #[test]
    fn test_pretty_output_is_multiline() {
        let value = serde_json::json!({"a": 1, "b": [1, 2]});
        assert!(!JsonFormatter::new(false).format(&value).unwrap().contains('\n'));
        assert!(JsonFormatter::new(true).format(&value).unwrap().contains('\n'));
    }

    #[test]
    fn test_shift_output() {
        let employees = vec![Employee {
            id: 3,
            name: "Night".into(),
            color: String::new(),
            start_hour: 10,
            start_am_pm: Meridiem::Pm,
            end_hour: 6,
            end_am_pm: Meridiem::Am,
        }];
        let rows: Vec<EnrichedRecord> = Vec::new();
        let buckets = bucket_by_shift(&rows, &employees);

        let json = JsonFormatter::new(false).format_shifts(&buckets).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["label"], "Night");
        assert_eq!(value[0]["employee_id"], 3);
        assert_eq!(value[0]["window"], "10 PM - 6 AM");
        assert_eq!(value[0]["rows"], 0);
        assert!(value[0].get("win_rate").is_none());
        assert_eq!(value[1]["label"], "Unassigned");
    }
}
