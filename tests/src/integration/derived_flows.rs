//! # Derived Flows
//!
//! Operations that compute their own filters from the gateway clock, and
//! composite operations that stitch several families together.

#[cfg(test)]
mod tests {
    use crate::fixtures::{date, Harness};
    use rm_gateway::{ErrorKind, ResourceFamily};
    use serde_json::{json, Value};

    const TODAY: &str = "2026-03-10";

    fn field<'a>(records: &'a Value, name: &str) -> Vec<&'a str> {
        records
            .as_array()
            .map(|items| items.iter().filter_map(|r| r[name].as_str()).collect())
            .unwrap_or_default()
    }

    // =============================================================================
    // DATE WINDOWS
    // =============================================================================

    /// Upcoming milestones: today through `days` ahead, soonest first
    #[tokio::test]
    async fn test_upcoming_milestones() {
        let harness = Harness::on_date(date(TODAY));
        harness.seed(
            ResourceFamily::Milestones,
            vec![
                json!({"name": "kickoff", "date": "2026-03-01"}),
                json!({"name": "beta", "date": "2026-03-20"}),
                json!({"name": "alpha", "date": "2026-03-12"}),
                json!({"name": "launch", "date": "2026-05-01"}),
            ],
        );

        let upcoming = harness
            .route(ResourceFamily::Milestones, "list-upcoming", json!({}))
            .await
            .unwrap();
        assert_eq!(field(&upcoming, "name"), vec!["alpha", "beta"]);

        let request = &harness.backend.requests()[0];
        assert!(request
            .query
            .contains(&("start_date".to_string(), TODAY.to_string())));
        assert!(request
            .query
            .contains(&("end_date".to_string(), "2026-04-09".to_string())));

        let wider = harness
            .route(ResourceFamily::Milestones, "list-upcoming", json!({"days": 60}))
            .await
            .unwrap();
        assert_eq!(field(&wider, "name"), vec!["alpha", "beta", "launch"]);

        let err = harness
            .route(ResourceFamily::Milestones, "list-upcoming", json!({"days": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    /// Time off already under way still counts as upcoming
    #[tokio::test]
    async fn test_upcoming_time_off_includes_ongoing() {
        let harness = Harness::on_date(date(TODAY));
        harness.seed(
            ResourceFamily::TimeOff,
            vec![
                json!({"people_id": 1, "start_date": "2026-03-20", "end_date": "2026-03-21"}),
                json!({"people_id": 2, "start_date": "2026-02-01", "end_date": "2026-02-03"}),
                json!({"people_id": 3, "start_date": "2026-03-05", "end_date": "2026-03-12"}),
            ],
        );

        let upcoming = harness
            .route(ResourceFamily::TimeOff, "list-upcoming", json!({}))
            .await
            .unwrap();

        let people: Vec<u64> = upcoming
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["people_id"].as_u64())
            .collect();
        assert_eq!(people, vec![3, 1]);
    }

    /// Public holidays default to the clock's year
    #[tokio::test]
    async fn test_public_holidays_for_year() {
        let harness = Harness::on_date(date(TODAY));
        harness.seed(
            ResourceFamily::PublicHolidays,
            vec![
                json!({"name": "Christmas 2025", "date": "2025-12-25"}),
                json!({"name": "Christmas 2026", "date": "2026-12-25"}),
                json!({"name": "New Year 2026", "date": "2026-01-01"}),
                json!({"name": "New Year 2027", "date": "2027-01-01"}),
            ],
        );

        let current = harness
            .route(ResourceFamily::PublicHolidays, "list-for-year", json!({}))
            .await
            .unwrap();
        assert_eq!(field(&current, "name"), vec!["New Year 2026", "Christmas 2026"]);

        let previous = harness
            .route(ResourceFamily::PublicHolidays, "list-for-year", json!({"year": 2025}))
            .await
            .unwrap();
        assert_eq!(field(&previous, "name"), vec!["Christmas 2025"]);
    }

    /// Team holidays in the next window, soonest first
    #[tokio::test]
    async fn test_upcoming_team_holidays() {
        let harness = Harness::on_date(date(TODAY));
        harness.seed(
            ResourceFamily::TeamHolidays,
            vec![
                json!({"name": "offsite", "start_date": "2026-03-25", "end_date": "2026-03-27"}),
                json!({"name": "retreat", "start_date": "2026-03-09", "end_date": "2026-03-11"}),
                json!({"name": "summer", "start_date": "2026-07-01", "end_date": "2026-07-14"}),
            ],
        );

        let upcoming = harness
            .route(ResourceFamily::TeamHolidays, "list-upcoming", json!({"days": 30}))
            .await
            .unwrap();
        assert_eq!(field(&upcoming, "name"), vec!["retreat", "offsite"]);
    }

    /// Inverted ranges are rejected before any request
    #[tokio::test]
    async fn test_tasks_in_range_validates_window() {
        let harness = Harness::on_date(date(TODAY));
        harness.seed(
            ResourceFamily::Tasks,
            vec![
                json!({"name": "early", "start_date": "2026-01-01", "end_date": "2026-01-10"}),
                json!({"name": "march", "start_date": "2026-03-02", "end_date": "2026-03-20"}),
            ],
        );

        let err = harness
            .route(
                ResourceFamily::Tasks,
                "list-in-range",
                json!({"start_date": "2026-04-01", "end_date": "2026-03-01"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(harness.backend.request_count(), 0);

        let march = harness
            .route(
                ResourceFamily::Tasks,
                "list-in-range",
                json!({"start_date": "2026-03-01", "end_date": "2026-03-31"}),
            )
            .await
            .unwrap();
        assert_eq!(field(&march, "name"), vec!["march"]);
    }

    // =============================================================================
    // COMPOSITE OPERATIONS
    // =============================================================================

    /// Hours per person, busiest first, billable split out
    #[tokio::test]
    async fn test_person_summary() {
        let harness = Harness::on_date(date(TODAY));
        harness.seed(
            ResourceFamily::LoggedTime,
            vec![
                json!({"people_id": 1, "hours": 3, "billable": 1, "date": "2026-03-02"}),
                json!({"people_id": 1, "hours": 2, "billable": 0, "date": "2026-03-03"}),
                json!({"people_id": 2, "hours": 8, "billable": true, "date": "2026-03-03"}),
                json!({"people_id": 3, "hours": "1.5", "billable": "1", "date": "2026-03-04"}),
                json!({"people_id": 3, "hours": 4, "billable": 1, "date": "2026-02-10"}),
            ],
        );

        let summary = harness
            .route(
                ResourceFamily::LoggedTime,
                "person-summary",
                json!({"start_date": "2026-03-01", "end_date": "2026-03-31"}),
            )
            .await
            .unwrap();

        let order: Vec<u64> = summary["people"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["people_id"].as_u64())
            .collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(summary["people"][1]["hours"], 5.0);
        assert_eq!(summary["people"][1]["billable_hours"], 3.0);
        assert_eq!(summary["people"][1]["non_billable_hours"], 2.0);
        assert_eq!(summary["totals"]["hours"], 14.5);
        assert_eq!(summary["totals"]["billable_hours"], 12.5);
        assert_eq!(summary["totals"]["entries"], 4);
    }

    /// Project with phases, their milestones, unphased milestones and templates
    #[tokio::test]
    async fn test_project_hierarchy() {
        let harness = Harness::new();
        harness
            .seed(
                ResourceFamily::Projects,
                vec![
                    json!({"project_id": 1, "name": "Apollo"}),
                    json!({"project_id": 2, "name": "Gemini"}),
                ],
            )
            .seed(
                ResourceFamily::Phases,
                vec![
                    json!({"phase_id": 10, "project_id": 1, "name": "design"}),
                    json!({"phase_id": 11, "project_id": 1, "name": "build"}),
                    json!({"phase_id": 12, "project_id": 2, "name": "other"}),
                ],
            )
            .seed(
                ResourceFamily::Milestones,
                vec![
                    json!({"project_id": 1, "phase_id": 10, "name": "specs", "date": "2026-02-01"}),
                    json!({"project_id": 1, "name": "demo", "date": "2026-03-01"}),
                    json!({"project_id": 1, "phase_id": 99, "name": "stray", "date": "2026-01-01"}),
                    json!({"project_id": 2, "phase_id": 12, "name": "elsewhere"}),
                ],
            )
            .seed(
                ResourceFamily::ProjectTasks,
                vec![
                    json!({"project_id": 1, "name": "review"}),
                    json!({"project_id": 1, "name": "deploy"}),
                ],
            );

        let tree = harness
            .route(ResourceFamily::Projects, "hierarchy", json!({"project_id": 1}))
            .await
            .unwrap();

        assert_eq!(tree["project"]["name"], "Apollo");
        assert_eq!(field(&tree["phases"], "name"), vec!["design", "build"]);
        assert_eq!(field(&tree["phases"][0]["milestones"], "name"), vec!["specs"]);
        assert_eq!(tree["phases"][1]["milestones"], json!([]));
        assert_eq!(field(&tree["milestones"], "name"), vec!["stray", "demo"]);
        assert_eq!(
            tree["summary"],
            json!({"phase_count": 2, "milestone_count": 3, "project_task_count": 2})
        );

        let err = harness
            .route(ResourceFamily::Projects, "hierarchy", json!({"project_id": 42}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    /// Team size counts distinct people across a project's tasks
    #[tokio::test]
    async fn test_projects_with_team_size() {
        let harness = Harness::new();
        harness
            .seed(
                ResourceFamily::Projects,
                vec![json!({"name": "a"}), json!({"name": "b"}), json!({"name": "c"})],
            )
            .seed(
                ResourceFamily::Tasks,
                vec![
                    json!({"project_id": 1, "people_id": 5}),
                    json!({"project_id": 1, "people_id": 6}),
                    json!({"project_id": 1, "people_id": 5}),
                    json!({"project_id": 2, "people_ids": [7, 8, 9]}),
                    json!({"project_id": 2, "people_id": 7}),
                ],
            );

        let projects = harness
            .route(ResourceFamily::Projects, "list-with-team-size", json!({}))
            .await
            .unwrap();

        let sizes: Vec<u64> = projects
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["team_size"].as_u64())
            .collect();
        assert_eq!(sizes, vec![2, 3, 0]);
    }

    /// Tags are matched client-side against nested tag records
    #[tokio::test]
    async fn test_people_by_tag() {
        let harness = Harness::new();
        harness.seed(
            ResourceFamily::People,
            vec![
                json!({"name": "Ada", "tags": [{"name": "rust", "type": 1}]}),
                json!({"name": "Grace", "tags": ["go", "Rust"]}),
                json!({"name": "Linus"}),
            ],
        );

        let tagged = harness
            .route(ResourceFamily::People, "list-by-tag", json!({"tag": "rust"}))
            .await
            .unwrap();

        assert_eq!(field(&tagged, "name"), vec!["Ada", "Grace"]);
        assert!(harness.backend.requests()[0]
            .query
            .iter()
            .all(|(k, _)| k != "tag"));
    }
}
