use crate::model::{Category, ChallengeSummary, LeaderboardEntry, SubmissionLog};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => c.as_str() == category,
        }
    }

    /// Parses a select value; anything that is not a category means "all".
    pub fn from_value(value: &str) -> Self {
        value
            .parse::<Category>()
            .map(CategoryFilter::Only)
            .unwrap_or(CategoryFilter::All)
    }

    pub fn value(&self) -> &'static str {
        match self {
            CategoryFilter::All => "ALL",
            CategoryFilter::Only(c) => c.as_str(),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn search_logs(logs: &[SubmissionLog], query: &str) -> Vec<SubmissionLog> {
    logs.iter()
        .filter(|log| contains_ignore_case(&log.team_name, query))
        .cloned()
        .collect()
}

pub fn filter_logs_by_category(
    logs: &[SubmissionLog],
    category: CategoryFilter,
) -> Vec<SubmissionLog> {
    logs.iter()
        .filter(|log| category.matches(&log.challenge_category))
        .cloned()
        .collect()
}

/// Logs whose team name contains `query` (case-insensitively) and whose category passes.
pub fn filter_logs(
    logs: &[SubmissionLog],
    query: &str,
    category: CategoryFilter,
) -> Vec<SubmissionLog> {
    filter_logs_by_category(&search_logs(logs, query), category)
}

/// Challenges whose title or description contains `query`, in the chosen category.
pub fn filter_challenges(
    challenges: &[ChallengeSummary],
    query: &str,
    category: CategoryFilter,
) -> Vec<ChallengeSummary> {
    challenges
        .iter()
        .filter(|c| {
            (contains_ignore_case(&c.title, query) || contains_ignore_case(&c.description, query))
                && category.matches(&c.category)
        })
        .cloned()
        .collect()
}

pub fn filter_leaderboard(entries: &[LeaderboardEntry], query: &str) -> Vec<LeaderboardEntry> {
    entries
        .iter()
        .filter(|e| contains_ignore_case(&e.team_name, query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn log(id: i32, team: &str, category: Category) -> SubmissionLog {
        SubmissionLog {
            id,
            team_name: team.to_string(),
            challenge_title: format!("challenge {}", id),
            challenge_category: category.as_str().to_string(),
            is_correct: id % 2 == 0,
            submitted_at: NaiveDateTime::default(),
        }
    }

    fn sample_logs() -> Vec<SubmissionLog> {
        vec![
            log(1, "Stack Smashers", Category::Pwn),
            log(2, "stack overflowers", Category::Web),
            log(3, "Cipher Punks", Category::Cryptography),
            log(4, "Web Crawlers", Category::Web),
            log(5, "STACKED", Category::Pwn),
            log(6, "Nops", Category::Misc),
        ]
    }

    fn ids(logs: &[SubmissionLog]) -> Vec<i32> {
        logs.iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        assert_eq!(ids(&search_logs(&sample_logs(), "stack")), vec![1, 2, 5]);
        assert_eq!(ids(&search_logs(&sample_logs(), "")), vec![1, 2, 3, 4, 5, 6]);
        assert!(search_logs(&sample_logs(), "zzz").is_empty());
    }

    #[test]
    fn test_category_filter() {
        let web = CategoryFilter::Only(Category::Web);
        assert_eq!(ids(&filter_logs_by_category(&sample_logs(), web)), vec![2, 4]);
        assert_eq!(
            ids(&filter_logs_by_category(&sample_logs(), CategoryFilter::All)).len(),
            6
        );
    }

    #[test]
    fn test_log_filters_commute_and_are_idempotent() {
        let logs = sample_logs();
        let queries = ["", "stack", "CR", "nops", "x"];
        let mut categories = vec![CategoryFilter::All];
        categories.extend(Category::ALL.iter().copied().map(CategoryFilter::Only));

        for query in queries {
            for &category in &categories {
                let search_first = filter_logs_by_category(&search_logs(&logs, query), category);
                let category_first =
                    search_logs(&filter_logs_by_category(&logs, category), query);
                assert_eq!(search_first, category_first);

                let once = filter_logs(&logs, query, category);
                let twice = filter_logs(&once, query, category);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_category_filter_values() {
        assert_eq!(CategoryFilter::from_value("ALL"), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::from_value("All Categories"),
            CategoryFilter::All
        );
        assert_eq!(
            CategoryFilter::from_value("PWN"),
            CategoryFilter::Only(Category::Pwn)
        );
        assert_eq!(CategoryFilter::Only(Category::Misc).value(), "MISC");
    }

    #[test]
    fn test_challenge_search_covers_description() {
        let challenge = |id: &str, title: &str, description: &str, category: Category| {
            ChallengeSummary {
                id: id.to_string(),
                title: title.to_string(),
                category: category.as_str().to_string(),
                points: 100,
                description: description.to_string(),
                resource_link: None,
                created_at: NaiveDateTime::default(),
            }
        };
        let challenges = vec![
            challenge("a", "Baby XOR", "single byte key", Category::Cryptography),
            challenge("b", "Cookie Monster", "steal the admin cookie", Category::Web),
            challenge("c", "Memory Dump", "find the KEY in the dump", Category::Forensics),
        ];

        let found = filter_challenges(&challenges, "key", CategoryFilter::All);
        assert_eq!(
            found.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );

        let found = filter_challenges(&challenges, "key", CategoryFilter::Only(Category::Forensics));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c");
    }
}
