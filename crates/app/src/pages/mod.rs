mod dashboard;
mod model_testing;
mod prompts;
mod results;
mod testing;

pub use dashboard::DashboardPage;
pub use model_testing::ModelTestingPage;
pub use prompts::PromptsPage;
pub use results::ResultsPage;
pub use testing::TestingPage;

use scorer_api::{Prompt, ResultsQuery};

/// In-app navigation raised by a page. Filters travel as typed state; a
/// restart loses them, the same as the pages' own drafts.
#[derive(Debug, Clone, PartialEq)]
pub enum Nav {
    Results(ResultsQuery),
}

/// Distinct drum types present in the prompt database, for filter dropdowns.
pub(crate) fn distinct_drum_types(prompts: &[Prompt]) -> Vec<String> {
    let mut types: Vec<String> = prompts
        .iter()
        .filter_map(|p| p.drum_type.clone())
        .collect();
    types.sort();
    types.dedup();
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(drum_type: Option<&str>) -> Prompt {
        Prompt {
            id: 1,
            text: String::new(),
            difficulty: 5,
            drum_type: drum_type.map(str::to_string),
            category: None,
            used_count: 0,
            is_user_generated: false,
        }
    }

    #[test]
    fn test_distinct_drum_types_sorted_and_deduped() {
        let prompts = vec![
            prompt(Some("snare")),
            prompt(Some("kick")),
            prompt(None),
            prompt(Some("snare")),
        ];
        assert_eq!(distinct_drum_types(&prompts), vec!["kick", "snare"]);
    }
}
