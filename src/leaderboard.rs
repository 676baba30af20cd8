use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::model::LeaderboardEntry;

/// A team's totals before ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStanding {
    pub user_id: String,
    pub team_name: String,
    pub score: i64,
    pub solved_count: i64,
    pub last_solve_at: Option<NaiveDateTime>,
}

/// Orders teams by score, then by who reached it first, then by name, and numbers them from 1.
/// A team with no solves sorts after any team with the same score that has solved something.
pub fn rank_teams(mut standings: Vec<TeamStanding>, total_challenges: i64) -> Vec<LeaderboardEntry> {
    standings.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| match (a.last_solve_at, b.last_solve_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.team_name.cmp(&b.team_name))
    });

    standings
        .into_iter()
        .enumerate()
        .map(|(i, s)| LeaderboardEntry {
            rank: i + 1,
            user_id: s.user_id,
            team_name: s.team_name,
            score: s.score,
            solved_count: s.solved_count,
            total_challenges,
        })
        .collect()
}
