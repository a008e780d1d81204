use std::collections::HashMap;

use serde::Serialize;
use tracing::instrument;

use crate::constants::{GAMES_MAX_DISTINCT, TOP_LIST_LEN};
use crate::util::helix::{BearerToken, HelixClient, StreamRecord};

/// Public projection of a stream record for the top-streams list.
#[derive(Debug, Clone, Serialize)]
pub struct TopStream {
    pub user_login: String,
    pub user_name: String,
    pub viewer_count: u64,
    pub title: String,
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameAggregate {
    pub id: String,
    pub name: String,
    pub viewers: u64,
}

/// Reduction of one collection pass. Game totals keep first-seen order so
/// that ranking ties stay deterministic and the distinct-game cap applies to
/// the earliest-seen games, as the reference dashboard does.
#[derive(Debug, Clone)]
pub struct StreamAggregates {
    pub total_viewers: u64,
    pub top_streams: Vec<TopStream>,
    game_totals: Vec<(String, u64)>,
}

/// Reduces collected stream records to a grand viewer total, the top-10
/// streams by viewer count, and per-game viewer sums.
///
/// Records with an empty `game_id` are excluded from grouping but still
/// contribute to the total. Sorts are stable: ties keep input order.
#[instrument(skip(records), fields(record_count = records.len()))]
pub fn aggregate_streams(records: &[StreamRecord]) -> StreamAggregates {
    let total_viewers = records.iter().map(|s| s.viewer_count).sum();

    let mut ranked: Vec<&StreamRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.viewer_count.cmp(&a.viewer_count));
    let top_streams = ranked
        .into_iter()
        .take(TOP_LIST_LEN)
        .map(|s| TopStream {
            user_login: s.user_login.clone(),
            user_name: s.user_name.clone(),
            viewer_count: s.viewer_count,
            title: s.title.clone(),
            game_id: s.game_id.clone(),
        })
        .collect();

    let mut game_totals: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if record.game_id.is_empty() {
            continue;
        }
        match index.get(record.game_id.as_str()) {
            Some(&at) => game_totals[at].1 += record.viewer_count,
            None => {
                index.insert(&record.game_id, game_totals.len());
                game_totals.push((record.game_id.clone(), record.viewer_count));
            }
        }
    }

    tracing::debug!(
        total_viewers,
        distinct_games = game_totals.len(),
        "stream aggregation complete"
    );

    StreamAggregates {
        total_viewers,
        top_streams,
        game_totals,
    }
}

impl StreamAggregates {
    /// Joins game totals against resolved display names and returns the
    /// top-10 games by summed viewers. Only the first 50 distinct game ids
    /// are sent for resolution; any id the lookup fails on or omits keeps
    /// the raw id as its name.
    #[instrument(skip(self, helix, token))]
    pub async fn resolve_top_games(
        &self,
        helix: &HelixClient,
        token: &BearerToken,
    ) -> Vec<GameAggregate> {
        let ids: Vec<String> = self
            .game_totals
            .iter()
            .take(GAMES_MAX_DISTINCT)
            .map(|(id, _)| id.clone())
            .collect();

        let names = if ids.is_empty() {
            HashMap::new()
        } else {
            helix.game_names(token, &ids).await
        };

        join_game_names(&self.game_totals, &names)
    }
}

fn join_game_names(
    game_totals: &[(String, u64)],
    names: &HashMap<String, String>,
) -> Vec<GameAggregate> {
    let mut games: Vec<GameAggregate> = game_totals
        .iter()
        .map(|(id, viewers)| GameAggregate {
            id: id.clone(),
            name: names.get(id).cloned().unwrap_or_else(|| id.clone()),
            viewers: *viewers,
        })
        .collect();

    games.sort_by(|a, b| b.viewers.cmp(&a.viewers));
    games.truncate(TOP_LIST_LEN);
    games
}
