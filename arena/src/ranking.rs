use serde::{Deserialize, Serialize};

use crate::protocol::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub player_id: PlayerId,
    pub damage_dealt: u64,
    pub survival_ticks: u64,
    pub rank: u32,
}

/// Orders by damage, then survival, then id, and assigns standard competition
/// ranks on damage alone: equal damage shares a rank and the next distinct
/// value resumes at its position.
pub fn compute_rankings<I>(players: I) -> Vec<RankingEntry>
where
    I: IntoIterator<Item = (PlayerId, u64, u64)>,
{
    let mut entries: Vec<RankingEntry> = players
        .into_iter()
        .map(|(player_id, damage_dealt, survival_ticks)| RankingEntry {
            player_id,
            damage_dealt,
            survival_ticks,
            rank: 0,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.damage_dealt
            .cmp(&a.damage_dealt)
            .then(b.survival_ticks.cmp(&a.survival_ticks))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let mut previous: Option<(u64, u32)> = None;
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = match previous {
            Some((damage, rank)) if damage == entry.damage_dealt => rank,
            _ => idx as u32 + 1,
        };
        previous = Some((entry.damage_dealt, entry.rank));
    }
    entries
}
