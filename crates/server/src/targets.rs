//! Attack target assignment
//!
//! Targets are a pure function of the active player ids, the round seed and the
//! assignment epoch, so a given round replays the same target sequence.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// attacker id -> defender id
pub type TargetMap = BTreeMap<String, String>;

/// Mixes the epoch into the round seed (splitmix64 increment)
const EPOCH_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Assign one defender to every active player
///
/// - fewer than two players: nobody has a target
/// - two players: each targets the other
/// - three or more: each attacker gets a uniformly random defender other than itself
pub fn assign_targets(active: &[String], seed: u64, epoch: u64) -> TargetMap {
    let mut ids: Vec<&String> = active.iter().collect();
    ids.sort();
    ids.dedup();

    let mut targets = TargetMap::new();
    match ids.len() {
        0 | 1 => {}
        2 => {
            targets.insert(ids[0].clone(), ids[1].clone());
            targets.insert(ids[1].clone(), ids[0].clone());
        }
        n => {
            let mut rng = StdRng::seed_from_u64(seed ^ epoch.wrapping_mul(EPOCH_MIX));
            for (i, attacker) in ids.iter().enumerate() {
                // Draw from the n - 1 other slots and skip over our own index
                let r = rng.gen_range(0..n - 1);
                let j = if r >= i { r + 1 } else { r };
                targets.insert((*attacker).clone(), ids[j].clone());
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_players_target_each_other() {
        for epoch in 0..5 {
            let targets = assign_targets(&ids(&["b", "a"]), 77, epoch);
            assert_eq!(targets.get("a").map(String::as_str), Some("b"));
            assert_eq!(targets.get("b").map(String::as_str), Some("a"));
        }
    }

    #[test]
    fn nobody_targets_themselves() {
        let players = ids(&["p1", "p2", "p3", "p4", "p5"]);
        for seed in 0..20 {
            for epoch in 0..20 {
                let targets = assign_targets(&players, seed, epoch);
                assert_eq!(targets.len(), players.len());
                for (attacker, defender) in &targets {
                    assert_ne!(attacker, defender);
                    assert!(players.contains(defender));
                }
            }
        }
    }

    #[test]
    fn assignment_is_deterministic_and_order_independent() {
        let a = assign_targets(&ids(&["x", "y", "z"]), 9, 3);
        let b = assign_targets(&ids(&["z", "x", "y"]), 9, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn epochs_eventually_change_targets() {
        let players = ids(&["a", "b", "c", "d"]);
        let first = assign_targets(&players, 1, 0);
        assert!((1..50).any(|epoch| assign_targets(&players, 1, epoch) != first));
    }

    #[test]
    fn lone_player_has_no_target() {
        assert!(assign_targets(&ids(&["solo"]), 1, 1).is_empty());
        assert!(assign_targets(&[], 1, 1).is_empty());
    }
}
