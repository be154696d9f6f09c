//! Picking another server of the same mode for "play again".
//!
//! Server names end in an instance number: `bw-solo-3` is instance 3 of mode
//! `bw-solo-`. Any other instance of the mode is a valid destination.

use crate::error::{ArenaError, ArenaResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// Strips the trailing instance number from a server name.
pub fn mode_prefix(server_name: &str) -> &str {
    server_name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Chooses one of `servers` at random, never `own_server`.
///
/// The comparison with `own_server` ignores ASCII case.
pub fn pick_destination<R>(own_server: &str, servers: &[String], rng: &mut R) -> ArenaResult<String>
where
    R: Rng + ?Sized,
{
    let candidates: Vec<&String> = servers
        .iter()
        .filter(|server| !server.eq_ignore_ascii_case(own_server))
        .collect();

    candidates
        .choose(rng)
        .map(|server| server.to_string())
        .ok_or_else(|| ArenaError::NoEligibleDestination(mode_prefix(own_server).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn servers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_mode_prefix() {
        assert_eq!(mode_prefix("bw-solo-3"), "bw-solo-");
        assert_eq!(mode_prefix("sw-team-120"), "sw-team-");
        assert_eq!(mode_prefix("lobby"), "lobby");
    }

    #[test]
    fn test_own_server_is_never_picked() {
        let mut rng = StdRng::seed_from_u64(7);
        let servers = servers(&["BW-SOLO-1", "bw-solo-2"]);

        for _ in 0..32 {
            assert_eq!(
                pick_destination("bw-solo-1", &servers, &mut rng).unwrap(),
                "bw-solo-2"
            );
        }
    }

    #[test]
    fn test_no_candidates() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = pick_destination("bw-solo-1", &servers(&["bw-solo-1"]), &mut rng);
        assert!(matches!(result, Err(ArenaError::NoEligibleDestination(prefix)) if prefix == "bw-solo-"));
    }

    #[test]
    fn test_every_candidate_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let servers = servers(&["bw-solo-1", "bw-solo-2", "bw-solo-3"]);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(pick_destination("bw-solo-1", &servers, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 2);
    }
}
