//! Variable-width "unit block" parsing: the pool/extras/position tail shared
//! by COMBAT_EVENT, EFFECT_CHANGED, BEGIN_CAST and HEALTH_REGEN records.
//!
//! The reader is deliberately greedy rather than strict: the log format
//! appends optional pool-like tokens in some records, and a parser that fails
//! on the extras regresses on real logs.

use serde::{Deserialize, Serialize};

/// A `cur/max` resource pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pool {
    pub cur: i64,
    pub max: i64,
}

impl Pool {
    fn parse(token: &str) -> Option<Pool> {
        let (cur, max) = token.split_once('/')?;
        Some(Pool {
            cur: cur.trim().parse().ok()?,
            max: max.trim().parse().ok()?,
        })
    }

    fn looks_like_pool(token: &str) -> bool {
        token.split_once('/').is_some_and(|(cur, max)| {
            cur.trim().parse::<i64>().is_ok() && max.trim().parse::<i64>().is_ok()
        })
    }
}

/// Health, Magicka, Stamina, Ultimate plus any tolerated extra pools, an
/// optional leading integer, and the X/Y/Z position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitBlock {
    pub health: Pool,
    pub magicka: Pool,
    pub stamina: Pool,
    pub ultimate: Pool,
    pub extra_pools: Vec<Pool>,
    pub leading_int: Option<i64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

const MAX_EXTRA_POOLS: usize = 2;

/// Parse a unit block starting at `fields[start]`. Returns the block and the
/// index of the first field past it. Always succeeds (missing/malformed
/// tokens default to zero), consuming at least the 4 mandatory pool slots.
pub fn parse_unit_block(fields: &[String], start: usize) -> (UnitBlock, usize) {
    let mut idx = start;
    let mut next_pool = || {
        let token = fields.get(idx).map(String::as_str).unwrap_or("");
        let pool = Pool::parse(token).unwrap_or_default();
        idx += 1;
        pool
    };
    let health = next_pool();
    let magicka = next_pool();
    let stamina = next_pool();
    let ultimate = next_pool();
    drop(next_pool);

    let mut extra_pools = Vec::new();
    while extra_pools.len() < MAX_EXTRA_POOLS {
        let Some(token) = fields.get(idx) else { break };
        if Pool::looks_like_pool(token) {
            extra_pools.push(Pool::parse(token).unwrap_or_default());
            idx += 1;
        } else {
            break;
        }
    }

    let has_leading_int = {
        let int_tok = fields.get(idx).map(String::as_str);
        let floats_follow = (1..=3).all(|offset| {
            fields
                .get(idx + offset)
                .is_some_and(|t| t.trim().parse::<f64>().is_ok())
        });
        int_tok.is_some_and(|t| t.trim().parse::<i64>().is_ok()) && floats_follow
    };

    let leading_int = if has_leading_int {
        let v = fields[idx].trim().parse().ok();
        idx += 1;
        v
    } else {
        None
    };

    let mut next_float = || {
        let token = fields.get(idx).map(String::as_str).unwrap_or("");
        let v: f64 = token.trim().parse().unwrap_or(0.0);
        idx += 1;
        v
    };
    let x = next_float();
    let y = next_float();
    let z = next_float();
    drop(next_float);

    (
        UnitBlock {
            health,
            magicka,
            stamina,
            ultimate,
            extra_pools,
            leading_int,
            x,
            y,
            z,
        },
        idx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(s: &str) -> Vec<String> {
        s.split(',').map(String::from).collect()
    }

    #[test]
    fn parses_minimal_block() {
        let f = fields("100/100,50/50,50/50,500/500,0,1.0,2.0,3.0");
        let (block, next) = parse_unit_block(&f, 0);
        assert_eq!(block.health, Pool { cur: 100, max: 100 });
        assert_eq!(block.ultimate, Pool { cur: 500, max: 500 });
        assert_eq!(block.leading_int, Some(0));
        assert_eq!((block.x, block.y, block.z), (1.0, 2.0, 3.0));
        assert_eq!(next, 8);
    }

    #[test]
    fn tolerates_extra_pools_and_missing_leading_int() {
        let f = fields("100/100,50/50,50/50,500/500,10/10,20/20,1.0,2.0,3.0");
        let (block, next) = parse_unit_block(&f, 0);
        assert_eq!(block.extra_pools.len(), 2);
        assert_eq!(block.leading_int, None);
        assert_eq!((block.x, block.y, block.z), (1.0, 2.0, 3.0));
        assert_eq!(next, 9);
    }

    #[test]
    fn defaults_on_truncated_input() {
        let f = fields("100/100,50/50");
        let (block, next) = parse_unit_block(&f, 0);
        assert_eq!(block.stamina, Pool::default());
        assert_eq!(block.x, 0.0);
        assert_eq!(next, 7);
    }

    #[test]
    fn parses_block_starting_midway_through_fields() {
        let f = fields("junk,100/100,50/50,50/50,500/500,1.0,2.0,3.0");
        let (block, next) = parse_unit_block(&f, 1);
        assert_eq!(block.health, Pool { cur: 100, max: 100 });
        assert_eq!(next, 8);
    }
}
