//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::timing::UNREACHABLE_DISTANCE;

/// The static topology T0: switch count plus a symmetric, deduplicated,
/// weighted adjacency.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StaticTopology {
    pub n: u32,
    adj: BTreeMap<u32, BTreeMap<u32, u32>>,
}

impl StaticTopology {
    pub fn new(n: u32) -> Self {
        let adj = (0..n).map(|s| (s, BTreeMap::new())).collect();
        StaticTopology { n, adj }
    }

    pub fn switches(&self) -> impl Iterator<Item = u32> + '_ {
        0..self.n
    }

    /// Neighbors of `s` in T0, ascending id order.
    pub fn neighbors(&self, s: u32) -> impl Iterator<Item = u32> + '_ {
        self.adj.get(&s).into_iter().flat_map(|m| m.keys().copied())
    }

    pub fn weight(&self, u: u32, v: u32) -> Option<u32> {
        self.adj.get(&u).and_then(|m| m.get(&v)).copied()
    }

    pub fn adjacency(&self) -> &BTreeMap<u32, BTreeMap<u32, u32>> {
        &self.adj
    }

    fn insert_edge(
        &mut self,
        u: u32,
        v: u32,
        w: u32,
    ) -> Result<(), ConfigError> {
        if u == v {
            return Err(ConfigError::SelfLoop(u));
        }
        if u >= self.n {
            return Err(ConfigError::SwitchOutOfRange(u, self.n));
        }
        if v >= self.n {
            return Err(ConfigError::SwitchOutOfRange(v, self.n));
        }
        if w < 1 || w >= UNREACHABLE_DISTANCE {
            return Err(ConfigError::WeightOutOfRange(u, v, w));
        }
        for (a, b) in [(u, v), (v, u)] {
            if let Some(&existing) = self.adj[&a].get(&b) {
                if existing != w {
                    return Err(ConfigError::ConflictingWeight(
                        u, v, existing, w,
                    ));
                }
            }
        }
        self.adj.get_mut(&u).unwrap().insert(v, w);
        self.adj.get_mut(&v).unwrap().insert(u, w);
        Ok(())
    }
}

/// Parses the config-file format of spec §6: line 1 is the switch count N,
/// subsequent non-empty lines are `<u> <v> <w>`. Blank lines are ignored.
pub fn parse(text: &str) -> Result<StaticTopology, ConfigError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let n_line = lines.next().ok_or(ConfigError::Empty)?;
    let n: u32 = n_line
        .parse()
        .map_err(|_| ConfigError::InvalidSwitchCount(n_line.to_string()))?;

    let mut topo = StaticTopology::new(n);
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [u, v, w] = fields[..] else {
            return Err(ConfigError::InvalidEdgeLine(line.to_string()));
        };
        let parse_u32 = |s: &str| {
            s.parse::<u32>()
                .map_err(|_| ConfigError::InvalidEdgeLine(line.to_string()))
        };
        let (u, v, w) = (parse_u32(u)?, parse_u32(v)?, parse_u32(w)?);
        topo.insert_edge(u, v, w)?;
    }
    Ok(topo)
}

/// Reads and parses a config file from disk. Fatal on any I/O or parse
/// error, per spec §7: the process must exit before any socket is bound.
pub fn load(path: impl AsRef<Path>) -> Result<StaticTopology, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}
