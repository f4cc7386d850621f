use crate::{
    graph::{DistanceOracle, EdgeDirection, Vertex},
    search::{Direction, Frontier, Settled},
};

/// Identifies one frontier among the frontiers of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Forward,
    Backward,
}

/// Shortest-path state of one active source (the query, a set member or a meeting party).
///
/// Under [`Direction::Ordered`] only the forward frontier exists and distances are
/// `d(source, v)`. Under [`Direction::Symmetric`] a backward frontier computes `d(v, source)`
/// and the distance of `v` is the mean of both, known once both frontiers settled `v`.
#[derive(Clone, Debug)]
pub struct SourceSearch<V: Vertex> {
    source: V,
    direction: Direction,
    forward: Frontier<V>,
    backward: Option<Frontier<V>>,
}

impl<V: Vertex> SourceSearch<V> {
    pub fn new<G: DistanceOracle<V>>(graph: &G, source: V, direction: Direction) -> Self {
        SourceSearch {
            source,
            direction,
            forward: Frontier::new(graph, source, EdgeDirection::Outgoing),
            backward: direction
                .needs_backward()
                .then(|| Frontier::new(graph, source, EdgeDirection::Incoming)),
        }
    }

    pub fn source(&self) -> V {
        self.source
    }

    pub fn frontier(&self, leg: Leg) -> Option<&Frontier<V>> {
        match leg {
            Leg::Forward => Some(&self.forward),
            Leg::Backward => self.backward.as_ref(),
        }
    }

    pub fn frontier_mut(&mut self, leg: Leg) -> Option<&mut Frontier<V>> {
        match leg {
            Leg::Forward => Some(&mut self.forward),
            Leg::Backward => self.backward.as_mut(),
        }
    }

    /// The leg holding the cheapest pending relaxation, with its weight.
    pub fn cheapest_leg(&self) -> Option<(Leg, f32)> {
        let forward = self.forward.min_pending().map(|w| (Leg::Forward, w));
        let backward = self
            .backward
            .as_ref()
            .and_then(Frontier::min_pending)
            .map(|w| (Leg::Backward, w));
        match (forward, backward) {
            (Some(f), Some(b)) => Some(if b.1 < f.1 { b } else { f }),
            (f, b) => f.or(b),
        }
    }

    /// Exact distance to `vertex`, once every leg settled it.
    pub fn distance(&self, vertex: V) -> Option<f32> {
        let forward = self.forward.distance(vertex)?;
        match &self.backward {
            None => Some(forward),
            Some(backward) => Some(self.direction.combine(forward, backward.distance(vertex)?)),
        }
    }

    /// Lower bound on the distance to `vertex`: settled legs contribute their exact value,
    /// unsettled ones their frontier minimum.
    pub fn distance_lower_bound(&self, vertex: V) -> f32 {
        let forward = self.forward.distance_lower_bound(vertex);
        match &self.backward {
            None => forward,
            Some(backward) => self
                .direction
                .combine(forward, backward.distance_lower_bound(vertex)),
        }
    }

    /// Lower bound on the distance of any vertex this source has not fully settled.
    pub fn unsettled_lower_bound(&self) -> f32 {
        let forward = self.forward.unsettled_lower_bound();
        match &self.backward {
            None => forward,
            // a vertex may be settled on one leg (distance >= 0) and pending on the other
            Some(backward) => forward.min(backward.unsettled_lower_bound()) / 2.0,
        }
    }

    /// Upper bound on the distance to `vertex` through the triangle inequality
    /// `d(s,v) <= d(s,q) + d(q,v)` (and `d(v,s) <= d(v,q) + d(q,s)` on the backward leg),
    /// where `via` is the search rooted at `q`. `INFINITY` when no bound is known yet.
    pub fn distance_upper_bound(&self, vertex: V, via: &SourceSearch<V>) -> f32 {
        let forward = self.forward.distance(vertex).unwrap_or_else(|| {
            match (self.forward.distance(via.source), via.forward.distance(vertex)) {
                (Some(to_via), Some(from_via)) => to_via + from_via,
                _ => f32::INFINITY,
            }
        });
        match (&self.backward, &via.backward) {
            (Some(backward), Some(via_backward)) => {
                let backward = backward.distance(vertex).unwrap_or_else(|| {
                    match (via_backward.distance(vertex), backward.distance(via.source)) {
                        (Some(to_via), Some(from_via)) => to_via + from_via,
                        _ => f32::INFINITY,
                    }
                });
                self.direction.combine(forward, backward)
            }
            _ => forward,
        }
    }

    /// Whether some leg is exhausted without having settled `vertex`: the source can
    /// then never reach it.
    pub fn never_reaches(&self, vertex: V) -> bool {
        let dead = |frontier: &Frontier<V>| {
            frontier.is_exhausted() && frontier.distance(vertex).is_none()
        };
        dead(&self.forward) || self.backward.as_ref().is_some_and(dead)
    }

    pub fn is_exhausted(&self) -> bool {
        self.forward.is_exhausted() && self.backward.as_ref().is_none_or(Frontier::is_exhausted)
    }

    pub fn live_entries(&self) -> usize {
        self.forward.live_entries() + self.backward.as_ref().map_or(0, Frontier::live_entries)
    }
}

/// Advances the leg holding the globally cheapest pending relaxation among `searches`.
///
/// Ties go to the earliest search, then to its forward leg.
///
/// # Returns
/// The index of the advanced search and the vertex it settled, or `None` once every leg is
/// exhausted.
pub fn advance_cheapest<V: Vertex, G: DistanceOracle<V>>(
    graph: &G,
    searches: &mut [SourceSearch<V>],
) -> Option<(usize, Settled<V>)> {
    loop {
        let mut cheapest: Option<(usize, Leg, f32)> = None;
        for (index, search) in searches.iter().enumerate() {
            if let Some((leg, weight)) = search.cheapest_leg() {
                if cheapest.is_none_or(|(_, _, best)| weight < best) {
                    cheapest = Some((index, leg, weight));
                }
            }
        }
        let (index, leg, _) = cheapest?;
        let frontier = searches[index].frontier_mut(leg)?;
        // a leg whose queue only held stale relaxations is exhausted now; look again
        if let Some(settled) = frontier.advance(graph) {
            return Some((index, settled));
        }
    }
}
