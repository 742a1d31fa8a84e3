use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::Debug,
    ops::{Deref, DerefMut},
};

use log::{debug, trace};

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static).
/// The total order is only used to break ties between equally promising nodes.
pub trait NodeReference: Copy + Eq + Ord + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node lies inside the map and can be stood on
    fn is_walkable(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the walkable neighbors of the provided node and the cost required
    /// to go there. Diagonal neighbors are only included when `allow_diagonal` is set.
    fn neighbors_of(
        &self,
        node: Self::Reference,
        allow_diagonal: bool,
    ) -> impl Iterator<Item = (Self::Reference, f64)>;

    /// Lower bound on the cost of going from `from` to `to`
    fn estimate(&self, from: Self::Reference, to: Self::Reference) -> f64;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R> {
    /// cost so far plus the heuristic estimate to the goal
    estimate: f64,
    cost: f64,
    point: R,
}

impl<R: Ord> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.estimate
            .total_cmp(&other.estimate)
            .then_with(|| self.cost.total_cmp(&other.cost))
            .then_with(|| self.point.cmp(&other.point))
            .reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl<R: Ord> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: Ord> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R: Ord> Eq for ToVisit<R> {}

#[derive(Clone, Copy, Debug)]
pub struct VisitedItem<R> {
    /// Best known cost from the start
    pub cost: f64,
    pub from: Option<R>,
    /// Set once the node has been expanded, its cost is final from then on
    pub closed: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Visited<R>(Option<VisitedItem<R>>);

impl<R> Default for Visited<R> {
    fn default() -> Self {
        Visited(None)
    }
}
impl<R> Deref for Visited<R> {
    type Target = Option<VisitedItem<R>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<R> DerefMut for Visited<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PathResult<R> {
    /// Every node from start to goal, both included
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }
}

/// Outcome of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport<R> {
    /// Either `NoPathFound` or `PathFound`
    pub state: PathFinderState<R>,
    /// Nodes in the order they were expanded
    pub visited: Vec<R>,
}

impl<R> SearchReport<R> {
    pub fn found(&self) -> bool {
        matches!(self.state, PathFinderState::PathFound(_))
    }

    pub fn result(&self) -> Option<&PathResult<R>> {
        match &self.state {
            PathFinderState::PathFound(result) => Some(result),
            _ => None,
        }
    }

    /// The found path, empty if there is none
    pub fn path(&self) -> &[R] {
        self.result().map(|r| r.path.as_slice()).unwrap_or_default()
    }
}

/// A* search that can be advanced one expansion at a time.
pub struct PathFinder<M: MapTrait> {
    start: M::Reference,
    goal: M::Reference,
    allow_diagonal: bool,
    visited: M::Storage<Visited<M::Reference>>,
    visit_list: BinaryHeap<ToVisit<M::Reference>>,
    visit_order: Vec<M::Reference>,
    state: PathFinderState<M::Reference>,
    _map: std::marker::PhantomData<M>,
}

impl<M: MapTrait> PathFinder<M> {
    /// Prepare a search on `map`. If either end is not walkable the search is finished
    /// right away with [`PathFinderState::NoPathFound`].
    pub fn new(map: &M, start: M::Reference, goal: M::Reference, allow_diagonal: bool) -> Self {
        let mut visited: M::Storage<Visited<M::Reference>> = map.create_storage();
        let mut visit_list = BinaryHeap::new();
        let mut state = PathFinderState::Computing;

        if map.is_walkable(start) && map.is_walkable(goal) {
            *visited.get_mut(start) = Visited(Some(VisitedItem {
                cost: 0.0,
                from: None,
                closed: false,
            }));
            visit_list.push(ToVisit {
                estimate: map.estimate(start, goal),
                cost: 0.0,
                point: start,
            });
        } else {
            debug!("start {:?} or goal {:?} is not walkable", start, goal);
            state = PathFinderState::NoPathFound;
        }

        Self {
            start,
            goal,
            allow_diagonal,
            visited,
            visit_list,
            visit_order: Vec::new(),
            state,
            _map: std::marker::PhantomData,
        }
    }

    /// Run the search to completion.
    pub fn finish(mut self, map: &M) -> SearchReport<M::Reference> {
        while !self.step(map).is_done() {}

        SearchReport {
            state: self.state,
            visited: self.visit_order,
        }
    }

    /// Expand at most one node. Entries that were superseded by a cheaper one are
    /// discarded without counting as a step of their own.
    pub fn step(&mut self, map: &M) -> &PathFinderState<M::Reference> {
        if self.state.is_done() {
            return &self.state;
        }

        let Some(visit) = self.pop_open() else {
            debug!(
                "no path from {:?} to {:?} after {} expansions",
                self.start,
                self.goal,
                self.visit_order.len()
            );
            self.state = PathFinderState::NoPathFound;
            return &self.state;
        };

        if let Visited(Some(item)) = self.visited.get_mut(visit.point) {
            item.closed = true;
        }
        self.visit_order.push(visit.point);
        trace!("expanding {:?} at cost {:.3}", visit.point, visit.cost);

        if visit.point == self.goal {
            let path = self.backtrack();
            debug!(
                "found path from {:?} to {:?}: {} nodes, cost {:.3}, {} expansions",
                self.start,
                self.goal,
                path.len(),
                visit.cost,
                self.visit_order.len()
            );

            self.state = PathFinderState::PathFound(PathResult {
                path,
                start: self.start,
                goal: self.goal,
                total_cost: visit.cost,
            });
            return &self.state;
        }

        for (point, move_cost) in map.neighbors_of(visit.point, self.allow_diagonal) {
            let cost = visit.cost + move_cost;

            // only relax on a strict improvement
            if let Visited(Some(known)) = self.visited.get(point) {
                if known.closed || known.cost <= cost {
                    continue;
                }
            }

            *self.visited.get_mut(point) = Visited(Some(VisitedItem {
                cost,
                from: Some(visit.point),
                closed: false,
            }));
            self.visit_list.push(ToVisit {
                estimate: cost + map.estimate(point, self.goal),
                cost,
                point,
            });
        }

        &self.state
    }

    /// Pop the best entry of the open list that is still current.
    fn pop_open(&mut self) -> Option<ToVisit<M::Reference>> {
        while let Some(visit) = self.visit_list.pop() {
            match self.visited.get(visit.point) {
                Visited(Some(item)) if !item.closed && item.cost == visit.cost => return Some(visit),
                _ => {}
            }
        }
        None
    }

    fn backtrack(&self) -> Vec<M::Reference> {
        let mut path = vec![self.goal];
        let mut current = self.goal;

        loop {
            match self.visited.get(current) {
                Visited(Some(VisitedItem { from: None, .. })) => break,
                Visited(Some(VisitedItem {
                    from: Some(from), ..
                })) => {
                    path.push(from);
                    current = from;
                }
                Visited(None) => {
                    unreachable!("backtracking lead to a node that was never visited")
                }
            }
        }

        path.reverse();
        path
    }

    pub fn state(&self) -> &PathFinderState<M::Reference> {
        &self.state
    }

    /// Nodes expanded so far, in order
    pub fn visited(&self) -> &[M::Reference] {
        &self.visit_order
    }

    pub fn storage(&self) -> &M::Storage<Visited<M::Reference>> {
        &self.visited
    }

    pub fn start(&self) -> M::Reference {
        self.start
    }

    pub fn goal(&self) -> M::Reference {
        self.goal
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::grid::{path_cost, GridMap, Point};
    use std::f64::consts::SQRT_2;

    fn create_basic_map() -> GridMap {
        "\
        #######\n\
        #.###.#\n\
        #.###.#\n\
        #.#...#\n\
        #.#.###\n\
        #......\n\
        #######\n"
            .parse()
            .unwrap()
    }

    fn search(map: &GridMap, start: Point, goal: Point, allow_diagonal: bool) -> SearchReport<Point> {
        PathFinder::new(map, start, goal, allow_diagonal).finish(map)
    }

    /// Cost of the cheapest route, found by relaxing every edge until nothing changes
    fn brute_force_cost(map: &GridMap, start: Point, goal: Point, allow_diagonal: bool) -> Option<f64> {
        let mut cost = vec![vec![f64::INFINITY; map.columns]; map.rows];
        cost[start.row][start.col] = 0.0;

        let mut changed = true;
        while changed {
            changed = false;
            for p in map.walkable_cells() {
                let here = cost[p.row][p.col];
                if !here.is_finite() {
                    continue;
                }
                for (n, step) in map.neighbors_of(p, allow_diagonal) {
                    if here + step < cost[n.row][n.col] - 1e-12 {
                        cost[n.row][n.col] = here + step;
                        changed = true;
                    }
                }
            }
        }

        let c = cost[goal.row][goal.col];
        c.is_finite().then_some(c)
    }

    fn assert_valid_path(map: &GridMap, report: &SearchReport<Point>, allow_diagonal: bool) {
        let path = report.path();
        assert!(path.iter().all(|p| map.contains(*p)), "path leaves the walkable set");

        for pair in path.windows(2) {
            let dr = pair[0].row.abs_diff(pair[1].row);
            let dc = pair[0].col.abs_diff(pair[1].col);
            assert!(dr <= 1 && dc <= 1 && dr + dc > 0, "{:?} is not a single move", pair);
            if !allow_diagonal {
                assert_eq!(dr + dc, 1, "{:?} is a diagonal move", pair);
            }
        }
    }

    #[test]
    fn test_basic_route() {
        let map = create_basic_map();
        let report = search(&map, Point::new(1, 1), Point::new(1, 5), false);

        assert!(matches!(
            report.state,
            PathFinderState::PathFound(PathResult { total_cost, .. }) if total_cost == 12.0
        ));
        assert_eq!(report.path().len(), 13);
        assert_eq!(report.path().first(), Some(&Point::new(1, 1)));
        assert_eq!(report.path().last(), Some(&Point::new(1, 5)));
        assert_valid_path(&map, &report, false);
    }

    #[test]
    fn test_basic_route_diagonal() {
        let map = create_basic_map();
        let report = search(&map, Point::new(1, 1), Point::new(1, 5), true);

        let result = report.result().unwrap();
        assert!((result.total_cost - (4.0 + 4.0 * SQRT_2)).abs() < 1e-9);
        assert!((path_cost(&result.path) - result.total_cost).abs() < 1e-9);
        assert_valid_path(&map, &report, true);
    }

    #[test]
    fn test_basic_no_route() {
        let map = create_basic_map();

        // goal is a wall
        let report = search(&map, Point::new(1, 1), Point::new(0, 5), true);
        assert!(matches!(report.state, PathFinderState::NoPathFound));
        assert!(report.visited.is_empty());
        assert!(report.path().is_empty());

        // start is a wall
        let report = search(&map, Point::new(0, 0), Point::new(1, 5), true);
        assert!(!report.found());

        // outside of the map
        let report = search(&map, Point::new(1, 1), Point::new(9, 9), true);
        assert!(!report.found());
    }

    #[test]
    fn test_disconnected_goal_never_visited() {
        let map: GridMap = "\
            ..#..\n\
            ..#..\n\
            ..#..\n"
            .parse()
            .unwrap();
        let goal = Point::new(1, 4);

        let report = search(&map, Point::new(0, 0), goal, true);

        assert!(!report.found());
        assert_eq!(report.visited.len(), 6);
        assert!(!report.visited.contains(&goal));
    }

    #[test]
    fn test_start_is_goal() {
        let map = create_basic_map();
        let start = Point::new(3, 4);

        let report = search(&map, start, start, true);

        assert_eq!(report.path(), &[start]);
        assert_eq!(report.result().unwrap().total_cost, 0.0);
        assert_eq!(report.visited, vec![start]);
    }

    #[test]
    fn test_single_gap() {
        let mut map = GridMap::from_walkable(8, 8, (0..8).flat_map(|r| (0..8).map(move |c| Point::new(r, c))));
        for col in 0..8 {
            if col != 3 {
                map.cells[4][col] = crate::grid::Cell::Invalid;
            }
        }
        let (start, goal) = (Point::new(0, 3), Point::new(7, 3));

        for allow_diagonal in [true, false] {
            let report = search(&map, start, goal, allow_diagonal);

            assert!(report.path().contains(&Point::new(4, 3)));
            assert_eq!(report.result().unwrap().total_cost, 7.0);
            assert_valid_path(&map, &report, allow_diagonal);
        }
    }

    #[test]
    fn test_open_field() {
        let map = GridMap::from_walkable(5, 5, (0..5).flat_map(|r| (0..5).map(move |c| Point::new(r, c))));
        let (start, goal) = (Point::new(0, 0), Point::new(4, 4));

        let report = search(&map, start, goal, true);
        assert_eq!(
            report.path(),
            &[
                Point::new(0, 0),
                Point::new(1, 1),
                Point::new(2, 2),
                Point::new(3, 3),
                Point::new(4, 4)
            ]
        );
        assert!((report.result().unwrap().total_cost - 4.0 * SQRT_2).abs() < 1e-9);

        let report = search(&map, start, goal, false);
        assert_eq!(report.path().len(), 9);
        assert_eq!(report.result().unwrap().total_cost, 8.0);
        assert_valid_path(&map, &report, false);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let map = GridMap::from_walkable(3, 3, (0..3).flat_map(|r| (0..3).map(move |c| Point::new(r, c))));

        let first = search(&map, Point::new(0, 0), Point::new(2, 2), false);
        let second = search(&map, Point::new(0, 0), Point::new(2, 2), false);

        assert_eq!(first, second);
        // equal estimates and costs, the lower (row, col) is expanded first
        assert_eq!(first.visited[1], Point::new(0, 1));
    }

    #[test]
    fn test_optimal_against_brute_force() {
        let maps = [
            "\
            ..........\n\
            .########.\n\
            .#......#.\n\
            .#.####.#.\n\
            .#.#..#.#.\n\
            ...#..#...\n\
            ####..####\n\
            ..........\n",
            "\
            .#........\n\
            .#.######.\n\
            .#.#....#.\n\
            ...#.##.#.\n\
            ####.#..#.\n\
            .....#.##.\n\
            .###.#....\n\
            ...#.####.\n",
            "\
            ....#.....\n\
            .##.#.###.\n\
            .#..#...#.\n\
            .#.###..#.\n\
            .#...#..#.\n\
            .###.#.##.\n\
            .....#....\n\
            #.#.......\n",
        ];

        for text in maps {
            let map: GridMap = text.parse().unwrap();
            let cells: Vec<Point> = map.walkable_cells().collect();

            for &start in cells.iter().step_by(7) {
                for &goal in cells.iter().step_by(5) {
                    for allow_diagonal in [true, false] {
                        let report = search(&map, start, goal, allow_diagonal);
                        let expected = brute_force_cost(&map, start, goal, allow_diagonal);

                        match (report.result(), expected) {
                            (Some(result), Some(expected)) => {
                                assert!(
                                    (result.total_cost - expected).abs() < 1e-9,
                                    "{} -> {}: got {}, expected {}",
                                    start,
                                    goal,
                                    result.total_cost,
                                    expected
                                );
                                assert!((path_cost(report.path()) - expected).abs() < 1e-9);
                                assert_valid_path(&map, &report, allow_diagonal);
                            }
                            (None, None) => assert!(!report.visited.contains(&goal)),
                            (got, expected) => panic!(
                                "{} -> {}: got {:?}, expected {:?}",
                                start, goal, got, expected
                            ),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_stepping() {
        let map = create_basic_map();
        let mut finder = PathFinder::new(&map, Point::new(1, 1), Point::new(1, 5), false);

        assert!(matches!(finder.step(&map), PathFinderState::Computing));
        assert_eq!(finder.visited(), &[Point::new(1, 1)]);
        assert!(finder.storage().get(Point::new(2, 1)).is_some());

        let mut steps = 1;
        while !finder.step(&map).is_done() {
            steps += 1;
        }

        assert!(matches!(finder.state(), PathFinderState::PathFound(_)));
        assert_eq!(finder.visited().len(), steps + 1);
        assert_eq!(finder.visited().last(), Some(&finder.goal()));
        assert_eq!(finder.start(), Point::new(1, 1));

        // a finished search stays finished
        assert!(finder.step(&map).is_done());
        assert_eq!(finder.visited().len(), steps + 1);
    }
}
