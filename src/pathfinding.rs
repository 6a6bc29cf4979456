use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use crate::grid::Grid;
use crate::types::{Path, Position};

pub fn reachable(grid: &Grid, start: Position, end: Position) -> Option<Path> {
    bfs(grid, start, end, |pos| grid.is_open(pos))
}

pub fn reachable_avoiding(
    grid: &Grid,
    start: Position,
    end: Position,
    blocked: &[Position],
) -> Option<Path> {
    bfs(grid, start, end, |pos| grid.is_open(pos) && !blocked.contains(&pos))
}

pub fn reachable_cells(grid: &Grid, from: Position) -> HashSet<Position> {
    let mut out = HashSet::new();
    if !grid.in_bounds(from) || !grid.is_open(from) {
        return out;
    }
    let mut queue = VecDeque::new();
    out.insert(from);
    queue.push_back(from);
    while let Some(pos) = queue.pop_front() {
        for next in grid.neighbors4(pos) {
            if !grid.is_open(next) {
                continue;
            }
            if out.insert(next) {
                queue.push_back(next);
            }
        }
    }
    out
}

fn bfs<F>(grid: &Grid, start: Position, end: Position, passable: F) -> Option<Path>
where
    F: Fn(Position) -> bool,
{
    if !grid.in_bounds(start) || !grid.in_bounds(end) {
        return None;
    }
    if !passable(start) || !passable(end) {
        return None;
    }
    if start == end {
        return Some(vec![start]);
    }

    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut visited = vec![false; grid.len()];
    let mut queue = VecDeque::new();
    let start_idx = grid.index(start);
    let end_idx = grid.index(end);
    visited[start_idx] = true;
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        let current = grid.index(pos);
        if current == end_idx {
            return Some(reconstruct_path(grid, &came_from, end_idx));
        }
        for next in grid.neighbors4(pos) {
            let idx = grid.index(next);
            if visited[idx] || !passable(next) {
                continue;
            }
            visited[idx] = true;
            came_from[idx] = Some(current);
            queue.push_back(next);
        }
    }
    None
}

#[derive(Clone, Copy, Eq, PartialEq)]
struct Node {
    f_score: u32,
    seq: u64,
    index: usize,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* with a Manhattan heuristic and unit step cost. Equal f-scores pop in
/// insertion order. With `ignore_walls` every in-bounds cell is traversable.
pub fn shortest(grid: &Grid, start: Position, end: Position, ignore_walls: bool) -> Option<Path> {
    if !grid.in_bounds(start) || !grid.in_bounds(end) {
        return None;
    }
    let passable = |pos: Position| ignore_walls || grid.is_open(pos);
    if !passable(start) || !passable(end) {
        return None;
    }
    if start == end {
        return Some(vec![start]);
    }

    let end_idx = grid.index(end);
    let mut open_set = BinaryHeap::new();
    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut g_score = vec![u32::MAX; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut seq = 0u64;

    let start_idx = grid.index(start);
    g_score[start_idx] = 0;
    open_set.push(Node {
        f_score: heuristic(start, end),
        seq,
        index: start_idx,
    });

    while let Some(Node { index: current, .. }) = open_set.pop() {
        if current == end_idx {
            return Some(reconstruct_path(grid, &came_from, end_idx));
        }
        if closed[current] {
            continue;
        }
        closed[current] = true;

        let current_pos = grid.position_of(current);
        let tentative_g = g_score[current] + 1;
        for next in grid.neighbors4(current_pos) {
            let idx = grid.index(next);
            if closed[idx] || !passable(next) {
                continue;
            }
            if tentative_g < g_score[idx] {
                came_from[idx] = Some(current);
                g_score[idx] = tentative_g;
                seq += 1;
                open_set.push(Node {
                    f_score: tentative_g + heuristic(next, end),
                    seq,
                    index: idx,
                });
            }
        }
    }
    None
}

fn heuristic(a: Position, b: Position) -> u32 {
    a.manhattan(b) as u32
}

fn reconstruct_path(grid: &Grid, came_from: &[Option<usize>], end: usize) -> Path {
    let mut path = vec![grid.position_of(end)];
    let mut current = end;
    while let Some(prev) = came_from[current] {
        path.push(grid.position_of(prev));
        current = prev;
    }
    path.reverse();
    path
}
