//! Connected-region extraction.
//!
//! Foreground pixels are grouped into 8-connected components. For every
//! component the outer boundary is traced with Moore-neighbour tracing and
//! compressed to the points where the chain changes direction, so straight runs
//! are represented by their endpoints only. Holes inside a component belong to
//! that component and never produce a region of their own.

use crate::frame::{Mask, BACKGROUND};

use super::result::{BoundingBox, Point, Region};

/// Clockwise in image coordinates (y grows downwards), starting east.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Direction from the first scanned pixel back to its background predecessor.
const WEST: usize = 4;

/// Find every connected foreground region of `mask`.
///
/// Regions come back in raster order of their top-left-most pixel; callers that
/// care about size must sort. An empty mask yields an empty vec.
pub fn extract(mask: &Mask) -> Vec<Region> {
    let (width, height) = mask.dimensions();
    let labels = Labels::new(mask);
    let mut component = vec![0u32; labels.len()];
    let mut regions = Vec::new();
    let mut next_id = 0u32;

    for y in 0..height {
        for x in 0..width {
            let index = labels.index(x, y);
            if !labels.foreground[index] || component[index] != 0 {
                continue;
            }
            next_id += 1;
            let (area, bounding_box) = flood(&labels, &mut component, Point::new(x, y), next_id);
            let contour = trace(&labels, &component, Point::new(x, y), next_id, area);
            regions.push(Region {
                contour,
                area,
                bounding_box,
            });
        }
    }

    regions
}

struct Labels {
    width: u32,
    height: u32,
    foreground: Vec<bool>,
}

impl Labels {
    fn new(mask: &Mask) -> Self {
        Self {
            width: mask.width(),
            height: mask.height(),
            foreground: mask.as_raw().iter().map(|&v| v != BACKGROUND).collect(),
        }
    }

    fn len(&self) -> usize {
        self.foreground.len()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn neighbour(&self, p: Point, direction: usize) -> Option<Point> {
        let (dx, dy) = DIRECTIONS[direction % 8];
        let nx = p.x as i64 + dx;
        let ny = p.y as i64 + dy;
        if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
            return None;
        }
        Some(Point::new(nx as u32, ny as u32))
    }
}

/// Label the component containing `seed`, returning its pixel count and bounds.
fn flood(labels: &Labels, component: &mut [u32], seed: Point, id: u32) -> (u64, BoundingBox) {
    let mut stack = vec![seed];
    component[labels.index(seed.x, seed.y)] = id;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (seed.x, seed.y, seed.x, seed.y);
    let mut area = 0u64;

    while let Some(current) = stack.pop() {
        area += 1;
        min_x = min_x.min(current.x);
        min_y = min_y.min(current.y);
        max_x = max_x.max(current.x);
        max_y = max_y.max(current.y);

        for direction in 0..DIRECTIONS.len() {
            let Some(next) = labels.neighbour(current, direction) else {
                continue;
            };
            let index = labels.index(next.x, next.y);
            if labels.foreground[index] && component[index] == 0 {
                component[index] = id;
                stack.push(next);
            }
        }
    }

    let bounding_box = BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    };
    (area, bounding_box)
}

/// Trace the outer boundary of component `id` starting at its top-left-most pixel.
fn trace(labels: &Labels, component: &[u32], start: Point, id: u32, area: u64) -> Vec<Point> {
    let inside = |p: Point| component[labels.index(p.x, p.y)] == id;
    let scan = |p: Point, backtrack: usize| -> Option<usize> {
        (1..=8)
            .map(|offset| (backtrack + offset) % 8)
            .find(|&direction| labels.neighbour(p, direction).is_some_and(inside))
    };

    let Some(first) = scan(start, WEST) else {
        return vec![start];
    };

    let mut points = vec![start];
    let mut moves = vec![first];
    let mut current = start;
    let mut direction = first;
    // Every boundary pixel is visited at most four times.
    let limit = area.saturating_mul(4).saturating_add(8);

    for _ in 0..limit {
        let Some(next) = labels.neighbour(current, direction) else {
            break;
        };
        current = next;
        let backtrack = ((direction & !1) + 6) % 8;
        let Some(next_direction) = scan(current, backtrack) else {
            break;
        };
        if current == start && next_direction == first {
            break;
        }
        points.push(current);
        moves.push(next_direction);
        direction = next_direction;
    }

    compress(&points, &moves)
}

/// Keep only the points where the chain code changes direction.
fn compress(points: &[Point], moves: &[usize]) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let last = moves.len() - 1;
    points
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            let incoming = if i == 0 { moves[last] } else { moves[i - 1] };
            incoming != moves[i]
        })
        .map(|(_, &p)| p)
        .collect()
}
