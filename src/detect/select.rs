use super::result::Region;

/// Significance filter parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionParams {
    /// Frames with index `<= warmup_frames` never report regions.
    pub warmup_frames: u64,
    /// Upper bound on regions reported per frame.
    pub max_regions: usize,
    /// A region must cover strictly more than this share of the frame.
    pub min_area_fraction: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            warmup_frames: 5,
            max_regions: 3,
            min_area_fraction: 0.01,
        }
    }
}

/// Pick the regions worth reporting for frame `frame_index` (1-based).
///
/// The largest `max_regions` regions are considered, and each one is kept on
/// its own merit if its area fraction exceeds `min_area_fraction`. The result
/// is ordered by descending area. During warm-up the result is always empty.
pub fn select(
    mut regions: Vec<Region>,
    frame_area: u64,
    frame_index: u64,
    params: &SelectionParams,
) -> Vec<Region> {
    if frame_index <= params.warmup_frames || frame_area == 0 {
        return Vec::new();
    }

    regions.sort_by(|a, b| b.area.cmp(&a.area));
    regions.truncate(params.max_regions);
    regions.retain(|region| region.area_fraction(frame_area) > params.min_area_fraction);
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::{BoundingBox, Point};

    fn region(area: u64) -> Region {
        Region {
            contour: vec![Point::new(0, 0)],
            area,
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            },
        }
    }

    fn areas(regions: &[Region]) -> Vec<u64> {
        regions.iter().map(|r| r.area).collect()
    }

    #[test]
    fn warmup_frames_report_nothing() {
        let params = SelectionParams::default();
        for frame_index in 0..=params.warmup_frames {
            let picked = select(vec![region(50_000)], 100_000, frame_index, &params);
            assert!(picked.is_empty(), "frame {} leaked", frame_index);
        }
        assert_eq!(select(vec![region(50_000)], 100_000, 6, &params).len(), 1);
    }

    #[test]
    fn keeps_three_largest_in_descending_order() {
        let params = SelectionParams::default();
        let regions = vec![
            region(2_000),
            region(9_000),
            region(4_000),
            region(12_000),
            region(3_000),
        ];
        let picked = select(regions, 100_000, 10, &params);
        assert_eq!(areas(&picked), vec![12_000, 9_000, 4_000]);
    }

    #[test]
    fn threshold_is_strict_and_checked_per_candidate() {
        let params = SelectionParams::default();
        // 1_000 / 100_000 == 0.01 exactly: not strictly greater.
        let regions = vec![region(1_000), region(5_000), region(1_001), region(20)];
        let picked = select(regions, 100_000, 10, &params);
        assert_eq!(areas(&picked), vec![5_000, 1_001]);
    }

    #[test]
    fn regions_below_top_k_are_never_considered() {
        let params = SelectionParams {
            max_regions: 1,
            ..SelectionParams::default()
        };
        let picked = select(vec![region(500), region(5_000)], 100_000, 10, &params);
        assert_eq!(areas(&picked), vec![5_000]);
    }

    #[test]
    fn zero_frame_area_reports_nothing() {
        let picked = select(vec![region(10)], 0, 10, &SelectionParams::default());
        assert!(picked.is_empty());
    }
}
