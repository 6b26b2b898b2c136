use super::context::{EdgeMap, TubeRegion};
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::debug;

/// Locates tube candidates in an edge map, left to right.
pub struct RegionLocator {
    min_region_height: u32,
}

impl RegionLocator {
    pub fn new(min_region_height: u32) -> Self {
        Self { min_region_height }
    }

    /// Extract tube bounding boxes from the edge map.
    ///
    /// Only externally-connected outlines are considered; regions whose
    /// height does not exceed the configured minimum are dropped as noise.
    /// Survivors come back sorted by ascending `x`, ties keeping discovery
    /// order. An empty result means "no tubes detected", not a failure.
    pub fn locate(&self, edges: &EdgeMap) -> Vec<TubeRegion> {
        let contours = find_contours::<i32>(edges.mask());
        let found = contours.len();

        let mut regions: Vec<TubeRegion> = contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .filter_map(|c| bounding_box(&c))
            .filter(|r| r.height > self.min_region_height)
            .collect();

        regions.sort_by_key(|r| r.x);

        debug!(
            contours = found,
            regions = regions.len(),
            "located tube regions"
        );
        regions
    }
}

fn bounding_box(contour: &Contour<i32>) -> Option<TubeRegion> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in &contour.points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(TubeRegion::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn draw_box_outline(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for dx in 0..w {
            img.put_pixel(x + dx, y, Luma([255]));
            img.put_pixel(x + dx, y + h - 1, Luma([255]));
        }
        for dy in 0..h {
            img.put_pixel(x, y + dy, Luma([255]));
            img.put_pixel(x + w - 1, y + dy, Luma([255]));
        }
    }

    #[test]
    fn regions_are_filtered_and_sorted_left_to_right() {
        let mut mask = GrayImage::new(300, 200);
        // Two tall tubes, drawn right-first so sorting has work to do, plus
        // one short blob below the height floor.
        draw_box_outline(&mut mask, 200, 10, 30, 150);
        draw_box_outline(&mut mask, 40, 20, 30, 140);
        draw_box_outline(&mut mask, 120, 50, 30, 25);

        let locator = RegionLocator::new(40);
        let regions = locator.locate(&EdgeMap::new(mask));

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].x, 40);
        assert_eq!(regions[1].x, 200);
        assert!(regions.windows(2).all(|w| w[0].x <= w[1].x));
        assert!(regions.iter().all(|r| r.height > 40));
        assert_eq!(regions[0].height, 140);
        assert_eq!(regions[1].width, 30);
    }

    #[test]
    fn empty_edge_map_yields_no_regions() {
        let mask = GrayImage::new(100, 100);
        let locator = RegionLocator::new(40);
        assert!(locator.locate(&EdgeMap::new(mask)).is_empty());
    }

    #[test]
    fn inner_outlines_are_ignored() {
        let mut mask = GrayImage::new(100, 200);
        draw_box_outline(&mut mask, 10, 10, 50, 150);

        let locator = RegionLocator::new(40);
        let regions = locator.locate(&EdgeMap::new(mask));

        // The hollow box has an outer and an inner border; only the outer
        // one becomes a region.
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0], TubeRegion::new(10, 10, 50, 150));
    }
}
