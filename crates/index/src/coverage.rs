//! Coverage: which cells an object's range of influence reaches.

use glam::IVec2;
use proxgrid_common::{MapSize, tile_center};
use proxgrid_kernel::ObjectKind;

use crate::config::RangePolicy;
use crate::grid::{CellCoord, GridDims};

/// Range of influence of an object, in world units.
///
/// Sensor-carrying objects reach as far as their sensor; sensor kinds the
/// policy lists as whole-map get a range that covers the map from any point
/// on it. Everything gets at least `policy.min_range`.
pub fn range_of(kind: &ObjectKind, policy: &RangePolicy, map: MapSize) -> i32 {
    let range = match kind.sensor() {
        Some(sensor) if policy.whole_map_sensors.contains(&sensor.kind) => whole_map_range(map),
        Some(sensor) => sensor.range,
        None => 0,
    };
    range.max(policy.min_range)
}

/// Longer than the map diagonal.
fn whole_map_range(map: MapSize) -> i32 {
    let extent = map.world_extent();
    extent.x.max(extent.y).saturating_mul(2)
}

/// Whether the rectangle `[min, max]` intersects the open circle of
/// `radius` around `center`.
pub fn circle_intersects_rect(min: IVec2, max: IVec2, center: IVec2, radius: i32) -> bool {
    // Work in the circle's frame, widened so squares cannot overflow.
    let x1 = i64::from(min.x) - i64::from(center.x);
    let y1 = i64::from(min.y) - i64::from(center.y);
    let x2 = i64::from(max.x) - i64::from(center.x);
    let y2 = i64::from(max.y) - i64::from(center.y);
    let r = i64::from(radius);
    let corner = |dx: i64, dy: i64| dx * dx + dy * dy < r * r;

    if x2 < 0 {
        // Entirely left of the center.
        if y2 < 0 {
            corner(x2, y2)
        } else if y1 > 0 {
            corner(x2, y1)
        } else {
            -x2 < r
        }
    } else if x1 > 0 {
        // Entirely right of the center.
        if y2 < 0 {
            corner(x1, y2)
        } else if y1 > 0 {
            corner(x1, y1)
        } else {
            x1 < r
        }
    } else if y2 < 0 {
        -y2 < r
    } else if y1 > 0 {
        y1 < r
    } else {
        // The rectangle contains the center.
        true
    }
}

/// Visit every grid cell that the circle of `range` around `position`
/// intersects.
///
/// The position is snapped to the center of its tile first, so objects
/// moving inside one tile always cover the same cells. Candidates come from
/// the circle's bounding box clipped to the grid; each is then tested
/// exactly, which drops the bounding box corners the circle misses.
pub fn for_each_overlapping_cell(
    dims: &GridDims,
    position: IVec2,
    range: i32,
    mut visit: impl FnMut(CellCoord),
) {
    if dims.cell_count() == 0 {
        return;
    }
    let center = tile_center(position);
    let low = dims.world_to_cell(IVec2::new(
        center.x.saturating_sub(range),
        center.y.saturating_sub(range),
    ));
    let high = dims.world_to_cell(IVec2::new(
        center.x.saturating_add(range),
        center.y.saturating_add(range),
    ));

    let max_x = dims.width as i32 - 1;
    let max_y = dims.height as i32 - 1;
    for y in low.y.clamp(0, max_y)..=high.y.clamp(0, max_y) {
        for x in low.x.clamp(0, max_x)..=high.x.clamp(0, max_x) {
            let cell = CellCoord::new(x, y);
            let (min, max) = dims.cell_rect(cell);
            if circle_intersects_rect(min, max, center, range) {
                visit(cell);
            }
        }
    }
}

/// Collect the cells [`for_each_overlapping_cell`] visits.
pub(crate) fn coverage(dims: &GridDims, position: IVec2, range: i32) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    for_each_overlapping_cell(dims, position, range, |cell| cells.push(cell));
    cells
}
